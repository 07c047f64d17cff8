//! Compressor for Microsoft's Xpress Huffman compression format (MS-XCA),
//! the variant used by Windows hibernation files, WIM images and some RPC
//! payloads.
//!
//! Input is processed in 64 KiB chunks. Each chunk is LZ77-compressed
//! against a 64 KiB sliding window that persists across chunks, then
//! entropy-coded with a per-chunk canonical Huffman table over 512 symbols
//! (256 literals, an end-of-stream marker and 255 offset/length classes).
//! The output of [`compress`] is accepted by any conforming decoder, such
//! as `RtlDecompressBufferEx` with `COMPRESS_ALGORITHM_XPRESS_HUFF`.
#![allow(clippy::too_many_arguments)]

mod bitstream;
mod compressor;
#[cfg(test)]
mod decode;
mod dictionary;
mod error;
mod huffman;
mod lz77;

pub use crate::compressor::{compress, max_compressed_size};
pub use crate::error::CompressError;

/// Bytes of input encoded per Huffman table.
pub(crate) const CHUNK_SIZE: usize = 0x10000;
/// Farthest back a match may reach.
pub(crate) const MAX_OFFSET: usize = 0xFFFF;
/// Shortest encodable match.
pub(crate) const MIN_MATCH: usize = 3;
/// 256 literals, the end-of-stream marker and 255 match classes.
pub(crate) const SYMBOLS: usize = 0x200;
/// Symbol that terminates the stream.
pub(crate) const STREAM_END: usize = 0x100;

#[cfg(test)]
mod tests {
    use crate::decode::{decompress, decompress_with_stats};
    use crate::{compress, max_compressed_size, CHUNK_SIZE};

    /// Every boundary the format cares about: empty, sub-minimum-match,
    /// fragment-sized, around the chunk size, multi-chunk.
    const SIZES: [usize; 10] = [0, 1, 3, 15, 256, 65535, 65536, 65537, 131072, 1_000_000];

    const SAMPLE_TEXT: &str = "It is a truth universally acknowledged, that a single man in \
        possession of a good fortune, must be in want of a wife. However little known the \
        feelings or views of such a man may be on his first entering a neighbourhood, this \
        truth is so well fixed in the minds of the surrounding families, that he is considered \
        as the rightful property of some one or other of their daughters. ";

    fn roundtrip(input: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; max_compressed_size(input.len())];
        let n = compress(input, &mut out).unwrap();
        // the decoder also asserts the table invariants per chunk
        let decoded = decompress(&out[..n]);
        assert_eq!(decoded.len(), input.len());
        assert!(decoded == input, "round-trip mismatch");
        out.truncate(n);
        out
    }

    fn random_bytes(len: usize, mut state: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(len + 8);
        while out.len() < len {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            out.extend_from_slice(&state.to_le_bytes());
        }
        out.truncate(len);
        out
    }

    fn cycle_bytes(pattern: &[u8], len: usize) -> Vec<u8> {
        pattern.iter().copied().cycle().take(len).collect()
    }

    #[test_log::test]
    fn round_trips_constant_inputs() {
        for len in SIZES {
            roundtrip(&vec![0u8; len]);
            roundtrip(&vec![0xFFu8; len]);
        }
    }

    #[test_log::test]
    fn round_trips_random_inputs() {
        for len in SIZES {
            roundtrip(&random_bytes(len, 0x9E3779B97F4A7C15));
        }
    }

    #[test_log::test]
    fn round_trips_english_text() {
        for len in SIZES {
            roundtrip(&cycle_bytes(SAMPLE_TEXT.as_bytes(), len));
        }
    }

    #[test_log::test]
    fn round_trips_repetitive_pattern() {
        for len in SIZES {
            roundtrip(&cycle_bytes(b"ABCD", len));
        }
    }

    #[test_log::test]
    fn empty_input_round_trips_to_nothing() {
        let compressed = roundtrip(&[]);
        assert!(compressed.is_empty());
        assert!(decompress(&[]).is_empty());
    }

    #[test_log::test]
    fn chunk_boundary_inputs_end_with_a_terminator_chunk() {
        let mut terminator = vec![0u8; 260];
        terminator[128] = 0x01;
        for len in [CHUNK_SIZE, 2 * CHUNK_SIZE] {
            let compressed = roundtrip(&vec![0u8; len]);
            assert_eq!(&compressed[compressed.len() - 260..], terminator.as_slice());
        }
    }

    #[test_log::test]
    fn one_byte_past_the_boundary_adds_a_tiny_final_chunk() {
        let compressed = roundtrip(&vec![0u8; CHUNK_SIZE + 1]);
        // 263 bytes for the run chunk, 260 for the literal + marker chunk
        assert_eq!(compressed.len(), 523);
    }

    #[test_log::test]
    fn long_run_becomes_one_literal_and_one_match() {
        let input = vec![0u8; CHUNK_SIZE];
        let mut out = vec![0u8; max_compressed_size(input.len())];
        let n = compress(&input, &mut out).unwrap();
        let (decoded, stats) = decompress_with_stats(&out[..n]);
        assert!(decoded == input);
        assert_eq!(stats.matches, 1);
        assert_eq!(stats.match_bytes, CHUNK_SIZE - 1);
    }

    #[test_log::test]
    fn repeated_blocks_are_covered_by_matches() {
        let input = cycle_bytes(b"ABCDEFGHIJ", 100_000);
        let mut out = vec![0u8; max_compressed_size(input.len())];
        let n = compress(&input, &mut out).unwrap();
        let (decoded, stats) = decompress_with_stats(&out[..n]);
        assert!(decoded == input);
        // everything past the first repetition comes from matches
        assert!(stats.match_bytes >= 9_998 * 10, "{} matched", stats.match_bytes);
        assert!(n < input.len() / 4, "{n} compressed");
    }

    #[test_log::test]
    fn random_data_stays_within_ten_percent() {
        let input = random_bytes(200 * 1024, 0x853C49E6748FEA9B);
        let mut out = vec![0u8; max_compressed_size(input.len())];
        let n = compress(&input, &mut out).unwrap();
        assert!(decompress(&out[..n]) == input);
        assert!(n <= input.len() + input.len() / 10, "{n} compressed");
    }
}
