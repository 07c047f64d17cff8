use crate::bitstream::OutputBitstream;
use crate::dictionary::Dictionary;
use crate::error::CompressError;
use crate::huffman::HuffmanEncoder;
use crate::lz77;
use crate::{CHUNK_SIZE, STREAM_END, SYMBOLS};

/// Packed code-length table at the head of every chunk: 512 nibbles.
const TABLE_BYTES: usize = SYMBOLS / 2;
/// Smallest possible chunk: the table plus two empty bitstream words.
const MIN_CHUNK: usize = TABLE_BYTES + 4;

/// Compress |input| into |output|, returning the compressed byte count.
///
/// The output is a concatenation of independently entropy-coded 64 KiB
/// chunks terminated by the end-of-stream symbol; any conforming
/// Xpress Huffman decoder reproduces |input| exactly. Empty input
/// produces zero output bytes. [`max_compressed_size`] gives a capacity
/// that can never run out.
pub fn compress(input: &[u8], output: &mut [u8]) -> Result<usize, CompressError> {
    if input.is_empty() {
        return Ok(0);
    }

    let mut scratch = Vec::new();
    scratch
        .try_reserve_exact(lz77::scratch_bound(CHUNK_SIZE))
        .map_err(|_| CompressError::OutOfMemory)?;
    let mut dict = Dictionary::new(input)?;
    let mut counts = [0u32; SYMBOLS];

    let mut in_pos = 0;
    let mut out_pos = 0;
    while input.len() - in_pos >= CHUNK_SIZE {
        out_pos += encode_chunk(
            input,
            in_pos,
            in_pos + CHUNK_SIZE,
            false,
            &mut dict,
            &mut scratch,
            &mut counts,
            &mut output[out_pos..],
        )?;
        in_pos += CHUNK_SIZE;
    }
    if in_pos == input.len() {
        // the input ended exactly on a chunk boundary; a terminator chunk
        // carries the end-of-stream symbol
        out_pos += write_terminator_chunk(&mut output[out_pos..])?;
    } else {
        out_pos += encode_chunk(
            input,
            in_pos,
            input.len(),
            true,
            &mut dict,
            &mut scratch,
            &mut counts,
            &mut output[out_pos..],
        )?;
    }
    log::debug!("compressed {} bytes into {}", input.len(), out_pos);
    Ok(out_pos)
}

/// Output capacity that is always sufficient for [`compress`]: no symbol
/// costs more than two bytes per input byte, plus the fixed per-chunk
/// header overhead and a possible terminator chunk.
pub fn max_compressed_size(input_len: usize) -> usize {
    2 * input_len + (input_len / CHUNK_SIZE + 2) * MIN_CHUNK
}

fn encode_chunk(
    input: &[u8],
    chunk_start: usize,
    chunk_end: usize,
    is_final: bool,
    dict: &mut Dictionary<'_>,
    scratch: &mut Vec<u8>,
    counts: &mut [u32; SYMBOLS],
    out: &mut [u8],
) -> Result<usize, CompressError> {
    if out.len() < MIN_CHUNK {
        return Err(CompressError::BufferTooSmall);
    }

    lz77::compress_chunk(input, chunk_start, chunk_end, is_final, dict, scratch, counts);
    let encoder = HuffmanEncoder::build(counts);

    let lengths = encoder.lengths();
    for (i, packed) in out[..TABLE_BYTES].iter_mut().enumerate() {
        *packed = lengths[2 * i + 1] << 4 | lengths[2 * i];
    }

    let done = encode_intermediate(scratch, &encoder, &mut out[TABLE_BYTES..]);
    if done == 0 {
        return Err(CompressError::BufferTooSmall);
    }
    log::trace!(
        "chunk {:#x}..{:#x}: {} intermediate bytes, {} compressed",
        chunk_start,
        chunk_end,
        scratch.len(),
        TABLE_BYTES + done
    );
    Ok(TABLE_BYTES + done)
}

/// Second pass: re-read the intermediate stream and emit the final
/// bitstream. Returns the byte count, or 0 once the output runs out.
///
/// Per match the order is load-bearing: the Huffman code for the symbol,
/// then the length overflow bytes when `len - 3` does not fit the symbol's
/// four-bit length field, then the offset bits below its high bit. The
/// overflow byte is biased by the 15 the symbol already carries; the
/// escaped u16/u32 forms hold `len - 3` itself.
fn encode_intermediate(buf: &[u8], encoder: &HuffmanEncoder, out: &mut [u8]) -> usize {
    let mut bstr = OutputBitstream::new(out);
    let mut pos = 0;
    while pos < buf.len() {
        let mask = u32::from_le_bytes(buf[pos..pos + 4].try_into().expect("mask word"));
        pos += 4;
        for item in 0..32 {
            if pos == buf.len() {
                break;
            }
            if mask >> item & 1 == 1 {
                let offset = u16::from_le_bytes(buf[pos..pos + 2].try_into().expect("offset"));
                pos += 2;
                let mut len3 = usize::from(buf[pos]);
                pos += 1;
                if len3 == 0xFF {
                    len3 =
                        usize::from(u16::from_le_bytes(buf[pos..pos + 2].try_into().expect("len")));
                    pos += 2;
                    if len3 == 0 {
                        len3 = u32::from_le_bytes(buf[pos..pos + 4].try_into().expect("long len"))
                            as usize;
                        pos += 4;
                    }
                }

                // offset 0 only occurs in the end-of-stream item
                let high = if offset == 0 { 0 } else { offset.ilog2() };
                let symbol = 0x100 | (high as usize) << 4 | len3.min(0xF);
                debug_assert!(offset != 0 || symbol == STREAM_END);
                if !encoder.encode_symbol(symbol, &mut bstr) {
                    return 0;
                }
                if len3 >= 0xF {
                    if len3 - 0xF < 0xFF {
                        if !bstr.write_raw_u8((len3 - 0xF) as u8) {
                            return 0;
                        }
                    } else {
                        if !bstr.write_raw_u8(0xFF) {
                            return 0;
                        }
                        if len3 <= 0xFFFF {
                            if !bstr.write_raw_u16(len3 as u16) {
                                return 0;
                            }
                        } else if !bstr.write_raw_u16(0) || !bstr.write_raw_u32(len3 as u32) {
                            return 0;
                        }
                    }
                }
                let low = u32::from(offset) & ((1u32 << high) - 1);
                if !bstr.write_bits(low, high) {
                    return 0;
                }
            } else {
                if !encoder.encode_symbol(usize::from(buf[pos]), &mut bstr) {
                    return 0;
                }
                pos += 1;
            }
        }
    }
    bstr.finish()
}

/// A data-free chunk whose table gives the end-of-stream symbol a one-bit
/// code; the all-zero bitstream then decodes straight to it.
fn write_terminator_chunk(out: &mut [u8]) -> Result<usize, CompressError> {
    if out.len() < MIN_CHUNK {
        return Err(CompressError::BufferTooSmall);
    }
    out[..MIN_CHUNK].fill(0);
    out[STREAM_END >> 1] = 0x01;
    Ok(MIN_CHUNK)
}
