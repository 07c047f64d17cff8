use crate::bitstream::OutputBitstream;
use crate::SYMBOLS;

/// No code may be longer than this; the chunk header stores lengths as
/// 4-bit nibbles and the decoder's peek window is 15 bits wide.
pub const MAX_CODE_LENGTH: u8 = 15;

/// Canonical Huffman encoder over the 512-symbol chunk alphabet.
///
/// Code lengths come from a boundary package-merge over the used symbols,
/// so they are optimal among length-limited codes and never need a
/// separate overflow fix-up. Code values are canonical in Xpress order:
/// symbols sorted by `(length, symbol)` get consecutive values, shifted
/// left whenever the length steps up.
pub struct HuffmanEncoder {
    codes: [u16; SYMBOLS],
    lengths: [u8; SYMBOLS],
}

impl HuffmanEncoder {
    pub fn build(counts: &[u32; SYMBOLS]) -> Self {
        let lengths = limited_lengths(counts);
        let codes = canonical_codes(&lengths);
        HuffmanEncoder { codes, lengths }
    }

    /// Code length per symbol; 0 marks an unused symbol.
    pub fn lengths(&self) -> &[u8; SYMBOLS] {
        &self.lengths
    }

    /// Append the code for |symbol| to |bstr|, most significant bit first.
    pub fn encode_symbol(&self, symbol: usize, bstr: &mut OutputBitstream<'_>) -> bool {
        debug_assert!(self.lengths[symbol] > 0, "symbol {symbol:#x} has no code");
        bstr.write_bits(
            u32::from(self.codes[symbol]),
            u32::from(self.lengths[symbol]),
        )
    }
}

/// A node of one package-merge list: either an original symbol or a package
/// of two adjacent nodes from the previous list.
enum Item {
    Leaf(u16),
    Package(usize),
}

struct Node {
    weight: u64,
    item: Item,
}

/// Length-limited code lengths by boundary package-merge.
///
/// One list is built per admissible code length; each list merges the
/// leaves with packages of adjacent pairs from the previous list, keeping
/// weights sorted (leaves win ties, which also makes the result a pure
/// function of the histogram). A symbol's length is the number of nodes
/// referring to it among the first `2n - 2` of the deepest list.
fn limited_lengths(counts: &[u32; SYMBOLS]) -> [u8; SYMBOLS] {
    let mut lengths = [0u8; SYMBOLS];
    let mut leaves: Vec<(u64, u16)> = counts
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(symbol, &count)| (u64::from(count), symbol as u16))
        .collect();
    match leaves.len() {
        0 => return lengths,
        1 => {
            // A lone symbol still needs a code the decoder can read.
            lengths[usize::from(leaves[0].1)] = 1;
            return lengths;
        }
        _ => {}
    }
    leaves.sort_unstable();

    let mut levels: Vec<Vec<Node>> = Vec::with_capacity(usize::from(MAX_CODE_LENGTH));
    levels.push(
        leaves
            .iter()
            .map(|&(weight, symbol)| Node {
                weight,
                item: Item::Leaf(symbol),
            })
            .collect(),
    );
    for _ in 1..MAX_CODE_LENGTH {
        let prev = levels.last().expect("at least one list");
        let mut merged = Vec::with_capacity(leaves.len() + prev.len() / 2);
        let mut leaf = 0;
        let mut pack = 0;
        while leaf < leaves.len() || 2 * pack + 1 < prev.len() {
            let take_leaf = if leaf >= leaves.len() {
                false
            } else if 2 * pack + 1 >= prev.len() {
                true
            } else {
                leaves[leaf].0 <= prev[2 * pack].weight + prev[2 * pack + 1].weight
            };
            if take_leaf {
                merged.push(Node {
                    weight: leaves[leaf].0,
                    item: Item::Leaf(leaves[leaf].1),
                });
                leaf += 1;
            } else {
                merged.push(Node {
                    weight: prev[2 * pack].weight + prev[2 * pack + 1].weight,
                    item: Item::Package(pack),
                });
                pack += 1;
            }
        }
        levels.push(merged);
    }

    let take = 2 * leaves.len() - 2;
    let mut stack: Vec<(usize, usize)> = (0..take).map(|i| (levels.len() - 1, i)).collect();
    while let Some((level, index)) = stack.pop() {
        match levels[level][index].item {
            Item::Leaf(symbol) => lengths[usize::from(symbol)] += 1,
            Item::Package(pack) => {
                stack.push((level - 1, 2 * pack));
                stack.push((level - 1, 2 * pack + 1));
            }
        }
    }
    lengths
}

fn canonical_codes(lengths: &[u8; SYMBOLS]) -> [u16; SYMBOLS] {
    let mut order: Vec<u16> = (0..SYMBOLS as u16)
        .filter(|&symbol| lengths[usize::from(symbol)] > 0)
        .collect();
    order.sort_unstable_by_key(|&symbol| (lengths[usize::from(symbol)], symbol));

    let mut codes = [0u16; SYMBOLS];
    let mut code = 0u16;
    let mut prev_len = 0u8;
    for &symbol in &order {
        let len = lengths[usize::from(symbol)];
        code <<= len - prev_len;
        codes[usize::from(symbol)] = code;
        code += 1;
        prev_len = len;
    }
    codes
}
