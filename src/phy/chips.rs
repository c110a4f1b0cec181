// Direct-sequence spreading for the 2.4 GHz O-QPSK PHY.
// Each 4-bit symbol selects one of 16 quasi-orthogonal 32-chip PN sequences.

use num_complex::Complex32;

use crate::utils::consts::CHIPS_PER_SYMBOL;

/// PN sequences, chip c0 in the most significant bit.
const CHIP_TABLE: [u32; 16] = [
    0xD9C3_522E,
    0xED9C_3522,
    0x2ED9_C352,
    0x22ED_9C35,
    0x522E_D9C3,
    0x3522_ED9C,
    0xC352_2ED9,
    0x9C35_22ED,
    0x8C96_077B,
    0xB8C9_6077,
    0x7B8C_9607,
    0x77B8_C960,
    0x077B_8C96,
    0x6077_B8C9,
    0x9607_7B8C,
    0xC960_77B8,
];

/// Chips compared in a symbol decision. The first demodulated chip depends
/// on the previous symbol and the last one is the most timing sensitive.
pub const DECISION_MASK: u32 = 0x7FFF_FFFE;

/// Chip sequence as seen after the quadrature demodulator.
///
/// The phase derivative of half-sine O-QPSK is an MSK stream: chip `m` is
/// `c[m-1] ^ c[m]`, inverted on odd positions. `prev_chip` is the last chip
/// of the preceding symbol.
const fn demodulated_word(chips: u32, prev_chip: bool) -> u32 {
    let mut word = 0u32;
    let mut m = 0;
    while m < CHIPS_PER_SYMBOL {
        let cur = (chips >> (31 - m)) & 1;
        let prev = if m == 0 {
            prev_chip as u32
        } else {
            (chips >> (32 - m)) & 1
        };
        let bit = (cur ^ prev) ^ (m as u32 & 1);
        word |= bit << (31 - m);
        m += 1;
    }
    word
}

const fn demodulated_table() -> [u32; 16] {
    let mut table = [0u32; 16];
    let mut i = 0;
    while i < 16 {
        table[i] = demodulated_word(CHIP_TABLE[i], false);
        i += 1;
    }
    table
}

const DEMOD_TABLE: [u32; 16] = demodulated_table();

/// Maps symbols to chip sequences and back.
pub struct ChipSpreader;

impl ChipSpreader {
    /// PN sequence of `symbol` as a bit word, c0 first (MSB).
    pub fn chip_word(symbol: u8) -> u32 {
        CHIP_TABLE[(symbol & 0x0F) as usize]
    }

    /// 32 unit-magnitude chips. Even chips ride the I rail (±1), odd chips
    /// the Q rail (±j).
    pub fn spread(symbol: u8) -> [Complex32; CHIPS_PER_SYMBOL] {
        let word = Self::chip_word(symbol);
        let mut chips = [Complex32::new(0.0, 0.0); CHIPS_PER_SYMBOL];
        for (k, chip) in chips.iter_mut().enumerate() {
            let level = if (word >> (31 - k)) & 1 == 1 { 1.0 } else { -1.0 };
            *chip = if k % 2 == 0 {
                Complex32::new(level, 0.0)
            } else {
                Complex32::new(0.0, level)
            };
        }
        chips
    }

    /// The 16 I/Q chip pairs `c[2k] + j·c[2k+1]` fed to the pulse shaper.
    pub fn quadrature_chips(symbol: u8) -> [Complex32; CHIPS_PER_SYMBOL / 2] {
        let rails = Self::spread(symbol);
        let mut pairs = [Complex32::new(0.0, 0.0); CHIPS_PER_SYMBOL / 2];
        for (pair, rail) in pairs.iter_mut().zip(rails.chunks_exact(2)) {
            *pair = rail[0] + rail[1];
        }
        pairs
    }

    /// Chip word the receiver expects for `symbol` after demodulation.
    pub fn msk_word(symbol: u8, prev_chip: bool) -> u32 {
        demodulated_word(Self::chip_word(symbol), prev_chip)
    }

    /// Last PN chip of `symbol`, the `prev_chip` of whatever follows it.
    pub fn last_chip(symbol: u8) -> bool {
        Self::chip_word(symbol) & 1 == 1
    }

    /// Closest symbol to a received chip word and its chip error count.
    /// `None` when even the best match has `threshold` or more errors.
    pub fn decode_word(word: u32, threshold: u32) -> Option<(u8, u32)> {
        let (symbol, errors) = DEMOD_TABLE
            .iter()
            .enumerate()
            .map(|(i, expected)| (i as u8, ((word ^ expected) & DECISION_MASK).count_ones()))
            .min_by_key(|&(_, errors)| errors)?;
        (errors < threshold).then_some((symbol, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::consts::CHIP_THRESHOLD;

    fn correlate(a: &[Complex32], b: &[Complex32]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| x * y.conj())
            .sum::<Complex32>()
            .norm()
            / a.len() as f32
    }

    #[test]
    fn test_spread_unit_magnitude() {
        for s in 0..16u8 {
            let chips = ChipSpreader::spread(s);
            assert_eq!(chips.len(), 32);
            for c in chips.iter() {
                assert!((c.norm() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_symbol_zero_matches_standard() {
        // 1101 1001 1100 0011 0101 0010 0010 1110
        let chips = ChipSpreader::spread(0);
        let expected = [1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0];
        for (k, level) in expected.iter().enumerate() {
            let value = if k % 2 == 0 { chips[k].re } else { chips[k].im };
            assert_eq!(value, *level, "chip {}", k);
        }
    }

    #[test]
    fn test_cross_correlation() {
        for a in 0..16u8 {
            let sa = ChipSpreader::spread(a);
            assert!((correlate(&sa, &sa) - 1.0).abs() < 1e-6);
            for b in 0..16u8 {
                if a != b {
                    let sb = ChipSpreader::spread(b);
                    assert!(correlate(&sa, &sb) < 0.5, "symbols {} and {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_decision_distinguishes_all_symbols() {
        for a in 0..16u8 {
            let word = ChipSpreader::msk_word(a, true);
            assert_eq!(ChipSpreader::decode_word(word, CHIP_THRESHOLD), Some((a, 0)));
            for b in 0..16u8 {
                if a != b {
                    let other = ChipSpreader::msk_word(b, false);
                    let errors = ((word ^ other) & DECISION_MASK).count_ones();
                    assert!(errors >= CHIP_THRESHOLD, "symbols {} and {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_decode_tolerates_chip_errors() {
        let word = ChipSpreader::msk_word(9, false) ^ 0x0100_0110;
        assert_eq!(ChipSpreader::decode_word(word, CHIP_THRESHOLD), Some((9, 3)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(ChipSpreader::decode_word(0x5555_5555, 2), None);
    }

    #[test]
    fn test_quadrature_pairs() {
        let pairs = ChipSpreader::quadrature_chips(0);
        assert_eq!(pairs[0], Complex32::new(1.0, 1.0));
        assert_eq!(pairs[1], Complex32::new(-1.0, 1.0));
        assert_eq!(pairs[2], Complex32::new(1.0, -1.0));
    }
}
