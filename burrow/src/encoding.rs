//! Reversible text encoding for query-label transport.
//!
//! Query labels survive only a restricted character set, so every binary
//! payload crosses the channel through a 64-symbol alphabet with `=`
//! padding, three bytes to four symbols.

use crate::{BurrowError, Result};

const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const PAD: u8 = b'=';

/// How [`decode_with`] treats symbols outside the alphabet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SymbolPolicy {
    /// Reject the whole input.
    #[default]
    Strict,
    /// Map unknown symbols to alphabet index zero and keep going.
    Forgiving,
}

/// Encodes arbitrary bytes; output length is always `4 * ceil(n / 3)`.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for block in data.chunks(3) {
        let b0 = u32::from(block[0]);
        let b1 = u32::from(block.get(1).copied().unwrap_or(0));
        let b2 = u32::from(block.get(2).copied().unwrap_or(0));
        let triple = (b0 << 16) | (b1 << 8) | b2;

        out.push(ALPHABET[(triple >> 18 & 0x3f) as usize] as char);
        out.push(ALPHABET[(triple >> 12 & 0x3f) as usize] as char);
        out.push(if block.len() > 1 {
            ALPHABET[(triple >> 6 & 0x3f) as usize] as char
        } else {
            PAD as char
        });
        out.push(if block.len() > 2 {
            ALPHABET[(triple & 0x3f) as usize] as char
        } else {
            PAD as char
        });
    }
    out
}

/// Decodes with [`SymbolPolicy::Strict`].
pub fn decode(input: &str) -> Result<Vec<u8>> {
    decode_with(input, SymbolPolicy::Strict)
}

/// Decodes a string produced by [`encode`].
///
/// Input length must be a positive multiple of four; zero, one, or two
/// trailing pad symbols are accepted and shorten the output accordingly.
pub fn decode_with(input: &str, policy: SymbolPolicy) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(BurrowError::InvalidEncoding(format!(
            "length {} is not a positive multiple of 4",
            bytes.len()
        )));
    }

    let pad = bytes.iter().rev().take_while(|&&b| b == PAD).count();
    if pad > 2 {
        return Err(BurrowError::InvalidEncoding(
            "more than two trailing pad symbols".into(),
        ));
    }

    let out_len = bytes.len() / 4 * 3 - pad;
    let mut out = Vec::with_capacity(out_len);

    for (pos, &sym) in bytes.iter().enumerate() {
        if sym == PAD && pos < bytes.len() - pad {
            return Err(BurrowError::InvalidEncoding(format!(
                "pad symbol inside input at offset {pos}"
            )));
        }
    }

    for quad in bytes.chunks(4) {
        let mut triple = 0u32;
        for &sym in quad {
            let index = if sym == PAD {
                0
            } else {
                match symbol_index(sym) {
                    Some(v) => v,
                    None => match policy {
                        SymbolPolicy::Strict => {
                            return Err(BurrowError::InvalidEncoding(format!(
                                "symbol {:?} outside alphabet",
                                sym as char
                            )))
                        }
                        SymbolPolicy::Forgiving => 0,
                    },
                }
            };
            triple = (triple << 6) | index;
        }

        for shift in [16u32, 8, 0] {
            if out.len() < out_len {
                out.push((triple >> shift) as u8);
            }
        }
    }

    Ok(out)
}

fn symbol_index(sym: u8) -> Option<u32> {
    match sym {
        b'A'..=b'Z' => Some(u32::from(sym - b'A')),
        b'a'..=b'z' => Some(u32::from(sym - b'a') + 26),
        b'0'..=b'9' => Some(u32::from(sym - b'0') + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_across_pad_widths() {
        // 1..=9 byte inputs cover all three padding cases.
        for len in 1..=9usize {
            let data: Vec<u8> = (0..len as u8).map(|b| b.wrapping_mul(41)).collect();
            let encoded = encode(&data);
            assert_eq!(encoded.len(), data.len().div_ceil(3) * 4);
            assert_eq!(decode(&encoded).unwrap(), data);
        }
    }

    #[test]
    fn round_trips_every_byte_value() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(decode(&encode(&data)).unwrap(), data);
    }

    #[test]
    fn known_vectors() {
        assert_eq!(encode(b"pwd"), "cHdk");
        assert_eq!(encode(b"f"), "Zg==");
        assert_eq!(encode(b"fo"), "Zm8=");
        assert_eq!(encode(b"foo"), "Zm9v");
        assert_eq!(decode("Zm9vYmFy").unwrap(), b"foobar");
    }

    #[test]
    fn empty_input_encodes_but_does_not_decode() {
        assert_eq!(encode(b""), "");
        assert!(matches!(
            decode("").unwrap_err(),
            BurrowError::InvalidEncoding(_)
        ));
    }

    #[test]
    fn rejects_length_not_multiple_of_four() {
        for bad in ["Z", "Zg", "Zg=", "Zm9vY"] {
            assert!(matches!(
                decode(bad).unwrap_err(),
                BurrowError::InvalidEncoding(_)
            ));
        }
    }

    #[test]
    fn rejects_interior_pad() {
        assert!(decode("Zg==Zg==").is_err());
        assert!(decode("Z=g=").is_err());
    }

    // The strict policy is the default; the forgiving one reproduces the
    // historical substitute-with-zero reading of unknown symbols.
    #[test]
    fn strict_rejects_symbols_outside_alphabet() {
        assert!(matches!(
            decode("Zm9*").unwrap_err(),
            BurrowError::InvalidEncoding(_)
        ));
    }

    #[test]
    fn forgiving_substitutes_zero_for_unknown_symbols() {
        let loose = decode_with("Zm9*", SymbolPolicy::Forgiving).unwrap();
        let exact = decode("Zm9A").unwrap();
        assert_eq!(loose, exact);
    }
}
