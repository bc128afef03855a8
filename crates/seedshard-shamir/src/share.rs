//! Mnemonic encoding and decoding of a single SLIP-39 share
//!
//! A share mnemonic packs a fixed 40-bit header, the share value and a
//! 3-word RS1024 checksum into 10-bit words:
//!
//! - identifier: 15 bits (common to every share of a set)
//! - extendable backup flag: 1 bit
//! - iteration exponent: 4 bits
//! - group index, group threshold - 1, group count - 1: 4 bits each
//! - member index, member threshold - 1: 4 bits each
//! - share value: left-padded with zero bits to a whole number of words
//! - checksum: 30 bits
//!
//! The smallest valid share (128-bit value) is 20 words.

use crate::rs1024;
use crate::wordlist::{self, RADIX_BITS};
use crate::ShamirError;
use serde::{Deserialize, Serialize};

const ID_LENGTH_BITS: usize = 15;
const ITERATION_EXP_LENGTH_BITS: usize = 4;

/// Header words plus checksum words.
const METADATA_LENGTH_WORDS: usize = 7;

/// Minimum mnemonic length: metadata plus a 128-bit share value.
pub const MIN_MNEMONIC_LENGTH_WORDS: usize = 20;

/// Number of leading words that identify a share's group (identifier,
/// exponent, group fields).
const GROUP_PREFIX_LENGTH_WORDS: usize = 3;

/// One decoded SLIP-39 share: the mnemonic header fields plus the raw
/// share value. Produced transiently during decode and combine; the
/// durable artifact is the mnemonic string itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slip39Share {
    /// Random 15-bit identifier, common across all shares of a set.
    pub identifier: u16,
    /// Extendable backup flag; changes checksum and KDF salt derivation.
    pub extendable: bool,
    /// PBKDF2 work factor exponent (0..=15).
    pub iteration_exponent: u8,
    /// Group index (0-based).
    pub group_index: u8,
    /// Number of groups required to recover the secret.
    pub group_threshold: u8,
    /// Total number of groups.
    pub group_count: u8,
    /// Member index within the group (0-based).
    pub member_index: u8,
    /// Number of member shares required to recover the group secret.
    pub member_threshold: u8,
    /// The share value (encrypted secret fragment).
    pub value: Vec<u8>,
}

impl Slip39Share {
    /// Encode the share as a mnemonic string.
    pub fn to_mnemonic(&self) -> String {
        let mut bits = Vec::with_capacity((self.value.len() * 8 / RADIX_BITS + 8) * RADIX_BITS);
        push_bits(&mut bits, self.identifier, ID_LENGTH_BITS);
        push_bits(&mut bits, u16::from(self.extendable), 1);
        push_bits(
            &mut bits,
            u16::from(self.iteration_exponent),
            ITERATION_EXP_LENGTH_BITS,
        );
        push_bits(&mut bits, u16::from(self.group_index), 4);
        push_bits(&mut bits, u16::from(self.group_threshold - 1), 4);
        push_bits(&mut bits, u16::from(self.group_count - 1), 4);
        push_bits(&mut bits, u16::from(self.member_index), 4);
        push_bits(&mut bits, u16::from(self.member_threshold - 1), 4);

        // Left-pad the value to a whole number of words.
        let padding = (RADIX_BITS - (self.value.len() * 8) % RADIX_BITS) % RADIX_BITS;
        push_bits(&mut bits, 0, padding);
        for &byte in &self.value {
            push_bits(&mut bits, u16::from(byte), 8);
        }
        debug_assert_eq!(bits.len() % RADIX_BITS, 0);

        let mut indices: Vec<u16> = bits.chunks(RADIX_BITS).map(bits_to_u16).collect();
        let checksum = rs1024::create_checksum(self.extendable, &indices);
        indices.extend_from_slice(&checksum);
        wordlist::indices_to_mnemonic(&indices)
    }

    /// Decode a mnemonic string into a share, verifying length, padding
    /// and checksum.
    pub fn from_mnemonic(mnemonic: &str) -> Result<Self, ShamirError> {
        let indices = wordlist::mnemonic_to_indices(mnemonic)?;
        if indices.len() < MIN_MNEMONIC_LENGTH_WORDS {
            return Err(ShamirError::MnemonicTooShort {
                words: indices.len(),
            });
        }
        // Share values are a whole number of 16-bit increments, so the
        // left padding can never reach a full byte.
        let padding = (RADIX_BITS * (indices.len() - METADATA_LENGTH_WORDS)) % 16;
        if padding > 8 {
            return Err(ShamirError::InvalidPadding {
                words: indices.len(),
            });
        }
        // The extendable flag selects the checksum customization string,
        // so it has to be peeked before verification: bit 4 of word 1.
        let extendable = (indices[1] >> 4) & 1 == 1;
        if !rs1024::verify_checksum(extendable, &indices) {
            return Err(ShamirError::InvalidChecksum {
                prefix: prefix_words(mnemonic),
            });
        }

        let data = &indices[..indices.len() - rs1024::CHECKSUM_WORDS];
        let mut bits = Vec::with_capacity(data.len() * RADIX_BITS);
        for &index in data {
            push_bits(&mut bits, index, RADIX_BITS);
        }

        let identifier = bits_to_u16(&bits[0..15]);
        let iteration_exponent = bits_to_u8(&bits[16..20]);
        let group_index = bits_to_u8(&bits[20..24]);
        let group_threshold = bits_to_u8(&bits[24..28]) + 1;
        let group_count = bits_to_u8(&bits[28..32]) + 1;
        let member_index = bits_to_u8(&bits[32..36]);
        let member_threshold = bits_to_u8(&bits[36..40]) + 1;
        if group_count < group_threshold {
            return Err(ShamirError::GroupCountInconsistent {
                group_count,
                group_threshold,
            });
        }

        if bits[40..40 + padding].iter().any(|&bit| bit) {
            return Err(ShamirError::InvalidPadding {
                words: indices.len(),
            });
        }
        let value = bits[40 + padding..].chunks(8).map(bits_to_u8).collect();

        Ok(Slip39Share {
            identifier,
            extendable,
            iteration_exponent,
            group_index,
            group_threshold,
            group_count,
            member_index,
            member_threshold,
            value,
        })
    }

    /// The leading words shared by every mnemonic of this share's group,
    /// used to identify a group in error messages.
    pub fn group_prefix(&self) -> String {
        let mnemonic = self.to_mnemonic();
        prefix_words(&mnemonic)
    }
}

fn prefix_words(mnemonic: &str) -> String {
    let words: Vec<&str> = mnemonic
        .split_whitespace()
        .take(GROUP_PREFIX_LENGTH_WORDS)
        .collect();
    words.join(" ")
}

/// Append `count` bits of `value` to the bit vector, most significant
/// first.
fn push_bits(bits: &mut Vec<bool>, value: u16, count: usize) {
    for i in (0..count).rev() {
        bits.push((value >> i) & 1 != 0);
    }
}

fn bits_to_u16(bits: &[bool]) -> u16 {
    bits.iter().fold(0, |acc, &bit| (acc << 1) | u16::from(bit))
}

fn bits_to_u8(bits: &[bool]) -> u8 {
    bits_to_u16(bits) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_share() -> Slip39Share {
        Slip39Share {
            identifier: 0x1d2f,
            extendable: true,
            iteration_exponent: 2,
            group_index: 1,
            group_threshold: 2,
            group_count: 3,
            member_index: 4,
            member_threshold: 3,
            value: vec![0xab; 16],
        }
    }

    #[test]
    fn test_reference_mnemonic_roundtrip() {
        // Encoding test vector from the SLIP-0039 reference (classic,
        // non-extendable share).
        let m = "duckling enlarge academic academic agency result length solution fridge \
                 kidney coal piece deal husband erode duke ajar critical decision keyboard";
        let share = Slip39Share::from_mnemonic(m).unwrap();
        assert!(!share.extendable);
        assert_eq!(share.iteration_exponent, 0);
        assert_eq!(share.group_threshold, 1);
        assert_eq!(share.member_threshold, 1);
        assert_eq!(share.value.len(), 16);
        assert_eq!(share.to_mnemonic(), m);
    }

    #[test]
    fn test_reference_mnemonic_bad_checksum() {
        let m = "duckling enlarge academic academic agency result length solution fridge \
                 kidney coal piece deal husband erode duke ajar critical decision kidney";
        assert!(matches!(
            Slip39Share::from_mnemonic(m),
            Err(ShamirError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn test_synthetic_roundtrip() {
        let mut share = sample_share();
        for (extendable, value_len) in [(true, 16), (false, 16), (true, 32), (false, 20)] {
            share.extendable = extendable;
            share.value = (0..value_len as u8).collect();
            let decoded = Slip39Share::from_mnemonic(&share.to_mnemonic()).unwrap();
            assert_eq!(decoded, share);
        }
    }

    #[test]
    fn test_mnemonic_word_counts() {
        let mut share = sample_share();
        assert_eq!(share.to_mnemonic().split(' ').count(), 20);
        share.value = vec![0; 32];
        assert_eq!(share.to_mnemonic().split(' ').count(), 33);
    }

    #[test]
    fn test_unknown_word() {
        let m = "duckling enlarge bitcoin academic agency result length solution fridge \
                 kidney coal piece deal husband erode duke ajar critical decision keyboard";
        assert!(matches!(
            Slip39Share::from_mnemonic(m),
            Err(ShamirError::InvalidWord { word }) if word == "bitcoin"
        ));
    }

    #[test]
    fn test_too_short() {
        let m = vec!["academic"; 19].join(" ");
        assert!(matches!(
            Slip39Share::from_mnemonic(&m),
            Err(ShamirError::MnemonicTooShort { words: 19 })
        ));
    }

    #[test]
    fn test_invalid_length_padding() {
        // 21 words imply 12 bits of padding, which is over the 8-bit cap;
        // this is checked before the checksum.
        let m = vec!["academic"; 21].join(" ");
        assert!(matches!(
            Slip39Share::from_mnemonic(&m),
            Err(ShamirError::InvalidPadding { words: 21 })
        ));
    }

    #[test]
    fn test_group_count_below_threshold_rejected() {
        let mut share = sample_share();
        share.group_threshold = 3;
        share.group_count = 2;
        // encode does not validate, decode must
        assert!(matches!(
            Slip39Share::from_mnemonic(&share.to_mnemonic()),
            Err(ShamirError::GroupCountInconsistent {
                group_count: 2,
                group_threshold: 3
            })
        ));
    }

    #[test]
    fn test_single_word_substitution_detected() {
        let share = sample_share();
        let mnemonic = share.to_mnemonic();
        let words: Vec<&str> = mnemonic.split(' ').collect();
        for i in 0..words.len() {
            let mut corrupt = words.clone();
            corrupt[i] = if corrupt[i] == "academic" {
                "zero"
            } else {
                "academic"
            };
            assert!(
                Slip39Share::from_mnemonic(&corrupt.join(" ")).is_err(),
                "substitution at word {} undetected",
                i
            );
        }
    }

    #[test]
    fn test_group_prefix_is_three_words() {
        let share = sample_share();
        let prefix = share.group_prefix();
        assert_eq!(prefix.split(' ').count(), 3);
        assert!(share.to_mnemonic().starts_with(&prefix));
    }

    #[test]
    fn test_serde_roundtrip() {
        let share = sample_share();
        let json = serde_json::to_string(&share).unwrap();
        assert_eq!(serde_json::from_str::<Slip39Share>(&json).unwrap(), share);
    }
}
