//! Seedshard Shamir Module
//!
//! Split and recover master secrets as SLIP-0039 mnemonic shares.
//!
//! The engine implements the full SLIP-39 construction: a two-level
//! Shamir split (groups, then members within each group) over GF(256),
//! passphrase encryption of the master secret through a 4-round Feistel
//! network keyed by PBKDF2-HMAC-SHA256, and mnemonic encoding with an
//! RS1024 checksum. Share values, checksums and decrypted secrets are
//! byte-for-byte compatible with the standard and with hardware-wallet
//! firmware.
//!
//! All operations are pure, synchronous functions of their inputs; the
//! only shared resource is the thread CSPRNG used for share randomness
//! and identifier generation.
//!
//! # Example: split a 128-bit secret 2-of-3
//!
//! ```
//! use seedshard_shamir::{combine_mnemonics, generate_shares, Slip39Config};
//!
//! let master_secret = vec![0x42u8; 16];
//!
//! // Single group, any 2 of 3 shares recover
//! let config = Slip39Config::two_of_three();
//! let slip39 = generate_shares(&master_secret, &config).unwrap();
//!
//! let mnemonics = slip39.mnemonics();
//! assert_eq!(mnemonics.len(), 3);
//!
//! let recovered = combine_mnemonics(&mnemonics[0..2], "").unwrap();
//! assert_eq!(recovered, master_secret);
//! ```

pub mod cipher;
pub mod gf256;
pub mod rs1024;
pub mod shamir;
pub mod share;
pub mod slip39;
pub mod wordlist;

// Re-exports
pub use shamir::{interpolate, recover_secret, split_secret, Share};
pub use share::Slip39Share;
pub use slip39::{combine_mnemonics, generate_shares, GroupSpec, Slip39, Slip39Config, Slip39Node};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShamirError {
    #[error("master secret must be an even number of bytes, at least 16 (got {length})")]
    InvalidSecretLength { length: usize },
    #[error("invalid threshold {threshold} for {share_count} shares")]
    InvalidThreshold { threshold: u8, share_count: u8 },
    #[error("cannot create {share_count} shares, the maximum is 16")]
    TooManyShares { share_count: u8 },
    #[error("shares have inconsistent lengths (expected {expected}, got {actual})")]
    InconsistentShareLength { expected: usize, actual: usize },
    #[error("share digest verification failed")]
    DigestMismatch,
    #[error("mnemonic has {words} words, need at least 20")]
    MnemonicTooShort { words: usize },
    #[error("checksum failed for the mnemonic starting with \"{prefix} ...\"")]
    InvalidChecksum { prefix: String },
    #[error("mnemonic of {words} words has invalid padding")]
    InvalidPadding { words: usize },
    #[error("mnemonic declares {group_count} groups with a group threshold of {group_threshold}")]
    GroupCountInconsistent {
        group_count: u8,
        group_threshold: u8,
    },
    #[error("mnemonics have inconsistent {field}")]
    InconsistentHeader { field: &'static str },
    #[error(
        "wrong number of member shares: expected {required} mnemonics starting with \
         \"{prefix} ...\", got {provided}"
    )]
    InsufficientMemberShares {
        required: u8,
        provided: u8,
        prefix: String,
    },
    #[error("expected mnemonics from {required} groups, got {provided}")]
    InsufficientGroups { required: u8, provided: u8 },
    #[error("unknown mnemonic word \"{word}\"")]
    InvalidWord { word: String },
    #[error("passphrase must only contain printable ASCII characters")]
    InvalidPassphraseCharset,
    #[error("invalid share configuration: {0}")]
    InvalidConfiguration(String),
}
