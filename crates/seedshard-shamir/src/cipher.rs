//! Passphrase encryption of the master secret
//!
//! SLIP-39 encrypts the master secret with a 4-round Feistel network
//! before splitting it. The round function is PBKDF2-HMAC-SHA256 keyed by
//! the round index and the passphrase, salted with the share set's
//! identifier (classic backups) or nothing (extendable backups) plus the
//! running right half.
//!
//! Decryption is the same network with the round order reversed, so a
//! wrong passphrase silently yields a different secret rather than an
//! error. The empty passphrase is the canonical "no passphrase".

use crate::ShamirError;
use hmac::Hmac;
use sha2::Sha256;
use zeroize::Zeroize;

/// Number of Feistel rounds.
const ROUND_COUNT: u8 = 4;

/// Total PBKDF2 iterations at iteration exponent 0, spread over the
/// rounds.
const BASE_ITERATION_COUNT: u32 = 10_000;

/// Salt prefix for non-extendable backups.
const CUSTOMIZATION_STRING: &[u8] = b"shamir";

/// Largest encodable iteration exponent (4-bit field).
pub const MAX_ITERATION_EXPONENT: u8 = 15;

/// Encrypt a master secret with a passphrase.
///
/// The passphrase must be printable ASCII (0x20..=0x7e); this is only
/// enforced at generation time so that anything a user managed to type
/// during backup can still be entered during recovery.
pub fn encrypt(
    master_secret: &[u8],
    passphrase: &str,
    iteration_exponent: u8,
    identifier: u16,
    extendable: bool,
) -> Result<Vec<u8>, ShamirError> {
    if passphrase.bytes().any(|b| !(0x20..=0x7e).contains(&b)) {
        return Err(ShamirError::InvalidPassphraseCharset);
    }
    feistel(
        master_secret,
        passphrase,
        iteration_exponent,
        identifier,
        extendable,
        [0, 1, 2, 3],
    )
}

/// Decrypt an encrypted master secret with a passphrase.
///
/// Accepts arbitrary passphrases; recovery with the wrong one succeeds
/// and returns a different secret.
pub fn decrypt(
    encrypted_secret: &[u8],
    passphrase: &str,
    iteration_exponent: u8,
    identifier: u16,
    extendable: bool,
) -> Result<Vec<u8>, ShamirError> {
    feistel(
        encrypted_secret,
        passphrase,
        iteration_exponent,
        identifier,
        extendable,
        [3, 2, 1, 0],
    )
}

/// Run the Feistel network over `input` in the given round order.
fn feistel(
    input: &[u8],
    passphrase: &str,
    iteration_exponent: u8,
    identifier: u16,
    extendable: bool,
    rounds: [u8; ROUND_COUNT as usize],
) -> Result<Vec<u8>, ShamirError> {
    if input.is_empty() || input.len() % 2 != 0 {
        return Err(ShamirError::InvalidSecretLength {
            length: input.len(),
        });
    }
    if iteration_exponent > MAX_ITERATION_EXPONENT {
        return Err(ShamirError::InvalidConfiguration(format!(
            "iteration exponent {} exceeds the maximum of {}",
            iteration_exponent, MAX_ITERATION_EXPONENT
        )));
    }

    let half = input.len() / 2;
    let mut left = input[..half].to_vec();
    let mut right = input[half..].to_vec();
    let salt = salt_prefix(identifier, extendable);
    let iterations = (BASE_ITERATION_COUNT << iteration_exponent) / u32::from(ROUND_COUNT);

    let mut f = vec![0u8; half];
    for round in rounds {
        let mut key = Vec::with_capacity(1 + passphrase.len());
        key.push(round);
        key.extend_from_slice(passphrase.as_bytes());

        let mut round_salt = Vec::with_capacity(salt.len() + half);
        round_salt.extend_from_slice(&salt);
        round_salt.extend_from_slice(&right);

        pbkdf2::pbkdf2::<Hmac<Sha256>>(&key, &round_salt, iterations, &mut f)
            .expect("HMAC can be initialized with any key length");
        key.zeroize();

        for (l, &fb) in left.iter_mut().zip(&f) {
            *l ^= fb;
        }
        std::mem::swap(&mut left, &mut right);
    }
    f.zeroize();

    // Output is right || left, undoing the final swap.
    let mut output = right;
    output.append(&mut left);
    Ok(output)
}

/// Salt prefix for the round function: empty for extendable backups,
/// otherwise the customization string followed by the big-endian 15-bit
/// identifier.
fn salt_prefix(identifier: u16, extendable: bool) -> Vec<u8> {
    if extendable {
        Vec::new()
    } else {
        let mut salt = CUSTOMIZATION_STRING.to_vec();
        salt.extend_from_slice(&identifier.to_be_bytes());
        salt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: u16 = 0x1337;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let secret = b"master secret 16";
        for extendable in [false, true] {
            let encrypted = encrypt(secret, "passphrase", 0, ID, extendable).unwrap();
            assert_ne!(encrypted.as_slice(), secret);
            let decrypted = decrypt(&encrypted, "passphrase", 0, ID, extendable).unwrap();
            assert_eq!(decrypted.as_slice(), secret);
        }
    }

    #[test]
    fn test_wrong_passphrase_changes_output() {
        let secret = vec![7u8; 16];
        let encrypted = encrypt(&secret, "p1", 0, ID, true).unwrap();
        let decrypted = decrypt(&encrypted, "p2", 0, ID, true).unwrap();
        assert_ne!(decrypted, secret);
    }

    #[test]
    fn test_identifier_binds_classic_but_not_extendable() {
        let secret = vec![9u8; 16];
        let classic_a = encrypt(&secret, "", 0, 1, false).unwrap();
        let classic_b = encrypt(&secret, "", 0, 2, false).unwrap();
        assert_ne!(classic_a, classic_b);

        let ext_a = encrypt(&secret, "", 0, 1, true).unwrap();
        let ext_b = encrypt(&secret, "", 0, 2, true).unwrap();
        assert_eq!(ext_a, ext_b);
    }

    #[test]
    fn test_passphrase_charset_enforced_on_encrypt_only() {
        let secret = vec![1u8; 16];
        assert!(matches!(
            encrypt(&secret, "über", 0, ID, true),
            Err(ShamirError::InvalidPassphraseCharset)
        ));
        // recovery accepts anything the user types
        assert!(decrypt(&secret, "über", 0, ID, true).is_ok());
    }

    #[test]
    fn test_odd_length_rejected() {
        assert!(matches!(
            encrypt(&[0u8; 15], "", 0, ID, true),
            Err(ShamirError::InvalidSecretLength { length: 15 })
        ));
    }

    #[test]
    fn test_iteration_exponent_bounds() {
        assert!(matches!(
            encrypt(&[0u8; 16], "", 16, ID, true),
            Err(ShamirError::InvalidConfiguration(_))
        ));
    }
}
