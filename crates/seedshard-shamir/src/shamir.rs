//! Shamir's Secret Sharing over GF(256), SLIP-39 construction
//!
//! Splits a secret into N shares of which any M reconstruct it. Unlike a
//! plain Shamir split, SLIP-39 reserves two polynomial points: the secret
//! sits at x = 255 and a digest share at x = 254 whose first four bytes
//! are an HMAC-SHA256 over the recovered secret. Recovery recomputes the
//! digest and rejects inconsistent or insufficient shares instead of
//! silently returning garbage.

use crate::gf256::{gf_div, gf_mul};
use crate::ShamirError;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

/// Reserved x-coordinate of the digest share.
pub const DIGEST_INDEX: u8 = 254;

/// Reserved x-coordinate of the shared secret.
pub const SECRET_INDEX: u8 = 255;

/// Maximum number of shares in one split (share indices are 4 bits).
pub const MAX_SHARE_COUNT: u8 = 16;

const DIGEST_LENGTH_BYTES: usize = 4;

type HmacSha256 = Hmac<Sha256>;

/// A single share of a split secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// x-coordinate of the share (0..16 for member shares).
    pub index: u8,
    /// Share value, same length as the split secret.
    pub data: Vec<u8>,
}

/// Evaluate at `x` the polynomial defined byte-wise by `shares`.
///
/// If `x` is the index of one of the shares, its value is returned
/// directly; this is how specific share indices are re-derived without
/// any field arithmetic. Otherwise each output byte is the Lagrange
/// interpolation of the corresponding input bytes.
pub fn interpolate(shares: &[Share], x: u8) -> Result<Vec<u8>, ShamirError> {
    if shares.is_empty() {
        return Err(ShamirError::InvalidConfiguration(
            "interpolation needs at least one share".into(),
        ));
    }
    let mut seen = [false; 256];
    for share in shares {
        if seen[share.index as usize] {
            return Err(ShamirError::InvalidConfiguration(format!(
                "duplicate share index {}",
                share.index
            )));
        }
        seen[share.index as usize] = true;
    }
    let len = shares[0].data.len();
    if let Some(bad) = shares.iter().find(|s| s.data.len() != len) {
        return Err(ShamirError::InconsistentShareLength {
            expected: len,
            actual: bad.data.len(),
        });
    }
    if let Some(share) = shares.iter().find(|s| s.index == x) {
        return Ok(share.data.clone());
    }

    let mut result = vec![0u8; len];
    for si in shares {
        // Lagrange basis L_i(x) = prod_{j != i} (x - x_j) / (x_i - x_j),
        // subtraction being XOR in a field of characteristic 2.
        let mut basis = 1u8;
        for sj in shares {
            if sj.index != si.index {
                basis = gf_mul(basis, gf_div(x ^ sj.index, si.index ^ sj.index));
            }
        }
        for (r, &y) in result.iter_mut().zip(&si.data) {
            *r ^= gf_mul(basis, y);
        }
    }
    Ok(result)
}

/// Split `secret` into `share_count` shares, any `threshold` of which
/// recover it.
///
/// For `threshold == 1` every share is a plain copy of the secret and no
/// digest is involved. Otherwise `threshold - 2` shares are random, and
/// the remaining shares are derived by interpolating through the random
/// shares, the digest share and the secret.
pub fn split_secret(
    threshold: u8,
    share_count: u8,
    secret: &[u8],
) -> Result<Vec<Share>, ShamirError> {
    if threshold == 0 || threshold > share_count {
        return Err(ShamirError::InvalidThreshold {
            threshold,
            share_count,
        });
    }
    if share_count > MAX_SHARE_COUNT {
        return Err(ShamirError::TooManyShares { share_count });
    }
    if secret.len() < DIGEST_LENGTH_BYTES {
        return Err(ShamirError::InvalidSecretLength {
            length: secret.len(),
        });
    }

    if threshold == 1 {
        return Ok((0..share_count)
            .map(|index| Share {
                index,
                data: secret.to_vec(),
            })
            .collect());
    }

    let random_share_count = threshold - 2;
    let mut rng = rand::thread_rng();

    let mut shares: Vec<Share> = (0..random_share_count)
        .map(|index| {
            let mut data = vec![0u8; secret.len()];
            rng.fill_bytes(&mut data);
            Share { index, data }
        })
        .collect();

    let mut random_part = vec![0u8; secret.len() - DIGEST_LENGTH_BYTES];
    rng.fill_bytes(&mut random_part);
    let mut digest_data = share_digest(&random_part, secret);
    digest_data.extend_from_slice(&random_part);
    random_part.zeroize();

    let mut base = shares.clone();
    base.push(Share {
        index: DIGEST_INDEX,
        data: digest_data,
    });
    base.push(Share {
        index: SECRET_INDEX,
        data: secret.to_vec(),
    });

    for index in random_share_count..share_count {
        shares.push(Share {
            index,
            data: interpolate(&base, index)?,
        });
    }
    for share in &mut base {
        share.data.zeroize();
    }

    Ok(shares)
}

/// Recover the secret from `threshold` distinct shares.
///
/// Interpolates the secret and digest points and verifies the digest;
/// a wrong or missing share makes the HMAC check fail rather than
/// producing an undetected wrong secret.
pub fn recover_secret(threshold: u8, shares: &[Share]) -> Result<Vec<u8>, ShamirError> {
    if shares.is_empty() {
        return Err(ShamirError::InvalidConfiguration(
            "recovery needs at least one share".into(),
        ));
    }
    if threshold == 1 {
        return Ok(shares[0].data.clone());
    }

    let secret = interpolate(shares, SECRET_INDEX)?;
    let mut digest_data = interpolate(shares, DIGEST_INDEX)?;
    if digest_data.len() < DIGEST_LENGTH_BYTES {
        return Err(ShamirError::InvalidSecretLength {
            length: digest_data.len(),
        });
    }
    let (digest, random_part) = digest_data.split_at(DIGEST_LENGTH_BYTES);
    let ok = digest == share_digest(random_part, &secret).as_slice();
    digest_data.zeroize();
    if !ok {
        return Err(ShamirError::DigestMismatch);
    }
    Ok(secret)
}

/// First four bytes of HMAC-SHA256 keyed by the digest share's random
/// part, over the shared secret.
fn share_digest(random_part: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(random_part)
        .expect("HMAC can be initialized with any key length");
    mac.update(secret);
    mac.finalize().into_bytes()[..DIGEST_LENGTH_BYTES].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_recover_2_of_3() {
        let secret: Vec<u8> = (0..16).collect();
        let shares = split_secret(2, 3, &secret).unwrap();
        assert_eq!(shares.len(), 3);
        assert_eq!(shares.iter().map(|s| s.index).collect::<Vec<_>>(), [0, 1, 2]);

        for pair in [[0, 1], [1, 2], [0, 2]] {
            let subset = [shares[pair[0]].clone(), shares[pair[1]].clone()];
            assert_eq!(recover_secret(2, &subset).unwrap(), secret);
        }
    }

    #[test]
    fn test_split_and_recover_3_of_5() {
        let secret = vec![0xabu8; 32];
        let shares = split_secret(3, 5, &secret).unwrap();
        assert_eq!(shares.len(), 5);

        let subset = [shares[0].clone(), shares[2].clone(), shares[4].clone()];
        assert_eq!(recover_secret(3, &subset).unwrap(), secret);
    }

    #[test]
    fn test_threshold_one_copies_secret() {
        let secret = vec![0x55u8; 16];
        let shares = split_secret(1, 4, &secret).unwrap();
        assert!(shares.iter().all(|s| s.data == secret));
        assert_eq!(recover_secret(1, &shares[2..3]).unwrap(), secret);
    }

    #[test]
    fn test_wrong_share_fails_digest() {
        let secret = vec![0x11u8; 16];
        let mut shares = split_secret(2, 2, &secret).unwrap();
        shares[0].data[3] ^= 0x40;
        assert!(matches!(
            recover_secret(2, &shares),
            Err(ShamirError::DigestMismatch)
        ));
    }

    #[test]
    fn test_too_few_shares_fail_digest() {
        // A single share of a 3-of-5 split interpolates to garbage; the
        // digest check must catch it.
        let secret = vec![0x77u8; 16];
        let shares = split_secret(3, 5, &secret).unwrap();
        assert!(matches!(
            recover_secret(3, &shares[0..2]),
            Err(ShamirError::DigestMismatch)
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let secret = vec![0u8; 16];
        assert!(matches!(
            split_secret(0, 3, &secret),
            Err(ShamirError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            split_secret(5, 3, &secret),
            Err(ShamirError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            split_secret(2, 17, &secret),
            Err(ShamirError::TooManyShares { share_count: 17 })
        ));
    }

    #[test]
    fn test_interpolate_returns_existing_share() {
        let shares = vec![
            Share {
                index: 1,
                data: vec![10, 20, 30],
            },
            Share {
                index: 5,
                data: vec![7, 7, 7],
            },
        ];
        assert_eq!(interpolate(&shares, 5).unwrap(), vec![7, 7, 7]);
    }

    #[test]
    fn test_interpolate_constant_polynomial() {
        // Two equal points define a constant polynomial.
        let shares = vec![
            Share {
                index: 0,
                data: vec![0x42; 4],
            },
            Share {
                index: 1,
                data: vec![0x42; 4],
            },
        ];
        assert_eq!(interpolate(&shares, 200).unwrap(), vec![0x42; 4]);
    }

    #[test]
    fn test_interpolate_rejects_bad_input() {
        let shares = vec![
            Share {
                index: 0,
                data: vec![1, 2],
            },
            Share {
                index: 1,
                data: vec![1, 2, 3],
            },
        ];
        assert!(matches!(
            interpolate(&shares, 9),
            Err(ShamirError::InconsistentShareLength {
                expected: 2,
                actual: 3
            })
        ));

        let dupes = vec![
            Share {
                index: 4,
                data: vec![1],
            },
            Share {
                index: 4,
                data: vec![2],
            },
        ];
        assert!(interpolate(&dupes, 9).is_err());
    }

    #[test]
    fn test_rederive_share_by_interpolation() {
        // Re-deriving an issued index from threshold other shares must
        // reproduce it exactly.
        let secret = vec![0xc3u8; 16];
        let shares = split_secret(2, 4, &secret).unwrap();
        let derived = interpolate(&shares[0..2], shares[3].index).unwrap();
        assert_eq!(derived, shares[3].data);
    }
}
