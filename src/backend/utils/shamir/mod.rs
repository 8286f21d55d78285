//! Threshold sharing of payload keys.
//!
//! A 32-byte key is split byte-wise over GF(2^8): every byte gets its own
//! random polynomial of degree `threshold - 1` whose constant term is the
//! key byte, and share `i` holds the evaluations at `x = i`. Fewer than
//! `threshold` shares are uniformly distributed and carry no information
//! about the key.
//!
//! Interpolation alone cannot tell a corrupted share from a good one, so
//! every share carries a truncated HMAC-SHA256 tag over `(index, value)`
//! under a [`ShareTagKey`]. The tag key is drawn independently of the key
//! being shared and stays with the server's record; tags therefore reveal
//! nothing about the key, and a submitted share can be checked on arrival.
//! Reconstruction only interpolates shares whose tags verify.

mod field;

use crate::error::SwitchError;
use crate::models::common::ShareIndex;
use candid::CandidType;
use field::Gf256;
use hmac::{Hmac, Mac};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Length of the shared secret (a payload key).
pub const SECRET_LEN: usize = 32;
/// Truncated HMAC-SHA256 length.
pub const SHARE_TAG_LEN: usize = 16;
pub const TAG_KEY_LEN: usize = 32;
pub const MIN_THRESHOLD: u8 = 2;
pub const MAX_SHARES: u8 = 7;

const ENCODING_PREFIX: &str = "dsw1";

type HmacSha256 = Hmac<Sha256>;

/// One evaluation point of the key polynomials plus its integrity tag.
#[derive(CandidType, Deserialize, Serialize, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    pub index: ShareIndex,
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub tag: Vec<u8>,
}

impl std::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("index", &self.index)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl KeyShare {
    /// Transport form handed to recipients: `dsw1-<index>-<value hex>-<tag hex>`.
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{}-{}-{}-{}",
            ENCODING_PREFIX,
            self.index,
            hex::encode(&self.value),
            hex::encode(&self.tag)
        ))
    }

    pub fn decode(encoded: &str) -> Result<Self, SwitchError> {
        let mut parts = encoded.trim().split('-');
        let (Some(prefix), Some(index), Some(value), Some(tag), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SwitchError::MalformedShare("expected 4 dash separated fields".to_string()));
        };

        if prefix != ENCODING_PREFIX {
            return Err(SwitchError::MalformedShare(format!("unknown share format '{prefix}'")));
        }
        let index: u8 = index
            .parse()
            .map_err(|_| SwitchError::MalformedShare(format!("invalid share index '{index}'")))?;
        let value = hex::decode(value)
            .map_err(|e| SwitchError::MalformedShare(format!("share value: {e}")))?;
        let tag = hex::decode(tag).map_err(|e| SwitchError::MalformedShare(format!("share tag: {e}")))?;

        let share = KeyShare { index, value, tag };
        share.check_shape()?;
        Ok(share)
    }

    fn check_shape(&self) -> Result<(), SwitchError> {
        if self.index == 0 || self.index > MAX_SHARES {
            return Err(SwitchError::MalformedShare(format!(
                "share index {} outside 1..={MAX_SHARES}",
                self.index
            )));
        }
        if self.value.len() != SECRET_LEN {
            return Err(SwitchError::MalformedShare(format!(
                "share value is {} bytes, expected {SECRET_LEN}",
                self.value.len()
            )));
        }
        if self.tag.len() != SHARE_TAG_LEN {
            return Err(SwitchError::MalformedShare(format!(
                "share tag is {} bytes, expected {SHARE_TAG_LEN}",
                self.tag.len()
            )));
        }
        Ok(())
    }
}

/// Per-secret MAC key for share tags. Independent of the shared key.
#[derive(CandidType, Deserialize, Serialize, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ShareTagKey {
    #[serde(with = "serde_bytes")]
    key: Vec<u8>,
}

impl std::fmt::Debug for ShareTagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ShareTagKey([REDACTED])")
    }
}

impl ShareTagKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = vec![0u8; TAG_KEY_LEN];
        rng.fill_bytes(&mut key);
        Self { key }
    }

    /// True when `share` carries the tag this key issued for its index and value.
    pub fn verify(&self, share: &KeyShare) -> bool {
        share.check_shape().is_ok()
            && self
                .mac(share.index, &share.value)
                .map(|mac| mac.verify_truncated_left(&share.tag).is_ok())
                .unwrap_or(false)
    }

    fn tag(&self, index: u8, value: &[u8]) -> Result<Vec<u8>, SwitchError> {
        let mac = self.mac(index, value)?;
        Ok(mac.finalize().into_bytes()[..SHARE_TAG_LEN].to_vec())
    }

    fn mac(&self, index: u8, value: &[u8]) -> Result<HmacSha256, SwitchError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(|e| SwitchError::InternalError(format!("hmac init failed: {e}")))?;
        mac.update(&[index]);
        mac.update(value);
        Ok(mac)
    }
}

/// Checks `2 <= threshold <= total <= 7`.
pub fn validate_parameters(total: u8, threshold: u8) -> Result<(), SwitchError> {
    if threshold < MIN_THRESHOLD || threshold > total || total > MAX_SHARES {
        return Err(SwitchError::InvalidThresholdParameters { total, threshold });
    }
    Ok(())
}

/// Splits `secret` into `total` shares, any `threshold` of which reconstruct it.
///
/// Share indices run from 1 to `total`; 0 is never used because f(0) is the secret.
/// Every share is tagged under `tag_key`.
pub fn split<R: RngCore + CryptoRng>(
    secret: &[u8; SECRET_LEN],
    total: u8,
    threshold: u8,
    tag_key: &ShareTagKey,
    rng: &mut R,
) -> Result<Vec<KeyShare>, SwitchError> {
    validate_parameters(total, threshold)?;

    let mut values = Zeroizing::new(vec![[0u8; SECRET_LEN]; usize::from(total)]);
    let mut coefficients = Zeroizing::new(vec![0u8; usize::from(threshold)]);

    for (byte_index, &secret_byte) in secret.iter().enumerate() {
        coefficients[0] = secret_byte;
        rng.fill_bytes(&mut coefficients[1..]);
        let polynomial: Vec<Gf256> = coefficients.iter().map(|&c| Gf256::new(c)).collect();

        for (slot, value) in values.iter_mut().enumerate() {
            let x = Gf256::new(slot as u8 + 1);
            value[byte_index] = Gf256::evaluate(&polynomial, x).value();
        }
    }

    values
        .iter()
        .enumerate()
        .map(|(slot, value)| {
            let index = slot as u8 + 1;
            Ok(KeyShare {
                index,
                value: value.to_vec(),
                tag: tag_key.tag(index, value)?,
            })
        })
        .collect()
}

/// Recovers the secret from at least `threshold` distinct shares.
///
/// Shares whose tag does not verify under `tag_key` are set aside; the first
/// `threshold` verified shares are interpolated.
///
/// # Errors
///
/// * `InvalidThresholdParameters` for a threshold outside `2..=7`
/// * `MalformedShare` for a zero or out-of-range index or wrong lengths
/// * `DuplicateShareIndex` when two shares claim the same index
/// * `InsufficientShares` when fewer than `threshold` shares are given
/// * `ReconstructionMismatch` when fewer than `threshold` shares verify
pub fn reconstruct(
    shares: &[KeyShare],
    threshold: u8,
    tag_key: &ShareTagKey,
) -> Result<Zeroizing<[u8; SECRET_LEN]>, SwitchError> {
    validate_parameters(MAX_SHARES, threshold)?;

    let mut seen = [false; MAX_SHARES as usize + 1];
    for share in shares {
        share.check_shape()?;
        let slot = &mut seen[usize::from(share.index)];
        if *slot {
            return Err(SwitchError::DuplicateShareIndex(share.index));
        }
        *slot = true;
    }

    let required = usize::from(threshold);
    if shares.len() < required {
        return Err(SwitchError::InsufficientShares {
            required: threshold,
            provided: shares.len() as u8,
        });
    }

    let verified: Vec<&KeyShare> = shares
        .iter()
        .filter(|share| tag_key.verify(share))
        .take(required)
        .collect();
    if verified.len() < required {
        return Err(SwitchError::ReconstructionMismatch);
    }
    Ok(interpolate(&verified))
}

/// Raw interpolation at zero without integrity checks.
fn interpolate(shares: &[&KeyShare]) -> Zeroizing<[u8; SECRET_LEN]> {
    let mut secret = Zeroizing::new([0u8; SECRET_LEN]);
    let mut points = Vec::with_capacity(shares.len());
    for (byte_index, out) in secret.iter_mut().enumerate() {
        points.clear();
        points.extend(
            shares
                .iter()
                .map(|s| (Gf256::new(s.index), Gf256::new(s.value[byte_index]))),
        );
        *out = Gf256::interpolate_at_zero(&points).value();
    }
    secret
}
