//! Conversions between protocol values and BN254 scalar field elements.

use anyhow::{anyhow, Result};
use halo2curves_axiom::{
    bn256::Fr,
    ff::{FromUniformBytes, PrimeField},
};

use crate::digest::Digest;

/// Strict decoding of a canonical little-endian field encoding.
pub fn fr_from_bytes(bytes: &Digest) -> Result<Fr> {
    Fr::from_bytes(bytes)
        .into_option()
        .ok_or_else(|| anyhow!("invalid bn256 scalar encoding"))
}

pub fn fr_to_bytes(fr: &Fr) -> Digest {
    let repr = fr.to_repr();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(repr.as_ref());
    bytes
}

/// Maps any 32-byte digest into the field.
///
/// Canonical encodings (everything produced by [`fr_to_bytes`]) map back to the
/// same element; other byte strings are reduced modulo the field order.
pub fn digest_to_fr(digest: &Digest) -> Fr {
    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(digest);
    Fr::from_uniform_bytes(&wide)
}

pub fn reduce_be_bytes_to_fr(bytes: &[u8; 32]) -> Fr {
    let mut acc = Fr::zero();
    let base = Fr::from(256);
    for byte in bytes.iter() {
        acc = acc * base + Fr::from(*byte as u64);
    }
    acc
}

pub fn amount_to_fr(amount: u128) -> Fr {
    Fr::from_u128(amount)
}
