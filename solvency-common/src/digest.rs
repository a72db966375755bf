//! 32-byte digests and their text encodings.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::DecodeError;

pub const DIGEST_LEN: usize = 32;

/// Output of every hash and commitment in the protocol.
pub type Digest = [u8; DIGEST_LEN];

pub fn digest_hex(digest: &Digest) -> String {
    hex::encode(digest)
}

pub fn digest_base64(digest: &Digest) -> String {
    STANDARD.encode(digest)
}

pub fn decode_base64(batch: i64, field: &'static str, value: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(value.trim())
        .map_err(|err| DecodeError::Base64 {
            batch,
            field,
            reason: err.to_string(),
        })
}

pub fn decode_digest_base64(
    batch: i64,
    field: &'static str,
    value: &str,
) -> Result<Digest, DecodeError> {
    let bytes = decode_base64(batch, field, value)?;
    Digest::try_from(bytes.as_slice()).map_err(|_| DecodeError::DigestLength {
        batch,
        field,
        len: bytes.len(),
    })
}

/// Base64 digest that does not belong to a proof-table row.
pub fn decode_field_base64(field: &'static str, value: &str) -> Result<Digest, DecodeError> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|err| DecodeError::FieldBase64 {
            field,
            reason: err.to_string(),
        })?;
    field_digest(field, &bytes)
}

pub fn decode_digest_hex(field: &'static str, value: &str) -> Result<Digest, DecodeError> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(trimmed).map_err(|err| DecodeError::Hex {
        field,
        reason: err.to_string(),
    })?;
    field_digest(field, &bytes)
}

fn field_digest(field: &'static str, bytes: &[u8]) -> Result<Digest, DecodeError> {
    Digest::try_from(bytes).map_err(|_| DecodeError::FieldLength {
        field,
        len: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_digest_round_trip() {
        let digest = [0xabu8; 32];
        let encoded = digest_base64(&digest);
        assert_eq!(decode_digest_base64(3, "root", &encoded).unwrap(), digest);
    }

    #[test]
    fn short_base64_digest_is_rejected() {
        let encoded = STANDARD.encode([1u8; 31]);
        let err = decode_digest_base64(4, "root", &encoded).unwrap_err();
        assert_eq!(
            err,
            DecodeError::DigestLength {
                batch: 4,
                field: "root",
                len: 31
            }
        );
    }

    #[test]
    fn hex_digest_accepts_prefix() {
        let hex = format!("0x{}", "11".repeat(32));
        assert_eq!(decode_digest_hex("root", &hex).unwrap(), [0x11u8; 32]);
    }

    #[test]
    fn standalone_digest_errors_name_only_the_field() {
        let err = decode_field_base64("proof", &STANDARD.encode([1u8; 20])).unwrap_err();
        assert_eq!(err, DecodeError::FieldLength { field: "proof", len: 20 });
        assert_eq!(err.to_string(), "field 'proof' must be 32 bytes, got 20");

        assert!(matches!(
            decode_field_base64("proof", "@@"),
            Err(DecodeError::FieldBase64 { field: "proof", .. })
        ));
        assert_eq!(
            decode_digest_hex("root", &"ab".repeat(31)),
            Err(DecodeError::FieldLength { field: "root", len: 31 })
        );
    }

    #[test]
    fn invalid_hex_is_rejected() {
        assert!(matches!(
            decode_digest_hex("root", "zz"),
            Err(DecodeError::Hex { field: "root", .. })
        ));
    }
}
