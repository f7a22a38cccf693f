// Envelope Codec
// Three-segment authenticated-encryption envelope used for every piece of
// stored sensitive content. Pure data-format logic; the crypto primitive
// lives behind the KeyCustodian capability.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::custodian::{KeyCustodian, IV_LEN, TAG_LEN};
use crate::errors::VaultError;

/// One unit of stored sensitive content. Created at write time, consumed
/// at read time, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Stable, versionless `iv:tag:ciphertext` string form, each segment
    /// base64. This is the single textual field an external store persists
    /// as-is, and it must remain readable across versions.
    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}",
            BASE64.encode(&self.iv),
            BASE64.encode(&self.tag),
            BASE64.encode(&self.ciphertext)
        )
    }

    /// Parse the stored string form. Rejects anything that is not exactly
    /// three decodable segments without attempting partial decryption.
    /// The ciphertext segment may decode to zero bytes (empty plaintext);
    /// iv and tag must decode to their fixed lengths.
    pub fn decode(encoded: &str) -> Result<Self, VaultError> {
        let segments: Vec<&str> = encoded.split(':').collect();
        if segments.len() != 3 {
            return Err(VaultError::Format(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let iv = BASE64
            .decode(segments[0])
            .map_err(|_| VaultError::Format("iv segment is not valid base64".to_string()))?;
        let tag = BASE64
            .decode(segments[1])
            .map_err(|_| VaultError::Format("tag segment is not valid base64".to_string()))?;
        let ciphertext = BASE64
            .decode(segments[2])
            .map_err(|_| VaultError::Format("ciphertext segment is not valid base64".to_string()))?;

        if iv.len() != IV_LEN {
            return Err(VaultError::Format("iv segment has wrong length".to_string()));
        }
        if tag.len() != TAG_LEN {
            return Err(VaultError::Format("tag segment has wrong length".to_string()));
        }

        Ok(Self { iv, tag, ciphertext })
    }
}

/// Encrypt plaintext into a fresh envelope. The custodian supplies a new
/// random nonce per call; nonces are never reused under one key.
pub fn seal(plaintext: &str, custodian: &dyn KeyCustodian) -> Result<EncryptedEnvelope, VaultError> {
    let parts = custodian.encrypt_primitive(plaintext.as_bytes())?;
    Ok(EncryptedEnvelope {
        iv: parts.iv,
        tag: parts.tag,
        ciphertext: parts.ciphertext,
    })
}

/// Verify the tag and decrypt. Fails closed: any tag mismatch or malformed
/// part yields an error, never partial plaintext. Nothing sensitive is
/// logged on any path.
pub fn open(envelope: &EncryptedEnvelope, custodian: &dyn KeyCustodian) -> Result<String, VaultError> {
    let plaintext = custodian.decrypt_primitive(&envelope.ciphertext, &envelope.iv, &envelope.tag)?;
    String::from_utf8(plaintext)
        .map_err(|_| VaultError::Crypto("decrypted content is not valid UTF-8".to_string()))
}

/// Seal directly to the stored string form.
pub fn seal_to_string(plaintext: &str, custodian: &dyn KeyCustodian) -> Result<String, VaultError> {
    Ok(seal(plaintext, custodian)?.encode())
}

/// Decode the stored string form and open it.
pub fn open_from_string(encoded: &str, custodian: &dyn KeyCustodian) -> Result<String, VaultError> {
    open(&EncryptedEnvelope::decode(encoded)?, custodian)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custodian::StaticKeyCustodian;

    #[test]
    fn test_seal_open_roundtrip() {
        let custodian = StaticKeyCustodian::random();
        let envelope = seal("Hello, this is a private thread.", &custodian).unwrap();
        let plain = open(&envelope, &custodian).unwrap();
        assert_eq!(plain, "Hello, this is a private thread.");
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let custodian = StaticKeyCustodian::random();
        let encoded = seal_to_string("", &custodian).unwrap();
        assert_eq!(open_from_string(&encoded, &custodian).unwrap(), "");
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let custodian = StaticKeyCustodian::random();
        let envelope = seal("some content", &custodian).unwrap();
        let decoded = EncryptedEnvelope::decode(&envelope.encode()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_two_segments_is_format_failure() {
        let result = EncryptedEnvelope::decode("abc:def");
        assert!(matches!(result, Err(VaultError::Format(_))));
    }

    #[test]
    fn test_four_segments_is_format_failure() {
        let custodian = StaticKeyCustodian::random();
        let encoded = seal_to_string("content", &custodian).unwrap();
        let result = EncryptedEnvelope::decode(&format!("{}:extra", encoded));
        assert!(matches!(result, Err(VaultError::Format(_))));
    }

    #[test]
    fn test_garbage_segment_is_format_failure() {
        let result = EncryptedEnvelope::decode("!!not-base64!!:YWJj:YWJj");
        assert!(matches!(result, Err(VaultError::Format(_))));
    }

    #[test]
    fn test_ciphertext_bit_flip_is_integrity_failure() {
        let custodian = StaticKeyCustodian::random();
        let mut envelope = seal("tamper target", &custodian).unwrap();
        envelope.ciphertext[0] ^= 0x01;
        assert!(matches!(open(&envelope, &custodian), Err(VaultError::Integrity)));
    }

    #[test]
    fn test_tag_bit_flip_is_integrity_failure() {
        let custodian = StaticKeyCustodian::random();
        let mut envelope = seal("tamper target", &custodian).unwrap();
        envelope.tag[0] ^= 0x01;
        assert!(matches!(open(&envelope, &custodian), Err(VaultError::Integrity)));
    }

    #[test]
    fn test_unique_iv_per_seal() {
        let custodian = StaticKeyCustodian::random();
        let a = seal("same plaintext", &custodian).unwrap();
        let b = seal("same plaintext", &custodian).unwrap();
        assert_ne!(a.iv, b.iv);
    }
}
