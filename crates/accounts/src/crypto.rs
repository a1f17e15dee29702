//! Field-level encryption for tokens kept in the account store.
//!
//! Each value is sealed with AES-256-GCM under a key derived from the store
//! passphrase (SHA-256, no salt) and a fresh 16-byte IV. The serialized form is
//! `iv_hex:tag_hex:ciphertext_hex`, which existing stores already use.

use std::{fmt, str::FromStr};

use {
    aes_gcm::{
        AesGcm,
        aead::{AeadInPlace, KeyInit, consts::U16, generic_array::GenericArray},
        aes::Aes256,
    },
    secrecy::{ExposeSecret, SecretString},
    sha2::{Digest, Sha256},
};

use crate::{Error, Result};

/// AES-256-GCM with a 128-bit IV.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// One encrypted field: IV, authentication tag and ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedValue {
    pub iv: [u8; IV_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for SealedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.iv),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext)
        )
    }
}

impl FromStr for SealedValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let (Some(iv), Some(tag), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::MalformedCiphertext(
                "expected three colon-separated segments".into(),
            ));
        };

        Ok(Self {
            iv: decode_fixed::<IV_LEN>(iv, "iv")?,
            tag: decode_fixed::<TAG_LEN>(tag, "tag")?,
            ciphertext: hex::decode(ciphertext)
                .map_err(|e| Error::MalformedCiphertext(format!("ciphertext: {e}")))?,
        })
    }
}

fn decode_fixed<const N: usize>(segment: &str, what: &str) -> Result<[u8; N]> {
    let bytes =
        hex::decode(segment).map_err(|e| Error::MalformedCiphertext(format!("{what}: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        Error::MalformedCiphertext(format!("{what} must be {N} bytes, got {}", b.len()))
    })
}

/// Symmetric cipher shared by every sealed field in a store.
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; KEY_LEN],
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Derive the key as SHA-256 of the passphrase.
    pub fn from_passphrase(passphrase: &SecretString) -> Self {
        let digest = Sha256::digest(passphrase.expose_secret().as_bytes());
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&digest);
        Self { key }
    }

    fn cipher(&self) -> Aes256Gcm16 {
        Aes256Gcm16::new(GenericArray::from_slice(&self.key))
    }

    pub fn seal(&self, plaintext: &str) -> Result<SealedValue> {
        let iv: [u8; IV_LEN] = rand::random();
        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher()
            .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| Error::Encrypt)?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);
        Ok(SealedValue {
            iv,
            tag: tag_bytes,
            ciphertext: buffer,
        })
    }

    /// Decrypt and verify. Fails with [`Error::Integrity`] if the tag does not match.
    pub fn open(&self, sealed: &SealedValue) -> Result<String> {
        let mut buffer = sealed.ciphertext.clone();
        self.cipher()
            .decrypt_in_place_detached(
                GenericArray::from_slice(&sealed.iv),
                b"",
                &mut buffer,
                GenericArray::from_slice(&sealed.tag),
            )
            .map_err(|_| Error::Integrity)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Seal and serialize in one step.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(self.seal(plaintext)?.to_string())
    }

    /// Parse and open a serialized sealed value.
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        self.open(&encoded.parse()?)
    }

    /// Like [`TokenCipher::decrypt`] but keeps the plaintext wrapped.
    pub fn decrypt_secret(&self, encoded: &str) -> Result<SecretString> {
        self.decrypt(encoded).map(SecretString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        TokenCipher::from_passphrase(&SecretString::new("test-passphrase".into()))
    }

    #[test]
    fn test_round_trip_various_strings() {
        let c = cipher();
        let long = "x".repeat(4096);
        for s in ["", "a", "access-token-123", "ünïcødé ✓ 🚀", long.as_str()] {
            let enc = c.encrypt(s).unwrap();
            assert_eq!(c.decrypt(&enc).unwrap(), s);
        }
    }

    #[test]
    fn test_format_is_three_hex_segments() {
        let enc = cipher().encrypt("hello").unwrap();
        let parts: Vec<&str> = enc.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), IV_LEN * 2);
        assert_eq!(parts[1].len(), TAG_LEN * 2);
        assert_eq!(parts[2].len(), "hello".len() * 2);
        assert!(
            parts
                .iter()
                .all(|p| p.chars().all(|c| c.is_ascii_hexdigit()))
        );
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let c = cipher();
        let a = c.seal("same").unwrap();
        let b = c.seal("same").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_any_tag_byte_flip_fails() {
        let c = cipher();
        let sealed = c.seal("secret token").unwrap();
        for i in 0..TAG_LEN {
            let mut tampered = sealed.clone();
            tampered.tag[i] ^= 0x01;
            assert!(matches!(c.open(&tampered), Err(Error::Integrity)));
        }
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let c = cipher();
        let mut sealed = c.seal("secret token").unwrap();
        sealed.ciphertext[0] ^= 0xff;
        assert!(matches!(c.open(&sealed), Err(Error::Integrity)));
    }

    #[test]
    fn test_wrong_key_fails() {
        let enc = cipher().encrypt("secret").unwrap();
        let other = TokenCipher::from_passphrase(&SecretString::new("other".into()));
        assert!(matches!(other.decrypt(&enc), Err(Error::Integrity)));
    }

    #[test]
    fn test_malformed_inputs() {
        let c = cipher();
        for bad in [
            "",
            "abc",
            "00:11",
            "00:11:22:33",
            "zz:00000000000000000000000000000000:00",
            "0011:00000000000000000000000000000000:00",
        ] {
            assert!(
                matches!(c.decrypt(bad), Err(Error::MalformedCiphertext(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_display_consistent() {
        let sealed = cipher().seal("value").unwrap();
        let parsed: SealedValue = sealed.to_string().parse().unwrap();
        assert_eq!(parsed, sealed);
    }

    #[test]
    fn test_known_key_derivation() {
        // Stores sealed by other tools with the same passphrase must open here.
        let c = TokenCipher::from_passphrase(&SecretString::new(
            "dev-key-change-in-production-32b".into(),
        ));
        let expected = Sha256::digest(b"dev-key-change-in-production-32b");
        assert_eq!(c.key.as_slice(), expected.as_slice());
    }
}
