use aes_gcm::AesGcm;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use anyhow::{Result, Context as AnyhowContext, anyhow, bail};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use tracing::warn;
use crate::error::MigrateError;

/// NiFi's keyed sensitive-properties scheme.
pub const PBKDF2_AES_GCM_256: &str = "NIFI_PBKDF2_AES_GCM_256";

const STATIC_SALT: &[u8] = b"NiFi Static Salt";
const PBKDF2_ITERATIONS: u32 = 160_000;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// AES-256-GCM with the 16 byte IV NiFi generates.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Reversible cipher used by the legacy system for sensitive properties.
pub trait Cipher: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Cipher used when no key is configured; every decrypt attempt fails.
#[derive(Debug, Default)]
pub struct UnconfiguredCipher;

impl Cipher for UnconfiguredCipher {
    fn decrypt(&self, _ciphertext: &str) -> Result<String> {
        Err(anyhow!("no sensitive-properties key configured"))
    }
}

pub fn is_supported_algorithm(algorithm: &str) -> bool {
    algorithm.eq_ignore_ascii_case(PBKDF2_AES_GCM_256)
}

/// Decrypts values written by NiFi with `nifi.sensitive.props.key`.
///
/// The AES key is PBKDF2-HMAC-SHA512 of the properties key over a static salt.
/// Ciphertext is hex of the IV followed by the encrypted bytes and GCM tag.
pub struct NifiCipher {
    cipher: Aes256Gcm16,
}

impl NifiCipher {
    pub fn new(algorithm: &str, key: &str) -> crate::error::Result<Self> {
        if !is_supported_algorithm(algorithm) {
            return Err(MigrateError::Config(format!(
                "unsupported sensitive properties algorithm {}",
                algorithm
            )));
        }
        if key.is_empty() {
            return Err(MigrateError::Config("sensitive properties key is empty".to_string()));
        }
        let mut derived = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha512>(key.as_bytes(), STATIC_SALT, PBKDF2_ITERATIONS, &mut derived);
        Ok(Self::from_derived_key(&derived))
    }

    fn from_derived_key(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm16::new(GenericArray::from_slice(key.as_slice())),
        }
    }
}

impl Cipher for NifiCipher {
    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let bytes = hex::decode(ciphertext.trim()).context("ciphertext is not hex encoded")?;
        if bytes.len() < IV_LEN + TAG_LEN {
            bail!("ciphertext too short: {} bytes", bytes.len());
        }
        let (iv, encrypted) = bytes.split_at(IV_LEN);
        let plain = self
            .cipher
            .decrypt(GenericArray::from_slice(iv), encrypted)
            .map_err(|_| anyhow!("ciphertext failed authentication"))?;
        String::from_utf8(plain).context("decrypted value is not UTF-8")
    }
}

/// Unwraps `enc{...}` and decrypts it. Values without the wrapper are returned unchanged;
/// a failed decrypt yields the unwrapped ciphertext.
pub fn decrypt_value(cipher: &dyn Cipher, value: &str) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }
    let Some(raw) = value.strip_prefix("enc{").and_then(|v| v.strip_suffix('}')) else {
        return value.to_string();
    };
    match cipher.decrypt(raw) {
        Ok(plain) => plain,
        Err(e) => {
            warn!(error = %e, "Failed to decrypt sensitive value, keeping ciphertext");
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reverse;

    impl Cipher for Reverse {
        fn decrypt(&self, ciphertext: &str) -> Result<String> {
            Ok(ciphertext.chars().rev().collect())
        }
    }

    fn encrypt(cipher: &NifiCipher, plain: &str, iv: [u8; IV_LEN]) -> String {
        let mut out = iv.to_vec();
        out.extend(
            cipher
                .cipher
                .encrypt(GenericArray::from_slice(&iv), plain.as_bytes())
                .expect("encrypt should succeed"),
        );
        hex::encode(out)
    }

    #[test]
    fn test_plain_values_pass_through() {
        assert_eq!(decrypt_value(&Reverse, "secret"), "secret");
        assert_eq!(decrypt_value(&Reverse, ""), "");
    }

    #[test]
    fn test_wrapped_values_are_decrypted() {
        assert_eq!(decrypt_value(&Reverse, "enc{cba}"), "abc");
    }

    #[test]
    fn test_failed_decrypt_returns_unwrapped() {
        assert_eq!(decrypt_value(&UnconfiguredCipher, "enc{cba}"), "cba");
    }

    #[test]
    fn test_nifi_cipher_decrypts_iv_prefixed_hex() {
        let cipher = NifiCipher::from_derived_key(&[7u8; KEY_LEN]);
        let raw = encrypt(&cipher, "s3cr3t-pass", [1u8; IV_LEN]);
        assert_eq!(raw.len(), (IV_LEN + "s3cr3t-pass".len() + TAG_LEN) * 2);
        assert_eq!(decrypt_value(&cipher, &format!("enc{{{}}}", raw)), "s3cr3t-pass");
        assert_eq!(cipher.decrypt(&raw.to_uppercase()).expect("hex is case-insensitive"), "s3cr3t-pass");
    }

    #[test]
    fn test_nifi_cipher_rejects_bad_input() {
        let cipher = NifiCipher::from_derived_key(&[7u8; KEY_LEN]);
        let other = NifiCipher::from_derived_key(&[8u8; KEY_LEN]);
        let raw = encrypt(&cipher, "value", [2u8; IV_LEN]);

        assert!(other.decrypt(&raw).is_err());
        assert!(cipher.decrypt("not-hex").is_err());
        assert!(cipher.decrypt("00ff").is_err());

        let mut tampered = raw.clone();
        let last = if tampered.ends_with('0') { "1" } else { "0" };
        tampered.replace_range(tampered.len() - 1.., last);
        assert!(cipher.decrypt(&tampered).is_err());

        assert_eq!(decrypt_value(&other, &format!("enc{{{}}}", raw)), raw);
    }

    #[test]
    fn test_nifi_cipher_derives_key_from_password() {
        let first = NifiCipher::new(PBKDF2_AES_GCM_256, "migration-key-1").expect("supported");
        let second = NifiCipher::new("nifi_pbkdf2_aes_gcm_256", "migration-key-1").expect("supported");
        let raw = encrypt(&first, "hunter2", [3u8; IV_LEN]);
        assert_eq!(second.decrypt(&raw).expect("same key decrypts"), "hunter2");

        assert!(NifiCipher::new("PBEWITHMD5AND256BITAES-CBC-OPENSSL", "migration-key-1").is_err());
        assert!(NifiCipher::new(PBKDF2_AES_GCM_256, "").is_err());
    }
}
