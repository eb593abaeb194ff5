//! Long-lived PSN secret: environment lookup and the `v1:salt:iv:ciphertext:tag` codec.
//!
//! Every part after the version tag is standard base64. The key is
//! scrypt(password, salt, N=2^14, r=8, p=1, 32 bytes) and the cipher is
//! AES-256-GCM with a 12-byte IV and 16-byte tag.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const FORMAT_VERSION: &str = "v1";
const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("expected 5 ':'-separated parts starting with 'v1'")]
    Format,
    #[error("part '{0}' is not valid base64")]
    Base64(&'static str),
    #[error("part '{0}' has the wrong length")]
    Length(&'static str),
    #[error("key derivation failed")]
    Kdf,
    #[error("decryption failed (wrong password or tampered value)")]
    Decrypt,
    #[error("encryption failed")]
    Encrypt,
    #[error("decrypted secret is not valid UTF-8")]
    Utf8,
}

/// Supplies the long-lived secret used for a full credential exchange.
pub trait SecretProvider: Send + Sync {
    fn long_lived_secret(&self) -> Option<String>;
}

/// Where the secret lives in the process environment.
#[derive(Debug, Deserialize, Clone)]
pub struct SecretConfig {
    #[serde(default = "default_plain_env")]
    pub plain_env: Vec<String>,
    #[serde(default = "default_encrypted_env")]
    pub encrypted_env: String,
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            plain_env: default_plain_env(),
            encrypted_env: default_encrypted_env(),
            key_env: default_key_env(),
        }
    }
}

impl SecretConfig {
    /// First non-blank plaintext variable wins; otherwise the encrypted form is
    /// decrypted with the password variable. Failures are logged and read as absent.
    pub fn resolve(&self) -> Option<String> {
        if let Some((name, value)) = self
            .plain_env
            .iter()
            .find_map(|name| env_value(name).map(|value| (name, value)))
        {
            debug!(env = %name, "using plaintext secret");
            return Some(value);
        }

        let encrypted = env_value(&self.encrypted_env)?;
        let Some(password) = env_value(&self.key_env) else {
            warn!(
                encrypted_env = %self.encrypted_env,
                key_env = %self.key_env,
                "encrypted secret is set but its password is missing"
            );
            return None;
        };

        decrypt_with_password(&encrypted, &password)
            .inspect_err(|e| warn!(encrypted_env = %self.encrypted_env, "cannot decrypt secret: {}", e))
            .ok()
            .map(|secret| secret.trim().to_owned())
            .filter(|secret| !secret.is_empty())
    }
}

impl SecretProvider for SecretConfig {
    fn long_lived_secret(&self) -> Option<String> {
        self.resolve()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], SecretError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|_| SecretError::Kdf)?;
    let mut key = [0u8; KEY_LEN];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key).map_err(|_| SecretError::Kdf)?;
    Ok(key)
}

fn decode_part(name: &'static str, part: &str) -> Result<Vec<u8>, SecretError> {
    STANDARD.decode(part.trim()).map_err(|_| SecretError::Base64(name))
}

pub fn decrypt_with_password(encoded: &str, password: &str) -> Result<String, SecretError> {
    let parts: Vec<&str> = encoded.trim().split(':').collect();
    let [version, salt, iv, ciphertext, tag] = parts.as_slice() else {
        return Err(SecretError::Format);
    };
    if *version != FORMAT_VERSION {
        return Err(SecretError::Format);
    }

    let salt = decode_part("salt", salt)?;
    let iv = decode_part("iv", iv)?;
    let ciphertext = decode_part("ciphertext", ciphertext)?;
    let tag = decode_part("tag", tag)?;
    if iv.len() != IV_LEN {
        return Err(SecretError::Length("iv"));
    }
    if tag.len() != TAG_LEN {
        return Err(SecretError::Length("tag"));
    }

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));

    // aes-gcm expects the tag appended to the ciphertext
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| SecretError::Decrypt)?;
    String::from_utf8(plaintext).map_err(|_| SecretError::Utf8)
}

pub fn encrypt_with_password(secret: &str, password: &str) -> Result<String, SecretError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let sealed = cipher
        .encrypt(Nonce::from_slice(&iv), secret.as_bytes())
        .map_err(|_| SecretError::Encrypt)?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    Ok([
        FORMAT_VERSION.to_owned(),
        STANDARD.encode(salt),
        STANDARD.encode(iv),
        STANDARD.encode(ciphertext),
        STANDARD.encode(tag),
    ]
    .join(":"))
}

fn default_plain_env() -> Vec<String> {
    vec!["PSN_NPSSO".to_owned(), "PSN_TOKEN".to_owned()]
}

fn default_encrypted_env() -> String {
    "PSN_TOKEN_ENC".to_owned()
}

fn default_key_env() -> String {
    "PSN_TOKEN_KEY".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn encrypt_then_decrypt() {
        let encoded = encrypt_with_password("npsso-value", "hunter2").unwrap();
        assert!(encoded.starts_with("v1:"));
        assert_eq!(encoded.split(':').count(), 5);
        assert_eq!(decrypt_with_password(&encoded, "hunter2").unwrap(), "npsso-value");
        assert_eq!(decrypt_with_password(&encoded, "wrong"), Err(SecretError::Decrypt));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_eq!(decrypt_with_password("v1:a:b", "pw"), Err(SecretError::Format));
        assert_eq!(decrypt_with_password("v2:AA==:AA==:AA==:AA==", "pw"), Err(SecretError::Format));
        assert_eq!(decrypt_with_password("v1:%%:AA==:AA==:AA==", "pw"), Err(SecretError::Base64("salt")));
        assert_eq!(decrypt_with_password("v1:AA==:AA==:AA==:AA==", "pw"), Err(SecretError::Length("iv")));
    }

    #[test]
    fn tampered_tag_fails() {
        let encoded = encrypt_with_password("abc", "pw").unwrap();
        let mut parts: Vec<String> = encoded.split(':').map(str::to_owned).collect();
        parts[4] = STANDARD.encode([0u8; TAG_LEN]);
        assert_eq!(decrypt_with_password(&parts.join(":"), "pw"), Err(SecretError::Decrypt));
    }

    fn config(prefix: &str) -> SecretConfig {
        SecretConfig {
            plain_env: vec![format!("{prefix}_PLAIN_A"), format!("{prefix}_PLAIN_B")],
            encrypted_env: format!("{prefix}_ENC"),
            key_env: format!("{prefix}_KEY"),
        }
    }

    #[test]
    #[serial]
    fn resolve_prefers_plaintext_then_encrypted() {
        let cfg = config("TA_SECRET_RESOLVE");
        for name in cfg.plain_env.iter().chain([&cfg.encrypted_env, &cfg.key_env]) {
            std::env::remove_var(name);
        }
        assert_eq!(cfg.resolve(), None);

        std::env::set_var(&cfg.encrypted_env, encrypt_with_password("from-enc", "pw").unwrap());
        assert_eq!(cfg.resolve(), None, "password missing");

        std::env::set_var(&cfg.key_env, "pw");
        assert_eq!(cfg.resolve().as_deref(), Some("from-enc"));

        std::env::set_var(&cfg.plain_env[1], "  from-plain-b ");
        assert_eq!(cfg.resolve().as_deref(), Some("from-plain-b"));

        std::env::set_var(&cfg.plain_env[0], "from-plain-a");
        assert_eq!(cfg.resolve().as_deref(), Some("from-plain-a"));

        for name in cfg.plain_env.iter().chain([&cfg.encrypted_env, &cfg.key_env]) {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn undecryptable_secret_reads_as_absent() {
        let cfg = config("TA_SECRET_BAD");
        std::env::set_var(&cfg.encrypted_env, "v1:garbage");
        std::env::set_var(&cfg.key_env, "pw");
        assert_eq!(cfg.resolve(), None);

        // decrypts fine but carries nothing usable
        std::env::set_var(&cfg.encrypted_env, encrypt_with_password("", "pw").unwrap());
        assert_eq!(cfg.resolve(), None);
        std::env::set_var(&cfg.encrypted_env, encrypt_with_password("  ", "pw").unwrap());
        assert_eq!(cfg.resolve(), None);

        std::env::remove_var(&cfg.encrypted_env);
        std::env::remove_var(&cfg.key_env);
    }
}
