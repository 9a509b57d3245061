use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::CoreError;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// Argon2id cost parameters, recorded in every snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // 19 MiB, 2 passes (OWASP Argon2id baseline)
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Bounds accepted when reading a header, so a crafted file cannot
    /// demand gigabytes of memory or minutes of hashing.
    pub fn check_bounds(&self) -> Result<(), CoreError> {
        let in_range = (8..=262_144).contains(&self.memory_cost)
            && (1..=10).contains(&self.time_cost)
            && (1..=8).contains(&self.parallelism);
        if in_range {
            Ok(())
        } else {
            Err(CoreError::InvalidSnapshot(format!(
                "KDF parameters out of range: m={} KiB, t={}, p={}",
                self.memory_cost, self.time_cost, self.parallelism
            )))
        }
    }
}

/// Ciphertext plus everything needed to decrypt it except the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub kdf: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    /// AES-256-GCM output, authentication tag included
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a key derived from `password` with a fresh
/// random salt and nonce.
pub fn seal(plaintext: &[u8], password: &str, kdf: KdfParams) -> Result<Sealed, CoreError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    fill_random(&mut salt)?;
    fill_random(&mut nonce)?;

    let cipher = cipher_for(password, &salt, &kdf)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CoreError::Encryption(format!("AES-GCM encryption failed: {e}")))?;

    Ok(Sealed {
        kdf,
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt a sealed payload. A wrong password and a tampered payload are
/// indistinguishable and both yield `CoreError::Decryption`.
pub fn open(sealed: &Sealed, password: &str) -> Result<Vec<u8>, CoreError> {
    let cipher = cipher_for(password, &sealed.salt, &sealed.kdf)?;
    Ok(cipher.decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())?)
}

fn cipher_for(password: &str, salt: &[u8; SALT_LEN], kdf: &KdfParams) -> Result<Aes256Gcm, CoreError> {
    let params = Params::new(kdf.memory_cost, kdf.time_cost, kdf.parallelism, Some(32))
        .map_err(|e| CoreError::Encryption(format!("Invalid Argon2 params: {e}")))?;

    let mut key = [0u8; 32];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CoreError::Encryption(format!("Key derivation failed: {e}")))?;

    Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CoreError::Encryption(format!("Failed to create cipher: {e}")))
}

fn fill_random(buf: &mut [u8]) -> Result<(), CoreError> {
    getrandom::getrandom(buf)
        .map_err(|e| CoreError::Encryption(format!("System randomness unavailable: {e}")))
}
