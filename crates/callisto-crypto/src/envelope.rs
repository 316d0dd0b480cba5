//! Passphrase envelope: Argon2id + XChaCha20-Poly1305

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305,
};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, KdfParams, SALT_LEN};
use crate::passphrase::Passphrase;

pub const MAGIC: &[u8; 4] = b"CLRP";
const VERSION: u8 = 1;
const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

// Header params are attacker-controlled; cap them before running Argon2.
const MAX_M_COST: u32 = 1 << 20;
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 16;

const PARAMS_OFFSET: usize = 5;
const SALT_OFFSET: usize = PARAMS_OFFSET + 12;
const NONCE_OFFSET: usize = SALT_OFFSET + SALT_LEN;

/// Bytes preceding the ciphertext (all authenticated as associated data)
pub const HEADER_LEN: usize = NONCE_OFFSET + NONCE_LEN;

struct Header {
    params: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
}

impl Header {
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&self.params.m_cost.to_le_bytes());
        out.extend_from_slice(&self.params.t_cost.to_le_bytes());
        out.extend_from_slice(&self.params.p_cost.to_le_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out
    }

    fn parse(blob: &[u8]) -> Option<Self> {
        if blob.len() < HEADER_LEN + TAG_LEN {
            return None;
        }
        if &blob[0..4] != MAGIC || blob[4] != VERSION {
            return None;
        }
        let word = |at: usize| -> Option<u32> {
            Some(u32::from_le_bytes(blob[at..at + 4].try_into().ok()?))
        };
        let params = KdfParams {
            m_cost: word(PARAMS_OFFSET)?,
            t_cost: word(PARAMS_OFFSET + 4)?,
            p_cost: word(PARAMS_OFFSET + 8)?,
        };
        if params.m_cost > MAX_M_COST || params.t_cost > MAX_T_COST || params.p_cost > MAX_P_COST {
            return None;
        }
        Some(Self {
            params,
            salt: blob[SALT_OFFSET..NONCE_OFFSET].try_into().ok()?,
            nonce: blob[NONCE_OFFSET..HEADER_LEN].try_into().ok()?,
        })
    }
}

/// Encrypt `plaintext` under a key derived from `passphrase`.
///
/// A fresh salt and nonce are drawn for every call.
pub fn encrypt(plaintext: &[u8], passphrase: &Passphrase, params: &KdfParams) -> CryptoResult<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let header = Header {
        params: *params,
        salt,
        nonce,
    };
    let key = derive_key(passphrase, &header.salt, &header.params)?;
    let aad = header.to_bytes();

    let cipher =
        XChaCha20Poly1305::new_from_slice(key.as_slice()).map_err(|_| CryptoError::Encryption)?;
    let ciphertext = cipher
        .encrypt(
            &nonce.into(),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| CryptoError::Encryption)?;

    let mut output = aad;
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Fails with [`CryptoError::WrongPassphrase`] for any malformed, tampered or
/// foreign-key input.
pub fn decrypt(blob: &[u8], passphrase: &Passphrase) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let header = Header::parse(blob).ok_or(CryptoError::WrongPassphrase)?;
    let key = derive_key(passphrase, &header.salt, &header.params)
        .map_err(|_| CryptoError::WrongPassphrase)?;

    let cipher = XChaCha20Poly1305::new_from_slice(key.as_slice())
        .map_err(|_| CryptoError::WrongPassphrase)?;
    let plaintext = cipher
        .decrypt(
            &header.nonce.into(),
            Payload {
                msg: &blob[HEADER_LEN..],
                aad: &blob[..HEADER_LEN],
            },
        )
        .map_err(|_| CryptoError::WrongPassphrase)?;

    Ok(Zeroizing::new(plaintext))
}

/// Check that `passphrase` opens `blob` without handing back the plaintext
pub fn verify(blob: &[u8], passphrase: &Passphrase) -> CryptoResult<()> {
    decrypt(blob, passphrase).map(|_| ())
}

/// Serialize `value` as JSON and encrypt it
pub fn encrypt_json<T: Serialize>(
    value: &T,
    passphrase: &Passphrase,
    params: &KdfParams,
) -> CryptoResult<Vec<u8>> {
    let json = Zeroizing::new(
        serde_json::to_vec(value).map_err(|e| CryptoError::Serialization(e.to_string()))?,
    );
    encrypt(&json, passphrase, params)
}

/// Decrypt a blob and deserialize the JSON inside it
pub fn decrypt_json<T: DeserializeOwned>(blob: &[u8], passphrase: &Passphrase) -> CryptoResult<T> {
    let plaintext = decrypt(blob, passphrase)?;
    serde_json::from_slice(&plaintext).map_err(|_| CryptoError::WrongPassphrase)
}
