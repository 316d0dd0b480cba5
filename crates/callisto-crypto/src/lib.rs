//! callisto-crypto: encryption at rest for report records
//!
//! A report's answers are serialized to JSON and sealed under a key derived
//! from the author's passphrase. Nothing in this crate persists or logs the
//! passphrase; derived keys are zeroized on drop.
//!
//! ## Blob layout
//!
//! | Field      | Size | Notes                               |
//! |------------|------|-------------------------------------|
//! | magic      | 4    | `CLRP`                              |
//! | version    | 1    | currently `1`                       |
//! | m_cost     | 4    | Argon2id memory cost (KiB), LE      |
//! | t_cost     | 4    | Argon2id iterations, LE             |
//! | p_cost     | 4    | Argon2id lanes, LE                  |
//! | salt       | 32   | random per write                    |
//! | nonce      | 24   | XChaCha20-Poly1305 nonce            |
//! | ciphertext | n+16 | includes Poly1305 tag               |
//!
//! Everything before the ciphertext is authenticated as associated data.
//!
//! ## Example
//!
//! ```rust
//! use callisto_crypto::{KdfParams, Passphrase, decrypt_json, encrypt_json};
//!
//! let passphrase = Passphrase::new("correct horse battery staple");
//! let params = KdfParams::insecure_for_tests();
//!
//! let blob = encrypt_json(&vec!["answer"], &passphrase, &params).unwrap();
//! let back: Vec<String> = decrypt_json(&blob, &passphrase).unwrap();
//! assert_eq!(back, vec!["answer".to_string()]);
//! ```

mod envelope;
mod error;
mod kdf;
mod passphrase;

pub use envelope::{decrypt, decrypt_json, encrypt, encrypt_json, verify, HEADER_LEN, MAGIC};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive_key, KdfParams};
pub use passphrase::Passphrase;
