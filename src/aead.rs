//! The AEAD primitive: a 256-bit key plus `seal`/`open` over AES-256-GCM.
//!
//! Nonces are generated fresh for every `seal` call and prefixed onto the
//! ciphertext; `open` expects the same layout. The key never leaves this
//! module except through the scoped accessor, to keep the window in which
//! raw key bytes sit in an arbitrary stack frame as small as possible.

use aead::Payload;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Size of the randomized nonce prepended to every sealed payload.
pub const NONCE_LEN: usize = 12;
/// Size of the GCM authentication tag appended to every sealed payload.
pub const TAG_LEN: usize = 16;
/// Total non-plaintext overhead of one `seal` call.
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// A 256-bit AEAD key, held in zeroizing memory.
///
/// `AeadKey` is the primitive described in the container's AEAD contract
/// (4.1): it does not know about chunks, headers, or the keyset file — it
/// only seals and opens opaque byte strings under associated data.
pub struct AeadKey(Zeroizing<[u8; 32]>);

impl AeadKey {
    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Generate a fresh random key.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    /// Run `f` with a constructed cipher over the key, then drop it.
    fn with_cipher<R>(&self, f: impl FnOnce(&Aes256Gcm) -> R) -> R {
        let key = Key::<Aes256Gcm>::from_slice(&*self.0);
        let cipher = Aes256Gcm::new(key);
        f(&cipher)
    }

    /// Expose the raw key bytes to a scoped closure. Prefer `seal`/`open`;
    /// this exists for callers (the keyset vault) that must serialize the
    /// key itself rather than use it to seal a payload.
    pub fn with_raw_key<R>(&self, f: impl FnOnce(&[u8; 32]) -> R) -> R {
        f(&self.0)
    }

    /// Seal `plaintext` under `aad`, producing `nonce || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Vec<u8> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self.with_cipher(|cipher| {
            cipher
                .encrypt(
                    nonce,
                    Payload {
                        msg: plaintext,
                        aad,
                    },
                )
                .expect("AES-256-GCM encryption is infallible for valid key/nonce lengths")
        });

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        out
    }

    /// Open a `nonce || ciphertext || tag` blob sealed by `seal`, verifying
    /// `aad`. `chunk_index` is only used to attribute a failure for error
    /// reporting; pass `u64::MAX` for non-chunk callers (e.g. the keyset).
    pub fn open(
        &self,
        sealed: &[u8],
        aad: &[u8],
        chunk_index: u64,
    ) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < OVERHEAD {
            return Err(CryptoError::AuthenticationFailed { chunk_index });
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.with_cipher(|cipher| {
            cipher
                .decrypt(nonce, Payload { msg: ciphertext, aad })
                .map_err(|_| CryptoError::AuthenticationFailed { chunk_index })
        })
    }
}

impl std::fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AeadKey([REDACTED])")
    }
}
