//! The keyset vault: loads or creates the data-encryption key, sealed on
//! disk under an externally supplied, opaque master key.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::aead::AeadKey;
use crate::error::{CafcError, CryptoError, MasterKeyError, StorageError};

/// Schema version of the on-disk keyset envelope. Unrelated to the
/// container format's own `version` field (see [`crate::codec::VERSION`]);
/// this one only versions how the sealed keyset blob is wrapped in JSON.
const KEYSET_SCHEMA_VERSION: u32 = 1;

/// The master-key capability the embedder hands to [`load_or_create`].
///
/// The vault treats this purely as an AEAD: it never inspects how the
/// master key is provisioned (env var, KMS, file — all out of scope here).
pub trait MasterAead {
    /// Seal `plaintext` under empty associated data.
    fn seal(&self, plaintext: &[u8]) -> Vec<u8>;

    /// Open a blob sealed by `seal`, under empty associated data.
    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Blanket impl so an [`AeadKey`] itself can serve as a master key, which
/// is how this crate's own tests and the `testing` module exercise the
/// vault without a real KMS.
impl MasterAead for AeadKey {
    fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        AeadKey::seal(self, plaintext, b"")
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        AeadKey::open(self, sealed, b"", u64::MAX)
    }
}

#[derive(Serialize, Deserialize)]
struct KeysetEnvelope {
    schema_version: u32,
    sealed_hex: String,
}

/// A handle to the unwrapped data-encryption key.
///
/// Cheap to clone (an `Arc` underneath); safe to share across threads for
/// concurrent `seal`/`open` calls, per the container's concurrency model.
#[derive(Clone, Debug)]
pub struct KeysetHandle {
    key: Arc<AeadKey>,
}

impl KeysetHandle {
    fn new(key: AeadKey) -> Self {
        Self { key: Arc::new(key) }
    }

    /// The AEAD primitive (4.1) offered by this keyset.
    pub fn aead(&self) -> &AeadKey {
        &self.key
    }
}

/// Load the keyset at `path` if it exists, otherwise generate and persist a
/// fresh one. Either way, `master_aead` is used only to seal/open the
/// keyset blob itself, under empty associated data.
#[instrument(level = "debug", skip(master_aead), fields(path = %path.as_ref().display()))]
pub fn load_or_create(
    path: impl AsRef<Path>,
    master_aead: &dyn MasterAead,
) -> Result<KeysetHandle, CafcError> {
    let path = path.as_ref();
    if path.exists() {
        load(path, master_aead)
    } else {
        create(path, master_aead)
    }
}

fn load(path: &Path, master_aead: &dyn MasterAead) -> Result<KeysetHandle, CafcError> {
    let contents = fs::read(path).map_err(|e| StorageError::at(path, e))?;
    let envelope: KeysetEnvelope = serde_json::from_slice(&contents)
        .map_err(|e| StorageError::at(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    if envelope.schema_version != KEYSET_SCHEMA_VERSION {
        return Err(crate::error::FormatError::UnsupportedKeysetSchema {
            found: envelope.schema_version,
        }
        .into());
    }

    let sealed = hex::decode(&envelope.sealed_hex)
        .map_err(|e| StorageError::at(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    let raw = master_aead.open(&sealed).map_err(|_| {
        warn!(path = %path.display(), "keyset unwrap failed: wrong master key or tampered keyset");
        MasterKeyError::UnwrapFailed {
            path: path.to_path_buf(),
        }
    })?;

    let key_bytes: [u8; 32] = raw
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: v.len(),
        })?;

    debug!(path = %path.display(), "loaded existing keyset");
    Ok(KeysetHandle::new(AeadKey::from_bytes(key_bytes)))
}

fn create(path: &Path, master_aead: &dyn MasterAead) -> Result<KeysetHandle, CafcError> {
    let key = AeadKey::random();
    let sealed = key.with_raw_key(|bytes| master_aead.seal(bytes));

    let envelope = KeysetEnvelope {
        schema_version: KEYSET_SCHEMA_VERSION,
        sealed_hex: hex::encode(sealed),
    };
    let json = serde_json::to_vec_pretty(&envelope)
        .expect("KeysetEnvelope serialization cannot fail");

    write_atomic(path, &json).map_err(|e| StorageError::at(path, e))?;

    debug!(path = %path.display(), "created new keyset");
    Ok(KeysetHandle::new(key))
}

/// Write `contents` to `path` by writing a sibling temp file and renaming
/// it into place, so a crash mid-write never leaves a half-written keyset.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut suffix = [0u8; 8];
    rand::rng().fill_bytes(&mut suffix);
    let temp_path: PathBuf = parent.join(format!(".{}.tmp", hex::encode(suffix)));

    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)
}
