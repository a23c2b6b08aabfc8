//! Configuration surface recognized by the container: the handful of
//! options an embedder sets once and threads through vault/writer/reader
//! construction, gathered into one value rather than scattered parameters.

use std::path::PathBuf;

/// Default plaintext chunk granularity: 64 KiB.
pub const DEFAULT_CHUNK_SIZE: u32 = 65536;

/// How a logical filename maps to the physical container path on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionMode {
    /// The container file sits at the same path the user sees.
    #[default]
    Transparent,
    /// The physical file is the logical name plus `.enc`.
    Suffixed,
}

impl ExtensionMode {
    /// Map a logical path to the physical path this mode dictates.
    pub fn physical_path(self, logical: &std::path::Path) -> PathBuf {
        match self {
            ExtensionMode::Transparent => logical.to_path_buf(),
            ExtensionMode::Suffixed => {
                let mut s = logical.as_os_str().to_owned();
                s.push(".enc");
                PathBuf::from(s)
            }
        }
    }
}

/// Aggregate configuration for a container-backed storage area.
///
/// `master_key_source` is intentionally absent from this struct: its
/// provisioning is out of scope for this crate (see [`crate::vault`]), so
/// the embedder passes a [`crate::vault::MasterAead`] implementation
/// directly to [`crate::vault::load_or_create`] rather than through config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Plaintext chunk granularity. Must be `> 0`; 16 KiB – 1 MiB recommended.
    pub chunk_size: u32,
    /// How logical names map to on-disk container paths.
    pub extension_mode: ExtensionMode,
    /// Location of the sealed keyset file, created on first run.
    pub keyset_path: PathBuf,
    /// Root directory the host resolves logical paths against. Not
    /// interpreted by this crate.
    pub storage_root: PathBuf,
}

impl Config {
    /// Start from documented defaults, given the two paths every embedder
    /// must supply.
    pub fn new(storage_root: impl Into<PathBuf>, keyset_path: impl Into<PathBuf>) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            extension_mode: ExtensionMode::default(),
            keyset_path: keyset_path.into(),
            storage_root: storage_root.into(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_extension_mode(mut self, mode: ExtensionMode) -> Self {
        self.extension_mode = mode;
        self
    }
}
