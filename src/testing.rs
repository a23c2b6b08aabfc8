//! Test-only scaffolding shared across this crate's unit and integration
//! tests: scratch-directory helpers built on `tempfile`, plus a ready-made
//! keyset sealed under the [`AeadKey`]-as-[`MasterAead`] blanket impl so
//! tests never need a real KMS.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::aead::AeadKey;
use crate::vault::{self, KeysetHandle};

/// A bare scratch directory, torn down when dropped. For tests that need
/// to control the keyset path or master key themselves; most tests want
/// [`ScratchVault`] instead.
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create scratch directory")
}

/// A scratch directory plus a ready-made keyset inside it, torn down when
/// dropped. Bundles the `tempdir()` + `load_or_create()` pair nearly every
/// test in this crate otherwise repeats inline.
pub struct ScratchVault {
    dir: TempDir,
    keyset: KeysetHandle,
}

impl ScratchVault {
    /// Create a fresh temp directory with a freshly generated keyset,
    /// sealed under a fresh, throwaway `AeadKey` standing in for a real
    /// externally-provisioned master key.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create scratch directory");
        let master = AeadKey::random();
        let keyset = vault::load_or_create(dir.path().join("keyset.json"), &master)
            .expect("scratch keyset creation cannot fail");
        Self { dir, keyset }
    }

    /// The scratch directory's path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `path()` joined with `name`, for a container file inside the scratch area.
    pub fn container_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// A cheap clone of the scratch keyset handle.
    pub fn keyset(&self) -> KeysetHandle {
        self.keyset.clone()
    }
}

impl Default for ScratchVault {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_vault_hands_out_a_usable_keyset() {
        let scratch = ScratchVault::new();
        let path = scratch.container_path("f.enc");

        let mut w = crate::writer::Writer::create(&path, "f.txt", 16, scratch.keyset()).unwrap();
        w.write(b"scratch-backed round trip").unwrap();
        w.close().unwrap();

        let mut r = crate::reader::Reader::open(&path, "f.txt", scratch.keyset()).unwrap();
        let mut buf = [0u8; 64];
        let crate::reader::ReadOutcome::Read(n) = r.read(&mut buf).unwrap() else {
            panic!("expected data");
        };
        assert_eq!(&buf[..n], b"scratch-backed round trip");
    }
}
