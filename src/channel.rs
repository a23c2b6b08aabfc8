//! The byte-channel entry point the file-transfer host drives: given a
//! logical name and an open mode, resolve the physical path and hand back
//! a concrete [`Reader`] or [`Writer`].
//!
//! Earlier designs in this space favored one interface implementing both
//! read and write, with the "wrong" half of the surface panicking or
//! returning an error at call time. This crate instead exposes two
//! distinct concrete types; [`Channel`] only tags which one `open`
//! produced, so the host branches once, on open mode, rather than on
//! runtime-refused operations scattered through the read/write path.

use std::path::Path;

use crate::config::Config;
use crate::error::CafcError;
use crate::reader::Reader;
use crate::vault::KeysetHandle;
use crate::writer::Writer;

/// Requested access mode for [`open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    /// Resolves to `Read` if the physical file exists, otherwise `Write`.
    ReadWrite,
}

/// The concrete channel produced by [`open`].
pub enum Channel {
    Read(Reader),
    Write(Writer),
}

impl Channel {
    pub fn into_reader(self) -> Option<Reader> {
        match self {
            Channel::Read(r) => Some(r),
            Channel::Write(_) => None,
        }
    }

    pub fn into_writer(self) -> Option<Writer> {
        match self {
            Channel::Write(w) => Some(w),
            Channel::Read(_) => None,
        }
    }
}

/// Resolve `logical_name` against `config`'s storage root and extension
/// mode, then open it per `mode`.
pub fn open(
    config: &Config,
    logical_name: &str,
    mode: OpenMode,
    keyset: KeysetHandle,
) -> Result<Channel, CafcError> {
    let logical_path = config.storage_root.join(logical_name);
    let physical_path = config.extension_mode.physical_path(&logical_path);

    let resolved = match mode {
        OpenMode::Read => OpenMode::Read,
        OpenMode::Write => OpenMode::Write,
        OpenMode::ReadWrite => {
            if physical_exists(&physical_path) {
                OpenMode::Read
            } else {
                OpenMode::Write
            }
        }
    };

    match resolved {
        OpenMode::Read => Ok(Channel::Read(Reader::open(
            &physical_path,
            logical_name,
            keyset,
        )?)),
        OpenMode::Write => Ok(Channel::Write(Writer::create(
            &physical_path,
            logical_name,
            config.chunk_size,
            keyset,
        )?)),
        OpenMode::ReadWrite => unreachable!("resolved above"),
    }
}

fn physical_exists(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScratchVault;

    #[test]
    fn read_write_mode_creates_when_absent() {
        let scratch = ScratchVault::new();
        let config = Config::new(scratch.path(), scratch.container_path("keyset.json"));

        let channel = open(&config, "report.pdf", OpenMode::ReadWrite, scratch.keyset()).unwrap();
        assert!(channel.into_writer().is_some());
    }

    #[test]
    fn read_write_mode_opens_when_present() {
        let scratch = ScratchVault::new();
        let config = Config::new(scratch.path(), scratch.container_path("keyset.json"));

        let mut w = open(&config, "report.pdf", OpenMode::Write, scratch.keyset())
            .unwrap()
            .into_writer()
            .unwrap();
        w.write(b"data").unwrap();
        w.close().unwrap();

        let channel = open(&config, "report.pdf", OpenMode::ReadWrite, scratch.keyset()).unwrap();
        assert!(channel.into_reader().is_some());
    }

    #[test]
    fn suffixed_mode_translates_physical_path() {
        let scratch = ScratchVault::new();
        let config = Config::new(scratch.path(), scratch.container_path("keyset.json"))
            .with_extension_mode(crate::config::ExtensionMode::Suffixed);

        open(&config, "report.pdf", OpenMode::Write, scratch.keyset())
            .unwrap()
            .into_writer()
            .unwrap()
            .close()
            .unwrap();

        assert!(scratch.path().join("report.pdf.enc").exists());
        assert!(!scratch.path().join("report.pdf").exists());
    }
}
