//! The streaming, append-only write side of a chunked channel.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace, warn};
use zeroize::Zeroizing;

use crate::codec;
use crate::error::{CafcError, ClosedError, SeekError, TruncateError};
use crate::vault::KeysetHandle;

/// Maximum forward gap `set_position` will fill with zero bytes before
/// refusing the seek. A much larger request is almost certainly a caller
/// bug rather than an intentional sparse write.
pub const MAX_FORWARD_SEEK_GAP: u64 = 10 * 1024 * 1024;

/// A sealed, append-only byte channel over one container file.
///
/// Buffers up to one `chunk_size` of plaintext, seals it, and appends it.
/// Owns its file handle exclusively from `create` to `close`.
pub struct Writer {
    file: File,
    path: PathBuf,
    name: String,
    keyset: KeysetHandle,
    chunk_size: u32,
    buffer: Zeroizing<Vec<u8>>,
    chunk_index: u32,
    total_plaintext: u64,
    header_emitted: bool,
    open: bool,
}

impl Writer {
    /// Create (or truncate) the container file at `path` and begin a new
    /// write session bound to logical name `name` — the string woven into
    /// every chunk's associated data.
    #[instrument(level = "debug", skip(keyset), fields(path = %path.as_ref().display(), name))]
    pub fn create(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        chunk_size: u32,
        keyset: KeysetHandle,
    ) -> Result<Self, CafcError> {
        if chunk_size == 0 {
            return Err(crate::error::ArgumentError::NonPositiveChunkSize.into());
        }
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| crate::error::StorageError::at(&path, e))?;

        debug!(path = %path.display(), "writer opened");

        Ok(Self {
            file,
            path,
            name: name.into(),
            keyset,
            chunk_size,
            buffer: Zeroizing::new(Vec::with_capacity(chunk_size as usize)),
            chunk_index: 0,
            total_plaintext: 0,
            header_emitted: false,
            open: true,
        })
    }

    fn ensure_open(&self, what: &'static str) -> Result<(), CafcError> {
        if self.open {
            Ok(())
        } else {
            Err(ClosedError::AlreadyClosed { what }.into())
        }
    }

    /// Append `src` to the logical plaintext stream, sealing and flushing
    /// complete chunks as the buffer fills.
    pub fn write(&mut self, src: &[u8]) -> Result<usize, CafcError> {
        self.ensure_open("writer")?;

        self.buffer.extend_from_slice(src);
        while self.buffer.len() >= self.chunk_size as usize {
            let chunk_size = self.chunk_size as usize;
            let chunk_data: Vec<u8> = self.buffer.drain(..chunk_size).collect();
            self.flush_chunk(&chunk_data)?;
        }
        self.total_plaintext += src.len() as u64;

        Ok(src.len())
    }

    fn flush_chunk(&mut self, plaintext: &[u8]) -> Result<(), CafcError> {
        self.ensure_header_emitted()?;

        let aad = format!("{}:chunk:{}", self.name, self.chunk_index);
        let sealed = self.keyset.aead().seal(plaintext, aad.as_bytes());
        let framed = codec::encode_chunk(&sealed);

        if let Err(e) = self.file.write_all(&framed) {
            self.open = false;
            return Err(crate::error::StorageError::at(&self.path, e).into());
        }

        trace!(chunk = self.chunk_index, plaintext_len = plaintext.len(), "chunk flushed");
        self.chunk_index += 1;
        Ok(())
    }

    fn ensure_header_emitted(&mut self) -> Result<(), CafcError> {
        if self.header_emitted {
            return Ok(());
        }
        codec::write_header(&mut self.file, self.chunk_size, 0).map_err(|e| {
            self.open = false;
            e
        })?;
        self.header_emitted = true;
        Ok(())
    }

    /// Current logical write position (total plaintext bytes accepted so far).
    pub fn position(&self) -> u64 {
        self.total_plaintext
    }

    /// Move the write position. Only a no-op (`p == position()`) or a small
    /// forward gap (filled with zero bytes) is supported; any backward
    /// request fails since sealed chunks cannot be rewritten.
    pub fn set_position(&mut self, p: u64) -> Result<(), CafcError> {
        self.ensure_open("writer")?;

        if p == self.total_plaintext {
            return Ok(());
        }
        if p < self.total_plaintext {
            return Err(SeekError::Backward {
                current: self.total_plaintext,
                requested: p,
            }
            .into());
        }
        let gap = p - self.total_plaintext;
        if gap > MAX_FORWARD_SEEK_GAP {
            return Err(SeekError::GapTooLarge {
                gap,
                limit: MAX_FORWARD_SEEK_GAP,
            }
            .into());
        }
        let zeros = vec![0u8; gap as usize];
        self.write(&zeros)?;
        Ok(())
    }

    /// Truncating to anything at or past the current position is a no-op;
    /// shrinking already-sealed content is not supported.
    pub fn truncate(&mut self, n: u64) -> Result<(), CafcError> {
        self.ensure_open("writer")?;
        if n >= self.total_plaintext {
            Ok(())
        } else {
            Err(TruncateError::AlreadySealed {
                requested: n,
                written: self.total_plaintext,
            }
            .into())
        }
    }

    /// Flush any buffered plaintext, finalize the header's `original_size`
    /// field, and release the file handle. Idempotent.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn close(&mut self) -> Result<(), CafcError> {
        if !self.open {
            return Ok(());
        }

        self.ensure_header_emitted()?;

        if !self.buffer.is_empty() {
            let remaining: Vec<u8> = self.buffer.drain(..).collect();
            self.flush_chunk(&remaining)?;
        }

        let mut backpatch = || -> std::io::Result<()> {
            self.file.seek(SeekFrom::Start(10))?;
            self.file.write_all(&self.total_plaintext.to_be_bytes())?;
            self.file.flush()
        };
        if let Err(e) = backpatch() {
            self.open = false;
            return Err(crate::error::StorageError::at(&self.path, e).into());
        }

        debug!(
            chunks = self.chunk_index,
            plaintext_len = self.total_plaintext,
            "writer closed"
        );

        self.open = false;
        Ok(())
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if self.open {
            warn!(path = %self.path.display(), "Writer dropped without close(); container left unfinalized");
        }
    }
}
