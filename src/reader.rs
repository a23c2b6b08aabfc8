//! The random-access read side of a chunked channel.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace, warn};
use zeroize::Zeroizing;

use crate::codec::{self, FileHeader, HEADER_LEN, MAX_AEAD_OVERHEAD};
use crate::error::{CafcError, ClosedError, FormatError};
use crate::vault::KeysetHandle;

/// The distinguished result of a [`Reader::read`] call.
///
/// Downstream byte-channel hosts interpret a zero-length result as "no data
/// yet, try again"; CAFC instead makes end-of-stream an explicit variant so
/// it can never be confused with a transient zero-byte read.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` plaintext bytes were copied into the destination buffer.
    Read(usize),
    /// The current position is at or past the end of the plaintext stream.
    Eof,
}

/// A random-access, read-only byte channel over one container file.
///
/// Holds at most one decrypted chunk in memory and owns an independent
/// seekable handle — multiple `Reader`s over the same path are safe.
#[derive(Debug)]
pub struct Reader {
    file: File,
    path: PathBuf,
    name: String,
    keyset: KeysetHandle,
    header: FileHeader,
    cached_chunk: Option<(u64, Zeroizing<Vec<u8>>)>,
    position: u64,
    open: bool,
}

impl Reader {
    /// Open `path` for random-access reads bound to logical name `name`.
    ///
    /// Rejects a container whose header claims `original_size == 0` but
    /// which has body bytes beyond the header — an unfinalized container
    /// left behind by a writer that never called `close()`.
    #[instrument(level = "debug", skip(keyset), fields(path = %path.as_ref().display(), name))]
    pub fn open(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        keyset: KeysetHandle,
    ) -> Result<Self, CafcError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|e| crate::error::StorageError::at(&path, e))?;

        let mut header_buf = [0u8; HEADER_LEN];
        file.read_exact(&mut header_buf)
            .map_err(|_| FormatError::TruncatedStream {
                context: "reading container header",
            })?;
        let header = codec::parse_header(&header_buf)?;

        if header.original_size == 0 {
            let file_len = file
                .metadata()
                .map_err(|e| crate::error::StorageError::at(&path, e))?
                .len();
            if file_len > HEADER_LEN as u64 {
                return Err(FormatError::UnfinalizedContainer.into());
            }
        }

        debug!(path = %path.display(), original_size = header.original_size, "reader opened");

        Ok(Self {
            file,
            path,
            name: name.into(),
            keyset,
            header,
            cached_chunk: None,
            position: 0,
            open: true,
        })
    }

    fn ensure_open(&self) -> Result<(), CafcError> {
        if self.open {
            Ok(())
        } else {
            Err(ClosedError::AlreadyClosed { what: "reader" }.into())
        }
    }

    /// Total plaintext size recorded in the header.
    pub fn size(&self) -> u64 {
        self.header.original_size
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move the read position. Any non-negative value is accepted,
    /// including past end-of-stream; a subsequent `read` then returns
    /// [`ReadOutcome::Eof`].
    pub fn set_position(&mut self, p: u64) -> Result<(), CafcError> {
        self.ensure_open()?;
        self.position = p;
        Ok(())
    }

    /// Read as much plaintext as fits in `dst`, starting at the current
    /// position, crossing chunk boundaries transparently.
    #[instrument(level = "trace", skip(self, dst), fields(path = %self.path.display(), dst_len = dst.len()))]
    pub fn read(&mut self, dst: &mut [u8]) -> Result<ReadOutcome, CafcError> {
        self.ensure_open()?;

        if dst.is_empty() {
            return Ok(ReadOutcome::Read(0));
        }
        if self.position >= self.header.original_size {
            return Ok(ReadOutcome::Eof);
        }

        let original_size = self.header.original_size;
        let chunk_size = self.header.chunk_size as u64;

        let mut written = 0usize;
        while written < dst.len() && self.position < original_size {
            let i = self.position / chunk_size;
            let off = (self.position % chunk_size) as usize;
            let remaining_total = (original_size - self.position) as usize;

            let plaintext = self.load_chunk(i)?;
            let avail_in_chunk = plaintext.len().saturating_sub(off);
            let to_copy = (dst.len() - written).min(avail_in_chunk).min(remaining_total);

            if to_copy == 0 {
                break;
            }
            dst[written..written + to_copy].copy_from_slice(&plaintext[off..off + to_copy]);
            written += to_copy;
            self.position += to_copy as u64;
        }

        Ok(ReadOutcome::Read(written))
    }

    fn load_chunk(&mut self, i: u64) -> Result<&Zeroizing<Vec<u8>>, CafcError> {
        if !matches!(&self.cached_chunk, Some((cached, _)) if *cached == i) {
            self.cached_chunk = None; // old plaintext dropped here, Zeroizing scrubs it
            trace!(chunk = i, "cache miss, loading chunk from disk");

            let offset = codec::locate_chunk(&mut self.file, &self.header, i)?;
            self.file
                .seek(SeekFrom::Start(offset))
                .map_err(|e| crate::error::StorageError::at(&self.path, e))?;

            let mut len_buf = [0u8; 4];
            self.file
                .read_exact(&mut len_buf)
                .map_err(|_| FormatError::TruncatedStream {
                    context: "reading chunk length prefix",
                })?;
            let len = u32::from_be_bytes(len_buf);
            let max_len = self.header.chunk_size + MAX_AEAD_OVERHEAD;
            if len == 0 || len > max_len {
                return Err(FormatError::InvalidLengthPrefix { len, bound: max_len }.into());
            }

            let mut sealed = vec![0u8; len as usize];
            self.file
                .read_exact(&mut sealed)
                .map_err(|_| FormatError::TruncatedStream {
                    context: "reading chunk payload",
                })?;

            let aad = format!("{}:chunk:{}", self.name, i);
            let plaintext = self.keyset.aead().open(&sealed, aad.as_bytes(), i)?;

            if let Some(expected) = self.header.chunk_plaintext_len(i) {
                if plaintext.len() as u64 != expected {
                    warn!(
                        chunk = i,
                        expected,
                        actual = plaintext.len(),
                        "last-chunk plaintext length mismatch; original_size remains authoritative"
                    );
                }
            }

            self.cached_chunk = Some((i, Zeroizing::new(plaintext)));
        }

        Ok(&self.cached_chunk.as_ref().unwrap().1)
    }

    /// Release the underlying handle and scrub the cached chunk. Idempotent.
    pub fn close(&mut self) {
        self.cached_chunk = None;
        self.open = false;
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.cached_chunk = None;
    }
}
