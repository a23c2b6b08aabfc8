//! The container codec: the on-disk layout, header (de)serialization, and
//! chunk length-prefix framing. Every function here is a pure, stateless
//! transform over bytes or a seekable handle — no key material, no channel
//! state.

use std::io::{self, Read, Seek, SeekFrom};

use rand::RngCore;

use crate::error::{FormatError, StorageError};

/// Fixed on-disk header size in bytes.
pub const HEADER_LEN: usize = 32;

/// 4-byte literal magic identifying a CAFC container.
pub const MAGIC: [u8; 4] = *b"CENC";

/// Only supported container version.
pub const VERSION: u16 = 1;

/// Upper bound on a sealed chunk's length prefix, relative to the
/// container's configured `chunk_size`. Guards `locate_chunk` and chunk
/// reads against a corrupted or adversarial length field causing an
/// unbounded allocation or read.
pub const MAX_AEAD_OVERHEAD: u32 = 128;

/// The parsed, fixed-size container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub chunk_size: u32,
    pub original_size: u64,
}

impl FileHeader {
    /// Number of chunks implied by `original_size` and `chunk_size`.
    /// Zero when `original_size == 0`.
    pub fn total_chunks(&self) -> u64 {
        total_chunks(self)
    }

    /// Plaintext length of chunk `i`, or `None` if `i` is out of range.
    pub fn chunk_plaintext_len(&self, i: u64) -> Option<u64> {
        let n = self.total_chunks();
        if i >= n {
            return None;
        }
        if i + 1 == n {
            let full = i * self.chunk_size as u64;
            Some(self.original_size - full)
        } else {
            Some(self.chunk_size as u64)
        }
    }
}

/// Write the 32-byte header to `sink` at the current position.
///
/// `original_size` is typically `0` on first emission (a placeholder) and
/// back-patched by the writer on close.
pub fn write_header(
    sink: &mut impl io::Write,
    chunk_size: u32,
    original_size: u64,
) -> Result<(), StorageError> {
    debug_assert!(chunk_size > 0, "chunk_size must be validated before this call");

    let mut buf = [0u8; HEADER_LEN];
    buf[0..4].copy_from_slice(&MAGIC);
    buf[4..6].copy_from_slice(&VERSION.to_be_bytes());
    buf[6..10].copy_from_slice(&chunk_size.to_be_bytes());
    buf[10..18].copy_from_slice(&original_size.to_be_bytes());
    rand::rng().fill_bytes(&mut buf[18..32]);

    sink.write_all(&buf).map_err(StorageError::from)
}

/// Parse a 32-byte header buffer.
pub fn parse_header(buf: &[u8; HEADER_LEN]) -> Result<FileHeader, FormatError> {
    if buf[0..4] != MAGIC {
        return Err(FormatError::BadMagic);
    }
    let version = u16::from_be_bytes([buf[4], buf[5]]);
    if version != VERSION {
        return Err(FormatError::UnsupportedVersion { found: version });
    }
    let chunk_size = u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]);
    if chunk_size == 0 {
        return Err(FormatError::InvalidChunkSize(chunk_size));
    }
    let original_size = u64::from_be_bytes([
        buf[10], buf[11], buf[12], buf[13], buf[14], buf[15], buf[16], buf[17],
    ]);

    Ok(FileHeader {
        chunk_size,
        original_size,
    })
}

/// Frame a sealed chunk payload as `[len: u32 be][payload]`.
pub fn encode_chunk(sealed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + sealed.len());
    out.extend_from_slice(&(sealed.len() as u32).to_be_bytes());
    out.extend_from_slice(sealed);
    out
}

/// Number of chunks implied by a header. `0` when `original_size == 0`.
pub fn total_chunks(header: &FileHeader) -> u64 {
    if header.original_size == 0 {
        return 0;
    }
    header.original_size.div_ceil(header.chunk_size as u64)
}

/// Starting file offset of chunk `i`'s length prefix, found by walking the
/// length-prefix stream from offset `HEADER_LEN`. `handle`'s position is
/// left just past the walk; callers that need a stable position should
/// seek again.
pub fn locate_chunk<H: Read + Seek>(
    handle: &mut H,
    header: &FileHeader,
    i: u64,
) -> Result<u64, FormatError> {
    let max_len = header.chunk_size + MAX_AEAD_OVERHEAD;

    handle
        .seek(SeekFrom::Start(HEADER_LEN as u64))
        .map_err(|_| FormatError::TruncatedStream {
            context: "seeking to chunk stream start",
        })?;

    let mut offset = HEADER_LEN as u64;
    for _ in 0..i {
        let mut len_buf = [0u8; 4];
        handle
            .read_exact(&mut len_buf)
            .map_err(|_| FormatError::TruncatedStream {
                context: "reading chunk length prefix",
            })?;
        let len = u32::from_be_bytes(len_buf);
        if len == 0 || len > max_len {
            return Err(FormatError::InvalidLengthPrefix {
                len,
                bound: max_len,
            });
        }
        let skip = 4 + len as u64;
        handle
            .seek(SeekFrom::Current(len as i64))
            .map_err(|_| FormatError::TruncatedStream {
                context: "skipping chunk payload",
            })?;
        offset += skip;
    }

    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trip() {
        let mut buf = Vec::new();
        write_header(&mut buf, 65536, 12345).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);

        let arr: [u8; HEADER_LEN] = buf.try_into().unwrap();
        let header = parse_header(&arr).unwrap();
        assert_eq!(header.chunk_size, 65536);
        assert_eq!(header.original_size, 12345);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(b"NOPE");
        assert!(matches!(parse_header(&buf), Err(FormatError::BadMagic)));
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..6].copy_from_slice(&2u16.to_be_bytes());
        assert!(matches!(
            parse_header(&buf),
            Err(FormatError::UnsupportedVersion { found: 2 })
        ));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..6].copy_from_slice(&VERSION.to_be_bytes());
        assert!(matches!(
            parse_header(&buf),
            Err(FormatError::InvalidChunkSize(0))
        ));
    }

    #[test]
    fn total_chunks_matches_spec_boundaries() {
        let h = |size| FileHeader {
            chunk_size: 16,
            original_size: size,
        };
        assert_eq!(total_chunks(&h(0)), 0);
        assert_eq!(total_chunks(&h(16)), 1);
        assert_eq!(total_chunks(&h(17)), 2);
        assert_eq!(total_chunks(&h(48)), 3);
    }

    #[test]
    fn chunk_plaintext_len_last_chunk_is_remainder() {
        let header = FileHeader {
            chunk_size: 16,
            original_size: 40,
        };
        assert_eq!(header.chunk_plaintext_len(0), Some(16));
        assert_eq!(header.chunk_plaintext_len(1), Some(16));
        assert_eq!(header.chunk_plaintext_len(2), Some(8));
        assert_eq!(header.chunk_plaintext_len(3), None);
    }

    #[test]
    fn locate_chunk_walks_length_prefixes() {
        let header = FileHeader {
            chunk_size: 16,
            original_size: 40,
        };
        let mut file = Vec::new();
        file.extend(std::iter::repeat_n(0u8, HEADER_LEN));
        file.extend(encode_chunk(&[0u8; 10]));
        file.extend(encode_chunk(&[0u8; 20]));
        file.extend(encode_chunk(&[0u8; 5]));

        let mut cursor = Cursor::new(file);
        assert_eq!(locate_chunk(&mut cursor, &header, 0).unwrap(), HEADER_LEN as u64);
        assert_eq!(
            locate_chunk(&mut cursor, &header, 1).unwrap(),
            HEADER_LEN as u64 + 4 + 10
        );
        assert_eq!(
            locate_chunk(&mut cursor, &header, 2).unwrap(),
            HEADER_LEN as u64 + 4 + 10 + 4 + 20
        );
    }

    #[test]
    fn locate_chunk_rejects_oversized_length_prefix() {
        let header = FileHeader {
            chunk_size: 16,
            original_size: 16,
        };
        let mut file = Vec::new();
        file.extend(std::iter::repeat_n(0u8, HEADER_LEN));
        file.extend(encode_chunk(&[0u8; 1000]));
        let mut cursor = Cursor::new(file);
        assert!(matches!(
            locate_chunk(&mut cursor, &header, 1),
            Err(FormatError::InvalidLengthPrefix { .. })
        ));
    }
}
