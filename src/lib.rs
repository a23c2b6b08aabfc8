//! A chunked, authenticated, random-access file encryption container
//! (CAFC): application data is written in the clear through a byte-channel
//! abstraction but stored on disk as an authenticated, chunk-addressable
//! ciphertext container.
//!
//! Four cooperating pieces, leaves first:
//! - [`aead`] — the AEAD primitive, a pure `seal`/`open` pair over a
//!   256-bit key.
//! - [`vault`] — loads or creates the data-encryption keyset, sealed on
//!   disk under an externally supplied master key.
//! - [`codec`] — the on-disk layout: header (de)serialization and
//!   length-prefixed chunk framing.
//! - [`writer`] / [`reader`] — the two concrete byte channels the host
//!   file-transfer layer actually drives.
//!
//! This crate never installs a global `tracing` subscriber; wiring one up
//! is the embedder's responsibility.

pub mod aead;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod reader;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod vault;
pub mod writer;

pub use channel::{open, Channel, OpenMode};
pub use codec::FileHeader;
pub use config::{Config, ExtensionMode};
pub use error::CafcError;
pub use reader::{ReadOutcome, Reader};
pub use vault::{load_or_create, KeysetHandle, MasterAead};
pub use writer::Writer;
