//! Property-based checks over the container's core invariants: arbitrary
//! plaintexts round-trip, random-access reads agree with a plain in-memory
//! slice, and the on-disk size follows the documented formula.

use cafc::codec::HEADER_LEN;
use cafc::reader::{ReadOutcome, Reader};
use cafc::testing::ScratchVault;
use cafc::writer::Writer;
use proptest::prelude::*;

fn round_trip(chunk_size: u32, data: &[u8]) -> Vec<u8> {
    let scratch = ScratchVault::new();
    let path = scratch.container_path("f.enc");

    let mut w = Writer::create(&path, "f.bin", chunk_size, scratch.keyset()).unwrap();
    w.write(data).unwrap();
    w.close().unwrap();

    let mut r = Reader::open(&path, "f.bin", scratch.keyset()).unwrap();
    let mut out = vec![0u8; data.len()];
    let mut read = 0;
    while read < out.len() {
        match r.read(&mut out[read..]).unwrap() {
            ReadOutcome::Read(n) => read += n,
            ReadOutcome::Eof => break,
        }
    }
    out.truncate(read);
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arbitrary_plaintext_round_trips(
        chunk_size in 1u32..200,
        data in proptest::collection::vec(any::<u8>(), 0..2000),
    ) {
        let recovered = round_trip(chunk_size, &data);
        prop_assert_eq!(recovered, data);
    }

    #[test]
    fn container_size_matches_chunk_framing_formula(
        chunk_size in 8u32..128,
        data in proptest::collection::vec(any::<u8>(), 0..1000),
    ) {
        let scratch = ScratchVault::new();
        let path = scratch.container_path("f.enc");

        let mut w = Writer::create(&path, "f.bin", chunk_size, scratch.keyset()).unwrap();
        w.write(&data).unwrap();
        w.close().unwrap();

        let on_disk = std::fs::metadata(&path).unwrap().len();
        let full_chunks = data.len() as u64 / chunk_size as u64;
        let remainder = data.len() as u64 % chunk_size as u64;
        let num_chunks = if remainder == 0 { full_chunks } else { full_chunks + 1 };
        // Every chunk record is [4-byte length][nonce(12) || ciphertext || tag(16)],
        // and every chunk but the last carries exactly chunk_size plaintext bytes.
        let overhead_per_chunk: u64 = 4 + 12 + 16;
        let plaintext_total: u64 = data.len() as u64;
        let expected = HEADER_LEN as u64 + plaintext_total + num_chunks * overhead_per_chunk;

        prop_assert_eq!(on_disk, expected);
    }

    #[test]
    fn random_access_window_matches_slice(
        chunk_size in 4u32..64,
        data in proptest::collection::vec(any::<u8>(), 1..500),
        offset_seed in 0u64..10_000,
        len in 1usize..64,
    ) {
        let scratch = ScratchVault::new();
        let path = scratch.container_path("f.enc");

        let mut w = Writer::create(&path, "f.bin", chunk_size, scratch.keyset()).unwrap();
        w.write(&data).unwrap();
        w.close().unwrap();

        let offset = (offset_seed as usize) % data.len();
        let mut r = Reader::open(&path, "f.bin", scratch.keyset()).unwrap();
        r.set_position(offset as u64).unwrap();

        let mut buf = vec![0u8; len];
        let outcome = r.read(&mut buf).unwrap();
        let expected_len = len.min(data.len() - offset);

        match outcome {
            ReadOutcome::Read(n) => {
                prop_assert_eq!(n, expected_len);
                prop_assert_eq!(&buf[..n], &data[offset..offset + n]);
            }
            ReadOutcome::Eof => prop_assert_eq!(expected_len, 0),
        }
    }
}
