//! Property-based coverage for the core's cross-cutting invariants: base64
//! round-tripping, tag uniqueness, and literal-block byte-exactness. These
//! are a better fit for `proptest` than an example-based test because the
//! property holds over an unbounded input space (arbitrary byte strings,
//! arbitrary command counts) rather than a handful of worked scenarios.

use base64::Engine;
use proptest::prelude::*;

use antik_imap::command::TagGenerator;
use antik_imap::wire::{parse_literal_length, split_logical_lines};

proptest! {
    /// `decode(encode(x)) == x` for arbitrary byte sequences, including the
    /// 1-4 byte boundary cases RFC 4648 padding has to get right.
    #[test]
    fn base64_round_trips_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .expect("round-trip decode must succeed");
        prop_assert_eq!(decoded, data);
    }

    /// No two tags issued by one generator ever collide, regardless of how
    /// many are drawn.
    #[test]
    fn tags_are_unique_across_any_number_of_draws(count in 1usize..2000) {
        let generator = TagGenerator::default();
        let mut seen = std::collections::HashSet::with_capacity(count);
        for _ in 0..count {
            let tag = generator.next();
            prop_assert!(seen.insert(tag), "tag generator produced a duplicate");
        }
    }

    /// A `{N}` literal embedded in a response blob is captured byte-exact by
    /// `split_logical_lines`, regardless of what bytes the literal contains
    /// (including embedded CR/LF that would otherwise look like a line
    /// boundary).
    #[test]
    fn literal_block_is_captured_byte_exact(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut blob = Vec::new();
        blob.extend_from_slice(format!("* 1 FETCH (BODY[TEXT] {{{}}}\r\n", payload.len()).as_bytes());
        blob.extend_from_slice(&payload);
        blob.extend_from_slice(b")\r\n");
        blob.extend_from_slice(b"A0001 OK FETCH completed\r\n");

        let lines = split_logical_lines(&blob);
        prop_assert_eq!(lines.len(), 2);

        let fetch_line = &lines[0];
        let literal_start = fetch_line
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|p| p + 2)
            .expect("header line must be CRLF-terminated");
        let declared = parse_literal_length(&fetch_line[..literal_start])
            .expect("fetch line must declare a literal length");
        prop_assert_eq!(declared, payload.len());

        let captured = &fetch_line[literal_start..literal_start + payload.len()];
        prop_assert_eq!(captured, payload.as_slice());
    }
}
