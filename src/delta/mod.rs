//! Binary deltas in Git's pack delta payload format
//!
//! A delta describes `target` as a sequence of instructions against `base`:
//!
//! ```text
//! varint(base_len) varint(target_len) instruction*
//!
//! copy:   opcode with bit 7 set
//!         bits 0-3: which little-endian offset bytes follow
//!         bits 4-6: which little-endian size bytes follow (none = 0x10000)
//! insert: 0nnnnnnn opcode (1..=127) followed by n literal bytes
//! ```
//!
//! Payloads produced here can be applied by Git and vice versa. Deltas are
//! meant for successive versions of the same blob, so matching is greedy and
//! bounded (see [`MAX_CANDIDATES`]) rather than optimal.

mod decode;
mod encode;
mod varint;

use crate::Result;

pub use decode::apply;
pub use encode::create;

/// Length of the keys used to find match candidates
pub const KEY_LEN: usize = 4;

/// Most recent base positions remembered per key.
///
/// Trades compression for near-linear time: once more positions share a key
/// the longest match may be missed.
pub const MAX_CANDIDATES: usize = 64;

/// Largest size a single copy instruction can carry
pub const MAX_COPY: usize = 0xFF_FFFF;

/// Largest literal run a single insert instruction can carry
pub const MAX_INSERT: usize = 0x7F;

/// Copy size implied when an instruction carries no size bytes
pub const DEFAULT_COPY_SIZE: usize = 0x1_0000;

/// Declared `(base_len, result_len)` of a delta payload
pub fn header(delta: &[u8]) -> Result<(usize, usize)> {
    let (base_len, result_len, _) = decode::read_header(delta)?;
    Ok((base_len, result_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_small_edit() {
        let base = b"fn main() {\n    println!(\"hello\");\n}\n".repeat(8);
        let mut target = base.clone();
        target.splice(40..45, b"goodbye".iter().copied());

        let delta = create(&base, &target);
        assert!(delta.len() < target.len() / 2);
        assert_eq!(apply(&base, &delta).unwrap(), target);
        assert_eq!(header(&delta).unwrap(), (base.len(), target.len()));
    }

    #[test]
    fn test_roundtrip_empty_target() {
        let delta = create(b"something", b"");
        assert_eq!(delta, vec![9, 0]);
        assert!(apply(b"something", &delta).unwrap().is_empty());
    }
}
