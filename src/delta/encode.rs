//! Delta creation: greedy matching against a recency-bounded key index

use super::{varint, KEY_LEN, MAX_CANDIDATES, MAX_COPY, MAX_INSERT};
use std::collections::{HashMap, VecDeque};

/// Start positions in `base` for every 4-byte key, newest last
struct KeyIndex {
    positions: HashMap<u32, VecDeque<usize>>,
}

impl KeyIndex {
    fn build(base: &[u8]) -> Self {
        let mut positions: HashMap<u32, VecDeque<usize>> = HashMap::new();
        if base.len() >= KEY_LEN {
            for pos in 0..=base.len() - KEY_LEN {
                // Copy offsets are at most 32 bits wide
                if pos > u32::MAX as usize {
                    break;
                }
                let bucket = positions.entry(key_at(base, pos)).or_default();
                bucket.push_back(pos);
                if bucket.len() > MAX_CANDIDATES {
                    bucket.pop_front();
                }
            }
        }
        KeyIndex { positions }
    }

    /// Longest match for `target[at..]`, as `(base_offset, len)`
    fn longest_match(&self, base: &[u8], target: &[u8], at: usize) -> Option<(usize, usize)> {
        if at + KEY_LEN > target.len() {
            return None;
        }
        let candidates = self.positions.get(&key_at(target, at))?;
        let mut best: Option<(usize, usize)> = None;
        for &pos in candidates {
            let len = base[pos..]
                .iter()
                .zip(&target[at..])
                .take_while(|(a, b)| a == b)
                .count();
            if best.map_or(true, |(_, best_len)| len > best_len) {
                best = Some((pos, len));
            }
        }
        best
    }
}

fn key_at(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn flush_insert(out: &mut Vec<u8>, literal: &mut Vec<u8>) {
    for chunk in literal.chunks(MAX_INSERT) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    literal.clear();
}

/// Emit one copy instruction; `size` must be in `1..=MAX_COPY`
pub(crate) fn push_copy(out: &mut Vec<u8>, offset: u32, size: usize) {
    debug_assert!(size > 0 && size <= MAX_COPY);
    let opcode_at = out.len();
    let mut opcode = 0x80u8;
    out.push(opcode);

    for i in 0..4 {
        let byte = (offset >> (8 * i)) as u8;
        if byte != 0 {
            opcode |= 1 << i;
            out.push(byte);
        }
    }
    for i in 0..3 {
        let byte = (size >> (8 * i)) as u8;
        if byte != 0 {
            opcode |= 0x10 << i;
            out.push(byte);
        }
    }
    out[opcode_at] = opcode;
}

/// Encode `target` as copy/insert instructions against `base`
pub fn create(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + target.len() / 4);
    varint::write(&mut out, base.len());
    varint::write(&mut out, target.len());

    let index = KeyIndex::build(base);
    let mut literal: Vec<u8> = Vec::with_capacity(MAX_INSERT);
    let mut at = 0;

    while at < target.len() {
        match index.longest_match(base, target, at) {
            Some((offset, len)) if len >= KEY_LEN => {
                flush_insert(&mut out, &mut literal);
                let mut copied = 0;
                while copied < len {
                    let size = (len - copied).min(MAX_COPY);
                    push_copy(&mut out, (offset + copied) as u32, size);
                    copied += size;
                }
                at += len;
            }
            _ => {
                literal.push(target[at]);
                if literal.len() == MAX_INSERT {
                    flush_insert(&mut out, &mut literal);
                }
                at += 1;
            }
        }
    }
    flush_insert(&mut out, &mut literal);
    out
}
