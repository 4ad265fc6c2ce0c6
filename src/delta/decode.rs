//! Delta application with strict bounds checking

use super::{varint, DEFAULT_COPY_SIZE, MAX_COPY};
use crate::{Error, Result};

/// Read the declared `(base_len, result_len)` header and return the offset of
/// the first opcode
pub(crate) fn read_header(delta: &[u8]) -> Result<(usize, usize, usize)> {
    let mut pos = 0;
    let base_len = varint::read(delta, &mut pos)?;
    let result_len = varint::read(delta, &mut pos)?;
    Ok((base_len, result_len, pos))
}

fn corrupt(message: String) -> Error {
    Error::CorruptDelta(message)
}

/// Rebuild the target buffer from `base` and a delta payload
pub fn apply(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let (base_len, result_len, mut pos) = read_header(delta)?;
    if base_len != base.len() {
        return Err(corrupt(format!(
            "base length mismatch: delta expects {}, got {}",
            base_len,
            base.len()
        )));
    }

    let mut out = Vec::with_capacity(result_len.min(MAX_COPY));

    while pos < delta.len() {
        let opcode = delta[pos];
        pos += 1;

        if opcode & 0x80 != 0 {
            let mut offset: usize = 0;
            for i in 0..4 {
                if opcode & (1 << i) != 0 {
                    let byte = *delta
                        .get(pos)
                        .ok_or_else(|| corrupt("truncated copy offset".into()))?;
                    pos += 1;
                    offset |= (byte as usize) << (8 * i);
                }
            }
            let mut size: usize = 0;
            for i in 0..3 {
                if opcode & (0x10 << i) != 0 {
                    let byte = *delta
                        .get(pos)
                        .ok_or_else(|| corrupt("truncated copy size".into()))?;
                    pos += 1;
                    size |= (byte as usize) << (8 * i);
                }
            }
            if size == 0 {
                size = DEFAULT_COPY_SIZE;
            }

            let end = offset
                .checked_add(size)
                .filter(|end| *end <= base.len())
                .ok_or_else(|| {
                    corrupt(format!(
                        "copy {}+{} outside base of {} bytes",
                        offset,
                        size,
                        base.len()
                    ))
                })?;
            if out.len() + size > result_len {
                return Err(corrupt(format!(
                    "copy of {} bytes overruns declared result length {}",
                    size, result_len
                )));
            }
            out.extend_from_slice(&base[offset..end]);
        } else if opcode != 0 {
            let len = opcode as usize;
            let literal = delta
                .get(pos..pos + len)
                .ok_or_else(|| corrupt("truncated insert".into()))?;
            if out.len() + len > result_len {
                return Err(corrupt(format!(
                    "insert of {} bytes overruns declared result length {}",
                    len, result_len
                )));
            }
            out.extend_from_slice(literal);
            pos += len;
        } else {
            return Err(corrupt("reserved opcode 0".into()));
        }
    }

    if out.len() != result_len {
        return Err(corrupt(format!(
            "result length mismatch: declared {}, produced {}",
            result_len,
            out.len()
        )));
    }
    Ok(out)
}
