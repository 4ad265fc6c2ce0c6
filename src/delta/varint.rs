//! Size varints used in the delta header: base-128, little-endian groups,
//! continuation flag in the high bit

use crate::{Error, Result};

pub(crate) fn write(out: &mut Vec<u8>, mut value: usize) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Read a varint at `*pos`, advancing it past the last byte consumed
pub(crate) fn read(data: &[u8], pos: &mut usize) -> Result<usize> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| Error::CorruptDelta("truncated size header".into()))?;
        *pos += 1;
        let group = u64::from(byte & 0x7f);
        let shifted = group
            .checked_shl(shift)
            .filter(|shifted| shifted >> shift == group)
            .ok_or_else(|| Error::CorruptDelta("size header overflows".into()))?;
        value |= shifted;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    usize::try_from(value).map_err(|_| Error::CorruptDelta(format!("size {} too large", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        let mut out = Vec::new();
        write(&mut out, 0);
        write(&mut out, 127);
        write(&mut out, 128);
        write(&mut out, 300);
        assert_eq!(out, vec![0x00, 0x7f, 0x80, 0x01, 0xac, 0x02]);

        let mut pos = 0;
        assert_eq!(read(&out, &mut pos).unwrap(), 0);
        assert_eq!(read(&out, &mut pos).unwrap(), 127);
        assert_eq!(read(&out, &mut pos).unwrap(), 128);
        assert_eq!(read(&out, &mut pos).unwrap(), 300);
        assert_eq!(pos, out.len());
    }

    #[test]
    fn test_truncated_varint() {
        let mut pos = 0;
        assert!(matches!(
            read(&[0x80, 0x80], &mut pos),
            Err(Error::CorruptDelta(_))
        ));
    }

    #[test]
    fn test_overlong_varint() {
        let data = [0xffu8; 12];
        let mut pos = 0;
        assert!(read(&data, &mut pos).is_err());
    }

    #[test]
    fn test_varint_bits_past_64_are_rejected() {
        // Tenth group carries bit 64, which does not fit
        let data = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x02, 0x00];
        let mut pos = 0;
        assert!(matches!(
            read(&data, &mut pos),
            Err(Error::CorruptDelta(_))
        ));

        // Bit 63 alone still fits
        let data = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let mut pos = 0;
        assert_eq!(read(&data, &mut pos).ok(), usize::try_from(1u64 << 63).ok());
    }
}
