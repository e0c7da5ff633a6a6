//! Persisted settings blob
//!
//! Layout: magic (u32 LE), version (u8), payload length (u16 LE), postcard
//! payload, CRC32 (u32 LE) over everything before it.

use super::{ConfigError, MotionSettings};

/// Magic number identifying a settings blob ("UMCS")
pub const SETTINGS_MAGIC: u32 = 0x554D_4353;

/// Current blob format version
pub const SETTINGS_VERSION: u8 = 1;

const HEADER_LEN: usize = 7;
const CRC_LEN: usize = 4;

/// Serialize settings into `buf`, returning the number of bytes written
pub fn encode(settings: &MotionSettings, buf: &mut [u8]) -> Result<usize, ConfigError> {
    if buf.len() < HEADER_LEN + CRC_LEN {
        return Err(ConfigError::Serialize);
    }

    let payload_len = {
        let (_, tail) = buf.split_at_mut(HEADER_LEN);
        let room = tail.len() - CRC_LEN;
        let used = postcard::to_slice(settings, &mut tail[..room])
            .map_err(|_| ConfigError::Serialize)?;
        used.len()
    };
    let len = u16::try_from(payload_len).map_err(|_| ConfigError::Serialize)?;

    buf[0..4].copy_from_slice(&SETTINGS_MAGIC.to_le_bytes());
    buf[4] = SETTINGS_VERSION;
    buf[5..7].copy_from_slice(&len.to_le_bytes());

    let body = HEADER_LEN + payload_len;
    let crc = crc32(&buf[..body]);
    buf[body..body + CRC_LEN].copy_from_slice(&crc.to_le_bytes());

    Ok(body + CRC_LEN)
}

/// Deserialize and validate a settings blob
pub fn decode(buf: &[u8]) -> Result<MotionSettings, ConfigError> {
    if buf.len() < HEADER_LEN + CRC_LEN {
        return Err(ConfigError::Deserialize);
    }

    let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if magic != SETTINGS_MAGIC {
        return Err(ConfigError::BadMagic);
    }
    if buf[4] != SETTINGS_VERSION {
        return Err(ConfigError::VersionMismatch);
    }

    let len = u16::from_le_bytes([buf[5], buf[6]]) as usize;
    let body = HEADER_LEN + len;
    if buf.len() < body + CRC_LEN {
        return Err(ConfigError::Deserialize);
    }

    let stored = u32::from_le_bytes([
        buf[body],
        buf[body + 1],
        buf[body + 2],
        buf[body + 3],
    ]);
    if stored != crc32(&buf[..body]) {
        return Err(ConfigError::CrcMismatch);
    }

    let settings: MotionSettings =
        postcard::from_bytes(&buf[HEADER_LEN..body]).map_err(|_| ConfigError::Deserialize)?;
    settings.validate()?;
    Ok(settings)
}

/// CRC32 (IEEE 802.3, reflected)
fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}
