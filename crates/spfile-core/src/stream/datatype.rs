//! Byte-level value decoders.
//!
//! Every multi-byte value in an SP file is little-endian. The non-trivial
//! encodings are:
//!
//! - Strings: tag byte `1`, then a length byte. A length of `0xFF` is
//!   followed by a 16-bit length; if that is `0xFFFE` the text is UTF-16LE
//!   and one more byte gives the length in characters. Length zero is
//!   "no string" rather than an empty one.
//! - UUIDs: 16 bytes, reassembled into two 64-bit words with the first four
//!   bytes and the next two pairs byte-swapped.
//! - Dates: signed seconds; subtract one hour to get wall-clock time since
//!   the Unix epoch. [`DATE_UNSET`] means no date.
//! - Times: seconds, less one day, in whole minutes past midnight.
//! - Durations: seconds, reported as hours.

use crate::error::{Error, Result};
use crate::model::Duration;
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use encoding_rs::UTF_16LE;
use std::io::Read;
use uuid::Uuid;

/// Raw value marking an unset date
pub const DATE_UNSET: i32 = -0x6CBF_9001;

/// Tag byte that must start every string
const STRING_TAG: u8 = 1;

/// Length byte announcing a 16-bit length
const EXTENDED_LENGTH: u8 = 0xFF;

/// Extended length announcing UTF-16LE text
const UTF16_MARKER: u16 = 0xFFFE;

/// Byte order in which UUID bytes are folded into the high and low words
const UUID_BYTE_ORDER: [usize; 16] = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];

/// Extract a nul-terminated single-byte string starting at `offset`.
///
/// Stops at the first zero byte or the end of `data`.
pub fn get_simple_string(data: &[u8], offset: usize) -> String {
    data.get(offset..)
        .unwrap_or(&[])
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Read a little-endian `i32` at `offset` within a byte slice
pub fn get_int_at(data: &[u8], offset: usize) -> Result<i32> {
    let mut bytes = data
        .get(offset..offset + 4)
        .ok_or_else(|| Error::internal(format!("no 4-byte value at offset {offset}")))?;
    Ok(bytes.read_i32::<LittleEndian>()?)
}

/// Read a single byte
pub fn get_byte(reader: &mut impl Read) -> Result<u8> {
    Ok(reader.read_u8()?)
}

/// Read a 16-bit unsigned value
pub fn get_short(reader: &mut impl Read) -> Result<u16> {
    Ok(reader.read_u16::<LittleEndian>()?)
}

/// Read a 32-bit signed value
pub fn get_int(reader: &mut impl Read) -> Result<i32> {
    Ok(reader.read_i32::<LittleEndian>()?)
}

/// Read a 32-bit value as an unsigned magic number
pub fn get_magic(reader: &mut impl Read) -> Result<u32> {
    Ok(reader.read_u32::<LittleEndian>()?)
}

/// Read a 64-bit signed value
pub fn get_long(reader: &mut impl Read) -> Result<i64> {
    Ok(reader.read_i64::<LittleEndian>()?)
}

/// Read a boolean: one byte, nonzero is true
pub fn get_boolean(reader: &mut impl Read) -> Result<bool> {
    Ok(get_byte(reader)? != 0)
}

/// Read a fixed number of raw bytes
pub fn get_bytes(reader: &mut impl Read, size: usize) -> Result<Vec<u8>> {
    let mut data = vec![0u8; size];
    reader.read_exact(&mut data)?;
    Ok(data)
}

/// Read a string.
///
/// Returns `None` when the encoded length is zero.
pub fn get_string(reader: &mut impl Read) -> Result<Option<String>> {
    let tag = get_byte(reader)?;
    if tag != STRING_TAG {
        return Err(Error::UnexpectedStringType { tag });
    }

    let mut utf16 = false;
    let mut length = usize::from(get_byte(reader)?);
    if length == usize::from(EXTENDED_LENGTH) {
        let extended = get_short(reader)?;
        length = usize::from(extended);
        if extended == UTF16_MARKER {
            utf16 = true;
            length = usize::from(get_byte(reader)?) * 2;
        }
    }

    if length == 0 {
        return Ok(None);
    }

    let data = get_bytes(reader, length)?;
    let text = if utf16 {
        let (text, _) = UTF_16LE.decode_without_bom_handling(&data);
        text.into_owned()
    } else {
        String::from_utf8_lossy(&data).into_owned()
    };
    Ok(Some(text))
}

/// Fold 16 raw bytes into a UUID's high and low words
pub fn uuid_from_bytes(data: &[u8; 16]) -> Uuid {
    let fold = |indexes: &[usize]| {
        indexes
            .iter()
            .fold(0u64, |acc, &index| (acc << 8) | u64::from(data[index]))
    };
    let high = fold(&UUID_BYTE_ORDER[..8]);
    let low = fold(&UUID_BYTE_ORDER[8..]);
    Uuid::from_u64_pair(high, low)
}

/// Read a UUID
pub fn get_uuid(reader: &mut impl Read) -> Result<Uuid> {
    let mut data = [0u8; 16];
    reader.read_exact(&mut data)?;
    Ok(uuid_from_bytes(&data))
}

/// Convert raw date seconds to a wall-clock timestamp
pub fn date_from_seconds(seconds: i32) -> Option<NaiveDateTime> {
    if seconds == DATE_UNSET {
        return None;
    }
    DateTime::from_timestamp(i64::from(seconds) - 3600, 0).map(|date| date.naive_utc())
}

/// Read a date; `None` if unset
pub fn get_date(reader: &mut impl Read) -> Result<Option<NaiveDateTime>> {
    Ok(date_from_seconds(get_int(reader)?))
}

/// Convert raw time seconds to a time of day
pub fn time_from_seconds(seconds: i32) -> Option<NaiveTime> {
    let minutes = (i64::from(seconds) - 86_400) / 60;
    let seconds_past_midnight = minutes.rem_euclid(24 * 60) * 60;
    NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(seconds_past_midnight).ok()?, 0)
}

/// Read a time of day
pub fn get_time(reader: &mut impl Read) -> Result<Option<NaiveTime>> {
    Ok(time_from_seconds(get_int(reader)?))
}

/// Read a duration stored as seconds
pub fn get_duration(reader: &mut impl Read) -> Result<Duration> {
    let seconds = f64::from(get_int(reader)?);
    Ok(Duration::from_hours(seconds / 3600.0))
}

/// Read a double; NaN reads as zero
pub fn get_double(reader: &mut impl Read) -> Result<f64> {
    let value = reader.read_f64::<LittleEndian>()?;
    Ok(if value.is_nan() { 0.0 } else { value })
}
