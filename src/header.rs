//! The one-to-nine-byte CBOR item header: major type (3 bits) plus
//! additional-information code (5 bits), and the follow-on length/value
//! bytes it implies.
use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{Error, ErrorKind, Result};

/// The eight CBOR major types, named by the high 3 bits of the header byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MajorType {
    UnsignedInt = 0,
    NegativeInt = 1,
    ByteString = 2,
    TextString = 3,
    Array = 4,
    Map = 5,
    Tag = 6,
    SimpleOrFloat = 7,
}

impl MajorType {
    pub fn from_bits(bits: u8) -> MajorType {
        match bits {
            0 => MajorType::UnsignedInt,
            1 => MajorType::NegativeInt,
            2 => MajorType::ByteString,
            3 => MajorType::TextString,
            4 => MajorType::Array,
            5 => MajorType::Map,
            6 => MajorType::Tag,
            7 => MajorType::SimpleOrFloat,
            _ => unreachable!("major type is only ever 3 bits"),
        }
    }
}

/// What the 5-bit info code in a header resolves to, once any follow-on
/// bytes have been read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Info {
    /// Value is carried directly in the info code (0..=23).
    Small(u8),
    /// Value followed as 1/2/4/8 big-endian bytes.
    Sized(u64),
    /// Additional info 31: the indefinite-length / break marker.
    Indefinite,
}

/// A fully decoded header: major type plus resolved info.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub major: MajorType,
    pub info: Info,
}

/// Write a header for major type `major` carrying integer code `code`,
/// choosing the smallest legal representation (spec §4.1). `code` must not
/// exceed `u64::MAX`; the header codec itself never receives negative input
/// since `code` is unsigned by construction.
pub fn write_header(buf: &mut Vec<u8>, major: MajorType, code: u64) {
    let top = (major as u8) << 5;
    if code <= 23 {
        buf.push(top | (code as u8));
    } else if code <= u8::MAX as u64 {
        buf.push(top | 24);
        buf.push(code as u8);
    } else if code <= u16::MAX as u64 {
        buf.push(top | 25);
        buf.extend_from_slice(&(code as u16).to_be_bytes());
    } else if code <= u32::MAX as u64 {
        buf.push(top | 26);
        buf.extend_from_slice(&(code as u32).to_be_bytes());
    } else {
        buf.push(top | 27);
        buf.extend_from_slice(&code.to_be_bytes());
    }
}

/// Write the indefinite-length marker (info code 31) for `major`. Only
/// byte/text strings, arrays, and maps may legally use this; the caller is
/// responsible for only calling it where the decoder also accepts it.
pub fn write_indefinite(buf: &mut Vec<u8>, major: MajorType) {
    buf.push(((major as u8) << 5) | 31);
}

/// Write the lone `0xFF` break byte that terminates an indefinite-length
/// item.
pub fn write_break(buf: &mut Vec<u8>) {
    buf.push(0xFF);
}

/// Number of bytes [`write_header`] would emit for `code` (spec §8: the
/// "integer width selection" testable property).
pub fn header_len(code: u64) -> usize {
    if code <= 23 {
        1
    } else if code <= u8::MAX as u64 {
        2
    } else if code <= u16::MAX as u64 {
        3
    } else if code <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Read one header (and any follow-on length bytes) from `buf`, advancing
/// it past everything consumed. Reserved info codes (28..=30) surface as
/// [`ErrorKind::ReservedInfoCode`]; EOF partway through surfaces as
/// [`ErrorKind::EndOfInput`].
pub fn read_header(buf: &mut &[u8]) -> Result<Header> {
    let byte = read_u8(buf)?;
    let major = MajorType::from_bits(byte >> 5);
    let info_code = byte & 0x1F;
    let info = read_info(buf, info_code)?;
    Ok(Header { major, info })
}

fn read_info(buf: &mut &[u8], info_code: u8) -> Result<Info> {
    match info_code {
        0..=23 => Ok(Info::Small(info_code)),
        24 => Ok(Info::Sized(read_u8(buf)? as u64)),
        25 => Ok(Info::Sized(
            buf.read_u16::<BigEndian>()
                .map_err(|_| eof())? as u64,
        )),
        26 => Ok(Info::Sized(
            buf.read_u32::<BigEndian>()
                .map_err(|_| eof())? as u64,
        )),
        27 => Ok(Info::Sized(buf.read_u64::<BigEndian>().map_err(|_| eof())?)),
        28..=30 => Err(Error::new(
            ErrorKind::ReservedInfoCode,
            format!("info code {} is reserved", info_code),
        )),
        31 => Ok(Info::Indefinite),
        _ => unreachable!("info code is only ever 5 bits"),
    }
}

fn read_u8(buf: &mut &[u8]) -> Result<u8> {
    buf.read_u8().map_err(|_| eof())
}

fn eof() -> Error {
    Error::new(ErrorKind::EndOfInput, "unexpected end of input")
}

/// Resolve an [`Info`] to its numeric value, for callers (integers, tags)
/// that don't accept [`Info::Indefinite`].
pub fn info_as_u64(info: Info, illegal_stream: impl FnOnce() -> Error) -> Result<u64> {
    match info {
        Info::Small(v) => Ok(v as u64),
        Info::Sized(v) => Ok(v),
        Info::Indefinite => Err(illegal_stream()),
    }
}
