//! Container framing: header layouts, their evolution across versions, and
//! the single `GrammarParams` value the decoder uses to parameterize one
//! decode loop instead of three copy-pasted ones (§9 design notes).

use crate::{Error, Mode};
use crate::sniff::FileType;

pub const MAGIC: u16 = 0x5050;
pub const CURRENT_VERSION_MAJOR: u8 = 4;
pub const CURRENT_VERSION_MINOR: u8 = 0;

pub const LEGACY_HEADER_LEN: usize = 16;
pub const CURRENT_HEADER_LEN: usize = 20;

/// Parsed header, independent of which on-wire layout produced it.
#[derive(Clone, Copy, Debug)]
pub struct Header {
    pub version_major: u8,
    pub version_minor: u8,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub level: u8,
    pub filetype: FileType,
    pub mode: Mode,
    pub checksum: u16,
}

/// Serialize the current-generation (v4) 20-byte header.
pub fn write_v4_header(h: &Header) -> [u8; CURRENT_HEADER_LEN] {
    let mut out = [0u8; CURRENT_HEADER_LEN];
    out[0..2].copy_from_slice(&MAGIC.to_le_bytes());
    out[2] = CURRENT_VERSION_MAJOR;
    out[3] = CURRENT_VERSION_MINOR;
    out[4..8].copy_from_slice(&h.uncompressed_size.to_le_bytes());
    out[8..12].copy_from_slice(&h.compressed_size.to_le_bytes());
    out[12] = h.level;
    out[13] = h.filetype as u8;
    out[14] = h.mode as u8;
    out[15] = 0; // reserved
    out[16..18].copy_from_slice(&h.checksum.to_le_bytes());
    out[18..20].copy_from_slice(&0u16.to_le_bytes()); // reserved
    out
}

/// Parse a header of whatever layout `version_major` implies. `data` must
/// contain at least the header bytes (callers check length first).
pub fn parse_header(data: &[u8]) -> Result<(Header, usize), Error> {
    if data.len() < 3 {
        return Err(Error::TruncatedHeader);
    }
    let magic = u16::from_le_bytes([data[0], data[1]]);
    if magic != MAGIC {
        return Err(Error::BadMagic);
    }
    let version_major = data[2];
    match version_major {
        4 => {
            if data.len() < CURRENT_HEADER_LEN {
                return Err(Error::TruncatedHeader);
            }
            let version_minor = data[3];
            let uncompressed_size = u32::from_le_bytes(data[4..8].try_into().unwrap());
            let compressed_size = u32::from_le_bytes(data[8..12].try_into().unwrap());
            let level = data[12];
            let filetype = FileType::from_u8(data[13]);
            // The mode byte is purely informational (it plays no role in
            // decoding); an out-of-range value doesn't make the container
            // unreadable, so fall back to a nominal mode rather than
            // rejecting an otherwise well-formed v4 container.
            let mode = Mode::from_u8(data[14]).unwrap_or(Mode::Balanced);
            let checksum = u16::from_le_bytes(data[16..18].try_into().unwrap());
            Ok((
                Header { version_major, version_minor, uncompressed_size, compressed_size, level, filetype, mode, checksum },
                CURRENT_HEADER_LEN,
            ))
        }
        3 | 2 => {
            if data.len() < LEGACY_HEADER_LEN {
                return Err(Error::TruncatedHeader);
            }
            let version_minor = data[3];
            let uncompressed_size = u32::from_le_bytes(data[4..8].try_into().unwrap());
            let compressed_size = u32::from_le_bytes(data[8..12].try_into().unwrap());
            let level = data[12];
            let filetype = FileType::from_u8(data[13]);
            let checksum = u16::from_le_bytes(data[14..16].try_into().unwrap());
            // Legacy generations have no explicit mode byte; record a nominal
            // mode so `Header` stays uniform. It plays no role in decoding.
            Ok((
                Header { version_major, version_minor, uncompressed_size, compressed_size, level, filetype, mode: Mode::Balanced, checksum },
                LEGACY_HEADER_LEN,
            ))
        }
        _ => Err(Error::UnsupportedVersion),
    }
}

/// The token-grammar shape implied by a version, so the decoder runs a single
/// parameterized loop instead of one copy per version.
///
/// v4/v3 pack a 2-bit flag (`00` end, `10` literal run, `11` match, `01`
/// reserved). v2 packs a 1-bit flag (`0` single literal, `1` match) and has
/// no end marker — decoding stops once the output buffer is full.
#[derive(Clone, Copy, Debug)]
pub struct GrammarParams {
    pub flag_width: u32,
    pub flag_literal: u32,
    pub flag_match: u32,
    pub flag_end: Option<u32>,
    pub literal_run: bool,
    pub run_length_bits: u32,
    pub offset_bits: u32,
    pub length_bits: u32,
    pub min_match: usize,
    pub has_end_marker: bool,
}

impl GrammarParams {
    pub fn for_version(version_major: u8) -> Result<Self, Error> {
        match version_major {
            4 => Ok(GrammarParams {
                flag_width: 2, flag_literal: 0b10, flag_match: 0b11, flag_end: Some(0b00),
                literal_run: true, run_length_bits: 8,
                offset_bits: 17, length_bits: 10, min_match: 4, has_end_marker: true,
            }),
            3 => Ok(GrammarParams {
                flag_width: 2, flag_literal: 0b10, flag_match: 0b11, flag_end: Some(0b00),
                literal_run: true, run_length_bits: 8,
                offset_bits: 16, length_bits: 9, min_match: 3, has_end_marker: true,
            }),
            2 => Ok(GrammarParams {
                flag_width: 1, flag_literal: 0, flag_match: 1, flag_end: None,
                literal_run: false, run_length_bits: 0,
                offset_bits: 16, length_bits: 8, min_match: 3, has_end_marker: false,
            }),
            _ => Err(Error::UnsupportedVersion),
        }
    }
}
