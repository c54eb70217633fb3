//! # ppcompress
//!
//! Lossless LZ77 + Huffman compressor/decompressor producing and reading the
//! `PP` container format.
//!
//! * `encoder` drives the hash-chain match finder and the Huffman coder to
//!   produce a current-generation (v4) container.
//! * `decoder` reads v2, v3, or v4 containers, dispatching on the header's
//!   version byte to the matching token grammar via `container::GrammarParams`.
//!
//! ## Buffer Example
//!
//! ```rs
//! use ppcompress::*;
//! let data = b"the quick brown fox jumps over the lazy dog".to_vec();
//! let packed = compress(&data, 6, None).expect("compression failed");
//! let restored = decompress(&packed, None).expect("decompression failed");
//! assert_eq!(data, restored);
//! ```

pub mod bitio;
pub mod checksum;
pub mod sniff;
pub mod huffman;
pub mod matcher;
pub mod container;
pub mod encoder;
pub mod decoder;

/// Progress callback: `(stage, percent in [0,100], message)`. Must return
/// quickly; never invoked once an `Error` is about to be returned.
pub type Progress<'a> = dyn FnMut(&str, u8, &str) + 'a;

/// Error taxonomy shared by the encoder and decoder.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("input is empty or exceeds the size limit")]
    InvalidInput,
    #[error("bad magic: not a PP container")]
    BadMagic,
    #[error("unsupported container version")]
    UnsupportedVersion,
    #[error("container too short for its header")]
    TruncatedHeader,
    #[error("invalid uncompressed/tree size field")]
    InvalidSize,
    #[error("malformed Huffman tree")]
    MalformedTree,
    #[error("malformed or reserved token")]
    BadToken,
    #[error("read past the end of the token stream")]
    Overrun,
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("Huffman code would exceed the maximum depth")]
    InternalLimit,
}

/// Hard cap on both encoder input and decoder output size.
pub const MAX_SIZE: usize = 1 << 30;

/// Compression mode, resolved from `(level, filetype)` by [`Mode::choose`].
/// Stored in the v4 header; legacy headers carry no mode byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Fast = 1,
    Balanced = 2,
    Web = 3,
    Ultra = 4,
}

impl Mode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Mode::Fast),
            2 => Some(Mode::Balanced),
            3 => Some(Mode::Web),
            4 => Some(Mode::Ultra),
            _ => None,
        }
    }

    /// level 9 -> Ultra; level <= 2 -> Fast; text -> Web; otherwise Balanced.
    pub fn choose(level: u8, filetype: sniff::FileType) -> Self {
        if level >= 9 {
            Mode::Ultra
        } else if level <= 2 {
            Mode::Fast
        } else if filetype == sniff::FileType::Text {
            Mode::Web
        } else {
            Mode::Balanced
        }
    }
}

/// Compress `input` at `level` (1..=9) into a v4 container.
///
/// Fails with [`Error::InvalidInput`] if `input` is empty or larger than
/// [`MAX_SIZE`], or with [`Error::InternalLimit`] if the Huffman tree would
/// need a codeword deeper than `huffman::MAX_DEPTH`.
pub fn compress(input: &[u8], level: u8, progress: Option<&mut Progress>) -> Result<Vec<u8>, Error> {
    encoder::compress(input, level, progress)
}

/// Decompress a v2, v3, or v4 `PP` container back into the original bytes.
pub fn decompress(input: &[u8], progress: Option<&mut Progress>) -> Result<Vec<u8>, Error> {
    decoder::decompress(input, progress)
}

/// Prefix `container` with the "raw container follows" envelope byte.
/// The core never produces the enciphered (`0x01`) variant itself.
pub fn wrap_envelope(container: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(container.len() + 1);
    out.push(0x00);
    out.extend_from_slice(&container);
    out
}

/// Strip the one-byte envelope prefix. Fails (there being no cipher
/// collaborator in this crate) if the prefix signals an enciphered payload,
/// or if the prefix byte is unrecognized.
pub fn unwrap_envelope(data: &[u8]) -> Result<&[u8], Error> {
    match data.first() {
        Some(0x00) => Ok(&data[1..]),
        _ => Err(Error::BadMagic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_small_text() {
        let data = b"I am Sam. Sam I am. I do not like this Sam I am.\n".to_vec();
        for level in [1u8, 5, 9] {
            let packed = compress(&data, level, None).unwrap();
            let restored = decompress(&packed, None).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(compress(&[], 6, None), Err(Error::InvalidInput)));
    }

    #[test]
    fn envelope_round_trips() {
        let wrapped = wrap_envelope(vec![1, 2, 3]);
        assert_eq!(unwrap_envelope(&wrapped).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn enciphered_envelope_is_rejected() {
        let data = [0x01, 0xff, 0xff];
        assert!(unwrap_envelope(&data).is_err());
    }

    #[test]
    fn mode_choice_matches_table() {
        assert_eq!(Mode::choose(9, sniff::FileType::Binary), Mode::Ultra);
        assert_eq!(Mode::choose(1, sniff::FileType::Text), Mode::Fast);
        assert_eq!(Mode::choose(5, sniff::FileType::Text), Mode::Web);
        assert_eq!(Mode::choose(5, sniff::FileType::Binary), Mode::Balanced);
    }
}
