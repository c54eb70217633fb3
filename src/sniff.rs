//! Fixed file-type classifier.
//!
//! Stored in the header purely as a hint (§4.3 of `SPEC_FULL.md`); mode
//! selection is the one place in this repository that reads it back.

/// Tag recorded in the container header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FileType {
    Binary = 0,
    Png = 1,
    Jpeg = 2,
    Gif = 3,
    Zip = 4,
    Pdf = 5,
    Gzip = 6,
    Text = 7,
}

impl FileType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => FileType::Png,
            2 => FileType::Jpeg,
            3 => FileType::Gif,
            4 => FileType::Zip,
            5 => FileType::Pdf,
            6 => FileType::Gzip,
            7 => FileType::Text,
            _ => FileType::Binary,
        }
    }
}

const MAGIC_TABLE: &[(&[u8], FileType)] = &[
    (&[0x89, 0x50, 0x4E, 0x47], FileType::Png),
    (&[0xFF, 0xD8, 0xFF], FileType::Jpeg),
    (&[0x47, 0x49, 0x46], FileType::Gif),
    (&[0x50, 0x4B], FileType::Zip),
    (&[0x25, 0x50, 0x44, 0x46], FileType::Pdf),
    (&[0x1F, 0x8B], FileType::Gzip),
];

const TEXT_SAMPLE_LIMIT: usize = 2048;
const TEXT_RATIO_NUM: usize = 85;
const TEXT_RATIO_DEN: usize = 100;

/// Classify `data` using magic-byte prefixes, falling back to a printable-ASCII
/// ratio over the first 2048 bytes.
pub fn sniff(data: &[u8]) -> FileType {
    for &(magic, tag) in MAGIC_TABLE {
        if data.starts_with(magic) {
            return tag;
        }
    }
    let sample = &data[..data.len().min(TEXT_SAMPLE_LIMIT)];
    if sample.is_empty() {
        return FileType::Binary;
    }
    let printable = sample
        .iter()
        .filter(|&&b| (0x20..=0x7e).contains(&b) || b == b'\t' || b == b'\r' || b == b'\n')
        .count();
    if printable * TEXT_RATIO_DEN >= TEXT_RATIO_NUM * sample.len() {
        FileType::Text
    } else {
        FileType::Binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_png() {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A];
        data.extend_from_slice(&[0u8; 10]);
        assert_eq!(sniff(&data), FileType::Png);
    }

    #[test]
    fn recognizes_gzip() {
        assert_eq!(sniff(&[0x1F, 0x8B, 0x08, 0x00]), FileType::Gzip);
    }

    #[test]
    fn recognizes_text() {
        let data = b"The quick brown fox jumps over the lazy dog.\n".repeat(4);
        assert_eq!(sniff(&data), FileType::Text);
    }

    #[test]
    fn recognizes_binary() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(sniff(&data), FileType::Binary);
    }

    #[test]
    fn roundtrips_through_u8() {
        for tag in [
            FileType::Binary, FileType::Png, FileType::Jpeg, FileType::Gif,
            FileType::Zip, FileType::Pdf, FileType::Gzip, FileType::Text,
        ] {
            assert_eq!(FileType::from_u8(tag as u8), tag);
        }
    }
}
