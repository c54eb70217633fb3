//! Decompression: parse the header, deserialize the Huffman tree, and run the
//! single token-grammar-parameterized decode loop that covers v2, v3, and v4
//! containers alike.

use crate::bitio::BitReader;
use crate::container::{self, GrammarParams};
use crate::huffman;
use crate::{checksum, Error, Progress, MAX_SIZE};
use log::{debug, trace, warn};

/// Decompress a `PP` container (no outer envelope byte — see
/// [`crate::unwrap_envelope`]) back into the original bytes.
pub fn decompress(input: &[u8], progress: Option<&mut Progress>) -> Result<Vec<u8>, Error> {
    let mut progress = progress;
    let (header, header_len) = container::parse_header(input).map_err(|e| {
        warn!("decompress: failed to parse header: {e}");
        e
    })?;
    debug!(
        "decompress: version={} mode={:?} uncompressed_size={} compressed_size={}",
        header.version_major, header.mode, header.uncompressed_size, header.compressed_size
    );
    if let Some(cb) = progress.as_mut() {
        cb("header", 5, "parsed container header");
        trace!("[  5%] header: parsed container header");
    }

    let rest = &input[header_len..];
    if rest.len() != header.compressed_size as usize {
        warn!("decompress: payload length {} does not match header's compressed_size {}", rest.len(), header.compressed_size);
        return Err(Error::InvalidSize);
    }
    if rest.len() < 4 {
        warn!("decompress: payload too short to hold a tree-size prefix (len={})", rest.len());
        return Err(Error::TruncatedHeader);
    }
    let tree_size = u32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
    if tree_size == 0 || 4 + tree_size > rest.len() {
        warn!("decompress: invalid tree size {tree_size} for payload of {} bytes", rest.len());
        return Err(Error::InvalidSize);
    }
    let tree_blob = &rest[4..4 + tree_size];
    let token_bytes = &rest[4 + tree_size..];

    if let Some(cb) = progress.as_mut() {
        cb("huffman", 20, "rebuilding Huffman tree");
        trace!("[ 20%] huffman: rebuilding Huffman tree");
    }
    let tree = huffman::tree_io::deserialize(tree_blob).map_err(|e| {
        warn!("decompress: failed to deserialize Huffman tree: {e}");
        e
    })?;
    let huff = huffman::Decoder::new(&tree);

    let grammar = GrammarParams::for_version(header.version_major).map_err(|e| {
        warn!("decompress: unsupported version {}: {e}", header.version_major);
        e
    })?;
    let target_len = header.uncompressed_size as usize;
    if target_len == 0 || target_len > MAX_SIZE {
        warn!("decompress: uncompressed_size {target_len} out of range");
        return Err(Error::InvalidSize);
    }

    if let Some(cb) = progress.as_mut() {
        cb("unpack", 40, "decoding token stream");
        trace!("[ 40%] unpack: decoding token stream");
    }
    let mut reader = BitReader::new(token_bytes);
    let mut out = Vec::with_capacity(target_len);
    loop {
        if out.len() >= target_len && !grammar.has_end_marker {
            break;
        }
        let flag = reader.read_bits(grammar.flag_width)?;

        if Some(flag) == grammar.flag_end {
            break;
        } else if flag == grammar.flag_literal {
            if grammar.literal_run {
                let run_len = reader.read_bits(grammar.run_length_bits)? as usize;
                for _ in 0..run_len {
                    let byte = huff.decode_one(|| reader.read_bit())?;
                    out.push(byte);
                }
            } else {
                let byte = huff.decode_one(|| reader.read_bit())?;
                out.push(byte);
            }
        } else if flag == grammar.flag_match {
            let offset = reader.read_bits(grammar.offset_bits)? as usize + 1;
            let length = reader.read_bits(grammar.length_bits)? as usize + grammar.min_match;
            if offset == 0 || offset > out.len() {
                warn!("decompress: back-reference offset {offset} exceeds decoded length {}", out.len());
                return Err(Error::BadToken);
            }
            let start = out.len() - offset;
            for i in 0..length {
                let b = out[start + i];
                out.push(b);
            }
        } else {
            warn!("decompress: reserved token flag {flag} encountered");
            return Err(Error::BadToken);
        }

        if out.len() > target_len || out.len() > MAX_SIZE {
            warn!("decompress: decoded length {} exceeded target {target_len}", out.len());
            return Err(Error::InvalidSize);
        }
    }

    if out.len() != target_len {
        warn!("decompress: decoded length {} does not match target {target_len}", out.len());
        return Err(Error::InvalidSize);
    }
    if checksum::compute(&out) != header.checksum {
        warn!("decompress: checksum mismatch");
        return Err(Error::ChecksumMismatch);
    }
    if let Some(cb) = progress.as_mut() {
        cb("done", 100, "decompression complete");
        trace!("[100%] done: decompression complete");
    }
    Ok(out)
}

/// Hand-assemble a legacy (v2 or v3) container using only `GrammarParams`
/// and the public `bitio`/`huffman`/`container` building blocks — never the
/// v4-only `encoder` module — so the legacy branches of `decompress` get
/// independent coverage even though the public API only ever writes v4.
#[cfg(test)]
fn encode_legacy(version_major: u8, data: &[u8]) -> Vec<u8> {
    use crate::bitio::BitWriter;
    use crate::container::{GrammarParams, LEGACY_HEADER_LEN};

    let grammar = GrammarParams::for_version(version_major).unwrap();
    let freq = huffman::count_frequencies(data);
    let tree = huffman::build_tree(&freq).unwrap();
    let codes = huffman::build_codes(&tree).unwrap();
    let tree_blob = huffman::tree_io::serialize(&tree);

    let hc_params = crate::matcher::Params::for_mode(crate::Mode::Balanced);
    let hc = crate::matcher::HashChain::build(data, hc_params);

    let mut writer = BitWriter::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let m = hc.search(pos);
        if m.length >= grammar.min_match {
            writer.write_bits(grammar.flag_match, grammar.flag_width);
            writer.write_bits((m.offset - 1) as u32, grammar.offset_bits);
            writer.write_bits((m.length - grammar.min_match) as u32, grammar.length_bits);
            pos += m.length;
        } else {
            writer.write_bits(grammar.flag_literal, grammar.flag_width);
            if grammar.literal_run {
                writer.write_bits(1, grammar.run_length_bits);
            }
            huffman::encode_symbol(&codes, data[pos], &mut writer).unwrap();
            pos += 1;
        }
    }
    if let Some(end) = grammar.flag_end {
        writer.write_bits(end, grammar.flag_width);
    }
    let token_bytes = writer.finish();

    let mut payload = Vec::new();
    payload.extend_from_slice(&(tree_blob.len() as u32).to_le_bytes());
    payload.extend_from_slice(&tree_blob);
    payload.extend_from_slice(&token_bytes);

    let mut out = vec![0u8; LEGACY_HEADER_LEN];
    out[0..2].copy_from_slice(&container::MAGIC.to_le_bytes());
    out[2] = version_major;
    out[3] = 0;
    out[4..8].copy_from_slice(&(data.len() as u32).to_le_bytes());
    out[8..12].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    out[12] = 6;
    out[13] = crate::sniff::sniff(data) as u8;
    out[14..16].copy_from_slice(&checksum::compute(data).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::compress;

    #[test]
    fn reference_vectors_round_trip_across_versions() {
        let hex_fixtures = [
            hex::decode("6162726163616461627261").unwrap(), // "abracadabra"
            hex::decode("61616161616161616161").unwrap(),   // "aaaaaaaaaa"
            (0u8..=255u8).collect::<Vec<u8>>(),
        ];
        for data in &hex_fixtures {
            for version in [2u8, 3] {
                let packed = encode_legacy(version, data);
                let restored = decompress(&packed, None).unwrap();
                assert_eq!(&restored, data, "version {version} mismatch");
            }
        }
    }

    #[test]
    fn rejects_truncated_input() {
        let data = b"hello world hello world hello world".to_vec();
        let packed = compress(&data, 6, None).unwrap();
        let truncated = &packed[..packed.len() - 2];
        assert!(decompress(truncated, None).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 40];
        assert!(matches!(decompress(&bytes, None), Err(Error::BadMagic)));
    }

    #[test]
    fn detects_checksum_mismatch() {
        let data = b"checksum me please, checksum me please".to_vec();
        let mut packed = compress(&data, 6, None).unwrap();
        let last = packed.len() - 1;
        packed[last] ^= 0xff;
        // Flipping the last byte usually corrupts the token stream and is
        // caught as a decode error; if it happens to still parse, the
        // checksum must catch the divergence.
        match decompress(&packed, None) {
            Ok(out) => assert_eq!(out, data),
            Err(e) => assert!(matches!(
                e,
                Error::ChecksumMismatch | Error::BadToken | Error::Overrun | Error::InvalidSize
            )),
        }
    }
}
