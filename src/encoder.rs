//! Compression pipeline: sniff the input, pick a mode, find matches with a
//! hash chain, Huffman-code literal runs, and assemble a v4 container.

use crate::bitio::BitWriter;
use crate::container::{self, GrammarParams, Header};
use crate::huffman;
use crate::matcher::{HashChain, Match, Params as MatchParams};
use crate::sniff;
use crate::{checksum, Error, Mode, Progress, MAX_SIZE};
use log::{debug, trace, warn};

enum Token {
    Literal(u8),
    Match(Match),
}

/// Maximum literal run length before a flush is forced (§4.6).
fn max_run_len(mode: Mode) -> usize {
    if matches!(mode, Mode::Fast) {
        64
    } else {
        255
    }
}

/// Walk `data` with the hash-chain index, producing a token sequence and the
/// literal-byte frequency table needed to build the Huffman tree. Literal
/// runs are grouped later, while writing the bit stream, since the run cap
/// is a packing detail rather than a parsing one.
fn tokenize(data: &[u8], params: MatchParams) -> (Vec<Token>, [u64; 256]) {
    let hc = HashChain::build(data, params);
    let mut tokens = Vec::new();
    let mut freq = [0u64; 256];
    let mut pos = 0usize;
    let len = data.len();

    let mut push_literal = |tokens: &mut Vec<Token>, freq: &mut [u64; 256], b: u8| {
        tokens.push(Token::Literal(b));
        freq[b as usize] += 1;
    };

    if params.optimal_parse {
        while pos < len {
            let (k, m) = hc.optimal_parse(pos);
            for i in 0..k {
                push_literal(&mut tokens, &mut freq, data[pos + i]);
            }
            if m.length > 0 {
                tokens.push(Token::Match(m));
                pos += k + m.length;
            } else {
                push_literal(&mut tokens, &mut freq, data[pos + k]);
                pos += k + 1;
            }
        }
        return (tokens, freq);
    }

    while pos < len {
        let m = hc.search(pos);
        if m.length == 0 {
            push_literal(&mut tokens, &mut freq, data[pos]);
            pos += 1;
            continue;
        }
        if params.lazy {
            if hc.lazy_better(pos, m).is_some() {
                push_literal(&mut tokens, &mut freq, data[pos]);
                pos += 1;
                continue;
            }
        }
        tokens.push(Token::Match(m));
        pos += m.length;
    }
    (tokens, freq)
}

/// Flush a pending literal run: `10` flag, 8-bit length, then each byte's
/// Huffman code. No-op on an empty run.
fn flush_run(run: &mut Vec<u8>, grammar: &GrammarParams, codes: &[Option<huffman::Code>; 256], writer: &mut BitWriter) -> Result<(), Error> {
    if run.is_empty() {
        return Ok(());
    }
    writer.write_bits(grammar.flag_literal, grammar.flag_width);
    writer.write_bits(run.len() as u32, grammar.run_length_bits);
    for &b in run.iter() {
        huffman::encode_symbol(codes, b, writer)?;
    }
    run.clear();
    Ok(())
}

/// Compress `input` at `level` into a v4 `PP` container (without the outer
/// envelope byte — see [`crate::wrap_envelope`]).
pub fn compress(input: &[u8], level: u8, progress: Option<&mut Progress>) -> Result<Vec<u8>, Error> {
    let mut progress = progress;
    if input.is_empty() || input.len() > MAX_SIZE {
        warn!("compress: rejecting input (InvalidInput, len={})", input.len());
        return Err(Error::InvalidInput);
    }

    if let Some(cb) = progress.as_mut() {
        cb("sniff", 5, "classifying input");
        trace!("[  5%] sniff: classifying input");
    }
    let filetype = sniff::sniff(input);
    let mode = Mode::choose(level, filetype);
    let match_params = MatchParams::for_mode(mode);
    debug!("compress: mode={:?} level={} input_len={}", mode, level, input.len());

    if let Some(cb) = progress.as_mut() {
        cb("match", 20, "finding matches");
        trace!("[ 20%] match: finding matches");
    }
    let (tokens, freq) = tokenize(input, match_params);

    if let Some(cb) = progress.as_mut() {
        cb("huffman", 55, "building Huffman tree");
        trace!("[ 55%] huffman: building Huffman tree");
    }
    let tree = huffman::build_tree(&freq).map_err(|e| {
        warn!("compress: failed to build Huffman tree: {e}");
        e
    })?;
    let codes = huffman::build_codes(&tree).map_err(|e| {
        warn!("compress: failed to build Huffman codes: {e}");
        e
    })?;
    let tree_blob = huffman::tree_io::serialize(&tree);

    if let Some(cb) = progress.as_mut() {
        cb("pack", 75, "packing token stream");
        trace!("[ 75%] pack: packing token stream");
    }
    let grammar = GrammarParams::for_version(container::CURRENT_VERSION_MAJOR).map_err(|e| {
        warn!("compress: unsupported version {}: {e}", container::CURRENT_VERSION_MAJOR);
        e
    })?;
    let cap = max_run_len(mode);
    let mut writer = BitWriter::new();
    let mut run: Vec<u8> = Vec::with_capacity(cap);
    for token in &tokens {
        match token {
            Token::Literal(b) => {
                run.push(*b);
                if run.len() >= cap {
                    flush_run(&mut run, &grammar, &codes, &mut writer).map_err(|e| {
                        warn!("compress: failed to encode literal run: {e}");
                        e
                    })?;
                }
            }
            Token::Match(m) => {
                flush_run(&mut run, &grammar, &codes, &mut writer).map_err(|e| {
                    warn!("compress: failed to encode literal run: {e}");
                    e
                })?;
                writer.write_bits(grammar.flag_match, grammar.flag_width);
                writer.write_bits((m.offset - 1) as u32, grammar.offset_bits);
                writer.write_bits((m.length - grammar.min_match) as u32, grammar.length_bits);
            }
        }
    }
    flush_run(&mut run, &grammar, &codes, &mut writer).map_err(|e| {
        warn!("compress: failed to encode trailing literal run: {e}");
        e
    })?;
    writer.write_bits(grammar.flag_end.expect("v4 always has an end marker"), grammar.flag_width);
    let token_bytes = writer.finish();

    let mut payload = Vec::with_capacity(4 + tree_blob.len() + token_bytes.len());
    payload.extend_from_slice(&(tree_blob.len() as u32).to_le_bytes());
    payload.extend_from_slice(&tree_blob);
    payload.extend_from_slice(&token_bytes);

    if let Some(cb) = progress.as_mut() {
        cb("finalize", 95, "assembling container");
        trace!("[ 95%] finalize: assembling container");
    }
    let header = Header {
        version_major: container::CURRENT_VERSION_MAJOR,
        version_minor: container::CURRENT_VERSION_MINOR,
        uncompressed_size: input.len() as u32,
        compressed_size: payload.len() as u32,
        level,
        filetype,
        mode,
        checksum: checksum::compute(input),
    };
    let mut out = Vec::with_capacity(container::CURRENT_HEADER_LEN + payload.len());
    out.extend_from_slice(&container::write_v4_header(&header));
    out.extend_from_slice(&payload);

    if let Some(cb) = progress.as_mut() {
        cb("done", 100, "compression complete");
        trace!("[100%] done: compression complete");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_decoder() {
        let data = b"abababababababab the quick brown fox the quick brown fox".to_vec();
        let packed = compress(&data, 6, None).unwrap();
        let restored = crate::decoder::decompress(&packed, None).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn round_trips_long_literal_run() {
        // Forces more than one 255-byte (or, at level 1, 64-byte) run flush.
        let data: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
        for level in [1u8, 6] {
            let packed = compress(&data, level, None).unwrap();
            let restored = crate::decoder::decompress(&packed, None).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn progress_callback_is_invoked() {
        let data = b"hello hello hello world".to_vec();
        let mut calls = Vec::new();
        {
            let mut cb = |stage: &str, pct: u8, _msg: &str| calls.push((stage.to_string(), pct));
            compress(&data, 6, Some(&mut cb)).unwrap();
        }
        assert!(calls.iter().any(|(s, _)| s == "done"));
    }

    #[test]
    fn ultra_mode_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog. the quick brown fox!".to_vec();
        let packed = compress(&data, 9, None).unwrap();
        let restored = crate::decoder::decompress(&packed, None).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn single_byte_input_round_trips() {
        // Exercises the degenerate one-leaf Huffman tree through the real
        // container, not just huffman.rs's tree-only unit test.
        let data = vec![0x41u8];
        let packed = compress(&data, 6, None).unwrap();
        let restored = crate::decoder::decompress(&packed, None).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn highly_repetitive_input_collapses_via_back_references() {
        let data = vec![0x00u8; 100_000];
        let packed = compress(&data, 6, None).unwrap();
        let restored = crate::decoder::decompress(&packed, None).unwrap();
        assert_eq!(restored, data);
        assert!(
            packed.len() < data.len() / 10,
            "expected long back-references to collapse the output, got {} bytes for {} input bytes",
            packed.len(),
            data.len()
        );
    }
}
