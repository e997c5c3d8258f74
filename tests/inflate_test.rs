use rayon::prelude::*;
use turbo_inflate_rs::{InflateBuffer, InflateError, InflateState, InflateStatus};

/* Assembles deflate streams bit by bit for the hand-written vectors.
 * Extra-bit fields go in LSB-first as RFC 1951 packs them; Huffman
 * codewords go in starting from their most significant bit. */
#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    used: u32,
}

impl BitWriter {
    fn push_bits(&mut self, value: u32, count: u32) {
        self.acc |= value << self.used;
        self.used += count;
        while self.used >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.used -= 8;
        }
    }

    fn push_code(&mut self, code: u32, len: u32) {
        for i in (0..len).rev() {
            self.push_bits((code >> i) & 1, 1);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.used > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}

/* Codeword of a literal/length symbol in the fixed Huffman code
 * (RFC 1951 3.2.6). */
fn fixed_litlen_code(sym: u32) -> (u32, u32) {
    match sym {
        0..=143 => (0x30 + sym, 8),
        144..=255 => (0x190 + (sym - 144), 9),
        256..=279 => (sym - 256, 7),
        _ => (0xC0 + (sym - 280), 8),
    }
}

fn inflate_raw(data: &[u8], out_size: usize) -> Result<Vec<u8>, InflateError> {
    let mut out = vec![0u8; out_size];
    let mut state = InflateState::with_window_bits(15);
    let mut buf = InflateBuffer::new(data, &mut out);
    let status = state.inflate(&mut buf, true)?;
    assert_eq!(status, InflateStatus::Done);
    let produced = buf.total_out;
    out.truncate(produced);
    Ok(out)
}

fn inflate_zlib(data: &[u8], out_size: usize) -> Result<Vec<u8>, InflateError> {
    let mut out = vec![0u8; out_size];
    let mut state = InflateState::new();
    let mut buf = InflateBuffer::new(data, &mut out);
    let status = state.inflate(&mut buf, true)?;
    assert_eq!(status, InflateStatus::Done);
    let produced = buf.total_out;
    out.truncate(produced);
    Ok(out)
}

/* Feed the stream in fixed-size chunks with is_final_chunk = false,
 * resubmitting whatever the decoder left unconsumed in front of the next
 * chunk, exactly as a caller streaming from a socket would. */
fn inflate_zlib_chunked(data: &[u8], out_size: usize, chunk: usize) -> Vec<u8> {
    let mut out = vec![0u8; out_size];
    let mut state = InflateState::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut fed = 0;
    let mut total_in = 0;
    let mut total_out = 0;
    loop {
        let take = chunk.min(data.len() - fed);
        pending.extend_from_slice(&data[fed..fed + take]);
        fed += take;
        let is_final = fed == data.len();

        let mut buf = InflateBuffer {
            next_in: &pending,
            total_in,
            next_out: &mut out,
            total_out,
        };
        let status = state.inflate(&mut buf, is_final).unwrap();
        let unconsumed = buf.next_in.len();
        total_in = buf.total_in;
        total_out = buf.total_out;
        let consumed = pending.len() - unconsumed;
        pending.drain(..consumed);

        if status == InflateStatus::Done {
            break;
        }
    }
    out.truncate(total_out);
    out
}

/* Scenario: single stored block inside a zlib wrapper. */
#[test]
fn test_stored_block_zlib() {
    let stream = [
        0x78, 0x01, /* zlib CMF/FLG */
        0x01, 0x05, 0x00, 0xFA, 0xFF, /* BFINAL=1 stored, LEN=5 NLEN=!5 */
        0x48, 0x65, 0x6C, 0x6C, 0x6F, /* "Hello" */
        0x05, 0x8C, 0x01, 0xF5, /* adler32, not verified */
    ];
    assert_eq!(inflate_zlib(&stream, 5).unwrap(), b"Hello");
}

/* Scenario: fixed-Huffman literals inside a zlib wrapper. */
#[test]
fn test_fixed_block_zlib() {
    let stream = [
        0x78, 0x9C, 0xF3, 0x48, 0xCD, 0xC9, 0xC9, 0x07, 0x00, 0x05, 0x8C, 0x01, 0xF5,
    ];
    assert_eq!(inflate_zlib(&stream, 5).unwrap(), b"Hello");
}

/* Scenario: RLE through a distance-1 back-reference. */
#[test]
fn test_overlap_one_replicates_byte() {
    let mut w = BitWriter::default();
    w.push_bits(1, 1); /* BFINAL */
    w.push_bits(1, 2); /* BTYPE=01 */
    let (code, len) = fixed_litlen_code(b'a' as u32);
    w.push_code(code, len);
    let (code, len) = fixed_litlen_code(263); /* length 9, no extra bits */
    w.push_code(code, len);
    w.push_code(0, 5); /* distance symbol 0 => distance 1 */
    let (code, len) = fixed_litlen_code(256);
    w.push_code(code, len);
    let stream = w.finish();

    assert_eq!(inflate_raw(&stream, 10).unwrap(), b"aaaaaaaaaa");
}

/* Scenario: three-byte pattern replication (distance 3 shorter than the
 * match length). */
#[test]
fn test_overlap_three_replicates_pattern() {
    let mut w = BitWriter::default();
    w.push_bits(1, 1);
    w.push_bits(1, 2);
    for byte in *b"abc" {
        let (code, len) = fixed_litlen_code(byte as u32);
        w.push_code(code, len);
    }
    let (code, len) = fixed_litlen_code(263); /* length 9 */
    w.push_code(code, len);
    w.push_code(2, 5); /* distance symbol 2 => distance 3 */
    let (code, len) = fixed_litlen_code(256);
    w.push_code(code, len);
    let stream = w.finish();

    assert_eq!(inflate_raw(&stream, 12).unwrap(), b"abcabcabcabc");
}

#[test]
fn test_distance_past_output_start_fails() {
    let mut w = BitWriter::default();
    w.push_bits(1, 1);
    w.push_bits(1, 2);
    let (code, len) = fixed_litlen_code(b'a' as u32);
    w.push_code(code, len);
    let (code, len) = fixed_litlen_code(257); /* length 3 */
    w.push_code(code, len);
    w.push_code(1, 5); /* distance symbol 1 => distance 2, only 1 byte out */
    let (code, len) = fixed_litlen_code(256);
    w.push_code(code, len);
    let stream = w.finish();

    assert_eq!(inflate_raw(&stream, 16), Err(InflateError::Decode));
}

#[test]
fn test_reserved_block_type_fails() {
    let mut w = BitWriter::default();
    w.push_bits(1, 1);
    w.push_bits(3, 2); /* BTYPE=11 */
    w.push_bits(0, 13);
    let stream = w.finish();

    assert_eq!(inflate_raw(&stream, 16), Err(InflateError::Decode));
}

/* An over-subscribed code-length code must be rejected (Kraft violation:
 * nineteen 1-bit codewords). */
#[test]
fn test_oversubscribed_precode_fails() {
    let mut w = BitWriter::default();
    w.push_bits(1, 1);
    w.push_bits(2, 2); /* BTYPE=10 dynamic */
    w.push_bits(0, 5); /* HLIT  = 257 */
    w.push_bits(0, 5); /* HDIST = 1 */
    w.push_bits(15, 4); /* HCLEN = 19 */
    for _ in 0..19 {
        w.push_bits(1, 3);
    }
    let stream = w.finish();

    assert_eq!(inflate_raw(&stream, 16), Err(InflateError::Decode));
}

/* A code-length repeat as the very first symbol has nothing to repeat. */
#[test]
fn test_repeat_at_position_zero_fails() {
    let mut w = BitWriter::default();
    w.push_bits(1, 1);
    w.push_bits(2, 2);
    w.push_bits(0, 5);
    w.push_bits(0, 5);
    w.push_bits(15, 4);
    /* symbols 16 and 17 get 1-bit codewords, everything else absent */
    let mut precode_lens = [0u32; 19];
    precode_lens[0] = 1; /* symbol 16 (permuted order starts 16,17,18,...) */
    precode_lens[1] = 1; /* symbol 17 */
    for len in precode_lens {
        w.push_bits(len, 3);
    }
    /* first meta symbol: 16 = "repeat previous" */
    w.push_code(0, 1);
    w.push_bits(0, 2);
    w.push_bits(0, 32);
    let stream = w.finish();

    assert_eq!(inflate_raw(&stream, 16), Err(InflateError::Decode));
}

/* A dynamic block whose lengths leave symbol 256 uncodeable is rejected
 * before any symbol is decoded. */
#[test]
fn test_missing_end_of_block_symbol_fails() {
    let mut w = BitWriter::default();
    w.push_bits(1, 1);
    w.push_bits(2, 2);
    w.push_bits(0, 5); /* HLIT = 257 */
    w.push_bits(0, 5); /* HDIST = 1 */
    w.push_bits(15, 4); /* HCLEN = 19 */
    /* give symbols 0 and 18 one-bit codewords */
    let mut lens3 = [0u32; 19];
    lens3[2] = 1; /* symbol 18 */
    lens3[3] = 1; /* symbol 0 */
    for len in lens3 {
        w.push_bits(len, 3);
    }
    /* canonical codewords: symbol 0 -> '0', symbol 18 -> '1' */
    /* 18(+127)=138 zeros, 18(+108)=119 zeros, one explicit zero: 258
     * lengths, none of them for symbol 256 */
    w.push_code(1, 1); /* symbol 18 */
    w.push_bits(127, 7);
    w.push_code(1, 1); /* symbol 18 */
    w.push_bits(108, 7);
    w.push_code(0, 1); /* symbol 0 */
    w.push_bits(0, 32);
    let stream = w.finish();

    assert_eq!(inflate_raw(&stream, 16), Err(InflateError::Decode));
}

#[test]
fn test_zlib_bad_method_fails() {
    /* CM = 7 is not deflate */
    let stream = [0x77, 0x01, 0x03, 0x00];
    assert_eq!(inflate_zlib(&stream, 16), Err(InflateError::Header));
}

#[test]
fn test_zlib_fdict_id_is_skipped() {
    /* a CMF/FLG pair with FDICT set, a 4-byte dictionary id, then an
     * ordinary stored block */
    let mut stream = vec![0x78, 0xBB, 0xDE, 0xAD, 0xBE, 0xEF];
    stream.extend_from_slice(&[0x01, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i']);
    assert_eq!(inflate_zlib(&stream, 2).unwrap(), b"hi");
}

#[test]
fn test_stored_length_mismatch_fails() {
    let stream = [0x78, 0x01, 0x01, 0x05, 0x00, 0x00, 0xFF, 0x48];
    assert_eq!(inflate_zlib(&stream, 16), Err(InflateError::Decode));
}

/* An exactly sized output buffer still reports Done: the trailing
 * end-of-block (and even a trailing empty block) consumes no output. */
#[test]
fn test_exact_output_with_trailing_empty_block() {
    let mut w = BitWriter::default();
    w.push_bits(0, 1); /* not final */
    w.push_bits(1, 2); /* fixed */
    for byte in *b"Hi" {
        let (code, len) = fixed_litlen_code(byte as u32);
        w.push_code(code, len);
    }
    let (code, len) = fixed_litlen_code(256);
    w.push_code(code, len);
    /* final empty stored block */
    w.push_bits(1, 1);
    w.push_bits(0, 2);
    let mut stream = w.finish(); /* finish() pads to the byte boundary */
    stream.extend_from_slice(&[0x00, 0x00, 0xFF, 0xFF]);

    assert_eq!(inflate_raw(&stream, 2).unwrap(), b"Hi");
}

#[test]
fn test_undersized_output_reports_insufficient() {
    let stream = [
        0x78, 0x01, 0x01, 0x05, 0x00, 0xFA, 0xFF, 0x48, 0x65, 0x6C, 0x6C, 0x6F,
    ];
    assert_eq!(
        inflate_zlib(&stream, 3),
        Err(InflateError::OutputInsufficient)
    );
}

/* Errors stay latched until the state is reset. */
#[test]
fn test_errors_are_latched() {
    let bad = [0x77, 0x01, 0x03, 0x00];
    let good = [0x78, 0x9C, 0xF3, 0x48, 0xCD, 0xC9, 0xC9, 0x07, 0x00];
    let mut out = vec![0u8; 8];

    let mut state = InflateState::new();
    let mut buf = InflateBuffer::new(&bad, &mut out);
    assert_eq!(state.inflate(&mut buf, true), Err(InflateError::Header));
    drop(buf);

    let mut buf = InflateBuffer::new(&good, &mut out);
    assert_eq!(state.inflate(&mut buf, true), Err(InflateError::Header));
    drop(buf);

    state.reset();
    let mut buf = InflateBuffer::new(&good, &mut out);
    assert_eq!(state.inflate(&mut buf, true), Ok(InflateStatus::Done));
    assert_eq!(buf.output(), b"Hello");
}

fn xorshift(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

/* 64 KiB of seed-dependent data mixing three textures: raw random bytes
 * (mostly stored blocks), a narrow alphabet (dynamic codes) and repeated
 * runs (long matches). */
fn generate_payload(seed: u64) -> Vec<u8> {
    let mut rng = seed.wrapping_mul(0x9E3779B97F4A7C15) | 1;
    let mut data = Vec::with_capacity(64 * 1024);
    match seed % 3 {
        0 => {
            while data.len() < 64 * 1024 {
                data.extend_from_slice(&xorshift(&mut rng).to_le_bytes());
            }
        }
        1 => {
            while data.len() < 64 * 1024 {
                let word = xorshift(&mut rng);
                for shift in (0..64).step_by(4) {
                    data.push(b'a' + ((word >> shift) & 0xF) as u8);
                }
            }
        }
        _ => {
            let mut run = [0u8; 37];
            for byte in run.iter_mut() {
                *byte = xorshift(&mut rng) as u8;
            }
            while data.len() < 64 * 1024 {
                if xorshift(&mut rng) % 5 == 0 {
                    for byte in run.iter_mut() {
                        *byte = xorshift(&mut rng) as u8;
                    }
                }
                data.extend_from_slice(&run);
            }
        }
    }
    data.truncate(64 * 1024);
    data
}

/* Round-trip property: anything a conforming compressor emits decodes back
 * to the original, across compression levels and both framings. */
#[test]
fn test_round_trip_1000_seeds() {
    (0..1000u64).into_par_iter().for_each(|seed| {
        let data = generate_payload(seed);
        let level = (seed % 11) as u8;
        if seed % 2 == 0 {
            let compressed = miniz_oxide::deflate::compress_to_vec(&data, level);
            let out = inflate_raw(&compressed, data.len()).unwrap();
            assert_eq!(out, data, "raw round trip failed for seed {}", seed);
        } else {
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&data, level);
            let out = inflate_zlib(&compressed, data.len()).unwrap();
            assert_eq!(out, data, "zlib round trip failed for seed {}", seed);
        }
    });
}

/* Resumability: any split of the stream into partial chunks produces the
 * same bytes as a single final-chunk call. */
#[test]
fn test_chunked_decode_matches_one_shot() {
    let data = generate_payload(7);
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&data, 6);
    let one_shot = inflate_zlib(&compressed, data.len()).unwrap();
    assert_eq!(one_shot, data);

    for chunk in [1, 3, 7, 13, 100, 577, 4096, compressed.len()] {
        let chunked = inflate_zlib_chunked(&compressed, data.len(), chunk);
        assert_eq!(chunked, one_shot, "chunk size {} diverged", chunk);
    }
}

/* Chunked decoding across stored blocks exercises the mid-body suspension
 * path (level 0 emits nothing but stored blocks, each up to 64 KiB). */
#[test]
fn test_chunked_decode_of_stored_blocks() {
    let data = generate_payload(12); /* seed % 3 == 0: incompressible */
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&data, 0);
    for chunk in [1, 997, 65536] {
        let chunked = inflate_zlib_chunked(&compressed, data.len(), chunk);
        assert_eq!(chunked, data, "chunk size {} diverged", chunk);
    }
}

#[test]
fn test_empty_payload_round_trip() {
    let compressed = miniz_oxide::deflate::compress_to_vec(&[], 6);
    assert_eq!(inflate_raw(&compressed, 0).unwrap(), b"");
}
