use crate::bitstream::{BitBuf, BitReader};
use crate::decode_entry::DecodeEntry;
use crate::deflate_constants::{
    DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN, DEFLATE_BLOCKTYPE_STATIC_HUFFMAN, DEFLATE_BLOCKTYPE_STORED,
    DEFLATE_MAX_LENS, DEFLATE_NUM_LITLEN_SYMS, DEFLATE_NUM_PRECODE_SYMS, DIST_TABLEBITS, ENOUGH,
    LITLEN_TABLEBITS, PRECODE_TABLEBITS,
};
use crate::huffman_table::{build_table, CodeKind};
use crate::static_tables::{DISTFIX, DISTFIX_BITS, LENFIX, LENFIX_BITS};
use crate::{safety_check, InflateError};
use nightly_quirks::branch_pred::{likely, unlikely};
use std::mem::size_of;

/* A zlib header consumes at most 16 bits plus a 32-bit dictionary id. */
const ZLIB_HEADER_MAX_BITS: usize = 48;

/*
 * Worst-case dynamic block header: 3 header bits, 14 bits of
 * HLIT/HDIST/HCLEN, 19 3-bit code lengths, and up to 320 codeword lengths
 * of at most 7 + 7 bits each. A partial chunk must cover the whole header
 * before parsing starts, so a header never has to suspend half-decoded.
 */
const BLOCK_HEADER_MAX_BITS: usize = 3 + 14 + 57 + DEFLATE_MAX_LENS * 14;

/* Upper bound on the bits one literal or match step can consume: two
 * 15-bit codewords plus 5 length extra bits plus 13 distance extra bits. */
const BODY_STEP_BITS: usize = 64;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InflateStatus {
    /* the final block's end-of-block symbol has been consumed */
    Done,
    /* the stream continues past the supplied input; resupply and call again */
    NeedsInput,
}

/*
 * The caller's input and output ranges for one decode stream.
 *
 * 'next_out' must be the same full-size buffer on every call: it has to
 * hold the entire uncompressed payload, because back-references read
 * earlier output straight from it instead of from a separate window.
 * 'next_in' is per-call; after a call it holds the not-yet-consumed tail,
 * which the caller resubmits (followed by fresh data) on the next call.
 */
pub struct InflateBuffer<'a> {
    pub next_in: &'a [u8],
    pub total_in: usize,
    pub next_out: &'a mut [u8],
    pub total_out: usize,
}

impl<'a> InflateBuffer<'a> {
    pub fn new(input: &'a [u8], output: &'a mut [u8]) -> Self {
        Self {
            next_in: input,
            total_in: 0,
            next_out: output,
            total_out: 0,
        }
    }

    /* Point the buffer at the next chunk of compressed input. */
    pub fn refill_input(&mut self, input: &'a [u8]) {
        self.next_in = input;
    }

    /* The output produced so far. */
    pub fn output(&self) -> &[u8] {
        &self.next_out[..self.total_out]
    }
}

/* Write cursor over the caller's output buffer. */
struct OutCursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl OutCursor<'_> {
    #[inline(always)]
    fn push_literal(&mut self, byte: u8) -> Result<(), InflateError> {
        if unlikely(self.pos >= self.buf.len()) {
            return Err(InflateError::OutputInsufficient);
        }
        self.buf[self.pos] = byte;
        self.pos += 1;
        Ok(())
    }

    /* Bulk append for stored-block bodies; the caller has checked room. */
    fn write_slice(&mut self, src: &[u8]) {
        self.buf[self.pos..self.pos + src.len()].copy_from_slice(src);
        self.pos += src.len();
    }

    /*
     * Copy a back-reference of 'len' bytes from 'dist' bytes behind the
     * cursor.
     *
     * When the source overlaps the destination by no more than a word, the
     * copy is really a repeating pattern, and it is cheaper to build the
     * pattern once and only store: a one-byte overlap is broadcast to a
     * whole word, a 2..=W-byte overlap stores a word and advances by the
     * overlap so the pattern replicates itself. Everything else is a plain
     * word-at-a-time copy. All three wide paths may overshoot 'len' and
     * rely on the cursor truncation afterwards, so they require a word of
     * slack before the end of the buffer; the byte loop finishes the rare
     * copies near the very end.
     */
    #[inline(always)]
    fn copy_match(&mut self, dist: usize, len: usize) -> Result<(), InflateError> {
        const W: usize = size_of::<BitBuf>();

        if unlikely(dist == 0 || dist > self.pos) {
            /* distance reaches before the start of the output */
            return Err(InflateError::Decode);
        }
        let end = self.pos + len;
        if unlikely(end > self.buf.len()) {
            return Err(InflateError::OutputInsufficient);
        }
        let from = self.pos - dist;

        if likely(end + W <= self.buf.len()) {
            if dist == 1 {
                /* RLE of the previous byte, common in real data */
                let pattern = [self.buf[from]; W];
                let mut p = self.pos;
                while p < end {
                    self.buf[p..p + W].copy_from_slice(&pattern);
                    p += W;
                }
            } else if dist < len && dist <= W {
                /* the first 'dist' bytes repeat; each word store lands
                 * 'dist' bytes further so the tail of the previous store
                 * is always overwritten with the aligned pattern */
                let pattern: [u8; W] = self.buf[from..from + W].try_into().unwrap();
                let mut p = self.pos;
                while p < end {
                    self.buf[p..p + W].copy_from_slice(&pattern);
                    p += dist;
                }
            } else {
                /* word copy; sources are at least a word behind the
                 * cursor or beyond 'len', so every load sees bytes this
                 * match no longer changes */
                let mut p = self.pos;
                let mut src = from;
                while p < end {
                    let word: [u8; W] = self.buf[src..src + W].try_into().unwrap();
                    self.buf[p..p + W].copy_from_slice(&word);
                    p += W;
                    src += W;
                }
            }
        } else {
            for i in 0..len {
                self.buf[self.pos + i] = self.buf[from + i];
            }
        }

        self.pos = end;
        Ok(())
    }
}

/*
 * The complete decoder state, preserved between inflate() calls: the
 * unconsumed bit accumulator, which table pair is live, the table arena
 * itself and the scratch areas of the table builder. About 7 KiB; nothing
 * is heap-allocated.
 */
pub struct InflateState {
    bit_acc: BitBuf,
    bit_count: u32,
    /* log2 of the window size from the framing; 0 while the zlib header is
     * still pending */
    window_bits: u16,
    /* root index widths of the live tables; len_bits == 0 means the next
     * action is a block-header parse */
    len_bits: u8,
    dist_bits: u8,
    /* arena offsets of the live tables */
    len_index: u16,
    dist_index: u16,
    last_block: bool,
    /* the fixed tables survive in the arena across consecutive static
     * blocks until a dynamic block overwrites them */
    static_loaded: bool,
    /* bytes of a stored-block body still owed by the next input chunk */
    stored_remaining: u32,
    last_error: Option<InflateError>,
    lens: [u8; DEFLATE_MAX_LENS],
    work: [u16; DEFLATE_NUM_LITLEN_SYMS],
    codes: [DecodeEntry; ENOUGH],
}

impl Default for InflateState {
    fn default() -> Self {
        Self::new()
    }
}

impl InflateState {
    /* A fresh state that expects zlib framing (RFC 1950) at the front of
     * the stream. */
    pub fn new() -> Self {
        Self {
            bit_acc: 0,
            bit_count: 0,
            window_bits: 0,
            len_bits: 0,
            dist_bits: 0,
            len_index: 0,
            dist_index: 0,
            last_block: false,
            static_loaded: false,
            stored_remaining: 0,
            last_error: None,
            lens: [0; DEFLATE_MAX_LENS],
            work: [0; DEFLATE_NUM_LITLEN_SYMS],
            codes: [DecodeEntry::ZERO; ENOUGH],
        }
    }

    /* A state for a raw deflate stream whose framing has already been
     * stripped; gzip members use window_bits = 15. */
    pub fn with_window_bits(window_bits: u16) -> Self {
        debug_assert!((8..=15).contains(&window_bits));
        let mut state = Self::new();
        state.window_bits = window_bits;
        state
    }

    /* Drop all progress and latched errors; the state then expects a new
     * zlib-framed stream. */
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /*
     * Decode as much as possible from buf.next_in, advancing the input and
     * output cursors. Returns Done once the final block's end-of-block
     * symbol has been consumed, and NeedsInput when the stream continues
     * past the supplied input.
     *
     * 'is_final_chunk' tells the bit reader whether it may read right up to
     * (and, virtually, past) the end of the input. Callers feeding partial
     * chunks must pass false, so the decoder instead suspends a full word
     * short of the end and resumes on the next call.
     *
     * The first error is latched: subsequent calls keep returning it until
     * reset().
     */
    pub fn inflate(
        &mut self,
        buf: &mut InflateBuffer<'_>,
        is_final_chunk: bool,
    ) -> Result<InflateStatus, InflateError> {
        if let Some(err) = self.last_error {
            return Err(err);
        }
        if buf.total_out > buf.next_out.len() {
            self.last_error = Some(InflateError::InvalidParameter);
            return Err(InflateError::InvalidParameter);
        }

        let mut rdr = BitReader::resume(buf.next_in, self.bit_acc, self.bit_count, is_final_chunk);
        let mut cur = OutCursor {
            buf: &mut *buf.next_out,
            pos: buf.total_out,
        };

        let result = self.run(&mut rdr, &mut cur, is_final_chunk);

        self.bit_acc = rdr.acc;
        self.bit_count = rdr.count;
        let consumed = rdr.consumed();
        buf.total_in += consumed;
        buf.total_out = cur.pos;
        buf.next_in = &buf.next_in[consumed..];

        match result {
            Err(err) => {
                self.last_error = Some(err);
                Err(err)
            }
            Ok(()) => Ok(if self.is_done() {
                InflateStatus::Done
            } else {
                InflateStatus::NeedsInput
            }),
        }
    }

    #[inline(always)]
    fn is_done(&self) -> bool {
        self.last_block && self.len_bits == 0 && self.stored_remaining == 0
    }

    fn run(
        &mut self,
        rdr: &mut BitReader,
        cur: &mut OutCursor,
        is_final: bool,
    ) -> Result<(), InflateError> {
        /* finish a stored body cut short by the previous chunk */
        if self.stored_remaining > 0 {
            self.resume_stored(rdr, cur, is_final)?;
            if self.stored_remaining > 0 {
                return Ok(());
            }
        }

        rdr.ensure();
        if self.window_bits == 0 {
            if !is_final && rdr.stream_bits_left() < ZLIB_HEADER_MAX_BITS {
                return Ok(());
            }
            self.parse_zlib_header(rdr)?;
        }

        'blocks: loop {
            if self.len_bits == 0 {
                if self.last_block {
                    break;
                }
                if !rdr.has_bits_budget(BLOCK_HEADER_MAX_BITS) {
                    break;
                }
                rdr.ensure();
                self.last_block = rdr.pop_bits(1) != 0;
                match rdr.pop_bits(2) {
                    DEFLATE_BLOCKTYPE_STORED => {
                        self.decode_stored_block(rdr, cur, is_final)?;
                        if self.stored_remaining > 0 {
                            break;
                        }
                        continue 'blocks;
                    }
                    DEFLATE_BLOCKTYPE_STATIC_HUFFMAN => self.install_static_tables(),
                    DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN => self.decode_dynamic_header(rdr)?,
                    /* reserved block type */
                    _ => return Err(InflateError::Decode),
                }
            }

            if !self.decode_block_body(rdr, cur)? {
                /* out of input mid-block; all state is saved */
                break;
            }
        }

        if is_final && !self.is_done() {
            /* the caller promised no more input is coming */
            return Err(InflateError::Decode);
        }
        Ok(())
    }

    /*
     * The hot loop: decode literal/length symbols against the live tables
     * until the end-of-block symbol, an error, or the input budget runs
     * out. Returns whether the block completed.
     *
     * A table lookup resolves a whole root index worth of bits in one load;
     * entries for longer codes re-index once into their sub-table. The
     * accumulator is topped up before every peek, so no step can read bits
     * that are not resident.
     */
    fn decode_block_body(
        &mut self,
        rdr: &mut BitReader,
        cur: &mut OutCursor,
    ) -> Result<bool, InflateError> {
        let len_bits = self.len_bits as u32;
        let dist_bits = self.dist_bits as u32;
        let len_base = self.len_index as usize;
        let dist_base = self.dist_index as usize;

        while rdr.has_bits_budget(BODY_STEP_BITS) {
            rdr.ensure();
            let mut here = self.codes[len_base + rdr.bits(len_bits) as usize];
            loop {
                rdr.ensure();
                rdr.drop_bits(here.bits as u32);
                let op = here.op;
                if likely(op == 0) {
                    cur.push_literal(here.val as u8)?;
                    break;
                } else if op & DecodeEntry::BASE != 0 {
                    let mut len = here.val as usize;
                    rdr.ensure();
                    len += rdr.pop_bits(here.extra_bits()) as usize;
                    rdr.ensure();
                    let dist = self.decode_distance(rdr, dist_base, dist_bits)?;
                    cur.copy_match(dist, len)?;
                    break;
                } else if op & 0xF0 == 0 {
                    /* second-level length code */
                    rdr.ensure();
                    here = self.codes[len_base + here.val as usize + rdr.bits(op as u32) as usize];
                } else if op & DecodeEntry::END_OF_BLOCK != 0 {
                    self.len_bits = 0;
                    return Ok(true);
                } else {
                    return Err(InflateError::Decode);
                }
            }
        }
        Ok(false)
    }

    #[inline(always)]
    fn decode_distance(
        &self,
        rdr: &mut BitReader,
        dist_base: usize,
        dist_bits: u32,
    ) -> Result<usize, InflateError> {
        let mut here = self.codes[dist_base + rdr.bits(dist_bits) as usize];
        loop {
            rdr.ensure();
            rdr.drop_bits(here.bits as u32);
            let op = here.op;
            if likely(op & DecodeEntry::BASE != 0) {
                rdr.ensure();
                return Ok(here.val as usize + rdr.pop_bits(here.extra_bits()) as usize);
            } else if op & 0xF0 == 0 {
                /* second-level distance code */
                rdr.ensure();
                here = self.codes[dist_base + here.val as usize + rdr.bits(op as u32) as usize];
            } else {
                return Err(InflateError::Decode);
            }
        }
    }

    /*
     * Stored block: re-align to the byte boundary, check LEN against its
     * complement, and copy the body verbatim. Bytes already pulled into
     * the accumulator are drained first; the remainder comes straight from
     * the input slice, suspending via 'stored_remaining' if a partial
     * chunk ends inside the body.
     */
    fn decode_stored_block(
        &mut self,
        rdr: &mut BitReader,
        cur: &mut OutCursor,
        is_final: bool,
    ) -> Result<(), InflateError> {
        rdr.align_to_byte();
        rdr.ensure();
        let len = rdr.pop_bits(16);
        rdr.ensure();
        let nlen = rdr.pop_bits(16);
        safety_check!(len == !nlen & 0xFFFF);

        let len = len as usize;
        if cur.pos + len > cur.buf.len() {
            return Err(InflateError::OutputInsufficient);
        }

        let mut remaining = len;
        let drain = remaining.min(rdr.acc_stream_bits() / 8);
        for _ in 0..drain {
            let byte = rdr.pop_bits(8) as u8;
            cur.buf[cur.pos] = byte;
            cur.pos += 1;
        }
        remaining -= drain;
        if remaining == 0 {
            return Ok(());
        }

        /* the accumulator is dry; continue straight from the input */
        rdr.pos = rdr.pos.min(rdr.input.len());
        rdr.acc = 0;
        rdr.count = 0;
        let take = remaining.min(rdr.input.len() - rdr.pos);
        cur.write_slice(&rdr.input[rdr.pos..rdr.pos + take]);
        rdr.pos += take;
        remaining -= take;

        if remaining > 0 {
            /* mid-body suspension */
            safety_check!(!is_final);
            self.stored_remaining = remaining as u32;
        }
        Ok(())
    }

    fn resume_stored(
        &mut self,
        rdr: &mut BitReader,
        cur: &mut OutCursor,
        is_final: bool,
    ) -> Result<(), InflateError> {
        debug_assert!(rdr.count == 0);
        let remaining = self.stored_remaining as usize;
        let take = remaining.min(rdr.input.len());
        if cur.pos + take > cur.buf.len() {
            return Err(InflateError::OutputInsufficient);
        }
        cur.write_slice(&rdr.input[..take]);
        rdr.pos = take;
        let rest = remaining - take;
        safety_check!(rest == 0 || !is_final);
        self.stored_remaining = rest as u32;
        Ok(())
    }

    fn install_static_tables(&mut self) {
        if !self.static_loaded {
            self.codes[..LENFIX.len()].copy_from_slice(&LENFIX);
            self.codes[LENFIX.len()..LENFIX.len() + DISTFIX.len()].copy_from_slice(&DISTFIX);
            self.static_loaded = true;
        }
        self.len_index = 0;
        self.len_bits = LENFIX_BITS;
        self.dist_index = LENFIX.len() as u16;
        self.dist_bits = DISTFIX_BITS;
    }

    /*
     * Dynamic block: read HLIT/HDIST/HCLEN, build the code-length
     * meta-table, expand the run-length coded lengths with it, and build
     * the literal/length and distance tables from the result.
     */
    fn decode_dynamic_header(&mut self, rdr: &mut BitReader) -> Result<(), InflateError> {
        /* the order in which the code-length code lengths are stored */
        const PRECODE_PERMUTATION: [u8; DEFLATE_NUM_PRECODE_SYMS] = [
            16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
        ];

        self.static_loaded = false;

        rdr.ensure();
        let nlen = rdr.pop_bits(5) as usize + 257;
        let ndist = rdr.pop_bits(5) as usize + 1;
        let ncode = rdr.pop_bits(4) as usize + 4;

        for i in 0..ncode {
            rdr.ensure();
            self.lens[PRECODE_PERMUTATION[i] as usize] = rdr.pop_bits(3) as u8;
        }
        for i in ncode..DEFLATE_NUM_PRECODE_SYMS {
            self.lens[PRECODE_PERMUTATION[i] as usize] = 0;
        }

        let (_, meta_bits) = build_table(
            CodeKind::Codes,
            &self.lens[..DEFLATE_NUM_PRECODE_SYMS],
            &mut self.codes[..],
            PRECODE_TABLEBITS,
            &mut self.work,
        )
        .map_err(|_| InflateError::Decode)?;

        /* expand the literal/length and distance code lengths */
        let total = nlen + ndist;
        let mut have = 0usize;
        while have < total {
            rdr.ensure();
            let here = self.codes[rdr.bits(meta_bits as u32) as usize];
            if here.val < 16 {
                rdr.drop_bits(here.bits as u32);
                self.lens[have] = here.val as u8;
                have += 1;
                continue;
            }
            let (rep, copy) = match here.val {
                16 => {
                    rdr.drop_bits(here.bits as u32);
                    /* no previous length to repeat */
                    safety_check!(have != 0);
                    (self.lens[have - 1], 3 + rdr.pop_bits(2) as usize)
                }
                17 => {
                    rdr.drop_bits(here.bits as u32);
                    (0, 3 + rdr.pop_bits(3) as usize)
                }
                _ => {
                    rdr.drop_bits(here.bits as u32);
                    (0, 11 + rdr.pop_bits(7) as usize)
                }
            };
            safety_check!(have + copy <= total);
            self.lens[have..have + copy].fill(rep);
            have += copy;
        }

        /* the end-of-block symbol must be codeable */
        safety_check!(self.lens[256] != 0);

        /* note: the root widths here (9 and 6) are pinned to the ENOUGH
         * constants; see deflate_constants.rs */
        let (len_used, len_bits) = build_table(
            CodeKind::Lens,
            &self.lens[..nlen],
            &mut self.codes[..],
            LITLEN_TABLEBITS,
            &mut self.work,
        )
        .map_err(|_| InflateError::Decode)?;
        let (_, dist_bits) = build_table(
            CodeKind::Dists,
            &self.lens[nlen..total],
            &mut self.codes[len_used..],
            DIST_TABLEBITS,
            &mut self.work,
        )
        .map_err(|_| InflateError::Decode)?;

        self.len_index = 0;
        self.len_bits = len_bits;
        self.dist_index = len_used as u16;
        self.dist_bits = dist_bits;
        Ok(())
    }

    /* Minimal zlib wrapper (RFC 1950): CMF/FLG, with the FDICT dictionary
     * id skipped but the dictionary itself not applied. The Adler-32
     * trailer is never read. */
    fn parse_zlib_header(&mut self, rdr: &mut BitReader) -> Result<(), InflateError> {
        rdr.ensure();
        let cmf = rdr.bits(8);
        if cmf & 0x0F != 8 {
            /* only DEFLATE streams */
            return Err(InflateError::Header);
        }
        let cinfo = (cmf >> 4) & 0x0F;
        if cinfo > 7 {
            return Err(InflateError::Header);
        }
        let flg = rdr.bits_with_offset(8, 8);
        rdr.drop_bits(16);
        if flg & 0x20 != 0 {
            /* FDICT: skip the 4-byte dictionary id */
            rdr.ensure();
            rdr.drop_bits(16);
            rdr.ensure();
            rdr.drop_bits(16);
        }
        self.window_bits = cinfo as u16 + 8;
        Ok(())
    }
}
