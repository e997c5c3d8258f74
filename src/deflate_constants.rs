/* Codeword lengths in DEFLATE are limited to 15 bits for every alphabet. */
pub const DEFLATE_MAX_CODEWORD_LEN: usize = 15;

/* Alphabet sizes: 288 literal/length symbols (of which 286/287 are reserved
 * and never valid), 32 distance symbols (30/31 reserved), and the 19-symbol
 * code-length meta alphabet of a dynamic block header. */
pub const DEFLATE_NUM_LITLEN_SYMS: usize = 288;
pub const DEFLATE_NUM_DIST_SYMS: usize = 32;
pub const DEFLATE_NUM_PRECODE_SYMS: usize = 19;

/* Scratch area for the code lengths of one dynamic block: HLIT + HDIST
 * lengths at most. */
pub const DEFLATE_MAX_LENS: usize = DEFLATE_NUM_LITLEN_SYMS + DEFLATE_NUM_DIST_SYMS;

/* BTYPE values from the 3-bit block header. */
pub const DEFLATE_BLOCKTYPE_STORED: u32 = 0;
pub const DEFLATE_BLOCKTYPE_STATIC_HUFFMAN: u32 = 1;
pub const DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN: u32 = 2;

/* Requested root table index widths. These cannot change without also
 * changing the ENOUGH numbers below. */
pub const PRECODE_TABLEBITS: u8 = 7;
pub const LITLEN_TABLEBITS: u8 = 9;
pub const DIST_TABLEBITS: u8 = 6;

/*
 * Each ENOUGH number is the worst-case number of decode table entries
 * (root table plus all sub-tables) for the corresponding Huffman code,
 * as enumerated by the 'enough' utility program from zlib.
 */
pub const ENOUGH_LENS: usize = 852; /* enough 288 9 15 */
pub const ENOUGH_DISTS: usize = 592; /* enough 32 6 15 */
pub const ENOUGH: usize = ENOUGH_LENS + ENOUGH_DISTS;

/* When you change TABLEBITS, you must change ENOUGH, and vice versa! */
const_assert!(LITLEN_TABLEBITS == 9 && ENOUGH_LENS == 852);
const_assert!(DIST_TABLEBITS == 6 && ENOUGH_DISTS == 592);
