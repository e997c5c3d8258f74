use crate::decode_entry::DecodeEntry;
use crate::deflate_constants::{DEFLATE_MAX_CODEWORD_LEN, ENOUGH_DISTS, ENOUGH_LENS};

/* Which alphabet a table is being built for; selects the base/extra tables
 * and the arena budget. */
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum CodeKind {
    /* the code-length meta alphabet of a dynamic block header */
    Codes,
    /* literal/length symbols */
    Lens,
    /* distance symbols */
    Dists,
}

#[derive(Debug)]
pub enum TableError {
    /* over-subscribed or incomplete set of code lengths */
    InvalidCode,
    /* the ENOUGH budget for this alphabet would be exceeded */
    Overflow,
}

/* Base values and extra-bit counts for the length symbols 257..285. The
 * extra counts carry the 0x10 "base" marker pre-OR'd so they can be stored
 * into a DecodeEntry op field directly; the two trailing entries poison the
 * reserved symbols 286/287 with the invalid-code marker. */
const LENGTH_BASE: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258, 0, 0,
];
const LENGTH_EXTRA: [u8; 31] = [
    16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 18, 18, 18, 18, 19, 19, 19, 19, 20, 20, 20, 20,
    21, 21, 21, 21, 16, 64, 64,
];

/* Same for the distance symbols 0..29 plus the two reserved ones. */
const DIST_BASE: [u16; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 0, 0,
];
const DIST_EXTRA: [u8; 32] = [
    16, 16, 16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 21, 21, 22, 22, 23, 23, 24, 24, 25, 25, 26, 26,
    27, 27, 28, 28, 29, 29, 64, 64,
];

/*
 * Build the decode table for the canonical Huffman code described by
 * lens[0..n), appending entries at the start of 'table'. The layout is a
 * root table directly indexed by 'root_bits' bits, whose over-long entries
 * link to sub-tables indexed by the remaining high-order bits of the code.
 *
 * The table is built for bit-reversed indexing (the first codeword bit is
 * the low-order index bit), which is how DEFLATE emits codes on the wire.
 * Symbols are first counting-sorted into 'work' by code length, preserving
 * symbol order within a length, which enumerates the canonical codewords in
 * lexicographic order.
 *
 * 'root_bits' is the requested root index width; the returned width is
 * clamped into the range of actually occurring code lengths. The returned
 * usize is the number of arena entries consumed.
 *
 * A set of lengths using more codespace than exists is rejected, as is an
 * incomplete set, except for the single-symbol code DEFLATE permits (the
 * one-bit codeword is taken to be '0', and '1' maps to an invalid-code
 * entry). An all-zero set of lengths yields a two-entry table of invalid
 * markers: the empty code only becomes an error if it is ever indexed.
 */
pub fn build_table(
    kind: CodeKind,
    lens: &[u8],
    table: &mut [DecodeEntry],
    root_bits: u8,
    work: &mut [u16; 288],
) -> Result<(usize, u8), TableError> {
    let mut count = [0u16; DEFLATE_MAX_CODEWORD_LEN + 1];
    for &len in lens {
        count[len as usize] += 1;
    }

    /* bound code lengths, force root to be within them */
    let mut root = root_bits as usize;
    let mut max = DEFLATE_MAX_CODEWORD_LEN;
    while max >= 1 && count[max] == 0 {
        max -= 1;
    }
    if root > max {
        root = max;
    }
    if max == 0 {
        table[0] = DecodeEntry::invalid(1);
        table[1] = DecodeEntry::invalid(1);
        return Ok((2, 1));
    }
    let mut min = 1;
    while min < max && count[min] == 0 {
        min += 1;
    }
    if root < min {
        root = min;
    }

    /* check for an over-subscribed or incomplete set of lengths */
    let mut left: i32 = 1;
    for len in 1..=DEFLATE_MAX_CODEWORD_LEN {
        left <<= 1;
        left -= count[len] as i32;
        if left < 0 {
            return Err(TableError::InvalidCode);
        }
    }
    if left > 0 && max != 1 {
        /* incomplete and not the tolerated single-symbol code */
        return Err(TableError::InvalidCode);
    }

    /* generate offsets into the sorted-symbol table for each length */
    let mut offs = [0u16; DEFLATE_MAX_CODEWORD_LEN + 1];
    for len in 1..DEFLATE_MAX_CODEWORD_LEN {
        offs[len + 1] = offs[len] + count[len];
    }

    /* sort symbols by length, by symbol order within each length */
    for (sym, &len) in lens.iter().enumerate() {
        if len != 0 {
            work[offs[len as usize] as usize] = sym as u16;
            offs[len as usize] += 1;
        }
    }

    let (base, extra, match_): (&[u16], &[u8], usize) = match kind {
        /* meta symbols decode to themselves; base/extra never consulted */
        CodeKind::Codes => (&[], &[], 20),
        CodeKind::Lens => (&LENGTH_BASE, &LENGTH_EXTRA, 257),
        CodeKind::Dists => (&DIST_BASE, &DIST_EXTRA, 0),
    };

    /*
     * Fill in the decode tables. The table currently being filled starts at
     * 'next' and has 'curr' index bits. The codeword being placed is 'huff'
     * with length 'len'; it is converted to an index by dropping the 'drop'
     * bits already resolved by the root lookup (zero while the root table
     * itself is filled). Codes shorter than drop + curr are replicated
     * through all values of the unused high index bits.
     *
     * When 'len' first exceeds 'root', sub-tables are started; each one is
     * sized by looking ahead at the length counts until its local codespace
     * is exhausted, and a link entry is deposited in the root table at the
     * low 'root' bits of 'huff'. 'used' tracks the arena entries allocated
     * so far and is checked against the ENOUGH budget before each growth.
     */
    let mut huff: usize = 0;
    let mut sym: usize = 0;
    let mut len = min;
    let mut next: usize = 0;
    let mut curr = root;
    let mut drop_: usize = 0;
    let mut low = usize::MAX;
    let mut used: usize = 1 << root;
    let mask = used - 1;

    if (kind == CodeKind::Lens && used > ENOUGH_LENS)
        || (kind == CodeKind::Dists && used > ENOUGH_DISTS)
    {
        return Err(TableError::Overflow);
    }

    loop {
        /* create the entry for the current sorted symbol */
        let ws = work[sym] as usize;
        let here = if ws + 1 < match_ {
            DecodeEntry::new((len - drop_) as u8, 0, ws as u16)
        } else if ws >= match_ {
            DecodeEntry::new(
                (len - drop_) as u8,
                extra[ws - match_],
                base[ws - match_],
            )
        } else {
            /* end of block (symbol 256) */
            DecodeEntry::new(
                (len - drop_) as u8,
                DecodeEntry::END_OF_BLOCK | DecodeEntry::INVALID,
                0,
            )
        };

        /* replicate for all indices whose low 'len' bits equal 'huff' */
        let incr = 1usize << (len - drop_);
        let mut fill = 1usize << curr;
        let entry_base = next + (huff >> drop_);
        loop {
            fill -= incr;
            table[entry_base + fill] = here;
            if fill == 0 {
                break;
            }
        }

        /* backwards increment the len-bit code huff */
        let mut bump = 1usize << (len - 1);
        while huff & bump != 0 {
            bump >>= 1;
        }
        huff = if bump != 0 { (huff & (bump - 1)) + bump } else { 0 };

        /* go to next symbol, update count, len */
        sym += 1;
        count[len] -= 1;
        if count[len] == 0 {
            if len == max {
                break;
            }
            len = lens[work[sym] as usize] as usize;
        }

        /* create a new sub-table if needed */
        if len > root && (huff & mask) != low {
            if drop_ == 0 {
                drop_ = root;
            }
            /* move past the table just departed (still 1 << curr entries) */
            next += 1 << curr;

            /* size the sub-table so its local codespace is exactly used up
             * by the remaining codes */
            curr = len - drop_;
            let mut left = 1i32 << curr;
            while curr + drop_ < max {
                left -= count[curr + drop_] as i32;
                if left <= 0 {
                    break;
                }
                curr += 1;
                left <<= 1;
            }

            used += 1 << curr;
            if (kind == CodeKind::Lens && used > ENOUGH_LENS)
                || (kind == CodeKind::Dists && used > ENOUGH_DISTS)
            {
                return Err(TableError::Overflow);
            }

            low = huff & mask;
            table[low] = DecodeEntry::sub_table_link(root as u8, curr as u8, next as u16);
        }
    }

    /* fill in the remaining entry of an incomplete single-symbol code
     * (its only unused index is the one-bit codeword '1') */
    if huff != 0 {
        table[next + huff] = DecodeEntry::invalid((len - drop_) as u8);
    }

    Ok((used, root as u8))
}
