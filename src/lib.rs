//! A performance-tuned DEFLATE (RFC 1951) decoder with gzip (RFC 1952) and
//! minimal zlib (RFC 1950) framing.
//!
//! The decoder works against a caller-provided output buffer sized for the
//! whole uncompressed payload; back-references read earlier output straight
//! from that buffer, so no separate sliding window exists. Input may arrive
//! in chunks: all decode state lives in [`InflateState`] and a call that
//! runs out of input suspends at the exact bit position it resumes from.
//!
//! Checksums (Adler-32, CRC-32) are parsed past but not verified.

pub mod bitstream;
pub mod gzip;
pub mod inflate;

mod decode_entry;
mod deflate_constants;
mod gzip_constants;
mod huffman_table;
mod static_tables;

#[macro_use]
extern crate static_assertions;

pub use crate::gzip::{gunzip, gzip_info, GzipInfo};
pub use crate::inflate::{InflateBuffer, InflateState, InflateStatus};

/* Result of a failed decode. The first error is latched in the state; the
 * recoverable "more input needed" condition is not an error but an
 * InflateStatus. */
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InflateError {
    /* rejected gzip or zlib framing */
    Header,
    /* malformed DEFLATE content */
    Decode,
    /* the output buffer cannot hold the full payload; it must be pre-sized,
     * so this is a caller bug rather than a recoverable condition */
    OutputInsufficient,
    /* a buffer in an impossible state was supplied */
    InvalidParameter,
}

#[macro_export]
macro_rules! safety_check {
    ($cond:expr) => {
        if !$cond {
            return Err($crate::InflateError::Decode);
        }
    };
}
