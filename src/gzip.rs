use crate::gzip_constants::{
    GZIP_CM_DEFLATE, GZIP_FCOMMENT, GZIP_FEXTRA, GZIP_FHCRC, GZIP_FNAME, GZIP_FOOTER_SIZE,
    GZIP_FRESERVED, GZIP_ID1, GZIP_ID2, GZIP_MIN_HEADER_SIZE,
};
use crate::inflate::{InflateBuffer, InflateState, InflateStatus};
use crate::InflateError;

/* Metadata of a gzip member, parsed without decoding any of it. */
#[derive(Debug)]
pub struct GzipInfo {
    /* ISIZE from the trailer: the uncompressed length mod 2^32. This is
     * what the caller sizes the output buffer with. */
    pub uncompressed_size: u32,
    /* MTIME header field (Unix timestamp; 0 means not set) */
    pub mtime: u32,
    /* original file name, when the FNAME field is present */
    pub name: Option<String>,
}

struct GzipHeader {
    mtime: u32,
    name: Option<String>,
    /* offset of the raw deflate payload */
    payload: usize,
}

/*
 * Walk the RFC 1952 member header: the fixed ten bytes, then the optional
 * FEXTRA, FNAME, FCOMMENT and FHCRC fields in that order. The CRC fields
 * are skipped, not verified.
 */
fn parse_header(data: &[u8]) -> Result<GzipHeader, InflateError> {
    if data.len() < GZIP_MIN_HEADER_SIZE + GZIP_FOOTER_SIZE {
        return Err(InflateError::Header);
    }
    if data[0] != GZIP_ID1 || data[1] != GZIP_ID2 || data[2] != GZIP_CM_DEFLATE {
        return Err(InflateError::Header);
    }
    let flags = data[3];
    if flags & GZIP_FRESERVED != 0 {
        return Err(InflateError::Header);
    }
    let mtime = u32::from_le_bytes(data[4..8].try_into().unwrap());
    /* XFL and OS bytes carry no information the decoder needs */
    let mut pos = GZIP_MIN_HEADER_SIZE;

    if flags & GZIP_FEXTRA != 0 {
        if pos + 2 > data.len() {
            return Err(InflateError::Header);
        }
        let xlen = u16::from_le_bytes(data[pos..pos + 2].try_into().unwrap()) as usize;
        pos += 2 + xlen;
        if pos > data.len() {
            return Err(InflateError::Header);
        }
    }

    let mut name = None;
    if flags & GZIP_FNAME != 0 {
        let end = data[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(InflateError::Header)?;
        name = Some(String::from_utf8_lossy(&data[pos..pos + end]).into_owned());
        pos += end + 1;
    }

    if flags & GZIP_FCOMMENT != 0 {
        let end = data[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(InflateError::Header)?;
        pos += end + 1;
    }

    if flags & GZIP_FHCRC != 0 {
        pos += 2;
    }

    if pos + GZIP_FOOTER_SIZE > data.len() {
        return Err(InflateError::Header);
    }
    Ok(GzipHeader {
        mtime,
        name,
        payload: pos,
    })
}

/*
 * Parse the header and trailer of a gzip member without decompressing it.
 * Callers use the returned uncompressed size to allocate the output buffer
 * before running gunzip() over the same bytes.
 */
pub fn gzip_info(data: &[u8]) -> Result<GzipInfo, InflateError> {
    let header = parse_header(data)?;
    let footer = &data[data.len() - GZIP_FOOTER_SIZE..];
    Ok(GzipInfo {
        uncompressed_size: u32::from_le_bytes(footer[4..8].try_into().unwrap()),
        mtime: header.mtime,
        name: header.name,
    })
}

/*
 * Decompress a whole gzip member into 'out', which must be large enough
 * for the full uncompressed payload (see gzip_info). Returns the number of
 * bytes produced. The trailer CRC32 is not verified.
 */
pub fn gunzip(data: &[u8], out: &mut [u8]) -> Result<usize, InflateError> {
    let header = parse_header(data)?;
    let payload = &data[header.payload..data.len() - GZIP_FOOTER_SIZE];

    /* gzip members always use the full 32 KiB window */
    let mut state = InflateState::with_window_bits(15);
    let mut buffer = InflateBuffer::new(payload, out);
    match state.inflate(&mut buffer, true)? {
        InflateStatus::Done => Ok(buffer.total_out),
        InflateStatus::NeedsInput => Err(InflateError::Decode),
    }
}
