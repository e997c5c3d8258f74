/* gzip member header magic and compression method (RFC 1952). */
pub const GZIP_ID1: u8 = 0x1F;
pub const GZIP_ID2: u8 = 0x8B;
pub const GZIP_CM_DEFLATE: u8 = 8;

/* FLG bits. FTEXT (0x01) is advisory and ignored. */
pub const GZIP_FHCRC: u8 = 0x02;
pub const GZIP_FEXTRA: u8 = 0x04;
pub const GZIP_FNAME: u8 = 0x08;
pub const GZIP_FCOMMENT: u8 = 0x10;
pub const GZIP_FRESERVED: u8 = 0xE0;

/* Fixed-size header prefix (ID1 ID2 CM FLG MTIME XFL OS) and the
 * CRC32 + ISIZE trailer. */
pub const GZIP_MIN_HEADER_SIZE: usize = 10;
pub const GZIP_FOOTER_SIZE: usize = 8;
