/// A complete 1x1 GIF89a image. Every disguised file carries these bytes in
/// front of its content, so external tools identify it as a GIF.
#[rustfmt::skip]
pub const SIGNATURE: [u8; 35] = [
    // "GIF89a"
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61,
    // logical screen: 1x1, global colour table of 2 entries
    0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00,
    // colour table
    0x05, 0x04, 0x04, 0x00, 0x00, 0x00,
    // image descriptor
    0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
    // LZW minimum code size, one data sub-block, block terminator
    0x02, 0x02, 0x44, 0x01, 0x00,
    // trailer
    0x3b,
];

/// Length of [`SIGNATURE`] in bytes.
pub const SIGNATURE_LEN: u64 = SIGNATURE.len() as u64;
