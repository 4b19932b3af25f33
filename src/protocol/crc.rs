//! CRC-16 used for the optional header and payload checksums.
//!
//! Table-driven, polynomial `0x1021`, initial register `0xFFFF`, final XOR
//! `0xFFFF`, no bit reflection (the CRC-16/GENIBUS parameter set). The
//! lookup table is computed at compile time and shared read-only.
//!
//! ```
//! use gdp_protocol::protocol::{crc16, crc16_scatter};
//!
//! let whole = crc16(b"hello world");
//! let split = crc16_scatter(&[&b"hello "[..], &b"world"[..]]);
//! assert_eq!(whole, split);
//! assert_eq!(crc16(b""), 0);
//! ```

const POLYNOMIAL: u16 = 0x1021;

static CRC_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut value = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 0x8000 != 0 {
                (value << 1) ^ POLYNOMIAL
            } else {
                value << 1
            };
            bit += 1;
        }
        table[i] = value;
        i += 1;
    }
    table
}

#[inline]
fn update(mut register: u16, data: &[u8]) -> u16 {
    for &byte in data {
        let index = ((register >> 8) as u8 ^ byte) as usize;
        register = (register << 8) ^ CRC_TABLE[index];
    }
    register
}

/// CRC over a single contiguous buffer. Empty input yields `0`.
pub fn crc16(data: &[u8]) -> u16 {
    if data.is_empty() {
        return 0;
    }
    update(0xFFFF, data) ^ 0xFFFF
}

/// CRC over several segments, identical to `crc16` of their concatenation.
pub fn crc16_scatter<S: AsRef<[u8]>>(segments: &[S]) -> u16 {
    if segments.iter().all(|s| s.as_ref().is_empty()) {
        return 0;
    }
    segments
        .iter()
        .fold(0xFFFF, |register, s| update(register, s.as_ref()))
        ^ 0xFFFF
}
