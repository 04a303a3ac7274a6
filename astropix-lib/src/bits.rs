//! Bit order helpers.
//!
//! The front-end chip shifts each byte out least-significant bit first, so every byte
//! read back from the hex stream has its bits in reverse order.

/// Reverse the order of the bits in `x`, i.e., bit 0 becomes bit 7, bit 1 becomes
/// bit 6, and so on.
#[must_use]
pub fn reverse_bits(x: u8) -> u8 {
    let x = (x & 0xf0) >> 4 | (x & 0x0f) << 4;
    let x = (x & 0xcc) >> 2 | (x & 0x33) << 2;
    (x & 0xaa) >> 1 | (x & 0x55) << 1
}

/// Reverse the bits of every byte in `dat` in place.
pub fn reverse_all(dat: &mut [u8]) {
    for b in dat.iter_mut() {
        *b = reverse_bits(*b);
    }
}
