//! IOS NVRAM checksum.

/// Computes the NVRAM checksum of `data`.
///
/// Big-endian 16-bit words are summed; a trailing odd byte counts as the high
/// byte of a final word. Carries are folded back into the low 16 bits and the
/// ones complement of the result is returned.
pub fn nvram_cksum(data: &[u8]) -> u16 {
    let mut words = data.chunks_exact(2);
    let mut sum: u64 = words
        .by_ref()
        .map(|w| u64::from(u16::from_be_bytes([w[0], w[1]])))
        .sum();

    if let [odd] = words.remainder() {
        sum += u64::from(*odd) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}
