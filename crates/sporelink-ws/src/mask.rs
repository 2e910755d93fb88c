//! Payload masking.

/// XOR `buf` with the 4-byte masking key, byte `i` with `key[i & 3]`.
///
/// Applying the same key twice restores the input.
#[inline]
pub fn apply_mask(buf: &mut [u8], key: [u8; 4]) {
    let word = u32::from_ne_bytes(key);
    let mut chunks = buf.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let masked = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ word;
        chunk.copy_from_slice(&masked.to_ne_bytes());
    }
    for (byte, k) in chunks.into_remainder().iter_mut().zip(key) {
        *byte ^= k;
    }
}

/// Fresh random masking key for one outbound frame.
#[inline]
pub fn random_key() -> [u8; 4] {
    rand::random()
}
