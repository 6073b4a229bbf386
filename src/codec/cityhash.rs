//! CityHash128, version 1.0.2.
//!
//! This is the revision the columnar server froze for its block checksums.
//! Later CityHash releases changed the long-input mixing and are not
//! compatible. All loads are little-endian.

const K0: u64 = 0xc3a5_c85c_97cb_3127;
const K1: u64 = 0xb492_b66f_be98_f273;
const K2: u64 = 0x9ae1_6a3b_2f90_404f;
const K3: u64 = 0xc949_d7c7_509e_6557;
const K_MUL: u64 = 0x9ddf_ea08_eb38_2d69;

/// 128-bit hash of `data` as `(low, high)`.
pub fn hash128(data: &[u8]) -> (u64, u64) {
    let len = data.len();
    if len >= 16 {
        with_seed(data, 16, len - 16, (fetch64(data, 0) ^ K3, fetch64(data, 8)))
    } else if len >= 8 {
        let seed = (
            fetch64(data, 0) ^ (len as u64).wrapping_mul(K0),
            fetch64(data, len - 8) ^ K1,
        );
        with_seed(&[], 0, 0, seed)
    } else {
        with_seed(data, 0, len, (K0, K1))
    }
}

/// The 16 checksum bytes as they appear on the wire.
pub fn checksum(data: &[u8]) -> [u8; 16] {
    let (low, high) = hash128(data);
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&low.to_le_bytes());
    out[8..].copy_from_slice(&high.to_le_bytes());
    out
}

fn fetch64(data: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(buf)
}

fn fetch32(data: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(buf) as u64
}

#[inline]
fn rotate(v: u64, shift: u32) -> u64 {
    v.rotate_right(shift)
}

#[inline]
fn shift_mix(v: u64) -> u64 {
    v ^ (v >> 47)
}

fn hash_len16(u: u64, v: u64) -> u64 {
    let mut a = (u ^ v).wrapping_mul(K_MUL);
    a ^= a >> 47;
    let mut b = (v ^ a).wrapping_mul(K_MUL);
    b ^= b >> 47;
    b.wrapping_mul(K_MUL)
}

fn hash_len0to16(s: &[u8]) -> u64 {
    let len = s.len();
    if len > 8 {
        let a = fetch64(s, 0);
        let b = fetch64(s, len - 8);
        return hash_len16(a, rotate(b.wrapping_add(len as u64), len as u32)) ^ b;
    }
    if len >= 4 {
        let a = fetch32(s, 0);
        return hash_len16((len as u64).wrapping_add(a << 3), fetch32(s, len - 4));
    }
    if len > 0 {
        let a = s[0] as u32;
        let b = s[len >> 1] as u32;
        let c = s[len - 1] as u32;
        let y = a.wrapping_add(b << 8) as u64;
        let z = (len as u32).wrapping_add(c << 2) as u64;
        return shift_mix(y.wrapping_mul(K2) ^ z.wrapping_mul(K3)).wrapping_mul(K2);
    }
    K2
}

/// Short inputs (under 128 bytes).
fn city_murmur(s: &[u8], seed: (u64, u64)) -> (u64, u64) {
    let len = s.len();
    let (mut a, mut b) = seed;
    let mut c;
    let mut d;

    if len <= 16 {
        a = shift_mix(a.wrapping_mul(K1)).wrapping_mul(K1);
        c = b.wrapping_mul(K1).wrapping_add(hash_len0to16(s));
        d = shift_mix(a.wrapping_add(if len >= 8 { fetch64(s, 0) } else { c }));
    } else {
        c = hash_len16(fetch64(s, len - 8).wrapping_add(K1), a);
        d = hash_len16(b.wrapping_add(len as u64), c.wrapping_add(fetch64(s, len - 16)));
        a = a.wrapping_add(d);
        let mut pos = 0;
        let mut left = len as isize - 16;
        while left > 0 {
            a ^= shift_mix(fetch64(s, pos).wrapping_mul(K1)).wrapping_mul(K1);
            a = a.wrapping_mul(K1);
            b ^= a;
            c ^= shift_mix(fetch64(s, pos + 8).wrapping_mul(K1)).wrapping_mul(K1);
            c = c.wrapping_mul(K1);
            d ^= c;
            pos += 16;
            left -= 16;
        }
    }

    let a = hash_len16(a, c);
    let b = hash_len16(d, b);
    (a ^ b, hash_len16(b, a))
}

fn weak_hash_len32_with_seeds(s: &[u8], at: usize, a: u64, b: u64) -> (u64, u64) {
    let w = fetch64(s, at);
    let x = fetch64(s, at + 8);
    let y = fetch64(s, at + 16);
    let z = fetch64(s, at + 24);

    let mut a = a.wrapping_add(w);
    let mut b = rotate(b.wrapping_add(a).wrapping_add(z), 21);
    let c = a;
    a = a.wrapping_add(x);
    a = a.wrapping_add(y);
    b = b.wrapping_add(rotate(a, 44));
    (a.wrapping_add(z), b.wrapping_add(c))
}

/// Hash `len` bytes of `data` starting at `start`. The tail pass reads up to
/// 32 bytes before the last full chunk, so the whole buffer is passed in.
fn with_seed(data: &[u8], start: usize, len: usize, seed: (u64, u64)) -> (u64, u64) {
    if len < 128 {
        return city_murmur(&data[start..start + len], seed);
    }

    let (mut x, mut y) = seed;
    let mut z = (len as u64).wrapping_mul(K1);
    let mut pos = start;
    let mut len = len;

    let v0 = rotate(y ^ K1, 49).wrapping_mul(K1).wrapping_add(fetch64(data, pos));
    let v1 = rotate(v0, 42).wrapping_mul(K1).wrapping_add(fetch64(data, pos + 8));
    let mut v = (v0, v1);
    let mut w = (
        rotate(y.wrapping_add(z), 35).wrapping_mul(K1).wrapping_add(x),
        rotate(x.wrapping_add(fetch64(data, pos + 88)), 53).wrapping_mul(K1),
    );

    loop {
        for _ in 0..2 {
            x = rotate(
                x.wrapping_add(y)
                    .wrapping_add(v.0)
                    .wrapping_add(fetch64(data, pos + 16)),
                37,
            )
            .wrapping_mul(K1);
            y = rotate(y.wrapping_add(v.1).wrapping_add(fetch64(data, pos + 48)), 42)
                .wrapping_mul(K1);
            x ^= w.1;
            y ^= v.0;
            z = rotate(z ^ w.0, 33);
            v = weak_hash_len32_with_seeds(data, pos, v.1.wrapping_mul(K1), x.wrapping_add(w.0));
            w = weak_hash_len32_with_seeds(data, pos + 32, z.wrapping_add(w.1), y);
            std::mem::swap(&mut z, &mut x);
            pos += 64;
        }
        len -= 128;
        if len < 128 {
            break;
        }
    }

    y = y.wrapping_add(rotate(w.0, 37).wrapping_mul(K0)).wrapping_add(z);
    x = x.wrapping_add(rotate(v.0.wrapping_add(z), 49).wrapping_mul(K0));

    let mut tail_done = 0;
    while tail_done < len {
        tail_done += 32;
        let at = pos + len - tail_done;
        y = rotate(y.wrapping_sub(x), 42).wrapping_mul(K0).wrapping_add(v.1);
        w.0 = w.0.wrapping_add(fetch64(data, at + 16));
        x = rotate(x, 49).wrapping_mul(K0).wrapping_add(w.0);
        w.0 = w.0.wrapping_add(v.0);
        v = weak_hash_len32_with_seeds(data, at, v.0, v.1);
    }

    let x = hash_len16(x, v.0);
    let y = hash_len16(y, w.0);
    (
        hash_len16(x.wrapping_add(v.1), w.1).wrapping_add(y),
        hash_len16(x.wrapping_add(w.1), y.wrapping_add(v.1)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i * 31 + 7) as u8).collect()
    }

    #[test]
    fn test_known_values_cover_every_length_class() {
        let cases: [(usize, u64, u64); 8] = [
            (0, 0x3df09dfc64c09a2b, 0x3cb540c392e51e29),
            (3, 0xe407deda7bb0f294, 0x0a3a0d146e27f1bd),
            (8, 0xf5a4ca47208136a0, 0x3dd4575b3d46e5ab),
            (15, 0xd956065c63d9ab15, 0x9623caadd0037b73),
            (16, 0x3f3a3275564b7f48, 0xb48a2a7a16bac60b),
            (40, 0x8a9aaebbf577b904, 0xefb4c919bad434a6),
            (200, 0x67b5c9a4f885f24b, 0xb4a0f54a58082487),
            (300, 0x0ad7d1f77d7e62c5, 0x0702d3372375ccf2),
        ];
        for (len, low, high) in cases {
            assert_eq!(hash128(&data(len)), (low, high), "len {len}");
        }
    }

    #[test]
    fn test_text_input() {
        assert_eq!(
            hash128(b"hello world"),
            (0x7dfb52dd24b29c7b, 0x0f6075c357e384d0)
        );
    }

    #[test]
    fn test_checksum_byte_order() {
        let (low, high) = hash128(b"abc");
        let bytes = checksum(b"abc");
        assert_eq!(&bytes[..8], &low.to_le_bytes());
        assert_eq!(&bytes[8..], &high.to_le_bytes());
    }

    #[test]
    fn test_every_length_up_to_long_tail_is_distinct() {
        let input = data(600);
        let mut seen = std::collections::HashSet::new();
        for len in 0..=input.len() {
            assert!(seen.insert(hash128(&input[..len])), "collision at len {len}");
        }
    }
}
