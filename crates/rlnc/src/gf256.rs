//! GF(2^8) arithmetic over the polynomial x^8 + x^4 + x^3 + x^2 + 1 (0x11D).
//!
//! Addition is XOR. Multiplication goes through log/exp tables built at
//! compile time. The binary field GF(2) is the {0, 1} subfield, so the same
//! routines serve both field choices.

const POLY: u16 = 0x11D;

static EXP: [u8; 512] = exp_table();
static LOG: [u8; 256] = log_table();

const fn exp_table() -> [u8; 512] {
    let mut table = [0u8; 512];
    let mut val: u16 = 1;
    let mut i = 0;
    while i < 255 {
        table[i] = val as u8;
        table[i + 255] = val as u8;
        val <<= 1;
        if val & 0x100 != 0 {
            val ^= POLY;
        }
        i += 1;
    }
    table[510] = table[0];
    table[511] = table[1];
    table
}

const fn log_table() -> [u8; 256] {
    let exp = exp_table();
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        table[exp[i] as usize] = i as u8;
        i += 1;
    }
    table
}

#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    EXP[LOG[a as usize] as usize + LOG[b as usize] as usize]
}

/// Multiplicative inverse. Zero has none; callers only invert pivots.
#[inline]
pub fn inv(a: u8) -> u8 {
    debug_assert!(a != 0, "zero has no inverse in GF(256)");
    if a == 0 {
        return 0;
    }
    EXP[255 - LOG[a as usize] as usize]
}

/// `dst[i] ^= c * src[i]`
pub fn mul_add(dst: &mut [u8], src: &[u8], c: u8) {
    match c {
        0 => {}
        1 => dst.iter_mut().zip(src).for_each(|(d, s)| *d ^= s),
        _ => {
            let log_c = LOG[c as usize] as usize;
            for (d, &s) in dst.iter_mut().zip(src) {
                if s != 0 {
                    *d ^= EXP[log_c + LOG[s as usize] as usize];
                }
            }
        }
    }
}

/// `buf[i] = c * buf[i]`
pub fn scale(buf: &mut [u8], c: u8) {
    match c {
        0 => buf.fill(0),
        1 => {}
        _ => buf.iter_mut().for_each(|b| *b = mul(*b, c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_nonzero_element_has_an_inverse() {
        for a in 1..=255u8 {
            assert_eq!(mul(a, inv(a)), 1, "a = {a}");
        }
    }

    #[test]
    fn multiplication_distributes_over_xor() {
        for a in [0x02u8, 0x53, 0xca, 0xff] {
            for b in [0x01u8, 0x8e, 0x33] {
                for c in [0x00u8, 0x10, 0xfe] {
                    assert_eq!(mul(a, b ^ c), mul(a, b) ^ mul(a, c));
                }
            }
        }
    }

    #[test]
    fn binary_subfield_is_closed() {
        for a in 0..=1u8 {
            for b in 0..=1u8 {
                assert_eq!(mul(a, b), a & b);
                assert!(a ^ b <= 1);
            }
        }
    }

    #[test]
    fn mul_add_matches_scalar_loop() {
        let src = [0u8, 1, 2, 0x80, 0xff];
        let mut dst = [7u8, 7, 7, 7, 7];
        mul_add(&mut dst, &src, 0x1d);
        for (i, &s) in src.iter().enumerate() {
            assert_eq!(dst[i], 7 ^ mul(s, 0x1d));
        }
    }
}
