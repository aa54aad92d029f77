use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use std::sync::OnceLock;

// GF(929)
//------------------------------------------------------------------------------
// PDF417 codewords live in the prime field mod 929 with generator 3.
// Multiplication and inversion run over exp/log tables built once.

pub const MODULUS: u16 = 929;
const GENERATOR: u32 = 3;

struct FieldTables {
    exp: [u16; MODULUS as usize],
    log: [u16; MODULUS as usize],
}

fn tables() -> &'static FieldTables {
    static TABLES: OnceLock<FieldTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut exp = [0u16; MODULUS as usize];
        let mut log = [0u16; MODULUS as usize];
        let mut x = 1u32;
        for e in exp.iter_mut() {
            *e = x as u16;
            x = (x * GENERATOR) % MODULUS as u32;
        }
        for (i, &e) in exp.iter().take(MODULUS as usize - 1).enumerate() {
            log[e as usize] = i as u16;
        }
        FieldTables { exp, log }
    })
}

/// A field element in 0..929.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gf(pub u16);

impl Gf {
    pub const ZERO: Gf = Gf(0);
    pub const ONE: Gf = Gf(1);

    /// `3^power`, the canonical root sequence used by syndromes and the
    /// encoder's generator polynomial.
    pub fn exp(power: usize) -> Gf {
        Gf(tables().exp[power % (MODULUS as usize - 1)])
    }

    pub fn log(self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        Some(tables().log[self.0 as usize] as usize)
    }

    pub fn inverse(self) -> Option<Gf> {
        let log = self.log()?;
        Some(Gf(tables().exp[MODULUS as usize - 1 - log]))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Gf {
    type Output = Gf;

    fn add(self, rhs: Gf) -> Gf {
        Gf((self.0 + rhs.0) % MODULUS)
    }
}

impl AddAssign for Gf {
    fn add_assign(&mut self, rhs: Gf) {
        *self = *self + rhs;
    }
}

impl Sub for Gf {
    type Output = Gf;

    fn sub(self, rhs: Gf) -> Gf {
        Gf((MODULUS + self.0 - rhs.0) % MODULUS)
    }
}

impl Neg for Gf {
    type Output = Gf;

    fn neg(self) -> Gf {
        Gf::ZERO - self
    }
}

impl Mul for Gf {
    type Output = Gf;

    fn mul(self, rhs: Gf) -> Gf {
        if self.0 == 0 || rhs.0 == 0 {
            return Gf::ZERO;
        }
        let t = tables();
        let log_sum =
            (t.log[self.0 as usize] as usize + t.log[rhs.0 as usize] as usize)
                % (MODULUS as usize - 1);
        Gf(t.exp[log_sum])
    }
}

#[cfg(test)]
mod galois_tests {
    use super::*;

    #[test]
    fn test_exp_log_inverses() {
        for power in [0usize, 1, 17, 500, 927] {
            let x = Gf::exp(power);
            assert_eq!(x.log(), Some(power));
        }
        assert_eq!(Gf::ZERO.log(), None);
    }

    #[test]
    fn test_field_axioms() {
        let a = Gf(371);
        let b = Gf(850);
        assert_eq!(a + Gf::ZERO, a);
        assert_eq!(a * Gf::ONE, a);
        assert_eq!(a - a, Gf::ZERO);
        assert_eq!(a + b, b + a);
        assert_eq!((a * b) * a.inverse().unwrap(), b);
        assert_eq!(Gf::ZERO.inverse(), None);
    }

    #[test]
    fn test_mul_matches_modular_product() {
        assert_eq!(Gf(928) * Gf(928), Gf((928u32 * 928 % 929) as u16));
        assert_eq!(Gf(2) * Gf(465), Gf(1));
    }
}
