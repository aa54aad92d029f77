mod decoder;
mod galois;
mod poly;

pub use decoder::decode;
pub use galois::{Gf, MODULUS};
pub(crate) use poly::ModPoly;

// Error correction codeword generation
//------------------------------------------------------------------------------

/// EC codewords for `data`, to be appended after it. The generator
/// polynomial is the product of `(x - 3^i)` for `i` in `1..=num_ec`; the EC
/// symbols are the negated remainder of the data polynomial shifted up by
/// `num_ec`.
pub fn ec_codewords(data: &[u16], num_ec: usize) -> Vec<u16> {
    let generator = generator_poly(num_ec);

    let mut dividend: Vec<Gf> = data.iter().map(|&c| Gf(c)).collect();
    dividend.resize(data.len() + num_ec, Gf::ZERO);

    for i in 0..data.len() {
        let coefficient = dividend[i];
        if coefficient.is_zero() {
            continue;
        }
        // Generator is monic, so no leading-term inversion is needed.
        for (j, &g) in generator.iter().enumerate().skip(1) {
            dividend[i + j] = dividend[i + j] - coefficient * g;
        }
    }

    dividend.split_off(data.len()).iter().map(|&r| (-r).0).collect()
}

/// Coefficients of the monic generator polynomial, highest degree first.
fn generator_poly(num_ec: usize) -> Vec<Gf> {
    let mut generator = vec![Gf::ONE];
    for i in 1..=num_ec {
        let root = Gf::exp(i);
        let mut next = vec![Gf::ZERO; generator.len() + 1];
        for (j, &g) in generator.iter().enumerate() {
            next[j] += g;
            next[j + 1] = next[j + 1] - g * root;
        }
        generator = next;
    }
    generator
}
