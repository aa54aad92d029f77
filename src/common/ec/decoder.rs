use super::galois::Gf;
use super::poly::ModPoly;
use crate::common::error::{PDF417Error, PDF417Result};

// Reed-Solomon decoder
//------------------------------------------------------------------------------
// Syndrome computation followed by the extended Euclidean algorithm to find
// the error locator and evaluator, a root search over the whole field and
// Forney magnitudes from the formal derivative. Erasure positions are not
// used algebraically; an erased (zero-filled) cell is corrected as an
// ordinary error, so callers must keep the erasure count inside the error
// correction budget themselves.

/// Corrects `codewords` in place and returns the number of corrected
/// positions. `codewords` holds data followed by `num_ec` EC codewords.
pub fn decode(codewords: &mut [u16], num_ec: usize, _erasures: &[usize]) -> PDF417Result<usize> {
    let received = ModPoly::new(codewords.iter().map(|&c| Gf(c)).collect());
    let mut syndromes = vec![Gf::ZERO; num_ec];
    let mut error = false;
    for i in (1..=num_ec).rev() {
        let eval = received.evaluate_at(Gf::exp(i));
        syndromes[num_ec - i] = eval;
        if !eval.is_zero() {
            error = true;
        }
    }
    if !error {
        return Ok(0);
    }

    let syndrome = ModPoly::new(syndromes);
    let (sigma, omega) =
        run_euclidean_algorithm(ModPoly::monomial(num_ec, Gf::ONE), syndrome, num_ec)?;
    let locations = find_error_locations(&sigma)?;
    let magnitudes = find_error_magnitudes(&omega, &sigma, &locations)?;

    for (&location, &magnitude) in locations.iter().zip(&magnitudes) {
        let log = location.log().ok_or(PDF417Error::Checksum)?;
        if log >= codewords.len() {
            return Err(PDF417Error::Checksum);
        }
        let position = codewords.len() - 1 - log;
        codewords[position] = (Gf(codewords[position]) - magnitude).0;
    }
    Ok(locations.len())
}

fn run_euclidean_algorithm(
    a: ModPoly,
    b: ModPoly,
    r_degree: usize,
) -> PDF417Result<(ModPoly, ModPoly)> {
    let (mut r_last, mut r) = if a.degree() < b.degree() { (b, a) } else { (a, b) };
    let mut t_last = ModPoly::zero();
    let mut t = ModPoly::new(vec![Gf::ONE]);

    while r.degree() >= r_degree / 2 {
        let r_last_last = r_last;
        let t_last_last = t_last;
        r_last = r;
        t_last = t;

        if r_last.is_zero() {
            // The syndrome divided out evenly; nothing left to locate.
            return Err(PDF417Error::Checksum);
        }
        r = r_last_last;
        let mut q = ModPoly::zero();
        let dlt_inverse = r_last.leading_coefficient().inverse().ok_or(PDF417Error::Checksum)?;
        while r.degree() >= r_last.degree() && !r.is_zero() {
            let degree_diff = r.degree() - r_last.degree();
            let scale = r.leading_coefficient() * dlt_inverse;
            q = q.add(&ModPoly::monomial(degree_diff, scale));
            r = r.subtract(&r_last.multiply(&ModPoly::monomial(degree_diff, scale)));
        }
        t = q.multiply(&t_last).subtract(&t_last_last).negative();
    }

    let sigma_tilde_at_zero = t.coefficient(0);
    let inverse = sigma_tilde_at_zero.inverse().ok_or(PDF417Error::Checksum)?;
    Ok((t.multiply_scalar(inverse), r.multiply_scalar(inverse)))
}

fn find_error_locations(error_locator: &ModPoly) -> PDF417Result<Vec<Gf>> {
    let num_errors = error_locator.degree();
    let mut locations = Vec::with_capacity(num_errors);
    for i in 1..super::galois::MODULUS {
        if locations.len() >= num_errors {
            break;
        }
        if error_locator.evaluate_at(Gf(i)).is_zero() {
            let inverse = Gf(i).inverse().ok_or(PDF417Error::Checksum)?;
            locations.push(inverse);
        }
    }
    if locations.len() != num_errors {
        return Err(PDF417Error::Checksum);
    }
    Ok(locations)
}

fn find_error_magnitudes(
    error_evaluator: &ModPoly,
    error_locator: &ModPoly,
    error_locations: &[Gf],
) -> PDF417Result<Vec<Gf>> {
    let locator_degree = error_locator.degree();
    if locator_degree < 1 {
        return Ok(Vec::new());
    }
    let mut derivative_coefficients = vec![Gf::ZERO; locator_degree];
    for i in 1..=locator_degree {
        derivative_coefficients[locator_degree - i] =
            Gf((i % super::galois::MODULUS as usize) as u16) * error_locator.coefficient(i);
    }
    let formal_derivative = ModPoly::new(derivative_coefficients);

    let mut magnitudes = Vec::with_capacity(error_locations.len());
    for &location in error_locations {
        let xi_inverse = location.inverse().ok_or(PDF417Error::Checksum)?;
        let numerator = -error_evaluator.evaluate_at(xi_inverse);
        let denominator =
            formal_derivative.evaluate_at(xi_inverse).inverse().ok_or(PDF417Error::Checksum)?;
        magnitudes.push(numerator * denominator);
    }
    Ok(magnitudes)
}

#[cfg(test)]
mod ec_decoder_tests {
    use test_case::test_case;

    use super::decode;
    use crate::common::ec::ec_codewords;
    use crate::common::error::PDF417Error;

    fn protected(data: &[u16], num_ec: usize) -> Vec<u16> {
        let mut codewords = data.to_vec();
        codewords.extend(ec_codewords(data, num_ec));
        codewords
    }

    #[test]
    fn test_clean_codewords_need_no_correction() {
        let mut codewords = protected(&[5, 453, 178, 121, 327], 8);
        let corrected = decode(&mut codewords, 8, &[]).unwrap();
        assert_eq!(corrected, 0);
        assert_eq!(&codewords[..5], &[5, 453, 178, 121, 327]);
    }

    #[test_case(&[0]; "single error")]
    #[test_case(&[1, 4]; "two errors")]
    #[test_case(&[0, 3, 6, 9]; "errors at capacity")]
    fn test_corrects_up_to_half_num_ec(positions: &[usize]) {
        let data = [17u16, 900, 0, 444, 87, 312, 928, 1, 2, 3];
        let mut codewords = protected(&data, 8);
        let reference = codewords.clone();
        for &p in positions {
            codewords[p] = (codewords[p] + 311) % 929;
        }
        let corrected = decode(&mut codewords, 8, &[]).unwrap();
        assert_eq!(corrected, positions.len());
        assert_eq!(codewords, reference);
    }

    #[test]
    fn test_too_many_errors_fail() {
        let data = [17u16, 900, 0, 444, 87, 312, 928, 1, 2, 3];
        let mut codewords = protected(&data, 8);
        for p in 0..6 {
            codewords[p] = (codewords[p] + 101) % 929;
        }
        assert_eq!(decode(&mut codewords, 8, &[]), Err(PDF417Error::Checksum));
    }

    #[test]
    fn test_erased_cell_counts_as_error() {
        let data = [801u16, 2, 3, 4, 5, 6];
        let mut codewords = protected(&data, 4);
        codewords[0] = 0;
        let corrected = decode(&mut codewords, 4, &[0]).unwrap();
        assert_eq!(corrected, 1);
        assert_eq!(codewords[0], 801);
    }
}
