//!
//! Null model: i.i.d. residue composition of unrelated sequence
//!
use crate::alphabet::{Alphabet, AlphabetType};

/// Standard amino acid composition (Swiss-Prot 34), in alphabet order `ACDEFGHIKLMNPQRSTVWY`
const AMINO_BG: [f64; 20] = [
    0.0787945, 0.0151600, 0.0535222, 0.0668298, 0.0397062, 0.0695071, 0.0229198, 0.0590092,
    0.0594422, 0.0963728, 0.0237718, 0.0414386, 0.0482904, 0.0395639, 0.0540978, 0.0683364,
    0.0540687, 0.0673417, 0.0114135, 0.0304133,
];

#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    abc: Alphabet,
    f: Vec<f64>,
}

impl Background {
    ///
    /// Default background of the alphabet: the standard composition for amino
    /// acids, uniform otherwise.
    ///
    pub fn new(abc: &Alphabet) -> Background {
        let f = match abc.kind() {
            AlphabetType::Amino => AMINO_BG.to_vec(),
            _ => vec![1.0 / abc.k() as f64; abc.k()],
        };
        Background {
            abc: abc.clone(),
            f,
        }
    }
    pub fn alphabet(&self) -> &Alphabet {
        &self.abc
    }
    /// frequency of the canonical residue `x`
    pub fn freq(&self, x: u8) -> f64 {
        self.f[x as usize]
    }
    pub fn freqs(&self) -> &[f64] {
        &self.f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn background_sums_to_one() {
        for abc in [Alphabet::dna(), Alphabet::amino()] {
            let bg = Background::new(&abc);
            let total: f64 = bg.freqs().iter().sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-4);
            assert_eq!(bg.freqs().len(), abc.k());
        }
        assert_eq!(Background::new(&Alphabet::dna()).freq(2), 0.25);
    }
}
