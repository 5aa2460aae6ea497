//!
//! Symbol alphabet and digitized sequences
//!
//! Symbols are mapped into codes `0..Kp`:
//!
//! ```text
//! 0..K      canonical residues
//! K         gap
//! K+1..Kp-3 degenerate residues
//! Kp-3      "any" residue (N for nucleic, X for amino)
//! Kp-2      nonresidue (*)
//! Kp-1      missing data (~)
//! ```
//!
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Code placed at both ends of a digitized sequence
pub const SENTINEL: u8 = 255;
/// Marker of a character that has no code in the input map
const ILLEGAL: u8 = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphabetType {
    Dna,
    Rna,
    Amino,
    Custom,
}

impl std::str::FromStr for AlphabetType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dna" => Ok(AlphabetType::Dna),
            "rna" => Ok(AlphabetType::Rna),
            "amino" | "protein" => Ok(AlphabetType::Amino),
            _ => Err(Error::invalid(format!("unknown alphabet type {}", s))),
        }
    }
}

///
/// Alphabet: symbol <-> code mapping and degeneracy sets
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AlphabetDef", into = "AlphabetDef")]
pub struct Alphabet {
    kind: AlphabetType,
    /// symbol of each code
    symbols: Vec<u8>,
    /// number of canonical residues
    k: usize,
    /// ascii -> code
    inmap: [u8; 128],
    /// `degen[code][x]` is true if canonical residue `x` is included in `code`
    degen: Vec<Vec<bool>>,
}

/// Serialized form of an alphabet. Lookup tables are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AlphabetDef {
    kind: AlphabetType,
    symbols: String,
    k: usize,
}

impl TryFrom<AlphabetDef> for Alphabet {
    type Error = Error;
    fn try_from(def: AlphabetDef) -> Result<Alphabet> {
        match def.kind {
            AlphabetType::Custom => Alphabet::custom(def.symbols.as_bytes(), def.k),
            kind => Ok(Alphabet::new(kind)),
        }
    }
}

impl From<Alphabet> for AlphabetDef {
    fn from(abc: Alphabet) -> AlphabetDef {
        AlphabetDef {
            kind: abc.kind,
            symbols: String::from_utf8_lossy(&abc.symbols).into_owned(),
            k: abc.k,
        }
    }
}

static DNA: Lazy<Alphabet> = Lazy::new(|| Alphabet::build_nucleic(AlphabetType::Dna));
static RNA: Lazy<Alphabet> = Lazy::new(|| Alphabet::build_nucleic(AlphabetType::Rna));
static AMINO: Lazy<Alphabet> = Lazy::new(Alphabet::build_amino);

impl Alphabet {
    ///
    /// Standard alphabet of the type.
    /// `AlphabetType::Custom` gives the DNA alphabet; use `Alphabet::custom` instead.
    ///
    pub fn new(kind: AlphabetType) -> Alphabet {
        match kind {
            AlphabetType::Dna | AlphabetType::Custom => DNA.clone(),
            AlphabetType::Rna => RNA.clone(),
            AlphabetType::Amino => AMINO.clone(),
        }
    }
    pub fn dna() -> Alphabet {
        Alphabet::new(AlphabetType::Dna)
    }
    pub fn rna() -> Alphabet {
        Alphabet::new(AlphabetType::Rna)
    }
    pub fn amino() -> Alphabet {
        Alphabet::new(AlphabetType::Amino)
    }
    ///
    /// Custom alphabet from a symbol string of `Kp` symbols whose first `k` are
    /// canonical. Requires `Kp >= K + 4` (gap, any, nonresidue, missing).
    /// The only degenerate code is "any" at `Kp-3`.
    ///
    pub fn custom(symbols: &[u8], k: usize) -> Result<Alphabet> {
        let kp = symbols.len();
        if k == 0 || kp < k + 4 || kp > ILLEGAL as usize {
            return Err(Error::invalid(format!(
                "custom alphabet needs Kp >= K+4 (K={} Kp={})",
                k, kp
            )));
        }
        if !symbols.is_ascii() {
            return Err(Error::invalid("custom alphabet symbols must be ascii"));
        }
        let mut abc = Alphabet::empty(AlphabetType::Custom, symbols, k);
        abc.set_degeneracy(symbols[kp - 3], symbols[0..k].to_vec());
        abc.fill_inmap();
        Ok(abc)
    }
    fn empty(kind: AlphabetType, symbols: &[u8], k: usize) -> Alphabet {
        let kp = symbols.len();
        let mut degen = vec![vec![false; k]; kp];
        for (x, row) in degen.iter_mut().enumerate().take(k) {
            row[x] = true;
        }
        Alphabet {
            kind,
            symbols: symbols.to_vec(),
            k,
            inmap: [ILLEGAL; 128],
            degen,
        }
    }
    fn build_nucleic(kind: AlphabetType) -> Alphabet {
        let (symbols, t): (&[u8], u8) = match kind {
            AlphabetType::Rna => (b"ACGU-RYMKSWHBVDN*~", b'U'),
            _ => (b"ACGT-RYMKSWHBVDN*~", b'T'),
        };
        let mut abc = Alphabet::empty(kind, symbols, 4);
        for (c, set) in [
            (b'R', vec![b'A', b'G']),
            (b'Y', vec![b'C', t]),
            (b'M', vec![b'A', b'C']),
            (b'K', vec![b'G', t]),
            (b'S', vec![b'C', b'G']),
            (b'W', vec![b'A', t]),
            (b'H', vec![b'A', b'C', t]),
            (b'B', vec![b'C', b'G', t]),
            (b'V', vec![b'A', b'C', b'G']),
            (b'D', vec![b'A', b'G', t]),
            (b'N', vec![b'A', b'C', b'G', t]),
        ] {
            abc.set_degeneracy(c, set);
        }
        abc.fill_inmap();
        // synonyms
        let n = abc.inmap[b'N' as usize];
        let tc = abc.inmap[t as usize];
        for (c, code) in [(b'X', n), (if t == b'T' { b'U' } else { b'T' }, tc)] {
            abc.inmap[c as usize] = code;
            abc.inmap[c.to_ascii_lowercase() as usize] = code;
        }
        abc
    }
    fn build_amino() -> Alphabet {
        let symbols = b"ACDEFGHIKLMNPQRSTVWY-BJZOUX*~";
        let mut abc = Alphabet::empty(AlphabetType::Amino, symbols, 20);
        abc.set_degeneracy(b'B', vec![b'N', b'D']);
        abc.set_degeneracy(b'J', vec![b'I', b'L']);
        abc.set_degeneracy(b'Z', vec![b'Q', b'E']);
        abc.set_degeneracy(b'O', vec![b'K']);
        abc.set_degeneracy(b'U', vec![b'C']);
        abc.set_degeneracy(b'X', symbols[0..20].to_vec());
        abc.fill_inmap();
        abc
    }
    /// Register `symbol` as degenerate over the canonical `members`.
    fn set_degeneracy(&mut self, symbol: u8, members: Vec<u8>) {
        let code = self
            .symbols
            .iter()
            .position(|&s| s == symbol)
            .expect("degenerate symbol not in alphabet");
        for m in members {
            let x = self.symbols[0..self.k]
                .iter()
                .position(|&s| s == m)
                .expect("degeneracy member not canonical");
            self.degen[code][x] = true;
        }
    }
    fn fill_inmap(&mut self) {
        for (code, &s) in self.symbols.iter().enumerate() {
            self.inmap[s as usize] = code as u8;
            if s.is_ascii_alphabetic() {
                self.inmap[s.to_ascii_lowercase() as usize] = code as u8;
            }
        }
        let gap = self.k as u8;
        self.inmap[b'.' as usize] = gap;
        self.inmap[b'_' as usize] = gap;
    }
    pub fn kind(&self) -> AlphabetType {
        self.kind
    }
    /// number of canonical residues
    pub fn k(&self) -> usize {
        self.k
    }
    /// total number of codes
    pub fn kp(&self) -> usize {
        self.symbols.len()
    }
    pub fn gap(&self) -> u8 {
        self.k as u8
    }
    pub fn any(&self) -> u8 {
        (self.kp() - 3) as u8
    }
    pub fn nonresidue(&self) -> u8 {
        (self.kp() - 2) as u8
    }
    pub fn missing(&self) -> u8 {
        (self.kp() - 1) as u8
    }
    ///
    /// symbol of the code. Sentinels and unknown codes are shown as `?`
    ///
    pub fn symbol(&self, code: u8) -> u8 {
        self.symbols.get(code as usize).copied().unwrap_or(b'?')
    }
    /// code of the ascii symbol, if any
    pub fn code(&self, symbol: u8) -> Option<u8> {
        if symbol.is_ascii() {
            match self.inmap[symbol as usize] {
                ILLEGAL => None,
                code => Some(code),
            }
        } else {
            None
        }
    }
    pub fn is_canonical(&self, code: u8) -> bool {
        (code as usize) < self.k
    }
    pub fn is_gap(&self, code: u8) -> bool {
        code as usize == self.k
    }
    pub fn is_degenerate(&self, code: u8) -> bool {
        let c = code as usize;
        c > self.k && c <= self.kp() - 3
    }
    pub fn is_residue(&self, code: u8) -> bool {
        self.is_canonical(code) || self.is_degenerate(code)
    }
    pub fn is_nonresidue(&self, code: u8) -> bool {
        code == self.nonresidue()
    }
    pub fn is_missing(&self, code: u8) -> bool {
        code == self.missing()
    }
    ///
    /// canonical residues included in the code
    ///
    pub fn degeneracy(&self, code: u8) -> impl Iterator<Item = u8> + '_ {
        self.degen
            .get(code as usize)
            .into_iter()
            .flat_map(|row| row.iter().enumerate())
            .filter(|(_, &b)| b)
            .map(|(x, _)| x as u8)
    }
    /// number of canonical residues included in the code
    pub fn ndegen(&self, code: u8) -> usize {
        self.degeneracy(code).count()
    }
    ///
    /// Digitize the text into codes `1..=L` with sentinels at `0` and `L+1`.
    ///
    pub fn digitize(&self, text: &[u8]) -> Result<DigitalSequence> {
        let mut codes = Vec::with_capacity(text.len() + 2);
        codes.push(SENTINEL);
        for (i, &c) in text.iter().enumerate() {
            match self.code(c) {
                Some(code) => codes.push(code),
                None => {
                    return Err(Error::invalid(format!(
                        "invalid character {:?} at position {}",
                        c as char, i
                    )))
                }
            }
        }
        codes.push(SENTINEL);
        Ok(DigitalSequence { codes })
    }
    ///
    /// Convert the codes back into text
    ///
    pub fn textize(&self, dsq: &DigitalSequence) -> String {
        dsq.residues()
            .iter()
            .map(|&c| self.symbol(c) as char)
            .collect()
    }
}

///
/// Digitized sequence `x[0..=L+1]`. `x[0]` and `x[L+1]` are `SENTINEL`.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalSequence {
    codes: Vec<u8>,
}

impl DigitalSequence {
    ///
    /// From raw codes `x[1..=L]` without sentinels
    ///
    pub fn from_codes(residues: &[u8]) -> DigitalSequence {
        let mut codes = Vec::with_capacity(residues.len() + 2);
        codes.push(SENTINEL);
        codes.extend_from_slice(residues);
        codes.push(SENTINEL);
        DigitalSequence { codes }
    }
    /// sequence length L
    pub fn len(&self) -> usize {
        self.codes.len() - 2
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// codes of positions `1..=L`
    pub fn residues(&self) -> &[u8] {
        &self.codes[1..self.codes.len() - 1]
    }
    /// codes including both sentinels
    pub fn as_slice(&self) -> &[u8] {
        &self.codes
    }
}

impl std::ops::Index<usize> for DigitalSequence {
    type Output = u8;
    fn index(&self, i: usize) -> &u8 {
        &self.codes[i]
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(AlphabetType::Dna, 4, 18 ; "dna")]
    #[test_case(AlphabetType::Rna, 4, 18 ; "rna")]
    #[test_case(AlphabetType::Amino, 20, 29 ; "amino")]
    fn alphabet_sizes(kind: AlphabetType, k: usize, kp: usize) {
        let abc = Alphabet::new(kind);
        assert_eq!(abc.k(), k);
        assert_eq!(abc.kp(), kp);
        assert!(abc.is_gap(abc.gap()));
        assert!(abc.is_degenerate(abc.any()));
        assert!(!abc.is_residue(abc.nonresidue()));
        assert_eq!(abc.ndegen(abc.any()), k);
    }
    #[test]
    fn dna_digitize() {
        let abc = Alphabet::dna();
        let dsq = abc.digitize(b"ACgtNrx.").unwrap();
        assert_eq!(dsq.len(), 8);
        assert_eq!(dsq[0], SENTINEL);
        assert_eq!(dsq[9], SENTINEL);
        assert_eq!(dsq.residues(), &[0, 1, 2, 3, 15, 5, 15, 4]);
        assert_eq!(abc.textize(&dsq), "ACGTNRN-");
        let r: Vec<u8> = abc.degeneracy(5).collect();
        assert_eq!(r, vec![0, 2]);
        assert!(abc.digitize(b"AC1").is_err());
        // U is a synonym of T
        assert_eq!(abc.code(b'U'), Some(3));
    }
    #[test]
    fn amino_degeneracy() {
        let abc = Alphabet::amino();
        let b = abc.code(b'B').unwrap();
        let nd: Vec<u8> = abc.degeneracy(b).collect();
        assert_eq!(nd, vec![abc.code(b'D').unwrap(), abc.code(b'N').unwrap()]);
        assert_eq!(abc.any(), abc.code(b'X').unwrap());
        assert!(abc.is_missing(abc.code(b'~').unwrap()));
    }
    #[test]
    fn custom_alphabet() {
        let abc = Alphabet::custom(b"AB-X*~", 2).unwrap();
        assert_eq!(abc.k(), 2);
        assert_eq!(abc.any(), 3);
        assert_eq!(abc.ndegen(3), 2);
        let dsq = abc.digitize(b"abBA").unwrap();
        assert_eq!(dsq.residues(), &[0, 1, 1, 0]);
        assert!(Alphabet::custom(b"AB-*~", 2).is_err());

        // serde roundtrip rebuilds the lookup tables
        let json = serde_json::to_string(&abc).unwrap();
        let abc2: Alphabet = serde_json::from_str(&json).unwrap();
        assert_eq!(abc, abc2);
    }
    #[test]
    fn empty_sequence() {
        let dsq = DigitalSequence::from_codes(&[]);
        assert!(dsq.is_empty());
        assert_eq!(dsq.as_slice(), &[SENTINEL, SENTINEL]);
    }
}
