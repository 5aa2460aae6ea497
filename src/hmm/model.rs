//!
//! CoreHmm: probability parameters of a profile HMM with M nodes
//!
//! ```text
//!        I0    I1    I2          IM-1
//!   B -> M1 -> M2 -> M3 -> ... -> MM -> E
//!        D1    D2    D3          DM
//! ```
//!
//! Node 0 is the begin node: `t[0].mm`, `t[0].mi` and `t[0].md` are the
//! transitions B->M1, B->I0 and B->D1.
//!
use super::params::HmmParams;
use crate::alphabet::Alphabet;
use crate::error::{Error, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

///
/// Transition probabilities out of node k
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTrans {
    pub mm: f64,
    pub mi: f64,
    pub md: f64,
    pub im: f64,
    pub ii: f64,
    pub dm: f64,
    pub dd: f64,
}

impl NodeTrans {
    ///
    /// Transitions of the last node M. Every state leaves to E.
    ///
    pub fn last() -> NodeTrans {
        NodeTrans {
            mm: 1.0,
            mi: 0.0,
            md: 0.0,
            im: 1.0,
            ii: 0.0,
            dm: 1.0,
            dd: 0.0,
        }
    }
    ///
    /// Check that each state's outgoing transitions sum to 1
    ///
    pub fn is_normalized(&self, tol: f64) -> bool {
        ((self.mm + self.mi + self.md) - 1.0).abs() < tol
            && ((self.im + self.ii) - 1.0).abs() < tol
            && ((self.dm + self.dd) - 1.0).abs() < tol
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreHmm {
    name: String,
    abc: Alphabet,
    /// `t[k]` for k = 0..=M
    t: Vec<NodeTrans>,
    /// `mat[k][x]` for k = 1..=M over canonical residues. `mat[0]` is unused.
    mat: Vec<Vec<f64>>,
}

impl CoreHmm {
    ///
    /// Create from the transitions of nodes `0..=M` and the match emissions
    /// of nodes `1..=M`.
    ///
    pub fn from_parts<S: Into<String>>(
        name: S,
        abc: &Alphabet,
        t: Vec<NodeTrans>,
        mat: Vec<Vec<f64>>,
    ) -> Result<CoreHmm> {
        let m = mat.len();
        if m == 0 {
            return Err(Error::invalid("profile HMM needs at least one node"));
        }
        if t.len() != m + 1 {
            return Err(Error::invalid(format!(
                "{} transition rows for a model of {} nodes",
                t.len(),
                m
            )));
        }
        let mut all = Vec::with_capacity(m + 1);
        all.push(vec![0.0; abc.k()]);
        all.extend(mat);
        let hmm = CoreHmm {
            name: name.into(),
            abc: abc.clone(),
            t,
            mat: all,
        };
        hmm.validate(1e-6)?;
        Ok(hmm)
    }
    ///
    /// Model with the given match emissions (nodes `1..=M`) and the
    /// transitions of `param` at every node.
    ///
    pub fn from_emissions(abc: &Alphabet, mat: Vec<Vec<f64>>, param: &HmmParams) -> Result<CoreHmm> {
        let m = mat.len();
        let t = (0..=m)
            .map(|k| {
                if k == 0 {
                    param.begin_trans()
                } else if k == m {
                    NodeTrans::last()
                } else {
                    param.node_trans()
                }
            })
            .collect();
        CoreHmm::from_parts("", abc, t, mat)
    }
    ///
    /// Model emitting the consensus residues with probability `1 - p_mismatch`.
    /// A degenerate consensus residue spreads the match probability over its members.
    ///
    pub fn from_consensus(abc: &Alphabet, consensus: &[u8], param: &HmmParams) -> Result<CoreHmm> {
        let dsq = abc.digitize(consensus)?;
        let k = abc.k();
        let mat = dsq
            .residues()
            .iter()
            .map(|&code| {
                if !abc.is_residue(code) {
                    return Err(Error::invalid(format!(
                        "consensus residue {} is not a residue",
                        abc.symbol(code) as char
                    )));
                }
                let n = abc.ndegen(code);
                let mut e = if n == k {
                    vec![1.0 / k as f64; k]
                } else {
                    vec![param.p_mismatch / (k - n) as f64; k]
                };
                if n < k {
                    for x in abc.degeneracy(code) {
                        e[x as usize] = param.p_match() / n as f64;
                    }
                }
                Ok(e)
            })
            .collect::<Result<Vec<_>>>()?;
        let mut hmm = CoreHmm::from_emissions(abc, mat, param)?;
        hmm.name = String::from_utf8_lossy(consensus).into_owned();
        Ok(hmm)
    }
    ///
    /// Random model of `m` nodes. Match states lean towards a random consensus
    /// residue, and M->M dominates the other transitions.
    ///
    pub fn sample<R: Rng>(abc: &Alphabet, m: usize, rng: &mut R) -> CoreHmm {
        let k = abc.k();
        let mut t = Vec::with_capacity(m + 1);
        for node in 0..=m {
            if node == m {
                t.push(NodeTrans::last());
                continue;
            }
            let w: [f64; 3] = [
                rng.gen_range(2.0..8.0),
                rng.gen_range(0.05..0.5),
                rng.gen_range(0.05..0.5),
            ];
            let z: f64 = w.iter().sum();
            let ii = rng.gen_range(0.05..0.6);
            let dd = if node == 0 { 0.0 } else { rng.gen_range(0.05..0.6) };
            t.push(NodeTrans {
                mm: w[0] / z,
                mi: w[1] / z,
                md: w[2] / z,
                im: 1.0 - ii,
                ii,
                dm: 1.0 - dd,
                dd,
            });
        }
        let mut mat = vec![vec![0.0; k]];
        for _ in 0..m {
            let mut e: Vec<f64> = (0..k).map(|_| rng.gen_range(0.01..1.0)).collect();
            let x = rng.gen_range(0..k);
            e[x] += k as f64;
            let z: f64 = e.iter().sum();
            mat.push(e.into_iter().map(|v| v / z).collect());
        }
        CoreHmm {
            name: format!("sampled{}", m),
            abc: abc.clone(),
            t,
            mat,
        }
    }
    ///
    /// Check the normalization of every node
    ///
    pub fn validate(&self, tol: f64) -> Result<()> {
        for (k, t) in self.t.iter().enumerate() {
            if !t.is_normalized(tol) {
                return Err(Error::invalid(format!(
                    "transitions of node {} are not normalized",
                    k
                )));
            }
        }
        for k in 1..=self.m() {
            let e = &self.mat[k];
            if e.len() != self.abc.k() || e.iter().any(|&v| v < 0.0) {
                return Err(Error::invalid(format!("bad match emissions at node {}", k)));
            }
            let z: f64 = e.iter().sum();
            if (z - 1.0).abs() > tol {
                return Err(Error::invalid(format!(
                    "match emissions of node {} sum to {}",
                    k, z
                )));
            }
        }
        Ok(())
    }
    /// number of nodes
    pub fn m(&self) -> usize {
        self.t.len() - 1
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }
    pub fn alphabet(&self) -> &Alphabet {
        &self.abc
    }
    /// transitions out of node `k` (`0..=M`)
    pub fn t(&self, k: usize) -> &NodeTrans {
        &self.t[k]
    }
    /// match emissions of node `k` (`1..=M`)
    pub fn mat(&self, k: usize) -> &[f64] {
        &self.mat[k]
    }
    ///
    /// Most probable residue of each match state
    ///
    pub fn consensus(&self) -> String {
        (1..=self.m())
            .map(|k| {
                let x = self.mat[k]
                    .iter()
                    .enumerate()
                    .fold((0, f64::MIN), |(bx, bv), (x, &v)| {
                        if v > bv {
                            (x, v)
                        } else {
                            (bx, bv)
                        }
                    })
                    .0;
                self.abc.symbol(x as u8) as char
            })
            .collect()
    }
    ///
    /// Expected number of visits of each match state `occ[k]`, `k = 0..=M`
    /// (`occ[0] = 0`), assuming the model is entered at B.
    ///
    pub fn match_occupancy(&self) -> Vec<f64> {
        let m = self.m();
        let mut occ = vec![0.0; m + 1];
        occ[1] = self.t[0].mi + self.t[0].mm;
        for k in 2..=m {
            let t = &self.t[k - 1];
            occ[k] = occ[k - 1] * (t.mm + t.mi) + (1.0 - occ[k - 1]) * t.dm;
        }
        occ
    }
}

impl std::fmt::Display for CoreHmm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "# name={} M={}", self.name, self.m())?;
        writeln!(f, "k\tMM\tMI\tMD\tIM\tII\tDM\tDD\tmat")?;
        for (k, t) in self.t.iter().enumerate() {
            write!(
                f,
                "{}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t",
                k, t.mm, t.mi, t.md, t.im, t.ii, t.dm, t.dd
            )?;
            let e: Vec<String> = self.mat[k].iter().map(|v| format!("{:.3}", v)).collect();
            writeln!(f, "{}", e.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn hmm_from_consensus() {
        let abc = Alphabet::dna();
        let hmm = CoreHmm::from_consensus(&abc, b"ACGTN", &HmmParams::default()).unwrap();
        println!("{}", hmm);
        assert_eq!(hmm.m(), 5);
        assert_eq!(hmm.consensus(), "ACGTA");
        assert_abs_diff_eq!(hmm.mat(1)[0], 0.99, epsilon = 1e-12);
        assert_abs_diff_eq!(hmm.mat(5)[2], 0.25);
        assert_eq!(hmm.t(5), &NodeTrans::last());
        assert_eq!(hmm.t(0).dm, 1.0);
        assert!(CoreHmm::from_consensus(&abc, b"AC-T", &HmmParams::default()).is_err());
    }
    #[test]
    fn hmm_sample() {
        let abc = Alphabet::amino();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let hmm = CoreHmm::sample(&abc, 30, &mut rng);
        assert_eq!(hmm.m(), 30);
        assert!(hmm.validate(1e-9).is_ok());

        // same seed gives the same model
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        assert_eq!(hmm, CoreHmm::sample(&abc, 30, &mut rng));
    }
    #[test]
    fn hmm_occupancy() {
        let abc = Alphabet::dna();
        let hmm = CoreHmm::from_consensus(&abc, b"ACGT", &HmmParams::zero_error()).unwrap();
        let occ = hmm.match_occupancy();
        // no deletion: every match state is visited
        assert_eq!(occ, vec![0.0, 1.0, 1.0, 1.0, 1.0]);
        let hmm = CoreHmm::from_consensus(&abc, b"ACGT", &HmmParams::high_error()).unwrap();
        let occ = hmm.match_occupancy();
        assert!(occ[1..].iter().all(|&o| o > 0.8 && o <= 1.0));
    }
    #[test]
    fn hmm_bad_parts() {
        let abc = Alphabet::dna();
        let t = vec![NodeTrans::last(); 3];
        assert!(CoreHmm::from_parts("x", &abc, t, vec![vec![0.25; 4]]).is_err());
        let mut t0 = HmmParams::default().begin_trans();
        t0.mm = 0.5;
        assert!(CoreHmm::from_parts("x", &abc, vec![t0, NodeTrans::last()], vec![vec![0.25; 4]]).is_err());
        assert!(CoreHmm::from_parts("x", &abc, vec![], vec![]).is_err());
    }
}
