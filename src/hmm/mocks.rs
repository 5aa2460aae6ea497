//!
//! Mock HMMs and sequences for testing
//!
use super::model::CoreHmm;
use super::params::HmmParams;
use crate::alphabet::Alphabet;
use crate::common::Sequence;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

///
/// generate random canonical residues of given length from seed
///
pub fn generate(abc: &Alphabet, length: usize, seed: u64) -> Sequence {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..length)
        .map(|_| abc.symbol(rng.gen_range(0..abc.k()) as u8))
        .collect()
}

///
/// Sample linear DNA model (10 nodes) of consensus "ATTCGATCGT"
///
pub fn mock_linear_hmm(param: HmmParams) -> CoreHmm {
    CoreHmm::from_consensus(&Alphabet::dna(), b"ATTCGATCGT", &param)
        .expect("mock consensus is valid")
}

///
/// Create DNA model of random consensus
///
pub fn mock_linear_random_hmm(length: usize, seed: u64, param: HmmParams) -> CoreHmm {
    let abc = Alphabet::dna();
    let consensus = generate(&abc, length, seed);
    CoreHmm::from_consensus(&abc, &consensus, &param).expect("mock consensus is valid")
}

///
/// Random model with random transitions (see `CoreHmm::sample`)
///
pub fn mock_sampled_hmm(abc: &Alphabet, m: usize, seed: u64) -> CoreHmm {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    CoreHmm::sample(abc, m, &mut rng)
}

///
/// 2-node model over the 2-symbol alphabet `AB` with 50/50 match emissions
///
pub fn mock_two_state_hmm() -> CoreHmm {
    let abc = Alphabet::custom(b"AB-X*~", 2).expect("mock alphabet is valid");
    let mut hmm = CoreHmm::from_emissions(
        &abc,
        vec![vec![0.5, 0.5], vec![0.5, 0.5]],
        &HmmParams::default(),
    )
    .expect("mock emissions are valid");
    hmm.set_name("two_state");
    hmm
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Match,
    Ins,
    Del,
}

///
/// Emit a sequence along a random path of the core model from B to E.
/// Insert states emit uniformly over the canonical residues.
///
pub fn sample_homolog(hmm: &CoreHmm, seed: u64) -> Sequence {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let abc = hmm.alphabet();
    let m = hmm.m();
    let mut seq = Vec::new();
    // node 0 Match is the begin state
    let (mut state, mut k) = (State::Match, 0);
    while k <= m {
        // emission
        match state {
            State::Match if k > 0 => {
                let e = hmm.mat(k);
                let x = (0..e.len())
                    .collect::<Vec<_>>()
                    .choose_weighted(&mut rng, |&x| e[x])
                    .map(|&x| x)
                    .unwrap_or(0);
                seq.push(abc.symbol(x as u8));
            }
            State::Ins => seq.push(abc.symbol(rng.gen_range(0..abc.k()) as u8)),
            _ => {}
        }
        if k == m {
            break;
        }
        // transition
        let t = hmm.t(k);
        let r: f64 = rng.gen();
        state = match state {
            State::Match if r < t.mm => State::Match,
            State::Match if r < t.mm + t.mi => State::Ins,
            State::Match => State::Del,
            State::Ins if r < t.im => State::Match,
            State::Ins => State::Ins,
            State::Del if r < t.dm => State::Match,
            State::Del => State::Del,
        };
        if state != State::Ins {
            k += 1;
        }
    }
    seq
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::sequence_to_string;

    #[test]
    fn random_seq() {
        let abc = Alphabet::dna();
        let s = generate(&abc, 50, 0);
        println!("{:?}", sequence_to_string(&s));
        assert_eq!(s.len(), 50);
        assert_eq!(s, generate(&abc, 50, 0));
        assert_ne!(s, generate(&abc, 50, 1));
        assert!(abc.digitize(&s).is_ok());
    }
    #[test]
    fn mocks() {
        let hmm = mock_linear_hmm(HmmParams::default());
        assert_eq!(hmm.m(), 10);
        assert_eq!(hmm.consensus(), "ATTCGATCGT");
        let hmm = mock_linear_random_hmm(40, 3, HmmParams::default());
        assert_eq!(hmm.m(), 40);
        let hmm = mock_two_state_hmm();
        assert_eq!(hmm.m(), 2);
        assert_eq!(hmm.alphabet().k(), 2);
    }
    #[test]
    fn homolog_of_error_free_model() {
        let hmm = mock_linear_hmm(HmmParams::zero_error());
        let s = sample_homolog(&hmm, 0);
        assert_eq!(sequence_to_string(&s), "ATTCGATCGT");
        let hmm = mock_linear_random_hmm(100, 1, HmmParams::mid_error());
        let s = sample_homolog(&hmm, 2);
        println!("{}", sequence_to_string(&s));
        assert!(s.len() > 50 && s.len() < 200);
    }
}
