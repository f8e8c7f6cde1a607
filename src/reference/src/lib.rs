pub mod matrix;
pub use matrix::RefMatrix;

mod viterbi;
pub use viterbi::{reference_viterbi, reference_viterbi_trace};

mod forward;
pub use forward::reference_forward;

mod backward;
pub use backward::reference_backward;

#[cfg(test)]
mod tests {
    use super::*;
    use alphabet::{Alphabet, Background, DigitalSeq};
    use profile::{emit_sequence, sample_model, GenericProfile, Mode};

    fn profile(m: usize, seed: u64, abc: Alphabet) -> (profile::CoreModel, Background, GenericProfile) {
        let mut rng = fastrand::Rng::with_seed(seed);
        let hmm = sample_model(abc, m, &mut rng);
        let bg = Background::new(abc);
        let gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 500).unwrap();
        (hmm, bg, gp)
    }

    #[test]
    fn viterbi_score_equals_trace_score() {
        let (_, _, mut gp) = profile(25, 0, Alphabet::Dna);
        let mut rng = fastrand::Rng::with_seed(0);
        for _ in 0..20 {
            let dsq = DigitalSeq::random(Alphabet::Dna, 60, &mut rng);
            gp.set_length(dsq.len());
            let mut mx = RefMatrix::new(gp.m, dsq.len());
            let vsc = reference_viterbi(&dsq, &gp, &mut mx);
            let tr = reference_viterbi_trace(&gp, &mx);
            tr.validate(&gp, &dsq).unwrap();
            let tsc = tr.score(&gp, &dsq).unwrap();
            assert!((vsc - tsc).abs() < 1e-3, "viterbi {vsc} != trace {tsc}");
        }
    }

    #[test]
    fn generated_paths_never_beat_the_optimum() {
        let (hmm, bg, _) = profile(20, 1, Alphabet::Dna);
        let mut rng = fastrand::Rng::with_seed(1);
        for mode in [Mode::Glocal, Mode::Dual] {
            for _ in 0..15 {
                let (dsq, path) = emit_sequence(&hmm, &bg, mode, 50, &mut rng);
                let mut gp = GenericProfile::config(&hmm, &bg, mode, 500).unwrap();
                gp.set_length(dsq.len());
                let mut mx = RefMatrix::new(gp.m, dsq.len());
                let vsc = reference_viterbi(&dsq, &gp, &mut mx);
                let psc = path.score(&gp, &dsq).unwrap();
                assert!(
                    psc <= vsc + 1e-3,
                    "{mode}: generated path scores {psc} above optimum {vsc}"
                );
            }
        }
    }

    #[test]
    fn forward_dominates_viterbi_and_matches_backward() {
        let (_, _, mut gp) = profile(18, 2, Alphabet::Amino);
        let mut rng = fastrand::Rng::with_seed(2);
        for _ in 0..10 {
            let dsq = DigitalSeq::random(Alphabet::Amino, 40, &mut rng);
            gp.set_length(dsq.len());
            let mut vx = RefMatrix::new(gp.m, dsq.len());
            let mut fx = RefMatrix::new(gp.m, dsq.len());
            let mut bx = RefMatrix::new(gp.m, dsq.len());
            let vsc = reference_viterbi(&dsq, &gp, &mut vx);
            let fsc = reference_forward(&dsq, &gp, &mut fx);
            let bsc = reference_backward(&dsq, &gp, &mut bx);
            assert!(fsc >= vsc - 1e-4, "forward {fsc} below viterbi {vsc}");
            assert!((fsc - bsc).abs() < 0.01, "forward {fsc} != backward {bsc}");
        }
    }

    #[test]
    fn boundary_cases_stay_finite_or_cleanly_impossible() {
        // M=1 model.
        let (_, _, mut gp) = profile(1, 3, Alphabet::Dna);
        let dsq = DigitalSeq::from_text(Alphabet::Dna, "ACGT").unwrap();
        gp.set_length(4);
        let mut mx = RefMatrix::new(1, 4);
        let vsc = reference_viterbi(&dsq, &gp, &mut mx);
        assert!(vsc.is_finite());
        let tr = reference_viterbi_trace(&gp, &mx);
        tr.validate(&gp, &dsq).unwrap();

        // L=0: no residues, no domain, no path.
        let (_, _, mut gp) = profile(5, 3, Alphabet::Dna);
        let empty = DigitalSeq::from_text(Alphabet::Dna, "").unwrap();
        gp.set_length(0);
        let mut mx = RefMatrix::new(5, 0);
        assert_eq!(reference_viterbi(&empty, &gp, &mut mx), f32::NEG_INFINITY);
        assert!(reference_viterbi_trace(&gp, &mx).is_empty());

        // L=1 stays finite.
        let one = DigitalSeq::from_text(Alphabet::Dna, "A").unwrap();
        gp.set_length(1);
        let mut mx = RefMatrix::new(5, 1);
        let sc = reference_viterbi(&one, &gp, &mut mx);
        assert!(sc.is_finite());
    }

    #[test]
    fn degenerate_only_sequences_score_finitely() {
        let (_, _, mut gp) = profile(8, 4, Alphabet::Dna);
        let dsq = DigitalSeq::from_text(Alphabet::Dna, "NNNNNNNN").unwrap();
        gp.set_length(8);
        let mut mx = RefMatrix::new(8, 8);
        assert!(reference_viterbi(&dsq, &gp, &mut mx).is_finite());
        let mut fx = RefMatrix::new(8, 8);
        assert!(reference_forward(&dsq, &gp, &mut fx).is_finite());
    }
}
