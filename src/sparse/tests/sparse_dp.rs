use std::sync::Arc;

use alphabet::{Alphabet, Background, DigitalSeq};
use filters::{backward_filter, forward_filter};
use profile::{
    emit_sequence, sample_model, FilterMatrix, GenericProfile, Mode, OptimizedProfile,
    SimdWidth, SparseMask,
};
use reference::{reference_forward, reference_viterbi, RefMatrix};
use sparse::{
    approx_env_score, expected_domains, mass_trace, sparse_backward, sparse_decoding,
    sparse_env_score, sparse_forward, sparse_viterbi, sparse_viterbi_trace, SparseMatrix,
};

fn fixture(m: usize, seed: u64) -> (profile::CoreModel, Background, GenericProfile) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let hmm = sample_model(Alphabet::Dna, m, &mut rng);
    let bg = Background::new(Alphabet::Dna);
    let gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 500).unwrap();
    (hmm, bg, gp)
}

/// Build the posterior mask the way the pipeline does.
fn build_mask(gp: &GenericProfile, dsq: &DigitalSeq, tau: f32) -> (Arc<SparseMask>, f32) {
    let mut gpl = gp.clone();
    gpl.set_length(dsq.len());
    let om = OptimizedProfile::build(&gpl, SimdWidth::W16).unwrap();
    let mut fx = FilterMatrix::new();
    let fwd = forward_filter(dsq, &om, &mut fx);
    let mask = backward_filter(dsq, &om, &mut fx, fwd, tau);
    (Arc::new(mask), fwd)
}

#[test]
fn full_mask_reproduces_the_reference() {
    let (_, _, mut gp) = fixture(20, 0);
    let mut rng = fastrand::Rng::with_seed(0);
    for _ in 0..10 {
        let dsq = DigitalSeq::random(Alphabet::Dna, 50, &mut rng);
        gp.set_length(dsq.len());
        let mask = Arc::new(SparseMask::full(gp.m, dsq.len()));

        let mut sx = SparseMatrix::new();
        sx.reinit(Arc::clone(&mask));
        let sv = sparse_viterbi(&dsq, &gp, &mut sx);
        let mut mx = RefMatrix::new(gp.m, dsq.len());
        let rv = reference_viterbi(&dsq, &gp, &mut mx);
        assert!((sv - rv).abs() < 1e-3, "sparse viterbi {sv} != reference {rv}");

        let tr = sparse_viterbi_trace(&gp, &sx).unwrap();
        tr.validate(&gp, &dsq).unwrap();
        let tsc = tr.score(&gp, &dsq).unwrap();
        assert!((tsc - sv).abs() < 1e-3, "trace score {tsc} != viterbi {sv}");

        let mut sf = SparseMatrix::new();
        sf.reinit(Arc::clone(&mask));
        let fsc = sparse_forward(&dsq, &gp, &mut sf);
        let mut fxr = RefMatrix::new(gp.m, dsq.len());
        let rf = reference_forward(&dsq, &gp, &mut fxr);
        assert!((fsc - rf).abs() < 0.01, "sparse forward {fsc} != reference {rf}");
    }
}

#[test]
fn forward_equals_backward_over_any_mask() {
    let (hmm, bg, mut gp) = fixture(30, 1);
    let mut rng = fastrand::Rng::with_seed(1);
    for _ in 0..8 {
        let (dsq, _) = emit_sequence(&hmm, &bg, Mode::Dual, 60, &mut rng);
        let (mask, _) = build_mask(&gp, &dsq, 1e-4);
        if mask.n_cells() == 0 {
            continue;
        }
        gp.set_length(dsq.len());
        let mut sf = SparseMatrix::new();
        let mut sb = SparseMatrix::new();
        sf.reinit(Arc::clone(&mask));
        sb.reinit(Arc::clone(&mask));
        let fsc = sparse_forward(&dsq, &gp, &mut sf);
        let bsc = sparse_backward(&dsq, &gp, &mut sb);
        assert!(
            (fsc - bsc).abs() < 1e-3,
            "forward {fsc} != backward {bsc} over {} cells",
            mask.n_cells()
        );
    }
}

#[test]
fn decoding_masses_are_probabilities() {
    let (hmm, bg, mut gp) = fixture(25, 2);
    let mut rng = fastrand::Rng::with_seed(2);
    let (dsq, _) = emit_sequence(&hmm, &bg, Mode::Dual, 50, &mut rng);
    let (mask, _) = build_mask(&gp, &dsq, 1e-4);
    assert!(mask.n_cells() > 0, "planted hit produced an empty mask");

    gp.set_length(dsq.len());
    let mut sf = SparseMatrix::new();
    let mut sb = SparseMatrix::new();
    let mut sd = SparseMatrix::new();
    sf.reinit(Arc::clone(&mask));
    sb.reinit(Arc::clone(&mask));
    sd.reinit(Arc::clone(&mask));
    let fsc = sparse_forward(&dsq, &gp, &mut sf);
    sparse_backward(&dsq, &gp, &mut sb);
    sparse_decoding(&sf, &sb, fsc, &mut sd);

    for i in 1..=dsq.len() {
        let mass = sparse::row_mass(&sd, i);
        assert!((-1e-3..=1.01).contains(&mass), "row {i} emission mass {mass}");
    }
    let ndom = expected_domains(&sd);
    assert!(ndom > 0.2 && ndom < 10.0, "expected domains {ndom}");
}

#[test]
fn envelope_scores_agree_on_a_clean_hit() {
    let (hmm, bg, mut gp) = fixture(25, 3);
    let mut rng = fastrand::Rng::with_seed(3);
    for _ in 0..5 {
        let (dsq, path) = emit_sequence(&hmm, &bg, Mode::Dual, 40, &mut rng);
        let (mask, _) = build_mask(&gp, &dsq, 1e-4);
        if mask.n_cells() == 0 {
            continue;
        }
        gp.set_length(dsq.len());
        let mut sf = SparseMatrix::new();
        let mut sb = SparseMatrix::new();
        let mut sd = SparseMatrix::new();
        sf.reinit(Arc::clone(&mask));
        sb.reinit(Arc::clone(&mask));
        sd.reinit(Arc::clone(&mask));
        let fsc = sparse_forward(&dsq, &gp, &mut sf);
        sparse_backward(&dsq, &gp, &mut sb);
        sparse_decoding(&sf, &sb, fsc, &mut sd);

        let domains = path.index_domains();
        if domains.len() != 1 {
            continue; // only judge the single-domain agreement here
        }
        let d = domains[0];
        let anchor_i = (d.sqfrom + d.sqto) / 2;
        let anchor_k = mask
            .row(anchor_i)
            .first()
            .map(|&k| k as usize)
            .unwrap_or(d.hmmfrom);
        let env = mass_trace(&sd, anchor_i, anchor_k.max(1), 1, dsq.len(), 0.1);
        let approx = approx_env_score(&gp, &sf, &env, dsq.len());
        let exact = sparse_env_score(&dsq, &gp, &mask, &env, dsq.len());
        assert!(
            (approx - exact).abs() < 1.0,
            "envelope scores disagree: approx {approx}, exact {exact} (env {env:?})"
        );
    }
}

#[test]
fn single_row_sequences_stay_finite() {
    let (_, _, mut gp) = fixture(6, 4);
    let dsq = DigitalSeq::from_text(Alphabet::Dna, "A").unwrap();
    gp.set_length(1);
    let mask = Arc::new(SparseMask::full(gp.m, 1));
    let mut sx = SparseMatrix::new();
    sx.reinit(Arc::clone(&mask));
    let sv = sparse_viterbi(&dsq, &gp, &mut sx);
    assert!(sv.is_finite());
    let mut sf = SparseMatrix::new();
    sf.reinit(Arc::clone(&mask));
    let mut sb = SparseMatrix::new();
    sb.reinit(Arc::clone(&mask));
    let f = sparse_forward(&dsq, &gp, &mut sf);
    let b = sparse_backward(&dsq, &gp, &mut sb);
    assert!(f.is_finite() && b.is_finite());
    assert!((f - b).abs() < 1e-3);
}
