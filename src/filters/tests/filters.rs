use alphabet::{Alphabet, Background, DigitalSeq};
use filters::{backward_filter, forward_filter, msv_filter, ssv_filter, viterbi_filter};
use profile::{
    emit_sequence, sample_model, FilterMatrix, GenericProfile, Mode, OptimizedProfile, SimdWidth,
};
use reference::{reference_forward, reference_viterbi, RefMatrix};

fn fixture(m: usize, seed: u64) -> (profile::CoreModel, Background, GenericProfile) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let hmm = sample_model(Alphabet::Dna, m, &mut rng);
    let bg = Background::new(Alphabet::Dna);
    let gp = GenericProfile::config(&hmm, &bg, Mode::Local, 500).unwrap();
    (hmm, bg, gp)
}

fn om_for(gp: &GenericProfile, l: usize, width: SimdWidth) -> OptimizedProfile {
    let mut gp = gp.clone();
    gp.set_length(l);
    OptimizedProfile::build(&gp, width).unwrap()
}

#[test]
fn integer_filters_are_width_invariant() {
    let (_, _, gp) = fixture(145, 0);
    let mut rng = fastrand::Rng::with_seed(0);
    for _ in 0..10 {
        let dsq = DigitalSeq::random(Alphabet::Dna, 200, &mut rng);
        let mut scores_msv = Vec::new();
        let mut scores_ssv = Vec::new();
        let mut scores_vf = Vec::new();
        for width in [SimdWidth::W16, SimdWidth::W32, SimdWidth::W64] {
            let om = om_for(&gp, dsq.len(), width);
            let mut fx = FilterMatrix::new();
            scores_msv.push(msv_filter(&dsq, &om, &mut fx).to_bits());
            scores_ssv.push(ssv_filter(&dsq, &om, &mut fx).to_bits());
            scores_vf.push(viterbi_filter(&dsq, &om, &mut fx).to_bits());
        }
        assert!(scores_msv.windows(2).all(|w| w[0] == w[1]), "MSV: {scores_msv:?}");
        assert!(scores_ssv.windows(2).all(|w| w[0] == w[1]), "SSV: {scores_ssv:?}");
        assert!(scores_vf.windows(2).all(|w| w[0] == w[1]), "VF: {scores_vf:?}");
    }
}

#[test]
fn viterbi_filter_tracks_the_reference() {
    let (_, _, gp) = fixture(60, 1);
    let mut rng = fastrand::Rng::with_seed(1);
    for _ in 0..10 {
        let dsq = DigitalSeq::random(Alphabet::Dna, 120, &mut rng);
        let om = om_for(&gp, dsq.len(), SimdWidth::W16);
        let mut fx = FilterMatrix::new();
        let vf = viterbi_filter(&dsq, &om, &mut fx);

        let mut gpl = gp.clone();
        gpl.set_length(dsq.len());
        let mut mx = RefMatrix::new(gp.m, dsq.len());
        let want = reference_viterbi(&dsq, &gpl, &mut mx);
        assert!(
            (vf - want).abs() < 1.0,
            "VF {vf} strayed from reference {want}"
        );
    }
}

#[test]
fn viterbi_filter_small_models_stay_close() {
    // The DD bound degenerates below M=4; make sure the lazy-F shortcut
    // does not wreck tiny models.
    for m in [1, 2, 3, 4, 5] {
        let (_, _, gp) = fixture(m, 17 + m as u64);
        let mut rng = fastrand::Rng::with_seed(m as u64);
        let dsq = DigitalSeq::random(Alphabet::Dna, 50, &mut rng);
        let om = om_for(&gp, dsq.len(), SimdWidth::W16);
        let mut fx = FilterMatrix::new();
        let vf = viterbi_filter(&dsq, &om, &mut fx);

        let mut gpl = gp.clone();
        gpl.set_length(dsq.len());
        let mut mx = RefMatrix::new(m, dsq.len());
        let want = reference_viterbi(&dsq, &gpl, &mut mx);
        assert!(vf <= want + 0.5, "M={m}: VF {vf} above reference {want}");
        assert!(vf >= want - 1.5, "M={m}: VF {vf} far below reference {want}");
    }
}

#[test]
fn forward_filter_matches_reference_forward() {
    let (_, _, gp) = fixture(40, 2);
    let mut rng = fastrand::Rng::with_seed(2);
    for _ in 0..8 {
        let dsq = DigitalSeq::random(Alphabet::Dna, 100, &mut rng);
        let om = om_for(&gp, dsq.len(), SimdWidth::W16);
        let mut fx = FilterMatrix::new();
        let ff = forward_filter(&dsq, &om, &mut fx);

        let mut gpl = gp.clone();
        gpl.set_length(dsq.len());
        let mut mx = RefMatrix::new(gp.m, dsq.len());
        let want = reference_forward(&dsq, &gpl, &mut mx);
        assert!(
            (ff - want).abs() < 0.1,
            "forward filter {ff} != reference {want}"
        );
    }
}

#[test]
fn planted_hits_outscore_random_sequences() {
    let (hmm, bg, gp) = fixture(50, 3);
    let mut rng = fastrand::Rng::with_seed(3);
    let (hit, _) = emit_sequence(&hmm, &bg, Mode::Local, 60, &mut rng);
    let random = DigitalSeq::random(Alphabet::Dna, hit.len().max(30), &mut rng);

    let mut fx = FilterMatrix::new();
    let om_hit = om_for(&gp, hit.len(), SimdWidth::W16);
    let om_rand = om_for(&gp, random.len(), SimdWidth::W16);

    let msv_hit = msv_filter(&hit, &om_hit, &mut fx);
    let msv_rand = msv_filter(&random, &om_rand, &mut fx);
    assert!(msv_hit > msv_rand, "MSV: hit {msv_hit} <= random {msv_rand}");

    let ssv_hit = ssv_filter(&hit, &om_hit, &mut fx);
    let ssv_rand = ssv_filter(&random, &om_rand, &mut fx);
    assert!(ssv_hit > ssv_rand, "SSV: hit {ssv_hit} <= random {ssv_rand}");
}

#[test]
fn byte_saturation_reports_pass() {
    // A long run of pure consensus racks up diagonal score until the byte
    // accumulator tops out.
    let (hmm, _, gp) = fixture(80, 4);
    let consensus: Vec<u8> = (1..=hmm.m)
        .map(|k| {
            hmm.mat[k]
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(x, _)| x as u8)
                .unwrap()
        })
        .collect();
    let dsq = DigitalSeq::from_indices(Alphabet::Dna, &consensus).unwrap();
    let om = om_for(&gp, dsq.len(), SimdWidth::W16);
    let mut fx = FilterMatrix::new();
    let msv = msv_filter(&dsq, &om, &mut fx);
    assert!(
        msv.is_infinite() || msv > 5.0,
        "consensus sequence should saturate or at least score high, got {msv}"
    );
}

#[test]
fn mask_grows_as_tau_shrinks() {
    let (hmm, bg, gp) = fixture(40, 5);
    let mut rng = fastrand::Rng::with_seed(5);
    let (dsq, _) = emit_sequence(&hmm, &bg, Mode::Local, 80, &mut rng);
    let om = om_for(&gp, dsq.len(), SimdWidth::W16);

    let mut fx = FilterMatrix::new();
    let fwd = forward_filter(&dsq, &om, &mut fx);
    let loose = backward_filter(&dsq, &om, &mut fx, fwd, 1e-5);
    let fwd2 = forward_filter(&dsq, &om, &mut fx);
    let tight = backward_filter(&dsq, &om, &mut fx, fwd2, 1e-2);

    assert!(loose.n_cells() >= tight.n_cells());
    assert!(loose.is_superset_of(&tight));
}

#[test]
fn mask_covers_the_planted_domain() {
    let (hmm, bg, gp) = fixture(30, 6);
    let mut rng = fastrand::Rng::with_seed(6);
    let (dsq, path) = emit_sequence(&hmm, &bg, Mode::Local, 40, &mut rng);
    let om = om_for(&gp, dsq.len(), SimdWidth::W16);

    let mut fx = FilterMatrix::new();
    let fwd = forward_filter(&dsq, &om, &mut fx);
    let mask = backward_filter(&dsq, &om, &mut fx, fwd, 1e-4);

    // Most of the generating path's match cells should survive decoding.
    let match_steps: Vec<_> = path
        .steps()
        .iter()
        .filter(|s| s.st.is_match())
        .collect();
    let covered = match_steps
        .iter()
        .filter(|s| mask.contains(s.i, s.k))
        .count();
    assert!(
        covered * 2 >= match_steps.len(),
        "only {covered}/{} generating match cells retained",
        match_steps.len()
    );
}

#[test]
fn empty_and_tiny_sequences_are_safe() {
    let (_, _, gp) = fixture(10, 7);
    let empty = DigitalSeq::from_text(Alphabet::Dna, "").unwrap();
    let one = DigitalSeq::from_text(Alphabet::Dna, "A").unwrap();
    let om0 = om_for(&gp, 0, SimdWidth::W16);
    let om1 = om_for(&gp, 1, SimdWidth::W16);
    let mut fx = FilterMatrix::new();

    assert!(msv_filter(&empty, &om0, &mut fx).is_finite());
    assert!(ssv_filter(&empty, &om0, &mut fx).is_finite());
    assert!(viterbi_filter(&empty, &om0, &mut fx).is_finite() || viterbi_filter(&empty, &om0, &mut fx) == f32::NEG_INFINITY);

    let fwd = forward_filter(&one, &om1, &mut fx);
    let mask = backward_filter(&one, &om1, &mut fx, fwd, 1e-4);
    assert!(mask.l() == 1);
    assert!(mask.segments().len() <= 1);
}
