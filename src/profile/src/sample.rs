use alphabet::{Alphabet, Background, DigitalSeq};
use log::trace;

use crate::gp::Mode;
use crate::model::{t, CoreModel, N_CORE_TRANSITIONS};
use crate::trace::{Trace, TraceState};

/// Sample a random but well-formed core model of length `m`.
///
/// Match emissions are peaked on a per-node consensus residue so that
/// sequences emitted from the model score well above background; transition
/// distributions favor match-to-match, the shape calibration runs see in
/// real families.
pub fn sample_model(abc: Alphabet, m: usize, rng: &mut fastrand::Rng) -> CoreModel {
    let k_can = abc.k();
    let mut mat = vec![vec![0.0_f32; k_can]];
    let mut tvec: Vec<[f32; N_CORE_TRANSITIONS]> = Vec::with_capacity(m + 1);

    // Node 0: begin boundary. No insert state; mostly B->M1.
    tvec.push(normalized([0.97 + 0.02 * rng.f32(), 0.0, 0.03, 1.0, 0.0, 1.0, 0.0]));

    for _ in 1..=m {
        let consensus = rng.usize(0..k_can);
        let peak = 0.70 + 0.25 * rng.f32();
        let mut emis = vec![0.0_f32; k_can];
        let mut rest = 0.0;
        for (x, e) in emis.iter_mut().enumerate() {
            if x != consensus {
                *e = -rng.f32().max(1e-6).ln();
                rest += *e;
            }
        }
        for (x, e) in emis.iter_mut().enumerate() {
            *e = if x == consensus { peak } else { *e * (1.0 - peak) / rest };
        }
        mat.push(emis);

        tvec.push(normalized([
            0.85 + 0.10 * rng.f32(), // MM
            0.02 + 0.03 * rng.f32(), // MI
            0.02 + 0.03 * rng.f32(), // MD
            0.70 + 0.20 * rng.f32(), // IM
            0.10 + 0.20 * rng.f32(), // II
            0.70 + 0.20 * rng.f32(), // DM
            0.10 + 0.20 * rng.f32(), // DD
        ]));
    }

    // Node m is forced to exit.
    tvec[m] = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0];

    CoreModel { alphabet: abc, m, mat, t: tvec }
}

/// Renormalize the three per-state transition groups {MM,MI,MD}, {IM,II},
/// {DM,DD} of a raw draw.
fn normalized(raw: [f32; N_CORE_TRANSITIONS]) -> [f32; N_CORE_TRANSITIONS] {
    let mut out = raw;
    let sm = out[t::MM] + out[t::MI] + out[t::MD];
    let si = out[t::IM] + out[t::II];
    let sd = out[t::DM] + out[t::DD];
    out[t::MM] /= sm;
    out[t::MI] /= sm;
    out[t::MD] /= sm;
    out[t::IM] /= si;
    out[t::II] /= si;
    out[t::DM] /= sd;
    out[t::DD] /= sd;
    out
}

/// Emit a target sequence (and the path that generated it) from a core
/// model under the given alignment mode, with the N/J/C length model tuned
/// to an expected flanking length of `expected_l`.
///
/// Multihit: after each domain a coin decides between another pass (J) and
/// the exit (C). Glocal domains enter at node 1 (possibly through deletes);
/// local domains enter at a uniformly chosen node and may leave from any
/// match. Domains that would emit nothing are resampled.
pub fn emit_sequence(
    hmm       : &CoreModel,
    bg        : &Background,
    mode      : Mode,
    expected_l: usize,
    rng       : &mut fastrand::Rng,
) -> (DigitalSeq, Trace) {
    let ploop = expected_l as f32 / (expected_l as f32 + 3.0);
    let mut residues: Vec<u8> = Vec::with_capacity(expected_l + hmm.m);
    let mut tr = Trace::new();

    tr.push(TraceState::S, 0, 0);
    tr.push(TraceState::N, 0, 0);
    while rng.f32() < ploop {
        residues.push(sample_from(bg.freqs(), rng));
        tr.push(TraceState::N, 0, residues.len());
    }

    loop {
        tr.push(TraceState::B, 0, 0);
        let glocal = match mode {
            Mode::Local  => false,
            Mode::Glocal => true,
            Mode::Dual   => rng.bool(),
        };
        emit_domain(hmm, bg, glocal, rng, &mut residues, &mut tr);
        tr.push(TraceState::E, 0, 0);

        if rng.bool() {
            // E -> J: another domain, after a J-flank.
            tr.push(TraceState::J, 0, 0);
            while rng.f32() < ploop {
                residues.push(sample_from(bg.freqs(), rng));
                tr.push(TraceState::J, 0, residues.len());
            }
        } else {
            break;
        }
    }

    tr.push(TraceState::C, 0, 0);
    while rng.f32() < ploop {
        residues.push(sample_from(bg.freqs(), rng));
        tr.push(TraceState::C, 0, residues.len());
    }
    tr.push(TraceState::T, 0, 0);

    trace!("emitted L={} residues over {} trace steps", residues.len(), tr.len());
    let dsq = DigitalSeq::from_indices(hmm.alphabet, &residues)
        .expect("emitter produced out-of-alphabet residues");
    (dsq, tr)
}

/// Emit one domain. Retries until at least one residue is emitted, so the
/// enclosing trace never carries an empty domain.
fn emit_domain(
    hmm     : &CoreModel,
    bg      : &Background,
    glocal  : bool,
    rng     : &mut fastrand::Rng,
    residues: &mut Vec<u8>,
    tr      : &mut Trace,
) {
    let (m_st, i_st, d_st) = if glocal {
        (TraceState::MG, TraceState::IG, TraceState::DG)
    } else {
        (TraceState::ML, TraceState::IL, TraceState::DL)
    };

    loop {
        let checkpoint_res = residues.len();
        let checkpoint_tr = tr.len();
        let mut emitted = false;

        if glocal {
            tr.push(TraceState::G, 0, 0);
            // Enter at node 1, through the B->D1 wing when the draw says so.
            let mut k = 1;
            let mut state = if rng.f32() < hmm.t[0][t::MM] { m_st } else { d_st };
            loop {
                match state {
                    st if st == m_st => {
                        residues.push(sample_from(&hmm.mat[k], rng));
                        emitted = true;
                        tr.push(m_st, k, residues.len());
                        if k == hmm.m {
                            break;
                        }
                        let draw = rng.f32();
                        if draw < hmm.t[k][t::MM] {
                            k += 1;
                        } else if draw < hmm.t[k][t::MM] + hmm.t[k][t::MI] {
                            state = i_st;
                        } else {
                            k += 1;
                            state = d_st;
                        }
                    }
                    st if st == i_st => {
                        residues.push(sample_from(bg.freqs(), rng));
                        tr.push(i_st, k, residues.len());
                        if rng.f32() < hmm.t[k][t::IM] {
                            k += 1;
                            state = m_st;
                        }
                    }
                    _ => {
                        tr.push(d_st, k, 0);
                        if k == hmm.m {
                            break;
                        }
                        if rng.f32() < hmm.t[k][t::DM] {
                            state = m_st;
                        }
                        k += 1;
                    }
                }
            }
        } else {
            tr.push(TraceState::L, 0, 0);
            let mut k = rng.usize(1..=hmm.m);
            let mut state = m_st;
            loop {
                match state {
                    st if st == m_st => {
                        residues.push(sample_from(&hmm.mat[k], rng));
                        emitted = true;
                        tr.push(m_st, k, residues.len());
                        // Leave locally with a geometric tail, or at node M.
                        if k == hmm.m || rng.f32() < 0.15 {
                            break;
                        }
                        let draw = rng.f32();
                        if draw < hmm.t[k][t::MM] {
                            k += 1;
                        } else if draw < hmm.t[k][t::MM] + hmm.t[k][t::MI] {
                            state = i_st;
                        } else {
                            k += 1;
                            state = d_st;
                        }
                    }
                    st if st == i_st => {
                        residues.push(sample_from(bg.freqs(), rng));
                        tr.push(i_st, k, residues.len());
                        if rng.f32() < hmm.t[k][t::IM] {
                            k += 1;
                            state = m_st;
                        }
                    }
                    _ => {
                        tr.push(d_st, k, 0);
                        if k == hmm.m {
                            break; // dead end on a delete; domain resampled below
                        }
                        if rng.f32() < hmm.t[k][t::DM] {
                            state = m_st;
                        }
                        k += 1;
                    }
                }
            }
            // A local domain must both start and end on a match.
            if tr.step(tr.len() - 1).st != m_st {
                emitted = false;
            }
        }

        if emitted {
            return;
        }
        residues.truncate(checkpoint_res);
        truncate_trace(tr, checkpoint_tr);
    }
}

fn truncate_trace(tr: &mut Trace, len: usize) {
    while tr.len() > len {
        tr.pop();
    }
}

fn sample_from(probs: &[f32], rng: &mut fastrand::Rng) -> u8 {
    let mut draw = rng.f32();
    for (x, &p) in probs.iter().enumerate() {
        draw -= p;
        if draw <= 0.0 {
            return x as u8;
        }
    }
    (probs.len() - 1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::GenericProfile;

    #[test]
    fn emitted_traces_validate() {
        let mut rng = fastrand::Rng::with_seed(0);
        let hmm = sample_model(Alphabet::Dna, 20, &mut rng);
        let bg = Background::new(Alphabet::Dna);
        for mode in [Mode::Local, Mode::Glocal, Mode::Dual] {
            for _ in 0..25 {
                let (dsq, tr) = emit_sequence(&hmm, &bg, mode, 50, &mut rng);
                let mut gp = GenericProfile::config(&hmm, &bg, mode, 500).unwrap();
                gp.set_length(dsq.len());
                tr.validate(&gp, &dsq).unwrap_or_else(|e| panic!("{mode}: {e}"));
                assert!(!tr.index_domains().is_empty());
            }
        }
    }

    #[test]
    fn local_domains_start_and_end_on_match() {
        let mut rng = fastrand::Rng::with_seed(1);
        let hmm = sample_model(Alphabet::Amino, 12, &mut rng);
        let bg = Background::new(Alphabet::Amino);
        for _ in 0..25 {
            let (_, tr) = emit_sequence(&hmm, &bg, Mode::Local, 30, &mut rng);
            let steps = tr.steps();
            for (z, step) in steps.iter().enumerate() {
                if step.st == TraceState::L {
                    assert_eq!(steps[z + 1].st, TraceState::ML);
                }
                if step.st == TraceState::E {
                    assert_eq!(steps[z - 1].st, TraceState::ML);
                }
            }
        }
    }

    #[test]
    fn emission_is_seed_reproducible() {
        let hmm = {
            let mut rng = fastrand::Rng::with_seed(9);
            sample_model(Alphabet::Dna, 15, &mut rng)
        };
        let bg = Background::new(Alphabet::Dna);
        let mut rng_a = fastrand::Rng::with_seed(123);
        let mut rng_b = fastrand::Rng::with_seed(123);
        let (a, _) = emit_sequence(&hmm, &bg, Mode::Dual, 40, &mut rng_a);
        let (b, _) = emit_sequence(&hmm, &bg, Mode::Dual, 40, &mut rng_b);
        assert_eq!(a, b);
    }
}
