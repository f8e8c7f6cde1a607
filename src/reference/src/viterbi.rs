use alphabet::DigitalSeq;
use profile::gp::{GenericProfile, Special, Transition, XSC_LOOP, XSC_MOVE};
use profile::trace::{Trace, TraceState};

use crate::matrix::*;

/// Dense dual-mode Viterbi. Fills `mx` and returns the optimal score in
/// nats (`-inf` when no path exists, e.g. L=0 local-only).
pub fn reference_viterbi(dsq: &DigitalSeq, gp: &GenericProfile, mx: &mut RefMatrix) -> f32 {
    use Transition::*;
    let (m, l) = (gp.m, dsq.len());
    debug_assert!(mx.m == m && mx.l == l, "matrix sized ({}, {}) for problem ({m}, {l})", mx.m, mx.l);

    // ---- Row 0: nothing emitted yet; only the N-side specials live.
    mx.set_x(0, XE, f32::NEG_INFINITY);
    mx.set_x(0, XN, 0.0);
    mx.set_x(0, XJ, f32::NEG_INFINITY);
    mx.set_x(0, XB, gp.xsc(Special::N, XSC_MOVE));
    mx.set_x(0, XL, mx.x(0, XB) + gp.xsc(Special::B, XSC_MOVE));
    mx.set_x(0, XG, mx.x(0, XB) + gp.xsc(Special::B, XSC_LOOP));
    mx.set_x(0, XC, f32::NEG_INFINITY);
    for k in 0..=m {
        for s in 0..N_MAIN {
            mx.set(0, k, s, f32::NEG_INFINITY);
        }
    }

    for i in 1..=l {
        let x = dsq[i];
        let mut xe = f32::NEG_INFINITY;
        // Column 0 is a permanent -inf boundary.
        for s in 0..N_MAIN {
            mx.set(i, 0, s, f32::NEG_INFINITY);
        }
        for k in 1..=m {
            let msc = gp.msc(k, x);

            let ml = msc
                + (mx.get(i - 1, k - 1, ML) + gp.tsc(k, MM))
                    .max(mx.get(i - 1, k - 1, IL) + gp.tsc(k, IM))
                    .max(mx.get(i - 1, k - 1, DL) + gp.tsc(k, DM))
                    .max(mx.x(i - 1, XL) + gp.tsc(k, LM));
            let mg = msc
                + (mx.get(i - 1, k - 1, MG) + gp.tsc(k, MM))
                    .max(mx.get(i - 1, k - 1, IG) + gp.tsc(k, IM))
                    .max(mx.get(i - 1, k - 1, DG) + gp.tsc(k, DM))
                    .max(mx.x(i - 1, XG) + gp.tsc(k, GM));
            let il = (mx.get(i - 1, k, ML) + gp.tsc(k, MI))
                .max(mx.get(i - 1, k, IL) + gp.tsc(k, II));
            let ig = (mx.get(i - 1, k, MG) + gp.tsc(k, MI))
                .max(mx.get(i - 1, k, IG) + gp.tsc(k, II));
            let dl = (mx.get(i, k - 1, ML) + gp.tsc(k, MD))
                .max(mx.get(i, k - 1, DL) + gp.tsc(k, DD));
            let dg = (mx.get(i, k - 1, MG) + gp.tsc(k, MD))
                .max(mx.get(i, k - 1, DG) + gp.tsc(k, DD));

            mx.set(i, k, ML, ml);
            mx.set(i, k, MG, mg);
            mx.set(i, k, IL, il);
            mx.set(i, k, IG, ig);
            mx.set(i, k, DL, dl);
            mx.set(i, k, DG, dg);

            xe = xe.max(ml); // local exit from any node
        }
        // Glocal exits leave from node M only.
        xe = xe.max(mx.get(i, m, MG)).max(mx.get(i, m, DG));

        let xn = mx.x(i - 1, XN) + gp.xsc(Special::N, XSC_LOOP);
        let xj = (mx.x(i - 1, XJ) + gp.xsc(Special::J, XSC_LOOP))
            .max(xe + gp.xsc(Special::E, XSC_LOOP));
        let xb = (xn + gp.xsc(Special::N, XSC_MOVE)).max(xj + gp.xsc(Special::J, XSC_MOVE));
        let xc = (mx.x(i - 1, XC) + gp.xsc(Special::C, XSC_LOOP))
            .max(xe + gp.xsc(Special::E, XSC_MOVE));

        mx.set_x(i, XE, xe);
        mx.set_x(i, XN, xn);
        mx.set_x(i, XJ, xj);
        mx.set_x(i, XB, xb);
        mx.set_x(i, XL, xb + gp.xsc(Special::B, XSC_MOVE));
        mx.set_x(i, XG, xb + gp.xsc(Special::B, XSC_LOOP));
        mx.set_x(i, XC, xc);
    }

    mx.x(l, XC) + gp.xsc(Special::C, XSC_MOVE)
}

/// Recover the optimal path from a filled Viterbi matrix. Tie order at
/// match states is M > I > D > entry; glocal entries are expanded through
/// their wing-retracted `DG_1..DG_{k−1}` chain.
pub fn reference_viterbi_trace(gp: &GenericProfile, mx: &RefMatrix) -> Trace {
    use Transition::*;
    let (m, l) = (gp.m, mx.l);
    let mut tr = Trace::new();
    if mx.x(l, XC) + gp.xsc(Special::C, XSC_MOVE) == f32::NEG_INFINITY {
        return tr; // no path
    }

    // argmax with a fixed priority order: earlier candidates win ties.
    let pick = |cands: &[(f32, usize)]| -> usize {
        let mut best = f32::NEG_INFINITY;
        let mut who = cands[0].1;
        for &(v, tag) in cands {
            if v > best {
                best = v;
                who = tag;
            }
        }
        who
    };

    let mut rev: Vec<(TraceState, usize, usize)> = vec![(TraceState::T, 0, 0)];
    let mut st = TraceState::C;
    let mut i = l;
    let mut k = 0_usize;

    loop {
        match st {
            TraceState::C => {
                let from_e = mx.x(i, XE) + gp.xsc(Special::E, XSC_MOVE);
                if from_e >= mx.x(i, XC) {
                    rev.push((TraceState::C, 0, 0));
                    st = TraceState::E;
                } else {
                    rev.push((TraceState::C, 0, i));
                    i -= 1;
                }
            }
            TraceState::J => {
                let from_e = mx.x(i, XE) + gp.xsc(Special::E, XSC_LOOP);
                if from_e >= mx.x(i, XJ) {
                    rev.push((TraceState::J, 0, 0));
                    st = TraceState::E;
                } else {
                    rev.push((TraceState::J, 0, i));
                    i -= 1;
                }
            }
            TraceState::E => {
                rev.push((TraceState::E, 0, 0));
                // Priority: local matches ascending k, then the glocal exits.
                let mut cands: Vec<(f32, usize)> =
                    (1..=m).map(|kk| (mx.get(i, kk, ML), kk)).collect();
                cands.push((mx.get(i, m, MG), m + 1));
                cands.push((mx.get(i, m, DG), m + 2));
                let tag = pick(&cands);
                if tag <= m {
                    st = TraceState::ML;
                    k = tag;
                } else if tag == m + 1 {
                    st = TraceState::MG;
                    k = m;
                } else {
                    st = TraceState::DG;
                    k = m;
                }
            }
            TraceState::ML => {
                rev.push((TraceState::ML, k, i));
                let tag = pick(&[
                    (mx.get(i - 1, k - 1, ML) + gp.tsc(k, MM), 0),
                    (mx.get(i - 1, k - 1, IL) + gp.tsc(k, IM), 1),
                    (mx.get(i - 1, k - 1, DL) + gp.tsc(k, DM), 2),
                    (mx.x(i - 1, XL) + gp.tsc(k, LM), 3),
                ]);
                i -= 1;
                match tag {
                    0 => { st = TraceState::ML; k -= 1; }
                    1 => { st = TraceState::IL; k -= 1; }
                    2 => { st = TraceState::DL; k -= 1; }
                    _ => st = TraceState::L,
                }
            }
            TraceState::MG => {
                rev.push((TraceState::MG, k, i));
                let tag = pick(&[
                    (mx.get(i - 1, k - 1, MG) + gp.tsc(k, MM), 0),
                    (mx.get(i - 1, k - 1, IG) + gp.tsc(k, IM), 1),
                    (mx.get(i - 1, k - 1, DG) + gp.tsc(k, DM), 2),
                    (mx.x(i - 1, XG) + gp.tsc(k, GM), 3),
                ]);
                i -= 1;
                match tag {
                    0 => { st = TraceState::MG; k -= 1; }
                    1 => { st = TraceState::IG; k -= 1; }
                    2 => { st = TraceState::DG; k -= 1; }
                    _ => {
                        // Wing retraction: expand G -> DG_1 .. DG_{k-1} -> MG_k.
                        for kk in (1..k).rev() {
                            rev.push((TraceState::DG, kk, 0));
                        }
                        st = TraceState::G;
                    }
                }
            }
            TraceState::IL | TraceState::IG => {
                rev.push((st, k, i));
                let (msrc, isrc) = if st == TraceState::IL { (ML, IL) } else { (MG, IG) };
                let tag = pick(&[
                    (mx.get(i - 1, k, msrc) + gp.tsc(k, MI), 0),
                    (mx.get(i - 1, k, isrc) + gp.tsc(k, II), 1),
                ]);
                i -= 1;
                st = match (st, tag) {
                    (TraceState::IL, 0) => TraceState::ML,
                    (TraceState::IL, _) => TraceState::IL,
                    (_, 0) => TraceState::MG,
                    (_, _) => TraceState::IG,
                };
            }
            TraceState::DL | TraceState::DG => {
                rev.push((st, k, 0));
                let (msrc, dsrc) = if st == TraceState::DL { (ML, DL) } else { (MG, DG) };
                let tag = pick(&[
                    (mx.get(i, k - 1, msrc) + gp.tsc(k, MD), 0),
                    (mx.get(i, k - 1, dsrc) + gp.tsc(k, DD), 1),
                ]);
                k -= 1;
                st = match (st, tag) {
                    (TraceState::DL, 0) => TraceState::ML,
                    (TraceState::DL, _) => TraceState::DL,
                    (_, 0) => TraceState::MG,
                    (_, _) => TraceState::DG,
                };
            }
            TraceState::L => {
                rev.push((TraceState::L, 0, 0));
                st = TraceState::B;
            }
            TraceState::G => {
                rev.push((TraceState::G, 0, 0));
                st = TraceState::B;
            }
            TraceState::B => {
                rev.push((TraceState::B, 0, 0));
                let from_n = mx.x(i, XN) + gp.xsc(Special::N, XSC_MOVE);
                st = if from_n >= mx.x(i, XB) { TraceState::N } else { TraceState::J };
            }
            TraceState::N => {
                if i == 0 {
                    rev.push((TraceState::N, 0, 0));
                    rev.push((TraceState::S, 0, 0));
                    break;
                }
                rev.push((TraceState::N, 0, i));
                i -= 1;
            }
            _ => unreachable!("state {st} cannot appear in a reference traceback"),
        }
    }

    for (st, k, i) in rev.into_iter().rev() {
        tr.push(st, k, i);
    }
    tr
}
