use alphabet::DigitalSeq;
use profile::gp::{GenericProfile, Special, Transition, XSC_LOOP, XSC_MOVE};
use profile::trace::{Trace, TraceState};
use profile::ProfileError;

use crate::matrix::*;

/// Sparse dual-mode Viterbi over the matrix's mask. Cells outside the mask
/// read as `-inf`; N/J/C accumulate their loop costs across inter-segment
/// gaps. Returns the optimal score in nats.
pub fn sparse_viterbi(dsq: &DigitalSeq, gp: &GenericProfile, sx: &mut SparseMatrix) -> f32 {
    use Transition::*;
    let mask = sx.mask_arc();
    let (m, l) = (gp.m, mask.l());
    debug_assert_eq!(dsq.len(), l);

    let nnl = gp.xsc(Special::N, XSC_LOOP);
    let jjl = gp.xsc(Special::J, XSC_LOOP);
    let ccl = gp.xsc(Special::C, XSC_LOOP);
    let nbm = gp.xsc(Special::N, XSC_MOVE);
    let jbm = gp.xsc(Special::J, XSC_MOVE);
    let ejl = gp.xsc(Special::E, XSC_LOOP);
    let ecm = gp.xsc(Special::E, XSC_MOVE);
    let blm = gp.xsc(Special::B, XSC_MOVE);
    let bgm = gp.xsc(Special::B, XSC_LOOP);

    let mut xn = 0.0_f32;
    let mut xj = f32::NEG_INFINITY;
    let mut xc = f32::NEG_INFINITY;
    let mut prev_end = 0_usize;

    for seg in mask.segments().to_vec() {
        // ---- Carry N/J/C over the silent gap before this segment.
        let gap = (seg.ia - 1 - prev_end) as f32;
        if gap > 0.0 {
            xn += gap * nnl;
            xj += gap * jjl;
            xc += gap * ccl;
        }
        let ia1 = seg.ia - 1;
        let xb = (xn + nbm).max(xj + jbm);
        sx.set_x(ia1, XE, f32::NEG_INFINITY);
        sx.set_x(ia1, XN, xn);
        sx.set_x(ia1, XJ, xj);
        sx.set_x(ia1, XB, xb);
        sx.set_x(ia1, XL, xb + blm);
        sx.set_x(ia1, XG, xb + bgm);
        sx.set_x(ia1, XC, xc);

        for i in seg.ia..=seg.ib {
            let x = dsq[i];
            let xl_prev = sx.x(i - 1, XL);
            let xg_prev = sx.x(i - 1, XG);
            let mut xe = f32::NEG_INFINITY;

            let row = mask.row(i).to_vec();
            let off = mask.row_offset(i);
            for (c, &ku) in row.iter().enumerate() {
                let k = ku as usize;
                let idx = off + c;
                let msc = gp.msc(k, x);

                let ml = msc
                    + (sx.get(i - 1, k - 1, ML) + gp.tsc(k, MM))
                        .max(sx.get(i - 1, k - 1, IL) + gp.tsc(k, IM))
                        .max(sx.get(i - 1, k - 1, DL) + gp.tsc(k, DM))
                        .max(xl_prev + gp.tsc(k, LM));
                let mg = msc
                    + (sx.get(i - 1, k - 1, MG) + gp.tsc(k, MM))
                        .max(sx.get(i - 1, k - 1, IG) + gp.tsc(k, IM))
                        .max(sx.get(i - 1, k - 1, DG) + gp.tsc(k, DM))
                        .max(xg_prev + gp.tsc(k, GM));
                let il = (sx.get(i - 1, k, ML) + gp.tsc(k, MI))
                    .max(sx.get(i - 1, k, IL) + gp.tsc(k, II));
                let ig = (sx.get(i - 1, k, MG) + gp.tsc(k, MI))
                    .max(sx.get(i - 1, k, IG) + gp.tsc(k, II));
                let dl = (sx.get(i, k - 1, ML) + gp.tsc(k, MD))
                    .max(sx.get(i, k - 1, DL) + gp.tsc(k, DD));
                let dg = (sx.get(i, k - 1, MG) + gp.tsc(k, MD))
                    .max(sx.get(i, k - 1, DG) + gp.tsc(k, DD));

                sx.set_cell(idx, ML, ml);
                sx.set_cell(idx, MG, mg);
                sx.set_cell(idx, IL, il);
                sx.set_cell(idx, IG, ig);
                sx.set_cell(idx, DL, dl);
                sx.set_cell(idx, DG, dg);

                xe = xe.max(ml);
                if k == m {
                    xe = xe.max(mg).max(dg);
                }
            }

            xn += nnl;
            xj = (xj + jjl).max(xe + ejl);
            xc = (xc + ccl).max(xe + ecm);
            let xb = (xn + nbm).max(xj + jbm);
            sx.set_x(i, XE, xe);
            sx.set_x(i, XN, xn);
            sx.set_x(i, XJ, xj);
            sx.set_x(i, XB, xb);
            sx.set_x(i, XL, xb + blm);
            sx.set_x(i, XG, xb + bgm);
            sx.set_x(i, XC, xc);
        }
        prev_end = seg.ib;
    }

    let gap = (l - prev_end) as f32;
    if gap > 0.0 {
        xc += gap * ccl;
    }
    xc + gp.xsc(Special::C, XSC_MOVE)
}

/// Traceback over a filled sparse Viterbi matrix. Tie order: M > I > D >
/// entry; glocal entries expand through `DG_1..DG_{k−1}`.
///
/// # Errors
/// `TraceInvalid` if the matrix walks outside the mask (a producer bug).
pub fn sparse_viterbi_trace(gp: &GenericProfile, sx: &SparseMatrix) -> Result<Trace, ProfileError> {
    use Transition::*;
    let mask = sx.mask();
    let (m, l) = (gp.m, mask.l());
    let mut tr = Trace::new();

    let total = {
        let mut xc = f32::NEG_INFINITY;
        if let Some(seg) = mask.segments().last() {
            xc = sx.x(seg.ib, XC) + (l - seg.ib) as f32 * gp.xsc(Special::C, XSC_LOOP);
        }
        xc + gp.xsc(Special::C, XSC_MOVE)
    };
    if !total.is_finite() {
        return Ok(tr); // no path worth reporting
    }

    let neg = f32::NEG_INFINITY;
    let mut rev: Vec<(TraceState, usize, usize)> = vec![(TraceState::T, 0, 0)];
    let mut st = TraceState::C;
    let mut i = l;
    let mut k = 0_usize;

    let pick = |cands: &[(f32, usize)]| -> usize {
        let mut best = neg;
        let mut who = cands[0].1;
        for &(v, tag) in cands {
            if v > best {
                best = v;
                who = tag;
            }
        }
        who
    };

    loop {
        match st {
            TraceState::C => {
                let from_e = sx.x(i, XE) + gp.xsc(Special::E, XSC_MOVE);
                if sx.has_x(i) && from_e != neg && from_e >= sx.x(i, XC) {
                    rev.push((TraceState::C, 0, 0));
                    st = TraceState::E;
                } else {
                    rev.push((TraceState::C, 0, i));
                    i -= 1;
                }
            }
            TraceState::J => {
                let from_e = sx.x(i, XE) + gp.xsc(Special::E, XSC_LOOP);
                if sx.has_x(i) && from_e != neg && from_e >= sx.x(i, XJ) {
                    rev.push((TraceState::J, 0, 0));
                    st = TraceState::E;
                } else {
                    rev.push((TraceState::J, 0, i));
                    i -= 1;
                }
            }
            TraceState::E => {
                rev.push((TraceState::E, 0, 0));
                let mut cands: Vec<(f32, usize)> = mask
                    .row(i)
                    .iter()
                    .map(|&ku| (sx.get(i, ku as usize, ML), ku as usize))
                    .collect();
                if mask.contains(i, m) {
                    cands.push((sx.get(i, m, MG), m + 1));
                    cands.push((sx.get(i, m, DG), m + 2));
                }
                if cands.is_empty() {
                    return Err(ProfileError::TraceInvalid(format!(
                        "E state on cell-less row {i}"
                    )));
                }
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
                    (sx.get(i - 1, k - 1, ML) + gp.tsc(k, MM), 0),
                    (sx.get(i - 1, k - 1, IL) + gp.tsc(k, IM), 1),
                    (sx.get(i - 1, k - 1, DL) + gp.tsc(k, DM), 2),
                    (sx.x(i - 1, XL) + gp.tsc(k, LM), 3),
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
                    (sx.get(i - 1, k - 1, MG) + gp.tsc(k, MM), 0),
                    (sx.get(i - 1, k - 1, IG) + gp.tsc(k, IM), 1),
                    (sx.get(i - 1, k - 1, DG) + gp.tsc(k, DM), 2),
                    (sx.x(i - 1, XG) + gp.tsc(k, GM), 3),
                ]);
                i -= 1;
                match tag {
                    0 => { st = TraceState::MG; k -= 1; }
                    1 => { st = TraceState::IG; k -= 1; }
                    2 => { st = TraceState::DG; k -= 1; }
                    _ => {
                        for kk in (1..k).rev() {
                            rev.push((TraceState::DG, kk, 0));
                        }
                        st = TraceState::G;
                    }
                }
            }
            TraceState::IL | TraceState::IG => {
                rev.push((st, k, i));
                let (ms, is) = if st == TraceState::IL { (ML, IL) } else { (MG, IG) };
                let tag = pick(&[
                    (sx.get(i - 1, k, ms) + gp.tsc(k, MI), 0),
                    (sx.get(i - 1, k, is) + gp.tsc(k, II), 1),
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
                let (ms, ds) = if st == TraceState::DL { (ML, DL) } else { (MG, DG) };
                let tag = pick(&[
                    (sx.get(i, k - 1, ms) + gp.tsc(k, MD), 0),
                    (sx.get(i, k - 1, ds) + gp.tsc(k, DD), 1),
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
                let from_n = sx.x(i, XN) + gp.xsc(Special::N, XSC_MOVE);
                st = if from_n >= sx.x(i, XB) { TraceState::N } else { TraceState::J };
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
            _ => {
                return Err(ProfileError::TraceInvalid(format!(
                    "unexpected state {st} in sparse traceback"
                )))
            }
        }
    }

    for (st, k, i) in rev.into_iter().rev() {
        tr.push(st, k, i);
    }
    Ok(tr)
}
