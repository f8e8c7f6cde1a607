use alphabet::DigitalSeq;
use profile::fx::{PLANE_D, PLANE_I, PLANE_M};
use profile::gp::Special;
use profile::mask::{SparseMask, SparseMaskBuilder};
use profile::op::word::{TW_BM, TW_DM, TW_II, TW_IM, TW_MD, TW_MI, TW_MM};
use profile::op::FloatLayer;
use profile::{FilterMatrix, OptimizedProfile, XSC_LOOP, XSC_MOVE};

use crate::simdvec::*;

const RESCALE_THRESHOLD: f32 = 1.0e4;

/// Gather the transition vector of the *successor* node for each lane of
/// stripe `q`: node k+1 lives at stripe q+1, or wraps to (0, z+1).
#[inline]
fn gather_out(fl: &FloatLayer, tw: usize, q: usize, out: &mut [f32]) {
    let lanes = fl.stripe.lanes;
    if q + 1 < fl.stripe.q {
        out.copy_from_slice(&fl.tf7(q + 1)[tw * lanes..(tw + 1) * lanes]);
    } else {
        shift_down(&fl.tf7(0)[tw * lanes..(tw + 1) * lanes], 0.0, out);
    }
}

/// Same gather for an arbitrary striped row (successor-cell access).
#[inline]
fn gather_row(row: &[f32], q: usize, nq: usize, lanes: usize, out: &mut [f32]) {
    if q + 1 < nq {
        out.copy_from_slice(&row[(q + 1) * lanes..(q + 2) * lanes]);
    } else {
        shift_down(&row[..lanes], 0.0, out);
    }
}

/// Striped Backward pass coupled with on-the-fly posterior decoding: for
/// each row (L down to 1) the per-cell posterior is computed against the
/// stored Forward rows, and every cell with `P(i,k) ≥ tau` is inserted into
/// the sparse mask. The Backward score itself is not returned; this
/// filter exists to build the mask.
///
/// `fwd_raw` is the raw score the Forward filter returned for this same
/// matrix; rows and rescale ledgers must still be in place.
pub fn backward_filter(
    dsq    : &DigitalSeq,
    om     : &OptimizedProfile,
    fx     : &mut FilterMatrix,
    fwd_raw: f32,
    tau    : f32,
) -> SparseMask {
    let fl = &om.float;
    let nq = fl.stripe.q;
    let lanes = fl.stripe.lanes;
    let rl = fl.stripe.row_len();
    let l = dsq.len();
    let m = om.m;
    let xf = &fl.xf;

    let mut builder = SparseMaskBuilder::new(m, l);
    if l == 0 || !fwd_raw.is_finite() {
        return builder.finish();
    }

    let mut btot = 0.0_f32;
    let mut xc = 0.0_f32;
    let mut xj = 0.0_f32;

    let mut nmr = vec![0.0_f32; rl];
    let mut nout = vec![0.0_f32; lanes];
    let mut tvec = vec![0.0_f32; lanes];
    let mut dcv = vec![0.0_f32; lanes];
    let mut incr = vec![0.0_f32; lanes];
    let mut bd_out = vec![0.0_f32; lanes];

    for i in (1..=l).rev() {
        let fcum = fx.fwd_cum(i);
        let (fwd_row, ba, bb) = fx.bck_pair_with_fwd(i);
        let (cur, next) = if (l - i) % 2 == 0 { (ba, bb) } else { (bb, ba) };
        let (cm, rest) = cur.split_at_mut(rl);
        let (ci, cd) = rest.split_at_mut(rl);

        let xe;
        if i == l {
            // Base case: only C -> T remains; local deletes cannot exit.
            xc = xf[Special::C as usize][XSC_MOVE];
            xj = 0.0;
            xe = xf[Special::E as usize][XSC_MOVE] * xc;
            cm.fill(xe);
            ci.fill(0.0);
            cd.fill(0.0);
        } else {
            let nm = &next[..rl];
            let ni = &next[rl..2 * rl];
            let rsc_next = fl.rfv_row(dsq[i + 1]);
            for (o, (&b, &r)) in nmr.iter_mut().zip(nm.iter().zip(rsc_next)) {
                *o = b * r;
            }

            // ---- Specials for this row (they look one row ahead).
            let xc_new = xf[Special::C as usize][XSC_LOOP] * xc;
            let mut xl = 0.0_f32;
            for q in 0..nq {
                let bm = &fl.tf7(q)[TW_BM * lanes..(TW_BM + 1) * lanes];
                for z in 0..lanes {
                    xl += bm[z] * nmr[q * lanes + z];
                }
            }
            let xb = xl; // local-only: B -> L is free
            let xj_new = xf[Special::J as usize][XSC_MOVE] * xb
                + xf[Special::J as usize][XSC_LOOP] * xj;
            xe = xf[Special::E as usize][XSC_MOVE] * xc_new
                + xf[Special::E as usize][XSC_LOOP] * xj_new;
            xc = xc_new;
            xj = xj_new;

            // ---- Delete plane first: the match plane reads its closure.
            for q in (0..nq).rev() {
                gather_out(fl, TW_DM, q, &mut tvec);
                gather_row(&nmr, q, nq, lanes, &mut nout);
                let dd = fl.dd(q);
                // Successor D of this same row; zero at the lane wrap,
                // repaired by the increment passes below.
                if q + 1 < nq {
                    bd_out.copy_from_slice(&cd[(q + 1) * lanes..(q + 2) * lanes]);
                } else {
                    splat(&mut bd_out, 0.0);
                }
                for z in 0..lanes {
                    cd[q * lanes + z] = tvec[z] * nout[z] + dd[z] * bd_out[z];
                }
            }
            shift_down(&cd[..lanes], 0.0, &mut dcv);
            for _pass in 0..lanes {
                if dcv.iter().all(|&v| v == 0.0) {
                    break;
                }
                for q in (0..nq).rev() {
                    let dd = fl.dd(q);
                    for z in 0..lanes {
                        incr[z] = dd[z] * dcv[z];
                        cd[q * lanes + z] += incr[z];
                    }
                    dcv.copy_from_slice(&incr);
                }
                // Only the increment that reached stripe 0 wraps again.
                shift_down(&dcv, 0.0, &mut tvec);
                dcv.copy_from_slice(&tvec);
            }

            // ---- Match and insert planes.
            for q in 0..nq {
                let tf = fl.tf7(q);
                let mi = &tf[TW_MI * lanes..(TW_MI + 1) * lanes];
                let ii = &tf[TW_II * lanes..(TW_II + 1) * lanes];
                let md = &tf[TW_MD * lanes..(TW_MD + 1) * lanes];
                gather_row(&nmr, q, nq, lanes, &mut nout);
                gather_row(cd, q, nq, lanes, &mut bd_out);
                let niq = &ni[q * lanes..(q + 1) * lanes];

                gather_out(fl, TW_IM, q, &mut tvec);
                for z in 0..lanes {
                    ci[q * lanes + z] = tvec[z] * nout[z] + ii[z] * niq[z];
                }
                gather_out(fl, TW_MM, q, &mut tvec);
                for z in 0..lanes {
                    cm[q * lanes + z] =
                        tvec[z] * nout[z] + mi[z] * niq[z] + md[z] * bd_out[z] + xe;
                }
            }
        }

        // ---- Renormalize when the row outgrows single precision comfort.
        let rowmax = hmax_f32(cm).max(xe);
        if rowmax > RESCALE_THRESHOLD {
            let inv = 1.0 / rowmax;
            scale_f32(cm, inv);
            scale_f32(ci, inv);
            scale_f32(cd, inv);
            xc *= inv;
            xj *= inv;
            btot += rowmax.ln();
        }

        // ---- Decode this row against the stored Forward row and insert
        //      the surviving cells, columns descending.
        let fm = FilterMatrix::plane(fwd_row, PLANE_M, rl);
        let fi = FilterMatrix::plane(fwd_row, PLANE_I, rl);
        let fd = FilterMatrix::plane(fwd_row, PLANE_D, rl);
        let factor = (fcum + btot - fwd_raw).exp();
        builder.start_row(i);
        for k in (1..=m).rev() {
            let (q, z) = fl.stripe.pos(k);
            let e = q * lanes + z;
            let p = (fm[e] * cm[e] + fi[e] * ci[e] + fd[e] * cd[e]) * factor;
            if p >= tau {
                builder.add(k);
            }
        }
    }

    builder.finish()
}
