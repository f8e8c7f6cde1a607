use alphabet::DigitalSeq;
use profile::gp::{GenericProfile, Special, Transition, XSC_LOOP, XSC_MOVE};
use profile::logsum::logsum;

use crate::matrix::*;

/// Dense dual-mode Backward. Cell (i, k) holds the log probability of
/// emitting residues i+1..L and finishing, given the path just accounted
/// for position i in that state. The total score is read off the N state
/// at row 0 and must agree with Forward within logsum tolerance.
pub fn reference_backward(dsq: &DigitalSeq, gp: &GenericProfile, mx: &mut RefMatrix) -> f32 {
    use Transition::*;
    let (m, l) = (gp.m, dsq.len());
    debug_assert!(mx.m == m && mx.l == l);
    let neg = f32::NEG_INFINITY;

    // ---- Row L: only exits remain. Delete runs may still crawl to the
    //      glocal exit at node M; inserts are dead ends.
    mx.set_x(l, XC, gp.xsc(Special::C, XSC_MOVE));
    mx.set_x(l, XL, neg);
    mx.set_x(l, XG, neg);
    mx.set_x(l, XB, neg);
    mx.set_x(l, XJ, neg);
    mx.set_x(l, XE, gp.xsc(Special::E, XSC_MOVE) + mx.x(l, XC));
    mx.set_x(l, XN, neg);
    let xe_l = mx.x(l, XE);
    for k in (1..=m).rev() {
        let dg_right = if k < m { mx.get(l, k + 1, DG) } else { neg };
        let dg = logsum(
            if k == m { xe_l } else { neg },
            gp.tsc(k + 1, DD) + dg_right,
        );
        mx.set(l, k, DG, dg);
        mx.set(l, k, DL, neg);
        mx.set(l, k, ML, xe_l);
        mx.set(l, k, MG, logsum(
            if k == m { xe_l } else { neg },
            gp.tsc(k + 1, MD) + dg_right,
        ));
        mx.set(l, k, IL, neg);
        mx.set(l, k, IG, neg);
    }
    if l > 0 {
        for s in 0..N_MAIN {
            mx.set(l, 0, s, neg);
        }
    }

    for i in (0..l).rev() {
        let x_next = dsq[i + 1];

        // ---- Specials: they read the next row's match cells.
        let xc = gp.xsc(Special::C, XSC_LOOP) + mx.x(i + 1, XC);
        let mut xl = neg;
        let mut xg = neg;
        for k in 1..=m {
            let mnext = gp.msc(k, x_next);
            xl = logsum(xl, gp.tsc(k, LM) + mnext + mx.get(i + 1, k, ML));
            xg = logsum(xg, gp.tsc(k, GM) + mnext + mx.get(i + 1, k, MG));
        }
        let xb = logsum(
            gp.xsc(Special::B, XSC_MOVE) + xl,
            gp.xsc(Special::B, XSC_LOOP) + xg,
        );
        let xj = logsum(
            gp.xsc(Special::J, XSC_MOVE) + xb,
            gp.xsc(Special::J, XSC_LOOP) + mx.x(i + 1, XJ),
        );
        let xe = logsum(
            gp.xsc(Special::E, XSC_MOVE) + xc,
            gp.xsc(Special::E, XSC_LOOP) + xj,
        );
        let xn = logsum(
            gp.xsc(Special::N, XSC_MOVE) + xb,
            gp.xsc(Special::N, XSC_LOOP) + mx.x(i + 1, XN),
        );
        mx.set_x(i, XC, xc);
        mx.set_x(i, XL, xl);
        mx.set_x(i, XG, xg);
        mx.set_x(i, XB, xb);
        mx.set_x(i, XJ, xj);
        mx.set_x(i, XE, xe);
        mx.set_x(i, XN, xn);

        if i == 0 {
            break; // row 0 holds no main cells
        }

        // ---- Main cells, k descending (the delete terms read k+1 of this
        //      same row).
        for k in (1..=m).rev() {
            let (diag_l, diag_g, il_in, ig_in) = if k < m {
                let mnext = gp.msc(k + 1, x_next);
                (
                    mnext + mx.get(i + 1, k + 1, ML),
                    mnext + mx.get(i + 1, k + 1, MG),
                    mnext + mx.get(i + 1, k + 1, ML),
                    mnext + mx.get(i + 1, k + 1, MG),
                )
            } else {
                (neg, neg, neg, neg)
            };
            let dl_right = if k < m { mx.get(i, k + 1, DL) } else { neg };
            let dg_right = if k < m { mx.get(i, k + 1, DG) } else { neg };
            let glocal_exit = if k == m { xe } else { neg };

            let ml = logsum(
                logsum(gp.tsc(k + 1, MM) + diag_l, gp.tsc(k, MI) + mx.get(i + 1, k, IL)),
                logsum(gp.tsc(k + 1, MD) + dl_right, xe),
            );
            let mg = logsum(
                logsum(gp.tsc(k + 1, MM) + diag_g, gp.tsc(k, MI) + mx.get(i + 1, k, IG)),
                logsum(gp.tsc(k + 1, MD) + dg_right, glocal_exit),
            );
            let il = logsum(
                gp.tsc(k + 1, IM) + il_in,
                gp.tsc(k, II) + mx.get(i + 1, k, IL),
            );
            let ig = logsum(
                gp.tsc(k + 1, IM) + ig_in,
                gp.tsc(k, II) + mx.get(i + 1, k, IG),
            );
            let dl = logsum(
                gp.tsc(k + 1, DM) + diag_l,
                gp.tsc(k + 1, DD) + dl_right,
            );
            let dg = logsum(
                logsum(gp.tsc(k + 1, DM) + diag_g, gp.tsc(k + 1, DD) + dg_right),
                glocal_exit,
            );

            mx.set(i, k, ML, ml);
            mx.set(i, k, MG, mg);
            mx.set(i, k, IL, il);
            mx.set(i, k, IG, ig);
            mx.set(i, k, DL, dl);
            mx.set(i, k, DG, dg);
        }
        for s in 0..N_MAIN {
            mx.set(i, 0, s, neg);
        }
    }

    mx.x(0, XN)
}
