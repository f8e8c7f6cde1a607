use alphabet::DigitalSeq;
use profile::gp::{GenericProfile, Special, Transition, XSC_LOOP, XSC_MOVE};
use profile::logsum::logsum;

use crate::matrix::*;

/// Dense dual-mode Forward: the Viterbi recursion with `max` replaced by
/// log-space summation. Returns the total path score in nats.
pub fn reference_forward(dsq: &DigitalSeq, gp: &GenericProfile, mx: &mut RefMatrix) -> f32 {
    use Transition::*;
    let (m, l) = (gp.m, dsq.len());
    debug_assert!(mx.m == m && mx.l == l);

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
        for s in 0..N_MAIN {
            mx.set(i, 0, s, f32::NEG_INFINITY);
        }
        for k in 1..=m {
            let msc = gp.msc(k, x);

            let ml = msc
                + logsum(
                    logsum(
                        mx.get(i - 1, k - 1, ML) + gp.tsc(k, MM),
                        mx.get(i - 1, k - 1, IL) + gp.tsc(k, IM),
                    ),
                    logsum(
                        mx.get(i - 1, k - 1, DL) + gp.tsc(k, DM),
                        mx.x(i - 1, XL) + gp.tsc(k, LM),
                    ),
                );
            let mg = msc
                + logsum(
                    logsum(
                        mx.get(i - 1, k - 1, MG) + gp.tsc(k, MM),
                        mx.get(i - 1, k - 1, IG) + gp.tsc(k, IM),
                    ),
                    logsum(
                        mx.get(i - 1, k - 1, DG) + gp.tsc(k, DM),
                        mx.x(i - 1, XG) + gp.tsc(k, GM),
                    ),
                );
            let il = logsum(
                mx.get(i - 1, k, ML) + gp.tsc(k, MI),
                mx.get(i - 1, k, IL) + gp.tsc(k, II),
            );
            let ig = logsum(
                mx.get(i - 1, k, MG) + gp.tsc(k, MI),
                mx.get(i - 1, k, IG) + gp.tsc(k, II),
            );
            let dl = logsum(
                mx.get(i, k - 1, ML) + gp.tsc(k, MD),
                mx.get(i, k - 1, DL) + gp.tsc(k, DD),
            );
            let dg = logsum(
                mx.get(i, k - 1, MG) + gp.tsc(k, MD),
                mx.get(i, k - 1, DG) + gp.tsc(k, DD),
            );

            mx.set(i, k, ML, ml);
            mx.set(i, k, MG, mg);
            mx.set(i, k, IL, il);
            mx.set(i, k, IG, ig);
            mx.set(i, k, DL, dl);
            mx.set(i, k, DG, dg);

            xe = logsum(xe, ml);
        }
        xe = logsum(xe, logsum(mx.get(i, m, MG), mx.get(i, m, DG)));

        let xn = mx.x(i - 1, XN) + gp.xsc(Special::N, XSC_LOOP);
        let xj = logsum(
            mx.x(i - 1, XJ) + gp.xsc(Special::J, XSC_LOOP),
            xe + gp.xsc(Special::E, XSC_LOOP),
        );
        let xb = logsum(
            xn + gp.xsc(Special::N, XSC_MOVE),
            xj + gp.xsc(Special::J, XSC_MOVE),
        );
        let xc = logsum(
            mx.x(i - 1, XC) + gp.xsc(Special::C, XSC_LOOP),
            xe + gp.xsc(Special::E, XSC_MOVE),
        );

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
