use alphabet::DigitalSeq;
use profile::op::byte::SCALE_B;
use profile::{FilterMatrix, OptimizedProfile};

use crate::simdvec::*;

/// SSV filter: best *single* ungapped diagonal over the signed `sbv` view.
/// Cheaper than MSV (no special-state bookkeeping per row); the −128 floor
/// of the signed bytes doubles as the diagonal restart. Same score
/// semantics as MSV: nats, `+inf` on ceiling saturation.
pub fn ssv_filter(dsq: &DigitalSeq, om: &OptimizedProfile, fx: &mut FilterMatrix) -> f32 {
    let byte = &om.byte;
    let nq = byte.stripe.q;
    let lanes = byte.stripe.lanes;
    let l = dsq.len();

    fx.resize_byte(byte.stripe.row_len());
    let dp = fx.byte_row();
    dp.fill(i8::MIN as u8);

    let mut mpv = vec![i8::MIN; lanes];
    let mut sv = vec![0_i8; lanes];
    let mut xev = vec![i8::MIN; lanes];
    let mut best = i8::MIN;

    for i in 1..=l {
        let rsc = byte.sbv_row(dsq[i]);
        splat(&mut xev, i8::MIN);

        // mpv = previous row's last stripe, shifted into this lane.
        for (z, o) in mpv.iter_mut().enumerate() {
            *o = if z == 0 { i8::MIN } else { dp[(nq - 1) * lanes + z - 1] as i8 };
        }
        for q in 0..nq {
            // sbv holds costs; subtracting them adds the score. The −128
            // floor restarts a diagonal wherever extension scores worse.
            sv.copy_from_slice(&mpv);
            for (s, &c) in sv.iter_mut().zip(&rsc[q * lanes..(q + 1) * lanes]) {
                *s = s.saturating_sub(c as i8);
            }
            max_i8(&mut xev, &sv);

            for (o, &v) in mpv.iter_mut().zip(&dp[q * lanes..(q + 1) * lanes]) {
                *o = v as i8;
            }
            for (o, &v) in dp[q * lanes..(q + 1) * lanes].iter_mut().zip(&sv) {
                *o = v as u8;
            }
        }

        let xe = hmax_i8(&xev);
        if xe == i8::MAX {
            return f32::INFINITY;
        }
        best = best.max(xe);
    }

    // Charge the entry/exit/move costs MSV accounts for in its specials.
    let diag = f32::from(best) + 128.0;
    (diag - f32::from(byte.tbm) - f32::from(byte.tec) - 2.0 * f32::from(byte.tjb)) / SCALE_B - 3.0
}
