use alphabet::DigitalSeq;
use profile::op::byte::{BASE_B, SCALE_B};
use profile::{FilterMatrix, OptimizedProfile};

use crate::simdvec::*;

/// MSV filter: best multihit sum of ungapped diagonals, in saturating
/// unsigned byte arithmetic over the biased `rbv` costs.
///
/// Returns the raw score in nats (NN/CC/JJ hard-wiring already compensated
/// by the −3 nat term). A saturated accumulator returns `+inf`: the score
/// is off the top of the byte range and the sequence passes outright.
pub fn msv_filter(dsq: &DigitalSeq, om: &OptimizedProfile, fx: &mut FilterMatrix) -> f32 {
    let byte = &om.byte;
    let nq = byte.stripe.q;
    let lanes = byte.stripe.lanes;
    let l = dsq.len();

    fx.resize_byte(byte.stripe.row_len());
    let dp = fx.byte_row();
    dp.fill(0);

    let mut mpv = vec![0_u8; lanes];
    let mut sv = vec![0_u8; lanes];
    let mut xev = vec![0_u8; lanes];

    let base_nb = BASE_B.saturating_sub(byte.tjb); // N->B paid once per pass
    let mut xj: u8 = 0;
    let mut xb: u8 = base_nb;

    for i in 1..=l {
        let rsc = byte.rbv_row(dsq[i]);
        splat(&mut xev, 0);
        let entry = xb.saturating_sub(byte.tbm);

        shift_up(&dp[(nq - 1) * lanes..], 0, &mut mpv);
        for q in 0..nq {
            // M(i,k) = max(M(i-1,k-1), B) + match score (bias-corrected).
            sv.copy_from_slice(&mpv);
            for s in sv.iter_mut() {
                *s = (*s).max(entry);
            }
            adds_u8(&mut sv, byte.bias);
            subs_u8(&mut sv, &rsc[q * lanes..(q + 1) * lanes]);
            max_u8(&mut xev, &sv);

            mpv.copy_from_slice(&dp[q * lanes..(q + 1) * lanes]);
            dp[q * lanes..(q + 1) * lanes].copy_from_slice(&sv);
        }

        let xe = hmax_u8(&xev);
        if xe >= 255 - byte.bias {
            return f32::INFINITY;
        }
        xj = xj.max(xe.saturating_sub(byte.tec));
        xb = base_nb.max(xj.saturating_sub(byte.tjb));
    }

    (f32::from(xj) - f32::from(byte.tjb) - f32::from(BASE_B)) / SCALE_B - 3.0
}
