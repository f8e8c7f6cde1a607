use rv::dist::Exponential;
use rv::traits::Cdf;

/// Significance parameters carried on a profile. Fitting them is the
/// calibrator's job; the pipeline only consumes them to turn filter bit
/// scores into P-values.
///
/// # Fields
/// - `msv_mu`/`msv_lambda`: Gumbel location/slope of the MSV score tail.
/// - `vit_mu`/`vit_lambda`: same, for the Viterbi filter.
/// - `fwd_tau`/`fwd_lambda`: exponential-tail base/slope of Forward scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalueParams {
    pub msv_mu    : f32,
    pub msv_lambda: f32,
    pub vit_mu    : f32,
    pub vit_lambda: f32,
    pub fwd_tau   : f32,
    pub fwd_lambda: f32,
}

impl Default for EvalueParams {
    /// Calibration-shaped defaults: the conventional λ = ln 2 slope, with
    /// stage-specific offsets.
    fn default() -> Self {
        EvalueParams {
            msv_mu    : -1.0,
            msv_lambda: std::f32::consts::LN_2,
            vit_mu    : -2.0,
            vit_lambda: std::f32::consts::LN_2,
            fwd_tau   : -3.0,
            fwd_lambda: std::f32::consts::LN_2,
        }
    }
}

impl EvalueParams {
    /// P-value of an MSV/SSV bit score under the Gumbel tail.
    pub fn msv_pvalue(&self, bits: f32) -> f64 {
        gumbel_surv(bits, self.msv_mu, self.msv_lambda)
    }

    /// P-value of a Viterbi-filter bit score under the Gumbel tail.
    pub fn vit_pvalue(&self, bits: f32) -> f64 {
        gumbel_surv(bits, self.vit_mu, self.vit_lambda)
    }

    /// P-value of a Forward bit score under the exponential tail.
    pub fn fwd_pvalue(&self, bits: f32) -> f64 {
        let rate = f64::from(self.fwd_lambda);
        let x = f64::from(bits - self.fwd_tau);
        if x <= 0.0 {
            return 1.0;
        }
        let tail = Exponential::new(rate).expect("fwd_lambda must be positive");
        tail.sf(&x).min(1.0)
    }
}

/// Gumbel survival `P(X > x)` with location `mu` and slope `lambda`.
/// `+inf` scores (saturated byte filter) always pass: P = 0.
fn gumbel_surv(x: f32, mu: f32, lambda: f32) -> f64 {
    if x == f32::INFINITY {
        return 0.0;
    }
    assert!(lambda > 0.0, "lambda must be positive");
    let z = f64::from(lambda) * f64::from(x - mu);
    (1.0 - (-(-z).exp()).exp()).clamp(0.0, 1.0)
}
