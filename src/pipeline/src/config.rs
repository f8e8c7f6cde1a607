use profile::SimdWidth;

/// Tunables of the acceleration cascade. The defaults are the conventional
/// production settings; every knob is surfaced on the CLI.
///
/// # Fields
/// - `tau_sparse`        : posterior cutoff for sparse-mask inclusion.
/// - `msv_p`/`vf_p`/`ff_p`: per-stage P-value gates, loosest to tightest.
/// - `mass_trace_epsilon`: posterior mass allowed to escape an envelope.
/// - `simd_width`        : vector width the optimized profile is striped for.
/// - `require_vit_ii_negative`: verify the insert-loop clamp of the word
///   layer before accepting a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub tau_sparse             : f32,
    pub msv_p                  : f64,
    pub vf_p                   : f64,
    pub ff_p                   : f64,
    pub mass_trace_epsilon     : f32,
    pub simd_width             : SimdWidth,
    pub require_vit_ii_negative: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            tau_sparse             : 1e-4,
            msv_p                  : 0.02,
            vf_p                   : 1e-3,
            ff_p                   : 1e-5,
            mass_trace_epsilon     : 0.1,
            simd_width             : SimdWidth::W16,
            require_vit_ii_negative: true,
        }
    }
}
