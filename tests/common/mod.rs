use parser::{CliAlphabet, CliMode, SearchArgs};

/// Compact builder for search fixtures, so each scenario only names the
/// knobs it actually cares about.
pub struct SearchFixture {
    args: SearchArgs,
}

impl SearchFixture {
    pub fn new() -> SearchFixture {
        SearchFixture {
            args: SearchArgs {
                alphabet    : CliAlphabet::Dna,
                mode        : CliMode::Dual,
                model_length: 60,
                seq_length  : 120,
                n_sequences : 40,
                planted     : 0.25,
                seed        : 0,
                tau_sparse  : 1e-4,
                msv_p       : 0.02,
                vf_p        : 1e-3,
                ff_p        : 1e-5,
                mass_epsilon: 0.1,
                simd_width  : 16,
                workers     : 1,
                dump_config : None,
            },
        }
    }

    pub fn n_sequences(mut self, n: usize) -> Self {
        self.args.n_sequences = n;
        self
    }

    pub fn dump_config(mut self, path: std::path::PathBuf) -> Self {
        self.args.dump_config = Some(path);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.args.seed = seed;
        self
    }

    pub fn planted(mut self, frac: f32) -> Self {
        self.args.planted = frac;
        self
    }

    pub fn msv_p(mut self, p: f64) -> Self {
        self.args.msv_p = p;
        self
    }

    pub fn workers(mut self, w: usize) -> Self {
        self.args.workers = w;
        self
    }

    pub fn simd_width(mut self, w: u32) -> Self {
        self.args.simd_width = w;
        self
    }

    pub fn build(self) -> SearchArgs {
        self.args
    }
}
