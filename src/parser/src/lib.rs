use std::path::PathBuf;

use clap::{ArgEnum, Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

mod error;
pub use error::ParserError;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(name="stria-rs", author, version, about, long_about = None)]
#[clap(propagate_version = true)]
/// STRIA-rs: STRiped-profile Inexact Alignment
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace {n}
    ///
    /// Warnings are emitted even when this flag is off; use --quiet to
    /// silence them.
    #[clap(short = 'v', long, parse(from_occurrences), global = true)]
    pub verbose: u8,

    /// Disable warnings. Only errors will be displayed.
    #[clap(short = 'q', long, global = true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Commands {
    /// Sample a model, generate target sequences and run the full
    /// acceleration cascade over them.
    Search {
        #[clap(flatten)]
        search: SearchArgs,
    },
    /// Replay a run from a previously serialized YAML argument file.
    FromYaml {
        /// Path to the YAML file.
        #[clap(required = true)]
        yaml: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum CliAlphabet {
    Dna,
    Rna,
    Amino,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum CliMode {
    Local,
    Glocal,
    Dual,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct SearchArgs {
    /// Residue alphabet of the sampled model and targets.
    #[clap(long, arg_enum, default_value = "dna")]
    pub alphabet: CliAlphabet,

    /// Alignment mode the profile is configured in.
    #[clap(long, arg_enum, default_value = "dual")]
    pub mode: CliMode,

    /// Number of match nodes of the sampled model.
    #[clap(short = 'M', long, default_value_t = 145)]
    pub model_length: usize,

    /// Length of the generated target sequences.
    #[clap(short = 'L', long, default_value_t = 200)]
    pub seq_length: usize,

    /// Number of target sequences.
    #[clap(short = 'N', long, default_value_t = 100)]
    pub n_sequences: usize,

    /// Fraction of targets emitted from the model (the rest are random).
    #[clap(long, default_value_t = 0.25)]
    pub planted: f32,

    /// Random seed for model sampling and target generation.
    #[clap(long, default_value_t = 0)]
    pub seed: u64,

    /// Posterior cutoff for sparse-mask inclusion.
    #[clap(long, default_value_t = 1e-4)]
    pub tau_sparse: f32,

    /// MSV stage P-value gate.
    #[clap(long, default_value_t = 0.02)]
    pub msv_p: f64,

    /// Viterbi-filter stage P-value gate.
    #[clap(long, default_value_t = 1e-3)]
    pub vf_p: f64,

    /// Forward-filter stage P-value gate.
    #[clap(long, default_value_t = 1e-5)]
    pub ff_p: f64,

    /// Posterior mass allowed outside a domain envelope.
    #[clap(long, default_value_t = 0.1)]
    pub mass_epsilon: f32,

    /// Vector width (bytes) the optimized profile is striped for.
    #[clap(long, default_value_t = 16, possible_values = ["16", "32", "64"])]
    pub simd_width: u32,

    /// Number of independent pipeline workers to shard targets over.
    #[clap(short = 'w', long, default_value_t = 1)]
    pub workers: usize,

    /// Serialize the effective arguments to this YAML file (replayable
    /// with `from-yaml`).
    #[clap(long)]
    pub dump_config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::parse_from(["stria-rs", "search"]);
        match cli.commands {
            Commands::Search { search } => {
                assert_eq!(search.model_length, 145);
                assert_eq!(search.seq_length, 200);
                assert_eq!(search.n_sequences, 100);
                assert_eq!(search.simd_width, 16);
                assert_eq!(search.alphabet, CliAlphabet::Dna);
            }
            Commands::FromYaml { .. } => panic!("expected the search subcommand"),
        }
    }

    #[test]
    fn gates_and_width_are_settable() {
        let cli = Cli::parse_from([
            "stria-rs", "-vv", "search", "--msv-p", "0.5", "--simd-width", "64", "-M", "30",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.commands {
            Commands::Search { search } => {
                assert_eq!(search.msv_p, 0.5);
                assert_eq!(search.simd_width, 64);
                assert_eq!(search.model_length, 30);
            }
            Commands::FromYaml { .. } => panic!("expected the search subcommand"),
        }
    }

    #[test]
    fn invalid_width_is_rejected() {
        assert!(Cli::try_parse_from(["stria-rs", "search", "--simd-width", "48"]).is_err());
    }

    #[test]
    fn yaml_roundtrip() {
        let cli = Cli::parse_from(["stria-rs", "search", "--seed", "7", "--planted", "0.5"]);
        let text = serde_yaml::to_string(&cli).unwrap();
        let back: Cli = serde_yaml::from_str(&text).unwrap();
        match back.commands {
            Commands::Search { search } => {
                assert_eq!(search.seed, 7);
                assert_eq!(search.planted, 0.5);
            }
            Commands::FromYaml { .. } => panic!("expected the search subcommand"),
        }
    }
}
