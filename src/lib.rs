extern crate parser;
extern crate logger;

use std::fs::File;

use parser::{Cli, CliAlphabet, CliMode, Commands, ParserError, SearchArgs};

use alphabet::{Alphabet, Background, DigitalSeq};
use located_error::prelude::*;
use pipeline::{run_sharded, PipelineConfig, SequenceOutcome};
use profile::{emit_sequence, sample_model, GenericProfile, Mode, OptimizedProfile, SimdWidth};

#[macro_use]
extern crate log;

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.commands {
        Commands::Search { search } => {
            if let Some(path) = &search.dump_config {
                let replayable = Cli {
                    verbose: cli.verbose,
                    quiet: cli.quiet,
                    commands: Commands::Search { search: search.clone() },
                };
                serde_yaml::to_writer(
                    File::create(path).with_loc(|| format!("Failed to create {path:?}"))?,
                    &replayable,
                )
                .loc("Failed to serialize the run configuration")?;
                info!("run configuration serialized to {path:?}");
            }
            for line in search_lines(&search)? {
                println!("{line}");
            }
            Ok(())
        }

        Commands::FromYaml { yaml } => {
            let replay: Cli = serde_yaml::from_reader(
                File::open(&yaml).with_loc(|| format!("Failed to open {yaml:?}"))?,
            )
            .with_loc(|| format!("Unable to deserialize arguments from {yaml:?}"))?;
            run(replay)
        }
    }
}

/// Execute a search: sample a model, generate targets, run the cascade,
/// and return the formatted per-domain report lines in input order.
pub fn search_lines(args: &SearchArgs) -> Result<Vec<String>> {
    let abc = match args.alphabet {
        CliAlphabet::Dna   => Alphabet::Dna,
        CliAlphabet::Rna   => Alphabet::Rna,
        CliAlphabet::Amino => Alphabet::Amino,
    };
    let mode = match args.mode {
        CliMode::Local  => Mode::Local,
        CliMode::Glocal => Mode::Glocal,
        CliMode::Dual   => Mode::Dual,
    };
    let width = match args.simd_width {
        16 => SimdWidth::W16,
        32 => SimdWidth::W32,
        64 => SimdWidth::W64,
        other => return Err(ParserError::InvalidWidth(other).into()),
    };
    if !(0.0..=1.0).contains(&args.planted) {
        return Err(ParserError::InvalidPlantedFraction(args.planted).into());
    }

    // ----------------------------- Sample the query model.
    let mut rng = fastrand::Rng::with_seed(args.seed);
    info!("sampling a {abc} model of length {}", args.model_length);
    let hmm = sample_model(abc, args.model_length, &mut rng);
    let bg = Background::new(abc);
    let gp = GenericProfile::config(&hmm, &bg, mode, 500)
        .loc("Failed to configure the search profile")?;
    let om = OptimizedProfile::build(&gp, width)
        .loc("Failed to stripe the optimized profile")?;

    // ----------------------------- Generate the target shard.
    let mut seqs: Vec<(String, DigitalSeq)> = Vec::with_capacity(args.n_sequences);
    let mut planted = 0_usize;
    for n in 0..args.n_sequences {
        let dsq = if rng.f32() < args.planted {
            planted += 1;
            emit_sequence(&hmm, &bg, mode, args.seq_length, &mut rng).0
        } else {
            DigitalSeq::random(abc, args.seq_length, &mut rng)
        };
        seqs.push((format!("seq{n:05}"), dsq));
    }
    info!("generated {} targets ({planted} emitted from the model)", seqs.len());

    // ----------------------------- Run the cascade.
    let config = PipelineConfig {
        tau_sparse: args.tau_sparse,
        msv_p: args.msv_p,
        vf_p: args.vf_p,
        ff_p: args.ff_p,
        mass_trace_epsilon: args.mass_epsilon,
        simd_width: width,
        require_vit_ii_negative: true,
    };
    let results = run_sharded(&gp, &om, &bg, config, &seqs, args.workers, None)
        .loc("Pipeline run failed")?;

    let mut lines = Vec::new();
    let mut skipped = 0_usize;
    for (name, outcome) in results {
        match outcome {
            SequenceOutcome::Reported(records) => {
                lines.extend(records.iter().map(ToString::to_string));
            }
            SequenceOutcome::Skipped { stage, pvalue } => {
                match pvalue {
                    Some(p) => debug!("{name}: skipped at {stage} (P={p:.3e})"),
                    None => debug!("{name}: skipped at {stage} (empty posterior mask)"),
                }
                skipped += 1;
            }
        }
    }
    info!("{} domains reported, {skipped} sequences gated out", lines.len());
    Ok(lines)
}
