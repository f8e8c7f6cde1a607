use std::process;

use clap::Parser;

#[macro_use]
extern crate log;

/// Parse command line arguments and hand them to `stria_rs::run()`.
fn main() {
    let cli = parser::Cli::parse();

    // ----------------------------- Init logger.
    logger::init_logger(&(cli.verbose + (!cli.quiet as u8)));

    // ----------------------------- Run.
    if let Err(e) = stria_rs::run(cli) {
        error!("{e:?}");
        process::exit(1);
    }
}
