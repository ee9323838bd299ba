use anyhow::Result;
use clap::Parser;
use ibwatch::{cli::Args, logging, run};

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;
    logging::init_logging(args.log_file.as_deref())?;
    run(args)
}
