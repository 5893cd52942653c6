// src/main.rs
use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;

use s2_composite::batch::process_batch;
use s2_composite::cli::{Cli, Commands};
use s2_composite::Pipeline;

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => {
            let mut config = args.clone().into_config()?;
            cli.apply_globals(&mut config);

            let task = Pipeline::new(config).run_and_export()?;
            info!("Export submitted: {}", task.path().display());
            let path = task.wait()?;
            println!("Processing complete: {}", path.display());
        }
        Commands::Scenes(args) => {
            let mut config = args.clone().into_config()?;
            cli.apply_globals(&mut config);

            let context = Pipeline::new(config).prepare()?;
            for entry in &context.entries {
                println!(
                    "{}\t{}\t{:.2}%",
                    entry.acquired.format("%Y-%m-%d"),
                    entry.id,
                    entry.cloudy_pixel_percentage
                );
            }
            println!("{} scenes", context.entries.len());
        }
        Commands::Batch { config } => process_batch(config)?,
    }

    Ok(())
}
