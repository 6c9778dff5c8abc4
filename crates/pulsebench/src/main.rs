#![deny(clippy::all)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pulsebench::{playback, save_load};
use pulsebench_state::{rate, State};

#[derive(Parser)]
#[command(name = "pulsebench")]
#[command(about = "Export and check digital timing pattern tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a pattern snapshot into a logic analyzer CSV table
    Export {
        pattern: PathBuf,
        output: PathBuf,
        /// Sample rate in Hz, inferred from the pattern when omitted
        #[arg(long)]
        rate: Option<u64>,
        /// Stretch the table onto a four sample boundary for cyclic replay
        #[arg(long)]
        cyclic: bool,
    },
    /// Decode an exported table and report its playback parameters
    Check {
        table: PathBuf,
        /// Validate the buffer for cyclic replay as well
        #[arg(long)]
        cyclic: bool,
    },
    /// Summarize a pattern snapshot
    Info { pattern: PathBuf },
    /// Write a blank snapshot with the device's full channel set
    New { pattern: PathBuf },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            pattern,
            output,
            rate,
            cyclic,
        } => {
            let state = save_load::load(&pattern)?;
            let summary = save_load::export(&state, &output, rate, cyclic)?;

            println!(
                "exported {} samples at {} Hz to {}",
                summary.sample_count,
                summary.sample_rate,
                output.display()
            );
        }
        Commands::Check { table, cyclic } => {
            let (buffer, sample_rate) = save_load::check(&table)?;
            let plan = playback::PlaybackPlan::new(buffer, sample_rate, cyclic)?;

            println!(
                "{} samples at {} Hz, {:.6} s per pass{}",
                plan.buffer().len(),
                plan.sample_rate(),
                plan.duration().as_secs_f64(),
                if plan.cyclic() { ", cyclic" } else { "" }
            );
        }
        Commands::Info { pattern } => {
            let state = save_load::load(&pattern)?;

            for channel in state.channels() {
                let tail = channel.timeline().last().copied().unwrap_or(0.0);
                println!(
                    "{}: {} segments, {:.6} s",
                    channel.id(),
                    channel.segments().len(),
                    tail
                );
            }

            match rate::optimal_sample_rate(&state) {
                Ok(sample_rate) => println!("optimal sample rate: {sample_rate} Hz"),
                Err(e) => println!("optimal sample rate: {e}"),
            }
        }
        Commands::New { pattern } => {
            save_load::save(&State::default(), &pattern)?;

            println!("wrote a blank pattern to {}", pattern.display());
        }
    }

    Ok(())
}
