// main.rs - `mesh_life run` and `mesh_life create-file`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mesh_life::config::{Cli, Command, CreateFileArgs, Output, RunArgs};
use mesh_life::display::render;
use mesh_life::text_io::write_grid_file;
use mesh_life::{Frame, Outcome, Simulation};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::CreateFile(args) => create_file(args).await,
    }
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let sim = Simulation::new(args.run_config()).context("invalid run configuration")?;
    let seed = args.seed().await.context("could not build the initial grid")?;

    let (frames, printer) = if args.output == Output::Every {
        let (tx, mut rx) = mpsc::channel::<Frame>(4);
        let printer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                println!("generation {}{}", frame.generation, render(&frame.grid));
            }
        });
        (Some(tx), Some(printer))
    } else {
        (None, None)
    };

    let report = sim.run(seed, frames).await?;
    if let Some(printer) = printer {
        printer.await?;
    }
    if args.output == Output::Final {
        print!("{}", render(&report.grid));
    }

    let t = report.timing;
    println!(
        "\n{} updates in {:.6}s (min {:.6}s, avg {:.6}s) across {} processes",
        report.evolutions,
        t.max.as_secs_f64(),
        t.min.as_secs_f64(),
        t.mean.as_secs_f64(),
        sim.decomposition().processes(),
    );

    match report.outcome {
        Outcome::Completed => Ok(ExitCode::SUCCESS),
        Outcome::Extinct { generation } => {
            eprintln!("every cell died by generation {generation}");
            Ok(ExitCode::FAILURE)
        }
        Outcome::Stasis { generation } => {
            eprintln!("grid stopped changing by generation {generation}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn create_file(args: CreateFileArgs) -> Result<ExitCode> {
    let grid = args.grid()?;
    write_grid_file(&args.path, &grid)
        .await
        .with_context(|| format!("could not write {}", args.path.display()))?;
    info!(path = %args.path.display(), side = grid.side(), live = grid.live_count(), "grid file created");
    Ok(ExitCode::SUCCESS)
}
