//! SDL CLI - run System Design Language programs
//!
//! Provides subcommands for evaluating programs and inspecting the
//! registered component types.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sdl::{Environment, Interpreter, InterpreterConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sdl")]
#[command(about = "Instantiate components and evaluate method calls", long_about = None)]
struct Cli {
    /// Interpreter configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a program and print the result of each expression statement
    Run {
        /// Source file
        file: PathBuf,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered component types
    Components,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => InterpreterConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => InterpreterConfig::default(),
    };

    match cli.command {
        Commands::Run { file, json } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let mut interpreter = Interpreter::new(config);
            let env = Environment::new();
            let results = interpreter.run_source(&source, &env)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for (idx, result) in results.iter().enumerate() {
                    println!("[{}] {}", idx, result);
                }
            }
        }

        Commands::Components => {
            let interpreter = Interpreter::new(config);
            println!("Registered components:");
            for name in interpreter.registry().list_types() {
                println!("  {}", name);
            }
        }

        Commands::InitConfig { path } => {
            InterpreterConfig::default().save(&path)?;
            println!("Wrote default configuration to {:?}", path);
        }
    }

    Ok(())
}
