//! Command-line driver for the SPPL interpreter.
//!
//! Loads a program, builds its execution circuit and runs the selected
//! inference method, printing the posterior on standard output. With
//! `-T`/`--time`, the inference wall time (excluding circuit construction)
//! is printed in integer milliseconds on a second line.

use std::{fs, path::PathBuf, process::ExitCode, time::Instant};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sppl_inference::{infer_by_enumeration, infer_by_rejection, Circuit, DEFAULT_SAMPLES};

#[derive(Debug, Parser)]
#[command(name = "sppl", about = "Interpreter for the SPPL probabilistic language")]
struct Cli {
    /// Inference method to run
    #[arg(value_enum)]
    method: Method,
    /// Path to the program file
    file: PathBuf,
    /// Print the inference wall time in milliseconds
    #[arg(short = 'T', long = "time")]
    time: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Exact posterior by aggregation over every leaf path
    Enumerate,
    /// Approximate posterior by direct ancestral sampling
    Rejection,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if !cli.file.is_file() {
        bail!("input filepath does not exist or is not a file");
    }
    let source = fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let program = sppl_parser::parse(&source)?;
    debug!("parsed {} statements from {}", program.body.len(), cli.file.display());

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let circuit = Circuit::build(&program, &mut rng)?;

    let start = Instant::now();
    let posterior = match cli.method {
        Method::Enumerate => infer_by_enumeration(&circuit, &mut rng)?,
        Method::Rejection => infer_by_rejection(&circuit, DEFAULT_SAMPLES, &mut rng)?,
    };
    let elapsed = start.elapsed();

    println!("{posterior}");
    if cli.time {
        println!("{}", elapsed.as_millis());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Method};

    #[test]
    fn accepts_both_methods() {
        let cli = Cli::try_parse_from(["sppl", "enumerate", "model.sppl"]).unwrap();
        assert_eq!(cli.method, Method::Enumerate);
        assert!(!cli.time);
        let cli = Cli::try_parse_from(["sppl", "rejection", "model.sppl"]).unwrap();
        assert_eq!(cli.method, Method::Rejection);
    }

    #[test]
    fn rejects_unknown_methods() {
        assert!(Cli::try_parse_from(["sppl", "variational", "model.sppl"]).is_err());
    }

    #[test]
    fn accepts_both_time_spellings() {
        let cli = Cli::try_parse_from(["sppl", "enumerate", "model.sppl", "-T"]).unwrap();
        assert!(cli.time);
        let cli = Cli::try_parse_from(["sppl", "enumerate", "model.sppl", "--time"]).unwrap();
        assert!(cli.time);
        assert!(Cli::try_parse_from(["sppl", "enumerate", "model.sppl", "--tim"]).is_err());
    }

    #[test]
    fn requires_both_positional_arguments() {
        assert!(Cli::try_parse_from(["sppl", "enumerate"]).is_err());
        assert!(Cli::try_parse_from(["sppl"]).is_err());
    }
}
