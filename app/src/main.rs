use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use fwdiff::{Composition, Scheme, StepStudy};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "fwdiff")]
#[command(about = "Forward-mode differentiation of elementary compositions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Composition listing (defaults to y = cos(x^pi) * log(x))
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Apply the composition this many times, g(g(...g(x)))
    #[arg(short = 'n', long, default_value = "1")]
    iterations: usize,
}

impl Source {
    fn load(&self) -> Result<Composition> {
        let base = match &self.file {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                text.parse::<Composition>()
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => Composition::notebook_example(),
        };
        info!("{} step(s), {} iteration(s)", base.len(), self.iterations);
        Ok(base.repeat(self.iterations))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Value and derivatives at one or more points
    Eval {
        #[command(flatten)]
        source: Source,

        /// Evaluation points
        #[arg(short, long, num_args = 1.., allow_negative_numbers = true, default_values_t = vec![1.9])]
        x: Vec<f64>,
    },

    /// Print the listing and the expression it computes
    Show {
        #[command(flatten)]
        source: Source,
    },

    /// Finite-difference error against forward mode over a range of steps
    Steps {
        #[command(flatten)]
        source: Source,

        /// Evaluation point
        #[arg(short, long, allow_negative_numbers = true, default_value = "1.9")]
        x: f64,

        /// Number of log-spaced steps between 1e-1 and 1e-15
        #[arg(short, long, default_value = "15")]
        count: usize,
    },
}

/// One block per point. Only a failed forward-mode evaluation counts as a
/// failure; the second derivative and the centered estimate are checks, and
/// their errors are reported on the row.
fn eval(composition: &Composition, points: &[f64], out: &mut impl Write) -> Result<()> {
    let mut failed = 0;
    for &x in points {
        let y = match composition.evaluate(x) {
            Ok(y) => y,
            Err(e) => {
                writeln!(out, "x = {x}: {e}")?;
                failed += 1;
                continue;
            }
        };
        writeln!(out, "x = {x}")?;
        writeln!(out, "  y        = {:.17}", y.value())?;
        writeln!(out, "  dy/dx    = {:.17}", y.derivative())?;

        match composition.second_derivative(x) {
            Ok((_, dy, d2y)) => {
                if (dy - y.derivative()).abs() > 1e-12 * y.derivative().abs().max(1.0) {
                    warn!("x = {x}: interpreters differ by {:e}", (dy - y.derivative()).abs());
                }
                writeln!(out, "  d2y/dx2  = {d2y:.17}")?;
            }
            Err(e) => writeln!(out, "  d2y/dx2  = n/a ({e})")?,
        }

        let h = Scheme::Centered.default_step(x);
        match Scheme::Centered.try_estimate(|t| composition.value(t), x, h) {
            Ok(fd) => writeln!(
                out,
                "  centered = {fd:.17} (h = {h:.3e}, error {:.3e})",
                (fd - y.derivative()).abs()
            )?,
            Err(e) => writeln!(out, "  centered = n/a ({e})")?,
        }
    }
    if failed > 0 {
        bail!("{failed} point(s) could not be evaluated");
    }
    Ok(())
}

fn show(composition: &Composition) {
    print!("{composition}");
    println!("y = {}", composition.expression());
}

fn steps(composition: &Composition, x: f64, count: usize) -> Result<()> {
    let study = StepStudy::for_composition(composition, x, StepStudy::log_spaced_steps(count))?;

    println!("x = {}, forward mode dy/dx = {:.17}", study.x(), study.exact());
    println!("{:>10}  {:>12}  {:>12}", "h", "forward", "centered");
    for (h, forward, centered) in study.rows() {
        println!("{h:>10.1e}  {forward:>12.3e}  {centered:>12.3e}");
    }
    for scheme in [Scheme::Forward, Scheme::Centered] {
        let (h, err) = study.best_step(scheme);
        println!(
            "best {} step {h:.1e} (error {err:.3e}), heuristic {:.1e}",
            scheme.name(),
            scheme.default_step(x)
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval { source, x } => eval(&source.load()?, &x, &mut io::stdout().lock())?,
        Commands::Show { source } => show(&source.load()?),
        Commands::Steps { source, x, count } => steps(&source.load()?, x, count)?,
    }

    Ok(())
}
