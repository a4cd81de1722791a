//! nestml - neuron/synapse model front end
//!
//! Parses and validates a model file, optionally rewrites it from the output
//! of an external ODE solver, and prints the result.
//!
//! # Usage
//!
//! ```bash
//! nestml iaf_psc_alpha.nestml --solver iaf_psc_alpha.json --print
//! ```

use std::path::PathBuf;

use clap::Parser;
use nestml_frontend::{
    error::Result, Frontend, FrontendConfig, FrontendError, NeuronOrSynapse, Severity,
    SolverOutput,
};

/// Neuron/synapse model front end
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the model file (.nestml)
    #[arg(value_name = "MODEL_FILE")]
    model_file: PathBuf,

    /// Solver output (JSON) to apply as exact solution
    #[arg(short, long, value_name = "JSON")]
    solver: Option<PathBuf>,

    /// Model the solver output applies to (defaults to the first model)
    #[arg(short, long)]
    model: Option<String>,

    /// Print the (transformed) models
    #[arg(short, long)]
    print: bool,

    /// Print the symbols of each model
    #[arg(long)]
    symbols: bool,

    /// Keep the equations block after applying the solver output
    #[arg(long)]
    keep_equations: bool,

    /// Treat validation warnings as errors
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let config = FrontendConfig::new()
        .with_remove_equations_block(!args.keep_equations)
        .with_warnings_as_errors(args.strict);
    let mut frontend = Frontend::with_config(config);

    let loaded = frontend.load_file(&args.model_file);
    report(&frontend);
    let mut models = loaded?;

    if let Some(path) = &args.solver {
        let output = SolverOutput::from_file(path)?;
        let target = match &args.model {
            Some(name) => models.iter_mut().find(|m| &m.name == name),
            None => models.first_mut(),
        };
        let Some(target) = target else {
            return Err(FrontendError::InvalidSolverOutput {
                message: format!(
                    "no model '{}' in {}",
                    args.model.as_deref().unwrap_or_default(),
                    args.model_file.display()
                ),
            });
        };
        let before = frontend.diagnostics().len();
        let applied = frontend.apply_solver_output(target, &output);
        for diagnostic in frontend.diagnostics().iter().skip(before) {
            eprintln!("{}", diagnostic);
        }
        applied?;
    }

    for model in &models {
        if args.symbols {
            print_symbols(model)?;
        }
        if args.print {
            println!("{}", model.print());
        }
    }

    Ok(())
}

fn report(frontend: &Frontend) {
    let diagnostics = frontend.diagnostics();
    for diagnostic in diagnostics.iter() {
        eprintln!("{}", diagnostic);
    }
    if !diagnostics.is_empty() {
        eprintln!(
            "{} error(s), {} warning(s)",
            diagnostics.count(Severity::Error),
            diagnostics.count(Severity::Warning)
        );
    }
}

fn print_symbols(model: &NeuronOrSynapse) -> Result<()> {
    println!("{} {} ({})", model.kind.keyword(), model.name, model.artifact_name);
    let groups = [
        ("parameters", model.get_parameter_symbols()),
        ("state", model.get_state_symbols()),
        ("internals", model.get_internal_symbols()),
        ("initial values", model.get_initial_values_symbols()?),
        ("functions", model.get_function_symbols()),
        ("input buffers", model.get_input_buffers()),
    ];
    for (title, symbols) in groups {
        if symbols.is_empty() {
            continue;
        }
        println!("  {}:", title);
        for symbol in symbols {
            println!("    {}", symbol);
        }
    }
    Ok(())
}
