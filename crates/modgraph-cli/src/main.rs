#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "modgraph: D module import graphs, cycle detection and incremental builds",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Render the import graph in graphviz format",
        after_help = "EXAMPLES:\n    # Whole graph, cycles highlighted in red\n    modgraph graph deps.txt deps.dot\n\n    # Only the cycles, piped into dot\n    modgraph graph deps.txt - --cycles-only | dot -Tsvg -o cycles.svg\n\n    # Who imports app.util, at most two hops away?\n    modgraph graph deps.txt - --imports app.util --depth 2"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        about = "List import cycles",
        after_help = "EXAMPLES:\n    # Package-level cycles as JSON\n    modgraph cycles deps.txt --packages --json"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        about = "Compile and link a program if its sources changed",
        after_help = "EXAMPLES:\n    # Debug build of src/app.d into bin/app\n    modgraph build src/app.d\n\n    # Optimized build with ldc\n    modgraph build src/app.d --release --compiler ldc\n\n    # Remove every target's working directory\n    modgraph build clean"
    )]
    Build(cmd::build::BuildArgs),
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        match &self.command {
            Commands::Cycles(args) => OutputMode::from_json_flag(args.json),
            Commands::Graph(_) | Commands::Build(_) => OutputMode::Human,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MODGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "modgraph=debug,info"
        } else {
            "modgraph=info,warn"
        })
    });

    let format = env::var("MODGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs share stderr with error reports; stdout carries command output.
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(?cli, "parsed arguments");

    let mode = cli.output_mode();
    let result = env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|project_root| match &cli.command {
            Commands::Graph(args) => cmd::graph::run_graph(args, &project_root),
            Commands::Cycles(args) => cmd::cycles::run_cycles(args, &project_root),
            Commands::Build(args) => cmd::build::run_build(args, &project_root),
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::render_error(mode, &cmd::cli_error(&err));
            ExitCode::FAILURE
        }
    }
}
