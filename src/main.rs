use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stopfile::config::Config;
use stopfile::function_object::{FunctionObjectList, Registry};
use stopfile::runner::Runner;

#[derive(Parser)]
#[command(name = "stopfile")]
#[command(about = "Iterate a case until it ends or an operator drops a stop file")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a run file
    Validate { config: PathBuf },
    /// Run a case
    Run {
        config: PathBuf,
        /// Number of cooperating ranks
        #[arg(long, default_value_t = 1)]
        ranks: usize,
        /// Case directory, overriding the run file
        #[arg(long)]
        case: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            config,
            ranks,
            case,
        } => run(&config, ranks, case),
    }
}

fn validate(path: &Path) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match FunctionObjectList::check(&Registry::with_builtins(), &config.functions) {
        Ok(entries) => {
            println!(
                "Run file is valid ({} iterations, case {})",
                config.control.end_index,
                config.case_root(path).display()
            );
            for (name, type_name) in entries {
                println!("  {}: {}", name, type_name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid function objects: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path, ranks: usize, case: Option<PathBuf>) -> ExitCode {
    let runner = match Runner::from_file(path, case, ranks) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runner.run() {
        Ok(summary) => {
            match serde_yaml::to_string(&summary) {
                Ok(yaml) => print!("{}", yaml),
                Err(e) => eprintln!("Failed to serialize run summary: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
