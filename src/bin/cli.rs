use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use ruleforge::config::Config;
use ruleforge::metadata::MetadataContext;
use ruleforge::scanner::Outcome;
use ruleforge::{load_config, RunOptions};

#[derive(Parser)]
#[command(
    name = "ruleforge",
    about = "Compiles threat-indicator tables into Gitleaks, YARA, and ripgrep rule artifacts",
    version,
    author
)]
struct Cli {
    /// Enable debug-level logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline: verify, compile, post-process, scan
    Run {
        /// Working directory holding the table, metadata, and config
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Indicator table (overrides config)
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// File to scan with the generated artifacts (overrides config)
        #[arg(long, short = 't')]
        target: Option<PathBuf>,

        /// Print the run report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Write checksum companions and normalize modes for the registered components
    Seal {
        /// Working directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Load and print the metadata context without running the pipeline
    ShowMetadata {
        /// Working directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Generate a starter ruleforge.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            dir,
            config,
            input,
            target,
            json,
        } => cmd_run(dir, config, input, target, json),
        Commands::Seal { dir, config } => cmd_seal(dir, config),
        Commands::ShowMetadata { dir, config } => cmd_show_metadata(dir, config),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(
    dir: PathBuf,
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    target: Option<PathBuf>,
    json: bool,
) -> Result<i32, ruleforge::error::ForgeError> {
    let options = RunOptions {
        config_path: config,
        input_override: input,
        target_override: target,
    };

    let report = ruleforge::run(&dir, &options)?;

    if json {
        println!("{}", ruleforge::render_report(&report)?);
    } else {
        println!(
            "Compiled {} record(s) into {} artifact(s).",
            report.records,
            report.artifacts.iter().filter(|a| a.error.is_none()).count()
        );
        for warning in &report.row_warnings {
            println!("  skipped line {}: {}", warning.line, warning.reason);
        }
        for scan in &report.scans {
            let outcome = match scan.outcome {
                Some(Outcome::Matched) => "findings",
                Some(Outcome::Clean) => "clean",
                Some(Outcome::ToolMissing) => "tool missing",
                Some(Outcome::Crashed) => "crashed",
                None => "not run",
            };
            println!(
                "  {}: {} ({})",
                scan.scanner,
                outcome,
                scan.log_path.as_deref().unwrap_or("no log")
            );
        }
    }

    // Per-artifact and per-scanner failures are visible in the report
    // and logs but do not change the overall exit code.
    Ok(0)
}

fn cmd_seal(dir: PathBuf, config: Option<PathBuf>) -> Result<i32, ruleforge::error::ForgeError> {
    let options = RunOptions {
        config_path: config,
        ..Default::default()
    };
    let config = load_config(&dir, &options)?;

    for companion in ruleforge::pipeline::seal(&config)? {
        println!("sealed {companion}");
    }
    Ok(0)
}

fn cmd_show_metadata(
    dir: PathBuf,
    config: Option<PathBuf>,
) -> Result<i32, ruleforge::error::ForgeError> {
    let options = RunOptions {
        config_path: config,
        ..Default::default()
    };
    let config = load_config(&dir, &options)?;

    ruleforge::integrity::Component::new(&config.metadata).verify()?;
    let metadata = MetadataContext::load(&config.metadata)?;
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    print!("{}", metadata.summary(&now));
    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, ruleforge::error::ForgeError> {
    let path = PathBuf::from("ruleforge.toml");

    if path.exists() && !force {
        eprintln!("ruleforge.toml already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created ruleforge.toml");

    Ok(0)
}
