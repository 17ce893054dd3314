mod commands;
mod config;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use rfkit_core::{FileSystemWorkspace, LanguageVersion, ProjectContext};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Parse, write back and resolve tabular keyword-driven test suites.
#[derive(Parser)]
#[command(
    name = "rfkit",
    version,
    about = "Parse, write back and resolve tabular keyword-driven test suites"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Project configuration file (default: ./rfkit.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Language version to parse for, e.g. 6.1 (overrides the config file)
    #[arg(long = "language-version", global = true)]
    language_version: Option<LanguageVersion>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and summarize its tables
    Parse {
        /// Path to the source file
        file: PathBuf,
        /// Print the whole model instead of a summary (JSON output only)
        #[arg(long)]
        full: bool,
    },

    /// Parse and write back a file, failing on any byte difference
    Roundtrip {
        /// Path to the source file
        file: PathBuf,
    },

    /// List the imports of a file and where they resolve
    Imports {
        /// Path to the source file
        file: PathBuf,
    },

    /// List keywords accessible from a file, grouped by scope
    Keywords {
        /// Path to the source file
        file: PathBuf,
        /// Also list keywords of known libraries the file does not import
        #[arg(long)]
        unimported: bool,
    },

    /// Find the keywords a usage name may refer to
    Find {
        /// Path to the file containing the usage
        file: PathBuf,
        /// Keyword name as written at the call site
        usage: String,
    },

    /// List variables visible in a file
    Variables {
        /// Path to the source file
        file: PathBuf,
        /// 1-based line of the usage; includes local variables in scope there
        #[arg(long)]
        line: Option<u32>,
        /// Resolve one variable instead of listing all
        #[arg(long)]
        name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project = load_project(&cli);
    let (output, quiet) = (cli.output, cli.quiet);
    match cli.command {
        Commands::Parse { file, full } => {
            commands::parse::cmd_parse(&project, &file, full, output, quiet);
        }
        Commands::Roundtrip { file } => {
            commands::roundtrip::cmd_roundtrip(&project, &file, output, quiet);
        }
        Commands::Imports { file } => {
            commands::imports::cmd_imports(&project, &file, output, quiet);
        }
        Commands::Keywords { file, unimported } => {
            commands::keywords::cmd_keywords(&project, &file, unimported, output, quiet);
        }
        Commands::Find { file, usage } => {
            commands::find::cmd_find(&project, &file, &usage, output, quiet);
        }
        Commands::Variables { file, line, name } => {
            commands::variables::cmd_variables(
                &project,
                &file,
                line,
                name.as_deref(),
                output,
                quiet,
            );
        }
    }
}

fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(verbose))),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "rfkit_cli=warn,rfkit_core=warn",
        1 => "rfkit_cli=debug,rfkit_core=debug",
        _ => "rfkit_cli=trace,rfkit_core=trace",
    }
}

fn load_project(cli: &Cli) -> ProjectContext {
    let mut project = match config::load(cli.config.as_deref()) {
        Ok(project) => project,
        Err(e) => {
            report_error(&format!("config error: {e}"), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    if let Some(version) = cli.language_version {
        project.version = version;
    }
    ProjectContext::new(project, Arc::new(FileSystemWorkspace))
}

/// Report an error to stderr in the selected format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{msg}"),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}

/// Print a value as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {e}\"}}"));
    println!("{json}");
}
