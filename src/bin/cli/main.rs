//! CLI tool for jarindex.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use jarindex::normalize::QuirkRule;

use exit_codes::ExitCode;

/// Set by the Ctrl+C handler, checked between artifacts.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Recursive class index tool for JAR, WAR, EAR and RAR archives
#[derive(Parser)]
#[command(name = "jarindex")]
#[command(author, version, about = "Recursive class index tool for JAR, WAR, EAR and RAR archives", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Verbose logging (repeat for more)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Index artifacts, recursing into nested archives (alias: i)
    #[command(alias = "i")]
    Index {
        /// Artifacts to index
        #[arg(required = true)]
        artifacts: Vec<PathBuf>,

        /// Where fresh indices are stored
        #[arg(long, value_enum, default_value = "embedded")]
        placement: Placement,

        /// Write <stem><SUFFIX>.<ext> instead of replacing the artifact
        #[arg(long, num_args = 0..=1, default_missing_value = jarindex::options::DEFAULT_REPACKAGE_SUFFIX)]
        repackage: Option<String>,

        /// Re-measure ARCHIVE:ENTRY while rewriting (ARCHIVE may be '*')
        #[arg(long, value_name = "ARCHIVE:ENTRY")]
        repair: Vec<QuirkRule>,

        /// Store index entries uncompressed
        #[arg(long)]
        stored_index: bool,

        /// Parent directory for scratch storage
        #[arg(long, env = "JARINDEX_SCRATCH_DIR")]
        scratch_dir: Option<PathBuf>,

        /// Do nothing
        #[arg(long, env = "JARINDEX_SKIP")]
        skip: bool,
    },

    /// Write <jar>.index next to every jar in a directory
    Folder {
        /// Directory holding the jars
        dir: PathBuf,
    },

    /// Show what indexing would do, without writing
    Inspect {
        /// Artifact to inspect
        artifact: PathBuf,
    },

    /// Decode an index produced by the default writer
    Dump {
        /// Index file, or an archive holding META-INF/jandex.idx
        index: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Placement {
    Embedded,
    Sibling,
}

impl From<Placement> for jarindex::IndexPlacement {
    fn from(placement: Placement) -> Self {
        match placement {
            Placement::Embedded => jarindex::IndexPlacement::Embedded,
            Placement::Sibling => jarindex::IndexPlacement::Sibling,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() {
    // Ctrl+C stops after the current artifact, so scratch and staging files are cleaned up
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, finishing current artifact");
        INTERRUPTED.store(true, Ordering::SeqCst);
    })
    .ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let exit_code = match cli.command {
        Commands::Index {
            artifacts,
            placement,
            repackage,
            repair,
            stored_index,
            scratch_dir,
            skip,
        } => commands::index(&commands::IndexConfig {
            artifacts: &artifacts,
            placement,
            repackage,
            repair,
            stored_index,
            scratch_dir,
            skip,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Folder { dir } => commands::folder(&dir, cli.format, cli.quiet),

        Commands::Inspect { artifact } => commands::inspect(&artifact, cli.format),

        Commands::Dump { index } => commands::dump(&index, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
