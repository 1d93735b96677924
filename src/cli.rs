use std::path::{Path, PathBuf};

mod listing;
mod menu;
mod prompt;
mod table;
mod terminal;

use clap::{ArgAction, ValueEnum};
use libman::{
    domain::{Config, LoanDate},
    report::Report as LibraryReport,
    storage::{CONFIG_FILE, Library},
};
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The directory holding the library's data files
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command.unwrap_or(Command::Menu).run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        // stderr keeps log lines out of tables and prompts
        let fmt_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Interactive menu (default)
    Menu,

    /// Create a data directory with a default configuration
    Init,

    /// List books with their available copies
    Books,

    /// List members
    Members,

    /// List borrows with the books still out
    Borrows,

    /// Summarise holdings, loans and fines
    Report(Report),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let library = match self {
            Self::Init => return init(&root),
            _ => Library::open(root),
        };
        match self {
            Self::Init => {}
            Self::Menu => menu::run(&library)?,
            Self::Books => listing::books(&library)?,
            Self::Members => listing::members(&library)?,
            Self::Borrows => listing::borrows(&library)?,
            Self::Report(command) => command.run(&library)?,
        }
        Ok(())
    }
}

#[instrument]
fn init(root: &Path) -> anyhow::Result<()> {
    use std::fs;

    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!(
            "Library already initialized (found existing {})",
            config_path.display()
        );
    }

    fs::create_dir_all(root)
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", root.display()))?;

    Config::default()
        .save(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_FILE}: {e}"))?;

    println!("Initialized library in {}", root.display());
    println!("  Created: {CONFIG_FILE}");
    println!();
    println!("Next steps:");
    println!("  libman --root {} menu", root.display());

    Ok(())
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    Table,
    Json,
}

#[derive(Debug, clap::Parser)]
pub struct Report {
    /// Output format
    #[arg(long, short, value_enum, default_value_t = Output::Table)]
    output: Output,
}

impl Report {
    #[instrument(skip(library))]
    fn run(self, library: &Library) -> anyhow::Result<()> {
        let report = LibraryReport::generate(library, LoanDate::today())?;
        match self.output {
            Output::Table => listing::report(&report),
            Output::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }
        Ok(())
    }
}
