use anyhow::{Context, Result};
use clap::Parser;
use filesdir_check::config::{Config, TreeSelection};
use filesdir_check::corpus::CorpusOptions;
use filesdir_check::locator::PackageLocator;
use filesdir_check::report::{self, OutputFormat};
use filesdir_check::Checker;
use std::io::{IsTerminal, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ABOUT: &str = "filesdir-check helps locate unused FILESDIR files in Gentoo package trees. \
It looks for references to each file in the relevant ebuilds and reports any files that \
appear to be unreferenced. This is a heuristic check: both false positives and false \
negatives can occur.";

const ARGS_HELP: &str = "Arguments:
  Each of the following is a valid argument:
    category
    package
    category/package";

/// Command line interface configuration using `clap`.
/// This struct defines the arguments and flags accepted by the program.
#[derive(Parser)]
#[command(name = "filesdir-check", version, about = ABOUT, after_help = ARGS_HELP)]
struct Cli {
    /// Categories, packages or category/package names to check.
    /// A bare package name selects that package in every category holding it.
    /// With no arguments, every package in the selected trees is checked.
    arguments: Vec<String>,

    /// Just check the tree at DIR.
    /// This replaces the configured main tree for this run only,
    /// and cannot be combined with --overlays.
    #[arg(short, long, value_name = "DIR", conflicts_with = "overlays")]
    directory: Option<PathBuf>,

    /// Check all overlays instead of the main tree.
    /// Overlays come from the config file or from PORTDIR_OVERLAY.
    #[arg(short, long)]
    overlays: bool,

    /// TOML file setting `main_tree` and `overlays`.
    /// PORTDIR and PORTDIR_OVERLAY in the environment still take precedence
    /// over the values read from this file.
    #[arg(short, long, value_name = "FILE", env = "FILESDIR_CHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Search ebuild text as-is, without removing quotes or substituting
    /// ${PN}, ${PV}, ${P} and friends.
    /// Without this flag `"${FILESDIR}"/${P}-fix.patch` matches `foo-1.2-fix.patch`.
    #[arg(long)]
    literal: bool,

    /// Number of worker threads.
    /// Packages are checked in parallel; by default one thread per CPU is used.
    #[arg(short, long, value_name = "N")]
    jobs: Option<NonZeroUsize>,

    /// Output the report as JSON.
    /// The JSON includes every checked package, the first reference found for
    /// each referenced file, and the run summary.
    #[arg(long, conflicts_with = "quiet")]
    json: bool,

    /// Print only the paths of unreferenced files, one per line.
    /// Each path is the full path of the file, starting with its tree root.
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output.
    /// Color is also disabled when stdout is not a terminal.
    #[arg(long)]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    /// Logs go to stderr; RUST_LOG overrides this flag when set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    // Parse command line arguments using the Cli struct definition.
    let cli = Cli::parse();

    // Logging is set up before anything else so tree opening can be traced.
    init_logging(cli.verbose);

    // Errors are reported in one line, with their context chain, and turn
    // into a failing exit status.
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("filesdir-check: error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never mix with the report. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    // Work out which tree roots to scan.
    let config = Config::load(cli.config.as_deref())?;
    let selection = match (&cli.directory, cli.overlays) {
        (Some(dir), _) => TreeSelection::Directory(dir.clone()),
        (None, true) => TreeSelection::Overlays,
        (None, false) => TreeSelection::Main,
    };
    let roots = config.tree_roots(&selection)?;

    // Everything is resolved up front; a bad tree or argument aborts before scanning.
    let locator = PackageLocator::new(&roots)?;
    let packages = locator.locate(&cli.arguments)?;
    info!(packages = packages.len(), trees = roots.len(), "starting check");

    // Check every package and collect the per-package reports.
    let checker = Checker::new(
        CorpusOptions {
            normalize: !cli.literal,
        },
        cli.jobs.map(NonZeroUsize::get),
    );
    let result = checker.check(&packages);

    // Render the report in the requested format and write it to stdout.
    let format = if cli.json {
        OutputFormat::Json
    } else if cli.quiet {
        OutputFormat::Flat
    } else {
        OutputFormat::Text
    };
    let rendered = report::render(&result, format).context("failed to serialize report")?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .context("failed to write report")?;

    // Skipped packages are still visible when only paths are printed.
    if format == OutputFormat::Flat {
        for pkg in result.packages.iter().filter(|p| p.is_skipped()) {
            if let Some(warning) = &pkg.warning {
                eprintln!("filesdir-check: warning: {}: {}", pkg.package, warning);
            }
        }
    }
    Ok(())
}
