// Library root, shared by the binary and the integration tests.

/// Reference matching between FILESDIR file names and ebuild text.
/// This is the heuristic at the heart of the tool.
pub mod matcher;

/// Loading of a package's ebuilds into a searchable corpus,
/// including the standard variable substitution applied before matching.
pub mod corpus;

/// Enumeration of the files under a package's `files/` directory.
pub mod filesdir;

/// Tree opening and resolution of command-line arguments into packages.
pub mod locator;

/// Runs the per-package pipeline over many packages in parallel.
pub mod checker;

/// Text and JSON rendering of a finished run.
pub mod report;

/// Tree locations from config file and environment.
pub mod config;

/// Error types.
pub mod error;

/// Small helpers used across modules.
pub mod utils;

pub use checker::{CheckReport, Checker, PackageReport};
pub use config::{Config, TreeSelection};
pub use corpus::{CorpusOptions, EbuildCorpus, EbuildSource};
pub use error::CheckError;
pub use filesdir::FilesDirEntry;
pub use locator::{PackageDir, PackageLocator};
pub use matcher::{classify, MatchResult, ReferenceMatcher};
