use crate::corpus::{self, CorpusOptions};
use crate::error::Result;
use crate::filesdir;
use crate::locator::PackageDir;
use crate::matcher::{Reference, ReferenceMatcher};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// A FILESDIR file found in an ebuild.
#[derive(Debug, Clone, Serialize)]
pub struct ReferencedFile {
    /// Path relative to `files/`.
    pub relative_path: String,
    /// Where the file name was first seen.
    pub reference: Reference,
}

/// Outcome of checking one package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    /// The package that was checked.
    pub package: PackageDir,
    /// Number of ebuilds searched.
    pub ebuilds: usize,
    /// Number of FILESDIR files classified.
    pub files_checked: usize,
    /// Relative paths of files no ebuild mentions, sorted.
    pub unreferenced: Vec<String>,
    /// Files some ebuild mentions.
    pub referenced: Vec<ReferencedFile>,
    /// Set when the package was skipped because it could not be read.
    pub warning: Option<String>,
}

impl PackageReport {
    fn skipped(package: PackageDir, warning: String) -> Self {
        Self {
            package,
            ebuilds: 0,
            files_checked: 0,
            unreferenced: Vec::new(),
            referenced: Vec::new(),
            warning: Some(warning),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.warning.is_some()
    }
}

/// Totals across a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub packages_checked: usize,
    pub packages_skipped: usize,
    pub files_checked: usize,
    pub unreferenced_files: usize,
}

/// Results of a run, in locator order.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub packages: Vec<PackageReport>,
    pub summary: CheckSummary,
}

impl CheckReport {
    fn new(packages: Vec<PackageReport>) -> Self {
        let mut summary = CheckSummary::default();
        for report in &packages {
            if report.is_skipped() {
                summary.packages_skipped += 1;
            } else {
                summary.packages_checked += 1;
            }
            summary.files_checked += report.files_checked;
            summary.unreferenced_files += report.unreferenced.len();
        }
        Self { packages, summary }
    }

    /// Packages that have unreferenced files or were skipped.
    pub fn findings(&self) -> impl Iterator<Item = &PackageReport> {
        self.packages
            .iter()
            .filter(|r| r.is_skipped() || !r.unreferenced.is_empty())
    }
}

/// Runs the enumerate → load → match pipeline over packages.
#[derive(Debug, Clone, Default)]
pub struct Checker {
    /// How ebuild text is prepared before matching.
    pub corpus_options: CorpusOptions,
    /// Worker threads; `None` uses rayon's global pool.
    pub jobs: Option<usize>,
}

impl Checker {
    pub fn new(corpus_options: CorpusOptions, jobs: Option<usize>) -> Self {
        Self {
            corpus_options,
            jobs,
        }
    }

    /// Checks every package, in parallel.
    ///
    /// Packages share no state, so each is checked independently. A package
    /// that cannot be read is reported with a warning and the run continues.
    pub fn check(&self, packages: &[PackageDir]) -> CheckReport {
        let run = || -> Vec<PackageReport> {
            packages
                .par_iter()
                .map(|pkg| self.check_package_or_skip(pkg))
                .collect()
        };

        let reports = match self.jobs {
            Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    warn!(error = %e, "could not build worker pool, using the global pool");
                    run()
                }
            },
            None => run(),
        };

        CheckReport::new(reports)
    }

    fn check_package_or_skip(&self, pkg: &PackageDir) -> PackageReport {
        match self.check_package(pkg) {
            Ok(report) => report,
            Err(e) => {
                warn!(package = %pkg, error = %e, "skipping package");
                PackageReport::skipped(pkg.clone(), e.to_string())
            }
        }
    }

    /// Checks one package.
    pub fn check_package(&self, pkg: &PackageDir) -> Result<PackageReport> {
        let entries = filesdir::enumerate(&pkg.files_dir())?;
        if entries.is_empty() {
            debug!(package = %pkg, "no FILESDIR files");
            return Ok(PackageReport {
                package: pkg.clone(),
                ebuilds: 0,
                files_checked: 0,
                unreferenced: Vec::new(),
                referenced: Vec::new(),
                warning: None,
            });
        }

        let corpus = corpus::load(pkg, self.corpus_options)?;
        let results = ReferenceMatcher::for_entries(&entries).classify_all(&corpus);

        let mut unreferenced = Vec::new();
        let mut referenced = Vec::new();
        for (entry, result) in entries.iter().zip(results) {
            match result.reference {
                Some(reference) => referenced.push(ReferencedFile {
                    relative_path: entry.relative_path.clone(),
                    reference,
                }),
                None => unreferenced.push(entry.relative_path.clone()),
            }
        }
        unreferenced.sort();

        debug!(
            package = %pkg,
            ebuilds = corpus.len(),
            files = entries.len(),
            unreferenced = unreferenced.len(),
            "checked package"
        );

        Ok(PackageReport {
            package: pkg.clone(),
            ebuilds: corpus.len(),
            files_checked: entries.len(),
            unreferenced,
            referenced,
            warning: None,
        })
    }
}
