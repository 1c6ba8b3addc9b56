use crate::error::{CheckError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level tree directories that never hold packages.
const RESERVED_DIRS: &[&str] = &[
    "profiles",
    "metadata",
    "eclass",
    "licenses",
    "scripts",
    "distfiles",
    "packages",
];

/// One `category/package` directory inside one tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageDir {
    /// Category name (e.g. "dev-libs").
    pub category: String,
    /// Package name (e.g. "libexample").
    pub package: String,
    /// Root of the tree the package belongs to.
    pub root: PathBuf,
    /// Absolute path of the package directory.
    pub path: PathBuf,
}

impl PackageDir {
    pub fn new(root: &Path, category: &str, package: &str) -> Self {
        Self {
            category: category.to_string(),
            package: package.to_string(),
            root: root.to_path_buf(),
            path: root.join(category).join(package),
        }
    }

    /// The `category/package` name.
    pub fn atom(&self) -> String {
        format!("{}/{}", self.category, self.package)
    }

    /// The package's FILESDIR.
    pub fn files_dir(&self) -> PathBuf {
        self.path.join("files")
    }
}

impl fmt::Display for PackageDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.package)
    }
}

/// A package tree root and its category list.
#[derive(Debug, Clone)]
pub struct Tree {
    root: PathBuf,
    categories: Vec<String>,
}

impl Tree {
    /// Opens the tree at `root`, failing if it is not a readable directory.
    ///
    /// Categories come from `profiles/categories` when present, otherwise
    /// from the non-reserved top-level directories.
    pub fn open(root: &Path) -> Result<Self> {
        let tree_access = |source: std::io::Error| CheckError::TreeAccess {
            path: root.to_path_buf(),
            source,
        };
        let metadata = fs::metadata(root).map_err(tree_access)?;
        if !metadata.is_dir() {
            return Err(tree_access(std::io::Error::other("not a directory")));
        }

        let categories = match fs::read_to_string(root.join("profiles").join("categories")) {
            Ok(text) => parse_categories(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                list_subdirs(root)
                    .map_err(tree_access)?
                    .into_iter()
                    .filter(|name| !RESERVED_DIRS.contains(&name.as_str()))
                    .collect()
            }
            Err(e) => return Err(tree_access(e)),
        };
        debug!(root = %root.display(), categories = categories.len(), "opened tree");

        Ok(Self {
            root: root.to_path_buf(),
            categories,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Sorted package names of `category`. A category listed but absent on
    /// disk has no packages.
    pub fn packages(&self, category: &str) -> Result<Vec<String>> {
        let dir = self.root.join(category);
        match list_subdirs(&dir) {
            Ok(packages) => Ok(packages),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(CheckError::io(dir, e)),
        }
    }

    /// Whether `category/package` exists as a directory in this tree.
    pub fn has_package(&self, category: &str, package: &str) -> bool {
        self.has_category(category) && self.root.join(category).join(package).is_dir()
    }
}

/// Parses a `profiles/categories` file: one name per line, `#` comments.
fn parse_categories(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sorted names of the non-hidden subdirectories of `dir`.
fn list_subdirs(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_dir() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// What one command-line argument resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Category(String),
    Package { category: String, package: String },
}

/// Resolves command-line arguments into the package directories to check.
pub struct PackageLocator {
    trees: Vec<Tree>,
}

impl PackageLocator {
    /// Opens every tree root. Any unreadable root fails the whole locator.
    pub fn new(roots: &[PathBuf]) -> Result<Self> {
        let trees = roots
            .iter()
            .map(|root| Tree::open(root))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { trees })
    }

    /// Resolves `arguments` to package directories, tree by tree.
    ///
    /// With no arguments every package of every tree is returned. Each
    /// argument may be a `category`, a `category/package` or a bare `package`
    /// name matched across all categories. Every argument is resolved before
    /// anything is returned, so one bad argument yields an error and nothing else.
    pub fn locate(&self, arguments: &[String]) -> Result<Vec<PackageDir>> {
        let targets = if arguments.is_empty() {
            self.all_categories()
                .into_iter()
                .map(Target::Category)
                .collect()
        } else {
            let mut targets = Vec::new();
            for argument in arguments {
                targets.extend(self.resolve(argument)?);
            }
            targets
        };

        let mut seen = HashSet::new();
        let mut packages = Vec::new();
        for tree in &self.trees {
            for target in &targets {
                for pkg in expand(tree, target)? {
                    if seen.insert(pkg.path.clone()) {
                        packages.push(pkg);
                    }
                }
            }
        }
        debug!(count = packages.len(), "located packages");
        Ok(packages)
    }

    fn all_categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.trees
            .iter()
            .flat_map(|tree| tree.categories().iter())
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect()
    }

    fn resolve(&self, argument: &str) -> Result<Vec<Target>> {
        let not_found = || CheckError::Resolution {
            argument: argument.to_string(),
        };

        if self.trees.iter().any(|tree| tree.has_category(argument)) {
            return Ok(vec![Target::Category(argument.to_string())]);
        }

        if let Some((category, package)) = argument.split_once('/') {
            if !package.is_empty()
                && !package.contains('/')
                && self
                    .trees
                    .iter()
                    .any(|tree| tree.has_package(category, package))
            {
                return Ok(vec![Target::Package {
                    category: category.to_string(),
                    package: package.to_string(),
                }]);
            }
            return Err(not_found());
        }

        // Bare package name: every category holding a package of that name.
        let mut targets = Vec::new();
        for category in self.all_categories() {
            if self
                .trees
                .iter()
                .any(|tree| tree.has_package(&category, argument))
            {
                targets.push(Target::Package {
                    category,
                    package: argument.to_string(),
                });
            }
        }
        if targets.is_empty() {
            return Err(not_found());
        }
        Ok(targets)
    }
}

fn expand(tree: &Tree, target: &Target) -> Result<Vec<PackageDir>> {
    match target {
        Target::Category(category) => Ok(tree
            .packages(category)?
            .iter()
            .map(|package| PackageDir::new(tree.root(), category, package))
            .collect()),
        Target::Package { category, package } => {
            if tree.has_package(category, package) {
                Ok(vec![PackageDir::new(tree.root(), category, package)])
            } else {
                Ok(Vec::new())
            }
        }
    }
}
