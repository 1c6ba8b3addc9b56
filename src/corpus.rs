use crate::error::{CheckError, Result};
use crate::locator::PackageDir;
use crate::utils::LineIndex;
use regex::{Captures, Regex};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Suffix identifying ebuild files inside a package directory.
pub const EBUILD_SUFFIX: &str = ".ebuild";

lazy_static::lazy_static! {
    // Standard ebuild variables in `${VAR}` and `$VAR` form.
    // Alternation is leftmost-first, so `PVR` is tried before `PV` and `P`.
    static ref STANDARD_VARS_RE: Regex =
        Regex::new(r"\$\{(PN|PF|PVR|PV|P)\}|\$(PN|PF|PVR|PV|P)").unwrap();

    // Trailing revision of a version, e.g. `-r3`.
    static ref REVISION_RE: Regex = Regex::new(r"-r[0-9]+$").unwrap();
}

/// How ebuild text is prepared before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusOptions {
    /// Strip double quotes and substitute `PN`, `PF`, `PVR`, `PV`, `P`.
    pub normalize: bool,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self { normalize: true }
    }
}

/// The text of one ebuild.
#[derive(Debug, Clone)]
pub struct EbuildSource {
    /// File name of the ebuild (e.g. "foo-1.2.ebuild").
    pub name: String,
    /// Prepared text searched by the matcher.
    pub text: String,
    line_index: LineIndex,
}

impl EbuildSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_index = LineIndex::new(&text);
        Self {
            name: name.into(),
            text,
            line_index,
        }
    }

    /// 1-based line containing byte `offset` of the text.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_index.line_index(offset)
    }
}

/// Every ebuild of one package, sorted by file name.
///
/// The matcher treats the whole corpus as one search universe.
#[derive(Debug, Clone, Default)]
pub struct EbuildCorpus {
    sources: Vec<EbuildSource>,
}

impl EbuildCorpus {
    pub fn new(mut sources: Vec<EbuildSource>) -> Self {
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Self { sources }
    }

    /// Convenience constructor for a corpus of a single unnamed text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![EbuildSource::new("", text)])
    }

    pub fn sources(&self) -> &[EbuildSource] {
        &self.sources
    }

    /// True when there is no text to search at all.
    pub fn is_empty(&self) -> bool {
        self.sources.iter().all(|s| s.text.is_empty())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

/// Reads every `*.ebuild` directly inside `pkg`.
///
/// A package without ebuilds yields an empty corpus.
pub fn load(pkg: &PackageDir, options: CorpusOptions) -> Result<EbuildCorpus> {
    let entries = match fs::read_dir(&pkg.path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(EbuildCorpus::default()),
        Err(e) => return Err(CheckError::io(&pkg.path, e)),
    };

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CheckError::io(&pkg.path, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(EBUILD_SUFFIX) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let text = read_text(&path)?;
        let text = if options.normalize {
            normalize(&pkg.package, &name, &text)
        } else {
            text
        };
        sources.push(EbuildSource::new(name, text));
    }
    Ok(EbuildCorpus::new(sources))
}

/// Reads a file as UTF-8 (invalid sequences replaced) with `\n` line endings.
fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| CheckError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.replace("\r\n", "\n"))
}

/// Values of the standard variables for one ebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbuildVars {
    pub pn: String,
    pub pf: String,
    pub pvr: String,
    pub pv: String,
    pub p: String,
}

impl EbuildVars {
    /// Derives the variables from the package name and the ebuild's file name.
    pub fn from_file_name(package: &str, file_name: &str) -> Self {
        let pf = file_name
            .strip_suffix(EBUILD_SUFFIX)
            .unwrap_or(file_name)
            .to_string();
        let pvr = pf
            .strip_prefix(package)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(&pf)
            .to_string();
        let pv = REVISION_RE.replace(&pvr, "").into_owned();
        let p = format!("{}-{}", package, pv);
        Self {
            pn: package.to_string(),
            pf,
            pvr,
            pv,
            p,
        }
    }

    fn get(&self, var: &str) -> &str {
        match var {
            "PN" => &self.pn,
            "PF" => &self.pf,
            "PVR" => &self.pvr,
            "PV" => &self.pv,
            _ => &self.p,
        }
    }
}

/// Removes double quotes and substitutes the standard variables.
pub fn normalize(package: &str, file_name: &str, text: &str) -> String {
    let vars = EbuildVars::from_file_name(package, file_name);
    let unquoted = text.replace('"', "");
    STANDARD_VARS_RE
        .replace_all(&unquoted, |caps: &Captures| {
            let var = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            vars.get(var).to_string()
        })
        .into_owned()
}
