//! Decides whether FILESDIR files are referenced by a package's ebuilds.
//!
//! A file counts as referenced when its basename occurs anywhere in the text
//! of any ebuild of the package. The search is a literal, case-sensitive
//! substring search: no word boundaries, no shell expansion, no pattern
//! interpretation of either side. `foo.patch` is therefore referenced by a
//! line mentioning `foo.patch.bz2`, while `Foo.patch` is not referenced by
//! `foo.patch`.

use crate::corpus::EbuildCorpus;
use crate::filesdir::FilesDirEntry;
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::Serialize;
use tracing::trace;

/// Where a file name was first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Ebuild file the name occurs in.
    pub ebuild: String,
    /// 1-based line of the occurrence.
    pub line: usize,
    /// Byte offset of the occurrence in the prepared text.
    pub offset: usize,
}

/// Classification of one file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    /// The name that was searched for.
    pub file_name: String,
    /// Whether the name occurs in the corpus.
    pub referenced: bool,
    /// First occurrence, by ebuild order then offset.
    pub reference: Option<Reference>,
}

impl MatchResult {
    fn unreferenced(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            referenced: false,
            reference: None,
        }
    }

    fn referenced(file_name: &str, reference: Reference) -> Self {
        Self {
            file_name: file_name.to_string(),
            referenced: true,
            reference: Some(reference),
        }
    }
}

/// Classifies a single file name against the corpus.
///
/// Each ebuild is scanned in turn and the first occurrence wins.
pub fn classify(file_name: &str, corpus: &EbuildCorpus) -> MatchResult {
    for source in corpus.sources() {
        if let Some(offset) = source.text.find(file_name) {
            return MatchResult::referenced(
                file_name,
                Reference {
                    ebuild: source.name.clone(),
                    line: source.line_of(offset),
                    offset,
                },
            );
        }
    }
    MatchResult::unreferenced(file_name)
}

/// Classifies many file names in one pass per ebuild.
///
/// Results are identical to calling [`classify`] for every name, but the
/// cost is linear in the corpus size plus the total length of the names
/// rather than their product.
pub struct ReferenceMatcher {
    names: Vec<String>,
    automaton: Option<AhoCorasick>,
}

impl ReferenceMatcher {
    /// Builds a matcher for `names`. Duplicate names are allowed and each
    /// gets its own result.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        // Standard match semantics are required for overlapping search, so a
        // name hidden inside another name's occurrence is still reported.
        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&names)
            .ok();
        Self { names, automaton }
    }

    /// Builds a matcher for the names of a package's FILESDIR entries.
    pub fn for_entries(entries: &[FilesDirEntry]) -> Self {
        Self::new(entries.iter().map(|e| e.name.clone()))
    }

    /// Classifies every name, in the order given to [`ReferenceMatcher::new`].
    pub fn classify_all(&self, corpus: &EbuildCorpus) -> Vec<MatchResult> {
        let automaton = match &self.automaton {
            Some(automaton) => automaton,
            // Building only fails for pattern sets far beyond any real FILESDIR.
            None => return self.names.iter().map(|n| classify(n, corpus)).collect(),
        };

        let mut found: Vec<Option<Reference>> = vec![None; self.names.len()];
        let mut remaining = self.names.len();

        for source in corpus.sources() {
            if remaining == 0 {
                break;
            }
            // Occurrences of one name all have the same length, so the first
            // one reported for it is also its leftmost.
            for m in automaton.find_overlapping_iter(&source.text) {
                let slot = &mut found[m.pattern().as_usize()];
                if slot.is_none() {
                    *slot = Some(Reference {
                        ebuild: source.name.clone(),
                        line: source.line_of(m.start()),
                        offset: m.start(),
                    });
                    remaining -= 1;
                }
            }
        }

        self.names
            .iter()
            .zip(found)
            .map(|(name, reference)| {
                trace!(name = %name, referenced = reference.is_some(), "classified");
                match reference {
                    Some(r) => MatchResult::referenced(name, r),
                    None => MatchResult::unreferenced(name),
                }
            })
            .collect()
    }
}
