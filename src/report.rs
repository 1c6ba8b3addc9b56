use crate::checker::CheckReport;
use colored::*;
use std::fmt::Write;

/// Output format of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Files grouped under a header per package, with a summary.
    Text,
    /// One `<tree>/category/package/files/<path>` line per unreferenced file.
    Flat,
    /// The whole report as pretty-printed JSON.
    Json,
}

/// Renders `report` in the requested format.
pub fn render(report: &CheckReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Flat => Ok(render_flat(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report).map(|mut s| {
            s.push('\n');
            s
        }),
    }
}

/// Human-readable report. Packages without findings are left out.
///
/// When packages come from more than one tree, each header also names the
/// tree root.
pub fn render_text(report: &CheckReport) -> String {
    let mut out = String::new();
    let show_root = spans_several_trees(report);

    for pkg in report.findings() {
        if show_root {
            let _ = writeln!(
                out,
                "{} ({})",
                pkg.package.atom().bold(),
                pkg.package.root.display()
            );
        } else {
            let _ = writeln!(out, "{}", pkg.package.atom().bold());
        }
        if let Some(warning) = &pkg.warning {
            let _ = writeln!(out, "  {} {}", "warning:".yellow().bold(), warning);
            continue;
        }
        for path in &pkg.unreferenced {
            let _ = writeln!(out, "  {}", path);
        }
    }

    let summary = &report.summary;
    if !out.is_empty() {
        out.push('\n');
    }
    let count = if summary.unreferenced_files == 0 {
        summary.unreferenced_files.to_string().green()
    } else {
        summary.unreferenced_files.to_string().red()
    };
    let _ = write!(
        out,
        "{} unreferenced file(s) in {} package(s) checked",
        count, summary.packages_checked
    );
    if summary.packages_skipped > 0 {
        let _ = write!(out, ", {} skipped", summary.packages_skipped);
    }
    out.push('\n');
    out
}

/// Flat listing of full paths, one per line, skipped packages omitted.
pub fn render_flat(report: &CheckReport) -> String {
    let mut out = String::new();
    for pkg in report.findings() {
        for path in &pkg.unreferenced {
            let _ = writeln!(out, "{}", pkg.package.files_dir().join(path).display());
        }
    }
    out
}

fn spans_several_trees(report: &CheckReport) -> bool {
    let mut roots = report.packages.iter().map(|p| &p.package.root);
    match roots.next() {
        Some(first) => roots.any(|root| root != first),
        None => false,
    }
}
