use filesdir_check::checker::Checker;
use filesdir_check::locator::PackageLocator;
use filesdir_check::report::{render, render_flat, render_text, OutputFormat};
use std::fs;
use tempfile::tempdir;

fn sample_report() -> (tempfile::TempDir, filesdir_check::CheckReport) {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("dev-libs/libexample");
    fs::create_dir_all(pkg.join("files")).unwrap();
    fs::write(
        pkg.join("libexample-1.0.ebuild"),
        "PATCHES=( \"${FILESDIR}\"/fix-build.patch )\n",
    )
    .unwrap();
    fs::write(pkg.join("files/fix-build.patch"), "").unwrap();
    fs::write(pkg.join("files/unused.conf"), "").unwrap();

    let clean = dir.path().join("dev-libs/clean");
    fs::create_dir_all(&clean).unwrap();
    fs::write(clean.join("clean-1.ebuild"), "").unwrap();

    let locator = PackageLocator::new(&[dir.path().to_path_buf()]).unwrap();
    let packages = locator.locate(&[]).unwrap();
    let report = Checker::default().check(&packages);
    (dir, report)
}

#[test]
fn test_text_report_groups_by_package() {
    colored::control::set_override(false);
    let (_dir, report) = sample_report();

    let text = render_text(&report);
    assert_eq!(
        text,
        "dev-libs/libexample\n  unused.conf\n\n1 unreferenced file(s) in 2 package(s) checked\n"
    );
}

#[test]
fn test_flat_report() {
    let (dir, report) = sample_report();
    let expected = dir.path().join("dev-libs/libexample/files/unused.conf");
    assert_eq!(render_flat(&report), format!("{}\n", expected.display()));
}

fn overlay_with_stale_patch() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("dev-libs/foo");
    fs::create_dir_all(pkg.join("files")).unwrap();
    fs::write(pkg.join("foo-1.ebuild"), "EAPI=8\n").unwrap();
    fs::write(pkg.join("files/x.patch"), "").unwrap();
    dir
}

#[test]
fn test_same_package_in_two_trees_is_distinguishable() {
    colored::control::set_override(false);
    let one = overlay_with_stale_patch();
    let two = overlay_with_stale_patch();
    let locator =
        PackageLocator::new(&[one.path().to_path_buf(), two.path().to_path_buf()]).unwrap();
    let report = Checker::default().check(&locator.locate(&[]).unwrap());

    let flat = render_flat(&report);
    let lines: Vec<&str> = flat.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_ne!(lines[0], lines[1]);
    assert!(lines[0].starts_with(&one.path().display().to_string()));
    assert!(lines[1].starts_with(&two.path().display().to_string()));

    let text = render_text(&report);
    assert!(text.contains(&format!("dev-libs/foo ({})", one.path().display())));
    assert!(text.contains(&format!("dev-libs/foo ({})", two.path().display())));
}

#[test]
fn test_json_report() {
    let (_dir, report) = sample_report();
    let json = render(&report, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["summary"]["unreferenced_files"], 1);
    assert_eq!(value["summary"]["packages_checked"], 2);
    let packages = value["packages"].as_array().unwrap();
    assert_eq!(packages.len(), 2);
    let example = packages
        .iter()
        .find(|p| p["package"]["package"] == "libexample")
        .unwrap();
    assert_eq!(example["unreferenced"], serde_json::json!(["unused.conf"]));
    assert_eq!(
        example["referenced"][0]["reference"]["ebuild"],
        "libexample-1.0.ebuild"
    );
}
