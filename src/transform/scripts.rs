use std::fs;
use std::process::{Command, Stdio};

use anyhow::Context;
use camino::Utf8Path;
use console::style;

use crate::config::Paths;
use crate::transform::{Pipeline, Summary, lint, relative_to};

/// Produces a bundle from one entry point.
pub(crate) type Bundler = dyn Fn(&Utf8Path) -> anyhow::Result<Vec<u8>> + Send + Sync;

/// Lints and bundles the top-level scripts in `js/` into `js/` in the
/// output dir. Every `js/*.js` file is an entry point; whatever it imports
/// is folded into its bundle, so nested files produce no output of their
/// own.
pub fn run(paths: &Paths) -> anyhow::Result<Summary> {
    run_with(paths, &bundle_esbuild)
}

pub(crate) fn run_with<'a>(paths: &'a Paths, bundler: &'a Bundler) -> anyhow::Result<Summary> {
    let scripts = paths.source.join("js");

    let pipeline = Pipeline {
        name: "js",
        paths,
        select: vec![format!("{scripts}/*.js")],
        exclude: vec![],
        route: Box::new({
            let scripts = scripts.clone();
            move |path| Utf8Path::new("js").join(relative_to(path, &scripts))
        }),
        transform: Box::new(move |path| {
            report_lint(path)?;
            bundler(path)
        }),
    };

    pipeline.run()
}

/// Prints lint findings for one entry point. Findings are advisory; the
/// bundle is built either way.
fn report_lint(path: &Utf8Path) -> anyhow::Result<()> {
    let source = fs::read_to_string(path)?;

    for warning in lint::scan(&source) {
        eprintln!(
            "{} {path}: line {}: {}",
            style("warning").yellow().bold(),
            warning.line,
            warning.message,
        );
    }

    Ok(())
}

fn bundle_esbuild(file: &Utf8Path) -> anyhow::Result<Vec<u8>> {
    let output = Command::new("esbuild")
        .arg(file.as_str())
        .arg("--bundle")
        .arg("--format=esm")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to run esbuild")?;

    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        anyhow::bail!("esbuild exited with {}:\n{stderr}", output.status);
    }

    // esbuild reports warnings on stderr even on success
    if !stderr.trim().is_empty() {
        eprintln!("{stderr}");
    }

    Ok(output.stdout)
}
