use std::thread;

use camino::Utf8Path;
use console::style;

use crate::clean;
use crate::config::{Mode, Paths};
use crate::error::{KilnError, RegistryError};
use crate::executor;
use crate::minify;
use crate::registry::{Registry, TaskGraph};
use crate::transform::{images, markup, scripts, styles};
use crate::{serve, watch};

/// Wires up every pipeline task for the given layout and mode.
///
/// `compile` is an umbrella task: it has no body of its own and exists to
/// pull in the four transforms as dependencies.
pub fn registry(paths: &Paths, mode: Mode) -> Result<TaskGraph, RegistryError> {
    let mut tasks = Registry::new();

    let p = paths.clone();
    tasks.add("styles", &[], move || styles::run(&p).map(|_| ()));

    let p = paths.clone();
    tasks.add("js", &[], move || scripts::run(&p).map(|_| ()));

    let p = paths.clone();
    tasks.add("html", &[], move || markup::run(&p, mode).map(|_| ()));

    let p = paths.clone();
    tasks.add("images", &[], move || images::run(&p).map(|_| ()));

    tasks.add("compile", &["styles", "js", "html", "images"], || Ok(()));

    let p = paths.clone();
    tasks.add("clean", &[], move || Ok(clean::clean(&p)?));

    let p = paths.clone();
    tasks.add("minify", &[], move || minify::run(&p).map(|_| ()));

    tasks.seal()
}

/// Runs one task and its dependencies.
///
/// Standalone tasks use the development layout and build mode, so pages
/// come out without the live reload hook.
pub fn run_task(root: impl AsRef<Utf8Path>, name: &str) -> Result<(), KilnError> {
    let paths = Paths::dev(root);
    let tasks = registry(&paths, Mode::Build)?;

    executor::run(&tasks, name)?;

    Ok(())
}

/// Watches the source tree in the development layout until interrupted.
pub fn watch(root: impl AsRef<Utf8Path>) -> Result<(), KilnError> {
    let paths = Paths::dev(root);
    let tasks = registry(&paths, Mode::Watch)?;

    watch::watch(&paths, &tasks)?;

    Ok(())
}

/// Serves the development output until interrupted, then clears it.
pub fn serve(root: impl AsRef<Utf8Path>) -> Result<(), KilnError> {
    let paths = Paths::dev(root);

    serve::serve(&paths, on_close(&paths))?;

    Ok(())
}

/// Runs the development pipeline.
///
/// Compiles everything from scratch into the serve directory, then keeps
/// a watcher and an HTTP server running until interrupted. Closing the
/// server clears the serve directory.
pub fn dev(root: impl AsRef<Utf8Path>) -> Result<(), KilnError> {
    eprintln!(
        "Running {} in {} mode.",
        style("kiln").red(),
        style("dev").blue()
    );

    let paths = Paths::dev(root);
    let tasks = registry(&paths, Mode::Watch)?;

    executor::run_sequence(&tasks, &[&["clean"], &["compile"]])?;

    let watched = paths.clone();
    thread::spawn(move || {
        if let Err(err) = watch::watch(&watched, &tasks) {
            // The server would keep handing out stale output without a watcher.
            eprintln!("{}", KilnError::Watch(err));
            std::process::exit(1);
        }
    });

    serve::serve(&paths, on_close(&paths))?;

    Ok(())
}

/// Runs a release build into the build directory.
pub fn build(root: impl AsRef<Utf8Path>) -> Result<(), KilnError> {
    eprintln!(
        "Running {} in {} mode.",
        style("kiln").red(),
        style("build").blue()
    );

    let paths = Paths::release(root);
    let tasks = registry(&paths, Mode::Build)?;

    executor::run_sequence(&tasks, &[&["clean"], &["compile"], &["minify"]])?;

    Ok(())
}

fn on_close(paths: &Paths) -> impl FnOnce() {
    let paths = paths.clone();
    move || {
        if let Err(err) = clean::clean(&paths) {
            eprintln!("{}", KilnError::Clean(err));
        }
    }
}
