use std::collections::HashSet;
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::new_debouncer;
use serde::Serialize;
use tungstenite::WebSocket;

use crate::config::{Paths, RELOAD_PORT};
use crate::error::WatchError;
use crate::executor;
use crate::registry::TaskGraph;

/// Maps a source file pattern to the task that consumes those files.
struct Binding {
    pattern: Pattern,
    task: &'static str,
}

fn bindings(paths: &Paths) -> Vec<Binding> {
    let rules = [
        (format!("{}/styles/**/*.scss", paths.source), "styles"),
        (format!("{}/js/**/*.js", paths.source), "js"),
        (format!("{}/**/*.html", paths.source), "html"),
        (format!("{}/**/*.svg", paths.source), "images"),
    ];

    rules
        .into_iter()
        .map(|(glob, task)| Binding {
            pattern: Pattern::new(&glob).unwrap(),
            task,
        })
        .collect()
}

fn matched_tasks(bindings: &[Binding], changed: &HashSet<Utf8PathBuf>) -> Vec<&'static str> {
    let mut queue = Vec::new();

    for binding in bindings {
        if changed.iter().any(|path| binding.pattern.matches(path.as_str())) {
            queue.push(binding.task);
        }
    }

    queue
}

/// Message sent to connected browsers, shaped like the livereload protocol.
#[derive(Serialize)]
struct Reload<'a> {
    command: &'static str,
    path: &'a str,
}

fn reload_message(path: &Utf8Path) -> String {
    serde_json::to_string(&Reload {
        command: "reload",
        path: path.as_str(),
    })
    .expect("Error serializing reload message")
}

/// Watches the source tree and reruns tasks for the files that changed.
///
/// Changes under the output directory are not rebuilt; they are broadcast
/// to connected browsers instead. Tasks write their results to the output
/// directory, so every completed rebuild arrives here as a second batch of
/// events and turns into a reload.
///
/// Rebuild failures are reported and watching continues. The reload port
/// being taken is fatal; a stale watcher would otherwise keep serving
/// reloads for a different checkout.
pub fn watch(paths: &Paths, tasks: &TaskGraph) -> Result<(), WatchError> {
    let listener = TcpListener::bind(("127.0.0.1", RELOAD_PORT))
        .map_err(|err| WatchError::Bind(RELOAD_PORT, err))?;
    let clients = Arc::new(Mutex::new(vec![]));

    let _thread_i = new_thread_ws_incoming(listener, clients.clone());
    let (tx_reload, _thread_o) = new_thread_ws_reload(clients.clone());

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(250), None, tx)?;

    // The output tree is missing until the first transform writes to it.
    fs::create_dir_all(&paths.out)?;

    debouncer.watch(paths.source.as_std_path(), RecursiveMode::Recursive)?;
    debouncer.watch(paths.out.as_std_path(), RecursiveMode::Recursive)?;

    let bindings = bindings(paths);

    loop {
        let events = match rx.recv()? {
            Ok(events) => events,
            Err(errors) => {
                for err in errors {
                    eprintln!("{err}");
                }
                continue;
            }
        };

        let changed = match events
            .iter()
            .filter(|de| {
                matches!(
                    de.event.kind,
                    EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
                )
            })
            .flat_map(|de| &de.event.paths)
            .try_fold(
                HashSet::new(),
                |mut acc, path| -> Result<_, anyhow::Error> {
                    acc.insert(Utf8PathBuf::try_from(path.clone())?);
                    Ok(acc)
                },
            ) {
            Ok(ok) => ok,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        if changed.is_empty() {
            continue;
        }

        for path in &changed {
            if path.starts_with(&paths.out) {
                eprintln!("{path} changed.");
                let _ = tx_reload.send(path.clone());
            }
        }

        for task in matched_tasks(&bindings, &changed) {
            if let Err(err) = executor::run(tasks, task) {
                eprintln!("Encountered an error while rebuilding: {err}");
            }
        }
    }
}

fn new_thread_ws_incoming(
    server: TcpListener,
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for stream in server.incoming() {
            let Ok(stream) = stream else { continue };
            let Ok(socket) = tungstenite::accept(stream) else { continue };
            clients.lock().unwrap().push(socket);
        }
    })
}

fn new_thread_ws_reload(
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> (Sender<Utf8PathBuf>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel::<Utf8PathBuf>();

    let thread = std::thread::spawn(move || {
        while let Ok(path) = rx.recv() {
            let message = reload_message(&path);
            let mut clients = clients.lock().unwrap();
            let mut broken = vec![];

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send(message.clone().into()) {
                    Ok(()) => {}
                    Err(tungstenite::error::Error::Io(e)) => {
                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            broken.push(i);
                        }
                    }
                    Err(e) => {
                        eprintln!("Error: {e:?}");
                    }
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            // Close all but the last 10 connections
            let len = clients.len();
            if len > 10 {
                for mut socket in clients.drain(0..len - 10) {
                    socket.close(None).ok();
                }
            }
        }
    });

    (tx, thread)
}
