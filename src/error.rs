use std::sync::mpsc::RecvError;

pub use anyhow::Error as TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KilnError {
    #[error("Invalid task graph:\n{0}")]
    Registry(#[from] RegistryError),

    #[error("Error while building the site.\n{0}")]
    Build(#[from] BuildError),

    #[error("Error while clearing the output directory:\n{0}")]
    Clean(#[from] CleanError),

    #[error("Error while watching for file changes:\n{0}")]
    Watch(#[from] WatchError),

    #[error("Error while serving the site:\n{0}")]
    Serve(#[from] ServeError),
}

/// Errors raised while wiring up the task graph, before anything runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Task '{0}' is registered twice")]
    Duplicate(String),

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Dependency cycle through task '{0}'")]
    Cycle(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Unknown task '{0}'")]
    Unknown(String),

    #[error("Task '{0}':\n{1}")]
    Task(String, anyhow::Error),
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct CleanError(#[from] pub(crate) std::io::Error);

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Recv(#[from] RecvError),

    #[error("Reload port {0} is already in use:\n{1}")]
    Bind(u16, #[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to build runtime:\n{0}")]
    Runtime(#[source] std::io::Error),

    #[error("Server port {0} is already in use:\n{1}")]
    Bind(u16, #[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
