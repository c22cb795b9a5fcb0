#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod clean;
pub mod config;
mod error;
pub mod executor;
pub mod minify;
pub mod registry;
mod serve;
pub mod tasks;
pub mod transform;
mod watch;

pub use crate::clean::clean;
pub use crate::config::{Mode, Paths};
pub use crate::error::*;
pub use crate::registry::{Registry, TaskGraph};
