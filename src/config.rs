use camino::{Utf8Path, Utf8PathBuf};

/// Directory with the site sources.
pub const SOURCE_DIR: &str = "app";
/// Transient output directory used during development.
pub const SERVE_DIR: &str = ".tmp";
/// Output directory for release builds.
pub const BUILD_DIR: &str = "dist";

/// Port of the development HTTP server.
pub const HTTP_PORT: u16 = 8008;
/// Port of the live reload WebSocket server.
pub const RELOAD_PORT: u16 = 35729;

/// The mode in which the pipeline is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A one-time build.
    Build,
    /// A continuous watch mode for development.
    Watch,
}

/// Resolved directory layout for a single pipeline run.
///
/// Every task receives this by reference; nothing mutates it after
/// construction. `out` is the directory tasks write to and is always
/// either `serve` or `build`, depending on the constructor used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Root of the site sources.
    pub source: Utf8PathBuf,
    /// Transient output served during development.
    pub serve: Utf8PathBuf,
    /// Output of release builds.
    pub build: Utf8PathBuf,
    /// The active output directory for this run.
    pub out: Utf8PathBuf,
}

impl Paths {
    /// Layout for development runs: output goes to the serve directory.
    pub fn dev(root: impl AsRef<Utf8Path>) -> Self {
        let root = root.as_ref();
        let serve = root.join(SERVE_DIR);
        Self {
            source: root.join(SOURCE_DIR),
            out: serve.clone(),
            serve,
            build: root.join(BUILD_DIR),
        }
    }

    /// Layout for release builds: output goes to the build directory.
    pub fn release(root: impl AsRef<Utf8Path>) -> Self {
        let root = root.as_ref();
        let build = root.join(BUILD_DIR);
        Self {
            source: root.join(SOURCE_DIR),
            serve: root.join(SERVE_DIR),
            out: build.clone(),
            build,
        }
    }

    /// Returns the live reload script for the current mode.
    ///
    /// In `Watch` mode this is a snippet connecting to the reload WebSocket
    /// server, meant to be injected into rendered pages. In `Build` mode
    /// pages ship without it.
    pub fn refresh_script(mode: Mode) -> Option<String> {
        match mode {
            Mode::Build => None,
            Mode::Watch => Some(format!(
                r#"
const socket = new WebSocket("ws://localhost:{RELOAD_PORT}");
socket.addEventListener("message", event => {{
    window.location.reload();
}});
"#
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dev_layout() {
        let paths = Paths::dev("site");
        assert_eq!(paths.source, "site/app");
        assert_eq!(paths.serve, "site/.tmp");
        assert_eq!(paths.build, "site/dist");
        assert_eq!(paths.out, paths.serve);
    }

    #[test]
    fn test_release_layout() {
        let paths = Paths::release("site");
        assert_eq!(paths.out, paths.build);
        assert_ne!(paths.out, paths.serve);
    }

    #[test]
    fn test_refresh_script_modes() {
        assert!(Paths::refresh_script(Mode::Build).is_none());
        let script = Paths::refresh_script(Mode::Watch).unwrap();
        assert!(script.contains("35729"));
        assert!(script.contains("window.location.reload()"));
    }
}
