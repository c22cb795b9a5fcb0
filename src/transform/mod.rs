pub mod images;
pub mod lint;
pub mod markup;
pub mod scripts;
pub mod styles;

use std::fmt;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use console::style;
use glob::Pattern;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::Paths;

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} up to date, {} failed",
            self.written, self.skipped, self.failed
        )
    }
}

enum Outcome {
    Written,
    Skipped,
    Failed,
}

type RouteFn<'a> = Box<dyn Fn(&Utf8Path) -> Utf8PathBuf + Send + Sync + 'a>;
type TransformFn<'a> = Box<dyn Fn(&Utf8Path) -> anyhow::Result<Vec<u8>> + Send + Sync + 'a>;

/// One asset pipeline: select sources, drop the up-to-date ones, transform
/// the rest and write the results under the output directory.
///
/// Files are processed independently and in parallel. A file that fails to
/// transform is reported and produces no output; the remaining files still
/// go through, and the run as a whole still succeeds.
pub(crate) struct Pipeline<'a> {
    pub name: &'static str,
    pub paths: &'a Paths,
    /// Glob patterns selecting the source files.
    pub select: Vec<String>,
    /// Patterns removing entries from the selection again.
    pub exclude: Vec<Pattern>,
    /// Maps a source path to its destination, relative to the output dir.
    pub route: RouteFn<'a>,
    /// Produces the output bytes for one source file.
    pub transform: TransformFn<'a>,
}

impl Pipeline<'_> {
    pub fn run(&self) -> anyhow::Result<Summary> {
        let mut sources = Vec::new();
        for pattern in &self.select {
            for entry in glob::glob(pattern)? {
                let path = Utf8PathBuf::try_from(entry?)?;
                if !path.is_file() {
                    continue;
                }
                if self.exclude.iter().any(|p| p.matches(path.as_str())) {
                    continue;
                }
                sources.push(path);
            }
        }

        let outcomes: Vec<Outcome> = sources
            .into_par_iter()
            .map(|source| match self.process(&source) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(task = self.name, file = %source, "{err:#}");
                    eprintln!("{} {} {}\n{:?}", style("Failed").red().bold(), self.name, source, err);
                    Outcome::Failed
                }
            })
            .collect();

        let mut summary = Summary::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Written => summary.written += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }

        tracing::info!(task = self.name, "{summary}");
        Ok(summary)
    }

    fn process(&self, source: &Utf8Path) -> anyhow::Result<Outcome> {
        let dest = self.paths.out.join((self.route)(source));

        if !is_stale(source, &dest)? {
            return Ok(Outcome::Skipped);
        }

        let data = (self.transform)(source)?;

        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&dest, data)?;

        Ok(Outcome::Written)
    }
}

/// A source is stale when its destination is missing or older.
///
/// Equal timestamps count as up to date, so a rebuild right after a write
/// does nothing.
pub(crate) fn is_stale(source: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<bool> {
    let Ok(dest_meta) = fs::metadata(dest) else {
        return Ok(true);
    };

    let source_time = fs::metadata(source)?.modified()?;
    let dest_time = dest_meta.modified()?;

    Ok(source_time > dest_time)
}

/// Strips the source prefix off a selected path, leaving the part that
/// mirrors into the output tree.
pub(crate) fn relative_to<'a>(path: &'a Utf8Path, base: &Utf8Path) -> &'a Utf8Path {
    path.strip_prefix(base).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn touch(dir: &Utf8Path, name: &str, contents: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn set_mtime(path: &Utf8Path, time: SystemTime) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    fn tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_dest_is_stale() {
        let (_guard, dir) = tempdir();
        let source = touch(&dir, "a.txt", "a");

        assert!(is_stale(&source, &dir.join("missing.txt")).unwrap());
    }

    #[test]
    fn test_older_source_is_up_to_date() {
        let (_guard, dir) = tempdir();
        let source = touch(&dir, "a.txt", "a");
        let dest = touch(&dir, "b.txt", "b");

        let past = SystemTime::now() - Duration::from_secs(60);
        set_mtime(&source, past);
        set_mtime(&dest, past + Duration::from_secs(30));

        assert!(!is_stale(&source, &dest).unwrap());
    }

    #[test]
    fn test_equal_mtime_is_up_to_date() {
        let (_guard, dir) = tempdir();
        let source = touch(&dir, "a.txt", "a");
        let dest = touch(&dir, "b.txt", "b");

        let time = SystemTime::now() - Duration::from_secs(60);
        set_mtime(&source, time);
        set_mtime(&dest, time);

        assert!(!is_stale(&source, &dest).unwrap());
    }

    #[test]
    fn test_newer_source_is_stale() {
        let (_guard, dir) = tempdir();
        let source = touch(&dir, "a.txt", "a");
        let dest = touch(&dir, "b.txt", "b");

        let past = SystemTime::now() - Duration::from_secs(60);
        set_mtime(&dest, past);
        set_mtime(&source, past + Duration::from_secs(30));

        assert!(is_stale(&source, &dest).unwrap());
    }

    #[test]
    fn test_pipeline_continues_past_bad_file() {
        let (_guard, dir) = tempdir();
        let source = dir.join("app");
        fs::create_dir_all(&source).unwrap();
        touch(&source, "good.txt", "fine");
        touch(&source, "bad.txt", "broken");

        let paths = Paths::dev(&dir);
        fs::create_dir_all(&paths.out).unwrap();

        let pipeline = Pipeline {
            name: "test",
            paths: &paths,
            select: vec![format!("{source}/*.txt")],
            exclude: vec![],
            route: Box::new({
                let source = source.clone();
                move |path| relative_to(path, &source).to_path_buf()
            }),
            transform: Box::new(|path| {
                if path.as_str().contains("bad") {
                    anyhow::bail!("refused");
                }
                Ok(fs::read(path)?)
            }),
        };

        let summary = pipeline.run().unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(summary.failed, 1);
        assert!(paths.out.join("good.txt").is_file());
        assert!(!paths.out.join("bad.txt").exists());
    }

    #[test]
    fn test_pipeline_skips_fresh_files() {
        let (_guard, dir) = tempdir();
        let source = dir.join("app");
        fs::create_dir_all(&source).unwrap();
        touch(&source, "a.txt", "a");

        let paths = Paths::dev(&dir);

        let make = || Pipeline {
            name: "test",
            paths: &paths,
            select: vec![format!("{source}/*.txt")],
            exclude: vec![],
            route: Box::new({
                let source = source.clone();
                move |path| relative_to(path, &source).to_path_buf()
            }),
            transform: Box::new(|path| Ok(fs::read(path)?)),
        };

        let first = make().run().unwrap();
        assert_eq!(first.written, 1);

        let second = make().run().unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 1);
    }

    #[test]
    fn test_pipeline_exclusions() {
        let (_guard, dir) = tempdir();
        let source = dir.join("app");
        fs::create_dir_all(source.join("fragments")).unwrap();
        touch(&source, "page.txt", "page");
        touch(&source.join("fragments"), "part.txt", "part");

        let paths = Paths::dev(&dir);

        let pipeline = Pipeline {
            name: "test",
            paths: &paths,
            select: vec![format!("{source}/**/*.txt")],
            exclude: vec![Pattern::new(&format!("{source}/fragments/**")).unwrap()],
            route: Box::new({
                let source = source.clone();
                move |path| relative_to(path, &source).to_path_buf()
            }),
            transform: Box::new(|path| Ok(fs::read(path)?)),
        };

        let summary = pipeline.run().unwrap();
        assert_eq!(summary.written, 1);
        assert!(paths.out.join("page.txt").is_file());
        assert!(!paths.out.join("fragments/part.txt").exists());
    }
}
