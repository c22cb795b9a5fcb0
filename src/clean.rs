use std::fs;
use std::io;

use crate::config::Paths;
use crate::error::CleanError;

/// Removes the active output directory with everything in it. A directory
/// that is already gone counts as success.
pub fn clean(paths: &Paths) -> Result<(), CleanError> {
    tracing::info!("clearing {}", paths.out);

    match fs::remove_dir_all(&paths.out) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(CleanError(err)),
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn test_removes_the_output_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let paths = Paths::dev(&root);

        fs::create_dir_all(paths.out.join("css")).unwrap();
        fs::write(paths.out.join("css/main.css"), "a{}").unwrap();

        clean(&paths).unwrap();
        assert!(!paths.out.exists());
    }

    #[test]
    fn test_missing_directory_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let paths = Paths::dev(&root);

        assert!(!paths.out.exists());
        clean(&paths).unwrap();
        clean(&paths).unwrap();
    }

    #[test]
    fn test_leaves_the_source_tree_alone() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let paths = Paths::dev(&root);

        fs::create_dir_all(&paths.source).unwrap();
        fs::write(paths.source.join("index.html"), "<body/>").unwrap();
        fs::create_dir_all(&paths.out).unwrap();

        clean(&paths).unwrap();
        assert!(paths.source.join("index.html").is_file());
    }
}
