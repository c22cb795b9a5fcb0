//! End-to-end runs of the pipeline against a scratch site.

use std::fs;
use std::time::{Duration, SystemTime};

use camino::Utf8PathBuf;
use kiln::executor;
use kiln::tasks;
use kiln::{Mode, Paths};

/// Lays out a small site with one page, one stylesheet and one icon.
///
/// The scripts directory is left out on purpose so runs stay inside the
/// process; bundling shells out to esbuild.
fn fixture() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

    let app = root.join("app");
    fs::create_dir_all(app.join("styles/base")).unwrap();
    fs::create_dir_all(app.join("fragments")).unwrap();
    fs::create_dir_all(app.join("images/icons")).unwrap();

    fs::write(
        app.join("styles/main.scss"),
        "@use \"base/reset\";\n\nbody {\n    margin: 0;\n\n    a { color: red; }\n}\n",
    )
    .unwrap();
    fs::write(
        app.join("styles/base/_reset.scss"),
        "* { box-sizing: border-box; }\n",
    )
    .unwrap();

    fs::write(
        app.join("index.html"),
        "<html><head>{% include \"fragments/head.html\" %}</head><body><h1>Home</h1></body></html>\n",
    )
    .unwrap();
    fs::write(app.join("fragments/head.html"), "<meta charset=\"utf-8\">\n").unwrap();

    fs::write(
        app.join("images/icons/close.svg"),
        "<svg>\n  <path d=\"M0 0\"/>\n</svg>\n",
    )
    .unwrap();

    (dir, root)
}

#[test]
fn test_build_recipe_produces_a_complete_site() {
    let (_guard, root) = fixture();

    tasks::build(&root).unwrap();

    let dist = root.join("dist");
    let css = fs::read_to_string(dist.join("css/main.css")).unwrap();
    assert!(css.contains("box-sizing"));
    assert!(css.contains("body a"));

    let page = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(page.contains("charset"));
    assert!(page.contains("<h1>Home</h1>"));
    assert!(!page.contains("WebSocket"));

    assert!(dist.join("images/icons/close.svg").is_file());
    assert!(!dist.join("fragments").exists());
    assert!(!root.join(".tmp").exists());
}

#[test]
fn test_build_twice_produces_identical_output() {
    let (_guard, root) = fixture();

    tasks::build(&root).unwrap();
    let css = fs::read(root.join("dist/css/main.css")).unwrap();
    let page = fs::read(root.join("dist/index.html")).unwrap();

    tasks::build(&root).unwrap();
    assert_eq!(fs::read(root.join("dist/css/main.css")).unwrap(), css);
    assert_eq!(fs::read(root.join("dist/index.html")).unwrap(), page);
}

#[test]
fn test_dev_compile_injects_the_reload_hook() {
    let (_guard, root) = fixture();

    let paths = Paths::dev(&root);
    let graph = tasks::registry(&paths, Mode::Watch).unwrap();
    executor::run_sequence(&graph, &[&["clean"], &["compile"]]).unwrap();

    let page = fs::read_to_string(paths.out.join("index.html")).unwrap();
    assert!(page.contains("new WebSocket"));
    assert!(page.contains("35729"));
}

#[test]
fn test_recompile_skips_fresh_outputs() {
    let (_guard, root) = fixture();

    let paths = Paths::dev(&root);
    let graph = tasks::registry(&paths, Mode::Build).unwrap();
    executor::run(&graph, "compile").unwrap();

    // Future-date a marked copy so the next run treats it as fresh.
    let page = paths.out.join("index.html");
    fs::write(&page, "sentinel").unwrap();
    let future = SystemTime::now() + Duration::from_secs(3600);
    fs::File::options()
        .write(true)
        .open(&page)
        .unwrap()
        .set_modified(future)
        .unwrap();

    executor::run(&graph, "compile").unwrap();
    assert_eq!(fs::read_to_string(&page).unwrap(), "sentinel");

    // An edited source has to win over the stale copy.
    let later = future + Duration::from_secs(3600);
    fs::File::options()
        .write(true)
        .open(paths.source.join("index.html"))
        .unwrap()
        .set_modified(later)
        .unwrap();

    executor::run(&graph, "compile").unwrap();
    assert!(fs::read_to_string(&page).unwrap().contains("<h1>Home</h1>"));
}
