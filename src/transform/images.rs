use std::fs;

use camino::Utf8Path;

use crate::config::Paths;
use crate::transform::{Pipeline, Summary, relative_to};

/// Copies everything under `images/` into the output dir unchanged.
/// Compression happens in the minify pass, so development rebuilds stay
/// cheap.
pub fn run(paths: &Paths) -> anyhow::Result<Summary> {
    let images = paths.source.join("images");

    let pipeline = Pipeline {
        name: "images",
        paths,
        select: vec![format!("{images}/**/*")],
        exclude: vec![],
        route: Box::new({
            let images = images.clone();
            move |path| Utf8Path::new("images").join(relative_to(path, &images))
        }),
        transform: Box::new(|path| Ok(fs::read(path)?)),
    };

    pipeline.run()
}
