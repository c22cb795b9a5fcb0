use camino::Utf8Path;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::config::Paths;
use crate::transform::{Pipeline, Summary, relative_to};

/// Oldest browsers the emitted CSS has to support. Declarations they only
/// understand behind a vendor prefix get the prefixed form added.
pub(crate) fn browser_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(50 << 16),
        edge: Some(14 << 16),
        firefox: Some(45 << 16),
        ios_saf: Some(9 << 16),
        safari: Some(9 << 16),
        ..Browsers::default()
    })
}

/// Compiles `styles/**/*.scss` from the source dir into `css/` in the
/// output dir, adding vendor prefixes. Files starting with `_` are partials
/// pulled in through `@use` and never compile on their own.
pub fn run(paths: &Paths) -> anyhow::Result<Summary> {
    let styles = paths.source.join("styles");

    let pipeline = Pipeline {
        name: "styles",
        paths,
        select: vec![format!("{styles}/**/[!_]*.scss")],
        exclude: vec![],
        route: Box::new({
            let styles = styles.clone();
            move |path| {
                Utf8Path::new("css")
                    .join(relative_to(path, &styles))
                    .with_extension("css")
            }
        }),
        transform: Box::new(|path| compile(path)),
    };

    pipeline.run()
}

fn compile(path: &Utf8Path) -> anyhow::Result<Vec<u8>> {
    let css = grass::from_path(path, &grass::Options::default())
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let prefixed = prefix(&css, path)?;
    Ok(prefixed.into_bytes())
}

fn prefix(css: &str, path: &Utf8Path) -> anyhow::Result<String> {
    let options = ParserOptions {
        filename: path.to_string(),
        ..ParserOptions::default()
    };

    let mut sheet =
        StyleSheet::parse(css, options).map_err(|err| anyhow::anyhow!("{err}"))?;

    sheet
        .minify(MinifyOptions {
            targets: browser_targets(),
            ..MinifyOptions::default()
        })
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let output = sheet
        .to_css(PrinterOptions {
            targets: browser_targets(),
            ..PrinterOptions::default()
        })
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    Ok(output.code)
}
