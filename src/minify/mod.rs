pub mod svg;

use std::fmt::Display;
use std::fs;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use console::Style;
use indicatif::HumanBytes;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::Paths;
use crate::transform::styles::browser_targets;

const ANSI_BLUE: Style = Style::new().blue();
const ANSI_GREEN: Style = Style::new().green();

/// Aggregate outcome of a minify pass over the output directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Files that fell into one of the partitions.
    pub files: usize,
    /// Files rewritten with a smaller form.
    pub shrunk: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

/// The five kinds of files the pass knows how to compress. Anything else
/// in the output directory stays untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Markup,
    Script,
    Stylesheet,
    Vector,
    Raster,
}

fn classify(path: &Utf8Path) -> Option<Kind> {
    match path.extension()? {
        "html" => Some(Kind::Markup),
        "js" => Some(Kind::Script),
        "css" => Some(Kind::Stylesheet),
        "svg" => Some(Kind::Vector),
        "png" | "gif" | "jpg" | "jpeg" => Some(Kind::Raster),
        _ => None,
    }
}

/// Compresses every recognized file under the output directory in place.
///
/// A file is rewritten only when the compressed form is strictly smaller.
/// When a compressor rejects a file, the original bytes stay; the set of
/// files in the output directory is identical before and after the pass.
pub fn run(paths: &Paths) -> anyhow::Result<Report> {
    let started = Instant::now();

    let mut files = Vec::new();
    for entry in glob::glob(&format!("{}/**/*", paths.out))? {
        let path = Utf8PathBuf::try_from(entry?)?;
        if !path.is_file() {
            continue;
        }
        if let Some(kind) = classify(&path) {
            files.push((path, kind));
        }
    }

    let shrinks: Vec<Option<Shrink>> = files
        .into_par_iter()
        .map(|(path, kind)| match shrink(&path, kind) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::error!(file = %path, "{err:#}");
                None
            }
        })
        .collect();

    let mut report = Report::default();
    for outcome in shrinks.into_iter().flatten() {
        report.files += 1;
        report.bytes_before += outcome.before;
        report.bytes_after += outcome.after;

        if outcome.written {
            report.shrunk += 1;
            let rel = outcome.path.strip_prefix(&paths.out).unwrap_or(&outcome.path);
            eprintln!(
                "{rel} {} (was {})",
                ANSI_GREEN.apply_to(HumanBytes(outcome.after)),
                HumanBytes(outcome.before),
            );
        }
    }

    eprintln!(
        "Minified {} of {} files, {} (was {}) {}",
        report.shrunk,
        report.files,
        ANSI_GREEN.apply_to(HumanBytes(report.bytes_after)),
        HumanBytes(report.bytes_before),
        as_overhead(started),
    );

    Ok(report)
}

struct Shrink {
    path: Utf8PathBuf,
    before: u64,
    after: u64,
    written: bool,
}

fn shrink(path: &Utf8Path, kind: Kind) -> anyhow::Result<Shrink> {
    let data = fs::read(path)?;
    let before = data.len() as u64;

    let kept = |written| Shrink {
        path: path.to_path_buf(),
        before,
        after: before,
        written,
    };

    let compressed = match compress(path, kind, &data) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(file = %path, "keeping original: {err:#}");
            return Ok(kept(false));
        }
    };

    if compressed.len() as u64 >= before {
        return Ok(kept(false));
    }

    let after = compressed.len() as u64;
    fs::write(path, compressed)?;

    Ok(Shrink {
        path: path.to_path_buf(),
        before,
        after,
        written: true,
    })
}

fn compress(path: &Utf8Path, kind: Kind, data: &[u8]) -> anyhow::Result<Vec<u8>> {
    match kind {
        Kind::Markup => Ok(minify_html::minify(data, &markup_config())),
        Kind::Script => script(data),
        Kind::Stylesheet => stylesheet(data),
        Kind::Vector => Ok(svg::minify(std::str::from_utf8(data)?).into_bytes()),
        Kind::Raster => raster(path.extension().unwrap_or(""), data),
    }
}

fn markup_config() -> minify_html::Cfg {
    minify_html::Cfg {
        keep_closing_tags: true,
        keep_html_and_head_opening_tags: true,
        keep_comments: true,
        minify_css: true,
        minify_js: true,
        ..minify_html::Cfg::default()
    }
}

fn script(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let session = minify_js::Session::new();
    let mut out = Vec::new();

    minify_js::minify(&session, minify_js::TopLevelMode::Module, data, &mut out)
        .map_err(|err| anyhow::anyhow!("{err:?}"))?;

    Ok(out)
}

fn stylesheet(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let css = std::str::from_utf8(data)?;

    let mut sheet =
        StyleSheet::parse(css, ParserOptions::default()).map_err(|err| anyhow::anyhow!("{err}"))?;

    sheet
        .minify(MinifyOptions {
            targets: browser_targets(),
            ..MinifyOptions::default()
        })
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let output = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets: browser_targets(),
            ..PrinterOptions::default()
        })
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    Ok(output.code.into_bytes())
}

fn raster(ext: &str, data: &[u8]) -> anyhow::Result<Vec<u8>> {
    match ext {
        "png" => {
            let img = image::load_from_memory(data)?;
            let mut out = Vec::new();
            let encoder = image::codecs::png::PngEncoder::new_with_quality(
                &mut out,
                image::codecs::png::CompressionType::Best,
                image::codecs::png::FilterType::Adaptive,
            );
            img.write_with_encoder(encoder)?;
            Ok(out)
        }
        "jpg" | "jpeg" => {
            let img = image::load_from_memory(data)?;
            let mut out = Vec::new();
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 80);
            encoder.encode_image(&img.to_rgb8())?;
            Ok(out)
        }
        // Re-encoding a GIF would drop animation frames.
        _ => Ok(data.to_vec()),
    }
}

fn as_overhead(start: Instant) -> impl Display {
    let elapsed = start.elapsed().as_millis();
    ANSI_BLUE.apply_to(format!("(+{elapsed}ms)"))
}
