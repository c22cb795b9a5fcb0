use camino::Utf8Path;
use glob::Pattern;
use minijinja::{Environment, context, path_loader};

use crate::config::{Mode, Paths};
use crate::transform::{Pipeline, Summary, relative_to};

/// Renders `**/*.html` from the source dir into the output dir, expanding
/// `{% include %}` directives against the source tree. Files under
/// `fragments/` exist only to be included and are not rendered standalone.
///
/// In watch mode every rendered page gets the live reload client injected,
/// so browsers pick up rebuilds without a manual refresh.
pub fn run(paths: &Paths, mode: Mode) -> anyhow::Result<Summary> {
    let mut env = Environment::new();
    env.set_loader(path_loader(&paths.source));

    let source = paths.source.clone();

    let pipeline = Pipeline {
        name: "html",
        paths,
        select: vec![format!("{}/**/*.html", paths.source)],
        exclude: vec![Pattern::new(&format!("{}/fragments/**", paths.source))?],
        route: Box::new({
            let source = source.clone();
            move |path| relative_to(path, &source).to_path_buf()
        }),
        transform: Box::new(move |path| render(&env, &source, mode, path)),
    };

    pipeline.run()
}

fn render(
    env: &Environment,
    source: &Utf8Path,
    mode: Mode,
    path: &Utf8Path,
) -> anyhow::Result<Vec<u8>> {
    let name = relative_to(path, source);
    let template = env.get_template(name.as_str())?;
    let html = template.render(context! {})?;

    Ok(inject_refresh(html, mode).into_bytes())
}

/// Slips the reload client in front of `</body>`, or at the very end for
/// pages without one.
fn inject_refresh(html: String, mode: Mode) -> String {
    let Some(script) = Paths::refresh_script(mode) else {
        return html;
    };
    let tag = format!("<script>{script}</script>");

    match html.rfind("</body>") {
        Some(at) => {
            let mut out = html;
            out.insert_str(at, &tag);
            out
        }
        None => html + &tag,
    }
}
