use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Command {
    Styles,
    Js,
    Html,
    Images,
    Compile,
    Clean,
    Minify,
    Watch,
    Serve,
    Dev,
    Build,
}

#[derive(Parser, Debug, Clone)]
struct Args {
    #[clap(value_enum, index = 1, default_value = "dev")]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let root = Utf8PathBuf::try_from(std::env::current_dir()?)?;

    match args.command {
        Command::Styles => kiln::tasks::run_task(&root, "styles")?,
        Command::Js => kiln::tasks::run_task(&root, "js")?,
        Command::Html => kiln::tasks::run_task(&root, "html")?,
        Command::Images => kiln::tasks::run_task(&root, "images")?,
        Command::Compile => kiln::tasks::run_task(&root, "compile")?,
        Command::Clean => kiln::tasks::run_task(&root, "clean")?,
        Command::Minify => kiln::tasks::run_task(&root, "minify")?,
        Command::Watch => kiln::tasks::watch(&root)?,
        Command::Serve => kiln::tasks::serve(&root)?,
        Command::Dev => kiln::tasks::dev(&root)?,
        Command::Build => kiln::tasks::build(&root)?,
    }

    Ok(())
}
