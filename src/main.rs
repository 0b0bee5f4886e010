use clap::Parser;
use staticpub::{config, generate, output};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "staticpub")]
#[command(about = "Static ActivityPub instance generator")]
#[command(long_about = "\
Static ActivityPub instance generator

Reads one config file and a directory of Markdown entries, and writes the
documents a fediverse server needs to discover and read an account: actor,
webfinger, outbox pages, posts, followers/following counts and an optional
featured post. The output is plain files for any static host.

Entry format:

  ---
  type: Note
  published: 2023-01-03T10:00:00Z
  summary: optional content warning
  ---
  Body in **Markdown**.

Output layout (Paths.instanceFiles):

  users/alice               Actor
  .well-known/webfinger     Webfinger
  outbox/index.json         Outbox
  outbox/page/0             Newest posts
  posts/hello-world         One document per entry
  followers/index.json
  following/index.json

The host must serve outbox/, followers/, following/ and featured/ with
index.json as the directory index, and everything as application/activity+json.

Run 'staticpub --print-config' to generate a documented instance.toml.")]
#[command(version)]
struct Cli {
    /// Instance config file
    #[arg(default_value = "instance.toml")]
    config: PathBuf,

    /// Load entries and build every document, but write nothing
    #[arg(long)]
    check: bool,

    /// Print a stock instance.toml with all options documented
    #[arg(long, conflicts_with = "check")]
    print_config: bool,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if cli.print_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    if !cli.config.exists() {
        return Err(format!(
            "config file {} not found (run 'staticpub --print-config > {}' to create one)",
            cli.config.display(),
            cli.config.display()
        )
        .into());
    }
    let config = config::load_config(&cli.config)?;

    if cli.check {
        println!("==> Checking {}", cli.config.display());
        let plan = generate::check(&config)?;
        output::print_build_output(&plan.summary, false);
        println!("==> Instance is valid");
    } else {
        println!("==> Building {}", cli.config.display());
        let summary = generate::build(&config)?;
        output::print_build_output(&summary, true);
        println!("==> Build complete: {}", summary.output_dir.display());
    }

    Ok(())
}

/// Log to stderr so stdout carries only the build report.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .ok();
}
