use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use webstart::artifacts::{DryRunWriter, FsWriter};
use webstart::config::Settings;
use webstart::exec::ExecReplacer;
use webstart::launch::{decide_and_launch, Launcher};
use webstart::render::JinjaRenderer;
use webstart::LaunchError;

/// File that marks the application project directory
const PROJECT_MARKER: &str = "manage.py";

#[derive(Debug, Parser)]
#[command(name = "webstart", version, about = "Launch the web application under uWSGI, optionally behind nginx")]
struct Cli {
    /// Settings file (flat TOML table of KEY = value pairs); relative paths
    /// are resolved against the project directory
    #[arg(long, env = "WEBSTART_SETTINGS", default_value = "settings.toml")]
    settings: PathBuf,

    /// Project directory; must contain manage.py
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Directory with template overrides (nginx.conf)
    #[arg(long, env = "WEBSTART_TEMPLATE_DIR")]
    template_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the web server (replaces this process)
    Web,
    /// Show what `web` would run, without writing files or starting anything
    Plan,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let directive = if cli.verbose { "webstart=debug" } else { "webstart=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("valid log directive")),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<LaunchError>()
                .map(|le| {
                    error!(kind = le.kind(), error = %le, "Launch failed");
                    le.exit_code()
                })
                .unwrap_or_else(|| {
                    error!(error = %e, "Launch failed");
                    1
                });
            eprintln!("webstart: {:#}", e);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    ensure_project_dir(&cli.project_dir)?;

    let settings_path = resolve_settings_path(&cli.project_dir, &cli.settings);
    let settings = Settings::load(&settings_path)?;
    info!(path = %settings_path.display(), "Settings loaded");

    let renderer = JinjaRenderer::new(cli.template_dir.clone());
    let replacer = ExecReplacer::new(Some(cli.project_dir.clone()));

    match cli.command {
        Command::Web => {
            let writer = FsWriter;
            let launcher = Launcher::new(&renderer, &writer, &replacer)
                .with_inherited_env(std::env::vars_os());
            Err(decide_and_launch(&settings, &launcher).into())
        }
        Command::Plan => {
            let writer = DryRunWriter::new();
            let launcher = Launcher::new(&renderer, &writer, &replacer)
                .with_inherited_env(std::env::vars_os());
            let plan = launcher
                .prepare(&settings)
                .context("failed to prepare launch plan")?;

            println!("mode: {}", plan.mode);
            println!("command: {}", plan.command);
            println!("environment defaults:");
            for (key, value) in &plan.defaults {
                let shown = plan.env.get(key).unwrap_or(value);
                println!("  {}={}", key.to_string_lossy(), shown.to_string_lossy());
            }
            for (path, contents) in writer.artifacts() {
                println!();
                println!("--- {} ---", path.display());
                println!("{}", contents);
            }
            Ok(())
        }
    }
}

fn resolve_settings_path(project_dir: &Path, settings: &Path) -> PathBuf {
    if settings.is_relative() {
        project_dir.join(settings)
    } else {
        settings.to_path_buf()
    }
}

fn ensure_project_dir(dir: &Path) -> Result<(), LaunchError> {
    if dir.join(PROJECT_MARKER).is_file() {
        Ok(())
    } else {
        Err(LaunchError::config(format!(
            "make sure {} is the directory containing {}",
            dir.display(),
            PROJECT_MARKER
        )))
    }
}
