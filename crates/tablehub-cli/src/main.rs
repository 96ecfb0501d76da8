// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use runtime::ServerRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tablehub_app::ViewId;
use tablehub_client::Client;
use tablehub_store::Store;
use tablehub_tui::App;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `tablehub --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = config.db_path()?;
    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open session store {} -- if this path is wrong, set [storage].db_path or TABLEHUB_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    let client = Client::new(config.base_url(), config.endpoint(), config.timeout()?)
        .with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/endpoint/timeout values",
                options.config_path.display()
            )
        })?;
    let persist_debounce = config.persist_debounce()?;
    if options.check_only {
        return Ok(());
    }

    init_logging(&config.log_filter(), &config.log_file()?)?;
    if options.fresh {
        let cleared = store.clear_snapshots()?;
        tracing::info!(cleared, "starting with a fresh session");
    }

    let start = options.view.unwrap_or_else(|| config.start_view());
    tracing::info!(
        base_url = client.base_url(),
        endpoint = client.endpoint().as_str(),
        view = %start,
        "starting tablehub"
    );

    let mut app = App::new(start, persist_debounce);
    let mut runtime = ServerRuntime::new(client, store);
    tablehub_tui::run_app(&mut app, &mut runtime)
}

/// Logs go to a file; the terminal belongs to the TUI.
fn init_logging(filter: &str, log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("open log file {}", log_file.display()))?;
    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("invalid log filter {filter:?}; check TABLEHUB_LOG"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    view: Option<ViewId>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    fresh: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        view: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        fresh: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--view" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--view requires a view id"))?;
                let value = value.as_ref().trim();
                if value.is_empty() {
                    return Err(anyhow!("--view requires a non-empty view id"));
                }
                options.view = Some(ViewId::new(value));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--fresh" => {
                options.fresh = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("tablehub");
    println!("  --config <path>          Use a specific config path");
    println!("  --view <id>              Open this view instead of [server].start_view");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config + session store + server settings");
    println!("  --fresh                  Forget saved cursor and column state");
    println!("  --help                   Show this help");
}
