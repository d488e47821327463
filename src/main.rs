//! i18n-registry - command-line front end
//!
//! Entry point for the binary. Handles CLI argument parsing,
//! logging initialization, and prints translations for the requested keys.

use anyhow::Context;
use chrono::{DateTime, Utc};
use i18n_registry::config::SetupConfig;
use i18n_registry::{Config, HttpFetcher, Params, Registry};
use std::path::PathBuf;
use std::sync::Arc;

/// Application name for logging
const APP_NAME: &str = "i18n-registry";

/// Parsed command line
#[derive(Debug, Default)]
struct Flags {
    config: Option<PathBuf>,
    source: Option<String>,
    locale: Option<String>,
    save: Option<String>,
    force: bool,
    date: Option<DateTime<Utc>>,
    params: Vec<String>,
    keys: Vec<String>,
}

impl Flags {
    /// Override file settings with command-line values
    fn apply(&self, setup: &mut SetupConfig) {
        if let Some(source) = &self.source {
            setup.source = Some(source.clone());
        }
        if let Some(locale) = &self.locale {
            setup.locale = Some(locale.clone());
        }
        if let Some(save) = &self.save {
            setup.save = Some(save.clone());
        }
        if self.force {
            setup.force = true;
        }
        if let Some(date) = self.date {
            setup.date = Some(date);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    let flags = parse_args();

    let mut config = match &flags.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::default(),
    };
    flags.apply(&mut config.setup);

    let options = config
        .setup
        .to_options()
        .context("Invalid --save descriptor")?;
    let fetcher = HttpFetcher::new(&config.fetch).context("Could not create HTTP client")?;

    let registry = Registry::new(Arc::new(fetcher));
    registry
        .setup(options)
        .context("Could not set up translation registry")?;

    log::info!(
        "Translating {} key(s) for locale {}",
        flags.keys.len(),
        registry.locale().as_deref().unwrap_or("<none>")
    );

    let params = Params::from_values(flags.params.iter().cloned());
    for key in &flags.keys {
        let text = registry.translate(key, &params).await;
        println!("{} = {}", key, text);
    }

    registry.flush().await;
    Ok(())
}

/// Initialize the logging system
fn init_logging() {
    // Set default log level if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,i18n_registry=debug");
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();
}

/// Parse command line arguments
fn parse_args() -> Flags {
    let args: Vec<String> = std::env::args().collect();
    let mut flags = Flags::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-f" | "--force" => flags.force = true,
            "-c" | "--config" => flags.config = Some(PathBuf::from(value_for(&args, &mut i))),
            "-s" | "--source" => flags.source = Some(value_for(&args, &mut i)),
            "-l" | "--locale" => flags.locale = Some(value_for(&args, &mut i)),
            "--save" => flags.save = Some(value_for(&args, &mut i)),
            "-p" | "--param" => flags.params.push(value_for(&args, &mut i)),
            "-d" | "--date" => {
                let value = value_for(&args, &mut i);
                match DateTime::parse_from_rfc3339(&value) {
                    Ok(date) => flags.date = Some(date.with_timezone(&Utc)),
                    Err(e) => {
                        eprintln!("Error: invalid --date {:?}: {}", value, e);
                        std::process::exit(1);
                    }
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
            key => flags.keys.push(key.to_string()),
        }
        i += 1;
    }

    flags
}

/// Take the value following the option at `args[*i]`
fn value_for(args: &[String], i: &mut usize) -> String {
    if *i + 1 < args.len() {
        *i += 1;
        args[*i].clone()
    } else {
        eprintln!("Error: {} requires a value", args[*i]);
        std::process::exit(1);
    }
}

/// Print help message
fn print_help() {
    println!(
        r#"i18n-registry - Look up translations from a remote bundle

USAGE:
    i18n-registry [OPTIONS] [KEYS...]

OPTIONS:
    -h, --help              Show this help message
    -v, --version           Show version information
    -c, --config <FILE>     Read setup and fetch settings from a JSON file
    -s, --source <URL>      Bundle URL template, {{locale}} is replaced by the locale
    -l, --locale <LOCALE>   Default locale
        --save <WHERE>      Persist configuration and cache (durable[key] or session[key])
    -f, --force             Ignore persisted configuration and reload
    -d, --date <RFC3339>    Reload persisted caches older than this date
    -p, --param <VALUE>     Positional parameter, repeat for {{0}}, {{1}}, ...

EXAMPLES:
    i18n-registry -s https://example.org/i18n/{{locale}}.json -l en greet.hi
    i18n-registry -c i18n.json --save durable[my-app] -p Ada greet.name
"#
    );
}

/// Print version information
fn print_version() {
    println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
}
