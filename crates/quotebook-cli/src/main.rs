// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use quotebook_app::{AppState, FilterBucket};
use quotebook_client::{Client, MemoryStore};
use runtime::StoreRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
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
            "load config {}; run `quotebook --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let level = options
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level().to_owned());
    init_tracing(&level, &config.log_file()?)?;

    let filter = options.filter.unwrap_or_else(|| config.default_filter());
    let mut state = AppState::new(filter, config.notification_duration()?);

    if options.demo {
        tracing::info!(%filter, "starting with in-memory demo store");
        if options.check_only {
            return Ok(());
        }
        let mut runtime = StoreRuntime::new(MemoryStore::seeded_demo());
        return quotebook_tui::run_app(&mut state, &mut runtime);
    }

    let base_url = options.server.clone().unwrap_or_else(|| config.base_url());
    let client = Client::new(&base_url, config.timeout()?).with_context(|| {
        format!(
            "invalid server settings in {}; fix [server].base_url or pass --server",
            options.config_path.display()
        )
    })?;
    tracing::info!(base_url = client.base_url(), %filter, "starting");

    if options.check_only {
        client.ping()?;
        println!("quote store at {} is reachable", client.base_url());
        return Ok(());
    }

    let mut runtime = StoreRuntime::new(client);
    quotebook_tui::run_app(&mut state, &mut runtime)
}

fn init_tracing(level: &str, log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("open log file {}", log_file.display()))?;

    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("initialise logging: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    server: Option<String>,
    filter: Option<FilterBucket>,
    log_level: Option<String>,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        server: None,
        filter: None,
        log_level: None,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
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
            "--server" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--server requires a URL"))?;
                options.server = Some(value.as_ref().to_owned());
            }
            "--filter" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--filter requires a bucket"))?;
                let bucket = FilterBucket::parse(value.as_ref()).ok_or_else(|| {
                    anyhow!(
                        "unknown filter {:?}; use one of all, year, month, week",
                        value.as_ref()
                    )
                })?;
                options.filter = Some(bucket);
            }
            "--log-level" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-level requires a level"))?;
                options.log_level = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
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
    println!("quotebook: browse and submit quotes from the terminal");
    println!("  --config <path>          Use a specific config path");
    println!("  --server <url>           Quote server base URL (overrides config)");
    println!("  --filter <bucket>        Initial filter: all, year, month, week");
    println!("  --log-level <level>      Log filter directive, for example debug");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Run against seeded in-memory quotes");
    println!("  --check                  Validate config and reach the server, then exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use quotebook_app::FilterBucket;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/quotebook-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                server: None,
                filter: None,
                log_level: None,
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_reads_valued_options() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--config",
                "/custom/config.toml",
                "--server",
                "http://quotes:9000",
                "--filter",
                "month",
                "--log-level",
                "debug",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(options.server.as_deref(), Some("http://quotes:9000"));
        assert_eq!(options.filter, Some(FilterBucket::Month));
        assert_eq!(options.log_level.as_deref(), Some("debug"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        for flag in ["--config", "--server", "--filter", "--log-level"] {
            let error = parse_cli_args(vec![flag], default_options_path())
                .expect_err("missing value should fail");
            assert!(error.to_string().contains(flag), "{flag}: {error}");
        }
    }

    #[test]
    fn parse_cli_args_rejects_unknown_filter() {
        let error = parse_cli_args(vec!["--filter", "decade"], default_options_path())
            .expect_err("unknown bucket should fail");
        assert!(error.to_string().contains("all, year, month, week"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check", "--demo"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(options.demo);
        assert!(!options.show_help);

        assert!(parse_cli_args(vec!["-h"], default_options_path())?.show_help);
        Ok(())
    }
}
