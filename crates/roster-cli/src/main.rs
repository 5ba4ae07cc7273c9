// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use roster_app::RegistryState;
use roster_db::Store;
use roster_testkit::PeopleFaker;
use runtime::DbRuntime;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

const HELP: &str = "\
roster: browse a generated people registry

usage: roster [options]

  --config <path>          Read settings from <path>
  --seed <n>               Generate the registry from seed <n>
  --size <n>               Generate <n> people
  --demo                   Keep views and preferences in memory only
  --check                  Load config, settings and registry, then exit
  -v, -vv                  Log more (info, debug) to the log file
  --print-config-path      Print the resolved config path
  --print-path             Print the resolved settings database path
  --print-example-config   Print a commented config template
  -h, --help               Show this help
";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print!("{HELP}");
        return Ok(());
    }

    match options.print {
        Some(PrintTarget::ConfigPath) => {
            println!("{}", options.config_path.display());
            return Ok(());
        }
        Some(PrintTarget::ExampleConfig) => {
            print!("{}", Config::example_config(&options.config_path));
            return Ok(());
        }
        Some(PrintTarget::DbPath) | None => {}
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `roster --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print == Some(PrintTarget::DbPath) {
        println!("{}", db_path.display());
        return Ok(());
    }

    let level = logging::effective_level(config.log_level()?, options.verbose);
    logging::init(&config.log_path()?, level)?;

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open settings database {}; set [storage].db_path or ROSTER_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    let preferences = store.load_preferences()?;
    let views = store.load_views()?;

    let seed = options.seed.unwrap_or_else(|| config.dataset_seed());
    let size = options.size.unwrap_or_else(|| config.dataset_size());
    let dataset = Arc::new(PeopleFaker::new(seed).dataset(size));
    info!(
        people = dataset.len(),
        seed,
        views = views.len(),
        db = %db_path.display(),
        "registry ready"
    );

    let tui_options = config.tui_options()?;
    let latency = config.latency()?;
    if options.check_only {
        println!("ok: {} people, {} saved views", dataset.len(), views.len());
        return Ok(());
    }

    let mut state = RegistryState::new(preferences, views);
    let mut runtime = DbRuntime::new(&store, dataset, seed, latency);
    roster_tui::run_app(&mut state, &mut runtime, tui_options)
}

/// Informational outputs that short-circuit startup. Only one is printed; a
/// later flag replaces an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrintTarget {
    ConfigPath,
    DbPath,
    ExampleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print: Option<PrintTarget>,
    seed: Option<u64>,
    size: Option<usize>,
    demo: bool,
    check_only: bool,
    show_help: bool,
    verbose: u8,
}

impl CliOptions {
    fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            print: None,
            seed: None,
            size: None,
            demo: false,
            check_only: false,
            show_help: false,
            verbose: 0,
        }
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions::new(default_config_path);
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let path = flag_value(&mut iter, "--config", "a file path")?;
                options.config_path = PathBuf::from(path);
            }
            "--seed" => {
                let raw = flag_value(&mut iter, "--seed", "a number")?;
                options.seed = Some(parse_number(&raw, "--seed")?);
            }
            "--size" => {
                let raw = flag_value(&mut iter, "--size", "a number")?;
                let size: usize = parse_number(&raw, "--size")?;
                if size == 0 {
                    bail!("--size must be positive");
                }
                options.size = Some(size);
            }
            "--print-config-path" => options.print = Some(PrintTarget::ConfigPath),
            "--print-path" => options.print = Some(PrintTarget::DbPath),
            "--print-example-config" => options.print = Some(PrintTarget::ExampleConfig),
            "--demo" => options.demo = true,
            "--check" => options.check_only = true,
            "--verbose" | "-v" => options.verbose = options.verbose.saturating_add(1),
            "-vv" => options.verbose = options.verbose.saturating_add(2),
            "--help" | "-h" => options.show_help = true,
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }
    Ok(options)
}

fn flag_value<I, S>(iter: &mut I, flag: &str, expected: &str) -> Result<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    iter.next()
        .map(|value| value.as_ref().to_owned())
        .ok_or_else(|| anyhow!("{flag} requires {expected}"))
}

fn parse_number<T: FromStr>(raw: &str, flag: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| anyhow!("{flag} expects a non-negative integer, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, HELP, PrintTarget, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        parse_cli_args(args.iter().copied(), PathBuf::from("/tmp/roster-config.toml"))
    }

    #[test]
    fn no_arguments_runs_with_default_config() -> Result<()> {
        assert_eq!(
            parse(&[])?,
            CliOptions::new(PathBuf::from("/tmp/roster-config.toml"))
        );
        Ok(())
    }

    #[test]
    fn config_flag_takes_a_path() -> Result<()> {
        let options = parse(&["--config", "/srv/roster.toml"])?;
        assert_eq!(options.config_path, PathBuf::from("/srv/roster.toml"));

        let error = parse(&["--config"]).expect_err("missing path");
        assert!(error.to_string().contains("--config requires a file path"));
        Ok(())
    }

    #[test]
    fn dataset_overrides_are_validated() -> Result<()> {
        let options = parse(&["--seed", "42", "--size", "250"])?;
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.size, Some(250));

        let error = parse(&["--size", "0"]).expect_err("zero size");
        assert!(error.to_string().contains("must be positive"));
        let error = parse(&["--seed", "-3"]).expect_err("negative seed");
        assert!(error.to_string().contains("--seed expects a non-negative integer"));
        let error = parse(&["--size"]).expect_err("missing size");
        assert!(error.to_string().contains("--size requires a number"));
        Ok(())
    }

    #[test]
    fn last_print_flag_wins() -> Result<()> {
        assert_eq!(parse(&["--print-path"])?.print, Some(PrintTarget::DbPath));
        let options = parse(&["--print-config-path", "--print-example-config"])?;
        assert_eq!(options.print, Some(PrintTarget::ExampleConfig));
        Ok(())
    }

    #[test]
    fn demo_and_check_combine() -> Result<()> {
        let options = parse(&["--demo", "--check"])?;
        assert!(options.demo);
        assert!(options.check_only);
        assert_eq!(options.print, None);
        Ok(())
    }

    #[test]
    fn verbosity_accumulates() -> Result<()> {
        assert_eq!(parse(&["-v"])?.verbose, 1);
        assert_eq!(parse(&["-vv"])?.verbose, 2);
        assert_eq!(parse(&["-v", "--verbose", "-vv"])?.verbose, 4);
        Ok(())
    }

    #[test]
    fn unknown_arguments_point_at_help() {
        let error = parse(&["--colour"]).expect_err("unknown flag");
        let message = error.to_string();
        assert!(message.contains("\"--colour\""));
        assert!(message.contains("--help"));
    }

    #[test]
    fn help_lists_every_flag() -> Result<()> {
        assert!(parse(&["-h"])?.show_help);
        assert!(parse(&["--help"])?.show_help);
        for flag in [
            "--config",
            "--seed",
            "--size",
            "--demo",
            "--check",
            "--print-config-path",
            "--print-path",
            "--print-example-config",
        ] {
            assert!(HELP.contains(flag), "{flag} missing from help");
        }
        Ok(())
    }
}
