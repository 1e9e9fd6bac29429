use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use config::{Config, ErrorPolicy, Overrides, UserConfig};
use controller::{parse_all, BatchError, BatchOptions};
use discovery::{discover, DiscoveryOptions};
use insights::{InsightsReport, JsonStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

mod config;
mod controller;
mod discovery;
mod entity;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    ///directory to search for lock files, defaults to the current directory
    root: Option<PathBuf>,
    ///indent the JSON report
    #[arg(long)]
    pretty: bool,
    ///"abort" stops at the first bad lock file, "continue" reports what parsed and lists the rest
    #[arg(long, value_enum)]
    on_error: Option<ErrorPolicy>,
    ///number of lock files parsed at once
    #[arg(short, long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    jobs: Option<usize>,
    ///base name of the files to collect
    #[arg(long)]
    lock_file_name: Option<String>,
    ///directory name to skip, may be repeated
    #[arg(long)]
    exclude: Vec<String>,
    ///JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    ///log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    //logging
    let default_level = if args.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let file_config = match &args.config {
        Some(path) => UserConfig::load(path)?,
        None => UserConfig::default(),
    };
    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir().context("failed to determine current directory")?,
    };
    let config = Config::resolve(
        root,
        file_config,
        Overrides {
            lock_file_name: args.lock_file_name,
            exclude: args.exclude,
            error_policy: args.on_error,
            concurrency: args.jobs,
            pretty: args.pretty,
        },
    )?;

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling");
            ctrl_c.cancel();
        }
    });

    let all_parsed = execute(&config, &token, &mut std::io::stdout(), &mut std::io::stderr()).await?;
    Ok(if all_parsed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Discover, parse and aggregate under `config`.
///
/// The report is written to `out` unless the batch aborts. Each failed file is
/// written to `errors` as `error: <path>: <reason>`. Returns whether every
/// file parsed.
async fn execute(
    config: &Config,
    token: &CancellationToken,
    out: &mut impl Write,
    errors: &mut impl Write,
) -> anyhow::Result<bool> {
    let options = DiscoveryOptions {
        lock_file_name: config.lock_file_name.clone(),
        exclude: config.exclude.clone(),
    };
    let paths = tokio::task::spawn_blocking({
        let root = config.root.clone();
        move || discover(&root, &options)
    })
    .await??;
    info!(count = paths.len(), "found lock files");

    let outcome = match parse_all(
        paths,
        BatchOptions {
            concurrency: config.concurrency,
            error_policy: config.error_policy,
        },
        token,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(BatchError::Failed(failure)) => {
            writeln!(errors, "error: {failure}")?;
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let report = InsightsReport::aggregate(
        outcome
            .parsed
            .iter()
            .map(|(path, lock_file)| (path, lock_file)),
    );
    for (name, versions) in report.divergent() {
        let versions: Vec<&str> = versions.keys().map(String::as_str).collect();
        info!(provider = name, ?versions, "provider pinned at multiple versions");
    }

    let style = if config.pretty {
        JsonStyle::Pretty
    } else {
        JsonStyle::Compact
    };
    writeln!(out, "{}", report.render(style)?)?;

    if outcome.failures.is_empty() {
        debug!("all lock files parsed");
        return Ok(true);
    }
    for failure in &outcome.failures {
        writeln!(errors, "error: {failure}")?;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const GOOD: &str = r#"
provider "example.com/provider" {
  version = "foo"
  hashes  = ["cat"]
}
"#;

    const DUPLICATE: &str = r#"
provider "example.com/provider" {
  version = "foo"
  hashes  = ["cat"]
}

provider "example.com/provider" {
  version = "bar"
  hashes  = ["dog"]
}
"#;

    fn lock_file(root: &Path, dir: &str, contents: &str) -> PathBuf {
        let path = root.join(dir).join(".terraform.lock.hcl");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn config(root: &Path, error_policy: ErrorPolicy) -> Config {
        Config {
            root: root.to_path_buf(),
            lock_file_name: ".terraform.lock.hcl".to_string(),
            exclude: Vec::new(),
            error_policy,
            concurrency: 2,
            pretty: false,
        }
    }

    async fn execute_captured(config: &Config) -> (bool, String, String) {
        let mut out = Vec::new();
        let mut errors = Vec::new();
        let all_parsed = execute(config, &CancellationToken::new(), &mut out, &mut errors)
            .await
            .unwrap();
        (
            all_parsed,
            String::from_utf8(out).unwrap(),
            String::from_utf8(errors).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_success_prints_report() {
        let dir = tempfile::tempdir().unwrap();
        let a = lock_file(dir.path(), "a", GOOD);
        let b = lock_file(dir.path(), "b", GOOD);

        let (all_parsed, out, errors) =
            execute_captured(&config(dir.path(), ErrorPolicy::Abort)).await;

        assert!(all_parsed);
        assert_eq!(
            out,
            format!(
                "{{\"example.com/provider\":{{\"foo\":[\"{}\",\"{}\"]}}}}\n",
                a.display(),
                b.display()
            )
        );
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_abort_on_empty_file_prints_no_report() {
        let dir = tempfile::tempdir().unwrap();
        lock_file(dir.path(), "a", GOOD);
        let empty = lock_file(dir.path(), "b", "");
        lock_file(dir.path(), "c", GOOD);

        let (all_parsed, out, errors) =
            execute_captured(&config(dir.path(), ErrorPolicy::Abort)).await;

        assert!(!all_parsed);
        assert!(out.is_empty());
        assert_eq!(errors, format!("error: {}: lock file is empty\n", empty.display()));
    }

    #[tokio::test]
    async fn test_abort_on_duplicate_provider_prints_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let duplicate = lock_file(dir.path(), "a", DUPLICATE);
        lock_file(dir.path(), "b", GOOD);

        let (all_parsed, out, errors) =
            execute_captured(&config(dir.path(), ErrorPolicy::Abort)).await;

        assert!(!all_parsed);
        assert!(out.is_empty());
        assert!(errors.starts_with(&format!("error: {}: ", duplicate.display())));
        assert!(errors.contains("declared more than once"));
        assert_eq!(errors.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_continue_reports_good_files_and_lists_failures() {
        let dir = tempfile::tempdir().unwrap();
        let duplicate = lock_file(dir.path(), "a", DUPLICATE);
        let empty = lock_file(dir.path(), "b", "");
        let good = lock_file(dir.path(), "c", GOOD);

        let (all_parsed, out, errors) =
            execute_captured(&config(dir.path(), ErrorPolicy::Continue)).await;

        assert!(!all_parsed);
        assert_eq!(
            out,
            format!(
                "{{\"example.com/provider\":{{\"foo\":[\"{}\"]}}}}\n",
                good.display()
            )
        );
        let lines: Vec<_> = errors.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&format!("error: {}: ", duplicate.display())));
        assert_eq!(lines[1], format!("error: {}: lock file is empty", empty.display()));
    }

    #[tokio::test]
    async fn test_no_lock_files_prints_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let (all_parsed, out, errors) =
            execute_captured(&config(dir.path(), ErrorPolicy::Abort)).await;

        assert!(all_parsed);
        assert_eq!(out, "{}\n");
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir.path().join("missing"), ErrorPolicy::Abort);
        let mut out = Vec::new();
        let mut errors = Vec::new();
        let result = execute(&config, &CancellationToken::new(), &mut out, &mut errors).await;
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_zero_jobs_is_a_usage_error() {
        let err = Args::try_parse_from(["provider-insights", "--jobs", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);

        let args = Args::try_parse_from(["provider-insights", "-j", "3", "infra"]).unwrap();
        assert_eq!(args.jobs, Some(3));
        assert_eq!(args.root, Some(PathBuf::from("infra")));
    }

    #[test]
    fn test_on_error_values() {
        let args = Args::try_parse_from(["provider-insights", "--on-error", "continue"]).unwrap();
        assert_eq!(args.on_error, Some(ErrorPolicy::Continue));
        assert!(Args::try_parse_from(["provider-insights", "--on-error", "retry"]).is_err());
    }
}
