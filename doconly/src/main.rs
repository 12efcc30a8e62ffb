//! # doconly
//!
//! A CLI tool telling whether a change only touches documentation.
//!
//! ## Overview
//!
//! doconly is built on top of doconlylib. Documentation files (`*.md`,
//! `*.rst`) always count as documentation; Python files count when only
//! their docstrings changed. Any other changed file makes the change more
//! than documentation.
//!
//! ## Usage
//!
//! ```bash
//! # Compare two versions of a Python file
//! doconly check old.py new.py
//!
//! # Check every file changed between two commits
//! doconly diff main..feature
//! doconly diff main feature
//!
//! # Against HEAD, with only the python hook
//! doconly diff origin/main --hooks python
//!
//! # JSON report
//! doconly diff main --output json
//! ```
//!
//! ## Exit codes
//!
//! - `0`: documentation-only change
//! - `1`: a file could not be checked, or the command failed
//! - `2`: the change touches more than documentation

use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::Style;
use doconlylib::hooks::IS_DOCUMENTATION;
use doconlylib::options::parse_hook_list;
use doconlylib::{
    diff_commits, parse_commit_range, CheckOptions, FileContents, Hook, HookKind, Report,
};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable naming the base branch of a pull request
const BASE_REF_VAR: &str = "GITHUB_BASE_REF";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    fn from_matches(matches: &ArgMatches) -> Self {
        match matches.get_one::<String>("output").map(String::as_str) {
            Some("json") => OutputMode::Json,
            _ => OutputMode::Text,
        }
    }
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("doconly")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Arthur Debert")
        .about("Tells whether a change only touches documentation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Output format"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Log more (repeat for more detail)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only log errors"),
        )
        .subcommand(
            Command::new("check")
                .about("Compare two versions of a Python file")
                .arg(
                    Arg::new("before")
                        .required(true)
                        .help("File before the change"),
                )
                .arg(
                    Arg::new("after")
                        .required(true)
                        .help("File after the change"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Check every file changed between two git commits")
                .arg(Arg::new("base").help(
                    "Commit range (e.g., main..HEAD) or base commit [default: $GITHUB_BASE_REF]",
                ))
                .arg(Arg::new("head").help("Target commit (defaults to HEAD)"))
                .arg(
                    Arg::new("path")
                        .short('p')
                        .long("path")
                        .default_value(".")
                        .help("Path to repository"),
                )
                .arg(
                    Arg::new("hooks")
                        .long("hooks")
                        .help("Comma-separated hooks to run (default: unconditional,python)"),
                )
                .arg(
                    Arg::new("allowed-files")
                        .long("allowed-files")
                        .value_name("HOOK=PATTERN")
                        .action(ArgAction::Append)
                        .help("Replace a hook's file patterns (can be specified multiple times)"),
                ),
        )
}

/// Set up logging on stderr; `RUST_LOG` overrides the verbosity flags
fn init_tracing(matches: &ArgMatches) {
    let filter = if matches.get_flag("quiet") {
        "error"
    } else {
        match matches.get_count("verbose") {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Build check options from the environment and the command line
fn build_options(matches: &ArgMatches) -> anyhow::Result<CheckOptions> {
    let mut options = CheckOptions::from_env().context("invalid LDC_* environment variables")?;

    if let Some(hooks) = matches.get_one::<String>("hooks") {
        options = options.with_hooks(parse_hook_list(hooks)?);
    }

    if let Some(overrides) = matches.get_many::<String>("allowed-files") {
        let mut patterns: Vec<(HookKind, Vec<String>)> = Vec::new();
        for entry in overrides {
            let Some((name, pattern)) = entry.split_once('=') else {
                bail!("invalid --allowed-files value '{}': expected HOOK=PATTERN", entry);
            };
            let kind: HookKind = name.parse()?;
            match patterns.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, list)) => list.push(pattern.to_string()),
                None => patterns.push((kind, vec![pattern.to_string()])),
            }
        }
        for (kind, list) in patterns {
            options = options.with_allowed_files(kind, list);
        }
    }

    Ok(options)
}

/// Handler for check command
fn check_handler(matches: &ArgMatches) -> anyhow::Result<Report> {
    let before = matches
        .get_one::<String>("before")
        .context("missing BEFORE file")?;
    let after = matches
        .get_one::<String>("after")
        .context("missing AFTER file")?;

    let file = FileContents::from_paths(before, after)?;
    let hook = Hook::new(HookKind::Python)?;
    Ok(hook.run(&[&file]))
}

/// Handler for diff command
fn diff_handler(matches: &ArgMatches, mode: OutputMode) -> anyhow::Result<Report> {
    let path = matches
        .get_one::<String>("path")
        .map(|s| s.as_str())
        .unwrap_or(".");

    let base = match matches.get_one::<String>("base") {
        Some(base) => base.clone(),
        None => std::env::var(BASE_REF_VAR)
            .ok()
            .filter(|value| !value.is_empty())
            .with_context(|| format!("no base commit given and {} is not set", BASE_REF_VAR))?,
    };
    let head = matches.get_one::<String>("head").map(|s| s.as_str());
    let (base, head) = parse_commit_range(&base, head)?;

    let options = build_options(matches)?;
    tracing::info!(%base, %head, hooks = ?options.hooks, "checking commit range");

    let result = diff_commits(path, &base, &head, &options)?;
    if mode == OutputMode::Json {
        print_json(&result)?;
    } else {
        print_messages(&result.report);
    }
    Ok(result.report)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print verdicts: problems on stderr, the rest on stdout
fn print_messages(report: &Report) {
    let marker = Style::new().red().bold().for_stderr();
    let documentation = Style::new().green().for_stdout();

    for message in &report.messages {
        if message.kind.is_problem() {
            eprintln!(
                "{} {} {}",
                marker.apply_to("!!!"),
                message.filename,
                message.text
            );
        } else if message.text == IS_DOCUMENTATION {
            println!("{} {}", message.filename, documentation.apply_to(&message.text));
        } else {
            println!("{} {}", message.filename, message.text);
        }
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<Report> {
    match matches.subcommand() {
        Some(("check", sub)) => {
            let report = check_handler(sub)?;
            if OutputMode::from_matches(sub) == OutputMode::Json {
                print_json(&report)?;
            } else {
                print_messages(&report);
            }
            Ok(report)
        }
        Some(("diff", sub)) => diff_handler(sub, OutputMode::from_matches(sub)),
        Some((name, _)) => bail!("unknown command '{}'", name),
        None => bail!("no command given"),
    }
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();
    // Global flags are read from the subcommand, where clap propagates them.
    let leaf = matches.subcommand().map_or(&matches, |(_, sub)| sub);
    init_tracing(leaf);

    match run(&matches) {
        Ok(report) => {
            let code = report.exit_code();
            tracing::debug!(code, "finished");
            ExitCode::from(code as u8)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_valid() {
        build_command().debug_assert();
    }

    #[test]
    fn test_build_options_from_flags() {
        let matches = build_command().get_matches_from([
            "doconly",
            "diff",
            "main",
            "--hooks",
            "python",
            "--allowed-files",
            "python=src/*.py",
            "--allowed-files",
            "python=!src/setup.py",
        ]);
        let (_, sub) = matches.subcommand().unwrap();
        let options = build_options(sub).unwrap();

        assert_eq!(options.hooks, vec![HookKind::Python]);
        assert_eq!(
            options.allowed_files[&HookKind::Python],
            vec!["src/*.py".to_string(), "!src/setup.py".to_string()]
        );
    }

    #[test]
    fn test_build_options_rejects_malformed_override() {
        let matches =
            build_command().get_matches_from(["doconly", "diff", "--allowed-files", "python"]);
        let (_, sub) = matches.subcommand().unwrap();
        assert!(build_options(sub).is_err());
    }

    #[test]
    fn test_output_mode() {
        let matches =
            build_command().get_matches_from(["doconly", "check", "a", "b", "-o", "json"]);
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(OutputMode::from_matches(sub), OutputMode::Json);

        let matches = build_command().get_matches_from(["doconly", "check", "a", "b"]);
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(OutputMode::from_matches(sub), OutputMode::Text);
    }
}
