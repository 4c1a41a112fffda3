//! CODEOWNERS Approval CLI
//!
//! Checks which code owner groups must approve a pull request, whether they
//! have, and publishes the verdict back to the PR.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode as StdExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use thiserror::Error;
use tokio::signal;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Args;
use cli::config::{ExitCode, ValidatedConfig, create_octocrab};
use cli::github::{GithubError, OctocrabDirectory, PullContext, RepoClient};
use cli::output::{HumanOutput, JsonReport};
use cli::report::Reporter;

use codeowners_approval_core::{
    ApprovalCheckResult, OwnershipMapping, RuleSetCache, evaluate_approvals,
};

#[tokio::main]
async fn main() -> StdExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.verbose, args.json);

    // Set up signal handling for graceful shutdown
    let terminated = Arc::new(AtomicBool::new(false));
    let terminated_clone = terminated.clone();

    tokio::spawn(async move {
        let ctrl_c = signal::ctrl_c();
        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT, shutting down...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down...");
            }
        }

        terminated_clone.store(true, Ordering::SeqCst);
    });

    let exit_code = run(args, &terminated).await;

    if terminated.load(Ordering::SeqCst) {
        return StdExitCode::from(ExitCode::Terminated as u8);
    }

    StdExitCode::from(i32::from(exit_code) as u8)
}

/// Initialize tracing based on verbosity level.
fn init_tracing(verbosity: u8, json_output: bool) {
    // Don't mix logs into JSON output mode
    if json_output {
        return;
    }

    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("octocrab=warn".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

/// Errors that abort an evaluation.
#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Github(#[from] GithubError),

    #[error("failed to read CODEOWNERS file '{path}': {source}")]
    ReadCodeowners {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Run the checker with the given arguments.
async fn run(args: Args, terminated: &AtomicBool) -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let use_colors = !args.json && io::stdout().is_terminal();

    let config = match ValidatedConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            let _ = HumanOutput::new(&mut stderr, use_colors).write_error(&e.to_string());
            return ExitCode::StartupFailure;
        }
    };

    debug!("Validated configuration: {:?}", config);
    info!("Processing PR #{} in {}", config.pr_number, config.repo);

    let octocrab = match create_octocrab(&args) {
        Ok(client) => client,
        Err(e) => {
            let _ = HumanOutput::new(&mut stderr, use_colors).write_error(&e.to_string());
            return ExitCode::StartupFailure;
        }
    };

    let client = RepoClient::new(octocrab.clone(), config.repo.clone());
    let reporter = Reporter::new(&octocrab, &config.repo, &config.check_name);

    // Without the PR context there is no head commit to report against.
    let pull = match client.get_pull(config.pr_number).await {
        Ok(pull) => pull,
        Err(e) => {
            error!("{}", e);
            let _ = HumanOutput::new(&mut stderr, use_colors).write_error(&e.to_string());
            return ExitCode::StartupFailure;
        }
    };

    info!(
        "Evaluating PR: {} (#{})",
        pull.title.as_deref().unwrap_or("<untitled>"),
        pull.number
    );

    if terminated.load(Ordering::SeqCst) {
        return ExitCode::Terminated;
    }

    match evaluate(&client, &config, &pull).await {
        Ok((result, orphans)) => {
            if terminated.load(Ordering::SeqCst) {
                return ExitCode::Terminated;
            }

            if !config.skip_status_check {
                reporter.publish_check_run(&pull.head.sha, &result).await;
            }
            if !config.skip_comment {
                reporter.publish_comment(pull.number, &result).await;
            }

            if config.json_output {
                if let Err(e) = JsonReport::new(&result, &orphans).write(&mut stdout) {
                    error!("Failed to write JSON output: {}", e);
                    return ExitCode::StartupFailure;
                }
            } else if let Err(e) =
                HumanOutput::new(&mut stdout, use_colors).write_result(&result, &orphans)
            {
                error!("Failed to write output: {}", e);
                return ExitCode::StartupFailure;
            }

            ExitCode::for_result(&result)
        }
        Err(e) => {
            // Fail closed: an evaluation that cannot complete blocks the
            // merge, and the reason is published where reviewers can see it.
            error!("evaluation failed: {}", e);
            if !config.skip_status_check {
                reporter.publish_failure(&pull.head.sha, &e.to_string()).await;
            }
            let _ = HumanOutput::new(&mut stderr, use_colors).write_error(&e.to_string());
            ExitCode::CheckFailed
        }
    }
}

/// Fetches the inputs and computes the verdict for one pull request.
async fn evaluate(
    client: &RepoClient,
    config: &ValidatedConfig,
    pull: &PullContext,
) -> Result<(ApprovalCheckResult, Vec<String>), RunError> {
    let codeowners_text = match &config.codeowners_file {
        Some(path) => {
            info!("reading CODEOWNERS from local file '{}'", path.display());
            std::fs::read_to_string(path).map_err(|source| RunError::ReadCodeowners {
                path: path.clone(),
                source,
            })?
        }
        None => client.fetch_codeowners(&pull.base.sha).await?,
    };

    let cache = RuleSetCache::new();
    let ruleset = cache.get_or_parse(&codeowners_text);
    info!("parsed {} ownership rules", ruleset.len());

    let changed = client.list_changed_paths(pull.number).await?;
    let mapping = OwnershipMapping::build(&ruleset, &changed);

    let orphans = mapping.orphaned_files();
    for file in &orphans {
        warn!("file '{}' has no code owners", file);
    }

    if !mapping.has_requirements() {
        info!("no code owners are required for this PR");
        return Ok((ApprovalCheckResult::vacuous(), orphans));
    }

    let reviews = client.list_reviews(pull.number).await?;

    let directory = OctocrabDirectory::new(client.inner().clone());
    let result = evaluate_approvals(mapping.requirements(), &reviews, &directory).await;

    Ok((result, orphans))
}
