//! Configuration handling for the CLI.
//!
//! This module validates CLI arguments into the runtime configuration and
//! handles GitHub authentication setup.

use crate::cli::Args;
use codeowners_approval_core::ApprovalCheckResult;
use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use octocrab::models::{AppId, InstallationId};
use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required configuration.
    #[error("missing required configuration: {0}")]
    MissingRequired(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// GitHub authentication error.
    #[error("GitHub authentication error: {0}")]
    GitHubAuth(String),
}

/// Application exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every required owner group has approved.
    Success = 0,
    /// Application startup failed (wrong configuration or internal error).
    StartupFailure = 1,
    /// Application terminated by signal (SIGINT/SIGTERM).
    Terminated = 2,
    /// Approvals are missing, or the evaluation failed (which blocks too).
    CheckFailed = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Maps a computed verdict to the process exit code.
    pub fn for_result(result: &ApprovalCheckResult) -> Self {
        if result.all_approved {
            ExitCode::Success
        } else {
            ExitCode::CheckFailed
        }
    }
}

/// A repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    /// The user or organization owning the repository.
    pub owner: String,
    /// The repository name.
    pub repo: String,
}

impl RepoId {
    /// Parses an 'owner/repo' string.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(ConfigError::Invalid(format!(
                "repository '{}' is not in 'owner/repo' format",
                value
            ))),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Validated and processed configuration for one run.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// The repository the pull request belongs to.
    pub repo: RepoId,
    /// The pull request number.
    pub pr_number: u64,
    /// Name of the published check run.
    pub check_name: String,
    /// Local CODEOWNERS override, if any.
    pub codeowners_file: Option<PathBuf>,
    /// Whether to skip the check-run publish.
    pub skip_status_check: bool,
    /// Whether to skip the comment publish.
    pub skip_comment: bool,
    /// Whether to output JSON.
    pub json_output: bool,
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let repo = RepoId::parse(&args.repository)?;

        if !args.has_github_auth() {
            return Err(ConfigError::MissingRequired(
                "GITHUB_TOKEN or GitHub App credentials are required".to_string(),
            ));
        }

        if let Some(path) = &args.codeowners_file {
            if !path.is_file() {
                return Err(ConfigError::Invalid(format!(
                    "CODEOWNERS override '{}' does not exist or is not a file",
                    path.display()
                )));
            }
        }

        Ok(Self {
            repo,
            pr_number: args.pr,
            check_name: args.check_name.clone(),
            codeowners_file: args.codeowners_file.clone(),
            skip_status_check: args.skip_status_check,
            skip_comment: args.skip_comment,
            json_output: args.json,
        })
    }
}

/// Creates an authenticated Octocrab client from CLI arguments.
pub fn create_octocrab(args: &Args) -> Result<Octocrab, ConfigError> {
    let base_url = if args.github_base_url != "https://api.github.com/" {
        Some(args.github_base_url.as_str())
    } else {
        None
    };

    if args.has_github_app_auth() {
        // GitHub App authentication; has_github_app_auth guarantees the trio.
        let app_id = args
            .github_app_id
            .map(AppId)
            .ok_or_else(|| ConfigError::MissingRequired("GITHUB_APP_ID".to_string()))?;
        let installation_id = args.github_app_installation_id.map(InstallationId).ok_or_else(
            || ConfigError::MissingRequired("GITHUB_APP_INSTALLATION_ID".to_string()),
        )?;
        let private_key = args
            .github_app_private_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired("GITHUB_APP_PRIVATE_KEY".to_string()))?;

        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| ConfigError::GitHubAuth(format!("invalid private key: {}", e)))?;

        let mut builder = Octocrab::builder().app(app_id, key);
        if let Some(url) = base_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| ConfigError::GitHubAuth(format!("invalid base URL: {}", e)))?;
        }
        let app_client = builder
            .build()
            .map_err(|e| ConfigError::GitHubAuth(format!("failed to create app client: {}", e)))?;

        app_client
            .installation(installation_id)
            .map_err(|e| ConfigError::GitHubAuth(format!("failed to get installation client: {}", e)))
    } else if let Some(ref token) = args.github_token {
        // Tokens travel as SecretString so they stay out of debug output.
        let token = SecretString::from(token.clone());

        let mut builder = Octocrab::builder();
        if let Some(url) = base_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| ConfigError::GitHubAuth(format!("invalid base URL: {}", e)))?;
        }
        builder
            .personal_token(token)
            .build()
            .map_err(|e| ConfigError::GitHubAuth(format!("failed to build client: {}", e)))
    } else {
        Err(ConfigError::MissingRequired(
            "GITHUB_TOKEN or GitHub App credentials are required".to_string(),
        ))
    }
}
