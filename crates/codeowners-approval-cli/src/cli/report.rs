//! Publishing the verdict back to the pull request.
//!
//! Two sinks: a check run on the head commit and a sticky PR comment
//! identified by a hidden marker. Both are upserts, and both are
//! best-effort: the verdict is already computed, so publish failures are
//! logged and swallowed rather than propagated.

use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use codeowners_approval_core::ApprovalCheckResult;

use crate::cli::config::RepoId;

/// The marker that identifies the bot's comment across updates.
pub const COMMENT_MARKER: &str = "<!-- code-owners-approval -->";

#[derive(Debug, Serialize)]
struct CheckRunOutputBody {
    title: String,
    summary: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct CheckRunRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_sha: Option<&'a str>,
    status: &'static str,
    conclusion: &'static str,
    output: CheckRunOutputBody,
}

#[derive(Debug, Deserialize)]
struct CheckRunList {
    check_runs: Vec<CheckRunData>,
}

#[derive(Debug, Deserialize)]
struct CheckRunData {
    id: u64,
}

#[derive(Debug, Serialize)]
struct CommentUpdateRequest<'a> {
    body: &'a str,
}

/// Publishes verdicts to the check-run and comment sinks.
pub struct Reporter<'a> {
    client: &'a Octocrab,
    repo: &'a RepoId,
    check_name: &'a str,
}

impl<'a> Reporter<'a> {
    /// Creates a reporter for one repository and check name.
    pub fn new(client: &'a Octocrab, repo: &'a RepoId, check_name: &'a str) -> Self {
        Self {
            client,
            repo,
            check_name,
        }
    }

    /// Upserts the check run for the verdict on the head commit.
    pub async fn publish_check_run(&self, head_sha: &str, result: &ApprovalCheckResult) {
        let conclusion = if result.all_approved { "success" } else { "failure" };
        let output = CheckRunOutputBody {
            title: check_title(result),
            summary: check_summary(result),
            text: check_details(result),
        };

        if let Err(e) = self.upsert_check_run(head_sha, conclusion, output).await {
            warn!("failed to publish check run: {}", e);
        }
    }

    /// Publishes a failing check run with a human-readable reason.
    ///
    /// Used when the evaluation itself failed: the unknown state must block
    /// the merge rather than silently pass.
    pub async fn publish_failure(&self, head_sha: &str, reason: &str) {
        let output = CheckRunOutputBody {
            title: "Code owners check failed".to_string(),
            summary: format!("The approval check could not be completed: {}", reason),
            text: "Re-run the check once the underlying problem is resolved.".to_string(),
        };

        if let Err(e) = self.upsert_check_run(head_sha, "failure", output).await {
            warn!("failed to publish failure check run: {}", e);
        }
    }

    async fn upsert_check_run(
        &self,
        head_sha: &str,
        conclusion: &'static str,
        output: CheckRunOutputBody,
    ) -> Result<(), octocrab::Error> {
        let list_route = format!(
            "/repos/{}/{}/commits/{}/check-runs?check_name={}",
            self.repo.owner, self.repo.repo, head_sha, self.check_name
        );
        let existing: CheckRunList = self.client.get(&list_route, None::<&()>).await?;

        if let Some(check_run) = existing.check_runs.first() {
            let route = format!(
                "/repos/{}/{}/check-runs/{}",
                self.repo.owner, self.repo.repo, check_run.id
            );
            let request = CheckRunRequest {
                name: self.check_name,
                head_sha: None,
                status: "completed",
                conclusion,
                output,
            };
            let _: serde_json::Value = self.client.patch(&route, Some(&request)).await?;
            info!("updated check run #{}", check_run.id);
        } else {
            let route = format!("/repos/{}/{}/check-runs", self.repo.owner, self.repo.repo);
            let request = CheckRunRequest {
                name: self.check_name,
                head_sha: Some(head_sha),
                status: "completed",
                conclusion,
                output,
            };
            let _: serde_json::Value = self.client.post(&route, Some(&request)).await?;
            info!("created check run on {}", head_sha);
        }

        Ok(())
    }

    /// Upserts the sticky PR comment carrying the verdict.
    pub async fn publish_comment(&self, pr_number: u64, result: &ApprovalCheckResult) {
        let body = comment_body(result);

        if let Err(e) = self.upsert_comment(pr_number, &body).await {
            warn!("failed to publish PR comment: {}", e);
        }
    }

    async fn upsert_comment(&self, pr_number: u64, body: &str) -> Result<(), octocrab::Error> {
        let comments = self
            .client
            .issues(self.repo.owner.as_str(), self.repo.repo.as_str())
            .list_comments(pr_number)
            .per_page(100)
            .send()
            .await?;

        let existing = comments
            .items
            .iter()
            .find(|comment| {
                comment
                    .body
                    .as_deref()
                    .is_some_and(|b| b.contains(COMMENT_MARKER))
            })
            .map(|comment| comment.id.into_inner());

        if let Some(comment_id) = existing {
            let route = format!(
                "/repos/{}/{}/issues/comments/{}",
                self.repo.owner, self.repo.repo, comment_id
            );
            let _: serde_json::Value = self
                .client
                .patch(&route, Some(&CommentUpdateRequest { body }))
                .await?;
            info!("updated PR comment #{}", comment_id);
        } else {
            self.client
                .issues(self.repo.owner.as_str(), self.repo.repo.as_str())
                .create_comment(pr_number, body)
                .await?;
            info!("created PR comment on #{}", pr_number);
        }

        Ok(())
    }
}

/// One-line title for the check run.
fn check_title(result: &ApprovalCheckResult) -> String {
    if result.all_approved {
        format!(
            "All required code owners have approved ({}/{})",
            result.total_approved, result.total_required
        )
    } else {
        format!(
            "Missing approvals from {} owner group(s)",
            result.missing.len()
        )
    }
}

/// Short summary paragraph for the check run.
fn check_summary(result: &ApprovalCheckResult) -> String {
    if result.total_required == 0 {
        return "No code owners are required for the changes in this PR.".to_string();
    }

    if result.all_approved {
        format!(
            "All {} required code owner groups have approved this PR.",
            result.total_required
        )
    } else {
        let pending = result.total_required - result.total_approved;
        format!(
            "{}/{} required code owner groups have approved. {} still pending.",
            result.total_approved, result.total_required, pending
        )
    }
}

/// Detailed markdown for the check run.
fn check_details(result: &ApprovalCheckResult) -> String {
    if result.total_required == 0 {
        return "This PR does not modify any files that require code owner approvals.".to_string();
    }

    let mut lines = vec!["## Required Code Owner Approvals".to_string(), String::new()];

    for status in &result.statuses {
        let approval_text = if status.is_approved {
            format!("approved by {}", status.approved_by.join(", "))
        } else {
            "pending approval".to_string()
        };
        lines.push(format!(
            "- **{}** {} ({} files)",
            status.owner,
            approval_text,
            status.files.len()
        ));
    }

    if !result.missing.is_empty() {
        lines.push(String::new());
        lines.push("### Still needed:".to_string());
        for owner in &result.missing {
            lines.push(format!("- {}", owner));
        }
    }

    lines.join("\n")
}

/// Maximum number of files listed per owner in the PR comment.
const COMMENT_FILES_PER_OWNER: usize = 5;

/// Full markdown body for the sticky PR comment.
fn comment_body(result: &ApprovalCheckResult) -> String {
    let mut lines = vec![
        COMMENT_MARKER.to_string(),
        String::new(),
        "## Code Owners Approval Status".to_string(),
        String::new(),
    ];

    if result.total_required == 0 {
        lines.push("**No code owners are required for this PR.**".to_string());
        lines.push(String::new());
        lines.push(
            "The files changed in this PR do not match any patterns in the CODEOWNERS file."
                .to_string(),
        );
    } else {
        if result.all_approved {
            lines.push("**All required code owners have approved this PR.**".to_string());
        } else {
            lines.push(format!(
                "**{}/{} required code owner groups have approved.**",
                result.total_approved, result.total_required
            ));
        }
        lines.push(String::new());
        lines.push("### Required Approvals:".to_string());
        lines.push(String::new());

        for status in &result.statuses {
            let checkbox = if status.is_approved { "[x]" } else { "[ ]" };
            if status.is_approved {
                let approvers: Vec<String> = status
                    .approved_by
                    .iter()
                    .map(|user| format!("@{}", user))
                    .collect();
                lines.push(format!(
                    "- {} **{}** (approved by {})",
                    checkbox,
                    status.owner,
                    approvers.join(", ")
                ));
            } else {
                lines.push(format!("- {} **{}** (pending)", checkbox, status.owner));
            }

            for file in status.files.iter().take(COMMENT_FILES_PER_OWNER) {
                lines.push(format!("  - `{}`", file));
            }
            if status.files.len() > COMMENT_FILES_PER_OWNER {
                lines.push(format!(
                    "  - ... and {} more files",
                    status.files.len() - COMMENT_FILES_PER_OWNER
                ));
            }
            lines.push(String::new());
        }
    }

    lines.push("---".to_string());
    lines.push("*This comment is automatically updated by the code owners approval check*".to_string());

    lines.join("\n")
}
