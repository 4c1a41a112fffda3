//! GitHub API plumbing for the approval checker.
//!
//! All operations are scoped to one repository through [`RepoClient`].
//! Paginated listings go through octocrab's raw routes with small local
//! response models, 100 items per page; a short page ends the loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::StatusCode;
use octocrab::Octocrab;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use codeowners_approval_core::{
    CODEOWNERS_LOCATIONS, DirectoryError, ReviewEvent, ReviewState, TeamDirectory,
};

use crate::cli::config::RepoId;

const PER_PAGE: usize = 100;

/// Hard cap on changed-file pagination (100 * 30 = GitHub's 3000-file limit).
const MAX_FILE_PAGES: u32 = 30;

/// Errors from the GitHub side of the run.
///
/// Every variant here is fatal to the evaluation: the caller fails closed.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The pull request could not be loaded.
    #[error("failed to load pull request #{number}: {source}")]
    PullRequest {
        /// The pull request number.
        number: u64,
        /// The underlying API error.
        #[source]
        source: octocrab::Error,
    },

    /// No CODEOWNERS file at any candidate location.
    #[error("CODEOWNERS file not found; searched: {searched}")]
    CodeownersNotFound {
        /// The candidate paths that were tried.
        searched: String,
    },

    /// The changed-file listing failed.
    #[error("failed to list changed files: {0}")]
    ChangedFiles(#[source] octocrab::Error),

    /// The review listing failed.
    #[error("failed to list reviews: {0}")]
    Reviews(#[source] octocrab::Error),
}

/// Context about the pull request under evaluation.
#[derive(Debug, Clone, Deserialize)]
pub struct PullContext {
    /// The pull request number.
    pub number: u64,
    /// The pull request title.
    #[serde(default)]
    pub title: Option<String>,
    /// The head commit the check run is published on.
    pub head: CommitRef,
    /// The base commit the CODEOWNERS file is read from.
    pub base: CommitRef,
}

/// A commit reference within a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    /// The commit SHA.
    pub sha: String,
}

#[derive(Debug, Deserialize)]
struct DiffEntryData {
    filename: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ReviewData {
    user: Option<ReviewUser>,
    state: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ReviewUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct TeamMemberData {
    login: String,
}

/// A GitHub API client scoped to a single repository.
#[derive(Clone)]
pub struct RepoClient {
    client: Octocrab,
    repo: RepoId,
}

impl RepoClient {
    /// Creates a new client scoped to the given repository.
    pub fn new(client: Octocrab, repo: RepoId) -> Self {
        Self { client, repo }
    }

    /// Returns the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    /// Loads the pull request under evaluation.
    ///
    /// An absent or inaccessible PR is fatal: without it there is nothing to
    /// evaluate against.
    pub async fn get_pull(&self, number: u64) -> Result<PullContext, GithubError> {
        let route = format!("/repos/{}/{}/pulls/{}", self.repo.owner, self.repo.repo, number);
        self.client
            .get(&route, None::<&()>)
            .await
            .map_err(|source| GithubError::PullRequest { number, source })
    }

    /// Fetches CODEOWNERS text from the repository at the given ref.
    ///
    /// Candidate paths are tried in order; the first readable file wins, and
    /// any per-path failure just moves on to the next candidate.
    pub async fn fetch_codeowners(&self, git_ref: &str) -> Result<String, GithubError> {
        for path in CODEOWNERS_LOCATIONS {
            debug!("trying CODEOWNERS candidate '{}'", path);
            let content = self
                .client
                .repos(self.repo.owner.as_str(), self.repo.repo.as_str())
                .get_content()
                .path(path)
                .r#ref(git_ref)
                .send()
                .await;

            match content {
                Ok(items) => {
                    if let Some(text) = items.items.first().and_then(|item| item.decoded_content())
                    {
                        info!("found CODEOWNERS at '{}'", path);
                        return Ok(text);
                    }
                    warn!("'{}' exists but has no decodable content", path);
                }
                Err(e) => {
                    debug!("no CODEOWNERS at '{}': {}", path, e);
                }
            }
        }

        Err(GithubError::CodeownersNotFound {
            searched: CODEOWNERS_LOCATIONS.join(", "),
        })
    }

    /// Lists the changed paths that need ownership checks.
    ///
    /// Removed files are excluded (they need no new approval); renamed files
    /// are included under their new name. The result is deduplicated,
    /// preserving order.
    pub async fn list_changed_paths(&self, number: u64) -> Result<Vec<String>, GithubError> {
        let mut paths: Vec<String> = Vec::new();
        let mut page = 1u32;

        loop {
            let route = format!(
                "/repos/{}/{}/pulls/{}/files?per_page={}&page={}",
                self.repo.owner, self.repo.repo, number, PER_PAGE, page
            );
            let batch: Vec<DiffEntryData> = self
                .client
                .get(&route, None::<&()>)
                .await
                .map_err(GithubError::ChangedFiles)?;

            let is_last_page = batch.len() < PER_PAGE;

            for entry in batch {
                if entry.status == "removed" {
                    continue;
                }
                if !paths.iter().any(|p| p == &entry.filename) {
                    paths.push(entry.filename);
                }
            }

            if is_last_page {
                break;
            }
            page += 1;
            if page > MAX_FILE_PAGES {
                warn!(
                    "reached the {}-file pagination limit; some files may be missing",
                    PER_PAGE * MAX_FILE_PAGES as usize
                );
                break;
            }
        }

        info!("{} changed files require ownership checks", paths.len());
        Ok(paths)
    }

    /// Lists the PR's review events, chronological ascending as delivered.
    ///
    /// Events without a user, state or submission time (e.g. pending
    /// reviews) are skipped, as are states the engine does not model.
    pub async fn list_reviews(&self, number: u64) -> Result<Vec<ReviewEvent>, GithubError> {
        let mut reviews: Vec<ReviewEvent> = Vec::new();
        let mut page = 1u32;

        loop {
            let route = format!(
                "/repos/{}/{}/pulls/{}/reviews?per_page={}&page={}",
                self.repo.owner, self.repo.repo, number, PER_PAGE, page
            );
            let batch: Vec<ReviewData> = self
                .client
                .get(&route, None::<&()>)
                .await
                .map_err(GithubError::Reviews)?;

            let is_last_page = batch.len() < PER_PAGE;

            for review in batch {
                let (Some(user), Some(state), Some(submitted_at)) =
                    (review.user, review.state, review.submitted_at)
                else {
                    continue;
                };
                if let Some(state) = map_review_state(&state) {
                    reviews.push(ReviewEvent::new(user.login, state, submitted_at));
                }
            }

            if is_last_page {
                break;
            }
            page += 1;
        }

        info!("found {} reviews on PR #{}", reviews.len(), number);
        Ok(reviews)
    }
}

/// Maps a review state string from the API to the engine's enum.
///
/// Accepts both the `REQUEST_CHANGES` spelling used in stored results and
/// GitHub's wire spelling `CHANGES_REQUESTED`.
fn map_review_state(state: &str) -> Option<ReviewState> {
    match state {
        "APPROVED" => Some(ReviewState::Approved),
        "REQUEST_CHANGES" | "CHANGES_REQUESTED" => Some(ReviewState::RequestChanges),
        "COMMENTED" => Some(ReviewState::Commented),
        "DISMISSED" => Some(ReviewState::Dismissed),
        _ => None,
    }
}

/// Extracts the HTTP status code from an octocrab error.
fn extract_status_code(error: &octocrab::Error) -> Option<StatusCode> {
    match error {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code),
        _ => None,
    }
}

/// The octocrab-backed team directory used for membership lookups.
pub struct OctocrabDirectory {
    client: Octocrab,
}

impl OctocrabDirectory {
    /// Creates a directory backed by the given client.
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TeamDirectory for OctocrabDirectory {
    async fn list_team_members(
        &self,
        org: &str,
        team: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let mut members: Vec<String> = Vec::new();
        let mut page = 1u32;

        loop {
            let route = format!(
                "/orgs/{}/teams/{}/members?per_page={}&page={}",
                org, team, PER_PAGE, page
            );
            let batch: Vec<TeamMemberData> = self
                .client
                .get(&route, None::<&()>)
                .await
                .map_err(classify_directory_error)?;

            let is_last_page = batch.len() < PER_PAGE;
            members.extend(batch.into_iter().map(|member| member.login));

            if is_last_page {
                break;
            }
            page += 1;
        }

        Ok(members)
    }
}

/// Classifies an octocrab error into the core's directory error taxonomy.
fn classify_directory_error(error: octocrab::Error) -> DirectoryError {
    match extract_status_code(&error) {
        Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            DirectoryError::Auth(error.to_string())
        }
        Some(StatusCode::TOO_MANY_REQUESTS) => DirectoryError::RateLimitExceeded,
        Some(_) => DirectoryError::Api(error.to_string()),
        None => DirectoryError::Network(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_octocrab(base_uri: &str) -> Octocrab {
        Octocrab::builder().base_uri(base_uri).unwrap().build().unwrap()
    }

    fn repo_client(base_uri: &str) -> RepoClient {
        RepoClient::new(
            create_octocrab(base_uri),
            RepoId {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
            },
        )
    }

    #[test]
    fn review_state_mapping() {
        assert_eq!(map_review_state("APPROVED"), Some(ReviewState::Approved));
        assert_eq!(
            map_review_state("CHANGES_REQUESTED"),
            Some(ReviewState::RequestChanges)
        );
        assert_eq!(
            map_review_state("REQUEST_CHANGES"),
            Some(ReviewState::RequestChanges)
        );
        assert_eq!(map_review_state("COMMENTED"), Some(ReviewState::Commented));
        assert_eq!(map_review_state("DISMISSED"), Some(ReviewState::Dismissed));
        assert_eq!(map_review_state("PENDING"), None);
    }

    #[tokio::test]
    async fn get_pull_reads_head_and_base() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "number": 42,
                "title": "Add widgets",
                "head": { "sha": "abc123" },
                "base": { "sha": "def456" }
            })))
            .mount(&server)
            .await;

        let pull = repo_client(&server.uri()).get_pull(42).await.unwrap();
        assert_eq!(pull.number, 42);
        assert_eq!(pull.head.sha, "abc123");
        assert_eq!(pull.base.sha, "def456");
    }

    #[tokio::test]
    async fn missing_pull_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls/42"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let result = repo_client(&server.uri()).get_pull(42).await;
        assert!(matches!(
            result,
            Err(GithubError::PullRequest { number: 42, .. })
        ));
    }

    #[tokio::test]
    async fn changed_paths_exclude_removed_and_dedupe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls/7/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "filename": "src/app.js", "status": "modified" },
                { "filename": "old.txt", "status": "removed" },
                { "filename": "docs/guide.md", "status": "renamed" },
                { "filename": "src/app.js", "status": "modified" }
            ])))
            .mount(&server)
            .await;

        let paths = repo_client(&server.uri()).list_changed_paths(7).await.unwrap();
        assert_eq!(paths, ["src/app.js", "docs/guide.md"]);
    }

    #[tokio::test]
    async fn reviews_skip_incomplete_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls/7/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "user": { "login": "alice" },
                    "state": "APPROVED",
                    "submitted_at": "2023-10-01T12:00:00Z"
                },
                { "user": { "login": "ghost" }, "state": "PENDING", "submitted_at": null },
                {
                    "user": { "login": "bob" },
                    "state": "CHANGES_REQUESTED",
                    "submitted_at": "2023-10-01T13:00:00Z"
                }
            ])))
            .mount(&server)
            .await;

        let reviews = repo_client(&server.uri()).list_reviews(7).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].reviewer, "alice");
        assert_eq!(reviews[0].state, ReviewState::Approved);
        assert_eq!(reviews[1].state, ReviewState::RequestChanges);
    }

    #[tokio::test]
    async fn codeowners_candidate_walk_falls_through_to_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/.github/CODEOWNERS"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;
        // "* @owner\n" base64-encoded.
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/CODEOWNERS"))
            .and(query_param("ref", "def456"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "file",
                "name": "CODEOWNERS",
                "path": "CODEOWNERS",
                "sha": "3d21ec53a331a6f037a91c368710b99387d012c1",
                "size": 9,
                "encoding": "base64",
                "content": "KiBAb3duZXIK",
                "url": "https://api.github.com/repos/acme/widgets/contents/CODEOWNERS",
                "html_url": "https://github.com/acme/widgets/blob/main/CODEOWNERS",
                "git_url": "https://api.github.com/repos/acme/widgets/git/blobs/3d21ec53",
                "download_url": "https://raw.githubusercontent.com/acme/widgets/main/CODEOWNERS",
                "_links": {
                    "self": "https://api.github.com/repos/acme/widgets/contents/CODEOWNERS",
                    "git": "https://api.github.com/repos/acme/widgets/git/blobs/3d21ec53",
                    "html": "https://github.com/acme/widgets/blob/main/CODEOWNERS"
                }
            })))
            .mount(&server)
            .await;

        let text = repo_client(&server.uri())
            .fetch_codeowners("def456")
            .await
            .unwrap();
        assert_eq!(text, "* @owner\n");
    }

    #[tokio::test]
    async fn codeowners_missing_everywhere_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let result = repo_client(&server.uri()).fetch_codeowners("sha").await;
        assert!(matches!(result, Err(GithubError::CodeownersNotFound { .. })));
    }

    #[tokio::test]
    async fn team_members_are_paginated() {
        let server = MockServer::start().await;

        let first_page: Vec<_> = (0..100)
            .map(|i| json!({ "login": format!("user{}", i) }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams/backend/members"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(first_page)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams/backend/members"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "login": "straggler" }])),
            )
            .mount(&server)
            .await;

        let directory = OctocrabDirectory::new(create_octocrab(&server.uri()));
        let members = directory.list_team_members("acme", "backend").await.unwrap();
        assert_eq!(members.len(), 101);
        assert_eq!(members[0], "user0");
        assert_eq!(members[100], "straggler");
    }

    #[tokio::test]
    async fn forbidden_team_lookup_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams/secret/members"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "Forbidden",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let directory = OctocrabDirectory::new(create_octocrab(&server.uri()));
        let result = directory.list_team_members("acme", "secret").await;
        assert!(matches!(result, Err(DirectoryError::Auth(_))));
    }
}
