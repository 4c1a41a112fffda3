//! Owner-group membership resolution.
//!
//! An owner handle from the rule file is either an individual
//! (`@login`) or a team (`@org/team-slug`). Teams are expanded through an
//! external directory behind the [`TeamDirectory`] trait, so the engine can
//! be driven by any backend (octocrab in the CLI, mocks in tests).
//!
//! Lookups never fail hard: a directory error degrades the team to its slug
//! treated as a single individual, and a handle that cannot be classified
//! resolves to an empty membership. Both arms are values, not errors, so the
//! aggregator never special-cases missing members.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when querying the external directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory API rejected the request.
    #[error("directory API error: {0}")]
    Api(String),

    /// A network problem reaching the directory.
    #[error("network error: {0}")]
    Network(String),

    /// Authentication or authorization failed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Trait for directory backends that can list a team's members.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    /// Lists the member logins of `team` within `org`.
    async fn list_team_members(&self, org: &str, team: &str)
    -> Result<Vec<String>, DirectoryError>;
}

/// How a membership was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipSource {
    /// The handle names a single individual.
    Individual,
    /// The directory returned the team's member list.
    Team,
    /// The directory lookup failed; the team slug stands in as an
    /// individual.
    TeamFallback,
    /// The handle could not be classified; membership is empty.
    InvalidHandle,
}

/// The resolved membership of one owner group.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerMembership {
    /// The owner handle as written in the rule file.
    pub owner: String,
    /// The member logins the handle expands to.
    pub members: Vec<String>,
    /// How the members were obtained.
    pub source: MembershipSource,
}

impl OwnerMembership {
    /// Returns true if the lookup degraded instead of resolving cleanly.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.source,
            MembershipSource::TeamFallback | MembershipSource::InvalidHandle
        )
    }
}

enum ParsedHandle<'a> {
    Individual(&'a str),
    Team { org: &'a str, team: &'a str },
    Invalid,
}

/// Classifies a handle after stripping one leading `@`.
///
/// A team handle must split into exactly two non-empty `/`-separated
/// segments; anything else with a `/` in it is invalid.
fn classify_handle(handle: &str) -> ParsedHandle<'_> {
    let clean = handle.strip_prefix('@').unwrap_or(handle);

    if !clean.contains('/') {
        if clean.is_empty() {
            return ParsedHandle::Invalid;
        }
        return ParsedHandle::Individual(clean);
    }

    let mut segments = clean.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(org), Some(team), None) if !org.is_empty() && !team.is_empty() => {
            ParsedHandle::Team { org, team }
        }
        _ => ParsedHandle::Invalid,
    }
}

/// Expands an owner handle into its concrete members.
pub async fn resolve_members(directory: &dyn TeamDirectory, handle: &str) -> OwnerMembership {
    match classify_handle(handle) {
        ParsedHandle::Individual(login) => OwnerMembership {
            owner: handle.to_string(),
            members: vec![login.to_string()],
            source: MembershipSource::Individual,
        },
        ParsedHandle::Team { org, team } => match directory.list_team_members(org, team).await {
            Ok(members) => {
                debug!("team {} has {} members", handle, members.len());
                OwnerMembership {
                    owner: handle.to_string(),
                    members,
                    source: MembershipSource::Team,
                }
            }
            Err(e) => {
                warn!(
                    "failed to list members for {}: {}; treating '{}' as an individual",
                    handle, e, team
                );
                OwnerMembership {
                    owner: handle.to_string(),
                    members: vec![team.to_string()],
                    source: MembershipSource::TeamFallback,
                }
            }
        },
        ParsedHandle::Invalid => {
            warn!("invalid owner handle '{}', expected @login or @org/team", handle);
            OwnerMembership {
                owner: handle.to_string(),
                members: Vec::new(),
                source: MembershipSource::InvalidHandle,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// A directory backed by a fixed team table.
    struct MockDirectory {
        teams: HashMap<(String, String), Vec<String>>,
        fail_all: bool,
    }

    impl MockDirectory {
        fn new() -> Self {
            Self {
                teams: HashMap::new(),
                fail_all: false,
            }
        }

        fn with_team(mut self, org: &str, team: &str, members: &[&str]) -> Self {
            self.teams.insert(
                (org.to_string(), team.to_string()),
                members.iter().map(|m| m.to_string()).collect(),
            );
            self
        }

        fn failing() -> Self {
            Self {
                teams: HashMap::new(),
                fail_all: true,
            }
        }
    }

    #[async_trait]
    impl TeamDirectory for MockDirectory {
        async fn list_team_members(
            &self,
            org: &str,
            team: &str,
        ) -> Result<Vec<String>, DirectoryError> {
            if self.fail_all {
                return Err(DirectoryError::Network("connection refused".to_string()));
            }
            self.teams
                .get(&(org.to_string(), team.to_string()))
                .cloned()
                .ok_or_else(|| DirectoryError::Api("team not found".to_string()))
        }
    }

    #[tokio::test]
    async fn individual_handle_with_at_prefix() {
        let directory = MockDirectory::new();
        let membership = resolve_members(&directory, "@alice").await;

        assert_eq!(membership.members, ["alice"]);
        assert_eq!(membership.source, MembershipSource::Individual);
        assert_eq!(membership.owner, "@alice");
        assert!(!membership.is_degraded());
    }

    #[tokio::test]
    async fn individual_handle_without_at_prefix() {
        let directory = MockDirectory::new();
        let membership = resolve_members(&directory, "bob").await;

        assert_eq!(membership.members, ["bob"]);
        assert_eq!(membership.source, MembershipSource::Individual);
    }

    #[tokio::test]
    async fn team_handle_expands_to_members() {
        let directory = MockDirectory::new().with_team("acme", "backend", &["carol", "dave"]);
        let membership = resolve_members(&directory, "@acme/backend").await;

        assert_eq!(membership.members, ["carol", "dave"]);
        assert_eq!(membership.source, MembershipSource::Team);
    }

    #[tokio::test]
    async fn lookup_failure_falls_back_to_team_slug() {
        let directory = MockDirectory::failing();
        let membership = resolve_members(&directory, "@acme/backend").await;

        assert_eq!(membership.members, ["backend"]);
        assert_eq!(membership.source, MembershipSource::TeamFallback);
        assert!(membership.is_degraded());
    }

    #[tokio::test]
    async fn unknown_team_falls_back_too() {
        let directory = MockDirectory::new();
        let membership = resolve_members(&directory, "@acme/ghosts").await;

        assert_eq!(membership.members, ["ghosts"]);
        assert_eq!(membership.source, MembershipSource::TeamFallback);
    }

    #[tokio::test]
    async fn malformed_handles_resolve_to_empty_membership() {
        let directory = MockDirectory::new();

        for handle in ["@acme/", "@/backend", "@a/b/c", "@", "acme//backend"] {
            let membership = resolve_members(&directory, handle).await;
            assert!(
                membership.members.is_empty(),
                "expected empty members for {handle}"
            );
            assert_eq!(membership.source, MembershipSource::InvalidHandle);
        }
    }
}
