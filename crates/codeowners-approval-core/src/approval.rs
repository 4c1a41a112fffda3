//! Review aggregation and the per-owner approval verdict.
//!
//! For each required owner group, the aggregator collapses every member's
//! review history to their most recent review and reports the group approved
//! iff at least one current member's latest state is `APPROVED`. A member
//! whose latest review requests changes does not count as approved, no
//! matter how many earlier approvals they submitted; a different member's
//! approval is unaffected by that.
//!
//! Reviewer logins are compared to member logins case-insensitively. That is
//! the only case-insensitive comparison in the engine: owner handles and
//! file paths stay case-sensitive everywhere else.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::membership::{OwnerMembership, TeamDirectory, resolve_members};
use crate::ruleset::OwnerRequirement;

/// The state of one review event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    /// The reviewer approved the changes.
    Approved,
    /// The reviewer requested changes.
    RequestChanges,
    /// The reviewer left a comment without a verdict.
    Commented,
    /// The review was dismissed.
    Dismissed,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewState::Approved => f.write_str("APPROVED"),
            ReviewState::RequestChanges => f.write_str("REQUEST_CHANGES"),
            ReviewState::Commented => f.write_str("COMMENTED"),
            ReviewState::Dismissed => f.write_str("DISMISSED"),
        }
    }
}

/// One review event on the pull request.
///
/// Several events may exist per reviewer; their order in the source is not
/// trusted, only `submitted_at` is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
    /// Login of the reviewer who submitted the review.
    pub reviewer: String,
    /// The verdict of this review.
    pub state: ReviewState,
    /// When the review was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl ReviewEvent {
    /// Creates a review event.
    pub fn new(reviewer: impl Into<String>, state: ReviewState, submitted_at: DateTime<Utc>) -> Self {
        Self {
            reviewer: reviewer.into(),
            state,
            submitted_at,
        }
    }
}

/// The approval verdict for one owner group.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerApprovalStatus {
    /// The owner handle as written in the rule file.
    pub owner: String,
    /// Whether at least one current member's latest review approves.
    pub is_approved: bool,
    /// Members whose latest review is an approval (lowercased logins).
    pub approved_by: Vec<String>,
    /// The files this owner is responsible for.
    pub files: Vec<String>,
    /// The latest review per member, in first-reviewed order.
    pub considered_reviewers: Vec<ReviewEvent>,
}

/// The combined verdict across all required owner groups.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalCheckResult {
    /// True iff every required owner group has approved (vacuously true
    /// when nothing is required).
    pub all_approved: bool,
    /// Per-owner verdicts, in requirement order.
    pub statuses: Vec<OwnerApprovalStatus>,
    /// Owners still missing approval, in status order.
    pub missing: Vec<String>,
    /// Number of owner groups that must approve.
    pub total_required: usize,
    /// Number of owner groups that have approved.
    pub total_approved: usize,
}

impl ApprovalCheckResult {
    /// Combines per-owner verdicts into the overall decision.
    pub fn from_statuses(statuses: Vec<OwnerApprovalStatus>) -> Self {
        let total_required = statuses.len();
        let total_approved = statuses.iter().filter(|s| s.is_approved).count();
        let missing = statuses
            .iter()
            .filter(|s| !s.is_approved)
            .map(|s| s.owner.clone())
            .collect();

        Self {
            all_approved: total_approved == total_required,
            statuses,
            missing,
            total_required,
            total_approved,
        }
    }

    /// The verdict when no owner group is required at all.
    pub fn vacuous() -> Self {
        Self::from_statuses(Vec::new())
    }
}

/// Collapses a review history to each member's most recent review.
///
/// Single left-to-right pass; a strictly newer timestamp replaces the kept
/// event, a tie keeps whichever came first. Reviews from non-members are
/// ignored. Returns (lowercased login, latest event) pairs in the order each
/// member first appeared.
fn latest_reviews_for_members(
    members: &[String],
    reviews: &[ReviewEvent],
) -> Vec<(String, ReviewEvent)> {
    let member_set: HashSet<String> = members.iter().map(|m| m.to_lowercase()).collect();

    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, ReviewEvent> = HashMap::new();

    for review in reviews {
        let login = review.reviewer.to_lowercase();
        if !member_set.contains(&login) {
            continue;
        }
        match latest.get(&login) {
            Some(existing) if review.submitted_at <= existing.submitted_at => {}
            Some(_) => {
                latest.insert(login, review.clone());
            }
            None => {
                order.push(login.clone());
                latest.insert(login, review.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|login| latest.remove(&login).map(|review| (login, review)))
        .collect()
}

/// Evaluates one owner group against the PR's review history.
pub fn evaluate_owner(
    requirement: &OwnerRequirement,
    members: &[String],
    reviews: &[ReviewEvent],
) -> OwnerApprovalStatus {
    let latest = latest_reviews_for_members(members, reviews);

    let approved_by: Vec<String> = latest
        .iter()
        .filter(|(_, review)| review.state == ReviewState::Approved)
        .map(|(login, _)| login.clone())
        .collect();
    let is_approved = !approved_by.is_empty();

    debug!(
        "{}: {} member reviews considered, {} approvals",
        requirement.owner,
        latest.len(),
        approved_by.len()
    );

    OwnerApprovalStatus {
        owner: requirement.owner.clone(),
        is_approved,
        approved_by,
        files: requirement.files.clone(),
        considered_reviewers: latest.into_iter().map(|(_, review)| review).collect(),
    }
}

/// Evaluates every required owner group and combines the verdicts.
///
/// Membership lookups are independent, so they run concurrently, one per
/// owner group; a failed lookup degrades that group's membership without
/// affecting the others.
pub async fn evaluate_approvals(
    requirements: &[OwnerRequirement],
    reviews: &[ReviewEvent],
    directory: &dyn TeamDirectory,
) -> ApprovalCheckResult {
    let memberships: Vec<OwnerMembership> = join_all(
        requirements
            .iter()
            .map(|requirement| resolve_members(directory, &requirement.owner)),
    )
    .await;

    let statuses = requirements
        .iter()
        .zip(memberships.iter())
        .map(|(requirement, membership)| evaluate_owner(requirement, &membership.members, reviews))
        .collect();

    let result = ApprovalCheckResult::from_statuses(statuses);
    info!(
        "{}/{} owner groups approved",
        result.total_approved, result.total_required
    );
    result
}
