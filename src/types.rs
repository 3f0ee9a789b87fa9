use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository identity: the owner + name pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub description: Option<String>,
    pub stars: u32,
    pub language: Option<String>,
    pub url: String,
}

impl Repository {
    pub fn name(&self) -> &str {
        &self.id.name
    }
}

/// Approximate activity counts for one repository.
///
/// `None` means "not yet estimated". A failed estimate is reported as `Some(0)`,
/// so a true zero and a failure look the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproximateCounts {
    pub commits: Option<u64>,
    pub pulls: Option<u64>,
}

impl ApproximateCounts {
    pub fn estimated(commits: u64, pulls: u64) -> Self {
        Self {
            commits: Some(commits),
            pulls: Some(pulls),
        }
    }

    /// Overlay the fields present in `patch`, keeping the rest.
    pub fn merge(&mut self, patch: ApproximateCounts) {
        if patch.commits.is_some() {
            self.commits = patch.commits;
        }
        if patch.pulls.is_some() {
            self.pulls = patch.pulls;
        }
    }
}

/// One repository's count estimate, as produced by the fan-out.
pub type CountPatch = (RepoId, ApproximateCounts);

/// Git commit (summary for the detail panel)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    pub url: String,
}

impl Commit {
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub fn short_sha(&self) -> &str {
        &self.sha[..7.min(self.sha.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    Open,
    Closed,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub state: PrState,
    pub merged: bool,
    pub url: String,
}

/// Per-repository detail state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RepoDetail {
    #[default]
    NotRequested,
    Loading,
    Loaded {
        commits: Vec<Commit>,
        pulls: Vec<PullRequest>,
    },
    Failed(String),
}

impl RepoDetail {
    pub fn is_loading(&self) -> bool {
        matches!(self, RepoDetail::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RepoDetail::Loaded { .. } | RepoDetail::Failed(_))
    }
}
