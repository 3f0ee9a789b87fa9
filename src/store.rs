//! Per-session state shared between the sync tasks and the view.
//!
//! Writers only ever merge-patch by identity, and every patch carries the
//! load generation it was dispatched under. Patches from an older generation,
//! or for an identity outside the current collection, are dropped.

use std::collections::{HashMap, HashSet};

use crate::types::{ApproximateCounts, CountPatch, RepoDetail, RepoId, Repository};

static NOT_REQUESTED: RepoDetail = RepoDetail::NotRequested;

/// Outcome of a user toggle on one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    pub expanded: bool,
    /// The caller must start a detail fetch.
    pub fetch: bool,
}

#[derive(Debug, Default)]
pub struct Session {
    generation: u64,
    installed: bool,
    repos: Vec<Repository>,
    members: HashSet<RepoId>,
    counts: HashMap<RepoId, ApproximateCounts>,
    details: HashMap<RepoId, RepoDetail>,
    expanded: HashSet<RepoId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new load cycle: drop all state and bump the generation.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.installed = false;
        self.repos.clear();
        self.members.clear();
        self.counts.clear();
        self.details.clear();
        self.expanded.clear();
        self.generation
    }

    /// Install the collection for `generation`. Only the first call per
    /// generation takes effect.
    pub fn set_repositories(&mut self, generation: u64, repos: Vec<Repository>) -> bool {
        if generation != self.generation || self.installed {
            return false;
        }
        self.installed = true;
        self.members = repos.iter().map(|r| r.id.clone()).collect();
        self.repos = repos;
        true
    }

    /// Merge count patches; returns how many were applied.
    pub fn merge_counts<I>(&mut self, generation: u64, patches: I) -> usize
    where
        I: IntoIterator<Item = CountPatch>,
    {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "dropping stale counts");
            return 0;
        }

        let mut applied = 0;
        for (id, patch) in patches {
            if !self.members.contains(&id) {
                continue;
            }
            self.counts.entry(id).or_default().merge(patch);
            applied += 1;
        }
        applied
    }

    /// Flip expansion. A fetch is requested only when no detail entry exists.
    pub fn toggle_expansion(&mut self, id: &RepoId) -> Toggle {
        if !self.members.contains(id) {
            return Toggle {
                expanded: false,
                fetch: false,
            };
        }

        let expanded = if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.clone());
            true
        };

        let fetch = !self.details.contains_key(id);
        if fetch {
            self.details.insert(id.clone(), RepoDetail::Loading);
        }

        Toggle { expanded, fetch }
    }

    /// Force a refetch from a terminal state. Returns false while a fetch is
    /// already in flight or the identity is unknown.
    pub fn begin_reload(&mut self, id: &RepoId) -> bool {
        if !self.members.contains(id) || self.detail(id).is_loading() {
            return false;
        }
        self.details.insert(id.clone(), RepoDetail::Loading);
        true
    }

    /// Settle a detail fetch. Only a Loading entry of the current generation
    /// may move to a terminal state.
    pub fn merge_detail(&mut self, generation: u64, id: RepoId, detail: RepoDetail) -> bool {
        if generation != self.generation || !self.members.contains(&id) {
            tracing::debug!(repo = %id, generation, "dropping stale detail");
            return false;
        }
        match self.details.get_mut(&id) {
            Some(slot) if slot.is_loading() && detail.is_terminal() => {
                *slot = detail;
                true
            }
            _ => false,
        }
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repos
    }

    pub fn counts(&self, id: &RepoId) -> Option<&ApproximateCounts> {
        self.counts.get(id)
    }

    pub fn detail(&self, id: &RepoId) -> &RepoDetail {
        self.details.get(id).unwrap_or(&NOT_REQUESTED)
    }

    pub fn is_expanded(&self, id: &RepoId) -> bool {
        self.expanded.contains(id)
    }
}
