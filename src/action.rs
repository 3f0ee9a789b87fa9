use crate::types::{CountPatch, RepoDetail, RepoId, Repository};

/// Everything that can change the app. Results of background work carry the
/// load generation they were dispatched under.
#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    Tick,
    ScrollUp,
    ScrollDown,
    GoToTop,
    GoToBottom,

    // Repository list
    LoadRepos,
    ReposLoaded(Vec<Repository>, u64),
    ReposFailed(String, u64),

    // Approximate counts
    CountsMerged(Vec<CountPatch>, u64),

    // Detail panels
    ToggleExpansion(RepoId),
    ReloadDetails(RepoId),
    DetailLoaded(RepoId, Box<RepoDetail>, u64),

    OpenInBrowser,
    YankUrl,

    None,
}

impl Action {
    /// Actions that come straight from a key press.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Action::ScrollUp
                | Action::ScrollDown
                | Action::GoToTop
                | Action::GoToBottom
                | Action::LoadRepos
                | Action::ToggleExpansion(_)
                | Action::ReloadDetails(_)
                | Action::OpenInBrowser
                | Action::YankUrl
        )
    }
}
