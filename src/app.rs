use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::action::Action;
use crate::config::SyncConfig;
use crate::event::Event;
use crate::github::GitHub;
use crate::store::Session;
use crate::sync::{estimate_all_counts, publish_counts};
use crate::types::{RepoId, Repository};

pub struct App {
    pub account: String,
    pub session: Session,
    pub selected: usize,
    /// The repository list request is in flight.
    pub loading: bool,
    /// The last list load failed; shown instead of the list.
    pub list_error: Option<String>,
    /// Transient status-bar error, cleared by the next key press.
    pub error: Option<String>,
    pub notice: Option<String>,
    pub ticks: u64,
    pub should_quit: bool,
    github: GitHub,
    sync: SyncConfig,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    pub fn new(
        github: GitHub,
        account: String,
        sync: SyncConfig,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            account,
            session: Session::new(),
            selected: 0,
            loading: false,
            list_error: None,
            error: None,
            notice: None,
            ticks: 0,
            should_quit: false,
            github,
            sync,
            action_tx,
        }
    }

    pub fn selected_repo(&self) -> Option<&Repository> {
        self.session.repositories().get(self.selected)
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Tick => Action::Tick,
            Event::Key(key) => self.handle_key(key),
            Event::Render => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        let selected = || self.selected_repo().map(|r| r.id.clone());

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
            KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
            KeyCode::Char('g') | KeyCode::Home => Action::GoToTop,
            KeyCode::Char('G') | KeyCode::End => Action::GoToBottom,
            KeyCode::Enter | KeyCode::Char(' ') => {
                selected().map(Action::ToggleExpansion).unwrap_or(Action::None)
            }
            KeyCode::Char('R') => selected().map(Action::ReloadDetails).unwrap_or(Action::None),
            KeyCode::Char('r') => Action::LoadRepos,
            KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('y') => Action::YankUrl,
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) {
        if action.is_user_input() {
            self.error = None;
            self.notice = None;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Tick => {
                self.ticks = self.ticks.wrapping_add(1);
            }
            Action::ScrollUp => {
                self.selected = self.selected.saturating_sub(1);
            }
            Action::ScrollDown => {
                let len = self.session.repositories().len();
                if len > 0 && self.selected < len - 1 {
                    self.selected += 1;
                }
            }
            Action::GoToTop => {
                self.selected = 0;
            }
            Action::GoToBottom => {
                self.selected = self.session.repositories().len().saturating_sub(1);
            }

            Action::LoadRepos => {
                let generation = self.session.begin_load();
                self.loading = true;
                self.list_error = None;
                self.selected = 0;
                tracing::info!(account = %self.account, generation, "loading repositories");
                self.spawn_load_repos(generation);
            }
            Action::ReposLoaded(repos, generation) => {
                let count = repos.len();
                if self.session.set_repositories(generation, repos) {
                    self.loading = false;
                    tracing::info!(generation, count, "repositories loaded");
                    // Counts start only once the list is in place.
                    self.spawn_count_fan_out(generation);
                }
            }
            Action::ReposFailed(message, generation) => {
                if generation == self.session.generation() {
                    tracing::warn!(account = %self.account, error = %message, "repository list failed");
                    self.loading = false;
                    self.list_error = Some(message);
                }
            }

            Action::CountsMerged(patches, generation) => {
                self.session.merge_counts(generation, patches);
            }

            Action::ToggleExpansion(id) => {
                self.toggle_expansion(id);
            }
            Action::ReloadDetails(id) => {
                if self.session.begin_reload(&id) {
                    self.spawn_fetch_details(id, self.session.generation());
                }
            }
            Action::DetailLoaded(id, detail, generation) => {
                self.session.merge_detail(generation, id, *detail);
            }

            Action::OpenInBrowser => {
                if let Some(url) = self.selected_repo().map(|r| r.url.clone()) {
                    if let Err(e) = open::that(&url) {
                        self.error = Some(format!("Could not open {}: {}", url, e));
                    }
                }
            }
            Action::YankUrl => {
                if let Some(url) = self.selected_repo().map(|r| r.url.clone()) {
                    match arboard::Clipboard::new().and_then(|mut c| c.set_text(url.clone())) {
                        Ok(()) => self.notice = Some(format!("Copied {}", url)),
                        Err(e) => self.error = Some(format!("Clipboard unavailable: {}", e)),
                    }
                }
            }

            Action::None => {}
        }
    }

    /// Flip the expansion of one repository, fetching its details the first
    /// time it is opened.
    pub fn toggle_expansion(&mut self, id: RepoId) {
        let toggle = self.session.toggle_expansion(&id);
        if toggle.fetch {
            self.spawn_fetch_details(id, self.session.generation());
        }
    }

    fn spawn_load_repos(&self, generation: u64) {
        let tx = self.action_tx.clone();
        let github = self.github.clone();
        let account = self.account.clone();
        tokio::spawn(async move {
            match github.load_repositories(&account).await {
                Ok(repos) => {
                    tx.send(Action::ReposLoaded(repos, generation)).ok();
                }
                Err(e) => {
                    tx.send(Action::ReposFailed(e.to_string(), generation)).ok();
                }
            }
        });
    }

    fn spawn_count_fan_out(&self, generation: u64) {
        let tx = self.action_tx.clone();
        let counts = estimate_all_counts(
            self.github.clone(),
            self.session.repositories(),
            self.sync.concurrency,
        );
        let mode = self.sync.publish;
        tokio::spawn(async move {
            let total = publish_counts(counts, mode, |patches| {
                tx.send(Action::CountsMerged(patches, generation)).ok();
            })
            .await;
            tracing::info!(generation, total, ?mode, "count estimation finished");
        });
    }

    fn spawn_fetch_details(&self, id: RepoId, generation: u64) {
        let tx = self.action_tx.clone();
        let github = self.github.clone();
        tokio::spawn(async move {
            let detail = github.fetch_details(&id).await;
            tx.send(Action::DetailLoaded(id, Box::new(detail), generation))
                .ok();
        });
    }
}
