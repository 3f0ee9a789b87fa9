use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Result, ScopeError};
use crate::pagination::estimate_count;
use crate::transport::Transport;
use crate::types::{ApproximateCounts, Commit, PrState, PullRequest, RepoDetail, RepoId, Repository};

/// Largest page GitHub serves; the repository list is fetched as one such page.
pub const REPO_PAGE_SIZE: u32 = 100;
/// Items shown per collection in an expanded repository.
pub const DETAIL_PAGE_SIZE: u32 = 5;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct GitHub {
    transport: Arc<dyn Transport>,
    api_url: String,
}

impl GitHub {
    pub fn new(transport: Arc<dyn Transport>, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { transport, api_url }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn repos_url(&self, account: &str) -> String {
        format!(
            "{}/users/{}/repos?per_page={}",
            self.api_url,
            urlencoding::encode(account),
            REPO_PAGE_SIZE
        )
    }

    pub fn commits_url(&self, id: &RepoId, per_page: u32) -> String {
        format!("{}/commits?per_page={}", self.repo_api_url(id), per_page)
    }

    pub fn pulls_url(&self, id: &RepoId, per_page: u32) -> String {
        format!("{}/pulls?state=all&per_page={}", self.repo_api_url(id), per_page)
    }

    fn repo_api_url(&self, id: &RepoId) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(&id.owner),
            urlencoding::encode(&id.name)
        )
    }

    /// Fetch the account's repositories, most starred first.
    pub async fn load_repositories(&self, account: &str) -> Result<Vec<Repository>> {
        let url = self.repos_url(account);
        let response = self.transport.get(&url).await?;

        if !response.is_success() {
            return Err(ScopeError::Network {
                status: response.status,
            });
        }

        let mut repos: Vec<Repository> = match response.body {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<GhRepo>(item) {
                    Ok(repo) => Some(repo.into_repository(account)),
                    Err(e) => {
                        tracing::warn!(account, error = %e, "skipping undecodable repository");
                        None
                    }
                })
                .collect(),
            _ => {
                tracing::warn!(account, "repository list was not an array");
                Vec::new()
            }
        };

        // Stable: equal star counts keep their upstream order.
        repos.sort_by(|a, b| b.stars.cmp(&a.stars));
        Ok(repos)
    }

    /// Estimate commit and pull request counts for one repository.
    pub async fn estimate_counts(&self, id: &RepoId) -> ApproximateCounts {
        let commits_url = self.commits_url(id, 1);
        let pulls_url = self.pulls_url(id, 1);
        let (commits, pulls) = tokio::join!(
            estimate_count(self.transport(), &commits_url),
            estimate_count(self.transport(), &pulls_url)
        );
        ApproximateCounts::estimated(commits, pulls)
    }

    /// Fetch the first few commits and pull requests. Both must succeed.
    pub async fn fetch_details(&self, id: &RepoId) -> RepoDetail {
        let commits_url = self.commits_url(id, DETAIL_PAGE_SIZE);
        let pulls_url = self.pulls_url(id, DETAIL_PAGE_SIZE);
        let (commits, pulls) = tokio::join!(
            self.fetch_list::<GhCommit>(&commits_url, "Commits"),
            self.fetch_list::<GhPullRequest>(&pulls_url, "Pulls")
        );

        match (commits, pulls) {
            (Ok(commits), Ok(pulls)) => RepoDetail::Loaded {
                commits: commits.into_iter().map(Commit::from).collect(),
                pulls: pulls.into_iter().map(PullRequest::from).collect(),
            },
            (Err(e), _) | (_, Err(e)) => {
                tracing::info!(repo = %id, error = %e, "detail fetch failed");
                RepoDetail::Failed(e)
            }
        }
    }

    /// Fetch one JSON list; the error is the message shown in the detail panel.
    async fn fetch_list<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> std::result::Result<Vec<T>, String> {
        let response = match self.transport.get(url).await {
            Ok(response) => response,
            Err(e) => return Err(format!("{} request failed: {}", what, e)),
        };

        if !response.is_success() {
            return Err(format!("{} request failed: {}", what, response.status));
        }

        serde_json::from_value(response.body)
            .map_err(|e| format!("{} response could not be decoded: {}", what, e))
    }
}

// GitHub API response types

#[derive(Deserialize)]
struct GhRepo {
    name: String,
    owner: Option<GhUser>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u32,
    language: Option<String>,
    html_url: Option<String>,
}

impl GhRepo {
    fn into_repository(self, account: &str) -> Repository {
        let owner = self
            .owner
            .map(|o| o.login)
            .unwrap_or_else(|| account.to_string());
        let id = RepoId::new(owner, self.name);
        let url = self
            .html_url
            .unwrap_or_else(|| format!("https://github.com/{}", id));

        Repository {
            id,
            description: self.description.filter(|d| !d.is_empty()),
            stars: self.stargazers_count,
            language: self.language,
            url,
        }
    }
}

#[derive(Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Deserialize)]
struct GhCommit {
    sha: String,
    commit: Option<GhCommitInner>,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct GhCommitInner {
    message: Option<String>,
    author: Option<GhCommitAuthor>,
}

#[derive(Deserialize)]
struct GhCommitAuthor {
    name: Option<String>,
    date: Option<String>,
}

impl From<GhCommit> for Commit {
    fn from(c: GhCommit) -> Self {
        let inner = c.commit;
        let message = inner
            .as_ref()
            .and_then(|i| i.message.clone())
            .unwrap_or_default();
        let author = inner.as_ref().and_then(|i| i.author.as_ref());
        let date = author
            .and_then(|a| a.date.as_deref())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&chrono::Utc));

        Commit {
            message,
            author: author
                .and_then(|a| a.name.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            date,
            url: c.html_url.unwrap_or_default(),
            sha: c.sha,
        }
    }
}

#[derive(Deserialize)]
struct GhPullRequest {
    number: u64,
    title: Option<String>,
    user: Option<GhUser>,
    state: Option<String>,
    merged_at: Option<String>,
    html_url: Option<String>,
}

impl From<GhPullRequest> for PullRequest {
    fn from(pr: GhPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            author: pr
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| "unknown".to_string()),
            state: match pr.state.as_deref() {
                Some("closed") => PrState::Closed,
                _ => PrState::Open,
            },
            merged: pr.merged_at.is_some(),
            url: pr.html_url.unwrap_or_default(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::transport::fake::FakeTransport;
    use serde_json::json;

    const API: &str = "https://api.test";

    fn github(fake: &Arc<FakeTransport>) -> GitHub {
        GitHub::new(fake.clone(), API)
    }

    #[test]
    fn urls_are_derived_from_identity() {
        let gh = GitHub::new(Arc::new(FakeTransport::new()), "https://api.test/");
        let id = RepoId::new("octocat", "hello world");
        assert_eq!(
            gh.repos_url("octocat"),
            "https://api.test/users/octocat/repos?per_page=100"
        );
        assert_eq!(
            gh.commits_url(&id, 1),
            "https://api.test/repos/octocat/hello%20world/commits?per_page=1"
        );
        assert_eq!(
            gh.pulls_url(&id, 5),
            "https://api.test/repos/octocat/hello%20world/pulls?state=all&per_page=5"
        );
    }

    #[tokio::test]
    async fn load_sorts_by_stars_descending_and_stably() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        fake.json(
            &gh.repos_url("octocat"),
            json!([
                repo("octocat", "beta", 7),
                repo("octocat", "tie-first", 10),
                repo("octocat", "alpha", 42),
                repo("octocat", "tie-second", 10),
                repo("octocat", "zero", 0),
            ]),
        );

        let repos = gh.load_repositories("octocat").await.unwrap();
        let names: Vec<&str> = repos.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["alpha", "tie-first", "tie-second", "beta", "zero"]);
        assert!(repos.windows(2).all(|w| w[0].stars >= w[1].stars));
        assert_eq!(repos[0].language.as_deref(), Some("Rust"));
        assert_eq!(repos[0].url, "https://github.com/octocat/alpha");
    }

    #[tokio::test]
    async fn load_fails_with_status_on_error_response() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        fake.status(&gh.repos_url("ghost"), 404);

        let err = gh.load_repositories("ghost").await.unwrap_err();
        assert!(matches!(err, ScopeError::Network { status: 404 }));
        assert_eq!(err.to_string(), "HTTP 404");
    }

    #[tokio::test]
    async fn load_propagates_transport_failure() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        fake.fail(&gh.repos_url("octocat"), "connection refused");

        let err = gh.load_repositories("octocat").await.unwrap_err();
        assert!(matches!(err, ScopeError::Api(_)));
    }

    #[tokio::test]
    async fn load_treats_non_array_body_as_empty() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        fake.json(&gh.repos_url("octocat"), json!({ "message": "odd" }));

        assert!(gh.load_repositories("octocat").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_skips_bad_items_and_defaults_owner() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        fake.json(
            &gh.repos_url("octocat"),
            json!([
                { "stargazers_count": 3 },
                { "name": "orphan", "stargazers_count": 1, "description": "" },
            ]),
        );

        let repos = gh.load_repositories("octocat").await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].id, RepoId::new("octocat", "orphan"));
        assert_eq!(repos[0].description, None);
        assert_eq!(repos[0].url, "https://github.com/octocat/orphan");
    }

    #[tokio::test]
    async fn estimate_counts_combines_both_metrics() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        let id = RepoId::new("octocat", "alpha");
        let commits = gh.commits_url(&id, 1);
        fake.json_with_link(&commits, json!([commit("a", "m")]), &last_link(&commits, 120));
        fake.status(&gh.pulls_url(&id, 1), 404);

        assert_eq!(gh.estimate_counts(&id).await, ApproximateCounts::estimated(120, 0));
    }

    #[tokio::test]
    async fn fetch_details_loads_both_lists() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        let id = RepoId::new("octocat", "beta");
        fake.json(
            &gh.commits_url(&id, DETAIL_PAGE_SIZE),
            json!([commit("abc1234567", "First line\n\nbody"), commit("def", "Second")]),
        );
        fake.json(
            &gh.pulls_url(&id, DETAIL_PAGE_SIZE),
            json!([pull(3, "closed", true), pull(2, "open", false)]),
        );

        let RepoDetail::Loaded { commits, pulls } = gh.fetch_details(&id).await else {
            panic!("expected loaded detail");
        };
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].summary(), "First line");
        assert_eq!(commits[0].author, "Mona Lisa");
        assert!(commits[0].date.is_some());
        assert_eq!(pulls[0].state, PrState::Closed);
        assert!(pulls[0].merged);
        assert_eq!(pulls[1].author, "hubot");
        assert!(!pulls[1].merged);
    }

    #[tokio::test]
    async fn fetch_details_fails_when_pulls_fail() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        let id = RepoId::new("octocat", "beta");
        fake.json(&gh.commits_url(&id, DETAIL_PAGE_SIZE), json!([commit("a", "m")]));
        fake.status(&gh.pulls_url(&id, DETAIL_PAGE_SIZE), 500);

        assert_eq!(
            gh.fetch_details(&id).await,
            RepoDetail::Failed("Pulls request failed: 500".to_string())
        );
    }

    #[tokio::test]
    async fn fetch_details_fails_when_commits_fail() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        let id = RepoId::new("octocat", "beta");
        fake.fail(&gh.commits_url(&id, DETAIL_PAGE_SIZE), "reset by peer");
        fake.json(&gh.pulls_url(&id, DETAIL_PAGE_SIZE), json!([pull(1, "open", false)]));

        let detail = gh.fetch_details(&id).await;
        let RepoDetail::Failed(message) = &detail else {
            panic!("expected failure, got {:?}", detail);
        };
        assert!(message.starts_with("Commits request failed"));
        assert!(message.contains("reset by peer"));
    }

    #[tokio::test]
    async fn fetch_details_rejects_non_list_body() {
        let fake = Arc::new(FakeTransport::new());
        let gh = github(&fake);
        let id = RepoId::new("octocat", "empty");
        fake.json(&gh.commits_url(&id, DETAIL_PAGE_SIZE), json!({ "message": "empty" }));
        fake.json(&gh.pulls_url(&id, DETAIL_PAGE_SIZE), json!([]));

        assert!(matches!(gh.fetch_details(&id).await, RepoDetail::Failed(_)));
    }
}
