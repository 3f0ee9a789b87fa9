//! Bulk count fan-out.
//!
//! Every repository's estimate runs as its own future; results come back in
//! completion order, not collection order.

use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;

use crate::github::GitHub;
use crate::types::{CountPatch, Repository};

/// How count estimates reach the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// One patch per repository as soon as it resolves.
    #[default]
    Incremental,
    /// A single patch once every repository has resolved.
    Batch,
}

/// Lazily estimate commit/PR counts for every repository, at most
/// `concurrency` repositories in flight.
pub fn estimate_all_counts(
    github: GitHub,
    repos: &[Repository],
    concurrency: usize,
) -> BoxStream<'static, CountPatch> {
    let ids: Vec<_> = repos.iter().map(|r| r.id.clone()).collect();

    stream::iter(ids)
        .map(move |id| {
            let github = github.clone();
            async move {
                let counts = github.estimate_counts(&id).await;
                tracing::debug!(repo = %id, ?counts, "counts estimated");
                (id, counts)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .boxed()
}

/// Drain `counts`, handing patches to `publish` according to `mode`.
/// Returns the number of repositories estimated.
pub async fn publish_counts<F>(
    mut counts: BoxStream<'static, CountPatch>,
    mode: PublishMode,
    mut publish: F,
) -> usize
where
    F: FnMut(Vec<CountPatch>),
{
    match mode {
        PublishMode::Incremental => {
            let mut total = 0;
            while let Some(patch) = counts.next().await {
                total += 1;
                publish(vec![patch]);
            }
            total
        }
        PublishMode::Batch => {
            let all: Vec<CountPatch> = counts.collect().await;
            let total = all.len();
            if total > 0 {
                publish(all);
            }
            total
        }
    }
}
