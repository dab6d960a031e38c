//! Bounded Concurrency Runner
//!
//! Drives a list of job futures with at most `limit` in flight. Jobs start
//! in list order; whenever one settles the next unstarted job begins.
//! Completion order is not preserved.

use std::future::Future;

use futures_util::stream::{self, StreamExt};

/// Run `jobs` with at most `limit` in flight. A limit of 0 runs one at a time.
pub async fn run_bounded<I, Fut>(jobs: I, limit: usize) -> Vec<Fut::Output>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future,
{
    stream::iter(jobs)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}
