//! Bounded worker pool for the embarrassingly-parallel per-entity and
//! per-source work within a stage (§5: "worker pool sized from config;
//! default = CPU count").

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs `work` over every item in `items` with at most `concurrency` futures
/// in flight at once, collecting results in completion order. Stages use
/// this rather than `futures::join_all` so that one run never oversubscribes
/// the configured worker budget.
pub async fn run_bounded<T, F, Fut, R>(items: Vec<T>, concurrency: usize, work: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let concurrency = concurrency.max(1);
    stream::iter(items).map(work).buffer_unordered(concurrency).collect().await
}

/// Default worker concurrency when config doesn't override it.
pub fn default_concurrency() -> usize {
    num_cpus::get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_all_items_under_bound() {
        let items: Vec<u32> = (0..20).collect();
        let results = run_bounded(items, 4, |i| async move { i * 2 }).await;
        let sum: u32 = results.iter().sum();
        let expected: u32 = (0..20).map(|i| i * 2).sum();
        assert_eq!(sum, expected);
        assert_eq!(results.len(), 20);
    }
}
