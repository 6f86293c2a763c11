//! Order-preserving parallel execution

use futures::{stream::FuturesUnordered, Future, StreamExt};

/// Run `executor` over every item concurrently and wait for all of them
///
/// All futures are created up front and polled together, so item `n` starts before item
/// `n + 1` but none waits for another to finish. Every future runs to completion: there is
/// no fail-fast, an `Err` output is just another result. Outputs come back in input order.
pub async fn execute_parallel<T, F, Fut, R>(items: Vec<T>, executor: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let mut tasks = FuturesUnordered::new();

    for (idx, item) in items.into_iter().enumerate() {
        let fut = executor(item);
        tasks.push(async move { (idx, fut.await) });
    }

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    while let Some((idx, result)) = tasks.next().await {
        slots[idx] = Some(result);
    }

    slots.into_iter().flatten().collect()
}
