//! Chunked, sequential write batching.
//!
//! Writes inside one chunk are awaited together; chunk `n + 1` starts only after
//! every write of chunk `n` resolved. A failing write never cancels its siblings;
//! the batch halts once its chunk has settled.

use crate::errors::{Error, Result};
use futures_util::future::join_all;
use std::future::Future;
use tracing::debug;

/// Runs `write` for every item, `chunk_size` at a time, and returns how many
/// items were written.
///
/// # Errors
/// Returns [`Error::Config`] for a zero chunk size, otherwise the first error a
/// write reports. Writes of earlier chunks stay applied.
pub async fn write_in_chunks<'a, T, F, Fut>(
    items: &'a [T],
    chunk_size: usize,
    write: F,
) -> Result<usize>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if chunk_size == 0 {
        return Err(Error::Config {
            message: "chunk_size must be at least 1".to_string(),
        });
    }

    let mut written = 0;
    for (index, chunk) in items.chunks(chunk_size).enumerate() {
        let outcomes = join_all(chunk.iter().map(&write)).await;
        outcomes.into_iter().collect::<Result<Vec<()>>>()?;
        written += chunk.len();
        debug!("Chunk {} done ({} of {} written)", index + 1, written, items.len());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_writes_every_item_in_order_of_chunks() -> Result<()> {
        let seen = Mutex::new(Vec::new());
        let items: Vec<i64> = (1..=7).collect();

        let written = write_in_chunks(&items, 3, |item| {
            seen.lock().unwrap().push(*item);
            async { Ok(()) }
        })
        .await?;

        assert_eq!(written, 7);
        assert_eq!(*seen.lock().unwrap(), items);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_halts_later_chunks() {
        let attempted = Mutex::new(Vec::new());
        let items: Vec<i64> = (1..=6).collect();

        let result = write_in_chunks(&items, 2, |item| {
            let item = *item;
            attempted.lock().unwrap().push(item);
            async move {
                if item == 3 {
                    Err(Error::write("budget", item, "disk full"))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Write { id: 3, .. })));
        // The third chunk (5, 6) is never started
        assert_eq!(*attempted.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failing_write_lets_chunk_siblings_finish() {
        let completed = Mutex::new(Vec::new());
        let items = [1_i64, 2];

        let result = write_in_chunks(&items, 2, |item| {
            let item = *item;
            let completed = &completed;
            async move {
                if item == 2 {
                    return Err(Error::write("expense", item, "locked"));
                }
                tokio::task::yield_now().await;
                completed.lock().unwrap().push(item);
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Write { id: 2, .. })));
        assert_eq!(*completed.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_zero_chunk_size_is_rejected() {
        let result = write_in_chunks(&[1_i64], 0, |_| async { Ok(()) }).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
