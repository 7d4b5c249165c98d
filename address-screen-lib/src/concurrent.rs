//! Bounded concurrent processing.
//!
//! Items are pulled lazily from the input and fed through
//! `buffer_unordered`, which admits at most `max_concurrency` futures at a
//! time and yields their outputs in completion order. Everything runs on the
//! task that polls the returned stream; nothing is spawned.

use futures::future::Future;
use futures::stream::{self, BoxStream, StreamExt};

/// Runs one future per input item with a fixed ceiling on how many are
/// in flight.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrentProcessor {
    max_concurrency: usize,
}

impl ConcurrentProcessor {
    /// Create a new processor. A limit of 0 is treated as 1.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Process `items` with `task`, yielding outputs as they complete.
    ///
    /// Once `stop` resolves no further items are admitted, but futures
    /// already admitted are still driven to completion and yielded before
    /// the stream ends.
    pub fn process<'a, I, T, F, Fut, S>(
        &self,
        items: I,
        stop: S,
        task: F,
    ) -> BoxStream<'a, Fut::Output>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'a,
        T: Send + 'a,
        F: FnMut(T) -> Fut + Send + 'a,
        Fut: Future + Send + 'a,
        Fut::Output: Send + 'a,
        S: Future<Output = ()> + Send + 'a,
    {
        stream::iter(items)
            .take_until(stop)
            .map(task)
            .buffer_unordered(self.max_concurrency)
            .boxed()
    }
}
