/*!
 * Fixed-size grouping of a stream.
 *
 * `Batcher` collects items into groups of `size` and yields each group as
 * soon as it fills. When the inner stream ends, whatever is left is yielded
 * as one final short group. An empty group is never yielded, so an empty
 * input produces an empty output.
 */

use futures::ready;
use futures::stream::{Fuse, Stream, StreamExt};
use pin_project::pin_project;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stream adapter yielding `Vec`s of at most `size` items
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct Batcher<S: Stream> {
    #[pin]
    stream: Fuse<S>,
    size: usize,
    batch: Vec<S::Item>,
}

impl<S: Stream> Batcher<S> {
    /// Group `stream` into batches of `size`. A size of 0 is treated as 1.
    pub fn new(stream: S, size: usize) -> Self {
        let size = size.max(1);
        Self {
            stream: stream.fuse(),
            size,
            batch: Vec::with_capacity(size),
        }
    }

    /// Target group size
    pub fn size(&self) -> usize {
        self.size
    }
}

impl<S: Stream> Stream for Batcher<S> {
    type Item = Vec<S::Item>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(item) => {
                    this.batch.push(item);
                    if this.batch.len() >= *this.size {
                        let full = mem::replace(this.batch, Vec::with_capacity(*this.size));
                        return Poll::Ready(Some(full));
                    }
                }
                None => {
                    if this.batch.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(mem::take(this.batch)));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = self.batch.len();
        let (lower, upper) = self.stream.size_hint();
        let lower = lower.saturating_add(pending).div_ceil(self.size);
        let upper = upper
            .and_then(|n| n.checked_add(pending))
            .map(|n| n.div_ceil(self.size));
        (lower, upper)
    }
}

/// `.batched(n)` on any stream
pub trait BatchExt: Stream + Sized {
    fn batched(self, size: usize) -> Batcher<Self> {
        Batcher::new(self, size)
    }
}

impl<S: Stream> BatchExt for S {}

/// Group `items` into fixed-size chunks
pub fn batch<S: Stream>(items: S, size: usize) -> Batcher<S> {
    Batcher::new(items, size)
}
