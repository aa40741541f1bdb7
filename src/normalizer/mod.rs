//! Event identity normalization: durable ids for streamed items and
//! suppression of repeated terminal events.

mod ids;
pub use ids::*;

mod pass;
pub use pass::*;

use async_stream::stream;
use futures::{Stream, StreamExt};

use crate::schemas::ThreadStreamEvent;

/// Runs every event of `events` through `pass`, preserving order.
pub fn normalize_events<S>(
    events: S,
    mut pass: NormalizerPass,
) -> impl Stream<Item = ThreadStreamEvent> + Send
where
    S: Stream<Item = ThreadStreamEvent> + Send + Unpin,
{
    let mut events = events;
    stream! {
        while let Some(event) = events.next().await {
            if let Some(event) = pass.process(event) {
                yield event;
            }
        }
    }
}
