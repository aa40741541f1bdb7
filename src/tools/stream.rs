use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::schemas::ThreadStreamEvent;

use super::ToolError;

/// Sink for transcript events produced by tools while they execute.
///
/// Tools emit items with placeholder ids; ids are assigned downstream.
#[async_trait]
pub trait StreamWriter: Send + Sync {
    async fn write(&self, event: ThreadStreamEvent) -> Result<(), ToolError>;
}

/// Stream writer feeding the live event channel of a run.
#[derive(Clone)]
pub struct ChannelStreamWriter {
    sender: mpsc::Sender<ThreadStreamEvent>,
}

impl ChannelStreamWriter {
    pub fn new(sender: mpsc::Sender<ThreadStreamEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl StreamWriter for ChannelStreamWriter {
    async fn write(&self, event: ThreadStreamEvent) -> Result<(), ToolError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| ToolError::StreamClosed)
    }
}

/// Stream writer that collects events in memory.
#[derive(Clone, Default)]
pub struct CollectingStreamWriter {
    events: Arc<Mutex<Vec<ThreadStreamEvent>>>,
}

impl CollectingStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ThreadStreamEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl StreamWriter for CollectingStreamWriter {
    async fn write(&self, event: ThreadStreamEvent) -> Result<(), ToolError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Creates a bounded channel writer and the receiving end.
pub fn create_stream_writer(
    capacity: usize,
) -> (ChannelStreamWriter, mpsc::Receiver<ThreadStreamEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelStreamWriter::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::ThreadItem;

    #[tokio::test]
    async fn test_channel_writer_forwards_events() {
        let (writer, mut rx) = create_stream_writer(4);
        let item = ThreadItem::assistant_message("cthi_1", "cthr_1", "hi");
        writer.write(ThreadStreamEvent::done(item.clone())).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, ThreadStreamEvent::done(item));
    }

    #[tokio::test]
    async fn test_channel_writer_reports_closed_stream() {
        let (writer, rx) = create_stream_writer(1);
        drop(rx);
        let result = writer.write(ThreadStreamEvent::delta("cthi_1", "x")).await;
        assert!(matches!(result, Err(ToolError::StreamClosed)));
    }
}
