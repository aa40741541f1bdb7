use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::schemas::{is_placeholder_id, ItemKind, ThreadItem, ThreadStreamEvent};

use super::ItemIdGenerator;

/// Id bookkeeping for one streaming pass.
///
/// A placeholder on an `added` event opens an occurrence and gets a fresh
/// id. Deltas and the matching `done` event of that occurrence reuse it,
/// first in first out per item kind. `done` events for assistant messages
/// are forwarded at most once per final id.
///
/// A placeholder `done` with no open occurrence is taken as a re-emission
/// when its text equals the message closed just before it, and is dropped.
/// Anything else gets a fresh id.
pub struct NormalizerPass {
    thread_id: String,
    ids: Arc<dyn ItemIdGenerator>,
    open: HashMap<ItemKind, VecDeque<String>>,
    /// Most recently finished assistant message as (text, id)
    last_closed: Option<(String, String)>,
    forwarded_done: HashSet<String>,
}

impl NormalizerPass {
    pub fn new<S: Into<String>>(thread_id: S, ids: Arc<dyn ItemIdGenerator>) -> Self {
        Self {
            thread_id: thread_id.into(),
            ids,
            open: HashMap::new(),
            last_closed: None,
            forwarded_done: HashSet::new(),
        }
    }

    /// Rewrites one event. Returns `None` when the event is dropped.
    pub fn process(&mut self, event: ThreadStreamEvent) -> Option<ThreadStreamEvent> {
        match event {
            ThreadStreamEvent::ItemAdded { mut item } => {
                if item.has_placeholder_id() {
                    let id = self.fresh_id(item.kind());
                    self.open
                        .entry(item.kind())
                        .or_default()
                        .push_back(id.clone());
                    item.set_id(id);
                }
                Some(ThreadStreamEvent::added(item))
            }
            ThreadStreamEvent::ItemDelta { item_id, delta } => {
                if !is_placeholder_id(&item_id) {
                    return Some(ThreadStreamEvent::ItemDelta { item_id, delta });
                }
                match self
                    .open
                    .get(&ItemKind::AssistantMessage)
                    .and_then(|queue| queue.back())
                {
                    Some(id) => Some(ThreadStreamEvent::ItemDelta {
                        item_id: id.clone(),
                        delta,
                    }),
                    None => {
                        log::warn!(
                            "Dropping delta for unknown placeholder item in {}",
                            self.thread_id
                        );
                        None
                    }
                }
            }
            ThreadStreamEvent::ItemDone { mut item } => {
                if item.has_placeholder_id() {
                    let id = self.resolve_done_id(&item);
                    item.set_id(id);
                }
                if let ThreadItem::AssistantMessage(message) = &item {
                    if !self.forwarded_done.insert(message.id.clone()) {
                        log::debug!("Dropping duplicate done event for item {}", message.id);
                        return None;
                    }
                    self.last_closed = Some((message.text(), message.id.clone()));
                }
                Some(ThreadStreamEvent::done(item))
            }
        }
    }

    fn resolve_done_id(&mut self, item: &ThreadItem) -> String {
        let kind = item.kind();
        if let Some(id) = self.open.get_mut(&kind).and_then(VecDeque::pop_front) {
            return id;
        }
        // A completion re-emitted without its `added` event.
        if let ThreadItem::AssistantMessage(message) = item {
            let text = message.text();
            if let Some((closed_text, id)) = &self.last_closed {
                if *closed_text == text {
                    return id.clone();
                }
            }
        }
        self.fresh_id(kind)
    }

    fn fresh_id(&self, kind: ItemKind) -> String {
        let id = self.ids.generate_item_id(kind, &self.thread_id);
        log::debug!("Assigned id {} to {:?} in {}", id, kind, self.thread_id);
        id
    }
}
