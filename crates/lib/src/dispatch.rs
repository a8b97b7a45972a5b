//! Fetch-then-forward for `reaction_added` events, run as detached tasks.

use crate::events::{SlackEnvelope, SlackEvent};
use crate::notion::{NotionClient, NotionError};
use crate::slack::{SlackClient, SlackError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Where message text comes from (Slack in production).
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_message_text(&self, channel: &str, ts: &str) -> Result<String, SlackError>;
}

/// Where message text goes (Notion in production).
#[async_trait]
pub trait PageSink: Send + Sync {
    async fn create_page(&self, text: &str) -> Result<(), NotionError>;
}

#[async_trait]
impl MessageSource for SlackClient {
    async fn fetch_message_text(&self, channel: &str, ts: &str) -> Result<String, SlackError> {
        SlackClient::fetch_message_text(self, channel, ts).await
    }
}

#[async_trait]
impl PageSink for NotionClient {
    async fn create_page(&self, text: &str) -> Result<(), NotionError> {
        NotionClient::create_page(self, text).await
    }
}

/// Relays reacted-to messages from a source to a sink. Cheap to clone; clones share the clients.
#[derive(Clone)]
pub struct Dispatcher {
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn PageSink>,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn MessageSource>, sink: Arc<dyn PageSink>) -> Self {
        Self { source, sink }
    }

    /// Run [`Dispatcher::handle_reaction_added`] on a new task. The envelope moves into the task;
    /// callers may drop the handle, nothing awaits the outcome.
    pub fn spawn(&self, envelope: SlackEnvelope) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.handle_reaction_added(&envelope.event).await;
        })
    }

    /// Fetch the reacted-to message and create a page from it. Failures are logged and end the
    /// attempt; there is no retry.
    pub async fn handle_reaction_added(&self, event: &SlackEvent) {
        let item = &event.item;
        let text = match self.source.fetch_message_text(&item.channel, &item.ts).await {
            Ok(t) => t,
            Err(e) => {
                log::warn!(
                    "failed to fetch message text (channel {}, ts {}): {}",
                    item.channel,
                    item.ts,
                    e
                );
                return;
            }
        };
        if text.is_empty() {
            // Not found and ok:false both land here; the page is still created.
            log::warn!(
                "no message text for channel {} ts {}; forwarding empty text",
                item.channel,
                item.ts
            );
        }
        if let Err(e) = self.sink.create_page(&text).await {
            log::warn!("failed to add to notion: {}", e);
        }
    }
}
