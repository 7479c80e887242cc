//! In-memory sink

use super::ChatSink;
use async_trait::async_trait;
use bridge_common::AppResult;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

/// One call recorded by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkRecord {
    Message {
        channel: Option<String>,
        text: String,
    },
    Presence(String),
    Rename {
        channel: String,
        name: String,
    },
}

/// Sink that keeps every call, for dry runs and tests
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SinkRecord>>>,
    changed: Arc<Notify>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far
    pub fn records(&self) -> Vec<SinkRecord> {
        self.records.lock().clone()
    }

    /// Texts of recorded messages, in order
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                SinkRecord::Message { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait until at least `count` records exist
    pub async fn wait_for(&self, count: usize) -> Vec<SinkRecord> {
        loop {
            let notified = self.changed.notified();
            {
                let records = self.records.lock();
                if records.len() >= count {
                    return records.clone();
                }
            }
            notified.await;
        }
    }

    fn push(&self, record: SinkRecord) {
        self.records.lock().push(record);
        self.changed.notify_waiters();
    }
}

#[async_trait]
impl ChatSink for MemorySink {
    async fn post_message(&self, channel: Option<&str>, text: &str) -> AppResult<()> {
        self.push(SinkRecord::Message {
            channel: channel.map(str::to_string),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn update_presence(&self, status: &str) -> AppResult<()> {
        self.push(SinkRecord::Presence(status.to_string()));
        Ok(())
    }

    async fn rename_channel(&self, channel: &str, name: &str) -> AppResult<()> {
        self.push(SinkRecord::Rename {
            channel: channel.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }
}
