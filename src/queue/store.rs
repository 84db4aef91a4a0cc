//! Queue storage backends
//!
//! Both backends push to the head of a single named list and pop from the
//! head, so the queue hands out the most recently pushed entry first.
//! Producers that need FIFO ordering must arrange it themselves.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::codec::EncodedEntry;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is empty")]
    Empty,

    #[error("queue store error: {0}")]
    Store(#[from] redis::RedisError),
}

/// Contract over the shared list that holds pending work
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Name of the backend, for health reporting
    fn backend(&self) -> &'static str;

    /// Push an entry onto the head of the queue
    async fn push(&self, entry: EncodedEntry) -> Result<(), QueueError>;

    /// Atomically remove and return the head entry
    async fn pop(&self) -> Result<EncodedEntry, QueueError>;

    /// Number of pending entries. A hint only: other clients may change it.
    async fn len(&self) -> Result<usize, QueueError>;

    /// Whether the queue currently looks empty. A hint only: a following
    /// `pop` may still return `QueueError::Empty`.
    async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }
}

/// Redis list backend (`LPUSH` / `LPOP` / `LLEN`)
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    name: String,
}

impl RedisQueue {
    /// Connect to Redis and bind to the named list
    pub async fn connect(url: &str, name: impl Into<String>) -> Result<Self, QueueError> {
        let name = name.into();
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(queue = %name, "Connected to Redis queue");
        Ok(Self { conn, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl QueueStore for RedisQueue {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn push(&self, entry: EncodedEntry) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: usize = conn.lpush(&self.name, entry.into_bytes()).await?;
        Ok(())
    }

    async fn pop(&self) -> Result<EncodedEntry, QueueError> {
        let mut conn = self.conn.clone();
        let entry: Option<Vec<u8>> = conn.lpop(&self.name, None).await?;
        match entry {
            Some(bytes) => {
                debug!(queue = %self.name, size = bytes.len(), "Popped entry");
                Ok(EncodedEntry::from(bytes))
            }
            None => Err(QueueError::Empty),
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(&self.name).await?;
        Ok(len)
    }
}

/// In-process backend with the same head-push/head-pop ordering
#[derive(Default)]
pub struct MemoryQueue {
    entries: Mutex<VecDeque<EncodedEntry>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueue {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn push(&self, entry: EncodedEntry) -> Result<(), QueueError> {
        self.entries.lock().await.push_front(entry);
        Ok(())
    }

    async fn pop(&self) -> Result<EncodedEntry, QueueError> {
        self.entries.lock().await.pop_front().ok_or(QueueError::Empty)
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.entries.lock().await.len())
    }
}
