use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::codec::{self, MalformedEntryError, WorkItem};
use super::store::{QueueError, QueueStore};
use crate::models::Job;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing required parameter: client_id")]
    MissingClientId,

    #[error("no work available")]
    NoWork,

    #[error("could not decode queued work: {0}")]
    Malformed(#[from] MalformedEntryError),

    #[error("work queue unavailable: {0}")]
    Store(#[source] QueueError),
}

impl From<QueueError> for DispatchError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Empty => DispatchError::NoWork,
            other => DispatchError::Store(other),
        }
    }
}

/// Hands out one queued job per request
#[derive(Clone)]
pub struct WorkDispatcher {
    store: Arc<dyn QueueStore>,
}

impl WorkDispatcher {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    /// Pop the next entry and turn it into a job.
    ///
    /// The client id is required but does not select which entry is
    /// returned. An entry that fails to decode has already been removed
    /// from the queue and is not put back.
    pub async fn get_work(&self, client_id: Option<&str>) -> Result<Job, DispatchError> {
        let client_id = client_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(DispatchError::MissingClientId)?;

        let entry = self.store.pop().await?;

        let item = codec::decode(&entry).map_err(|e| {
            warn!(client_id, entry = %entry, error = %e, "Dropping malformed queue entry");
            e
        })?;
        let job = codec::to_job(&item);

        info!(client_id, job_id = %job.job_id, job_type = %job.job_type, "Dispatched job");
        Ok(job)
    }

    /// Encode a work item and push it onto the queue
    pub async fn enqueue(&self, item: &WorkItem) -> Result<(), QueueError> {
        self.store.push(codec::encode(item)).await?;
        info!(job_id = ?item.job_id.scalar_text(), "Enqueued work item");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::codec::{EncodedEntry, WorkValue};
    use crate::queue::store::MemoryQueue;

    fn dispatcher() -> (WorkDispatcher, Arc<MemoryQueue>) {
        let queue = Arc::new(MemoryQueue::new());
        (WorkDispatcher::new(queue.clone()), queue)
    }

    #[tokio::test]
    async fn test_missing_client_id_leaves_queue_untouched() {
        let (dispatcher, queue) = dispatcher();
        dispatcher
            .enqueue(&WorkItem::new("1", "ocr", vec!["a"]))
            .await
            .unwrap();

        for client_id in [None, Some(""), Some("   ")] {
            let err = dispatcher.get_work(client_id).await.unwrap_err();
            assert!(matches!(err, DispatchError::MissingClientId));
        }
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_is_no_work() {
        let (dispatcher, _) = dispatcher();
        let err = dispatcher.get_work(Some("client-1")).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoWork));
    }

    #[tokio::test]
    async fn test_four_field_entry_populates_job() {
        let (dispatcher, _) = dispatcher();
        let item = WorkItem::new("job-9", "extract", vec!["p1", "p2"]).with_version("v1");
        dispatcher.enqueue(&item).await.unwrap();

        let job = dispatcher.get_work(Some("client-1")).await.unwrap();
        assert_eq!(job.job_id, "job-9");
        assert_eq!(job.job_type, "extract");
        assert_eq!(job.data, WorkValue::from(vec!["p1", "p2"]));
        assert_eq!(job.version, "v1");
    }

    #[tokio::test]
    async fn test_malformed_entry_is_consumed() {
        let (dispatcher, queue) = dispatcher();
        queue.push(EncodedEntry::from("['a', ['b', 'c']]")).await.unwrap();

        let err = dispatcher.get_work(Some("client-1")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Malformed(_)));
        assert!(queue.is_empty().await.unwrap());
    }
}
