//! Work Queue
//!
//! - `codec` - work item <-> queue entry serialization
//! - `store` - the shared list (Redis or in-memory)
//! - `dispatcher` - pops entries and hands jobs to clients

pub mod codec;
pub mod dispatcher;
pub mod store;

pub use codec::{EncodedEntry, MalformedEntryError, WorkItem, WorkValue, DEFAULT_VERSION};
pub use dispatcher::{DispatchError, WorkDispatcher};
pub use store::{MemoryQueue, QueueError, QueueStore, RedisQueue};
