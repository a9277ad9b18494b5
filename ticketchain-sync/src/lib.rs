//! Shared-store synchronization for the TicketChain ledger.
//!
//! # Architecture
//!
//! The ledger is persisted as a single snapshot object in a store that other
//! clients write to as well. There is no locking between clients: each write
//! carries the revision it was based on, and the store rejects it if someone
//! else wrote first.
//!
//! ## Components
//!
//! - **Store**: [`RemoteStore`] with in-memory and file-backed implementations
//! - **Booking**: request validation and the [`BlockSummary`] display view
//! - **Controller**: [`SyncController`] owns the session ledger and runs the
//!   load / append / conditional-write / retry cycle
//!
//! ## Write Cycle
//!
//! 1. **Append**: build the next block on the local tail
//! 2. **Write**: conditional put with the last known revision
//! 3. **Conflict**: reload, validate, re-append on the fresh tail, retry
//! 4. **Unknown outcome**: on timeout or transport failure, reload and check
//!    whether the block landed before trying again
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ticketchain_sync::{MemoryStore, Route, SyncConfig, SyncController};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let controller = SyncController::new(Arc::new(MemoryStore::new()), SyncConfig::default());
//! controller.start().await.unwrap();
//!
//! let summary = controller.book("Alice", Route::AToB, 2).await.unwrap();
//! assert_eq!(summary.index, 1);
//! assert_eq!(controller.history().await.len(), 2);
//! # });
//! ```

pub mod booking;
mod config;
mod controller;
mod error;
pub mod store;

pub use booking::{BlockSummary, Booking, MAX_TICKETS, MIN_TICKETS, Route};
pub use config::SyncConfig;
pub use controller::{SyncController, SyncPhase};
pub use error::{SyncError, SyncResult};
pub use store::{
    FileStore, FileStoreConfig, MemoryStore, RemoteStore, Revision, Snapshot, StoreError,
    StoreResult,
};
