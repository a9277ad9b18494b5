//! Sync controller: owns the in-memory ledger and keeps it in step with the
//! shared store using optimistic concurrency.
//!
//! Every write is "read revision, append, conditionally write". A stale
//! revision yields a conflict, after which the controller reloads the latest
//! snapshot and re-appends on the fresh tail. A write that times out or fails
//! in transit has an unknown outcome and is resolved by reloading and looking
//! for the block it tried to add.

use crate::booking::{BlockSummary, Booking, Route};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::store::{RemoteStore, Revision, Snapshot, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticketchain_ledger::{Ledger, Payload, Timestamp, codec};
use tokio::sync::{Mutex, watch};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Lifecycle phase of a [`SyncController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    /// `start` has not completed yet.
    Uninitialized,
    /// A ledger is loaded and no write is in flight.
    Loaded,
    /// A booking is being appended and written.
    Appending,
    /// A write conflicted or had an unknown outcome; reloading before retry.
    ConflictRetry,
}

/// Ledger plus the revision it was last read or written at.
///
/// `revision` is `None` while the ledger exists only locally (a freshly seeded
/// genesis that has never been written).
#[derive(Debug)]
struct LoadedState {
    ledger: Ledger,
    revision: Option<Revision>,
}

impl LoadedState {
    /// Replaces the local ledger with a fetched one, refusing snapshots that
    /// drop or rewrite blocks this process already saw acknowledged.
    fn adopt(&mut self, ledger: Ledger, revision: Revision) -> SyncResult<()> {
        if self.revision.is_some() && !ledger.extends(&self.ledger) {
            return Err(SyncError::Integrity(format!(
                "remote snapshot at revision {revision} rewrote acknowledged history \
                 ({} local blocks, {} remote)",
                self.ledger.len(),
                ledger.len()
            )));
        }
        self.ledger = ledger;
        self.revision = Some(revision);
        Ok(())
    }
}

/// Owns the session's ledger and serializes all writes to it.
pub struct SyncController {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    state: Mutex<Option<LoadedState>>,
    phase: watch::Sender<SyncPhase>,
}

impl SyncController {
    /// Creates a controller over `store`. Call [`start`](Self::start) before booking.
    pub fn new(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Uninitialized);
        Self {
            store,
            config,
            state: Mutex::new(None),
            phase,
        }
    }

    /// Effective retry and timeout settings.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Subscribes to phase changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Loads the shared snapshot, or seeds a genesis ledger if none exists.
    ///
    /// A snapshot that fails to decode or validate is reported as an
    /// integrity failure and never repaired. Calling `start` again reloads.
    pub async fn start(&self) -> SyncResult<()> {
        let mut guard = self.state.lock().await;

        match self.fetch_with_retry().await? {
            Some((ledger, revision)) => {
                info!(
                    "Loaded {} blocks from {} store at revision {}",
                    ledger.len(),
                    self.store.provider_name(),
                    revision
                );
                match guard.as_mut() {
                    Some(state) => state.adopt(ledger, revision)?,
                    None => {
                        *guard = Some(LoadedState {
                            ledger,
                            revision: Some(revision),
                        })
                    }
                }
            }
            None => {
                if guard.as_ref().is_some_and(|s| s.revision.is_some()) {
                    return Err(SyncError::Integrity(
                        "snapshot disappeared after being acknowledged".to_string(),
                    ));
                }
                info!(
                    "No snapshot in {} store, seeding genesis block",
                    self.store.provider_name()
                );
                *guard = Some(LoadedState {
                    ledger: Ledger::empty_with_genesis(Timestamp::now())?,
                    revision: None,
                });
            }
        }

        self.phase.send_replace(SyncPhase::Loaded);
        Ok(())
    }

    /// Validates and records a booking.
    ///
    /// Rejected input never reaches the ledger or the store. On success the
    /// booking is durably written and reflected in [`history`](Self::history).
    pub async fn book(&self, name: &str, route: Route, tickets: u32) -> SyncResult<BlockSummary> {
        let booking = Booking::new(name, route, tickets)?;
        debug!(
            "Booking {} ticket(s) on {} for {}",
            booking.tickets(),
            booking.route(),
            booking.name()
        );
        self.submit(booking.to_payload()).await
    }

    /// Appends an arbitrary payload and writes it with conflict retry.
    pub async fn submit(&self, payload: Payload) -> SyncResult<BlockSummary> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(SyncError::NotStarted)?;

        let result = self.submit_locked(state, payload).await;
        self.phase.send_replace(SyncPhase::Loaded);
        result
    }

    async fn submit_locked(
        &self,
        state: &mut LoadedState,
        payload: Payload,
    ) -> SyncResult<BlockSummary> {
        let max_attempts = self.config.max_attempts.max(1);
        // Hashes of blocks from writes whose outcome is unknown.
        let mut in_doubt: Vec<String> = Vec::new();
        // Set while no successful reload has followed the latest in-doubt write.
        let mut unresolved = false;
        let mut last = StoreError::Timeout;

        for attempt in 1..=max_attempts {
            self.phase.send_replace(SyncPhase::Appending);

            let candidate = state.ledger.append(payload.clone(), Timestamp::now())?;
            let bytes = codec::encode(&candidate)?;
            let block_hash = candidate.tail_hash()?.to_string();

            match self.put_once(&bytes, state.revision.as_ref()).await {
                Ok(revision) => {
                    state.ledger = candidate;
                    state.revision = Some(revision);
                    let index = state.ledger.len() - 1;
                    info!(
                        "Appended block {} ({}) at revision {}",
                        index,
                        short(&block_hash),
                        state.revision.as_ref().map_or("-", Revision::as_str)
                    );
                    return Ok(self.summary_at(state, index));
                }
                Err(err) if err.is_unknown_outcome() => {
                    warn!(
                        "Write attempt {}/{} has unknown outcome: {}",
                        attempt, max_attempts, err
                    );
                    in_doubt.push(block_hash);
                    unresolved = true;
                    last = err;
                    self.phase.send_replace(SyncPhase::ConflictRetry);
                    sleep(self.config.backoff(attempt)).await;
                }
                Err(err) => {
                    warn!(
                        "Write attempt {}/{} rejected: {}, reloading",
                        attempt, max_attempts, err
                    );
                    last = err;
                    self.phase.send_replace(SyncPhase::ConflictRetry);
                }
            }

            match self.reload_locked(state).await {
                Ok(()) => {
                    if let Some(index) = in_doubt
                        .iter()
                        .find_map(|hash| state.ledger.position_of(hash))
                    {
                        info!("Earlier write landed as block {}", index);
                        return Ok(self.summary_at(state, index));
                    }
                    unresolved = false;
                }
                Err(SyncError::Store(err)) => {
                    warn!("Reload after attempt {} failed: {}", attempt, err);
                    last = err;
                }
                Err(err) => {
                    error!("Reload after attempt {} failed: {}", attempt, err);
                    return Err(err);
                }
            }
        }

        if let Some(block_hash) = in_doubt.pop().filter(|_| unresolved) {
            error!(
                "Booking outcome unknown after {} attempts: block {} may have been stored ({})",
                max_attempts,
                short(&block_hash),
                last
            );
            return Err(SyncError::OutcomeUnknown {
                attempts: max_attempts,
                block_hash,
                last,
            });
        }

        error!("Booking failed after {} attempts: {}", max_attempts, last);
        Err(SyncError::RetriesExhausted {
            attempts: max_attempts,
            last,
        })
    }

    /// Reloads the latest snapshot, keeping the acknowledged prefix intact.
    ///
    /// Lets a session pick up bookings made by other clients.
    pub async fn reload(&self) -> SyncResult<()> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(SyncError::NotStarted)?;
        self.reload_locked(state).await
    }

    async fn reload_locked(&self, state: &mut LoadedState) -> SyncResult<()> {
        match self.fetch_once().await {
            Ok(snapshot) => {
                let (ledger, revision) = decode_snapshot(snapshot)?;
                debug!("Reloaded {} blocks at revision {}", ledger.len(), revision);
                state.adopt(ledger, revision)
            }
            Err(StoreError::NotFound) if state.revision.is_none() => Ok(()),
            Err(StoreError::NotFound) => Err(SyncError::Integrity(
                "snapshot disappeared after being acknowledged".to_string(),
            )),
            Err(err) => Err(SyncError::Store(err)),
        }
    }

    /// Read-only view of every block, in ledger order.
    pub async fn history(&self) -> Vec<BlockSummary> {
        let guard = self.state.lock().await;
        guard
            .as_ref()
            .map(|state| {
                state
                    .ledger
                    .iter()
                    .enumerate()
                    .map(|(index, block)| BlockSummary::from_block(index, block))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A copy of the current ledger, if started.
    pub async fn ledger(&self) -> Option<Ledger> {
        self.state.lock().await.as_ref().map(|s| s.ledger.clone())
    }

    /// Revision of the last successful read or write.
    pub async fn revision(&self) -> Option<Revision> {
        self.state
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.revision.clone())
    }

    fn summary_at(&self, state: &LoadedState, index: usize) -> BlockSummary {
        // `index` always comes from the ledger it is looked up in.
        let block = &state.ledger.blocks()[index];
        BlockSummary::from_block(index, block)
    }

    async fn fetch_once(&self) -> StoreResult<Snapshot> {
        timeout(self.config.op_timeout(), self.store.fetch())
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    async fn put_once(&self, bytes: &[u8], expected: Option<&Revision>) -> StoreResult<Revision> {
        timeout(
            self.config.op_timeout(),
            self.store.conditional_put(bytes, expected),
        )
        .await
        .unwrap_or(Err(StoreError::Timeout))
    }

    /// Fetches and validates the snapshot, retrying transient failures.
    /// Returns `None` if the store holds nothing yet.
    async fn fetch_with_retry(&self) -> SyncResult<Option<(Ledger, Revision)>> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once().await {
                Ok(snapshot) => return decode_snapshot(snapshot).map(Some),
                Err(StoreError::NotFound) => return Ok(None),
                Err(err) if attempt < max_attempts => {
                    warn!("Fetch attempt {}/{} failed: {}", attempt, max_attempts, err);
                    sleep(self.config.backoff(attempt)).await;
                }
                Err(err) => {
                    error!("Fetch failed after {} attempts: {}", attempt, err);
                    return Err(SyncError::RetriesExhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }
    }
}

fn decode_snapshot(snapshot: Snapshot) -> SyncResult<(Ledger, Revision)> {
    let ledger = codec::decode(&snapshot.bytes).map_err(SyncError::integrity_from_decode)?;
    ledger.validate().map_err(SyncError::integrity_from_chain)?;
    Ok((ledger, snapshot.revision))
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
