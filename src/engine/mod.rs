mod availability;
mod error;
mod mutations;
mod queries;

pub use availability::{check_range, today, RangeDecision};
pub use error::EngineError;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedSpaceState = Arc<RwLock<SpaceState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                                .record(batch.len() as f64);
                            let flush_start = std::time::Instant::now();
                            let result = flush_batch(&mut wal, &mut batch);
                            metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                                .record(flush_start.elapsed().as_secs_f64());
                            respond_batch(&mut batch, &result);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                        .record(batch.len() as f64);
                    let flush_start = std::time::Instant::now();
                    let result = flush_batch(&mut wal, &mut batch);
                    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                        .record(flush_start.elapsed().as_secs_f64());
                    respond_batch(&mut batch, &result);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: &mut [(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

pub struct Engine {
    pub state: DashMap<String, SharedSpaceState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    /// Reverse lookup: booking id → space name.
    pub(super) booking_index: DashMap<BookingId, String>,
    /// Next booking id to hand out; restored from the WAL on boot.
    next_booking_id: AtomicU64,
}

/// Apply an event directly to a SpaceState (no locking — caller holds the lock).
fn apply_to_space(rs: &mut SpaceState, event: &Event, index: &DashMap<BookingId, String>) {
    match event {
        Event::BookingReserved {
            id,
            login,
            space_name,
            range,
        } => {
            rs.mark_range(range, *id);
            rs.bookings.push(Booking {
                id: *id,
                login: login.clone(),
                space_name: space_name.clone(),
                range: *range,
            });
            index.insert(*id, space_name.clone());
        }
        Event::BookingCancelled { id, .. } => {
            rs.release_booking(*id);
            rs.bookings.retain(|b| b.id != *id);
            index.remove(id);
        }
        // Space create/delete and checkpoints are handled at the map level, not here
        Event::SpaceCreated { .. } | Event::SpaceDeleted { .. } | Event::IdCheckpoint { .. } => {}
    }
}

impl Engine {
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            state: DashMap::new(),
            wal_tx,
            notify,
            booking_index: DashMap::new(),
            next_booking_id: AtomicU64::new(1),
        };

        // Replay events — we're the sole owner of these Arcs, so try_read/try_write
        // always succeed instantly (no contention). Never use blocking_read/blocking_write
        // here because this may run inside an async context.
        let mut next_id = 1u64;
        for event in &events {
            match event {
                Event::SpaceCreated {
                    name,
                    hours,
                    horizon_start,
                    horizon_days,
                } => {
                    let rs = SpaceState::new(name.clone(), *hours, *horizon_start, *horizon_days);
                    engine.state.insert(name.clone(), Arc::new(RwLock::new(rs)));
                }
                Event::SpaceDeleted { name } => {
                    if let Some((_, rs)) = engine.state.remove(name) {
                        let guard = rs.try_read().expect("replay: uncontended read");
                        for b in &guard.bookings {
                            engine.booking_index.remove(&b.id);
                        }
                    }
                }
                Event::IdCheckpoint { next } => {
                    next_id = next_id.max(*next);
                }
                other => {
                    if let Event::BookingReserved { id, .. } = other {
                        next_id = next_id.max(id.0 + 1);
                    }
                    if let Some(name) = event_space_name(other)
                        && let Some(entry) = engine.state.get(name) {
                            let rs = entry.value().clone();
                            let mut guard = rs.try_write().expect("replay: uncontended write");
                            apply_to_space(&mut guard, other, &engine.booking_index);
                        }
                }
            }
        }
        engine.next_booking_id.store(next_id, Ordering::SeqCst);

        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Storage("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Storage("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    pub fn get_space(&self, name: &str) -> Option<SharedSpaceState> {
        self.state.get(name).map(|e| e.value().clone())
    }

    pub fn space_for_booking(&self, id: BookingId) -> Option<String> {
        self.booking_index.get(&id).map(|e| e.value().clone())
    }

    pub(super) fn allocate_booking_id(&self) -> BookingId {
        BookingId(self.next_booking_id.fetch_add(1, Ordering::SeqCst))
    }

    pub(super) fn next_booking_id(&self) -> u64 {
        self.next_booking_id.load(Ordering::SeqCst)
    }

    /// WAL-append + apply + notify in one call. The append happens first;
    /// if it fails, nothing has been applied and the operation aborts clean.
    pub(super) async fn persist_and_apply(
        &self,
        space_name: &str,
        rs: &mut SpaceState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_space(rs, event, &self.booking_index);
        self.notify.send(space_name, event);
        Ok(())
    }
}

/// Extract the space name from an event (for non-Create/Delete events).
fn event_space_name(event: &Event) -> Option<&str> {
    match event {
        Event::BookingReserved { space_name, .. }
        | Event::BookingCancelled { space_name, .. } => Some(space_name),
        Event::SpaceCreated { .. } | Event::SpaceDeleted { .. } | Event::IdCheckpoint { .. } => None,
    }
}
