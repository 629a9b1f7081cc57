use std::sync::Arc;

use tokio::sync::{oneshot, RwLock};

use crate::limits::*;
use crate::model::*;

use super::availability::{check_range, today, RangeDecision};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Create a space and materialize its calendar: `days` consecutive
    /// dates starting today, every hour in `[begin_hour, end_hour)` free.
    pub async fn create_space(
        &self,
        name: &str,
        begin_hour: Hour,
        end_hour: Hour,
        days: u16,
    ) -> Result<(), EngineError> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("space name length"));
        }
        if begin_hour >= end_hour || end_hour > 24 {
            return Err(EngineError::LimitExceeded("working hours out of range"));
        }
        if days == 0 || days as usize > MAX_HORIZON_DAYS {
            return Err(EngineError::LimitExceeded("horizon days out of range"));
        }
        if self.state.len() >= MAX_SPACES {
            return Err(EngineError::LimitExceeded("too many spaces"));
        }
        if self.state.contains_key(name) {
            return Err(EngineError::SpaceAlreadyExists(name.to_string()));
        }

        let hours = WorkingHours::new(begin_hour, end_hour);
        let horizon_start = today();
        let event = Event::SpaceCreated {
            name: name.to_string(),
            hours,
            horizon_start,
            horizon_days: days,
        };
        self.wal_append(&event).await?;
        let rs = SpaceState::new(name.to_string(), hours, horizon_start, days);
        self.state.insert(name.to_string(), Arc::new(RwLock::new(rs)));
        self.notify.send(name, &event);
        metrics::gauge!(crate::observability::SPACES_ACTIVE).set(self.state.len() as f64);
        Ok(())
    }

    /// Delete a space together with its bookings and slots. Nothing of the
    /// space survives, and no partial deletion is observable: the write lock
    /// is held from the WAL append through the map removal.
    pub async fn delete_space(&self, name: &str) -> Result<(), EngineError> {
        let rs = self
            .get_space(name)
            .ok_or_else(|| EngineError::SpaceNotFound(name.to_string()))?;
        let guard = rs.write().await;

        let event = Event::SpaceDeleted { name: name.to_string() };
        self.wal_append(&event).await?;
        // Referential cleanup first: the bookings' index entries, then the
        // space record (slots and booking rows travel with it).
        for b in &guard.bookings {
            self.booking_index.remove(&b.id);
        }
        drop(guard);
        self.state.remove(name);
        self.notify.send(name, &event);
        self.notify.remove(name);
        metrics::gauge!(crate::observability::SPACES_ACTIVE).set(self.state.len() as f64);
        Ok(())
    }

    /// Reserve a range for `login`. The check-then-mark sequence runs under
    /// the space's exclusive write lock, so a concurrent reserve on an
    /// overlapping range cannot also succeed. The booking record and the
    /// slot marks derive from one WAL event: either both land or neither.
    pub async fn reserve(
        &self,
        login: &str,
        space_name: &str,
        range: BookingRange,
    ) -> Result<BookingId, EngineError> {
        if login.is_empty() || login.len() > MAX_LOGIN_LEN {
            return Err(EngineError::LimitExceeded("login length"));
        }
        let rs = self
            .get_space(space_name)
            .ok_or_else(|| EngineError::SpaceNotFound(space_name.to_string()))?;
        let mut guard = rs.write().await;

        match check_range(&guard, &range, today()) {
            RangeDecision::Available => {}
            RangeDecision::OutOfHorizon => {
                return Err(EngineError::SpaceNotFound(space_name.to_string()));
            }
            RangeDecision::Conflict | RangeDecision::Invalid | RangeDecision::InPast => {
                return Err(EngineError::SpaceNotAvailable(space_name.to_string()));
            }
        }

        let id = self.allocate_booking_id();
        let event = Event::BookingReserved {
            id,
            login: login.to_string(),
            space_name: space_name.to_string(),
            range,
        };
        self.persist_and_apply(space_name, &mut guard, &event).await?;
        Ok(id)
    }

    /// Cancel a booking, releasing exactly the slots it claimed.
    pub async fn cancel(
        &self,
        requester: &str,
        id: BookingId,
        is_admin: bool,
    ) -> Result<(), EngineError> {
        let space_name = self
            .space_for_booking(id)
            .ok_or(EngineError::BookingNotFound(id))?;
        let rs = self
            .get_space(&space_name)
            .ok_or(EngineError::BookingNotFound(id))?;
        let mut guard = rs.write().await;

        let booking = guard.find_booking(id).ok_or(EngineError::BookingNotFound(id))?;
        // A foreign booking looks exactly like a missing one to the caller.
        if !is_admin && booking.login != requester {
            return Err(EngineError::BookingNotFound(id));
        }

        let event = Event::BookingCancelled {
            id,
            space_name: space_name.clone(),
        };
        self.persist_and_apply(&space_name, &mut guard, &event).await
    }

    /// Compact the WAL by rewriting it with only the events needed to recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        // The checkpoint goes first so cancelled bookings' ids are never
        // handed out again after a replay of the compacted log.
        let mut events = vec![Event::IdCheckpoint {
            next: self.next_booking_id(),
        }];

        let names: Vec<String> = self.state.iter().map(|e| e.key().clone()).collect();
        for name in names {
            let Some(rs) = self.get_space(&name) else { continue };
            let guard = rs.read().await;
            events.push(Event::SpaceCreated {
                name: guard.name.clone(),
                hours: guard.hours,
                horizon_start: guard.horizon_start,
                horizon_days: guard.horizon_days,
            });
            for b in &guard.bookings {
                events.push(Event::BookingReserved {
                    id: b.id,
                    login: b.login.clone(),
                    space_name: b.space_name.clone(),
                    range: b.range,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::Storage("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Storage("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
