use crate::model::*;

use super::availability::{check_range, today, RangeDecision};
use super::{Engine, EngineError};

impl Engine {
    pub async fn find_space(&self, name: &str) -> Option<SpaceInfo> {
        let rs = self.get_space(name)?;
        let guard = rs.read().await;
        Some(SpaceInfo {
            name: guard.name.clone(),
            hours: guard.hours,
            horizon_start: guard.horizon_start,
            horizon_days: guard.horizon_days,
        })
    }

    pub async fn list_spaces(&self) -> Vec<SpaceInfo> {
        let names: Vec<String> = self.state.iter().map(|e| e.key().clone()).collect();
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            if let Some(info) = self.find_space(&name).await {
                out.push(info);
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Speculative availability check: the same decision `reserve` makes,
    /// with no side effects. Out-of-horizon dates surface as
    /// `SpaceNotFound`, like any other lookup miss; conflicts and malformed
    /// or past ranges are simply "not available".
    pub async fn is_range_available(
        &self,
        space_name: &str,
        range: &BookingRange,
    ) -> Result<bool, EngineError> {
        let rs = self
            .get_space(space_name)
            .ok_or_else(|| EngineError::SpaceNotFound(space_name.to_string()))?;
        let guard = rs.read().await;
        match check_range(&guard, range, today()) {
            RangeDecision::Available => Ok(true),
            RangeDecision::OutOfHorizon => {
                Err(EngineError::SpaceNotFound(space_name.to_string()))
            }
            RangeDecision::Conflict | RangeDecision::Invalid | RangeDecision::InPast => Ok(false),
        }
    }

    /// Free hour-ranges per bookable date, sorted by date then hour. Dates
    /// already in the past and days with nothing free are omitted.
    pub async fn list_available_slots(
        &self,
        space_name: &str,
    ) -> Result<Vec<DayFreeSlots>, EngineError> {
        let rs = self
            .get_space(space_name)
            .ok_or_else(|| EngineError::SpaceNotFound(space_name.to_string()))?;
        let guard = rs.read().await;
        let today = today();

        let mut out = Vec::new();
        for off in 0..guard.horizon_days as usize {
            let date = guard.date_at(off);
            if date < today {
                continue;
            }
            let free = guard.free_spans(off);
            if !free.is_empty() {
                out.push(DayFreeSlots { date, free });
            }
        }
        Ok(out)
    }

    pub async fn find_booking(&self, id: BookingId) -> Option<BookingInfo> {
        let space_name = self.space_for_booking(id)?;
        let rs = self.get_space(&space_name)?;
        let guard = rs.read().await;
        guard.find_booking(id).map(BookingInfo::from)
    }

    pub async fn bookings_for_space(
        &self,
        space_name: &str,
    ) -> Result<Vec<BookingInfo>, EngineError> {
        let rs = self
            .get_space(space_name)
            .ok_or_else(|| EngineError::SpaceNotFound(space_name.to_string()))?;
        let guard = rs.read().await;
        Ok(guard.bookings.iter().map(BookingInfo::from).collect())
    }

    pub async fn bookings_for_user(&self, login: &str) -> Vec<BookingInfo> {
        let names: Vec<String> = self.state.iter().map(|e| e.key().clone()).collect();
        let mut out = Vec::new();
        for name in names {
            if let Some(rs) = self.get_space(&name) {
                let guard = rs.read().await;
                out.extend(
                    guard
                        .bookings
                        .iter()
                        .filter(|b| b.login == login)
                        .map(BookingInfo::from),
                );
            }
        }
        out.sort_by_key(|b| b.id);
        out
    }
}
