use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Hour-of-day, 0..24.
pub type Hour = u8;

/// Free-slot sentinel in the calendar arena.
pub const FREE: u64 = 0;

/// Monotonically assigned booking identifier; the first booking gets 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookingId(pub u64);

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Daily bookable window, half-open `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub begin: Hour,
    pub end: Hour,
}

impl WorkingHours {
    pub fn new(begin: Hour, end: Hour) -> Self {
        debug_assert!(begin < end && end <= 24, "working hours must satisfy begin < end <= 24");
        Self { begin, end }
    }

    pub fn contains(&self, hour: Hour) -> bool {
        self.begin <= hour && hour < self.end
    }

    pub fn hours_per_day(&self) -> usize {
        (self.end - self.begin) as usize
    }
}

/// A requested reservation window. Hours are half-open: the end hour itself
/// is not booked, so `09:00–11:00` covers the 9 and 10 o'clock slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRange {
    pub start_date: NaiveDate,
    pub start_hour: Hour,
    pub end_date: NaiveDate,
    pub end_hour: Hour,
}

impl BookingRange {
    pub fn new(start_date: NaiveDate, start_hour: Hour, end_date: NaiveDate, end_hour: Hour) -> Self {
        Self { start_date, start_hour, end_date, end_hour }
    }

    pub fn single_day(date: NaiveDate, start_hour: Hour, end_hour: Hour) -> Self {
        Self::new(date, start_hour, date, end_hour)
    }

    /// Structural validity only; working-hour and horizon checks belong to
    /// the availability checker.
    pub fn is_well_formed(&self) -> bool {
        if self.start_hour >= 24 || self.end_hour > 24 {
            return false;
        }
        match self.start_date.cmp(&self.end_date) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => self.start_hour < self.end_hour,
            std::cmp::Ordering::Greater => false,
        }
    }

    /// The half-open hour window this range covers on `date`:
    /// `[start_hour, hours.end)` on the start date, `[hours.begin, end_hour)`
    /// on the end date, the full working day in between. `None` if `date`
    /// lies outside the range.
    pub fn day_window(&self, date: NaiveDate, hours: WorkingHours) -> Option<(Hour, Hour)> {
        if date < self.start_date || date > self.end_date {
            return None;
        }
        let from = if date == self.start_date { self.start_hour } else { hours.begin };
        let to = if date == self.end_date { self.end_hour } else { hours.end };
        Some((from, to))
    }

    /// Every calendar date the range touches, start and end inclusive.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        self.start_date.iter_days().take_while(move |d| *d <= end)
    }
}

impl std::fmt::Display for BookingRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:02}:00–{} {:02}:00",
            self.start_date, self.start_hour, self.end_date, self.end_hour
        )
    }
}

/// A committed reservation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub login: String,
    pub space_name: String,
    pub range: BookingRange,
}

/// What one calendar cell holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Free,
    Occupied(BookingId),
}

/// Per-space calendar state: working hours plus the slot arena.
///
/// The arena is a flat `Vec<u64>` indexed by
/// `day_offset * hours_per_day + (hour - hours.begin)`; `FREE` marks an open
/// cell, anything else is the owning booking ID. The horizon is materialized
/// once at creation and never extended.
#[derive(Debug, Clone)]
pub struct SpaceState {
    pub name: String,
    pub hours: WorkingHours,
    pub horizon_start: NaiveDate,
    pub horizon_days: u16,
    slots: Vec<u64>,
    pub bookings: Vec<Booking>,
}

impl SpaceState {
    pub fn new(name: String, hours: WorkingHours, horizon_start: NaiveDate, horizon_days: u16) -> Self {
        let cells = horizon_days as usize * hours.hours_per_day();
        Self {
            name,
            hours,
            horizon_start,
            horizon_days,
            slots: vec![FREE; cells],
            bookings: Vec::new(),
        }
    }

    pub fn day_offset(&self, date: NaiveDate) -> Option<usize> {
        let off = date.signed_duration_since(self.horizon_start).num_days();
        (0..self.horizon_days as i64).contains(&off).then_some(off as usize)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.day_offset(date).is_some()
    }

    pub fn date_at(&self, day_offset: usize) -> NaiveDate {
        self.horizon_start + Days::new(day_offset as u64)
    }

    fn slot_index(&self, date: NaiveDate, hour: Hour) -> Option<usize> {
        let day = self.day_offset(date)?;
        if !self.hours.contains(hour) {
            return None;
        }
        Some(day * self.hours.hours_per_day() + (hour - self.hours.begin) as usize)
    }

    /// `None` means "no such slot": `date` outside the horizon or `hour`
    /// outside working hours. A distinct outcome from `Occupied`.
    pub fn slot_status(&self, date: NaiveDate, hour: Hour) -> Option<SlotStatus> {
        self.slot_index(date, hour).map(|i| match self.slots[i] {
            FREE => SlotStatus::Free,
            id => SlotStatus::Occupied(BookingId(id)),
        })
    }

    pub fn is_free(&self, date: NaiveDate, hour: Hour) -> bool {
        matches!(self.slot_status(date, hour), Some(SlotStatus::Free))
    }

    /// Mark every cell covered by `range` with `id`. Unconditional: the
    /// caller owns the check-then-act sequence and has already verified the
    /// cells are free under the space's write lock.
    pub fn mark_range(&mut self, range: &BookingRange, id: BookingId) {
        for date in range.dates() {
            let Some((from, to)) = range.day_window(date, self.hours) else { continue };
            for hour in from..to {
                if let Some(i) = self.slot_index(date, hour) {
                    debug_assert_eq!(self.slots[i], FREE, "marking an occupied slot");
                    self.slots[i] = id.0;
                }
            }
        }
    }

    /// Reset every cell held by `id` back to free and return the count.
    /// Full-arena scan; the bounded horizon keeps this cheap.
    pub fn release_booking(&mut self, id: BookingId) -> usize {
        let mut cleared = 0;
        for cell in &mut self.slots {
            if *cell == id.0 {
                *cell = FREE;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn find_booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    /// Contiguous free hours of one day, merged into half-open spans.
    pub fn free_spans(&self, day_offset: usize) -> Vec<HourSpan> {
        let per_day = self.hours.hours_per_day();
        let day = &self.slots[day_offset * per_day..(day_offset + 1) * per_day];
        let mut spans: Vec<HourSpan> = Vec::new();
        for (i, cell) in day.iter().enumerate() {
            if *cell != FREE {
                continue;
            }
            let hour = self.hours.begin + i as Hour;
            if let Some(last) = spans.last_mut()
                && last.end == hour {
                    last.end = hour + 1;
                    continue;
                }
            spans.push(HourSpan { start: hour, end: hour + 1 });
        }
        spans
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    SpaceCreated {
        name: String,
        hours: WorkingHours,
        horizon_start: NaiveDate,
        horizon_days: u16,
    },
    SpaceDeleted {
        name: String,
    },
    BookingReserved {
        id: BookingId,
        login: String,
        space_name: String,
        range: BookingRange,
    },
    BookingCancelled {
        id: BookingId,
        space_name: String,
    },
    /// Pins the booking-ID counter across compaction; carries no slot state.
    IdCheckpoint {
        next: u64,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceInfo {
    pub name: String,
    pub hours: WorkingHours,
    pub horizon_start: NaiveDate,
    pub horizon_days: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingInfo {
    pub id: BookingId,
    pub login: String,
    pub space_name: String,
    pub range: BookingRange,
}

impl From<&Booking> for BookingInfo {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id,
            login: b.login.clone(),
            space_name: b.space_name.clone(),
            range: b.range,
        }
    }
}

/// Half-open free interval within one day, rendered as "09:00–10:00".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourSpan {
    pub start: Hour,
    pub end: Hour,
}

impl std::fmt::Display for HourSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00–{:02}:00", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayFreeSlots {
    pub date: NaiveDate,
    pub free: Vec<HourSpan>,
}
