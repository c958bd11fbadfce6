//! Scheduling time model.
//!
//! # Design
//!
//! Wall-clock instants are represented as whole minutes since a scheduling
//! epoch whose day 0 is a **Monday at 00:00**.  Durations are whole minutes.
//!
//!   weekday  = (stamp / 1440) % 7      (0 = Monday)
//!   day      =  stamp / 1440
//!   time-of-day = stamp % 1440
//!
//! Using an integer minute as the canonical time unit means all schedule
//! arithmetic is exact (no floating-point drift) and comparisons are O(1).
//! The consumer defines what the epoch means in real dates; the engine only
//! needs weekday structure, which the Monday anchor provides.

use std::fmt;

/// Minutes in one day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

// ── Minutes ──────────────────────────────────────────────────────────────────

/// A duration in whole minutes.
///
/// Stored as `u32`: at minute granularity a u32 spans ~8,170 years, far longer
/// than any conceivable production plan.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Minutes(pub u32);

impl Minutes {
    pub const ZERO: Minutes = Minutes(0);

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Add for Minutes {
    type Output = Minutes;
    #[inline]
    fn add(self, rhs: Minutes) -> Minutes {
        Minutes(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Minutes {
    fn sum<I: Iterator<Item = Minutes>>(iter: I) -> Minutes {
        Minutes(iter.map(|m| m.0).sum())
    }
}

impl fmt::Display for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}min", self.0)
    }
}

// ── Stamp ────────────────────────────────────────────────────────────────────

/// An absolute instant: minutes since the scheduling epoch (day 0 = Monday).
///
/// Signed so that subtraction is always well-defined; the engine itself never
/// schedules before the epoch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Stamp(pub i64);

impl Stamp {
    pub const EPOCH: Stamp = Stamp(0);

    /// Build a stamp from a day index and a time of day.
    #[inline]
    pub fn at(day: i64, hour: u32, minute: u32) -> Stamp {
        Stamp(day * MINUTES_PER_DAY + (hour * 60 + minute) as i64)
    }

    /// Build a stamp from a day index and a minute-of-day offset.
    #[inline]
    pub fn at_minute(day: i64, minute_of_day: u32) -> Stamp {
        Stamp(day * MINUTES_PER_DAY + minute_of_day as i64)
    }

    /// Day index since the epoch (floor division — correct for negatives).
    #[inline]
    pub fn day(self) -> i64 {
        self.0.div_euclid(MINUTES_PER_DAY)
    }

    /// Minute within the day, `0..1440`.
    #[inline]
    pub fn minute_of_day(self) -> u32 {
        self.0.rem_euclid(MINUTES_PER_DAY) as u32
    }

    /// Weekday index, `0 = Monday .. 6 = Sunday`.
    #[inline]
    pub fn weekday(self) -> usize {
        self.day().rem_euclid(7) as usize
    }

    /// Minutes elapsed from `earlier` to `self` (may be negative).
    #[inline]
    pub fn since(self, earlier: Stamp) -> i64 {
        self.0 - earlier.0
    }
}

impl std::ops::Add<Minutes> for Stamp {
    type Output = Stamp;
    #[inline]
    fn add(self, rhs: Minutes) -> Stamp {
        Stamp(self.0 + rhs.0 as i64)
    }
}

impl std::ops::Sub for Stamp {
    type Output = i64;
    #[inline]
    fn sub(self, rhs: Stamp) -> i64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.minute_of_day();
        write!(f, "d{} {:02}:{:02}", self.day(), m / 60, m % 60)
    }
}
