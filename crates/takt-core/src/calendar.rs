//! Working-time calendar: shifts, breaks, weekends, holidays.
//!
//! # Model
//!
//! A `Calendar` carries a weekday set, a daily template of shift windows,
//! break windows subtracted from those shifts, and a holiday day-set.  An
//! instant is *working* iff its day is a workday and not a holiday, its
//! minute-of-day falls inside a shift, and outside every break.
//!
//! All queries are pure.  Walks are bounded by `horizon_days`; exceeding it
//! yields [`CoreError::HorizonExceeded`] instead of looping forever on a
//! calendar with no future working time.

use std::collections::BTreeSet;

use crate::{CoreError, CoreResult, Minutes, Stamp, MINUTES_PER_DAY};

// ── ShiftWindow ──────────────────────────────────────────────────────────────

/// A half-open minute-of-day interval `[start, end)` within one day.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ShiftWindow {
    /// First working minute of the window (inclusive).
    pub start_min: u32,
    /// End of the window (exclusive).  At most `1440`.
    pub end_min: u32,
}

impl ShiftWindow {
    pub fn new(start_min: u32, end_min: u32) -> Self {
        Self { start_min, end_min }
    }

    #[inline]
    pub fn contains(&self, minute: u32) -> bool {
        minute >= self.start_min && minute < self.end_min
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.end_min.saturating_sub(self.start_min)
    }

    pub fn is_empty(&self) -> bool {
        self.end_min <= self.start_min
    }

    pub fn overlaps(&self, other: &ShiftWindow) -> bool {
        self.start_min < other.end_min && other.start_min < self.end_min
    }
}

// ── Calendar ─────────────────────────────────────────────────────────────────

/// Working-day template plus holiday exceptions.
///
/// Construct with the `with_*` builder methods, then call [`validate`]
/// once before use — the walk routines assume a validated configuration.
///
/// [`validate`]: Calendar::validate
#[derive(Clone, Debug)]
pub struct Calendar {
    /// `workdays[weekday]` — `0 = Monday`.  Default: Monday through Friday.
    workdays: [bool; 7],
    /// Daily shift windows, sorted by start minute.
    shifts: Vec<ShiftWindow>,
    /// Break windows subtracted from the shifts, sorted by start minute.
    breaks: Vec<ShiftWindow>,
    /// Non-working day indices (overrides `workdays`).
    holidays: BTreeSet<i64>,
    /// Maximum days any forward walk may cross before giving up.
    horizon_days: i64,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            workdays: [true, true, true, true, true, false, false],
            shifts: Vec::new(),
            breaks: Vec::new(),
            holidays: BTreeSet::new(),
            horizon_days: 3_650,
        }
    }
}

impl Calendar {
    /// A Monday–Friday calendar with no shifts yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a daily shift window (minute-of-day bounds).
    pub fn with_shift(mut self, start_min: u32, end_min: u32) -> Self {
        self.shifts.push(ShiftWindow::new(start_min, end_min));
        self.shifts.sort_unstable_by_key(|w| w.start_min);
        self
    }

    /// Add a break window subtracted from the shifts.
    pub fn with_break(mut self, start_min: u32, end_min: u32) -> Self {
        self.breaks.push(ShiftWindow::new(start_min, end_min));
        self.breaks.sort_unstable_by_key(|w| w.start_min);
        self
    }

    /// Mark a day index as a holiday.
    pub fn with_holiday(mut self, day: i64) -> Self {
        self.holidays.insert(day);
        self
    }

    /// Replace the weekday set (`0 = Monday`).
    pub fn with_workdays(mut self, workdays: [bool; 7]) -> Self {
        self.workdays = workdays;
        self
    }

    /// Override the forward-walk horizon.
    pub fn with_horizon_days(mut self, days: i64) -> Self {
        self.horizon_days = days;
        self
    }

    pub fn horizon_days(&self) -> i64 {
        self.horizon_days
    }

    // ── Validation ────────────────────────────────────────────────────────

    /// Check the configuration for self-contradictions.
    ///
    /// Rejects: no shifts, an empty or day-overflowing shift, overlapping
    /// shifts, a break that escapes every shift, or an empty weekday set.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.workdays.iter().any(|&d| d) {
            return Err(CoreError::CalendarMisconfigured(
                "weekday set is empty".into(),
            ));
        }
        if self.shifts.is_empty() {
            return Err(CoreError::CalendarMisconfigured(
                "no shift windows defined".into(),
            ));
        }
        for s in &self.shifts {
            if s.is_empty() || s.end_min > MINUTES_PER_DAY as u32 {
                return Err(CoreError::CalendarMisconfigured(format!(
                    "shift {}..{} is empty or exceeds the day",
                    s.start_min, s.end_min
                )));
            }
        }
        for pair in self.shifts.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(CoreError::CalendarMisconfigured(format!(
                    "shifts {}..{} and {}..{} overlap",
                    pair[0].start_min, pair[0].end_min, pair[1].start_min, pair[1].end_min
                )));
            }
        }
        for b in &self.breaks {
            if b.is_empty() {
                return Err(CoreError::CalendarMisconfigured(format!(
                    "break {}..{} is empty",
                    b.start_min, b.end_min
                )));
            }
            let inside_some_shift = self
                .shifts
                .iter()
                .any(|s| b.start_min >= s.start_min && b.end_min <= s.end_min);
            if !inside_some_shift {
                return Err(CoreError::CalendarMisconfigured(format!(
                    "break {}..{} escapes every shift",
                    b.start_min, b.end_min
                )));
            }
        }
        Ok(())
    }

    // ── Point queries ─────────────────────────────────────────────────────

    /// Whether `day` is a working day (weekday set minus holidays).
    #[inline]
    pub fn is_workday(&self, day: i64) -> bool {
        self.workdays[day.rem_euclid(7) as usize] && !self.holidays.contains(&day)
    }

    /// Whether `t` is a working instant.
    pub fn is_working(&self, t: Stamp) -> bool {
        if !self.is_workday(t.day()) {
            return false;
        }
        let m = t.minute_of_day();
        self.shifts.iter().any(|s| s.contains(m)) && !self.breaks.iter().any(|b| b.contains(m))
    }

    // ── Walks ─────────────────────────────────────────────────────────────

    /// The smallest working instant `≥ t`.
    ///
    /// Idempotent: if `t` is already working, returns `t`.
    pub fn next_working_instant(&self, t: Stamp) -> CoreResult<Stamp> {
        let mut day = t.day();
        let mut minute = t.minute_of_day();
        let limit = t.day() + self.horizon_days;

        while day <= limit {
            if self.is_workday(day) {
                if let Some(m) = self.first_working_minute_at_or_after(minute) {
                    return Ok(Stamp::at_minute(day, m));
                }
            }
            day += 1;
            minute = 0;
        }
        Err(CoreError::HorizonExceeded {
            from: t,
            horizon_days: self.horizon_days,
        })
    }

    /// Smallest interval `[s, e]` with `s ≥ t` covering exactly `d` working
    /// minutes.
    ///
    /// Walks forward shift segment by shift segment, skipping breaks, nights,
    /// weekends, and holidays (jumping to the following working day's first
    /// shift when one is crossed).
    pub fn advance(&self, t: Stamp, d: Minutes) -> CoreResult<(Stamp, Stamp)> {
        let start = self.next_working_instant(t)?;
        if d.is_zero() {
            return Ok((start, start));
        }

        let mut remaining = d.0 as i64;
        let mut cur = start;
        loop {
            let seg_end = self.segment_end(cur);
            let avail = seg_end - cur;
            if avail >= remaining {
                return Ok((start, Stamp(cur.0 + remaining)));
            }
            remaining -= avail;
            cur = self.next_working_instant(seg_end)?;
        }
    }

    /// Working minutes contained in `[a, b)` — the inverse of [`advance`].
    ///
    /// [`advance`]: Calendar::advance
    pub fn working_minutes_between(&self, a: Stamp, b: Stamp) -> u64 {
        if b <= a {
            return 0;
        }
        let mut cur = match self.next_working_instant(a) {
            Ok(s) => s,
            Err(_) => return 0,
        };
        let mut total: u64 = 0;
        while cur < b {
            let seg_end = self.segment_end(cur);
            let end = seg_end.min(b);
            total += (end - cur) as u64;
            if seg_end >= b {
                break;
            }
            cur = match self.next_working_instant(seg_end) {
                Ok(s) => s,
                Err(_) => break,
            };
        }
        total
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// First working minute-of-day `≥ minute` on a workday, or `None` if the
    /// rest of the day has none.
    fn first_working_minute_at_or_after(&self, minute: u32) -> Option<u32> {
        for shift in &self.shifts {
            if minute >= shift.end_min {
                continue;
            }
            let mut cand = minute.max(shift.start_min);
            // Skipping one break can land inside the next; loop until clear.
            while let Some(b) = self.breaks.iter().find(|b| b.contains(cand)) {
                cand = b.end_min;
            }
            if cand < shift.end_min {
                return Some(cand);
            }
        }
        None
    }

    /// End of the uninterrupted working segment containing the working
    /// instant `cur` (next break start or shift end, whichever comes first).
    fn segment_end(&self, cur: Stamp) -> Stamp {
        let m = cur.minute_of_day();
        let shift = self
            .shifts
            .iter()
            .find(|s| s.contains(m))
            .expect("segment_end called on a non-working instant");
        let mut end = shift.end_min;
        for b in &self.breaks {
            if b.start_min > m && b.start_min < end {
                end = b.start_min;
            }
        }
        Stamp::at_minute(cur.day(), end)
    }
}

// ── CalendarSpec ─────────────────────────────────────────────────────────────

/// Serialisable calendar definition with `"HH:MM"` interval bounds.
///
/// This is the external-interface form; [`CalendarSpec::build`] converts it
/// into a validated [`Calendar`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CalendarSpec {
    /// Weekday indices that are working days, `0 = Monday`.
    pub workdays: Vec<u8>,
    /// Shift windows as `("HH:MM", "HH:MM")` pairs.
    pub shifts: Vec<(String, String)>,
    /// Break windows as `("HH:MM", "HH:MM")` pairs.
    #[serde(default)]
    pub breaks: Vec<(String, String)>,
    /// Holiday day indices relative to the scheduling epoch.
    #[serde(default)]
    pub holidays: Vec<i64>,
    /// Optional horizon override in days.
    #[serde(default)]
    pub horizon_days: Option<i64>,
}

impl CalendarSpec {
    /// Parse and validate into a [`Calendar`].
    pub fn build(&self) -> CoreResult<Calendar> {
        let mut workdays = [false; 7];
        for &d in &self.workdays {
            if d >= 7 {
                return Err(CoreError::CalendarMisconfigured(format!(
                    "weekday index {d} out of range"
                )));
            }
            workdays[d as usize] = true;
        }

        let mut cal = Calendar::new().with_workdays(workdays);
        if let Some(h) = self.horizon_days {
            cal = cal.with_horizon_days(h);
        }
        for (start, end) in &self.shifts {
            cal = cal.with_shift(parse_hhmm(start)?, parse_hhmm(end)?);
        }
        for (start, end) in &self.breaks {
            cal = cal.with_break(parse_hhmm(start)?, parse_hhmm(end)?);
        }
        for &day in &self.holidays {
            cal = cal.with_holiday(day);
        }
        cal.validate()?;
        Ok(cal)
    }
}

/// Parse `"HH:MM"` into a minute-of-day.
fn parse_hhmm(s: &str) -> CoreResult<u32> {
    let bad = || CoreError::InvalidTimeOfDay(s.to_string());
    let (h, m) = s.split_once(':').ok_or_else(bad)?;
    let h: u32 = h.parse().map_err(|_| bad())?;
    let m: u32 = m.parse().map_err(|_| bad())?;
    if h > 24 || m > 59 || h * 60 + m > MINUTES_PER_DAY as u32 {
        return Err(bad());
    }
    Ok(h * 60 + m)
}
