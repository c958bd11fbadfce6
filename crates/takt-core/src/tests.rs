//! Unit tests for takt-core primitives.

#[cfg(test)]
mod ids {
    use crate::{MachineId, TaskId, WorkerId};

    #[test]
    fn index_roundtrip() {
        let id = TaskId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(TaskId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(TaskId(0) < TaskId(1));
        assert!(WorkerId(100) > WorkerId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(TaskId::INVALID.0, u16::MAX);
        assert_eq!(WorkerId::INVALID.0, u16::MAX);
        assert_eq!(MachineId::INVALID.0, u16::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(TaskId(7).to_string(), "TaskId(7)");
    }
}

#[cfg(test)]
mod time {
    use crate::{Minutes, Stamp};

    #[test]
    fn stamp_components() {
        // Monday 08:00
        let t = Stamp::at(0, 8, 0);
        assert_eq!(t.0, 480);
        assert_eq!(t.day(), 0);
        assert_eq!(t.minute_of_day(), 480);
        assert_eq!(t.weekday(), 0);

        // Saturday of week 2
        let sat = Stamp::at(12, 12, 30);
        assert_eq!(sat.weekday(), 5);
    }

    #[test]
    fn stamp_arithmetic() {
        let t = Stamp::at(0, 8, 0);
        assert_eq!(t + Minutes(90), Stamp::at(0, 9, 30));
        assert_eq!(Stamp::at(1, 0, 0) - Stamp::at(0, 0, 0), 1_440);
        assert_eq!(Stamp::at(0, 9, 0).since(Stamp::at(0, 8, 0)), 60);
    }

    #[test]
    fn display() {
        assert_eq!(Stamp::at(3, 9, 5).to_string(), "d3 09:05");
        assert_eq!(Minutes(45).to_string(), "45min");
    }

    #[test]
    fn minutes_sum() {
        let total: Minutes = [Minutes(10), Minutes(20), Minutes(30)].into_iter().sum();
        assert_eq!(total, Minutes(60));
    }
}

#[cfg(test)]
mod calendar {
    use crate::{Calendar, CalendarSpec, CoreError, Minutes, Stamp};

    /// Mon–Fri 08:00–16:00, no breaks.
    fn standard() -> Calendar {
        Calendar::new().with_shift(8 * 60, 16 * 60)
    }

    /// Mon–Fri 08:00–17:00 with a 12:00–13:00 lunch break.
    fn with_lunch() -> Calendar {
        Calendar::new()
            .with_shift(8 * 60, 17 * 60)
            .with_break(12 * 60, 13 * 60)
    }

    #[test]
    fn validate_standard_ok() {
        standard().validate().unwrap();
        with_lunch().validate().unwrap();
    }

    #[test]
    fn validate_rejects_overlapping_shifts() {
        let cal = Calendar::new()
            .with_shift(8 * 60, 12 * 60)
            .with_shift(11 * 60, 16 * 60);
        assert!(matches!(
            cal.validate(),
            Err(CoreError::CalendarMisconfigured(_))
        ));
    }

    #[test]
    fn validate_rejects_escaping_break() {
        let cal = Calendar::new()
            .with_shift(8 * 60, 16 * 60)
            .with_break(15 * 60, 17 * 60);
        assert!(matches!(
            cal.validate(),
            Err(CoreError::CalendarMisconfigured(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_weekday_set() {
        let cal = Calendar::new()
            .with_workdays([false; 7])
            .with_shift(8 * 60, 16 * 60);
        assert!(matches!(
            cal.validate(),
            Err(CoreError::CalendarMisconfigured(_))
        ));
    }

    #[test]
    fn is_working_respects_all_layers() {
        let cal = with_lunch();
        assert!(cal.is_working(Stamp::at(0, 9, 0)));
        assert!(!cal.is_working(Stamp::at(0, 7, 59))); // before shift
        assert!(!cal.is_working(Stamp::at(0, 12, 30))); // break
        assert!(!cal.is_working(Stamp::at(5, 9, 0))); // Saturday
        let holiday = with_lunch().with_holiday(2);
        assert!(!holiday.is_working(Stamp::at(2, 9, 0)));
    }

    #[test]
    fn next_working_instant_idempotent() {
        let cal = standard();
        let t = Stamp::at(0, 9, 0);
        assert_eq!(cal.next_working_instant(t).unwrap(), t);
    }

    #[test]
    fn next_working_instant_clamps_to_shift_start() {
        let cal = standard();
        assert_eq!(
            cal.next_working_instant(Stamp::at(0, 6, 0)).unwrap(),
            Stamp::at(0, 8, 0)
        );
    }

    #[test]
    fn next_working_instant_skips_weekend() {
        let cal = standard();
        // Friday 16:30 → Monday 08:00
        assert_eq!(
            cal.next_working_instant(Stamp::at(4, 16, 30)).unwrap(),
            Stamp::at(7, 8, 0)
        );
    }

    #[test]
    fn next_working_instant_skips_break() {
        let cal = with_lunch();
        assert_eq!(
            cal.next_working_instant(Stamp::at(0, 12, 15)).unwrap(),
            Stamp::at(0, 13, 0)
        );
    }

    #[test]
    fn next_working_instant_skips_holiday() {
        let cal = standard().with_holiday(1);
        // Tuesday is a holiday → Wednesday 08:00
        assert_eq!(
            cal.next_working_instant(Stamp::at(1, 9, 0)).unwrap(),
            Stamp::at(2, 8, 0)
        );
    }

    #[test]
    fn horizon_exceeded_when_no_working_time() {
        // Working weekday set exists but every day in the horizon is a holiday.
        let mut cal = standard().with_horizon_days(5);
        for day in 0..10 {
            cal = cal.with_holiday(day);
        }
        assert!(matches!(
            cal.next_working_instant(Stamp::at(0, 8, 0)),
            Err(CoreError::HorizonExceeded { .. })
        ));
    }

    #[test]
    fn advance_within_one_segment() {
        let cal = standard();
        let (s, e) = cal.advance(Stamp::at(0, 8, 0), Minutes(90)).unwrap();
        assert_eq!(s, Stamp::at(0, 8, 0));
        assert_eq!(e, Stamp::at(0, 9, 30));
    }

    #[test]
    fn advance_zero_duration_lands_on_start() {
        let cal = standard();
        let (s, e) = cal.advance(Stamp::at(0, 6, 0), Minutes::ZERO).unwrap();
        assert_eq!(s, Stamp::at(0, 8, 0));
        assert_eq!(e, s);
    }

    #[test]
    fn advance_pauses_over_break() {
        let cal = with_lunch();
        // 60 min starting 11:30: 30 before lunch + 30 after → ends 13:30.
        let (s, e) = cal.advance(Stamp::at(0, 11, 30), Minutes(60)).unwrap();
        assert_eq!(s, Stamp::at(0, 11, 30));
        assert_eq!(e, Stamp::at(0, 13, 30));
    }

    #[test]
    fn advance_crosses_shift_boundary() {
        // 600 min from Monday 08:00 at 480 min/day: 480 Monday + 120 Tuesday.
        let cal = standard();
        let (s, e) = cal.advance(Stamp::at(0, 8, 0), Minutes(600)).unwrap();
        assert_eq!(s, Stamp::at(0, 8, 0));
        assert_eq!(e, Stamp::at(1, 10, 0));
    }

    #[test]
    fn advance_crosses_weekend() {
        // Friday 15:00 + 120 min → 60 Friday + 60 Monday.
        let cal = standard();
        let (_, e) = cal.advance(Stamp::at(4, 15, 0), Minutes(120)).unwrap();
        assert_eq!(e, Stamp::at(7, 9, 0));
    }

    #[test]
    fn working_minutes_between_inverts_advance() {
        let cal = with_lunch();
        let start = Stamp::at(0, 11, 30);
        let (s, e) = cal.advance(start, Minutes(200)).unwrap();
        assert_eq!(cal.working_minutes_between(s, e), 200);
    }

    #[test]
    fn working_minutes_between_excludes_nonwork() {
        let cal = standard();
        // Full Monday (480) plus nothing of the weekend.
        assert_eq!(
            cal.working_minutes_between(Stamp::at(0, 0, 0), Stamp::at(5, 0, 0)),
            5 * 480
        );
        assert_eq!(
            cal.working_minutes_between(Stamp::at(5, 0, 0), Stamp::at(7, 0, 0)),
            0
        );
    }

    #[test]
    fn calendar_spec_roundtrips_and_builds() {
        let spec = CalendarSpec {
            workdays: vec![0, 1, 2, 3, 4],
            shifts: vec![("08:00".into(), "16:00".into())],
            breaks: vec![],
            holidays: vec![3],
            horizon_days: None,
        };
        let cal = spec.build().unwrap();
        assert!(cal.is_working(Stamp::at(0, 8, 0)));
        assert!(!cal.is_working(Stamp::at(3, 8, 0))); // holiday

        let json = serde_json::to_string(&spec).unwrap();
        let back: CalendarSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn calendar_spec_rejects_bad_time() {
        let spec = CalendarSpec {
            workdays: vec![0],
            shifts: vec![("8am".into(), "16:00".into())],
            breaks: vec![],
            holidays: vec![],
            horizon_days: None,
        };
        assert!(matches!(spec.build(), Err(CoreError::InvalidTimeOfDay(_))));
    }
}
