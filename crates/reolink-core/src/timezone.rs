// ── Device timezone ──
//
// A camera reports its zone as a fixed offset (seconds *west* of UTC)
// plus an optional daylight-saving rule expressed as "Nth weekday of
// month at hh:mm:ss" start and end points. The per-year transition points
// are memoized inside the timezone value itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday,
};

use reolink_api::models::DstRule;

use crate::error::CoreError;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// DST start and end for one year as device wall clock.
///
/// `start` is read on the standard-time clock and `end` on the daylight
/// clock, the way the camera's rule states them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DstWindow {
    fn contains(&self, local: NaiveDateTime) -> bool {
        self.spans(local, local)
    }

    /// `standard` is tested against `start`, `daylight` against `end`.
    fn spans(&self, standard: NaiveDateTime, daylight: NaiveDateTime) -> bool {
        if self.start <= self.end {
            self.start <= standard && daylight < self.end
        } else {
            // Southern hemisphere: the window wraps the new year.
            standard >= self.start || daylight < self.end
        }
    }
}

/// Timezone synthesized from a camera's `GetTime` reply.
pub struct DeviceTimezone {
    standard: FixedOffset,
    daylight: FixedOffset,
    rule: Option<DstRule>,
    windows: Mutex<HashMap<i32, Option<DstWindow>>>,
}

impl fmt::Debug for DeviceTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceTimezone")
            .field("standard", &self.standard)
            .field("daylight", &self.rule.as_ref().map(|_| self.daylight))
            .finish()
    }
}

impl DeviceTimezone {
    /// Build from the raw `timeZone` field and optional `Dst` block.
    ///
    /// A rule with `enable == false` is ignored.
    pub fn new(seconds_west: i32, dst: Option<DstRule>) -> Result<Self, CoreError> {
        let standard = FixedOffset::west_opt(seconds_west).ok_or_else(|| invalid_offset(seconds_west))?;
        let rule = dst.filter(|rule| rule.enable);
        let daylight = match &rule {
            Some(rule) => rule
                .offset
                .checked_mul(3600)
                .and_then(|shift| standard.local_minus_utc().checked_add(shift))
                .and_then(FixedOffset::east_opt)
                .ok_or_else(|| invalid_dst_offset(rule.offset))?,
            None => standard,
        };

        Ok(Self {
            standard,
            daylight,
            rule,
            windows: Mutex::new(HashMap::new()),
        })
    }

    /// Offset outside daylight saving time.
    pub fn standard_offset(&self) -> FixedOffset {
        self.standard
    }

    pub fn has_dst(&self) -> bool {
        self.rule.is_some()
    }

    /// DST window for `year`, if the rule yields valid dates.
    pub fn dst_window(&self, year: i32) -> Option<DstWindow> {
        let rule = self.rule.as_ref()?;
        let mut windows = self.windows.lock().expect("timezone lock poisoned");
        *windows
            .entry(year)
            .or_insert_with(|| compute_window(rule, year))
    }

    /// Whether `local` (device wall clock) falls inside DST.
    pub fn is_dst(&self, local: NaiveDateTime) -> bool {
        self.dst_window(local.year())
            .is_some_and(|window| window.contains(local))
    }

    /// Offset in effect at a device wall-clock time.
    pub fn offset_at_local(&self, local: NaiveDateTime) -> FixedOffset {
        if self.is_dst(local) {
            self.daylight
        } else {
            self.standard
        }
    }

    /// Offset in effect at a UTC instant.
    pub fn offset_at_utc(&self, utc: DateTime<Utc>) -> FixedOffset {
        let standard = utc.with_timezone(&self.standard).naive_local();
        let daylight = utc.with_timezone(&self.daylight).naive_local();
        let in_dst = self
            .dst_window(standard.year())
            .is_some_and(|window| window.spans(standard, daylight));
        if in_dst {
            self.daylight
        } else {
            self.standard
        }
    }

    /// Attach the right offset to a device wall-clock reading.
    pub fn localize(&self, local: NaiveDateTime) -> Result<DateTime<FixedOffset>, CoreError> {
        self.offset_at_local(local)
            .from_local_datetime(&local)
            .single()
            .ok_or_else(|| CoreError::InvalidResponse {
                message: format!("camera time {local} is not representable"),
            })
    }
}

fn invalid_offset(seconds_west: i32) -> CoreError {
    CoreError::InvalidResponse {
        message: format!("camera timezone offset {seconds_west}s is out of range"),
    }
}

fn invalid_dst_offset(hours: i32) -> CoreError {
    CoreError::InvalidResponse {
        message: format!("camera DST offset {hours}h is out of range"),
    }
}

fn compute_window(rule: &DstRule, year: i32) -> Option<DstWindow> {
    let start = transition(
        year,
        rule.start_mon,
        rule.start_week,
        rule.start_weekday,
        (rule.start_hour, rule.start_min, rule.start_sec),
    )?;
    let end = transition(
        year,
        rule.end_mon,
        rule.end_week,
        rule.end_weekday,
        (rule.end_hour, rule.end_min, rule.end_sec),
    )?;
    Some(DstWindow { start, end })
}

/// `week` 1-4 picks the Nth occurrence of `weekday`; 5 means the last.
fn transition(
    year: i32,
    month: u32,
    week: u32,
    weekday: u32,
    (hour, min, sec): (u32, u32, u32),
) -> Option<NaiveDateTime> {
    let weekday = *WEEKDAYS.get(usize::try_from(weekday).ok()?)?;
    let date = match week {
        1..=4 => NaiveDate::from_weekday_of_month_opt(year, month, weekday, u8::try_from(week).ok()?)?,
        5 => NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
            .or_else(|| NaiveDate::from_weekday_of_month_opt(year, month, weekday, 4))?,
        _ => return None,
    };
    date.and_hms_opt(hour, min, sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Central European rule: last Sunday of March 02:00 to last Sunday
    /// of October 03:00.
    fn eu_rule() -> DstRule {
        DstRule {
            enable: true,
            offset: 1,
            start_mon: 3,
            start_week: 5,
            start_weekday: 0,
            start_hour: 2,
            end_mon: 10,
            end_week: 5,
            end_weekday: 0,
            end_hour: 3,
            ..DstRule::default()
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn fixed_offset_is_west_of_utc() {
        let tz = DeviceTimezone::new(-3600, None).expect("valid");
        assert_eq!(tz.standard_offset().local_minus_utc(), 3600);
        assert!(!tz.has_dst());
        assert_eq!(tz.offset_at_local(at(2024, 7, 1, 12)), tz.standard_offset());
    }

    #[test]
    fn last_week_resolves_to_last_sunday() {
        let tz = DeviceTimezone::new(-3600, Some(eu_rule())).expect("valid");
        let window = tz.dst_window(2024).expect("window");
        assert_eq!(window.start, at(2024, 3, 31, 2));
        assert_eq!(window.end, at(2024, 10, 27, 3));

        let window = tz.dst_window(2023).expect("window");
        assert_eq!(window.start, at(2023, 3, 26, 2));
        assert_eq!(window.end, at(2023, 10, 29, 3));
    }

    #[test]
    fn offsets_switch_inside_window() {
        let tz = DeviceTimezone::new(-3600, Some(eu_rule())).expect("valid");
        assert!(!tz.is_dst(at(2024, 3, 31, 1)));
        assert!(tz.is_dst(at(2024, 3, 31, 2)));
        assert!(tz.is_dst(at(2024, 7, 1, 12)));
        assert!(!tz.is_dst(at(2024, 12, 1, 12)));

        let summer = tz.localize(at(2024, 7, 1, 12)).expect("localizes");
        assert_eq!(summer.offset().local_minus_utc(), 7200);
        let winter = tz.localize(at(2024, 1, 15, 12)).expect("localizes");
        assert_eq!(winter.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn southern_hemisphere_window_wraps() {
        // Sydney-style: first Sunday of October to first Sunday of April.
        let rule = DstRule {
            enable: true,
            offset: 1,
            start_mon: 10,
            start_week: 1,
            start_weekday: 0,
            start_hour: 2,
            end_mon: 4,
            end_week: 1,
            end_weekday: 0,
            end_hour: 3,
            ..DstRule::default()
        };
        let tz = DeviceTimezone::new(-36000, Some(rule)).expect("valid");
        assert!(tz.is_dst(at(2024, 1, 10, 12)));
        assert!(!tz.is_dst(at(2024, 6, 10, 12)));
        assert!(tz.is_dst(at(2024, 12, 10, 12)));
    }

    #[test]
    fn disabled_rule_is_ignored() {
        let rule = DstRule {
            enable: false,
            ..eu_rule()
        };
        let tz = DeviceTimezone::new(0, Some(rule)).expect("valid");
        assert!(!tz.has_dst());
        assert_eq!(tz.dst_window(2024), None);
    }

    #[test]
    fn invalid_rule_has_no_window() {
        let rule = DstRule {
            start_mon: 13,
            ..eu_rule()
        };
        let tz = DeviceTimezone::new(0, Some(rule)).expect("valid");
        assert_eq!(tz.dst_window(2024), None);
        assert!(!tz.is_dst(at(2024, 7, 1, 0)));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        assert!(DeviceTimezone::new(90_000, None).is_err());
    }

    #[test]
    fn huge_dst_offset_is_rejected() {
        for offset in [1_000_000, i32::MAX, i32::MIN, 30] {
            let rule = DstRule {
                offset,
                ..eu_rule()
            };
            assert!(
                matches!(
                    DeviceTimezone::new(0, Some(rule)),
                    Err(CoreError::InvalidResponse { .. })
                ),
                "offset {offset}"
            );
        }
    }

    #[test]
    fn last_daylight_hour_keeps_summer_offset() {
        let tz = DeviceTimezone::new(-3600, Some(eu_rule())).expect("valid");
        // DST ends 2024-10-27 03:00 CEST, which is 01:00 UTC.
        let before = Utc.with_ymd_and_hms(2024, 10, 27, 0, 30, 0).single().expect("valid");
        let after = Utc.with_ymd_and_hms(2024, 10, 27, 1, 30, 0).single().expect("valid");
        assert_eq!(tz.offset_at_utc(before).local_minus_utc(), 7200);
        assert_eq!(tz.offset_at_utc(after).local_minus_utc(), 3600);

        // DST starts 2024-03-31 02:00 CET, which is 01:00 UTC.
        let before = Utc.with_ymd_and_hms(2024, 3, 31, 0, 59, 0).single().expect("valid");
        let after = Utc.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).single().expect("valid");
        assert_eq!(tz.offset_at_utc(before).local_minus_utc(), 3600);
        assert_eq!(tz.offset_at_utc(after).local_minus_utc(), 7200);
    }

    #[test]
    fn offset_at_utc_uses_standard_wall_clock() {
        let tz = DeviceTimezone::new(-3600, Some(eu_rule())).expect("valid");
        let utc = Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).single().expect("valid");
        assert_eq!(tz.offset_at_utc(utc).local_minus_utc(), 7200);
    }
}
