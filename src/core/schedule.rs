//! Opening-hours evaluation.
//!
//! A branch's weekly schedule is a list of [`ScheduleBlock`]s. The `days` field is a
//! small language: comma separated tokens, each a three-letter day (`Mon`..`Sun`) or a
//! `Start-End` range. A range whose start comes after its end wraps over the weekend
//! (`Fri-Mon` is Fri, Sat, Sun, Mon). Everything here is pure: callers pass "now".

use crate::entities::ScheduleBlock;
use crate::errors::{Error, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::str::FromStr;

/// Day abbreviations in index order, Monday = 0.
pub const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Text shown for branches that never close.
pub const ALWAYS_OPEN_TEXT: &str = "Open 24/7";

/// Text shown for a branch that is not open right now.
pub const CLOSED_TEXT: &str = "Closed";

/// Default spacing of bookable appointment times, in minutes.
pub const DEFAULT_SLOT_INTERVAL_MINUTES: u32 = 30;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A set of weekdays, one bit per day with Monday as bit 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DaySet(u8);

impl DaySet {
    /// No days at all.
    pub const EMPTY: Self = Self(0);
    /// Every day of the week.
    pub const ALL: Self = Self(0b0111_1111);

    /// Parses a day spec, skipping tokens that are not understood.
    ///
    /// This is the read-side parser: stored schedules never make evaluation fail.
    #[must_use]
    pub fn parse_lenient(spec: &str) -> Self {
        tokens(spec)
            .filter_map(parse_token)
            .fold(Self::EMPTY, Self::union)
    }

    /// Whether the day with the given index (Monday = 0) is in the set.
    #[must_use]
    pub const fn contains(self, day_index: u32) -> bool {
        day_index < 7 && self.0 & (1 << day_index) != 0
    }

    /// Whether no day is in the set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Days in either set.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    fn single(day_index: u32) -> Self {
        Self(1 << day_index)
    }

    fn range(start: u32, end: u32) -> Self {
        if start <= end {
            (start..=end).map(Self::single).fold(Self::EMPTY, Self::union)
        } else {
            // wraps over the end of the week
            Self::range(start, 6).union(Self::range(0, end))
        }
    }
}

/// Strict parser used when schedules are written.
impl FromStr for DaySet {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        let mut set = Self::EMPTY;
        let mut seen_token = false;
        for token in tokens(spec) {
            seen_token = true;
            let days = parse_token(token).ok_or_else(|| Error::InvalidSchedule {
                message: format!("unrecognised day token '{token}' in '{spec}'"),
            })?;
            set = set.union(days);
        }
        if !seen_token {
            return Err(Error::InvalidSchedule {
                message: "day spec is empty".to_string(),
            });
        }
        Ok(set)
    }
}

fn tokens(spec: &str) -> impl Iterator<Item = &str> {
    spec.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn day_index(name: &str) -> Option<u32> {
    DAY_NAMES
        .iter()
        .position(|day| *day == name)
        .and_then(|index| u32::try_from(index).ok())
}

fn parse_token(token: &str) -> Option<DaySet> {
    match token.split_once('-') {
        Some((start, end)) => {
            let start = day_index(start.trim())?;
            let end = day_index(end.trim())?;
            Some(DaySet::range(start, end))
        }
        None => day_index(token).map(DaySet::single),
    }
}

/// Whether `day_index` (Monday = 0) falls within the day spec.
#[must_use]
pub fn days_match(spec: &str, day_index: u32) -> bool {
    DaySet::parse_lenient(spec).contains(day_index)
}

/// Parses `HH:MM` (single-digit hours allowed). `24:00` is not a time of day and yields `None`.
#[must_use]
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

fn is_end_of_day(value: &str) -> bool {
    value.trim() == "24:00"
}

fn is_all_day(block: &ScheduleBlock) -> bool {
    matches!(block.open.trim(), "00:00" | "0:00") && matches!(block.close.trim(), "23:59" | "24:00")
}

/// A block running from midnight to midnight means the branch never closes,
/// whatever its `days` say.
#[must_use]
pub fn is_always_open(blocks: &[ScheduleBlock]) -> bool {
    blocks.iter().any(is_all_day)
}

/// Colour class of a branch status badge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StatusClass {
    /// Open with more than an hour to go
    #[serde(rename = "status-open")]
    Open,
    /// Open, closing within the hour
    #[serde(rename = "status-closing")]
    Closing,
    /// Not open right now
    #[serde(rename = "status-closed")]
    Closed,
}

impl StatusClass {
    /// CSS class name, as serialized.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Open => "status-open",
            Self::Closing => "status-closing",
            Self::Closed => "status-closed",
        }
    }
}

/// Live open/closed status of a branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BranchStatus {
    /// `"Open 24/7"`, `"Open until HH:MM"` or `"Closed"`
    pub text: String,
    /// Badge class
    pub class: StatusClass,
}

impl BranchStatus {
    fn always_open() -> Self {
        Self {
            text: ALWAYS_OPEN_TEXT.to_string(),
            class: StatusClass::Open,
        }
    }

    fn closed() -> Self {
        Self {
            text: CLOSED_TEXT.to_string(),
            class: StatusClass::Closed,
        }
    }

    fn open_until(close: NaiveDateTime, class: StatusClass) -> Self {
        Self {
            text: format!("Open until {}", close.format("%H:%M")),
            class,
        }
    }
}

/// Closing time of a block; `24:00` reads as the midnight that ends the day.
fn closing_clock(value: &str) -> Option<NaiveTime> {
    if is_end_of_day(value) {
        Some(NaiveTime::MIN)
    } else {
        parse_clock(value)
    }
}

/// Opening window of `block` anchored to `date`; close moves to the next day when
/// it is not after open.
fn window_on(block: &ScheduleBlock, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let open = date.and_time(parse_clock(&block.open)?);
    let mut close = date.and_time(closing_clock(&block.close)?);
    if close <= open {
        close += Duration::days(1);
    }
    Some((open, close))
}

/// Evaluates the schedule at `now` (deployment-local time).
///
/// The first block whose days include today decides; later blocks for the same day
/// are not consulted. Blocks with missing or unparseable fields are skipped.
/// While open, the class turns to [`StatusClass::Closing`] once less than an hour remains;
/// with exactly one hour left it is still [`StatusClass::Open`].
#[must_use]
pub fn branch_status(blocks: &[ScheduleBlock], now: NaiveDateTime) -> BranchStatus {
    if is_always_open(blocks) {
        return BranchStatus::always_open();
    }

    let today = now.weekday().num_days_from_monday();
    let window = blocks
        .iter()
        .filter(|block| days_match(&block.days, today))
        .find_map(|block| window_on(block, now.date()));

    let Some((open, close)) = window else {
        return BranchStatus::closed();
    };

    if now < open || now >= close {
        return BranchStatus::closed();
    }

    let class = if close - now < Duration::hours(1) {
        StatusClass::Closing
    } else {
        StatusClass::Open
    };
    BranchStatus::open_until(close, class)
}

/// Short "Open until HH:MM" line for today irrespective of the current time,
/// `"Open 24/7"` for always-open branches, `None` when today has no hours.
#[must_use]
pub fn open_until_display(blocks: &[ScheduleBlock], now: NaiveDateTime) -> Option<String> {
    if is_always_open(blocks) {
        return Some(ALWAYS_OPEN_TEXT.to_string());
    }
    let today = now.weekday().num_days_from_monday();
    blocks
        .iter()
        .find(|block| days_match(&block.days, today) && !block.close.trim().is_empty())
        .map(|block| format!("Open until {}", block.close.trim()))
}

/// One row of a branch's opening-hours table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HoursLine {
    /// Day spec as written
    pub days: String,
    /// Opening time
    pub open: String,
    /// Closing time
    pub close: String,
    /// Today falls in `days`
    pub is_current: bool,
}

/// Rows for displaying the schedule; blocks without both times are left out.
#[must_use]
pub fn hours_display(blocks: &[ScheduleBlock], now: NaiveDateTime) -> Vec<HoursLine> {
    let today = now.weekday().num_days_from_monday();
    blocks
        .iter()
        .filter(|block| !block.open.trim().is_empty() && !block.close.trim().is_empty())
        .map(|block| HoursLine {
            days: block.days.clone(),
            open: block.open.clone(),
            close: block.close.clone(),
            is_current: days_match(&block.days, today),
        })
        .collect()
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Bookable times on `date`, every `interval_minutes` from each matching block's
/// opening up to (not including) its close.
///
/// Always-open branches offer the whole day. Overnight blocks continue past midnight
/// and those times wrap to the early morning. Dates before `now` yield nothing, and on
/// `now`'s own date only times after `now` are offered.
#[must_use]
pub fn booking_slots(
    blocks: &[ScheduleBlock],
    date: NaiveDate,
    interval_minutes: u32,
    now: NaiveDateTime,
) -> Vec<NaiveTime> {
    if interval_minutes == 0 || date < now.date() {
        return Vec::new();
    }

    let day = date.weekday().num_days_from_monday();
    let spans: Vec<(u32, u32)> = if is_always_open(blocks) {
        vec![(0, MINUTES_PER_DAY - 1)]
    } else {
        blocks
            .iter()
            .filter(|block| days_match(&block.days, day))
            .filter_map(|block| {
                let start = minutes_of(parse_clock(&block.open)?);
                let end = minutes_of(closing_clock(&block.close)?);
                Some((start, end))
            })
            .collect()
    };

    let mut slots: Vec<NaiveTime> = spans
        .into_iter()
        .flat_map(|(start, end)| {
            let end = if end <= start { end + MINUTES_PER_DAY } else { end };
            (start..end).step_by(interval_minutes as usize)
        })
        .filter_map(|minute| {
            let minute = minute % MINUTES_PER_DAY;
            NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
        })
        .filter(|slot| date > now.date() || *slot > now.time())
        .collect();
    slots.sort_unstable();
    slots.dedup();
    slots
}

/// Checks a schedule before it is stored.
///
/// Every block needs a day spec made only of known days and ranges, an `HH:MM`
/// opening time and an `HH:MM` (or `24:00`) closing time.
pub fn validate_opening_hours(blocks: &[ScheduleBlock]) -> Result<()> {
    for (position, block) in blocks.iter().enumerate() {
        let entry = position + 1;
        block.days.parse::<DaySet>().map_err(|e| Error::InvalidSchedule {
            message: format!("block {entry}: {e}"),
        })?;
        if parse_clock(&block.open).is_none() {
            return Err(Error::InvalidSchedule {
                message: format!("block {entry}: opening time '{}' is not HH:MM", block.open),
            });
        }
        if parse_clock(&block.close).is_none() && !is_end_of_day(&block.close) {
            return Err(Error::InvalidSchedule {
                message: format!("block {entry}: closing time '{}' is not HH:MM", block.close),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    // 2024-01-01 is a Monday.
    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn weekdays_nine_to_five() -> Vec<ScheduleBlock> {
        vec![ScheduleBlock::new("Mon-Fri", "09:00", "17:00")]
    }

    #[test]
    fn test_days_match_single_list_and_range() {
        assert!(days_match("Mon", 0));
        assert!(!days_match("Mon", 1));
        assert!(days_match("Mon, Wed ,Fri", 2));
        assert!(!days_match("Mon,Wed,Fri", 3));
        assert!(days_match("Mon-Fri", 4));
        assert!(!days_match("Mon-Fri", 5));
        assert!(days_match("Sat-Sun", 6));
    }

    #[test]
    fn test_days_match_wraparound_range() {
        let matched: Vec<u32> = (0..7).filter(|day| days_match("Fri-Mon", *day)).collect();
        assert_eq!(matched, vec![0, 4, 5, 6]);
        // Sun-Mon is two days, not the whole week
        let matched: Vec<u32> = (0..7).filter(|day| days_match("Sun-Mon", *day)).collect();
        assert_eq!(matched, vec![0, 6]);
    }

    #[test]
    fn test_lenient_parse_skips_unknown_tokens() {
        assert_eq!(DaySet::parse_lenient("Funday, Mon"), DaySet::single(0));
        assert!(DaySet::parse_lenient("Mon-Someday").is_empty());
        assert!(DaySet::parse_lenient("").is_empty());
        assert!(!days_match("mon", 0));
    }

    #[test]
    fn test_strict_parse() {
        assert_eq!("Mon-Sun".parse::<DaySet>().unwrap(), DaySet::ALL);
        assert_eq!(
            "Sat,Sun,".parse::<DaySet>().unwrap(),
            DaySet::range(5, 6)
        );
        assert!(matches!(
            "".parse::<DaySet>(),
            Err(Error::InvalidSchedule { .. })
        ));
        assert!(matches!(
            "Mon-".parse::<DaySet>(),
            Err(Error::InvalidSchedule { .. })
        ));
        assert!(matches!(
            "Mon,Holiday".parse::<DaySet>(),
            Err(Error::InvalidSchedule { .. })
        ));
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("09:30"), Some(time(9, 30)));
        assert_eq!(parse_clock("0:00"), Some(time(0, 0)));
        assert_eq!(parse_clock(" 7:05 "), Some(time(7, 5)));
        assert_eq!(parse_clock("24:00"), None);
        assert_eq!(parse_clock("9am"), None);
        assert_eq!(parse_clock(""), None);
    }

    #[test]
    fn test_always_open_ignores_days_and_time() {
        for close in ["23:59", "24:00"] {
            for open in ["00:00", "0:00"] {
                let blocks = vec![ScheduleBlock::new("Sun-Mon", open, close)];
                for now in [at(3, 3, 0), at(6, 23, 59), at(1, 12, 0)] {
                    let status = branch_status(&blocks, now);
                    assert_eq!(status.text, "Open 24/7");
                    assert_eq!(status.class, StatusClass::Open);
                }
            }
        }
    }

    #[test]
    fn test_always_open_block_anywhere_in_list_wins() {
        let blocks = vec![
            ScheduleBlock::new("Mon", "09:00", "10:00"),
            ScheduleBlock::new("Tue", "00:00", "24:00"),
        ];
        assert_eq!(branch_status(&blocks, at(1, 20, 0)).text, "Open 24/7");
    }

    #[test]
    fn test_weekday_hours_open_closing_closed() {
        let blocks = weekdays_nine_to_five();

        let status = branch_status(&blocks, at(1, 16, 0));
        assert_eq!(status.class, StatusClass::Open);
        assert_eq!(status.text, "Open until 17:00");

        let status = branch_status(&blocks, at(1, 16, 30));
        assert_eq!(status.class, StatusClass::Closing);
        assert_eq!(status.text, "Open until 17:00");

        assert_eq!(branch_status(&blocks, at(1, 17, 0)).class, StatusClass::Closed);
        assert_eq!(branch_status(&blocks, at(1, 17, 0)).text, "Closed");
        assert_eq!(branch_status(&blocks, at(1, 23, 0)).class, StatusClass::Closed);
        assert_eq!(branch_status(&blocks, at(1, 8, 59)).class, StatusClass::Closed);
        assert_eq!(branch_status(&blocks, at(1, 9, 0)).class, StatusClass::Open);
        // Saturday
        assert_eq!(branch_status(&blocks, at(6, 12, 0)).class, StatusClass::Closed);
    }

    #[test]
    fn test_wraparound_days_with_overnight_span() {
        let blocks = vec![ScheduleBlock::new("Fri-Mon", "22:00", "06:00")];

        let status = branch_status(&blocks, at(6, 23, 0));
        assert_eq!(status.text, "Open until 06:00");
        assert_eq!(status.class, StatusClass::Open);

        // Saturday 21:00 is before the evening opening
        assert_eq!(branch_status(&blocks, at(6, 21, 0)).class, StatusClass::Closed);
        // Wednesday is outside Fri-Mon
        assert_eq!(branch_status(&blocks, at(3, 23, 0)).class, StatusClass::Closed);
    }

    #[test]
    fn test_overnight_window_is_anchored_to_today() {
        // Early morning belongs to today's 22:00 opening, which has not started yet.
        let blocks = vec![ScheduleBlock::new("Mon-Sun", "22:00", "06:00")];
        assert_eq!(branch_status(&blocks, at(2, 1, 0)).class, StatusClass::Closed);
        assert_eq!(branch_status(&blocks, at(2, 22, 0)).class, StatusClass::Open);
    }

    #[test]
    fn test_close_at_midnight_end_of_day() {
        // Friday 2024-01-05
        let blocks = vec![ScheduleBlock::new("Fri", "18:00", "24:00")];
        validate_opening_hours(&blocks).unwrap();

        let status = branch_status(&blocks, at(5, 20, 0));
        assert_eq!(status.class, StatusClass::Open);
        assert_eq!(status.text, "Open until 00:00");
        assert_eq!(branch_status(&blocks, at(5, 23, 30)).class, StatusClass::Closing);
        assert_eq!(branch_status(&blocks, at(5, 17, 59)).class, StatusClass::Closed);
        // The window ends at midnight and does not carry into Saturday.
        assert_eq!(branch_status(&blocks, at(6, 0, 30)).class, StatusClass::Closed);

        let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let slots = booking_slots(&blocks, friday, 60, at(5, 20, 0));
        assert_eq!(slots, vec![time(21, 0), time(22, 0), time(23, 0)]);
    }

    #[test]
    fn test_first_matching_block_wins() {
        let blocks = vec![
            ScheduleBlock::new("Mon-Fri", "09:00", "12:00"),
            ScheduleBlock::new("Mon", "13:00", "18:00"),
        ];
        // The second block would be open, but only the first Monday block counts.
        assert_eq!(branch_status(&blocks, at(1, 14, 0)).class, StatusClass::Closed);
        assert_eq!(branch_status(&blocks, at(1, 10, 0)).text, "Open until 12:00");
    }

    #[test]
    fn test_malformed_blocks_are_skipped() {
        let blocks = vec![
            ScheduleBlock::new("Mon", "", "17:00"),
            ScheduleBlock::new("Mon", "nine", "17:00"),
            ScheduleBlock::new("", "09:00", "17:00"),
            ScheduleBlock::new("Mon", "10:00", "20:00"),
        ];
        assert_eq!(branch_status(&blocks, at(1, 12, 0)).text, "Open until 20:00");
        assert_eq!(branch_status(&[], at(1, 12, 0)).class, StatusClass::Closed);
    }

    #[test]
    fn test_status_serializes_with_css_class() {
        let json = serde_json::to_value(branch_status(&weekdays_nine_to_five(), at(1, 16, 30)))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "Open until 17:00", "class": "status-closing"})
        );
        assert_eq!(StatusClass::Closed.css_class(), "status-closed");
    }

    #[test]
    fn test_open_until_display() {
        let blocks = vec![
            ScheduleBlock::new("Mon-Fri", "08:00", "19:00"),
            ScheduleBlock::new("Sat", "09:00", "17:00"),
        ];
        assert_eq!(
            open_until_display(&blocks, at(6, 20, 0)).as_deref(),
            Some("Open until 17:00")
        );
        assert_eq!(open_until_display(&blocks, at(7, 10, 0)), None);
        let always = vec![ScheduleBlock::new("Mon-Sun", "00:00", "23:59")];
        assert_eq!(open_until_display(&always, at(7, 10, 0)).as_deref(), Some("Open 24/7"));
    }

    #[test]
    fn test_hours_display_flags_today() {
        let blocks = vec![
            ScheduleBlock::new("Mon-Fri", "08:00", "19:00"),
            ScheduleBlock::new("Sat", "09:00", "17:00"),
            ScheduleBlock::new("Sun", "", ""),
        ];
        let lines = hours_display(&blocks, at(6, 8, 0));
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].is_current);
        assert!(lines[1].is_current);
    }

    #[test]
    fn test_booking_slots_for_regular_day() {
        let blocks = vec![ScheduleBlock::new("Sat", "09:00", "11:00")];
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let slots = booking_slots(&blocks, saturday, 30, at(1, 0, 0));
        assert_eq!(slots, vec![time(9, 0), time(9, 30), time(10, 0), time(10, 30)]);

        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert!(booking_slots(&blocks, sunday, 30, at(1, 0, 0)).is_empty());
    }

    #[test]
    fn test_booking_slots_skip_past_times() {
        let blocks = weekdays_nine_to_five();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let slots = booking_slots(&blocks, monday, 60, at(1, 14, 0));
        assert_eq!(slots, vec![time(15, 0), time(16, 0)]);
        // Yesterday has nothing to offer
        assert!(booking_slots(&blocks, monday, 60, at(2, 8, 0)).is_empty());
    }

    #[test]
    fn test_booking_slots_always_open_and_overnight() {
        let always = vec![ScheduleBlock::new("Mon", "00:00", "24:00")];
        let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let slots = booking_slots(&always, friday, 30, at(1, 0, 0));
        assert_eq!(slots.len(), 48);
        assert_eq!(slots.first(), Some(&time(0, 0)));
        assert_eq!(slots.last(), Some(&time(23, 30)));

        let overnight = vec![ScheduleBlock::new("Fri", "22:00", "01:00")];
        let slots = booking_slots(&overnight, friday, 60, at(1, 0, 0));
        assert_eq!(slots, vec![time(0, 0), time(22, 0), time(23, 0)]);

        assert!(booking_slots(&overnight, friday, 0, at(1, 0, 0)).is_empty());
    }

    #[test]
    fn test_validate_opening_hours() {
        assert!(validate_opening_hours(&[]).is_ok());
        assert!(
            validate_opening_hours(&[
                ScheduleBlock::new("Mon-Fri", "09:00", "17:00"),
                ScheduleBlock::new("Fri-Mon", "22:00", "06:00"),
                ScheduleBlock::new("Sun-Mon", "00:00", "24:00"),
            ])
            .is_ok()
        );

        for bad in [
            ScheduleBlock::new("Weekdays", "09:00", "17:00"),
            ScheduleBlock::new("Mon", "", "17:00"),
            ScheduleBlock::new("Mon", "09:00", "5pm"),
            ScheduleBlock::new("Mon", "24:00", "17:00"),
        ] {
            assert!(matches!(
                validate_opening_hours(&[bad]),
                Err(Error::InvalidSchedule { .. })
            ));
        }
    }
}
