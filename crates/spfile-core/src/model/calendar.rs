//! Working-time calendars.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Day of the week, Sunday first as in the file's weekday ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Day {
    /// Sunday
    Sunday,
    /// Monday
    Monday,
    /// Tuesday
    Tuesday,
    /// Wednesday
    Wednesday,
    /// Thursday
    Thursday,
    /// Friday
    Friday,
    /// Saturday
    Saturday,
}

impl Day {
    /// All days, Sunday first
    pub const ALL: [Day; 7] = [
        Day::Sunday,
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl From<Weekday> for Day {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Sun => Day::Sunday,
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
        }
    }
}

/// A span of working time within one day.
///
/// An end at or before the start (normally `00:00`) runs to midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start of the working period
    pub start: NaiveTime,
    /// End of the working period
    pub end: NaiveTime,
}

impl TimeRange {
    /// Creates a new time range
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Start and end of this range on the given date
    fn on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_time(self.start);
        let end = if self.end <= self.start {
            date.and_time(NaiveTime::MIN) + ChronoDuration::days(1)
        } else {
            date.and_time(self.end)
        };
        (start, end)
    }
}

/// Working time for a range of dates that overrides the weekly pattern.
///
/// An exception with no ranges is a non-working period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarException {
    /// First date covered
    pub from: NaiveDate,
    /// Last date covered
    pub to: NaiveDate,
    /// Working ranges on each covered date
    pub ranges: Vec<TimeRange>,
}

impl CalendarException {
    /// Returns true if the date falls inside this exception
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// A named working-time calendar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calendar {
    /// Calendar name
    pub name: Option<String>,
    /// Working hours per weekday; `None` means no hours were defined
    hours: [Option<Vec<TimeRange>>; 7],
    /// Date exceptions, in the order they were added
    exceptions: Vec<CalendarException>,
}

impl Calendar {
    /// Creates an empty calendar
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or replaces) the working hours for a weekday
    pub fn set_hours(&mut self, day: Day, ranges: Vec<TimeRange>) {
        self.hours[day.index()] = Some(ranges);
    }

    /// Working hours defined for a weekday
    pub fn hours(&self, day: Day) -> Option<&[TimeRange]> {
        self.hours[day.index()].as_deref()
    }

    /// Returns true if the weekday has at least one working range
    pub fn is_working_day(&self, day: Day) -> bool {
        self.hours(day).is_some_and(|ranges| !ranges.is_empty())
    }

    /// Adds an exception covering `from..=to`
    pub fn add_exception(&mut self, from: NaiveDate, to: NaiveDate, ranges: Vec<TimeRange>) {
        self.exceptions.push(CalendarException { from, to, ranges });
    }

    /// All exceptions
    pub fn exceptions(&self) -> &[CalendarException] {
        &self.exceptions
    }

    /// Exception covering the given date, if any
    pub fn exception(&self, date: NaiveDate) -> Option<&CalendarException> {
        self.exceptions.iter().find(|e| e.contains(date))
    }

    /// Working ranges in effect on a date. Exceptions win over weekly hours.
    pub fn ranges_on(&self, date: NaiveDate) -> &[TimeRange] {
        match self.exception(date) {
            Some(exception) => &exception.ranges,
            None => self.hours(date.weekday().into()).unwrap_or(&[]),
        }
    }

    /// Projects the instant at which `hours` of work starting at `start` are
    /// complete.
    ///
    /// Scans at most `horizon_days` calendar days; returns `None` if the work
    /// cannot be placed within that window.
    pub fn finish_date(
        &self,
        start: NaiveDateTime,
        hours: f64,
        horizon_days: u32,
    ) -> Option<NaiveDateTime> {
        let mut remaining = (hours * 60.0).round() as i64;
        if remaining <= 0 {
            return Some(start);
        }

        let mut cursor = start;
        let mut date = start.date();

        for _ in 0..horizon_days {
            let mut ranges: Vec<(NaiveDateTime, NaiveDateTime)> =
                self.ranges_on(date).iter().map(|r| r.on(date)).collect();
            ranges.sort_by_key(|(range_start, _)| *range_start);

            for (range_start, range_end) in ranges {
                if range_end <= cursor {
                    continue;
                }
                let segment_start = range_start.max(cursor);
                let available = (range_end - segment_start).num_minutes();
                if remaining <= available {
                    return Some(segment_start + ChronoDuration::minutes(remaining));
                }
                remaining -= available;
                cursor = range_end;
            }

            date = date.succ_opt()?;
            cursor = cursor.max(date.and_time(NaiveTime::MIN));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn standard() -> Calendar {
        let mut calendar = Calendar::new();
        let working = vec![
            TimeRange::new(time(8, 0), time(12, 0)),
            TimeRange::new(time(13, 0), time(17, 0)),
        ];
        for day in Day::ALL {
            let ranges = match day {
                Day::Saturday | Day::Sunday => Vec::new(),
                _ => working.clone(),
            };
            calendar.set_hours(day, ranges);
        }
        calendar
    }

    #[test]
    fn test_time_range_to_midnight() {
        let minutes = |range: TimeRange| {
            let (start, end) = range.on(NaiveDate::MIN);
            (end - start).num_minutes()
        };
        assert_eq!(minutes(TimeRange::new(time(0, 0), time(0, 0))), 24 * 60);
        assert_eq!(minutes(TimeRange::new(time(8, 0), time(12, 0))), 240);
    }

    #[test]
    fn test_finish_skips_weekend() {
        let calendar = standard();
        // Wednesday 13:00 plus five eight-hour days
        let finish = calendar.finish_date(at(2020, 1, 1, 13, 0), 40.0, 3660);
        assert_eq!(finish, Some(at(2020, 1, 8, 12, 0)));
    }

    #[test]
    fn test_finish_at_end_of_range() {
        let calendar = standard();
        let finish = calendar.finish_date(at(2020, 1, 6, 8, 0), 8.0, 3660);
        assert_eq!(finish, Some(at(2020, 1, 6, 17, 0)));
    }

    #[test]
    fn test_finish_respects_exception() {
        let mut calendar = standard();
        let holiday = NaiveDate::from_ymd_opt(2020, 1, 7).unwrap();
        calendar.add_exception(holiday, holiday, Vec::new());
        let finish = calendar.finish_date(at(2020, 1, 6, 8, 0), 16.0, 3660);
        assert_eq!(finish, Some(at(2020, 1, 8, 17, 0)));
    }

    #[test]
    fn test_zero_duration_and_no_working_time() {
        let calendar = standard();
        let start = at(2020, 1, 4, 10, 0);
        assert_eq!(calendar.finish_date(start, 0.0, 10), Some(start));
        assert_eq!(Calendar::new().finish_date(start, 8.0, 10), None);
    }

    #[test]
    fn test_is_working_day() {
        let calendar = standard();
        assert!(calendar.is_working_day(Day::Tuesday));
        assert!(!calendar.is_working_day(Day::Sunday));
        assert!(!Calendar::new().is_working_day(Day::Monday));
    }
}
