//! Progress dashboard: today/week counts and a 7-day histogram.
//!
//! Everything here is a pure function of the history and "now"; nothing is
//! cached. Calendar days are taken in the time zone of `now`.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::history::HistoryEntry;

pub const CHART_PLACEHOLDER: &str = "Chart unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    /// Short weekday, e.g. "Mon".
    pub label: String,
    pub count: usize,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub today: usize,
    pub this_week: usize,
    pub last_7_days: Vec<DayBucket>,
}

fn local_date<Tz: TimeZone>(entry: &HistoryEntry, tz: &Tz) -> Option<NaiveDate> {
    entry.completed_at_in(tz).map(|dt| dt.date_naive())
}

fn count_on<Tz: TimeZone>(entries: &[HistoryEntry], tz: &Tz, day: NaiveDate) -> usize {
    entries
        .iter()
        .filter(|e| local_date(*e, tz) == Some(day))
        .count()
}

pub fn count_today<Tz: TimeZone>(entries: &[HistoryEntry], now: &DateTime<Tz>) -> usize {
    count_on(entries, &now.timezone(), now.date_naive())
}

/// Sessions from Sunday 00:00 through Saturday 23:59:59.999 of the current week.
pub fn count_this_week<Tz: TimeZone>(entries: &[HistoryEntry], now: &DateTime<Tz>) -> usize {
    let today = now.date_naive();
    let since_sunday = u64::from(today.weekday().num_days_from_sunday());
    let Some(start) = today.checked_sub_days(Days::new(since_sunday)) else {
        return 0;
    };
    let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);

    let tz = now.timezone();
    entries
        .iter()
        .filter_map(|e| local_date(e, &tz))
        .filter(|day| (start..=end).contains(day))
        .count()
}

/// Seven buckets ending today, oldest first.
pub fn last_7_days<Tz: TimeZone>(entries: &[HistoryEntry], now: &DateTime<Tz>) -> Vec<DayBucket> {
    let tz = now.timezone();
    let today = now.date_naive();
    (0..7u64)
        .rev()
        .filter_map(|ago| today.checked_sub_days(Days::new(ago)))
        .map(|date| DayBucket {
            date,
            label: date.format("%a").to_string(),
            count: count_on(entries, &tz, date),
            is_today: date == today,
        })
        .collect()
}

pub fn summarize<Tz: TimeZone>(entries: &[HistoryEntry], now: &DateTime<Tz>) -> Summary {
    Summary {
        today: count_today(entries, now),
        this_week: count_this_week(entries, now),
        last_7_days: last_7_days(entries, now),
    }
}

/// [`summarize`] in the system time zone.
pub fn summarize_local(entries: &[HistoryEntry]) -> Summary {
    summarize(entries, &Local::now())
}

/// Turns a histogram into something printable.
pub trait HistogramRenderer {
    fn render(&self, histogram: &[DayBucket]) -> String;
}

/// Horizontal text bars, one row per day; today's row is marked.
#[derive(Debug, Clone, Copy)]
pub struct BarChart {
    pub width: usize,
}

impl Default for BarChart {
    fn default() -> Self {
        Self { width: 24 }
    }
}

impl HistogramRenderer for BarChart {
    fn render(&self, histogram: &[DayBucket]) -> String {
        let max = histogram.iter().map(|b| b.count).max().unwrap_or(0);
        let mut out = String::new();
        for bucket in histogram {
            let len = if max == 0 {
                0
            } else {
                (bucket.count * self.width).div_ceil(max)
            };
            let marker = if bucket.is_today { '>' } else { ' ' };
            out.push_str(&format!(
                "{marker} {label} |{bar} {count}\n",
                label = bucket.label,
                bar = "#".repeat(len),
                count = bucket.count,
            ));
        }
        out
    }
}

/// Render with `renderer`, or a placeholder when there is none.
pub fn render_histogram(renderer: Option<&dyn HistogramRenderer>, histogram: &[DayBucket]) -> String {
    match renderer {
        Some(renderer) => renderer.render(histogram),
        None => format!("{CHART_PLACEHOLDER}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};

    fn entry_at<Tz: TimeZone>(at: DateTime<Tz>) -> HistoryEntry {
        HistoryEntry::new(uuid::Uuid::new_v4().to_string(), "t", at.timestamp_millis())
    }

    /// Wednesday 2024-05-15 14:30 at UTC+9.
    fn wednesday() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 15, 14, 30, 0)
            .unwrap()
    }

    #[test]
    fn empty_history() {
        let summary = summarize(&[], &wednesday());
        assert_eq!(summary.today, 0);
        assert_eq!(summary.this_week, 0);
        assert_eq!(summary.last_7_days.len(), 7);
        assert!(summary.last_7_days.iter().all(|b| b.count == 0));
    }

    #[test]
    fn today_uses_local_calendar_day() {
        let now = wednesday();
        let tz = now.timezone();
        let entries = vec![
            // 00:10 local today is still the previous day in UTC.
            entry_at(tz.with_ymd_and_hms(2024, 5, 15, 0, 10, 0).unwrap()),
            entry_at(now - Duration::hours(1)),
            // 23:59 local yesterday.
            entry_at(tz.with_ymd_and_hms(2024, 5, 14, 23, 59, 0).unwrap()),
        ];
        assert_eq!(count_today(&entries, &now), 2);
    }

    #[test]
    fn week_runs_sunday_through_saturday() {
        let now = wednesday();
        let tz = now.timezone();
        let entries = vec![
            entry_at(tz.with_ymd_and_hms(2024, 5, 11, 23, 59, 59).unwrap()), // Sat before
            entry_at(tz.with_ymd_and_hms(2024, 5, 12, 0, 0, 0).unwrap()),    // Sunday start
            entry_at(tz.with_ymd_and_hms(2024, 5, 15, 9, 0, 0).unwrap()),    // today
            entry_at(tz.with_ymd_and_hms(2024, 5, 18, 23, 59, 59).unwrap()), // Saturday end
            entry_at(tz.with_ymd_and_hms(2024, 5, 19, 0, 0, 0).unwrap()),    // next Sunday
        ];
        assert_eq!(count_this_week(&entries, &now), 3);
    }

    #[test]
    fn sunday_is_first_day_of_its_week() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let sunday = tz.with_ymd_and_hms(2024, 5, 12, 8, 0, 0).unwrap();
        let entries = vec![
            entry_at(sunday),
            entry_at(tz.with_ymd_and_hms(2024, 5, 11, 8, 0, 0).unwrap()),
        ];
        assert_eq!(count_this_week(&entries, &sunday), 1);
    }

    #[test]
    fn histogram_oldest_first_with_labels() {
        let now = wednesday();
        let entries = vec![
            entry_at(now),
            entry_at(now - Duration::minutes(30)),
            entry_at(now - Duration::days(6)),
            entry_at(now - Duration::days(7)),
        ];
        let buckets = last_7_days(&entries, &now);
        let labels: Vec<_> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"]);
        let counts: Vec<_> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, [1, 0, 0, 0, 0, 0, 2]);
        assert!(buckets[6].is_today);
        assert!(buckets[..6].iter().all(|b| !b.is_today));
    }

    #[test]
    fn local_summary_counts_fresh_entry() {
        let entries = vec![entry_at(Utc::now())];
        let summary = summarize_local(&entries);
        assert_eq!(summary.today, 1);
        assert_eq!(summary.this_week, 1);
        assert_eq!(summary.last_7_days[6].count, 1);
    }

    #[test]
    fn bar_chart_marks_today_and_scales() {
        let now = wednesday();
        let entries = vec![entry_at(now), entry_at(now), entry_at(now - Duration::days(1))];
        let chart = BarChart { width: 4 }.render(&last_7_days(&entries, &now));
        let lines: Vec<_> = chart.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[6], "> Wed |#### 2");
        assert_eq!(lines[5], "  Tue |## 1");
        assert_eq!(lines[0], "  Thu | 0");
    }

    #[test]
    fn missing_renderer_falls_back_to_placeholder() {
        let buckets = last_7_days(&[], &wednesday());
        assert_eq!(render_histogram(None, &buckets).trim(), CHART_PLACEHOLDER);
        let chart = BarChart::default();
        assert!(render_histogram(Some(&chart), &buckets).contains("Wed"));
    }
}
