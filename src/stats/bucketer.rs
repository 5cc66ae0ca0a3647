//! Time-bucketed aggregation of book-box transactions.
//!
//! Every function here is pure: the same transactions, anchor and timezone
//! always produce the same buckets. Ranges are dense; a bucket exists for
//! every day/week/month/hour in range even when nothing happened in it.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::models::{Transaction, TransactionAction};

pub const HOURS_PER_DAY: u32 = 24;

/// Look-back window selected on the statistics page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "1week")]
    OneWeek,
    #[serde(rename = "1month")]
    OneMonth,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "1year")]
    OneYear,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::OneWeek,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneWeek => "1week",
            Period::OneMonth => "1month",
            Period::ThreeMonths => "3months",
            Period::SixMonths => "6months",
            Period::OneYear => "1year",
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Period::OneWeek | Period::OneMonth => Granularity::Day,
            Period::ThreeMonths => Granularity::Week,
            Period::SixMonths | Period::OneYear => Granularity::Month,
        }
    }

    /// Start of the window ending at `end`. Calendar months are clamped to
    /// the last day of shorter months.
    pub fn start_from<Tz: TimeZone>(&self, end: &DateTime<Tz>) -> DateTime<Tz> {
        let months = match self {
            Period::OneWeek => return end.clone() - Duration::days(7),
            Period::OneMonth => 1,
            Period::ThreeMonths => 3,
            Period::SixMonths => 6,
            Period::OneYear => 12,
        };
        end.clone()
            .checked_sub_months(Months::new(months))
            .unwrap_or_else(|| end.clone() - Duration::days(30 * i64::from(months)))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|period| period.as_str() == s)
            .ok_or_else(|| format!("unknown period: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    fn next(&self, bucket_start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => bucket_start.succ_opt(),
            Granularity::Week => bucket_start.checked_add_signed(Duration::days(7)),
            Granularity::Month => bucket_start.checked_add_months(Months::new(1)),
        }
    }

    fn period_key(&self, bucket_start: NaiveDate) -> String {
        match self {
            Granularity::Day | Granularity::Week => bucket_start.format("%Y-%m-%d").to_string(),
            Granularity::Month => bucket_start.format("%Y-%m").to_string(),
        }
    }

    fn label(&self, bucket_start: NaiveDate) -> String {
        match self {
            Granularity::Day => bucket_start.format("%m/%d").to_string(),
            Granularity::Week => format!("Week of {}", bucket_start.format("%m/%d")),
            Granularity::Month => bucket_start.format("%b %Y").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub period_key: String,
    pub label: String,
    pub start: NaiveDate,
    pub taken_count: u32,
    pub given_count: u32,
}

impl TimeBucket {
    fn empty(granularity: Granularity, start: NaiveDate) -> Self {
        Self {
            period_key: granularity.period_key(start),
            label: granularity.label(start),
            start,
            taken_count: 0,
            given_count: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.taken_count + self.given_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourBucket {
    pub hour: u32,
    pub label: String,
    pub taken_count: u32,
    pub given_count: u32,
}

impl HourBucket {
    pub fn total(&self) -> u32 {
        self.taken_count + self.given_count
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySeries {
    pub period: Period,
    pub granularity: Granularity,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buckets: Vec<TimeBucket>,
    /// In-range transactions whose action is neither `added` nor `took`.
    pub skipped: usize,
}

impl ActivitySeries {
    pub fn total_taken(&self) -> u32 {
        self.buckets.iter().map(|b| b.taken_count).sum()
    }

    pub fn total_given(&self) -> u32 {
        self.buckets.iter().map(|b| b.given_count).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlySeries {
    pub date: NaiveDate,
    pub buckets: Vec<HourBucket>,
    pub skipped: usize,
}

/// Counts transactions per day, week or month over the window of `period`
/// ending at `now`. Local dates are taken in `now`'s timezone.
pub fn bucket_by_period<Tz: TimeZone>(
    transactions: &[Transaction],
    period: Period,
    now: &DateTime<Tz>,
) -> ActivitySeries {
    let tz = now.timezone();
    let end = now.clone();
    let start = period.start_from(&end);
    let granularity = period.granularity();

    let mut buckets = BTreeMap::new();
    let last = granularity.bucket_start(end.date_naive());
    let mut cursor = Some(granularity.bucket_start(start.date_naive()));
    while let Some(bucket_start) = cursor.filter(|d| *d <= last) {
        buckets.insert(bucket_start, TimeBucket::empty(granularity, bucket_start));
        cursor = granularity.next(bucket_start);
    }

    let start_utc = start.with_timezone(&Utc);
    let end_utc = end.with_timezone(&Utc);
    let mut skipped = 0;

    for transaction in transactions {
        if transaction.timestamp < start_utc || transaction.timestamp > end_utc {
            continue;
        }
        let local_date = transaction.timestamp.with_timezone(&tz).date_naive();
        let Some(bucket) = buckets.get_mut(&granularity.bucket_start(local_date)) else {
            continue;
        };
        match transaction.action {
            TransactionAction::Took => bucket.taken_count += 1,
            TransactionAction::Added => bucket.given_count += 1,
            TransactionAction::Other => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(
            "Skipped {} transaction(s) with an unrecognized action for period {}",
            skipped,
            period
        );
    }

    ActivitySeries {
        period,
        granularity,
        start: start_utc,
        end: end_utc,
        buckets: buckets.into_values().collect(),
        skipped,
    }
}

/// Counts the transactions of one local calendar day per hour of day.
/// Always yields exactly 24 buckets.
pub fn bucket_by_hour<Tz: TimeZone>(
    transactions: &[Transaction],
    date: NaiveDate,
    tz: &Tz,
) -> HourlySeries {
    let mut buckets: Vec<HourBucket> = (0..HOURS_PER_DAY)
        .map(|hour| HourBucket {
            hour,
            label: format!("{}:00", hour),
            taken_count: 0,
            given_count: 0,
        })
        .collect();
    let mut skipped = 0;

    for transaction in transactions {
        let local = transaction.timestamp.with_timezone(tz);
        if local.date_naive() != date {
            continue;
        }
        let bucket = &mut buckets[local.hour() as usize];
        match transaction.action {
            TransactionAction::Took => bucket.taken_count += 1,
            TransactionAction::Added => bucket.given_count += 1,
            TransactionAction::Other => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(
            "Skipped {} transaction(s) with an unrecognized action on {}",
            skipped,
            date
        );
    }

    HourlySeries {
        date,
        buckets,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn tx(action: TransactionAction, timestamp: DateTime<Utc>) -> Transaction {
        Transaction {
            id: format!("t-{}", timestamp.timestamp()),
            username: "alice".to_string(),
            isbn: Some("9780000000001".to_string()),
            book_title: None,
            bookbox_id: "b1".to_string(),
            action,
            timestamp,
        }
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_example_excludes_old_transaction() {
        let now = at("2026-10-16T15:00:00Z");
        let transactions = vec![
            tx(TransactionAction::Took, now - Duration::hours(1)),
            tx(TransactionAction::Added, now - Duration::days(1)),
            tx(TransactionAction::Took, now - Duration::days(8)),
        ];

        let series = bucket_by_period(&transactions, Period::OneWeek, &now);

        assert_eq!(series.granularity, Granularity::Day);
        assert_eq!(series.buckets.len(), 8);
        assert_eq!(series.buckets.first().unwrap().start, date(2026, 10, 9));
        assert_eq!(series.buckets.last().unwrap().start, date(2026, 10, 16));

        let today = series.buckets.last().unwrap();
        assert_eq!((today.taken_count, today.given_count), (1, 0));
        let yesterday = &series.buckets[series.buckets.len() - 2];
        assert_eq!((yesterday.taken_count, yesterday.given_count), (0, 1));
        assert_eq!(series.total_taken() + series.total_given(), 2);
    }

    #[test]
    fn test_empty_input_gives_dense_zero_buckets() {
        let now = at("2026-10-16T12:00:00Z");
        for period in Period::ALL {
            let series = bucket_by_period(&[], period, &now);
            assert!(!series.buckets.is_empty(), "{}", period);
            assert!(series.buckets.iter().all(|b| b.total() == 0));
            assert_eq!(series.skipped, 0);
        }
    }

    #[test]
    fn test_buckets_are_contiguous_and_unique() {
        let now = at("2026-03-31T09:30:00Z");
        for period in Period::ALL {
            let series = bucket_by_period(&[], period, &now);
            let granularity = series.granularity;
            for pair in series.buckets.windows(2) {
                assert_eq!(
                    granularity.next(pair[0].start),
                    Some(pair[1].start),
                    "gap or duplicate in {}",
                    period
                );
            }
        }
    }

    #[test]
    fn test_bucket_counts() {
        let now = at("2026-10-16T12:00:00Z");
        assert_eq!(bucket_by_period(&[], Period::OneMonth, &now).buckets.len(), 31);
        // 2026-07-16 is a Thursday; its Monday is 07-13. Mondays through 10-12 inclusive.
        let weekly = bucket_by_period(&[], Period::ThreeMonths, &now);
        assert_eq!(weekly.buckets.first().unwrap().start, date(2026, 7, 13));
        assert_eq!(weekly.buckets.last().unwrap().start, date(2026, 10, 12));
        assert_eq!(weekly.buckets.len(), 14);
        assert_eq!(bucket_by_period(&[], Period::SixMonths, &now).buckets.len(), 7);
        assert_eq!(bucket_by_period(&[], Period::OneYear, &now).buckets.len(), 13);
    }

    #[test]
    fn test_weekly_buckets_start_on_monday() {
        let now = at("2026-10-18T12:00:00Z"); // Sunday
        let transactions = vec![tx(TransactionAction::Added, at("2026-10-18T08:00:00Z"))];
        let series = bucket_by_period(&transactions, Period::ThreeMonths, &now);

        assert!(series
            .buckets
            .iter()
            .all(|b| b.start.weekday() == chrono::Weekday::Mon));
        let last = series.buckets.last().unwrap();
        assert_eq!(last.start, date(2026, 10, 12));
        assert_eq!(last.given_count, 1);
        assert_eq!(last.label, "Week of 10/12");
    }

    #[test]
    fn test_monthly_keys_and_labels() {
        let now = at("2026-10-16T12:00:00Z");
        let transactions = vec![
            tx(TransactionAction::Took, at("2026-05-01T00:00:00Z")),
            tx(TransactionAction::Took, at("2026-05-20T00:00:00Z")),
            tx(TransactionAction::Added, at("2026-10-01T00:00:00Z")),
        ];
        let series = bucket_by_period(&transactions, Period::SixMonths, &now);

        assert_eq!(series.buckets[0].period_key, "2026-04");
        assert_eq!(series.buckets[0].label, "Apr 2026");
        let may = series.buckets.iter().find(|b| b.period_key == "2026-05").unwrap();
        assert_eq!(may.taken_count, 2);
        let october = series.buckets.last().unwrap();
        assert_eq!(october.period_key, "2026-10");
        assert_eq!(october.given_count, 1);
    }

    #[test]
    fn test_sum_matches_transactions_in_range() {
        let now = at("2026-10-16T12:00:00Z");
        let transactions: Vec<Transaction> = (0..400)
            .map(|i| {
                let action = if i % 3 == 0 {
                    TransactionAction::Added
                } else {
                    TransactionAction::Took
                };
                tx(action, now - Duration::hours(i * 23))
            })
            .collect();

        for period in Period::ALL {
            let series = bucket_by_period(&transactions, period, &now);
            let in_range = transactions
                .iter()
                .filter(|t| t.timestamp >= series.start && t.timestamp <= series.end)
                .count() as u32;
            assert_eq!(series.total_taken() + series.total_given(), in_range, "{}", period);
        }
    }

    #[test]
    fn test_local_offset_moves_day_boundary() {
        let montreal = FixedOffset::west_opt(4 * 3600).unwrap();
        let now = at("2026-10-16T12:00:00Z").with_timezone(&montreal);
        // 02:00 UTC on the 16th is still the 15th in Montreal.
        let transactions = vec![tx(TransactionAction::Took, at("2026-10-16T02:00:00Z"))];

        let series = bucket_by_period(&transactions, Period::OneWeek, &now);
        let bucket = series
            .buckets
            .iter()
            .find(|b| b.taken_count == 1)
            .unwrap();
        assert_eq!(bucket.start, date(2026, 10, 15));
    }

    #[test]
    fn test_unknown_actions_are_reported() {
        let now = at("2026-10-16T12:00:00Z");
        let transactions = vec![
            tx(TransactionAction::Other, now - Duration::hours(2)),
            tx(TransactionAction::Added, now - Duration::hours(2)),
        ];
        let series = bucket_by_period(&transactions, Period::OneWeek, &now);
        assert_eq!(series.skipped, 1);
        assert_eq!(series.total_given(), 1);
        assert_eq!(series.total_taken(), 0);
    }

    #[test]
    fn test_hourly_always_has_24_buckets() {
        let series = bucket_by_hour(&[], date(2026, 10, 16), &Utc);
        assert_eq!(series.buckets.len(), 24);
        assert!(series.buckets.iter().enumerate().all(|(i, b)| b.hour == i as u32));
        assert!(series.buckets.iter().all(|b| b.total() == 0));
    }

    #[test]
    fn test_hourly_counts_only_selected_day() {
        let transactions = vec![
            tx(TransactionAction::Took, at("2026-10-16T00:00:00Z")),
            tx(TransactionAction::Added, at("2026-10-16T13:45:00Z")),
            tx(TransactionAction::Took, at("2026-10-16T13:05:00Z")),
            tx(TransactionAction::Took, at("2026-10-17T00:00:00Z")),
            tx(TransactionAction::Took, at("2026-10-15T23:59:59Z")),
        ];
        let series = bucket_by_hour(&transactions, date(2026, 10, 16), &Utc);

        assert_eq!(series.buckets.len(), 24);
        assert_eq!(series.buckets[0].taken_count, 1);
        assert_eq!((series.buckets[13].taken_count, series.buckets[13].given_count), (1, 1));
        assert_eq!(series.buckets[13].label, "13:00");
        let total: u32 = series.buckets.iter().map(HourBucket::total).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_hourly_follows_daylight_saving() {
        let montreal = chrono_tz::America::Montreal;
        let transactions = vec![
            // 23:30 EST on Nov 30
            tx(TransactionAction::Took, at("2026-12-01T04:30:00Z")),
            // 23:30 EDT on Jun 30
            tx(TransactionAction::Added, at("2026-07-01T03:30:00Z")),
        ];

        let winter = bucket_by_hour(&transactions, date(2026, 11, 30), &montreal);
        assert_eq!(winter.buckets[23].taken_count, 1);
        let next_day = bucket_by_hour(&transactions, date(2026, 12, 1), &montreal);
        assert_eq!(next_day.buckets[0].taken_count, 0);

        let summer = bucket_by_hour(&transactions, date(2026, 6, 30), &montreal);
        assert_eq!(summer.buckets[23].given_count, 1);
    }

    #[test]
    fn test_daily_buckets_across_dst_change() {
        let montreal = chrono_tz::America::Montreal;
        // Clocks fall back on Nov 1, 2026.
        let now = montreal.with_ymd_and_hms(2026, 11, 3, 12, 0, 0).unwrap();
        let transactions = vec![tx(TransactionAction::Took, at("2026-11-02T04:30:00Z"))];

        let series = bucket_by_period(&transactions, Period::OneWeek, &now);
        assert_eq!(series.buckets.len(), 8);
        let nov1 = series
            .buckets
            .iter()
            .find(|b| b.period_key == "2026-11-01")
            .unwrap();
        assert_eq!(nov1.taken_count, 1);
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("3months".parse::<Period>().unwrap(), Period::ThreeMonths);
        assert!("2weeks".parse::<Period>().is_err());
        assert_eq!(
            serde_json::to_value(Period::OneYear).unwrap(),
            serde_json::json!("1year")
        );
    }

    #[test]
    fn test_month_subtraction_clamps() {
        let now = at("2026-03-31T10:00:00Z");
        let start = Period::OneMonth.start_from(&now);
        assert_eq!(start.date_naive(), date(2026, 2, 28));
    }
}
