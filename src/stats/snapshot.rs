use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use super::bucketer::{bucket_by_hour, bucket_by_period, ActivitySeries, HourlySeries, Period};
use crate::models::Transaction;

/// Transactions of one book box, fetched once and then re-bucketed for
/// every period or day the admin selects. Lives for a single request.
#[derive(Debug, Clone)]
pub struct TransactionSnapshot {
    bookbox_id: String,
    fetched_at: DateTime<Utc>,
    transactions: Vec<Transaction>,
}

impl TransactionSnapshot {
    pub fn new(bookbox_id: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        Self {
            bookbox_id: bookbox_id.into(),
            fetched_at: Utc::now(),
            transactions,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn activity<Tz: TimeZone>(&self, period: Period, now: &DateTime<Tz>) -> ActivitySeries {
        bucket_by_period(&self.transactions, period, now)
    }

    pub fn hourly<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> HourlySeries {
        bucket_by_hour(&self.transactions, date, tz)
    }

    /// Both series for one page view of the statistics panel.
    pub fn report<Tz: TimeZone>(
        &self,
        period: Period,
        date: NaiveDate,
        now: &DateTime<Tz>,
    ) -> StatisticsReport {
        StatisticsReport {
            bookbox_id: self.bookbox_id.clone(),
            fetched_at: self.fetched_at,
            total_transactions: self.len(),
            activity: self.activity(period, now),
            hourly: self.hourly(date, &now.timezone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub bookbox_id: String,
    pub fetched_at: DateTime<Utc>,
    pub total_transactions: usize,
    pub activity: ActivitySeries,
    pub hourly: HourlySeries,
}
