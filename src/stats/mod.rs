pub mod bucketer;
pub mod chart;
pub mod snapshot;

pub use bucketer::{
    bucket_by_hour, bucket_by_period, ActivitySeries, Granularity, HourBucket, HourlySeries,
    Period, TimeBucket,
};
pub use snapshot::{StatisticsReport, TransactionSnapshot};
