//! Aggregation schedule.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info};

use super::RequestAggregator;
use crate::clock::SharedClock;

/// Identifier of the scheduled aggregation task.
pub const AGGREGATOR_TASK_ID: &str = "CounterReportsRequestAggregator";

/// How often pending requests are aggregated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// The first run boundary strictly after `after`.
    pub fn next_run_time(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let today = after.date_naive();
        match self {
            Frequency::Hourly => {
                let hour_start = today
                    .and_hms_opt(after.hour(), 0, 0)
                    .unwrap_or_else(|| today.and_time(NaiveTime::MIN));
                Utc.from_utc_datetime(&hour_start) + ChronoDuration::hours(1)
            }
            Frequency::Daily => midnight(today + ChronoDuration::days(1)),
            Frequency::Weekly => {
                let days_to_monday = 7 - i64::from(today.weekday().num_days_from_monday());
                midnight(today + ChronoDuration::days(days_to_monday))
            }
            Frequency::Monthly => {
                let (year, month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                let first = NaiveDate::from_ymd_opt(year, month, 1)
                    .unwrap_or(today + ChronoDuration::days(31));
                midnight(first)
            }
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

impl FromStr for Frequency {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything unrecognized is monthly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Frequency::Hourly,
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            _ => Frequency::Monthly,
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs the aggregator at every boundary of its frequency until shut down.
pub struct AggregationScheduler {
    aggregator: RequestAggregator,
    clock: SharedClock,
    frequency: Frequency,
}

impl AggregationScheduler {
    pub fn new(aggregator: RequestAggregator, clock: SharedClock, frequency: Frequency) -> Self {
        Self {
            aggregator,
            clock,
            frequency,
        }
    }

    /// Next time the aggregator will run.
    pub fn next_run_time(&self) -> DateTime<Utc> {
        self.frequency.next_run_time(self.clock.now())
    }

    /// Loop until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Scheduled {} ({}), next run at {}",
            AGGREGATOR_TASK_ID,
            self.frequency,
            self.next_run_time()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = (self.next_run_time() - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.aggregator.aggregate().await {
                        error!("{} failed: {}", AGGREGATOR_TASK_ID, e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Stopped {}", AGGREGATOR_TASK_ID);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::FixedClock;
    use crate::repository::test_support::setup_test_db;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_hourly_advances_to_next_hour() {
        let next = Frequency::Hourly.next_run_time(at(2013, 1, 15, 10, 25, 7));
        assert_eq!(next, at(2013, 1, 15, 11, 0, 0));

        let on_boundary = Frequency::Hourly.next_run_time(at(2013, 1, 15, 11, 0, 0));
        assert_eq!(on_boundary, at(2013, 1, 15, 12, 0, 0));

        let end_of_year = Frequency::Hourly.next_run_time(at(2013, 12, 31, 23, 59, 59));
        assert_eq!(end_of_year, at(2014, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_daily_weekly_monthly() {
        // 2013-01-16 is a Wednesday.
        let now = at(2013, 1, 16, 8, 0, 0);
        assert_eq!(Frequency::Daily.next_run_time(now), at(2013, 1, 17, 0, 0, 0));
        assert_eq!(Frequency::Weekly.next_run_time(now), at(2013, 1, 21, 0, 0, 0));
        assert_eq!(Frequency::Monthly.next_run_time(now), at(2013, 2, 1, 0, 0, 0));
        assert_eq!(
            Frequency::Monthly.next_run_time(at(2013, 12, 5, 0, 0, 0)),
            at(2014, 1, 1, 0, 0, 0)
        );
        // A Monday moves to the following Monday.
        assert_eq!(
            Frequency::Weekly.next_run_time(at(2013, 1, 21, 0, 0, 0)),
            at(2013, 1, 28, 0, 0, 0)
        );
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!("Hourly".parse::<Frequency>().unwrap(), Frequency::Hourly);
        assert_eq!("DAILY".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!("fortnightly".parse::<Frequency>().unwrap(), Frequency::Monthly);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let (pool, _dir) = setup_test_db().await;
        let clock = FixedClock::new(at(2013, 1, 15, 10, 25, 0));
        let scheduler = AggregationScheduler::new(
            RequestAggregator::new(pool),
            Arc::new(clock),
            Frequency::Hourly,
        );
        assert_eq!(scheduler.next_run_time(), at(2013, 1, 15, 11, 0, 0));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
