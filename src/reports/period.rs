//! Report periods.

use chrono::{Datelike, Months, NaiveDate};

use crate::clock::Clock;
use crate::error::CounterError;
use crate::repository::util::{clamp_index, month_index};

/// Longest period a report may cover, in months.
pub const MAX_REPORT_MONTHS: u32 = 24;

/// An inclusive range of whole months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    start_month: u32,
    start_year: i32,
    end_month: u32,
    end_year: i32,
}

impl ReportPeriod {
    /// A custom period from `start_month/start_year` to `end_month/end_year`.
    pub fn new(
        start_month: u32,
        start_year: i32,
        end_month: u32,
        end_year: i32,
    ) -> Result<Self, CounterError> {
        if !(1..=12).contains(&start_month) {
            return Err(CounterError::invalid(
                "Start month must be a number between 1 and 12, both inclusive.",
            ));
        }
        if !(1..=12).contains(&end_month) {
            return Err(CounterError::invalid(
                "End month must be a number between 1 and 12, both inclusive.",
            ));
        }
        if end_year < start_year || (end_year == start_year && end_month < start_month) {
            return Err(CounterError::invalid(
                "The period end must not be earlier than the period start.",
            ));
        }

        let period = Self {
            start_month,
            start_year,
            end_month,
            end_year,
        };
        if period.first_date().is_none() || period.last_date().is_none() {
            return Err(CounterError::invalid(format!(
                "Report years must be between {} and {}.",
                NaiveDate::MIN.year(),
                NaiveDate::MAX.year()
            )));
        }
        if period.month_count() > MAX_REPORT_MONTHS as usize {
            return Err(CounterError::invalid(format!(
                "The report period cannot exceed {} months.",
                MAX_REPORT_MONTHS
            )));
        }
        Ok(period)
    }

    /// The default period: the 24 months ending with the month before today.
    pub fn trailing(clock: &dyn Clock) -> Self {
        let first_of_month = clock.today().with_day(1).unwrap_or(clock.today());
        let end = first_of_month
            .checked_sub_months(Months::new(1))
            .unwrap_or(first_of_month);
        let start = end
            .checked_sub_months(Months::new(MAX_REPORT_MONTHS - 1))
            .unwrap_or(end);

        Self {
            start_month: start.month(),
            start_year: start.year(),
            end_month: end.month(),
            end_year: end.year(),
        }
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_month(&self) -> u32 {
        self.end_month
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    /// Number of months covered.
    pub fn month_count(&self) -> usize {
        let count = month_index(self.end_year, self.end_month as i32)
            - month_index(self.start_year, self.start_month as i32)
            + 1;
        usize::try_from(count).unwrap_or(0)
    }

    /// Zero-based position of a month inside the period.
    pub fn month_offset(&self, year: i32, month: i32) -> Option<usize> {
        let offset = month_index(year, month) - month_index(self.start_year, self.start_month as i32);
        let offset = usize::try_from(offset).ok()?;
        (offset < self.month_count()).then_some(offset)
    }

    /// First day of every month in the period, in order.
    pub fn months(&self) -> Vec<NaiveDate> {
        let Some(first) = self.first_date() else {
            return Vec::new();
        };
        (0..self.month_count() as u32)
            .filter_map(|i| first.checked_add_months(Months::new(i)))
            .collect()
    }

    /// Column labels such as `Jan-2013`.
    pub fn month_labels(&self) -> Vec<String> {
        self.months()
            .into_iter()
            .map(|month| month.format("%b-%Y").to_string())
            .collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, self.start_month, 1)
    }

    /// Last day of the end month.
    pub fn last_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.end_year, self.end_month, 1)?
            .checked_add_months(Months::new(1))?
            .pred_opt()
    }

    /// `yyyy-MM-dd to yyyy-MM-dd`.
    pub fn display(&self) -> String {
        let format = |date: Option<NaiveDate>| {
            date.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        format!("{} to {}", format(self.first_date()), format(self.last_date()))
    }

    /// Year-month bounds as `year * 12 + month`.
    pub(crate) fn bounds(&self) -> (i32, i32) {
        (
            clamp_index(month_index(self.start_year, self.start_month as i32)),
            clamp_index(month_index(self.end_year, self.end_month as i32)),
        )
    }
}
