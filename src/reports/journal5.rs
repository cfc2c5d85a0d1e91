//! Journal Report 5: full-text article requests by year of publication.

use super::report::Tally;
use crate::repository::{AggregateFilter, AggregateRepository, DieselError};

/// Year-of-publication columns relative to the current year.
///
/// Columns are: articles in press, every year from the current one back to the
/// start of the previous decade, everything older, and unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PublicationYearGroups {
    current_year: i32,
    years: Vec<i32>,
}

impl PublicationYearGroups {
    pub fn new(current_year: i32) -> Self {
        let mut years = Vec::new();
        let mut year = current_year;
        while year % 10 != 0 {
            years.push(year);
            year -= 1;
        }
        for _ in 0..11 {
            years.push(year);
            year -= 1;
        }
        Self {
            current_year,
            years,
        }
    }

    pub fn column_count(&self) -> usize {
        self.years.len() + 3
    }

    fn oldest_listed(&self) -> i32 {
        self.years.last().copied().unwrap_or(self.current_year)
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.column_count());
        labels.push("Articles in Press".to_string());
        labels.extend(self.years.iter().map(|year| format!("YOP {}", year)));
        labels.push(format!("YOP Pre-{}", self.oldest_listed()));
        labels.push("YOP unknown".to_string());
        labels
    }

    /// Column for a stored publication year.
    pub fn column(&self, publication_year: &str) -> usize {
        let unknown = self.column_count() - 1;
        let year = match publication_year.trim().parse::<i32>() {
            Ok(year) if year != 0 => year,
            _ => return unknown,
        };

        if year > self.current_year {
            0
        } else if year < self.oldest_listed() {
            self.column_count() - 2
        } else {
            (self.current_year - year + 1) as usize
        }
    }
}

pub(super) async fn tally(
    aggregates: &AggregateRepository,
    filter: AggregateFilter,
    current_year: i32,
) -> Result<Tally, DieselError> {
    let groups = PublicationYearGroups::new(current_year);
    let mut tally = Tally::new(groups.column_count());

    for row in aggregates.journal_pubyear_rows(filter).await? {
        if row.requests <= 0 {
            continue;
        }
        tally.add(
            row.lockss_id,
            groups.column(&row.publication_year),
            i64::from(row.requests),
        );
    }

    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_for_2013() {
        let groups = PublicationYearGroups::new(2013);
        let labels = groups.labels();
        assert_eq!(groups.column_count(), 17);
        assert_eq!(labels[0], "Articles in Press");
        assert_eq!(labels[1], "YOP 2013");
        assert_eq!(labels[14], "YOP 2000");
        assert_eq!(labels[15], "YOP Pre-2000");
        assert_eq!(labels[16], "YOP unknown");
    }

    #[test]
    fn test_group_at_decade_start() {
        let groups = PublicationYearGroups::new(2020);
        let labels = groups.labels();
        assert_eq!(labels[1], "YOP 2020");
        assert_eq!(labels[11], "YOP 2010");
        assert_eq!(labels[12], "YOP Pre-2010");
    }

    #[test]
    fn test_column_lookup() {
        let groups = PublicationYearGroups::new(2013);
        assert_eq!(groups.column("2014"), 0);
        assert_eq!(groups.column("2013"), 1);
        assert_eq!(groups.column("2010"), 4);
        assert_eq!(groups.column("2000"), 14);
        assert_eq!(groups.column("1999"), 15);
        assert_eq!(groups.column(""), 16);
        assert_eq!(groups.column("0"), 16);
        assert_eq!(groups.column("n/a"), 16);
    }
}
