//! Repository utilities.

use diesel::result::DatabaseErrorInformation;

/// Simple error info wrapper for database errors.
#[derive(Debug)]
pub struct DbErrorInfo(pub String);

impl DatabaseErrorInformation for DbErrorInfo {
    fn message(&self) -> &str {
        &self.0
    }
    fn details(&self) -> Option<&str> {
        None
    }
    fn hint(&self) -> Option<&str> {
        None
    }
    fn table_name(&self) -> Option<&str> {
        None
    }
    fn column_name(&self) -> Option<&str> {
        None
    }
    fn constraint_name(&self) -> Option<&str> {
        None
    }
    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Convert any displayable error to a diesel error with proper message.
pub fn to_diesel_error(e: impl std::fmt::Display) -> diesel::result::Error {
    diesel::result::Error::DatabaseError(
        diesel::result::DatabaseErrorKind::Unknown,
        Box::new(DbErrorInfo(e.to_string())),
    )
}

/// Strip the `sqlite:` scheme (and `//` if present) from a database URL.
pub fn sqlite_path(database_url: &str) -> &str {
    let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
    path.strip_prefix("//").unwrap_or(path)
}

/// Booleans are stored as INTEGER 0/1.
pub fn to_flag(value: bool) -> i32 {
    i32::from(value)
}

pub fn from_flag(value: i32) -> bool {
    value != 0
}

/// `year * 12 + month`, wide enough for any `i32` year.
pub fn month_index(year: i32, month: i32) -> i64 {
    i64::from(year) * 12 + i64::from(month)
}

/// Narrow a month index to the `i32` compared against `request_year * 12 + request_month`.
pub fn clamp_index(index: i64) -> i32 {
    i32::try_from(index).unwrap_or(if index < 0 { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_path() {
        assert_eq!(sqlite_path("sqlite:/tmp/counter.db"), "/tmp/counter.db");
        assert_eq!(sqlite_path("sqlite:///tmp/counter.db"), "/tmp/counter.db");
        assert_eq!(sqlite_path("/tmp/counter.db"), "/tmp/counter.db");
    }

    #[test]
    fn test_flags() {
        assert_eq!(to_flag(true), 1);
        assert_eq!(to_flag(false), 0);
        assert!(from_flag(1));
        assert!(!from_flag(0));
    }

    #[test]
    fn test_month_index_saturates() {
        assert_eq!(clamp_index(month_index(2013, 2)), 2013 * 12 + 2);
        assert_eq!(clamp_index(month_index(i32::MAX, 12)), i32::MAX);
        assert_eq!(clamp_index(month_index(i32::MIN, 1)), i32::MIN);
    }

    #[test]
    fn test_to_diesel_error_keeps_message() {
        let err = to_diesel_error("disk full");
        assert!(err.to_string().contains("disk full"));
    }
}
