//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`, which keeps both comparable with SQLite's own date
//! functions. Countries are stored as their two-letter codes.

use chrono::{DateTime, NaiveDate, Utc};
use rowkeep_core::{
  inventory::Order,
  roster::Student,
  user::{Country, User},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

// ─── Country ─────────────────────────────────────────────────────────────────

pub fn encode_country(c: Country) -> &'static str { c.code() }

pub fn decode_country(s: &str) -> Result<Country> { Ok(s.parse()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns of a `users` row, in `SELECT` order.
pub const USER_COLUMNS: &str = "id, email, name, country, valid_email, average_score";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:            i64,
  pub email:         String,
  pub name:          Option<String>,
  pub country:       String,
  pub valid_email:   bool,
  pub average_score: f64,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      email:         row.get(1)?,
      name:          row.get(2)?,
      country:       row.get(3)?,
      valid_email:   row.get(4)?,
      average_score: row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.id,
      email:         self.email,
      name:          self.name,
      country:       decode_country(&self.country)?,
      valid_email:   self.valid_email,
      average_score: self.average_score,
    })
  }
}

/// Raw values read directly from an `orders` row.
pub struct RawOrder {
  pub id:         i64,
  pub item_name:  String,
  pub number:     i64,
  pub ordered_at: String,
}

impl RawOrder {
  pub fn into_order(self) -> Result<Order> {
    Ok(Order {
      id:         self.id,
      item_name:  self.item_name,
      number:     self.number,
      ordered_at: decode_dt(&self.ordered_at)?,
    })
  }
}

/// Raw values read directly from a `students` row.
pub struct RawStudent {
  pub id:           i64,
  pub name:         String,
  pub score:        i64,
  pub last_meeting: Option<String>,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      name:         row.get(1)?,
      score:        row.get(2)?,
      last_meeting: row.get(3)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:           self.id,
      name:         self.name,
      score:        self.score,
      last_meeting: self.last_meeting.as_deref().map(decode_date).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_sort_as_text() {
    let earlier = encode_date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    let later = encode_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(earlier, "2023-12-31");
    assert!(earlier < later);
  }

  #[test]
  fn unknown_country_code_is_a_core_error() {
    assert!(matches!(
      decode_country("XX"),
      Err(Error::Core(rowkeep_core::Error::UnknownCountry(_)))
    ));
  }

  #[test]
  fn bad_timestamp_names_the_value() {
    let err = decode_dt("yesterday").unwrap_err();
    assert!(err.to_string().contains("yesterday"));
  }
}
