//! Name lookups and the student meeting roster.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Students scoring strictly below this need a meeting.
pub const MEETING_SCORE_THRESHOLD: i64 = 80;

/// A student row as seen through the `need_meeting` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:           i64,
  pub name:         String,
  pub score:        i64,
  pub last_meeting: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
  pub name:         String,
  pub score:        i64,
  pub last_meeting: Option<NaiveDate>,
}

impl Student {
  /// Whether this student belongs in the meeting roster on `today`, using
  /// the same cutoff as `Store::students_needing_meeting`.
  pub fn needs_meeting(&self, today: NaiveDate) -> bool {
    if self.score >= MEETING_SCORE_THRESHOLD {
      return false;
    }
    match (self.last_meeting, meeting_cutoff(today)) {
      (None, _) => true,
      (Some(met), Some(cutoff)) => met < cutoff,
      (Some(_), None) => false,
    }
  }
}

/// Meetings held before this date are stale on `today`. Month-end dates
/// clamp to the last day of the previous month (2024-03-31 gives 2024-02-29).
pub fn meeting_cutoff(today: NaiveDate) -> Option<NaiveDate> {
  today.checked_sub_months(Months::new(1))
}

/// The `(lowercase, uppercase)` forms of a name-search initial. A letter
/// whose case mapping is not a single character (`ß` uppercases to `SS`)
/// stands for itself.
pub fn name_initial_cases(c: char) -> Result<(char, char)> {
  if !c.is_alphabetic() {
    return Err(Error::InvalidInitial(c));
  }
  Ok((single(c.to_lowercase()).unwrap_or(c), single(c.to_uppercase()).unwrap_or(c)))
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
  let c = chars.next()?;
  chars.next().is_none().then_some(c)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn student(score: i64, last_meeting: Option<NaiveDate>) -> Student {
    Student { id: 1, name: "Bob".into(), score, last_meeting }
  }

  #[test]
  fn high_scores_never_need_a_meeting() {
    let today = date(2024, 3, 15);
    assert!(!student(80, None).needs_meeting(today));
    assert!(!student(95, Some(date(2020, 1, 1))).needs_meeting(today));
  }

  #[test]
  fn low_score_without_meeting_needs_one() {
    assert!(student(79, None).needs_meeting(date(2024, 3, 15)));
  }

  #[test]
  fn stale_meeting_is_more_than_a_month_old() {
    let today = date(2024, 3, 15);
    assert!(student(50, Some(date(2024, 2, 14))).needs_meeting(today));
    assert!(!student(50, Some(date(2024, 2, 15))).needs_meeting(today));
    assert!(!student(50, Some(date(2024, 3, 1))).needs_meeting(today));
  }

  #[test]
  fn month_end_cutoff_clamps() {
    assert_eq!(meeting_cutoff(date(2024, 3, 31)), Some(date(2024, 2, 29)));
    assert!(!student(50, Some(date(2024, 3, 1))).needs_meeting(date(2024, 3, 31)));
    assert!(student(50, Some(date(2024, 2, 28))).needs_meeting(date(2024, 3, 31)));
  }

  #[test]
  fn initials_fold_both_ways() {
    assert_eq!(name_initial_cases('A').unwrap(), ('a', 'A'));
    assert_eq!(name_initial_cases('z').unwrap(), ('z', 'Z'));
    assert_eq!(name_initial_cases('É').unwrap(), ('é', 'É'));
    assert_eq!(name_initial_cases('ß').unwrap(), ('ß', 'ß'));
    assert!(matches!(name_initial_cases('7'), Err(Error::InvalidInitial('7'))));
  }
}
