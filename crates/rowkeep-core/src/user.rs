//! Users: the rows that carry the email-validity flag and the derived
//! average score.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Country ─────────────────────────────────────────────────────────────────

/// The closed set of countries a user may belong to.
///
/// The first variant is the default, matching the column default in storage.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
  #[default]
  Us,
  Co,
  Tn,
}

impl Country {
  pub const ALL: [Country; 3] = [Country::Us, Country::Co, Country::Tn];

  /// The two-letter code stored in the `country` column.
  pub fn code(self) -> &'static str {
    match self {
      Country::Us => "US",
      Country::Co => "CO",
      Country::Tn => "TN",
    }
  }
}

impl fmt::Display for Country {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

impl FromStr for Country {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Country::ALL
      .into_iter()
      .find(|c| c.code().eq_ignore_ascii_case(s))
      .ok_or_else(|| Error::UnknownCountry(s.to_owned()))
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A persisted user row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id:            i64,
  pub email:         String,
  pub name:          Option<String>,
  pub country:       Country,
  /// `false` until the current address has been validated; reset whenever
  /// the address changes.
  pub valid_email:   bool,
  /// Last value written by one of the average-score computations.
  pub average_score: f64,
}

/// Input for creating a user. `id`, `valid_email` and `average_score` are
/// assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub email:   String,
  pub name:    Option<String>,
  #[serde(default)]
  pub country: Country,
}

impl NewUser {
  pub fn new(email: impl Into<String>) -> Self {
    Self { email: email.into(), name: None, country: Country::default() }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn with_country(mut self, country: Country) -> Self {
    self.country = country;
    self
  }
}

/// A partial update to a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
  pub email:   Option<String>,
  pub name:    Option<String>,
  pub country: Option<Country>,
}

impl UserPatch {
  pub fn is_empty(&self) -> bool {
    self.email.is_none() && self.name.is_none() && self.country.is_none()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn country_defaults_to_first_variant() {
    assert_eq!(Country::default(), Country::Us);
    assert_eq!(Country::default(), Country::ALL[0]);
  }

  #[test]
  fn country_parses_case_insensitively() {
    assert_eq!("co".parse::<Country>().unwrap(), Country::Co);
    assert_eq!("TN".parse::<Country>().unwrap(), Country::Tn);
  }

  #[test]
  fn country_rejects_codes_outside_the_set() {
    let err = "FR".parse::<Country>().unwrap_err();
    assert!(matches!(err, Error::UnknownCountry(ref c) if c == "FR"));
  }

  #[test]
  fn empty_patch() {
    assert!(UserPatch::default().is_empty());
    let patch = UserPatch { name: Some("Bob".into()), ..Default::default() };
    assert!(!patch.is_empty());
  }
}
