//! Result-set rendering: tab-separated text with a header line, or JSON.

use rowkeep_core::{
  band::{Band, BandLifespan, OriginFans},
  inventory::{Item, Order},
  roster::Student,
  scoring::{Correction, Project},
  user::User,
};
use serde::Serialize;

/// A row type that can be printed as one line of a result set.
pub trait Tabular {
  const HEADERS: &'static [&'static str];

  fn cells(&self) -> Vec<String>;
}

fn opt<T: ToString>(v: &Option<T>) -> String {
  v.as_ref().map_or_else(|| "NULL".to_owned(), ToString::to_string)
}

impl Tabular for User {
  const HEADERS: &'static [&'static str] =
    &["id", "email", "name", "country", "valid_email", "average_score"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.email.clone(),
      opt(&self.name),
      self.country.to_string(),
      u8::from(self.valid_email).to_string(),
      self.average_score.to_string(),
    ]
  }
}

impl Tabular for Item {
  const HEADERS: &'static [&'static str] = &["id", "name", "quantity"];

  fn cells(&self) -> Vec<String> {
    vec![self.id.to_string(), self.name.clone(), self.quantity.to_string()]
  }
}

impl Tabular for Order {
  const HEADERS: &'static [&'static str] = &["id", "item_name", "number", "ordered_at"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.item_name.clone(),
      self.number.to_string(),
      self.ordered_at.to_rfc3339(),
    ]
  }
}

impl Tabular for Band {
  const HEADERS: &'static [&'static str] =
    &["id", "band_name", "fans", "formed", "split", "origin", "style"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.band_name.clone(),
      self.fans.to_string(),
      opt(&self.formed),
      opt(&self.split),
      self.origin.clone(),
      opt(&self.style),
    ]
  }
}

impl Tabular for OriginFans {
  const HEADERS: &'static [&'static str] = &["origin", "nb_fans"];

  fn cells(&self) -> Vec<String> { vec![self.origin.clone(), self.nb_fans.to_string()] }
}

impl Tabular for BandLifespan {
  const HEADERS: &'static [&'static str] = &["band_name", "lifespan"];

  fn cells(&self) -> Vec<String> { vec![self.band_name.clone(), self.lifespan.to_string()] }
}

impl Tabular for Correction {
  const HEADERS: &'static [&'static str] = &["id", "user_id", "project_id", "score"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.user_id.to_string(),
      self.project_id.to_string(),
      self.score.to_string(),
    ]
  }
}

impl Tabular for Project {
  const HEADERS: &'static [&'static str] = &["id", "name", "weight"];

  fn cells(&self) -> Vec<String> {
    vec![self.id.to_string(), self.name.clone(), self.weight.to_string()]
  }
}

impl Tabular for Student {
  const HEADERS: &'static [&'static str] = &["id", "name", "score", "last_meeting"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.name.clone(),
      self.score.to_string(),
      opt(&self.last_meeting),
    ]
  }
}

/// Render `rows` as a result set. An empty set prints nothing in text mode,
/// like the SQL client's batch output.
pub fn render_rows<T: Tabular + Serialize>(rows: &[T], json: bool) -> serde_json::Result<String> {
  if json {
    return serde_json::to_string_pretty(rows);
  }
  if rows.is_empty() {
    return Ok(String::new());
  }

  let mut out = T::HEADERS.join("\t");
  for row in rows {
    out.push('\n');
    out.push_str(&row.cells().join("\t"));
  }
  Ok(out)
}

/// Render a single scalar under a column name.
pub fn render_scalar<V: Serialize + ToString>(
  column: &str,
  value: V,
  json: bool,
) -> serde_json::Result<String> {
  if json {
    let mut row = serde_json::Map::new();
    row.insert(column.to_owned(), serde_json::to_value(value)?);
    serde_json::to_string(&row)
  } else {
    Ok(format!("{column}\n{}", value.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ranking_renders_as_tab_separated_rows() {
    let rows = [
      OriginFans { origin: "USA".into(), nb_fans: 150 },
      OriginFans { origin: "UK".into(), nb_fans: 30 },
    ];
    assert_eq!(render_rows(&rows, false).unwrap(), "origin\tnb_fans\nUSA\t150\nUK\t30");
  }

  #[test]
  fn empty_result_set_prints_nothing() {
    let rows: [OriginFans; 0] = [];
    assert_eq!(render_rows(&rows, false).unwrap(), "");
    assert_eq!(render_rows(&rows, true).unwrap(), "[]");
  }

  #[test]
  fn missing_values_print_as_null() {
    let band = Band {
      id:        1,
      band_name: "Slayer".into(),
      origin:    "USA".into(),
      fans:      90,
      style:     None,
      formed:    Some(1981),
      split:     None,
    };
    assert_eq!(band.cells(), ["1", "Slayer", "90", "1981", "NULL", "USA", "NULL"]);
  }

  #[test]
  fn scalars() {
    assert_eq!(render_scalar("SafeDiv", 5, false).unwrap(), "SafeDiv\n5");
    assert_eq!(render_scalar("SafeDiv", 0, true).unwrap(), r#"{"SafeDiv":0}"#);
  }
}
