//! Bands and the two rankings computed over them.

use serde::{Deserialize, Serialize};

/// A persisted row of the `metal_bands` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
  pub id:        i64,
  pub band_name: String,
  /// Free-text country or region label.
  pub origin:    String,
  pub fans:      i64,
  pub style:     Option<String>,
  pub formed:    Option<i32>,
  /// `None` while the band is still active.
  pub split:     Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBand {
  pub band_name: String,
  pub origin:    String,
  pub fans:      i64,
  pub style:     Option<String>,
  pub formed:    Option<i32>,
  pub split:     Option<i32>,
}

impl NewBand {
  pub fn new(band_name: impl Into<String>, origin: impl Into<String>, fans: i64) -> Self {
    Self {
      band_name: band_name.into(),
      origin: origin.into(),
      fans,
      style: None,
      formed: None,
      split: None,
    }
  }

  pub fn with_style(mut self, style: impl Into<String>) -> Self {
    self.style = Some(style.into());
    self
  }

  pub fn active_between(mut self, formed: i32, split: Option<i32>) -> Self {
    self.formed = Some(formed);
    self.split = split;
    self
  }
}

/// One row of the origin ranking: total fans per origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginFans {
  pub origin:  String,
  pub nb_fans: i64,
}

/// One row of the longevity ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandLifespan {
  pub band_name: String,
  /// Years between `formed` and `split`, or the reference year when the band
  /// has not split.
  pub lifespan:  i32,
}
