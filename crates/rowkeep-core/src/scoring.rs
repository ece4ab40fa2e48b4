//! Projects, corrections and the arithmetic used to score them.

use serde::{Deserialize, Serialize};

/// A project that corrections are recorded against. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub id:     i64,
  pub name:   String,
  /// Relative weight used by the weighted average; defaults to 1.
  pub weight: i64,
}

/// A score given to a user for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
  pub id:         i64,
  pub user_id:    i64,
  pub project_id: i64,
  pub score:      i64,
}

/// Divide `a` by `b`, truncating toward zero, and return 0 when `b` is 0.
///
/// Total over every input pair: `i64::MIN / -1` saturates to `i64::MAX`
/// rather than overflowing.
pub fn safe_divide(a: i64, b: i64) -> i64 {
  if b == 0 { 0 } else { a.saturating_div(b) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn divides_like_integer_division() {
    assert_eq!(safe_divide(10, 2), 5);
    assert_eq!(safe_divide(7, 2), 3);
    assert_eq!(safe_divide(-7, 2), -3);
    assert_eq!(safe_divide(7, -2), -3);
    assert_eq!(safe_divide(0, 9), 0);
  }

  #[test]
  fn zero_divisor_yields_zero() {
    for a in [i64::MIN, -1, 0, 1, 1024, i64::MAX] {
      assert_eq!(safe_divide(a, 0), 0, "a = {a}");
    }
  }

  #[test]
  fn overflowing_quotient_saturates() {
    assert_eq!(safe_divide(i64::MIN, -1), i64::MAX);
  }

  #[test]
  fn matches_checked_division_when_defined() {
    let samples = [-1000, -37, -1, 1, 3, 37, 1000];
    for a in samples {
      for b in samples {
        assert_eq!(Some(safe_divide(a, b)), a.checked_div(b));
      }
    }
  }
}
