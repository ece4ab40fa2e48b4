//! The `Store` trait.
//!
//! Implemented by storage backends (e.g. `rowkeep-store-sqlite`). The storage
//! handle is always passed explicitly; nothing in rowkeep reaches for a
//! global connection.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  band::{Band, BandLifespan, NewBand, OriginFans},
  inventory::{Item, Order},
  roster::{NewStudent, Student},
  scoring::{Correction, Project},
  user::{NewUser, User, UserPatch},
};

/// Abstraction over a rowkeep storage backend.
///
/// Every method is a single unit of work: it either commits all of its
/// effects or none of them. Derived state (item quantities, the email
/// validity flag, stored averages) is maintained inside the same unit of work
/// as the mutation that invalidates it.
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Apply `patch` to a user.
  ///
  /// If and only if the email actually changes, `valid_email` is reset to
  /// `false` as part of the same update. Patching other columns, or setting
  /// the email to its current value, leaves the flag alone.
  fn update_user(
    &self,
    id: i64,
    patch: UserPatch,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Mark the user's current address as validated.
  fn validate_email(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  // ── Inventory ─────────────────────────────────────────────────────────

  fn add_item(
    &self,
    name: String,
    quantity: i64,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  fn get_item(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  /// Record an order and decrement the item's quantity by `number`.
  ///
  /// There is no floor on the quantity; a negative result is accepted.
  fn place_order(
    &self,
    item_name: String,
    number: i64,
  ) -> impl Future<Output = Result<Order, Self::Error>> + Send + '_;

  fn list_orders(
    &self,
    item_name: String,
  ) -> impl Future<Output = Result<Vec<Order>, Self::Error>> + Send + '_;

  // ── Bands ─────────────────────────────────────────────────────────────

  fn add_band(
    &self,
    input: NewBand,
  ) -> impl Future<Output = Result<Band, Self::Error>> + Send + '_;

  /// Total fans per origin, largest total first.
  fn rank_origins(
    &self,
  ) -> impl Future<Output = Result<Vec<OriginFans>, Self::Error>> + Send + '_;

  /// Bands whose style contains `style`, longest-lived first. Bands that have
  /// not split are measured up to `until_year`.
  fn rank_longevity(
    &self,
    style: String,
    until_year: i32,
  ) -> impl Future<Output = Result<Vec<BandLifespan>, Self::Error>> + Send + '_;

  // ── Corrections and scores ────────────────────────────────────────────

  /// Record a correction for `user_id` against the project called
  /// `project_name`, creating the project first if no project has that name.
  fn add_correction(
    &self,
    user_id: i64,
    project_name: String,
    score: i64,
  ) -> impl Future<Output = Result<Correction, Self::Error>> + Send + '_;

  /// Create a project with an explicit weight.
  fn add_project(
    &self,
    name: String,
    weight: i64,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn list_corrections(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Correction>, Self::Error>> + Send + '_;

  /// Compute the mean correction score for a user and store it as the user's
  /// `average_score`. A user with no corrections gets 0.
  fn compute_average_score(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + '_;

  /// As [`Store::compute_average_score`], weighting every score by its
  /// project's weight.
  fn compute_average_weighted_score(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + '_;

  /// Recompute the weighted average for every user. Returns the number of
  /// users updated.
  fn compute_average_weighted_scores(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Names and students ────────────────────────────────────────────────

  fn add_name(
    &self,
    name: String,
    score: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Count names starting with `initial` (case-insensitive), optionally only
  /// those scoring strictly below `below_score`.
  fn count_names_with_initial(
    &self,
    initial: char,
    below_score: Option<i64>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Students who need a meeting as of `today`.
  fn students_needing_meeting(
    &self,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;
}
