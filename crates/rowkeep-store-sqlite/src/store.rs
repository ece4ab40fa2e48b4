//! [`SqliteStore`]: the SQLite implementation of [`Store`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use tracing::{debug, warn};

use rowkeep_core::{
  band::{Band, BandLifespan, NewBand, OriginFans},
  inventory::{Item, Order},
  roster::{self, MEETING_SCORE_THRESHOLD, NewStudent, Student},
  scoring::{Correction, Project},
  store::Store,
  user::{NewUser, User, UserPatch},
};

use crate::{
  encode::{
    encode_country, encode_date, encode_dt, RawOrder, RawStudent, RawUser, USER_COLUMNS,
  },
  schema, Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rowkeep store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and provision the schema.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.provision().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.provision().await?;
    Ok(store)
  }

  /// Create any missing tables, indexes and views.
  ///
  /// Idempotent; runs automatically on open. Fails with
  /// [`Error::SchemaMismatch`] if an existing table lacks a declared column.
  pub async fn provision(&self) -> Result<()> {
    self.conn.call(|conn| Ok(schema::provision(conn))).await?
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn select_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
      [id],
      RawUser::from_row,
    )
    .optional()
}

fn user_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

/// `Σ(score × weight) / Σ(weight)` over the user's corrections; 0 when the
/// user has none or the weights sum to 0.
fn weighted_average(conn: &Connection, user_id: i64) -> rusqlite::Result<f64> {
  let (weighted, weights): (i64, i64) = conn.query_row(
    "SELECT COALESCE(SUM(c.score * p.weight), 0), COALESCE(SUM(p.weight), 0)
     FROM corrections c
     JOIN projects p ON p.id = c.project_id
     WHERE c.user_id = ?1",
    [user_id],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;

  Ok(if weights == 0 { 0.0 } else { weighted as f64 / weights as f64 })
}

enum OrderOutcome {
  Placed { order_id: i64, remaining: i64 },
  UnknownItem,
  Overflow(i64),
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let email       = input.email.clone();
    let name        = input.name.clone();
    let country_str = encode_country(input.country);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (email, name, country) VALUES (?1, ?2, ?3)",
          rusqlite::params![email, name, country_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    debug!(user_id = id, "user added");
    Ok(User {
      id,
      email:         input.email,
      name:          input.name,
      country:       input.country,
      valid_email:   false,
      average_score: 0.0,
    })
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, id)?))
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User> {
    if patch.is_empty() {
      return self.get_user(id).await?.ok_or(Error::UserNotFound(id));
    }

    let country_str = patch.country.map(encode_country);
    let UserPatch { email, name, .. } = patch;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(current) = select_user(&tx, id)? else {
          return Ok(None);
        };

        let email_changed = email.as_deref().is_some_and(|e| e != current.email);

        tx.execute(
          "UPDATE users
           SET email   = COALESCE(?2, email),
               name    = COALESCE(?3, name),
               country = COALESCE(?4, country)
           WHERE id = ?1",
          rusqlite::params![id, email, name, country_str],
        )?;
        if email_changed {
          tx.execute("UPDATE users SET valid_email = 0 WHERE id = ?1", [id])?;
        }

        let updated = select_user(&tx, id)?;
        tx.commit()?;
        Ok(updated.map(|u| (u, email_changed)))
      })
      .await?;

    let (raw, email_changed) = outcome.ok_or(Error::UserNotFound(id))?;
    if email_changed {
      debug!(user_id = id, "email changed; validity reset");
    }
    raw.into_user()
  }

  async fn validate_email(&self, id: i64) -> Result<User> {
    let raw = self
      .conn
      .call(move |conn| {
        conn.execute("UPDATE users SET valid_email = 1 WHERE id = ?1", [id])?;
        Ok(select_user(conn, id)?)
      })
      .await?;

    raw.ok_or(Error::UserNotFound(id))?.into_user()
  }

  // ── Inventory ─────────────────────────────────────────────────────────────

  async fn add_item(&self, name: String, quantity: i64) -> Result<Item> {
    let name_param = name.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (name, quantity) VALUES (?1, ?2)",
          rusqlite::params![name_param, quantity],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    debug!(item_id = id, item = %name, quantity, "item added");
    Ok(Item { id, name, quantity })
  }

  async fn get_item(&self, name: String) -> Result<Option<Item>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name, quantity FROM items WHERE name = ?1",
                [&name],
                |r| Ok(Item { id: r.get(0)?, name: r.get(1)?, quantity: r.get(2)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn place_order(&self, item_name: String, number: i64) -> Result<Order> {
    let ordered_at = Utc::now();
    let at_str     = encode_dt(ordered_at);
    let name_param = item_name.clone();

    // The new quantity is computed here so an overflow is reported instead of
    // SQLite silently turning the column into a REAL.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(quantity) = tx
          .query_row("SELECT quantity FROM items WHERE name = ?1", [&name_param], |r| {
            r.get::<_, i64>(0)
          })
          .optional()?
        else {
          return Ok(OrderOutcome::UnknownItem);
        };
        let Some(remaining) = quantity.checked_sub(number) else {
          return Ok(OrderOutcome::Overflow(quantity));
        };

        tx.execute(
          "UPDATE items SET quantity = ?2 WHERE name = ?1",
          rusqlite::params![name_param, remaining],
        )?;
        tx.execute(
          "INSERT INTO orders (item_name, number, ordered_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![name_param, number, at_str],
        )?;
        let order_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(OrderOutcome::Placed { order_id, remaining })
      })
      .await?;

    let (id, remaining) = match outcome {
      OrderOutcome::Placed { order_id, remaining } => (order_id, remaining),
      OrderOutcome::UnknownItem => return Err(Error::ItemNotFound(item_name)),
      OrderOutcome::Overflow(quantity) => {
        return Err(Error::QuantityOverflow { item: item_name, quantity, number });
      }
    };
    if remaining < 0 {
      warn!(item = %item_name, remaining, "item quantity is negative");
    } else {
      debug!(item = %item_name, remaining, "order placed");
    }

    Ok(Order { id, item_name, number, ordered_at })
  }

  async fn list_orders(&self, item_name: String) -> Result<Vec<Order>> {
    let raws: Vec<RawOrder> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, item_name, number, ordered_at FROM orders
           WHERE item_name = ?1
           ORDER BY id",
        )?;
        let rows = stmt
          .query_map([&item_name], |r| {
            Ok(RawOrder {
              id:         r.get(0)?,
              item_name:  r.get(1)?,
              number:     r.get(2)?,
              ordered_at: r.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOrder::into_order).collect()
  }

  // ── Bands ─────────────────────────────────────────────────────────────────

  async fn add_band(&self, input: NewBand) -> Result<Band> {
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO metal_bands (band_name, fans, formed, split, origin, style)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![row.band_name, row.fans, row.formed, row.split, row.origin, row.style],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    debug!(band_id = id, band = %input.band_name, "band added");
    Ok(Band {
      id,
      band_name: input.band_name,
      origin:    input.origin,
      fans:      input.fans,
      style:     input.style,
      formed:    input.formed,
      split:     input.split,
    })
  }

  async fn rank_origins(&self) -> Result<Vec<OriginFans>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT origin, SUM(fans) AS nb_fans
             FROM metal_bands
             GROUP BY origin
             ORDER BY nb_fans DESC, origin ASC",
          )?;
          let rows = stmt
            .query_map([], |r| Ok(OriginFans { origin: r.get(0)?, nb_fans: r.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn rank_longevity(&self, style: String, until_year: i32) -> Result<Vec<BandLifespan>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT band_name, COALESCE(split, ?2) - formed AS lifespan
             FROM metal_bands
             WHERE style LIKE '%' || ?1 || '%'
               AND formed IS NOT NULL
             ORDER BY lifespan DESC, band_name ASC",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![style, until_year], |r| {
              Ok(BandLifespan { band_name: r.get(0)?, lifespan: r.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Corrections and scores ────────────────────────────────────────────────

  async fn add_correction(
    &self,
    user_id:      i64,
    project_name: String,
    score:        i64,
  ) -> Result<Correction> {
    let correction = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !user_exists(&tx, user_id)? {
          return Ok(None);
        }

        let existing: Option<i64> = tx
          .query_row("SELECT id FROM projects WHERE name = ?1", [&project_name], |r| {
            r.get(0)
          })
          .optional()?;
        let project_id = match existing {
          Some(id) => id,
          None => {
            tx.execute("INSERT INTO projects (name) VALUES (?1)", [&project_name])?;
            tx.last_insert_rowid()
          }
        };

        tx.execute(
          "INSERT INTO corrections (user_id, project_id, score) VALUES (?1, ?2, ?3)",
          rusqlite::params![user_id, project_id, score],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(Some(Correction { id, user_id, project_id, score }))
      })
      .await?;

    let correction = correction.ok_or(Error::UserNotFound(user_id))?;
    debug!(user_id, project_id = correction.project_id, "correction added");
    Ok(correction)
  }

  async fn add_project(&self, name: String, weight: i64) -> Result<Project> {
    let name_param = name.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (name, weight) VALUES (?1, ?2)",
          rusqlite::params![name_param, weight],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    debug!(project_id = id, project = %name, weight, "project added");
    Ok(Project { id, name, weight })
  }

  async fn get_project(&self, name: String) -> Result<Option<Project>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name, weight FROM projects WHERE name = ?1",
                [&name],
                |r| Ok(Project { id: r.get(0)?, name: r.get(1)?, weight: r.get(2)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_corrections(&self, user_id: i64) -> Result<Vec<Correction>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT id, user_id, project_id, score FROM corrections
             WHERE user_id = ?1
             ORDER BY id",
          )?;
          let rows = stmt
            .query_map([user_id], |r| {
              Ok(Correction {
                id:         r.get(0)?,
                user_id:    r.get(1)?,
                project_id: r.get(2)?,
                score:      r.get(3)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn compute_average_score(&self, user_id: i64) -> Result<f64> {
    let average = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so no correction can land
        // between the read and the write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !user_exists(&tx, user_id)? {
          return Ok(None);
        }

        let average: f64 = tx.query_row(
          "SELECT COALESCE(AVG(score), 0.0) FROM corrections WHERE user_id = ?1",
          [user_id],
          |r| r.get(0),
        )?;
        tx.execute(
          "UPDATE users SET average_score = ?2 WHERE id = ?1",
          rusqlite::params![user_id, average],
        )?;

        tx.commit()?;
        Ok(Some(average))
      })
      .await?;

    let average = average.ok_or(Error::UserNotFound(user_id))?;
    debug!(user_id, average, "average score stored");
    Ok(average)
  }

  async fn compute_average_weighted_score(&self, user_id: i64) -> Result<f64> {
    let average = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !user_exists(&tx, user_id)? {
          return Ok(None);
        }

        let average = weighted_average(&tx, user_id)?;
        tx.execute(
          "UPDATE users SET average_score = ?2 WHERE id = ?1",
          rusqlite::params![user_id, average],
        )?;

        tx.commit()?;
        Ok(Some(average))
      })
      .await?;

    let average = average.ok_or(Error::UserNotFound(user_id))?;
    debug!(user_id, average, "weighted average score stored");
    Ok(average)
  }

  async fn compute_average_weighted_scores(&self) -> Result<usize> {
    let updated = self
      .conn
      .call(|conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut stmt = tx.prepare("SELECT id FROM users ORDER BY id")?;
        let ids = stmt
          .query_map([], |r| r.get::<_, i64>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        for &id in &ids {
          let average = weighted_average(&tx, id)?;
          tx.execute(
            "UPDATE users SET average_score = ?2 WHERE id = ?1",
            rusqlite::params![id, average],
          )?;
        }

        tx.commit()?;
        Ok(ids.len())
      })
      .await?;

    debug!(users = updated, "weighted average scores stored");
    Ok(updated)
  }

  // ── Names and students ────────────────────────────────────────────────────

  async fn add_name(&self, name: String, score: i64) -> Result<()> {
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO names (name, score) VALUES (?1, ?2)",
          rusqlite::params![name, score],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    debug!(name_id = id, score, "name added");
    Ok(())
  }

  async fn count_names_with_initial(
    &self,
    initial:     char,
    below_score: Option<i64>,
  ) -> Result<u64> {
    let (lower, upper) = roster::name_initial_cases(initial)?;
    let (lower, upper) = (lower.to_string(), upper.to_string());

    let count: i64 = self
      .conn
      .call(move |conn| {
        let count = if let Some(below) = below_score {
          conn.query_row(
            &format!(
              "SELECT COUNT(*) FROM names WHERE {} IN (?1, ?2) AND score < ?3",
              schema::NAME_INITIAL_EXPR
            ),
            rusqlite::params![lower, upper, below],
            |r| r.get(0),
          )?
        } else {
          conn.query_row(
            &format!(
              "SELECT COUNT(*) FROM names WHERE {} IN (?1, ?2)",
              schema::NAME_INITIAL_EXPR
            ),
            [&lower, &upper],
            |r| r.get(0),
          )?
        };
        Ok(count)
      })
      .await?;

    debug!(%initial, count, "names counted");
    u64::try_from(count).map_err(|e| Error::Decode(format!("row count {count}: {e}")))
  }

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let name         = input.name.clone();
    let last_meeting = input.last_meeting.map(encode_date);
    let score        = input.score;

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (name, score, last_meeting) VALUES (?1, ?2, ?3)",
          rusqlite::params![name, score, last_meeting],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    debug!(student_id = id, score, "student added");
    Ok(Student { id, name: input.name, score, last_meeting: input.last_meeting })
  }

  async fn students_needing_meeting(&self, today: NaiveDate) -> Result<Vec<Student>> {
    let cutoff = roster::meeting_cutoff(today).map(encode_date);

    let raws: Vec<RawStudent> = self
      .conn
      .call(move |conn| {
        // A NULL cutoff makes the comparison NULL, leaving only students who
        // have never met.
        let mut stmt = conn.prepare(
          "SELECT id, name, score, last_meeting FROM students
           WHERE score < ?1
             AND (last_meeting IS NULL OR last_meeting < ?2)
           ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![MEETING_SCORE_THRESHOLD, cutoff], RawStudent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }
}
