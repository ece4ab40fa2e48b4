//! `rowkeep`: command-line front end for the rowkeep store.
//!
//! Every invocation opens the database (provisioning any missing schema),
//! performs one operation, prints its result set on stdout and exits. Logs go
//! to stderr.
//!
//! # Usage
//!
//! ```text
//! rowkeep --database shop.db item add --name apple --quantity 10
//! rowkeep --database shop.db order place --item apple --number 3
//! rowkeep band rank-origins
//! rowkeep --json average user 1 --weighted
//! ```

mod output;
mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::{Datelike as _, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use rowkeep_core::{
  band::NewBand,
  roster::NewStudent,
  safe_divide,
  store::Store,
  user::{Country, NewUser, UserPatch},
};
use rowkeep_store_sqlite::SqliteStore;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use output::{render_rows, render_scalar};
use settings::{Settings, expand_tilde};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rowkeep", version, about = "Schema provisioning and aggregates over SQLite")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rowkeep.toml")]
  config: PathBuf,

  /// SQLite database file; overrides the config file and ROWKEEP_DATABASE.
  #[arg(long, value_name = "PATH")]
  database: Option<PathBuf>,

  /// Print result sets as JSON instead of tab-separated text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create any missing tables, indexes and views.
  Provision,
  #[command(subcommand)]
  User(UserCommand),
  #[command(subcommand)]
  Item(ItemCommand),
  #[command(subcommand)]
  Order(OrderCommand),
  #[command(subcommand)]
  Band(BandCommand),
  #[command(subcommand)]
  Project(ProjectCommand),
  #[command(subcommand)]
  Correction(CorrectionCommand),
  #[command(subcommand)]
  Average(AverageCommand),
  /// Divide A by B, printing 0 when B is 0.
  #[command(allow_negative_numbers = true)]
  SafeDiv { a: i64, b: i64 },
  #[command(subcommand)]
  Names(NamesCommand),
  #[command(subcommand)]
  Students(StudentsCommand),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
  Add {
    #[arg(long)]
    email:   String,
    #[arg(long)]
    name:    Option<String>,
    #[arg(long, default_value_t = Country::default())]
    country: Country,
  },
  /// Update a user; changing the email resets its validation.
  Update {
    id:    i64,
    #[command(flatten)]
    patch: PatchArgs,
  },
  /// Mark the user's current email as validated.
  Validate { id: i64 },
  Show { id: i64 },
}

#[derive(Args, Debug)]
struct PatchArgs {
  #[arg(long)]
  email:   Option<String>,
  #[arg(long)]
  name:    Option<String>,
  #[arg(long)]
  country: Option<Country>,
}

impl From<PatchArgs> for UserPatch {
  fn from(args: PatchArgs) -> Self {
    UserPatch { email: args.email, name: args.name, country: args.country }
  }
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
  Add {
    #[arg(long)]
    name:     String,
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    quantity: i64,
  },
  Show { name: String },
}

#[derive(Subcommand, Debug)]
enum OrderCommand {
  /// Record an order and decrement the item's quantity.
  Place {
    #[arg(long)]
    item:   String,
    #[arg(long)]
    number: i64,
  },
  List { item: String },
}

#[derive(Subcommand, Debug)]
enum BandCommand {
  Add {
    #[arg(long)]
    name:   String,
    #[arg(long)]
    origin: String,
    #[arg(long, default_value_t = 0)]
    fans:   i64,
    #[arg(long)]
    style:  Option<String>,
    #[arg(long)]
    formed: Option<i32>,
    #[arg(long)]
    split:  Option<i32>,
  },
  /// Total fans per origin, largest first.
  RankOrigins,
  /// Bands of a style ranked by lifespan.
  Longevity {
    #[arg(long, default_value = "Glam rock")]
    style:      String,
    /// End year for bands that have not split.
    #[arg(long)]
    until_year: Option<i32>,
  },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
  Add {
    #[arg(long)]
    name:   String,
    #[arg(long, default_value_t = 1)]
    weight: i64,
  },
}

#[derive(Subcommand, Debug)]
enum CorrectionCommand {
  /// Record a score, creating the project if it does not exist.
  Add {
    #[arg(long)]
    user:    i64,
    #[arg(long)]
    project: String,
    #[arg(long)]
    score:   i64,
  },
  List { user: i64 },
}

#[derive(Subcommand, Debug)]
enum AverageCommand {
  /// Compute and store one user's average score.
  User {
    id:       i64,
    #[arg(long)]
    weighted: bool,
  },
  /// Compute and store the weighted average for every user.
  AllWeighted,
}

#[derive(Subcommand, Debug)]
enum NamesCommand {
  Add { name: String, score: i64 },
  /// Count names by first letter.
  Count {
    initial: char,
    /// Only count names scoring below this.
    #[arg(long)]
    below:   Option<i64>,
  },
}

#[derive(Subcommand, Debug)]
enum StudentsCommand {
  Add {
    #[arg(long)]
    name:         String,
    #[arg(long)]
    score:        i64,
    /// Date of the last meeting, YYYY-MM-DD.
    #[arg(long)]
    last_meeting: Option<NaiveDate>,
  },
  /// Students scoring under 80 without a meeting in the last month.
  NeedMeeting {
    /// Evaluate as of this date instead of today.
    #[arg(long)]
    today: Option<NaiveDate>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Pure; no database needed.
  if let Command::SafeDiv { a, b } = cli.command {
    println!("{}", render_scalar("SafeDiv", safe_divide(a, b), cli.json)?);
    return Ok(());
  }

  let mut settings = Settings::load(&cli.config)?;
  if let Some(database) = &cli.database {
    settings.database = expand_tilde(database);
  }

  let store = SqliteStore::open(&settings.database)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.database))?;

  if let Command::Provision = cli.command {
    store.provision().await.context("provisioning failed")?;
    info!(
      database = %settings.database.display(),
      version = rowkeep_store_sqlite::SCHEMA_VERSION,
      "schema provisioned"
    );
    return Ok(());
  }

  let out = run(&store, &settings, cli.command, cli.json).await?;
  if !out.is_empty() {
    println!("{out}");
  }
  Ok(())
}

/// Perform one operation against `store` and render its result set.
async fn run<S: Store>(
  store:    &S,
  settings: &Settings,
  command:  Command,
  json:     bool,
) -> Result<String> {
  let out = match command {
    Command::Provision | Command::SafeDiv { .. } => String::new(),

    Command::User(cmd) => match cmd {
      UserCommand::Add { email, name, country } => {
        let user = store
          .add_user(NewUser { email, name, country })
          .await
          .context("failed to add user")?;
        render_rows(&[user], json)?
      }
      UserCommand::Update { id, patch } => {
        let user = store
          .update_user(id, patch.into())
          .await
          .with_context(|| format!("failed to update user {id}"))?;
        render_rows(&[user], json)?
      }
      UserCommand::Validate { id } => {
        let user = store
          .validate_email(id)
          .await
          .with_context(|| format!("failed to validate user {id}"))?;
        render_rows(&[user], json)?
      }
      UserCommand::Show { id } => {
        let user = store
          .get_user(id)
          .await?
          .with_context(|| format!("user {id} not found"))?;
        render_rows(&[user], json)?
      }
    },

    Command::Item(cmd) => match cmd {
      ItemCommand::Add { name, quantity } => {
        let item = store.add_item(name, quantity).await.context("failed to add item")?;
        render_rows(&[item], json)?
      }
      ItemCommand::Show { name } => {
        let item = store
          .get_item(name.clone())
          .await?
          .with_context(|| format!("item {name:?} not found"))?;
        render_rows(&[item], json)?
      }
    },

    Command::Order(cmd) => match cmd {
      OrderCommand::Place { item, number } => {
        let order = store
          .place_order(item, number)
          .await
          .context("failed to place order")?;
        render_rows(&[order], json)?
      }
      OrderCommand::List { item } => render_rows(&store.list_orders(item).await?, json)?,
    },

    Command::Band(cmd) => match cmd {
      BandCommand::Add { name, origin, fans, style, formed, split } => {
        let band = store
          .add_band(NewBand { band_name: name, origin, fans, style, formed, split })
          .await
          .context("failed to add band")?;
        render_rows(&[band], json)?
      }
      BandCommand::RankOrigins => render_rows(&store.rank_origins().await?, json)?,
      BandCommand::Longevity { style, until_year } => {
        let until_year = until_year
          .or(settings.lifespan_reference_year)
          .unwrap_or_else(|| Utc::now().year());
        render_rows(&store.rank_longevity(style, until_year).await?, json)?
      }
    },

    Command::Project(ProjectCommand::Add { name, weight }) => {
      let project = store
        .add_project(name, weight)
        .await
        .context("failed to add project")?;
      render_rows(&[project], json)?
    }

    Command::Correction(cmd) => match cmd {
      CorrectionCommand::Add { user, project, score } => {
        let correction = store
          .add_correction(user, project, score)
          .await
          .context("failed to add correction")?;
        render_rows(&[correction], json)?
      }
      CorrectionCommand::List { user } => {
        render_rows(&store.list_corrections(user).await?, json)?
      }
    },

    Command::Average(cmd) => match cmd {
      AverageCommand::User { id, weighted } => {
        let average = if weighted {
          store.compute_average_weighted_score(id).await
        } else {
          store.compute_average_score(id).await
        }
        .with_context(|| format!("failed to compute average for user {id}"))?;
        render_scalar("average_score", average, json)?
      }
      AverageCommand::AllWeighted => {
        let updated = store
          .compute_average_weighted_scores()
          .await
          .context("failed to compute weighted averages")?;
        render_scalar("users_updated", updated, json)?
      }
    },

    Command::Names(cmd) => match cmd {
      NamesCommand::Add { name, score } => {
        store.add_name(name, score).await.context("failed to add name")?;
        String::new()
      }
      NamesCommand::Count { initial, below } => {
        let count = store.count_names_with_initial(initial, below).await?;
        render_scalar("count", count, json)?
      }
    },

    Command::Students(cmd) => match cmd {
      StudentsCommand::Add { name, score, last_meeting } => {
        let student = store
          .add_student(NewStudent { name, score, last_meeting })
          .await
          .context("failed to add student")?;
        render_rows(&[student], json)?
      }
      StudentsCommand::NeedMeeting { today } => {
        let today = today.unwrap_or_else(|| Utc::now().date_naive());
        render_rows(&store.students_needing_meeting(today).await?, json)?
      }
    },
  };

  Ok(out)
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_definition_is_consistent() { Cli::command().debug_assert(); }

  #[test]
  fn safe_div_accepts_negative_operands() {
    let cli = Cli::try_parse_from(["rowkeep", "safe-div", "-7", "2"]).unwrap();
    assert!(matches!(cli.command, Command::SafeDiv { a: -7, b: 2 }));
  }

  #[test]
  fn user_add_defaults_country() {
    let cli = Cli::try_parse_from(["rowkeep", "user", "add", "--email", "bob@dylan.com"]).unwrap();
    match cli.command {
      Command::User(UserCommand::Add { country, .. }) => assert_eq!(country, Country::Us),
      other => panic!("unexpected command {other:?}"),
    }
  }

  #[test]
  fn user_add_rejects_unknown_country() {
    let result =
      Cli::try_parse_from(["rowkeep", "user", "add", "--email", "a@b.c", "--country", "FR"]);
    assert!(result.is_err());
  }

  #[test]
  fn json_flag_is_global() {
    let cli = Cli::try_parse_from(["rowkeep", "band", "rank-origins", "--json"]).unwrap();
    assert!(cli.json);
  }

  #[tokio::test]
  async fn run_renders_origin_ranking() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for (name, origin, fans) in [("A", "USA", 100), ("B", "USA", 50), ("C", "UK", 30)] {
      store.add_band(NewBand::new(name, origin, fans)).await.unwrap();
    }
    let settings = Settings { database: PathBuf::from(":memory:"), lifespan_reference_year: None };

    let out = run(&store, &settings, Command::Band(BandCommand::RankOrigins), false)
      .await
      .unwrap();
    assert_eq!(out, "origin\tnb_fans\nUSA\t150\nUK\t30");
  }

  #[tokio::test]
  async fn run_uses_configured_reference_year() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .add_band(NewBand::new("Alice Cooper", "USA", 50).with_style("Glam rock").active_between(1964, None))
      .await
      .unwrap();
    let settings =
      Settings { database: PathBuf::from(":memory:"), lifespan_reference_year: Some(2022) };

    let command = Command::Band(BandCommand::Longevity { style: "Glam rock".into(), until_year: None });
    let out = run(&store, &settings, command, false).await.unwrap();
    assert_eq!(out, "band_name\tlifespan\nAlice Cooper\t58");
  }
}
