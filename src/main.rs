use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use plant_manager::config::Config;
use plant_manager::db::Database;
use plant_manager::kv::SqliteKv;
use plant_manager::models::*;
use plant_manager::notify::SqliteNotifier;
use plant_manager::scheduler::ReminderScheduler;
use plant_manager::store::PlantStore;

#[derive(Parser)]
#[command(name = "plants")]
#[command(about = "Keep track of when your houseplants need water")]
struct Cli {
    /// SQLite database file (overrides config and PLANT_MANAGER_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List plants, next watering first
    List,
    /// Show one plant
    Show {
        /// Plant id
        id: String,
    },
    /// Add a plant and schedule its watering reminder
    Add(AddArgs),
    /// Remove a plant and cancel its reminder
    Remove {
        /// Plant id
        id: String,
    },
    /// List scheduled watering reminders
    Reminders,
}

#[derive(Args)]
struct AddArgs {
    #[arg(short, long)]
    name: String,
    #[arg(long, default_value = "")]
    about: String,
    #[arg(long, default_value = "")]
    water_tips: String,
    #[arg(long, default_value = "")]
    photo: String,
    /// Where the plant lives; repeat for several
    #[arg(short, long = "environment", required = true)]
    environments: Vec<String>,
    /// Waterings per period
    #[arg(short, long, default_value = "1")]
    times: u32,
    /// Period the waterings are spread over (`week`, `day`, ...)
    #[arg(short, long, default_value = "week")]
    repeat_every: String,
    /// Reference time for reminders (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_at)]
    at: Option<DateTime<FixedOffset>>,
}

fn parse_at(s: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("expected an RFC 3339 time: {}", e))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "plant_manager=info,plants=info".into()),
    );

    // stdout is reserved for command output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

struct App {
    store: PlantStore,
    notifier: SqliteNotifier,
}

fn open(cli_db: Option<PathBuf>) -> anyhow::Result<App> {
    let config = Config::load();
    let path = match cli_db {
        Some(path) => path,
        None => config.database_path()?,
    };

    let db = Database::open(path.clone())
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    db.migrate()?;

    let notifier = SqliteNotifier::new(db.clone());
    let scheduler = ReminderScheduler::with_template(Arc::new(notifier.clone()), config.reminder);
    let store = PlantStore::with_key(Arc::new(SqliteKv::new(db)), scheduler, config.storage_key);

    Ok(App { store, notifier })
}

/// Rough human distance between two instants, e.g. `about 3 hours`.
fn format_distance(distance: Duration) -> String {
    let seconds = distance.num_seconds().abs();
    let minutes = (seconds + 30) / 60;
    let hours = (minutes + 30) / 60;
    let days = (hours + 12) / 24;

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };

    if seconds < 30 {
        "less than a minute".to_string()
    } else if minutes < 45 {
        plural(minutes.max(1), "minute")
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if hours < 24 {
        format!("about {}", plural(hours, "hour"))
    } else if days < 30 {
        plural(days, "day")
    } else {
        format!("about {}", plural((days + 15) / 30, "month"))
    }
}

/// The highlight shown above the list: the first plant due for water.
fn next_watering_line(plants: &[PlantRecord], now: DateTime<Utc>) -> Option<String> {
    let plant = plants.first()?;
    let due = plant.date_time_notification.with_timezone(&Utc) - now;
    let distance = format_distance(due);
    if due >= Duration::zero() {
        Some(format!(
            "Don't forget to water your {} in {}.",
            plant.name, distance
        ))
    } else {
        Some(format!(
            "Don't forget to water your {}, it was due {} ago.",
            plant.name, distance
        ))
    }
}

fn print_plant(plant: &PlantRecord) {
    println!(
        "{}  {}  {} time(s) per {}  [{}]",
        plant.hour,
        plant.name,
        plant.frequency.times,
        plant.frequency.repeat_every,
        plant.environments.join(", ")
    );
    println!("    id: {}", plant.id);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let app = open(cli.db)?;

    match cli.command {
        Commands::List => {
            let plants = app.store.load().await.context("Could not load your plants")?;
            match next_watering_line(&plants, Utc::now()) {
                Some(line) => println!("{}\n", line),
                None => println!("No plants yet. Add one with `plants add`."),
            }
            for plant in &plants {
                print_plant(plant);
            }
        }
        Commands::Show { id } => {
            let plant = app
                .store
                .get(&id)
                .await
                .context("Could not load your plants")?
                .ok_or_else(|| anyhow::anyhow!("No plant with id {}", id))?;
            print_plant(&plant);
            if !plant.about.is_empty() {
                println!("    about: {}", plant.about);
            }
            if !plant.water_tips.is_empty() {
                println!("    water tips: {}", plant.water_tips);
            }
            if !plant.photo.is_empty() {
                println!("    photo: {}", plant.photo);
            }
        }
        Commands::Add(args) => {
            let plant = PlantRecord {
                id: Uuid::new_v4().to_string(),
                name: args.name,
                about: args.about,
                water_tips: args.water_tips,
                photo: args.photo,
                environments: args.environments,
                frequency: Frequency {
                    times: args.times,
                    repeat_every: Cadence::from(args.repeat_every),
                },
                hour: String::new(),
                date_time_notification: args
                    .at
                    .unwrap_or_else(|| chrono::Local::now().fixed_offset()),
            };
            let id = plant.id.clone();
            let name = plant.name.clone();
            app.store
                .save(plant)
                .await
                .with_context(|| format!("Could not save {}", name))?;
            println!("Added {} ({})", name, id);
        }
        Commands::Remove { id } => {
            let name = match app.store.get(&id).await {
                Ok(Some(plant)) => plant.name,
                _ => id.clone(),
            };
            if let Err(e) = app.store.delete(&id).await {
                eprintln!("Could not remove {}", name);
                return Err(e.into());
            }
            println!("Removed {}", name);
        }
        Commands::Reminders => {
            let now = Utc::now();
            let reminders = app.notifier.reminders()?;
            if reminders.is_empty() {
                println!("No reminders scheduled.");
            }
            for reminder in &reminders {
                let next = reminder
                    .next_fire_at(now)
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "done".to_string());
                println!(
                    "{}  every {}s  next {}  {}",
                    reminder.id, reminder.trigger.seconds, next, reminder.content.body
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(name: &str, at: &str) -> PlantRecord {
        PlantRecord {
            id: name.to_lowercase(),
            name: name.to_string(),
            about: String::new(),
            water_tips: String::new(),
            photo: String::new(),
            environments: vec!["kitchen".to_string()],
            frequency: Frequency {
                times: 1,
                repeat_every: Cadence::Week,
            },
            hour: String::new(),
            date_time_notification: DateTime::parse_from_rfc3339(at).unwrap(),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2021-04-20T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_no_line_for_empty_list() {
        assert_eq!(next_watering_line(&[], now()), None);
    }

    #[test]
    fn test_names_first_plant_and_time_left() {
        let plants = vec![
            plant("Imbe", "2021-04-20T13:00:00Z"),
            plant("Zamioculca", "2021-04-22T10:00:00Z"),
        ];
        assert_eq!(
            next_watering_line(&plants, now()).unwrap(),
            "Don't forget to water your Imbe in about 3 hours."
        );
    }

    #[test]
    fn test_overdue_plant_reads_as_past() {
        let plants = vec![plant("Fern", "2021-04-18T10:00:00-00:00")];
        assert_eq!(
            next_watering_line(&plants, now()).unwrap(),
            "Don't forget to water your Fern, it was due 2 days ago."
        );
    }

    #[test]
    fn test_format_distance_buckets() {
        assert_eq!(format_distance(Duration::seconds(10)), "less than a minute");
        assert_eq!(format_distance(Duration::minutes(1)), "1 minute");
        assert_eq!(format_distance(Duration::minutes(20)), "20 minutes");
        assert_eq!(format_distance(Duration::minutes(50)), "about 1 hour");
        assert_eq!(format_distance(Duration::hours(5)), "about 5 hours");
        assert_eq!(format_distance(Duration::days(3)), "3 days");
        assert_eq!(format_distance(Duration::days(65)), "about 2 months");
        assert_eq!(format_distance(-Duration::hours(2)), "about 2 hours");
    }
}
