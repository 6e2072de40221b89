//! # CareCall: Care-Task Trigger & Ownership Engine
//!
//! Turns lesson completions into customer-care follow-up tasks and serves
//! role-scoped task listings.
//!
//! Usage:
//!   carecall init                              # Create the database schema
//!   carecall seed fixture.json                 # Load departments, teams, students, bookings
//!   carecall complete --booking 42             # Mark a lesson completed and run the engine
//!   carecall complete --booking 42 --absent    # Same, student absent
//!   carecall list --as 100 --type checking     # Tasks visible to admin 100
//!   carecall reconcile --watch                 # Promote waiting tasks on an interval

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use carecall_access::{OwnershipResolver, TaskActions, TaskListRequest, TaskQueryFacade};
use carecall_core::traits::{NotificationSink, StudentRecords};
use carecall_core::{BookingStatus, CareConfig, TaskStatus, TaskType};
use carecall_db::{CareDb, Fixture};
use carecall_scheduler::{NotificationEmitter, NotifyRouter, Reconciler, TriggerEngine, spawn_reconciler};

#[derive(Parser)]
#[command(name = "carecall", version, about = "📋 CareCall: care-task trigger & ownership engine")]
struct Cli {
    /// Config file (default: ~/.carecall/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overrides the config
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and write a default config if none exists
    Init,
    /// Load a JSON fixture of collaborator records
    Seed { file: PathBuf },
    /// Mark a booking terminal and evaluate every triggered task type
    Complete {
        #[arg(long)]
        booking: i64,
        /// Student was absent instead of completing the lesson
        #[arg(long)]
        absent: bool,
    },
    /// Create the greeting task for an enrollment
    Greet {
        #[arg(long)]
        student: i64,
        #[arg(long)]
        enrollment: i64,
    },
    /// List tasks visible to an admin
    List {
        /// Requesting admin id
        #[arg(long = "as")]
        as_admin: i64,
        #[arg(long = "type")]
        task_type: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// Staff id, or -1 for unassigned
        #[arg(long, allow_hyphen_values = true)]
        staff: Option<String>,
        /// Reporter id for periodic reports, or -1
        #[arg(long, allow_hyphen_values = true)]
        reporter: Option<String>,
        #[arg(long)]
        student: Option<i64>,
        #[arg(long)]
        search: Option<String>,
        /// deadline | created_at
        #[arg(long)]
        date_field: Option<String>,
        #[arg(long)]
        from: Option<i64>,
        #[arg(long)]
        to: Option<i64>,
        /// asc | desc
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Change a task's status
    Status {
        #[arg(long = "as")]
        as_admin: i64,
        #[arg(long)]
        task: i64,
        /// not_done | done | waiting_next_booking
        status: String,
    },
    /// Append a note to a task
    Note {
        #[arg(long = "as")]
        as_admin: i64,
        #[arg(long)]
        task: i64,
        body: String,
    },
    /// Remove a task (managers only)
    Remove {
        #[arg(long = "as")]
        as_admin: i64,
        #[arg(long)]
        task: i64,
    },
    /// Promote waiting tasks once, or keep running with --watch
    Reconcile {
        #[arg(long)]
        watch: bool,
    },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CareConfig> {
    let config = match path {
        Some(path) => CareConfig::load_from(path)?,
        None => CareConfig::load()?,
    };
    Ok(config)
}

/// Engine wired to the database and an in-process notification router.
fn trigger_engine(config: &CareConfig, db: &Arc<CareDb>, router: &Arc<NotifyRouter>) -> Result<TriggerEngine> {
    let sink: Arc<dyn NotificationSink> = router.clone();
    let emitter = NotificationEmitter::from_config(&config.notify, sink)?;
    Ok(TriggerEngine::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        emitter,
        &config.departments,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "carecall=debug,carecall_db=debug,carecall_scheduler=debug,carecall_access=debug"
    } else {
        "carecall=info,carecall_db=info,carecall_scheduler=info,carecall_access=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())?;
    let db_path = expand_path(cli.db_path.as_deref().unwrap_or(&config.database.path));
    let db = Arc::new(
        CareDb::open(Path::new(&db_path)).with_context(|| format!("Failed to open database at {db_path}"))?,
    );

    match cli.command {
        Commands::Init => {
            let config_path = cli.config.clone().unwrap_or_else(CareConfig::default_path);
            if !config_path.exists() {
                config.save_to(&config_path)?;
                println!("✅ Config written to {}", config_path.display());
            }
            println!("✅ Database ready at {db_path}");
        }
        Commands::Seed { file } => {
            let fixture = Fixture::load(&file).with_context(|| format!("Failed to load {}", file.display()))?;
            fixture.apply(&db)?;
            println!("🌱 Seeded from {}", file.display());
        }
        Commands::Complete { booking, absent } => {
            let new_status = if absent {
                BookingStatus::StudentAbsent
            } else {
                BookingStatus::Completed
            };
            let mut record = db
                .booking(booking)
                .await?
                .with_context(|| format!("Booking {booking} not found"))?;
            let previous = db.set_booking_status(booking, new_status)?;
            record.status = new_status;

            let router = Arc::new(NotifyRouter::new(config.notify.history_limit));
            let engine = trigger_engine(&config, &db, &router)?;
            let report = engine.on_booking_terminal_status(&record, previous, new_status).await?;
            print_json(&serde_json::json!({
                "report": report,
                "notifications": router.history().await,
            }))?;
        }
        Commands::Greet { student, enrollment } => {
            let router = Arc::new(NotifyRouter::new(config.notify.history_limit));
            let engine = trigger_engine(&config, &db, &router)?;
            let outcome = engine.create_adhoc(TaskType::Greeting, student, enrollment).await?;
            print_json(&outcome)?;
        }
        Commands::List {
            as_admin,
            task_type,
            status,
            staff,
            reporter,
            student,
            search,
            date_field,
            from,
            to,
            sort,
            page,
            page_size,
        } => {
            let resolver = Arc::new(OwnershipResolver::new(db.clone(), &config.departments));
            let requester = resolver.requester(as_admin).await?;
            let facade = TaskQueryFacade::new(db.clone(), resolver, config.query.clone());
            let request = TaskListRequest {
                task_type,
                status,
                student_id: student,
                date_field,
                date_from: from,
                date_to: to,
                search,
                staff_id: staff,
                reporter_id: reporter,
                sort_direction: sort,
                page,
                page_size,
                ..Default::default()
            };
            print_json(&facade.list(&requester, &request).await?)?;
        }
        Commands::Status { as_admin, task, status } => {
            let resolver = Arc::new(OwnershipResolver::new(db.clone(), &config.departments));
            let requester = resolver.requester(as_admin).await?;
            let status: TaskStatus = status.parse()?;
            let actions = TaskActions::new(db.clone(), resolver);
            print_json(&actions.set_status(&requester, task, status).await?)?;
        }
        Commands::Note { as_admin, task, body } => {
            let resolver = Arc::new(OwnershipResolver::new(db.clone(), &config.departments));
            let requester = resolver.requester(as_admin).await?;
            let actions = TaskActions::new(db.clone(), resolver);
            print_json(&actions.append_note(&requester, task, &body).await?)?;
        }
        Commands::Remove { as_admin, task } => {
            let resolver = Arc::new(OwnershipResolver::new(db.clone(), &config.departments));
            let requester = resolver.requester(as_admin).await?;
            let actions = TaskActions::new(db.clone(), resolver);
            actions.remove(&requester, task).await?;
            println!("🗑️ Task {task} removed");
        }
        Commands::Reconcile { watch } => {
            let reconciler = Arc::new(Reconciler::new(db.clone(), db.clone()));
            if watch {
                tokio::select! {
                    _ = spawn_reconciler(reconciler, config.reconcile.interval_secs) => {}
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("👋 Reconciler stopped");
                    }
                }
            } else {
                let report = reconciler.reconcile_waiting(carecall_core::now_millis()).await?;
                print_json(&report)?;
            }
        }
    }

    Ok(())
}
