//! wecare — composition root and command line of the patient registry.
//!
//! Loads configuration, installs logging, opens (and bootstraps) the `SQLite`
//! database, then runs one command against the patient services.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wecare_adapter_storage_sqlite_sqlx::{Database, SqlitePatientRepository};
use wecare_app::list_cache::{ListCache, ListState};
use wecare_app::services::auth_service::AuthService;
use wecare_app::services::patient_service::PatientService;
use wecare_app::sync_bus::{BroadcastHub, SyncBus};
use wecare_domain::error::{NotFoundError, WeCareError};
use wecare_domain::id::PatientId;
use wecare_domain::patient::{NewPatient, Patient, PatientStatus};
use wecare_domain::time::{format_date, start_of_day};

use crate::config::Config;

type Service = PatientService<SqlitePatientRepository, SyncBus>;

#[derive(Parser)]
#[command(name = "wecare")]
#[command(about = "Register, list, update and delete patient records")]
#[command(version)]
struct Cli {
    /// Path of the TOML configuration file
    #[arg(long, global = true, default_value = "wecare.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema and seed the default credential
    Init,
    /// Print every registered patient
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Register a new patient
    Register(RegisterArgs),
    /// Overwrite fields of an existing patient
    Update(UpdateArgs),
    /// Delete a patient
    Delete { id: PatientId },
    /// Check operator credentials
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Print the patient list whenever it changes, until Ctrl-C
    Watch,
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
    /// Date of birth (`YYYY-MM-DD`)
    #[arg(long)]
    dob: NaiveDate,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    medical_history: Option<String>,
}

impl RegisterArgs {
    fn into_new_patient(self) -> Result<NewPatient, WeCareError> {
        let mut builder = NewPatient::builder()
            .full_name(self.name)
            .email(self.email)
            .phone(self.phone)
            .dob(self.dob);
        if let Some(gender) = self.gender {
            builder = builder.gender(gender);
        }
        if let Some(address) = self.address {
            builder = builder.address(address);
        }
        if let Some(history) = self.medical_history {
            builder = builder.medical_history(history);
        }
        builder.build()
    }
}

/// Only the given fields change; an empty string clears an optional one.
#[derive(Args)]
struct UpdateArgs {
    id: PatientId,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    /// Date of birth (`YYYY-MM-DD`)
    #[arg(long)]
    dob: Option<NaiveDate>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    medical_history: Option<String>,
    /// One of `Active`, `Pending`, `Inactive`
    #[arg(long)]
    status: Option<PatientStatus>,
}

impl UpdateArgs {
    fn apply(self, patient: &mut Patient) {
        fn optional(value: String) -> Option<String> {
            Some(value).filter(|v| !v.trim().is_empty())
        }

        if let Some(name) = self.name {
            patient.name = name;
        }
        if let Some(email) = self.email {
            patient.email = email;
        }
        if let Some(phone) = self.phone {
            patient.phone = phone;
        }
        if let Some(dob) = self.dob {
            patient.dob = start_of_day(dob);
        }
        if let Some(gender) = self.gender {
            patient.gender = optional(gender);
        }
        if let Some(address) = self.address {
            patient.address = optional(address);
        }
        if let Some(history) = self.medical_history {
            patient.medical_history = optional(history);
        }
        if let Some(status) = self.status {
            patient.status = status;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let db = Database::open(config.database_url())
        .await
        .context("failed to open database")?;

    let hub = BroadcastHub::default();
    let bus = hub.open(&config.sync.channel);
    tracing::debug!(channel = bus.name(), context = %bus.context_id(), "sync bus opened");

    let result = run(cli.command, &config, &db, &bus).await;
    db.close().await;
    result
}

async fn run(command: Command, config: &Config, db: &Database, bus: &SyncBus) -> anyhow::Result<()> {
    let service = Arc::new(PatientService::new(db.patients(), bus.clone()));

    match command {
        Command::Init => println!("database ready: {}", config.database_url()),
        Command::List { json } => list(&service, json).await?,
        Command::Register(args) => {
            let input = args.into_new_patient()?;
            let id = service
                .register(input)
                .await
                .context("failed to register patient")?;
            println!("registered patient {id}");
        }
        Command::Update(args) => update(&service, args).await?,
        Command::Delete { id } => {
            let deleted = service
                .delete(id)
                .await
                .context("failed to delete patient")?;
            if !deleted {
                return Err(not_found(id).into());
            }
            println!("deleted patient {id}");
        }
        Command::Login { email, password } => {
            let auth = AuthService::new(db.credentials());
            if !auth.login(&email, &password).await {
                bail!("invalid email or password");
            }
            println!("welcome, {email}");
        }
        Command::Watch => watch(service, bus, config.debounce()).await?,
    }
    Ok(())
}

async fn list(service: &Service, json: bool) -> anyhow::Result<()> {
    let listed = service.list().await;
    if let Some(message) = listed.error {
        bail!(message);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&listed.value)?);
    } else {
        print_patients(&listed.value);
    }
    Ok(())
}

async fn update(service: &Service, args: UpdateArgs) -> anyhow::Result<()> {
    let id = args.id;
    let listed = service.list().await;
    if let Some(message) = listed.error {
        bail!(message);
    }
    let mut patient = listed
        .value
        .into_iter()
        .find(|patient| patient.id == id)
        .ok_or_else(|| not_found(id))?;

    args.apply(&mut patient);
    let updated = service
        .update(patient)
        .await
        .context("failed to update patient")?;
    if !updated {
        return Err(not_found(id).into());
    }
    println!("updated patient {id}");
    Ok(())
}

async fn watch(service: Arc<Service>, bus: &SyncBus, debounce: Duration) -> anyhow::Result<()> {
    let cache = Arc::new(ListCache::new(service, debounce));
    let _subscription = cache.follow(bus);
    let mut changes = cache.watch();

    cache.load().await;
    print_state(&cache.state());
    drop(changes.borrow_and_update());

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                if !state.loading {
                    print_state(&state);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }
    Ok(())
}

fn not_found(id: PatientId) -> WeCareError {
    NotFoundError {
        entity: "patient",
        id: id.to_string(),
    }
    .into()
}

fn print_state(state: &ListState) {
    match &state.error {
        Some(message) => eprintln!("error: {message}"),
        None => print_patients(&state.patients),
    }
}

fn print_patients(patients: &[Patient]) {
    if patients.is_empty() {
        println!("no patients registered");
        return;
    }
    println!(
        "{:>4}  {:<24} {:<28} {:<14} {:<10} {:<8} REGISTERED",
        "ID", "NAME", "EMAIL", "PHONE", "DOB", "STATUS"
    );
    for patient in patients {
        println!(
            "{:>4}  {:<24} {:<28} {:<14} {:<10} {:<8} {}",
            patient.id.get(),
            patient.name,
            patient.email,
            patient.phone,
            format_date(patient.dob.date_naive()),
            patient.status.as_str(),
            format_date(patient.registered_date.date_naive()),
        );
    }
}
