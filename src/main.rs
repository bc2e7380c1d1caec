use clap::{Parser, Subcommand, ValueEnum};
use coop_enrollment::application::approval::ApprovalWorkflow;
use coop_enrollment::application::payment_form::{FormField, PaymentForm, PaymentFormHandler};
use coop_enrollment::application::review::{ReviewOutcome, ReviewScreen};
use coop_enrollment::config::{DEFAULT_LOG_LEVEL, DEFAULT_MEMBERSHIP_PREFIX, TelemetryConfig, WorkflowConfig};
use coop_enrollment::domain::application::{ApplicationId, EnrollmentApplication};
use coop_enrollment::domain::entity::{EntityKind, Fields, to_fields};
use coop_enrollment::domain::payment::{DEFAULT_PAYMENT_DUE_DAYS, PaymentMethod, PaymentSubmission};
use coop_enrollment::domain::plan::{Plan, find_plan};
use coop_enrollment::domain::ports::{EntityStore, EntityStoreBox, MembershipNumberGeneratorBox, ProofFile};
use coop_enrollment::error::EnrollmentError;
use coop_enrollment::infrastructure::clock::SystemClock;
use coop_enrollment::infrastructure::identity::{SequentialMembershipNumbers, UuidMembershipNumbers};
use coop_enrollment::infrastructure::in_memory::InMemoryEntityStore;
use coop_enrollment::infrastructure::local_uploader::LocalFileUploader;
use coop_enrollment::infrastructure::notifier::TracingNotifier;
#[cfg(feature = "storage-rocksdb")]
use coop_enrollment::infrastructure::rocksdb::RocksDBEntityStore;
use coop_enrollment::interfaces::csv::application_reader::ApplicationReader;
use coop_enrollment::interfaces::csv::member_writer::MemberWriter;
use coop_enrollment::interfaces::csv::plan_reader::PlanReader;
use coop_enrollment::telemetry;
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "COOP_LOG", default_value = DEFAULT_LOG_LEVEL, global = true)]
    log_level: String,

    /// Prefix of generated membership numbers
    #[arg(long, env = "COOP_MEMBERSHIP_PREFIX", default_value = DEFAULT_MEMBERSHIP_PREFIX, global = true)]
    membership_prefix: String,

    /// Days until the enrollment fee of an approved member is due
    #[arg(long, env = "COOP_PAYMENT_DUE_DAYS", default_value_t = DEFAULT_PAYMENT_DUE_DAYS, global = true)]
    payment_due_days: i64,

    /// How membership numbers are issued [default: uuid with --db-path, sequential otherwise]
    #[arg(long, value_enum, global = true)]
    numbering: Option<Numbering>,

    /// First number handed out by sequential numbering
    #[arg(long, default_value_t = 1, global = true)]
    first_number: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Numbering {
    Sequential,
    Uuid,
}

#[derive(Subcommand)]
enum Command {
    /// Approve an application, creating the member and its pending enrollment fee
    Approve {
        /// Applications CSV file
        applications: PathBuf,
        /// Plan catalog CSV file
        plans: PathBuf,
        /// Id of the application to approve
        #[arg(long)]
        id: String,
    },
    /// Reject an application
    Reject {
        /// Applications CSV file
        applications: PathBuf,
        /// Plan catalog CSV file
        plans: PathBuf,
        /// Id of the application to reject
        #[arg(long)]
        id: String,
    },
    /// Report payment of the enrollment fee for an application
    Pay {
        /// Applications CSV file
        applications: PathBuf,
        /// Plan catalog CSV file
        plans: PathBuf,
        /// Id of the paying application
        #[arg(long)]
        id: String,
        /// bank_transfer, bank_deposit, multicaixa or cash
        #[arg(long)]
        method: Option<PaymentMethod>,
        /// Payment reference or receipt number
        #[arg(long, default_value = "")]
        reference: String,
        /// Proof of payment (image or PDF)
        #[arg(long)]
        proof: Option<PathBuf>,
        #[arg(long)]
        notes: Option<String>,
        /// Directory receiving uploaded proofs
        #[arg(long, default_value = "uploads")]
        uploads_dir: PathBuf,
    },
}

enum Store {
    Memory(InMemoryEntityStore),
    #[cfg(feature = "storage-rocksdb")]
    RocksDB(RocksDBEntityStore),
}

impl Store {
    fn open(db_path: Option<&Path>) -> Result<Self> {
        match db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(path) => Ok(Store::RocksDB(
                RocksDBEntityStore::open(path).into_diagnostic()?,
            )),
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(_) => {
                warn!(
                    "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
                );
                Ok(Store::Memory(InMemoryEntityStore::new()))
            }
            None => Ok(Store::Memory(InMemoryEntityStore::new())),
        }
    }

    async fn seed(&self, kind: EntityKind, fields: Fields) -> Result<bool> {
        match self {
            Store::Memory(store) => store.seed(kind, fields).await.into_diagnostic(),
            #[cfg(feature = "storage-rocksdb")]
            Store::RocksDB(store) => store.seed(kind, fields).await.into_diagnostic(),
        }
    }

    fn boxed(&self) -> EntityStoreBox {
        match self {
            Store::Memory(store) => Box::new(store.clone()),
            #[cfg(feature = "storage-rocksdb")]
            Store::RocksDB(store) => Box::new(store.clone()),
        }
    }
}

fn read_plans(path: &Path) -> Result<Vec<Plan>> {
    let file = File::open(path).into_diagnostic()?;
    PlanReader::new(file)
        .plans()
        .collect::<Result<Vec<_>, _>>()
        .into_diagnostic()
}

/// Reads the applications file, skipping rows that fail to parse.
fn read_applications(path: &Path) -> Result<Vec<EnrollmentApplication>> {
    let file = File::open(path).into_diagnostic()?;
    let mut applications = Vec::new();
    for result in ApplicationReader::new(file).applications() {
        match result {
            Ok(application) => applications.push(application),
            Err(e) => warn!(error = %e, "Error reading application"),
        }
    }
    Ok(applications)
}

/// Seeds the store with the CSV applications and returns the stored version of `id`.
async fn load_application(
    store: &Store,
    applications: Vec<EnrollmentApplication>,
    id: &str,
) -> Result<EnrollmentApplication> {
    for application in &applications {
        store
            .seed(EntityKind::Application, to_fields(application).into_diagnostic()?)
            .await?;
    }
    let record = store
        .boxed()
        .get(EntityKind::Application, id)
        .await
        .into_diagnostic()?
        .ok_or_else(|| {
            EnrollmentError::NotFound {
                kind: EntityKind::Application,
                id: id.to_string(),
            }
        })
        .into_diagnostic()?;
    record.into_entity().into_diagnostic()
}

fn numbers(cli: &Cli, config: &WorkflowConfig) -> MembershipNumberGeneratorBox {
    let numbering = cli.numbering.unwrap_or(if cli.db_path.is_some() {
        Numbering::Uuid
    } else {
        Numbering::Sequential
    });
    match numbering {
        Numbering::Sequential => Box::new(SequentialMembershipNumbers::new(
            config.membership_prefix.clone(),
            cli.first_number,
        )),
        Numbering::Uuid => Box::new(UuidMembershipNumbers::new(config.membership_prefix.clone())),
    }
}

fn content_type_of(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

struct PrintSubmission;

impl PaymentFormHandler for PrintSubmission {
    fn on_submit(&self, submission: PaymentSubmission) {
        match serde_json::to_string(&submission) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!(error = %e, "unable to print submission"),
        }
    }

    fn on_back(&self) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init(&TelemetryConfig {
        log_level: cli.log_level.clone(),
    })
    .into_diagnostic()?;

    let config =
        WorkflowConfig::new(cli.membership_prefix.clone(), cli.payment_due_days).into_diagnostic()?;
    let store = Store::open(cli.db_path.as_deref())?;

    match &cli.command {
        Command::Approve {
            applications,
            plans,
            id,
        }
        | Command::Reject {
            applications,
            plans,
            id,
        } => {
            let plans = read_plans(plans)?;
            let application =
                load_application(&store, read_applications(applications)?, id).await?;

            let workflow = ApprovalWorkflow::new(
                store.boxed(),
                numbers(&cli, &config),
                Box::new(SystemClock),
                config.clone(),
            );
            let mut screen =
                ReviewScreen::new(application, plans, workflow, Box::new(TracingNotifier));

            if matches!(cli.command, Command::Approve { .. }) {
                screen.request_approve().into_diagnostic()?;
            } else {
                screen.request_reject().into_diagnostic()?;
            }

            match screen.confirm().await.into_diagnostic()? {
                ReviewOutcome::Approved(approval) => {
                    let stdout = io::stdout();
                    let mut writer = MemberWriter::new(stdout.lock());
                    writer.write_members([&approval.member]).into_diagnostic()?;
                }
                ReviewOutcome::Rejected(rejection) => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "application_id": rejection.application_id,
                            "status": "rejected",
                            "rejected_on": rejection.rejected_on,
                        })
                    );
                }
                ReviewOutcome::Failed(err) => return Err(err).into_diagnostic(),
            }
        }
        Command::Pay {
            applications,
            plans,
            id,
            method,
            reference,
            proof,
            notes,
            uploads_dir,
        } => {
            let plans = read_plans(plans)?;
            let application = read_applications(applications)?
                .into_iter()
                .find(|application| application.id == ApplicationId::new(id.as_str()))
                .ok_or_else(|| miette!("Application not found: {id}"))?;
            let plan = find_plan(&plans, &application.plan_id)
                .cloned()
                .ok_or_else(|| EnrollmentError::PlanNotFound(application.plan_id.clone()))
                .into_diagnostic()?;

            let mut form = PaymentForm::new(
                application,
                plan,
                Box::new(PrintSubmission),
                Box::new(SystemClock),
            );
            form.set_method(*method);
            form.set_reference(reference.as_str());
            if let Some(notes) = notes {
                form.set_notes(notes.as_str());
            }

            if let Some(path) = proof {
                let bytes = std::fs::read(path).into_diagnostic()?;
                let name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("proof")
                    .to_string();
                let uploader = LocalFileUploader::new(uploads_dir.clone());
                form.upload_proof(&uploader, ProofFile::new(name, content_type_of(path), bytes))
                    .await;
                if let Some(message) = form.error(FormField::Proof) {
                    warn!("{message}");
                }
            }

            if form.submit().is_err() {
                for message in form.errors().values() {
                    eprintln!("{message}");
                }
                return Err(miette!("Payment form is incomplete"));
            }
        }
    }

    Ok(())
}
