use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod api;
mod config;
mod download;
mod events;
mod export;
mod filter;
mod import;
mod models;
mod notify;
mod report;
mod roster;
mod store;

use api::ApiClient;
use config::Config;
use download::SpecialExport;
use events::{AttendanceMethod, AttendanceStatus, EventFields, EventsClient, RegistrationData};
use models::{
    Attendance, Field, FilterCriteria, PhoneConfirmation, RecordDraft, RecordPatch, Scope, StatusFilter,
};
use notify::{LocalNotifications, NotificationCenter};
use roster::Roster;
use store::HttpRecordStore;

#[derive(Parser)]
#[command(name = "batchmate-roster")]
#[command(about = "Search, summarise, import and export the batchmate directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Matches calling name, full name, email or nickname
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    field: Option<Field>,
    #[arg(long)]
    country: Option<String>,
    /// yes, no, unset or all
    #[arg(long, default_value = "all")]
    phone: StatusFilter<PhoneConfirmation>,
    /// present, absent, unset or all
    #[arg(long, default_value = "all")]
    attendance: StatusFilter<Attendance>,
    #[arg(long)]
    working_place: Option<String>,
    #[arg(long)]
    nick_name: Option<String>,
    #[arg(long)]
    calling_name: Option<String>,
    #[arg(long)]
    full_name: Option<String>,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            term: self.search.clone(),
            field: self.field,
            country: self.country.clone(),
            phone_confirmation: self.phone,
            attendance: self.attendance,
            working_place: self.working_place.clone(),
            nick_name: self.nick_name.clone(),
            calling_name: self.calling_name.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Optional profile members shared by `add` and `edit`; blanks count as unset.
#[derive(Args, Debug, Clone, Default)]
struct DetailArgs {
    #[arg(long)]
    nick_name: Option<String>,
    #[arg(long)]
    mobile: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    working_place: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportFormat {
    Xlsx,
    Pdf,
}

#[derive(Subcommand)]
enum Commands {
    /// List records, phone-confirmed first
    List {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print counts by field, country and status
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
        /// List every country instead of the most populated ones
        #[arg(long)]
        all_countries: bool,
    },
    /// Generate a markdown summary
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 5)]
        top_countries: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Import records from a spreadsheet or CSV file
    Import {
        #[arg(long)]
        file: PathBuf,
        /// Category for every imported row; defaults to the assigned field
        #[arg(long)]
        field: Option<Field>,
    },
    /// Write the filtered records to a spreadsheet or PDF
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value = "xlsx")]
        format: ExportFormat,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Save a server-rendered export
    Download {
        #[arg(value_enum)]
        kind: SpecialExport,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Add a single record
    Add {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        calling_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = "")]
        whatsapp: String,
        #[arg(long)]
        field: Option<Field>,
        #[command(flatten)]
        details: DetailArgs,
    },
    /// Change any editable member of a record
    Edit {
        id: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        calling_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        whatsapp: Option<String>,
        #[arg(long)]
        field: Option<Field>,
        #[arg(long)]
        phone: Option<PhoneConfirmation>,
        #[arg(long)]
        attendance: Option<Attendance>,
        #[command(flatten)]
        details: DetailArgs,
    },
    /// Record phone confirmation or attendance
    #[command(group(
        ArgGroup::new("status")
            .args(["phone", "attendance"])
            .required(true)
            .multiple(true)
    ))]
    Mark {
        id: String,
        #[arg(long)]
        phone: Option<PhoneConfirmation>,
        #[arg(long)]
        attendance: Option<Attendance>,
    },
    /// Delete a record
    Remove { id: String },
    /// Activity notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationCommand,
    },
    /// Manage events and their QR codes
    Events {
        #[command(subcommand)]
        action: EventCommand,
    },
    /// Take and review event attendance
    Attendance {
        #[command(subcommand)]
        action: AttendanceCommand,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct EventArgs {
    #[arg(long)]
    description: Option<String>,
    /// ISO date or date-time
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    event_type: Option<String>,
    #[arg(long)]
    venue: Option<String>,
    #[arg(long)]
    status: Option<String>,
}

impl EventArgs {
    fn fields(self, name: Option<String>) -> EventFields {
        EventFields {
            name: non_blank(name),
            description: non_blank(self.description),
            event_date: non_blank(self.date),
            event_type: non_blank(self.event_type),
            venue: non_blank(self.venue),
            status: non_blank(self.status),
        }
    }
}

#[derive(Subcommand)]
enum EventCommand {
    List,
    Show { id: String },
    Create {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        details: EventArgs,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        details: EventArgs,
    },
    Delete { id: String },
    /// Attendance totals for one event
    Stats { id: String },
    /// Generate the event's registration QR code
    Qr { id: String },
}

#[derive(Subcommand)]
enum AttendanceCommand {
    /// Attendance taken at one event
    List {
        event: String,
        /// Matches the batchmate's name
        #[arg(long)]
        search: Option<String>,
        /// pending, present or absent
        #[arg(long)]
        status: Option<AttendanceStatus>,
        /// qr-scan, manual or not-marked
        #[arg(long)]
        method: Option<AttendanceMethod>,
    },
    /// Look a batchmate up by mobile number
    Check { mobile: String },
    /// Register attendance as a QR scan would
    Register {
        event: String,
        #[arg(long)]
        mobile: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        whatsapp: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        gmail: Option<String>,
        #[arg(long)]
        nick_name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        working_place: Option<String>,
    },
    /// Mark one batchmate by hand
    Mark {
        event: i64,
        batchmate: i64,
        #[arg(long)]
        status: AttendanceStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark many batchmates from a CSV with batchmateId,status,notes columns
    BulkMark {
        event: i64,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum NotificationCommand {
    List,
    Read { id: String },
    ReadAll,
    Delete { id: String },
    Unread,
    /// Announce a newly created user account
    NewUser {
        username: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        field: Option<Field>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;
    let api = ApiClient::from_config(&config).context("failed to build HTTP client")?;
    let store = HttpRecordStore::new(api.clone(), config.page_size);
    let today = Local::now().date_naive();

    match cli.command {
        Commands::List { filters, limit } => {
            let roster = Roster::load(&store, config.scope).await?;
            let records = roster.view(&filters.criteria());
            if records.is_empty() {
                println!("No records match these filters.");
                if filters.country.is_some() {
                    let known = filter::available_countries(roster.records());
                    println!("Known countries: {}", known.join(", "));
                }
                return Ok(());
            }

            println!("{} records for {}:", records.len(), config.scope.label());
            for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
                println!(
                    "- [{}] {} ({}, {}) {} phone: {} attendance: {}",
                    record.key(),
                    record.full_name,
                    record.field,
                    record.country_label().unwrap_or(aggregate::UNSPECIFIED_COUNTRY),
                    record.email,
                    record
                        .phone_confirmation
                        .map_or("-".to_string(), |value| value.to_string()),
                    record.attendance.map_or("-".to_string(), |value| value.to_string())
                );
            }
        }
        Commands::Stats {
            filters,
            json,
            all_countries,
        } => {
            let roster = Roster::load(&store, config.scope).await?;
            let stats = roster.stats(&filters.criteria());

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }

            println!("Total: {}", stats.total);
            println!("By field:");
            for bucket in &stats.by_field {
                println!("- {}: {}", bucket.label, bucket.count);
            }
            if all_countries {
                let visible = roster.view(&filters.criteria());
                println!("Countries:");
                for bucket in aggregate::count_by_country(&visible, aggregate::CountryOrder::Alphabetical) {
                    println!("- {}: {}", bucket.label, bucket.count);
                }
            } else {
                println!("Top countries:");
                for bucket in &stats.top_countries {
                    println!("- {}: {}", bucket.label, bucket.count);
                }
            }
            println!("Phone confirmation:");
            for bucket in stats.status.phone_buckets() {
                println!("- {}: {}", bucket.label, bucket.count);
            }
            println!("Attendance:");
            for bucket in stats.status.attendance_buckets() {
                println!("- {}: {}", bucket.label, bucket.count);
            }
        }
        Commands::Report {
            filters,
            top_countries,
            out,
        } => {
            let roster = Roster::load(&store, config.scope).await?;
            let records = roster.view(&filters.criteria());
            let label = filters
                .field
                .map(|field| field.label().to_string())
                .unwrap_or_else(|| config.scope.label());
            let report = report::build_report(&label, today, &records, top_countries);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Import { file, field } => {
            let field = match (config.scope, field) {
                (Scope::Field(assigned), _) => assigned,
                (Scope::Unrestricted, Some(field)) => field,
                (Scope::Unrestricted, None) => bail!("--field is required without an assigned field"),
            };
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let source = import::ImportSource::new(
                file.file_name().and_then(|name| name.to_str()).map(str::to_string),
                bytes,
            );

            let mut last_percent = None;
            let summary = import::import_file(&store, &source, field, |progress| {
                if let import::ImportStage::RowProcessing(_) = progress.stage {
                    let percent = progress.percent();
                    if last_percent != Some(percent) && percent % 10 == 0 {
                        eprintln!("{percent}% ({}/{})", progress.processed, progress.total);
                        last_percent = Some(percent);
                    }
                }
            })
            .await?;

            for warning in &summary.warnings {
                println!("Warning: {warning}");
            }
            println!(
                "Imported {} records from sheet '{}' ({} failed, {} blank rows skipped).",
                summary.success_count, summary.sheet_name, summary.failure_count, summary.blank_rows
            );
            for error in &summary.errors {
                println!("- {error}");
            }

            let center = notification_center(&api, &config).await;
            notify::notify_system(
                &center,
                "Bulk Import Completed",
                &format!(
                    "{} records imported into {} ({} failed)",
                    summary.success_count, field, summary.failure_count
                ),
            )
            .await;
        }
        Commands::Export {
            filters,
            format,
            out_dir,
        } => {
            let roster = Roster::load(&store, config.scope).await?;
            let records = roster.view(&filters.criteria());
            let fields: Vec<Field> = filters.field.into_iter().collect();
            let stem = export::report_file_stem(&fields, filters.country.as_deref());

            let (bytes, extension) = match format {
                ExportFormat::Xlsx => (export::to_spreadsheet(&records)?, "xlsx"),
                ExportFormat::Pdf => {
                    let options = export::PdfOptions {
                        title: config.report_title.clone(),
                        subtitle: config.scope.label(),
                        generated_on: today,
                    };
                    (export::to_pdf(&records, &options)?, "pdf")
                }
            };

            let target = out_dir.join(export::export_file_name(&stem, today, extension));
            tokio::fs::write(&target, bytes)
                .await
                .with_context(|| format!("failed to write {}", target.display()))?;
            println!("Exported {} records to {}.", records.len(), target.display());
        }
        Commands::Download { kind, out_dir } => {
            let target = download::download_special(&api, kind, &out_dir, today).await?;
            println!("Saved {}.", target.display());
        }
        Commands::Add {
            full_name,
            calling_name,
            email,
            whatsapp,
            field,
            details,
        } => {
            let field = match (config.scope, field) {
                (Scope::Field(assigned), _) => assigned,
                (Scope::Unrestricted, Some(field)) => field,
                (Scope::Unrestricted, None) => bail!("--field is required without an assigned field"),
            };
            let email = non_blank(email).unwrap_or_else(|| import::placeholder_email(&full_name));
            let draft = RecordDraft {
                calling_name: calling_name.unwrap_or_else(|| full_name.clone()),
                full_name,
                nick_name: non_blank(details.nick_name),
                address: non_blank(details.address),
                country: non_blank(details.country),
                working_place: non_blank(details.working_place),
                mobile: non_blank(details.mobile),
                whatsapp_mobile: whatsapp,
                email,
                field,
            };
            import::validate(&draft)?;

            let mut roster = Roster::from_records(config.scope, Vec::new());
            let created = roster.add(&store, draft).await?;
            println!("Added {} as {}.", created.full_name, created.key());

            let center = notification_center(&api, &config).await;
            notify::notify_new_batchmate(&center, &created.full_name, created.field).await;
        }
        Commands::Edit {
            id,
            full_name,
            calling_name,
            email,
            whatsapp,
            field,
            phone,
            attendance,
            details,
        } => {
            let patch = RecordPatch {
                calling_name: non_blank(calling_name),
                full_name: non_blank(full_name),
                nick_name: non_blank(details.nick_name),
                email: non_blank(email),
                whatsapp_mobile: non_blank(whatsapp),
                mobile: non_blank(details.mobile),
                field,
                country: non_blank(details.country),
                address: non_blank(details.address),
                working_place: non_blank(details.working_place),
                phone_confirmation: phone,
                attendance,
            };
            if patch.is_empty() {
                bail!("nothing to change; pass at least one member to edit");
            }

            let mut roster = Roster::load(&store, config.scope).await?;
            let updated = roster.edit(&store, &id, &patch).await?;
            println!("Updated {} ({}).", updated.full_name, updated.key());

            let center = notification_center(&api, &config).await;
            notify::notify_batchmate_update(&center, &updated.full_name).await;
        }
        Commands::Mark {
            id,
            phone,
            attendance,
        } => {
            let mut roster = Roster::load(&store, config.scope).await?;
            let mut updated = None;
            if let Some(phone) = phone {
                updated = Some(roster.set_phone_confirmation(&store, &id, phone).await?);
            }
            if let Some(attendance) = attendance {
                updated = Some(roster.set_attendance(&store, &id, attendance).await?);
            }

            if let Some(record) = updated {
                println!(
                    "Updated {}: phone {}, attendance {}.",
                    record.full_name,
                    record
                        .phone_confirmation
                        .map_or("-".to_string(), |value| value.to_string()),
                    record.attendance.map_or("-".to_string(), |value| value.to_string())
                );
                let center = notification_center(&api, &config).await;
                notify::notify_batchmate_update(&center, &record.full_name).await;
            }
        }
        Commands::Remove { id } => {
            let mut roster = Roster::load(&store, config.scope).await?;
            let removed = roster.remove(&store, &id).await?;
            println!("Removed {}.", removed.full_name);
        }
        Commands::Notifications { action } => {
            let center = notification_center(&api, &config).await;
            match action {
                NotificationCommand::List => {
                    let items = center.list().await?;
                    if items.is_empty() {
                        println!("No notifications.");
                    }
                    for item in items {
                        println!(
                            "{} [{}] {} {}: {}",
                            if item.read { " " } else { "*" },
                            item.key(),
                            item.created_at.format("%Y-%m-%d %H:%M"),
                            item.title,
                            item.message
                        );
                    }
                }
                NotificationCommand::Read { id } => {
                    center.mark_read(&id).await?;
                    println!("Marked {id} as read.");
                }
                NotificationCommand::ReadAll => {
                    let marked = center.mark_all_read().await?;
                    println!("Marked {marked} notifications as read.");
                }
                NotificationCommand::Delete { id } => {
                    center.delete(&id).await?;
                    println!("Deleted {id}.");
                }
                NotificationCommand::Unread => {
                    println!("{}", center.unread_count().await?);
                }
                NotificationCommand::NewUser {
                    username,
                    role,
                    field,
                } => {
                    notify::notify_new_user(&center, &username, &role, field.map(Field::label)).await;
                    println!("Announced {username}.");
                }
            }
        }
        Commands::Events { action } => {
            let events = EventsClient::new(api.clone());
            match action {
                EventCommand::List => {
                    let items = events.list_events().await?;
                    if items.is_empty() {
                        println!("No events.");
                    }
                    for event in items {
                        println!(
                            "- [{}] {} on {} at {} ({})",
                            event.key(),
                            event.name,
                            event.event_date.as_deref().unwrap_or("-"),
                            event.venue.as_deref().unwrap_or("-"),
                            event.status.as_deref().unwrap_or("-")
                        );
                    }
                }
                EventCommand::Show { id } => {
                    let event = events.get_event(&id).await?;
                    println!("{} [{}]", event.name, event.key());
                    println!("Date: {}", event.event_date.as_deref().unwrap_or("-"));
                    println!("Type: {}", event.event_type.as_deref().unwrap_or("-"));
                    println!("Venue: {}", event.venue.as_deref().unwrap_or("-"));
                    println!("Status: {}", event.status.as_deref().unwrap_or("-"));
                    if let Some(description) = event.description.as_deref() {
                        println!("{description}");
                    }
                    if let Some(url) = event.qr_code_url.as_deref() {
                        println!("Registration link: {url}");
                    }
                }
                EventCommand::Create { name, details } => {
                    if details.date.as_deref().map_or(true, |date| date.trim().is_empty()) {
                        bail!("--date is required for a new event");
                    }
                    let mut fields = details.fields(Some(name));
                    fields
                        .event_type
                        .get_or_insert_with(|| events::DEFAULT_EVENT_TYPE.to_string());
                    fields
                        .status
                        .get_or_insert_with(|| events::DEFAULT_EVENT_STATUS.to_string());
                    let event = events.create_event(&fields).await?;
                    println!("Created {} as {}.", event.name, event.key());
                }
                EventCommand::Update { id, name, details } => {
                    let fields = details.fields(name);
                    if fields == EventFields::default() {
                        bail!("nothing to change; pass at least one member to update");
                    }
                    let event = events.update_event(&id, &fields).await?;
                    println!("Updated {}.", event.name);
                }
                EventCommand::Delete { id } => {
                    events.delete_event(&id).await?;
                    println!("Deleted event {id}.");
                }
                EventCommand::Stats { id } => {
                    let stats = events.statistics(&id).await?;
                    let totals = stats.statistics;
                    println!(
                        "{} ({}, {})",
                        stats.event.name,
                        stats.event.event_date.as_deref().unwrap_or("-"),
                        stats.event.venue.as_deref().unwrap_or("-")
                    );
                    println!("Total: {}", totals.total);
                    println!("Present: {}", totals.present);
                    println!("Absent: {}", totals.absent);
                    println!("Pending: {}", totals.pending);
                    println!("By QR scan: {}", totals.qr_scanned);
                    println!("Marked by hand: {}", totals.manual);
                    println!("Not marked: {}", totals.not_marked);
                }
                EventCommand::Qr { id } => {
                    let qr = events.generate_qr(&id).await?;
                    match qr.qr_code_url {
                        Some(url) => println!("Registration link: {url}"),
                        None => println!("QR code generated."),
                    }
                    if qr.qr_code.is_none() {
                        println!("The server returned no QR image.");
                    }
                }
            }
        }
        Commands::Attendance { action } => {
            let events = EventsClient::new(api.clone());
            match action {
                AttendanceCommand::List {
                    event,
                    search,
                    status,
                    method,
                } => {
                    let all = events.event_attendances(&event).await?;
                    let filter = events::AttendanceFilter {
                        term: search,
                        status,
                        method,
                    };
                    let shown = events::filter_attendances(&all, &filter);
                    println!("Attendance records ({} of {}):", shown.len(), all.len());
                    for item in shown {
                        println!(
                            "- [{}] {} {} via {}{}{}",
                            item.id,
                            item.batchmate_name().unwrap_or("Unknown"),
                            item.status,
                            item.attendance_method,
                            item.marked_at
                                .map(|at| format!(" at {}", at.format("%Y-%m-%d %H:%M")))
                                .unwrap_or_default(),
                            item.notes
                                .as_deref()
                                .map(|notes| format!(" ({notes})"))
                                .unwrap_or_default()
                        );
                    }
                }
                AttendanceCommand::Check { mobile } => {
                    let check = events.check_mobile(&mobile).await?;
                    if check.found {
                        let name = check
                            .data
                            .as_ref()
                            .and_then(|data| data.get("fullName"))
                            .and_then(|name| name.as_str())
                            .unwrap_or("a batchmate");
                        println!("{mobile} belongs to {name}.");
                    } else {
                        println!(
                            "{}",
                            check
                                .message
                                .unwrap_or_else(|| format!("No batchmate with mobile {mobile}."))
                        );
                    }
                }
                AttendanceCommand::Register {
                    event,
                    mobile,
                    name,
                    full_name,
                    whatsapp,
                    email,
                    gmail,
                    nick_name,
                    address,
                    country,
                    working_place,
                } => {
                    let data = RegistrationData {
                        name,
                        full_name,
                        mobile: mobile.clone(),
                        nick_name: non_blank(nick_name),
                        address: non_blank(address),
                        country: non_blank(country),
                        working_place: non_blank(working_place),
                        whatsapp: non_blank(whatsapp),
                        email: non_blank(email),
                        gmail: non_blank(gmail),
                    };
                    let result = events.register_qr(&event, &mobile, &data).await?;
                    if !result.success {
                        bail!("registration refused: {}", result.message);
                    }
                    println!("{}", result.message);
                }
                AttendanceCommand::Mark {
                    event,
                    batchmate,
                    status,
                    notes,
                } => {
                    let result = events
                        .mark_manual(event, batchmate, status, notes.as_deref())
                        .await?;
                    println!(
                        "Marked {} as {}.",
                        result.data.batchmate_name().unwrap_or("batchmate"),
                        result.data.status
                    );
                }
                AttendanceCommand::BulkMark { event, file } => {
                    let bytes = tokio::fs::read(&file)
                        .await
                        .with_context(|| format!("failed to read {}", file.display()))?;
                    let entries = events::read_bulk_entries(&bytes)
                        .with_context(|| format!("invalid attendance sheet {}", file.display()))?;
                    if entries.is_empty() {
                        bail!("{} has no attendance rows", file.display());
                    }
                    let result = events.bulk_mark(event, &entries).await?;
                    println!("{} ({} records).", result.message, result.data.len());
                }
            }
        }
    }

    Ok(())
}

async fn notification_center(api: &ApiClient, config: &Config) -> NotificationCenter {
    let local = LocalNotifications::with_default_seed(config.notifications_path.clone());
    NotificationCenter::select(api.clone(), local).await
}
