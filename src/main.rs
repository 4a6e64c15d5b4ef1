use clap::Parser;
use clinic_booking::config::BackendKind;
use clinic_booking::core::{BookingRules, DirectoryStore, IdentityProvider};
use clinic_booking::utils::error::ErrorSeverity;
use clinic_booking::utils::validation::{parse_date, Validate};
use clinic_booking::utils::logger;
use clinic_booking::{
    config::cli::resolve_start, Appointment, AppointmentBook, BookingConfig, BookingRequest,
    CliConfig, Command, Doctor, DoctorDirectory, DoctorQuery, MemoryDirectory, PostgrestDirectory,
    SessionIdentity, SlotAvailabilityService, SlotBookingGuard, StaticIdentity,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match &cli.config {
        Some(path) => match BookingConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => BookingConfig::default(),
    };

    // 初始化日誌
    logger::init_logger(
        logger::LogFormat::from_json_flag(config.json_logs()),
        cli.verbose,
        config.log_level(),
    );

    tracing::info!("Starting clinic-booking CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
    let rules = config.rules()?;

    let outcome = match config.backend.kind {
        BackendKind::Postgrest => {
            let url = config.backend.url.clone().unwrap_or_default();
            let api_key = config.backend.api_key.clone().unwrap_or_default();
            let client = reqwest::Client::builder().timeout(config.timeout()).build()?;

            tracing::info!("🔌 Using PostgREST backend at {}", url);
            let store = PostgrestDirectory::with_client(client.clone(), &url, &api_key)
                .with_access_token(cli.access_token.clone());
            let identity = SessionIdentity::new(client, &url, &api_key, cli.access_token.clone());
            run(&cli.command, store, identity, rules).await
        }
        BackendKind::Memory => {
            let store = match config.data_file() {
                Some(path) => MemoryDirectory::load(path)?,
                None => MemoryDirectory::new(),
            }
            .with_constraint(rules.conflict_policy);
            let identity = cli
                .as_user
                .clone()
                .map(StaticIdentity::signed_in)
                .unwrap_or_default();

            tracing::info!("🗂️ Using in-memory backend");
            let outcome = run(&cli.command, store.clone(), identity, rules).await;
            if outcome.is_ok() && cli.command.mutates() {
                if let Some(path) = config.data_file() {
                    store.save(path).await?;
                    tracing::info!("📁 Data saved to: {}", path);
                }
            }
            outcome
        }
    };

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,      // 時段衝突
            ErrorSeverity::Medium => 2,   // 輸入或登入問題
            ErrorSeverity::High => 1,     // 後端或配置錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run<S, I>(
    command: &Command,
    store: S,
    identity: I,
    rules: BookingRules,
) -> clinic_booking::Result<()>
where
    S: DirectoryStore,
    I: IdentityProvider,
{
    match command {
        Command::Doctors {
            specialty,
            search,
            sort,
            limit,
        } => {
            let directory = DoctorDirectory::new(store);
            let doctors = directory
                .search(&DoctorQuery {
                    specialty: specialty.clone(),
                    search: search.clone(),
                    sort: *sort,
                    limit: *limit,
                })
                .await?;
            if doctors.is_empty() {
                println!("No doctors found");
            }
            doctors.iter().for_each(print_doctor);
        }
        Command::Recommend { specialty } => {
            let directory = DoctorDirectory::new(store);
            directory.recommend(specialty).await?.iter().for_each(print_doctor);
        }
        Command::Profile { doctor_id } => {
            let profile = DoctorDirectory::new(store).profile(doctor_id).await?;
            print_doctor(&profile.doctor);
            if let Some(phone) = &profile.doctor.phone {
                println!("    phone: {}", phone);
            }
            if profile.upcoming.is_empty() {
                println!("    no upcoming confirmed appointments");
            }
            for appointment in &profile.upcoming {
                println!(
                    "    confirmed {} - {}",
                    appointment.starts_at.format("%Y-%m-%d %H:%M"),
                    appointment.ends_at.format("%H:%M")
                );
            }
        }
        Command::Slots { doctor_id, date } => {
            let date = parse_date("date", date)?;
            let service = SlotAvailabilityService::new(store, rules);
            for slot in service.open_slots(doctor_id, date).await? {
                println!(
                    "{}  {}",
                    slot.starts_at.format("%H:%M"),
                    if slot.available { "open" } else { "taken" }
                );
            }
        }
        Command::Book {
            doctor_id,
            start,
            date,
            time,
            duration,
            notes,
        } => {
            let starts_at = resolve_start(start.as_deref(), date.as_deref(), time.as_deref())?;
            let mut request = BookingRequest::new(doctor_id.clone(), starts_at);
            request.duration_minutes = *duration;
            request.notes = notes.clone();

            let guard = SlotBookingGuard::new(store, identity, rules);
            let appointment = guard.request_appointment(request).await?;
            println!("✅ Appointment requested, the doctor will confirm it soon");
            print_appointment(&appointment);
        }
        Command::Appointments => {
            let appointments = AppointmentBook::new(store, identity).my_appointments().await?;
            if appointments.is_empty() {
                println!("No appointments yet");
            }
            for row in &appointments {
                print_appointment(&row.appointment);
                if let Some(doctor) = &row.doctor {
                    println!("    with {} ({})", doctor.display_name(), doctor.specialty);
                }
            }
        }
        Command::Cancel { appointment_id } => {
            let cancelled = AppointmentBook::new(store, identity)
                .cancel(appointment_id)
                .await?;
            println!("Appointment cancelled");
            print_appointment(&cancelled);
        }
    }
    Ok(())
}

fn print_doctor(doctor: &Doctor) {
    println!(
        "{}  {} ({})  ★ {:.1} [{}]  {} yrs",
        doctor.id,
        doctor.display_name(),
        doctor.specialty,
        doctor.rating_avg,
        doctor.rating_count,
        doctor.years_experience.unwrap_or(0)
    );
}

fn print_appointment(appointment: &Appointment) {
    println!(
        "{}  doctor {}  {} - {}  {}{}",
        appointment.id,
        appointment.doctor_id,
        appointment.starts_at.format("%Y-%m-%d %H:%M"),
        appointment.ends_at.format("%H:%M"),
        appointment.status,
        appointment
            .notes
            .as_deref()
            .map(|n| format!("  \"{}\"", n))
            .unwrap_or_default()
    );
}
