//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `geonote_core` linkage without the mobile host.
//! - Replay a scripted walk through the reminder engine for quick sanity checks.

use clap::{Parser, Subcommand};
use geonote_core::{
    distance_meters, EngineConfig, LocationProvider, LocationReminderService,
    ManualLocationProvider, MemoryKeyValueStorage, NewReminder, NotificationEmitter,
    PermissionStatus, PositionSample, RecordingNotificationEmitter,
};
use std::process::ExitCode;
use std::sync::Arc;

/// GeoNote core diagnostics.
#[derive(Parser, Debug)]
#[command(name = "geonote_cli", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Print core linkage and version (default).
    Ping,
    /// Great-circle distance in meters between two points in degrees.
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
    },
    /// Walk a scripted enter/linger/exit/re-enter path past one reminder.
    Replay,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Commands::Ping) {
        Commands::Ping => {
            println!("geonote_core ping={}", geonote_core::ping());
            println!("geonote_core version={}", geonote_core::core_version());
            Ok(())
        }
        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            println!("distance_m={:.1}", distance_meters(lat1, lon1, lat2, lon2));
            Ok(())
        }
        Commands::Replay => run_replay(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run_replay() -> Result<(), String> {
    let provider = Arc::new(ManualLocationProvider::new(PermissionStatus::Granted));
    let emitter = Arc::new(RecordingNotificationEmitter::new());
    let service = LocationReminderService::new(
        MemoryKeyValueStorage::new(),
        Arc::clone(&provider) as Arc<dyn LocationProvider>,
        Arc::clone(&emitter) as Arc<dyn NotificationEmitter>,
        &EngineConfig::default(),
    );

    let reminder = service
        .save_location_reminder(
            NewReminder::at(37.78825, -122.4324)
                .with_title("Coffee")
                .with_note("Buy beans")
                .with_location_name("Coffee Shop"),
        )
        .map_err(|err| err.to_string())?;
    println!(
        "saved id={} radius_m={} tracking={}",
        reminder.id,
        reminder.radius,
        service.tracking_state().as_str()
    );

    let walk = [
        ("enter", 37.78825, -122.4324),
        ("linger", 37.78840, -122.4325),
        ("exit", 37.79825, -122.4324),
        ("re-enter", 37.78830, -122.4324),
    ];
    for (step, (label, latitude, longitude)) in walk.iter().enumerate() {
        let timestamp_ms = i64::try_from(step).unwrap_or(0) * 60_000;
        provider.deliver(PositionSample::new(*latitude, *longitude, timestamp_ms));
        let fired = emitter.take_pending();
        let triggered = service
            .get_location_reminders()
            .first()
            .is_some_and(|stored| stored.triggered);
        println!(
            "step={label} notifications={} triggered={triggered}",
            fired.len()
        );
        for notification in fired {
            println!("  notify title={:?} body={:?}", notification.title, notification.body);
        }
    }

    service.delete_location_reminder(&reminder.id);
    println!("deleted tracking={}", service.tracking_state().as_str());
    Ok(())
}
