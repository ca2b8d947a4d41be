// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use bmi_service::logging::{init_logging, Console};
use bmi_service::{
    delete_all_records, get_all_records, open_database, record_measurement, verify_count,
    LogConfig, VERSION,
};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "bmi", version, about = "BMI calculator with a local history")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "DATABASE_PATH", default_value = "bmi.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal form (default)
    Ui,
    /// Calculate BMI once and store it
    Calc {
        #[arg(long)]
        name: String,
        /// Weight in kilograms
        #[arg(long)]
        weight: f64,
        /// Height in meters
        #[arg(long)]
        height: f64,
    },
    /// Print stored calculations, newest first
    History,
    /// Delete every stored calculation
    Clear,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let log_config = LogConfig {
        dir: std::env::var_os("BMI_LOG_DIR").map(PathBuf::from),
    };
    let console = match cli.command {
        None | Some(Command::Ui) => Console::Off,
        Some(_) => Console::Stderr,
    };
    let _guard = init_logging(&log_config, console);

    let conn = open(&cli.db)?;

    match cli.command {
        None | Some(Command::Ui) => run_ui_mode(conn)?,
        Some(Command::Calc {
            name,
            weight,
            height,
        }) => run_calc(&conn, &name, weight, height)?,
        Some(Command::History) => run_history(&conn)?,
        Some(Command::Clear) => run_clear(&conn)?,
    }

    Ok(())
}

fn open(path: &Path) -> Result<Connection> {
    open_database(path).with_context(|| format!("Failed to open database {:?}", path))
}

fn run_calc(conn: &Connection, name: &str, weight: f64, height: f64) -> Result<()> {
    let record = record_measurement(conn, name, weight, height)?;

    println!("Hello {}, your BMI is: {:.2}", record.name, record.bmi);
    println!("Category: {}", record.category);

    Ok(())
}

fn run_history(conn: &Connection) -> Result<()> {
    let records = get_all_records(conn)?;

    if records.is_empty() {
        println!("No BMI records found. Calculate your first BMI!");
        return Ok(());
    }

    println!(
        "{:<17} {:<20} {:>6}  {:<14} {:>11} {:>10}",
        "Date", "Name", "BMI", "Category", "Weight (kg)", "Height (m)"
    );
    for record in &records {
        println!(
            "{:<17} {:<20} {:>6.2}  {:<14} {:>11.1} {:>10.2}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.name,
            record.bmi,
            record.category.as_str(),
            record.weight,
            record.height,
        );
    }
    println!("\n{} record(s)", verify_count(conn)?);

    Ok(())
}

fn run_clear(conn: &Connection) -> Result<()> {
    let deleted = delete_all_records(conn)?;
    println!("All BMI history has been deleted successfully ({} record(s))", deleted);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(conn: Connection) -> Result<()> {
    tracing::info!(version = VERSION, "Starting terminal UI");

    let mut app = ui::App::new(conn);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_conn: Connection) -> Result<()> {
    eprintln!("TUI mode not available (bmi {})", VERSION);
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web form: cargo run --bin bmi-server --features server");
    std::process::exit(1);
}
