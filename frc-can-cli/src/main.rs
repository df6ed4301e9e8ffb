//! FRC CAN Log CLI Application
//!
//! This is the command-line interface for the FRC CAN decoder.
//! It uses the frc-can-decoder library and adds:
//! - Loading JSON captures and YAML device libraries from disk
//! - Controller tables and frame listings (text or JSON)
//! - Real-time replay of a capture, printed frame by frame

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use frc_can_decoder::{
    DeviceLibrary, FrameSink, LogSession, LogSource, ReplayScheduler, Session,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use report::LogReport;

/// FRC CAN Log Reader - Identify controllers in CAN captures and replay them
#[derive(Parser, Debug)]
#[command(name = "frc-can-cli")]
#[command(about = "Identify controllers in FRC CAN captures and replay them", long_about = None)]
#[command(version)]
struct Args {
    /// JSON capture file(s) to load (can be repeated)
    #[arg(short, long, value_name = "FILE")]
    log: Vec<PathBuf>,

    /// Capture tool that wrote the log: live, innomaker, gui-csv
    #[arg(short, long, value_name = "SOURCE")]
    source: Option<LogSource>,

    /// Directory of YAML device definitions (can be repeated)
    #[arg(long, value_name = "DIR")]
    library: Vec<PathBuf>,

    /// Replay the capture in real time instead of printing a report
    #[arg(long)]
    replay: bool,

    /// Output format for reports
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// List every frame with its decoded fields
    #[arg(long)]
    frames: bool,

    /// Path to configuration file (app.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("FRC CAN Log CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", frc_can_decoder::VERSION);

    let config = resolve_config(&args)?;

    if config.input.files.is_empty() {
        println!("FRC CAN Log Reader - No input specified");
        println!("\nQuick Start:");
        println!("  frc-can-cli --log capture.json --library devices/");
        println!("  frc-can-cli --log capture.json --source innomaker --replay");
        println!("\nWith a configuration file:");
        println!("  frc-can-cli --config app.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let library = load_library(&config.input.library_dirs)?;

    if args.replay {
        replay_mode(&config, &library)
    } else {
        report_mode(&config, &library)
    }
}

/// Config file (if any) with command line flags layered on top
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    config.input.files.extend(args.log.iter().cloned());
    config.input.library_dirs.extend(args.library.iter().cloned());
    if let Some(source) = args.source {
        config.input.source = source;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    config.output.show_frames |= args.frames;

    Ok(config)
}

fn load_library(dirs: &[PathBuf]) -> Result<DeviceLibrary> {
    let mut library = DeviceLibrary::new();
    for dir in dirs {
        library
            .load_dir(dir)
            .with_context(|| format!("Failed to load device library: {:?}", dir))?;
    }

    let stats = library.stats();
    log::info!(
        "Device library: {} files, {} profiles, {} message layouts",
        stats.num_files,
        stats.num_profiles,
        stats.num_messages
    );
    Ok(library)
}

fn load_log(path: &Path, config: &AppConfig) -> Result<LogSession> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read capture file: {:?}", path))?;
    let log = LogSession::from_json(&content, config.input.source, config.session.clone())
        .with_context(|| format!("Failed to parse capture file: {:?}", path))?;

    Ok(log)
}

/// Report mode - load each capture and print its controller table
fn report_mode(config: &AppConfig, library: &DeviceLibrary) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for path in &config.input.files {
        let log = load_log(path, config)?;
        let report = LogReport::new(
            &path.display().to_string(),
            &log,
            library,
            config.output.show_frames,
        );
        report.write(config.output.format, &mut out)?;
    }

    Ok(())
}

/// Replay mode - pace each capture onto stdout in real time
fn replay_mode(config: &AppConfig, library: &DeviceLibrary) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let scheduler = ReplayScheduler::new(config.session.tick_interval());

    for path in &config.input.files {
        let log = load_log(path, config)?;
        println!("═══════════════════════════════════════════════");
        println!("  Replaying {:?}", path);
        println!(
            "  {} frames, {:.3}s, {}ms tick (Ctrl-C to stop)",
            log.frames().len(),
            log.duration(),
            scheduler.tick().as_millis()
        );
        println!("═══════════════════════════════════════════════\n");

        let mut sink = PrintSink::new(&log, library);
        let report = scheduler.run(&log, &mut sink, &running)?;

        println!(
            "\n✓ {} frames sent in {} ticks{}",
            report.frames_sent,
            report.ticks,
            if report.cancelled { " (stopped)" } else { "" }
        );
        if report.cancelled {
            break;
        }
    }

    Ok(())
}

/// Replay target that prints frames with the wall-clock time they went out
struct PrintSink<'a> {
    log: &'a LogSession,
    library: &'a DeviceLibrary,
}

impl<'a> PrintSink<'a> {
    fn new(log: &'a LogSession, library: &'a DeviceLibrary) -> Self {
        Self { log, library }
    }

    /// Identified device name of the controller with this identifier
    fn device_name(&self, identifier: u32) -> String {
        frc_can_decoder::identifier::decode(identifier)
            .ok()
            .and_then(|(address, _)| self.log.controllers().get(&address))
            .map(|controller| frc_can_decoder::identify(controller, self.library.profiles()))
            .unwrap_or_else(|| frc_can_decoder::UNKNOWN_DEVICE.to_string())
    }
}

impl FrameSink for PrintSink<'_> {
    fn send_frame(&mut self, identifier: u32, payload: &[u8]) -> frc_can_decoder::Result<()> {
        let bytes: Vec<String> = payload.iter().map(|b| hex::encode_upper([*b])).collect();
        println!(
            "[{}] 0x{:08X} {:<16} [{}]",
            Utc::now().format("%H:%M:%S%.3f"),
            identifier,
            self.device_name(identifier),
            bytes.join(" ")
        );
        Ok(())
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use frc_can_decoder::RawRecord;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "frc-can-cli",
            "--log",
            "a.json",
            "--log",
            "b.json",
            "--source",
            "innomaker",
            "--format",
            "json",
            "--frames",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.input.files.len(), 2);
        assert_eq!(config.input.source, LogSource::InnoMaker);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.show_frames);
    }

    #[test]
    fn test_load_log_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("capture.json");
        fs::write(
            &path,
            r#"[{ "timestamp": 1.0, "identifier": 33888256, "payload": "0X|01 02" }]"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.input.source = LogSource::InnoMaker;
        let log = load_log(&path, &config).unwrap();
        assert_eq!(log.frames().len(), 1);
        assert_eq!(log.frames()[0].payload().as_bytes(), &[1, 2]);

        fs::write(
            &path,
            r#"[
                { "timestamp": 1.0, "identifier": 33888256, "payload": "0X|01" },
                { "timestamp": 2.0, "identifier": -5, "payload": "0X|02" },
                { "timestamp": 3.0, "identifier": 33888256, "payload": [1, 300] },
                { "timestamp": 4.0, "identifier": 33888256, "payload": null }
            ]"#,
        )
        .unwrap();
        let log = load_log(&path, &config).unwrap();
        assert_eq!(log.frames().len(), 3);
        assert_eq!(log.stats().malformed_identifier, 1);
        assert_eq!(log.stats().malformed_payload, 2);

        fs::write(&path, "not json").unwrap();
        assert!(load_log(&path, &config).is_err());
    }

    #[test]
    fn test_print_sink_names_controller() {
        let record = RawRecord::new(0.0, 33888256, &[]);
        let log = LogSession::from_records(&[record], LogSource::Live, Default::default());
        let library = DeviceLibrary::new();
        let sink = PrintSink::new(&log, &library);

        assert_eq!(sink.device_name(33888256), "Unknown");
        assert_eq!(sink.device_name(0xFFFF_FFFF), "Unknown");
    }
}
