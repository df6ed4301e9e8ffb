//! Standalone FRC CAN log decoder tool
//!
//! Loads a JSON capture, decodes every frame against a device library and
//! prints the frames, decoded message fields and a per-controller summary.
//!
//! Usage:
//!   decode_log <capture.json> [--source innomaker] [--library <dir>] [--limit <count>] [--verbose]
//!
//! Example:
//!   decode_log match42.json --source innomaker --library devices --limit 100

use frc_can_decoder::{
    DeviceLibrary, Frame, LogSession, LogSource, MessageDecoder, Session, SessionConfig,
};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

#[derive(Default)]
struct DecoderStats {
    total_frames: usize,
    decoded_messages: usize,
    fields_decoded: usize,
    unique_message_names: HashMap<String, usize>,
}

impl DecoderStats {
    fn print_summary(&self) {
        println!("\n=== DECODING SUMMARY ===");
        println!("Total frames processed: {}", self.total_frames);
        println!("Decoded messages: {}", self.decoded_messages);
        println!("Total fields decoded: {}", self.fields_decoded);

        if !self.unique_message_names.is_empty() {
            println!("\nTop 10 Most Frequent Messages:");
            let mut sorted: Vec<_> = self.unique_message_names.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            for (name, count) in sorted.iter().take(10) {
                println!("  {}: {} times", name, count);
            }
        }
    }
}

fn print_frame(frame: &Frame, library: &DeviceLibrary, stats: &mut DecoderStats, verbose: bool) {
    let decoded = MessageDecoder::decode_frame(frame, library);
    println!(
        "[{:.6}s] 0x{:08X} {} api=0x{:03X} [{}]{}",
        frame.relative_timestamp(),
        frame.identifier(),
        frame.address(),
        frame.api(),
        frame.payload(),
        decoded
            .as_ref()
            .map(|m| format!(" {}", m.name))
            .unwrap_or_default()
    );

    if let Some(message) = decoded {
        stats.decoded_messages += 1;
        stats.fields_decoded += message.fields.len();
        *stats.unique_message_names.entry(message.name.clone()).or_insert(0) += 1;

        if verbose {
            for field in &message.fields {
                println!("    {}", field);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <capture.json> [--source <live|innomaker|gui-csv>] [--library <dir>] [--limit <count>] [--verbose]",
            args[0]
        );
        std::process::exit(1);
    }

    let log_file = PathBuf::from(&args[1]);
    let mut source = LogSource::Live;
    let mut library_dirs = Vec::new();
    let mut limit: Option<usize> = None;
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--source" => {
                i += 1;
                if i < args.len() {
                    source = args[i].parse()?;
                }
            }
            "--library" => {
                i += 1;
                if i < args.len() {
                    library_dirs.push(PathBuf::from(&args[i]));
                }
            }
            "--limit" => {
                i += 1;
                if i < args.len() {
                    limit = Some(args[i].parse()?);
                }
            }
            "--verbose" | "-v" => verbose = true,
            _ => eprintln!("Unknown argument: {}", args[i]),
        }
        i += 1;
    }

    let mut library = DeviceLibrary::new();
    for dir in &library_dirs {
        println!("Loading device library: {:?}", dir);
        library.load_dir(dir)?;
    }
    let lib_stats = library.stats();
    println!("\n=== DEVICE LIBRARY ===");
    println!("Files: {}", lib_stats.num_files);
    println!("Profiles: {}", lib_stats.num_profiles);
    println!("Message layouts: {}", lib_stats.num_messages);

    let log = LogSession::from_json(
        &std::fs::read_to_string(&log_file)?,
        source,
        SessionConfig::new(),
    )?;

    println!("\n=== DECODING LOG FILE ===\n");
    let mut stats = DecoderStats::default();
    for (count, frame) in log.frames().iter().enumerate() {
        if limit.is_some_and(|max| count >= max) {
            println!("\n... (limit of {} frames reached)", count);
            break;
        }
        stats.total_frames += 1;
        print_frame(frame, &library, &mut stats, verbose);
    }

    stats.print_summary();

    println!("\n=== CONTROLLERS ===");
    for row in log.snapshot(&library).controllers {
        println!(
            "  {:<8} {:<24} {:<20} #{:<3} {}",
            row.address.to_string(),
            row.device_type,
            row.manufacturer,
            row.device_number,
            row.name
        );
    }

    Ok(())
}
