//! Report generation
//!
//! Turns a loaded log into a controller table (plain text) or a JSON document.

use crate::config::OutputFormat;
use anyhow::Result;
use chrono::{DateTime, Utc};
use frc_can_decoder::{
    tables, ControllerSummary, DecodedMessage, DeviceLibrary, GlobalAddress, IngestStats,
    LogSession, LogSource, MessageDecoder, Session,
};
use serde::Serialize;
use std::io::Write;

/// Everything shown for one capture file
#[derive(Debug, Clone, Serialize)]
pub struct LogReport {
    pub file: String,
    pub source: LogSource,
    pub ts_start: f64,
    pub ts_end: f64,
    pub duration: f64,
    pub num_frames: usize,
    pub stats: IngestStats,
    pub controllers: Vec<ControllerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<FrameLine>>,
}

/// One frame in the optional frame listing
#[derive(Debug, Clone, Serialize)]
pub struct FrameLine {
    pub relative_timestamp: f64,
    pub identifier: u32,
    pub address: GlobalAddress,
    pub api: u16,
    pub api_class: Option<&'static str>,
    pub payload: String,
    pub decoded: Option<DecodedMessage>,
}

impl LogReport {
    pub fn new(file: &str, log: &LogSession, library: &DeviceLibrary, show_frames: bool) -> Self {
        let frames = show_frames.then(|| {
            log.frames()
                .iter()
                .map(|frame| FrameLine {
                    relative_timestamp: frame.relative_timestamp(),
                    identifier: frame.identifier(),
                    address: frame.address(),
                    api: frame.api(),
                    api_class: tables::api_class_name(tables::api_class(frame.api())),
                    payload: frame.payload().to_string(),
                    decoded: MessageDecoder::decode_frame(frame, library),
                })
                .collect()
        });

        Self {
            file: file.to_string(),
            source: log.source(),
            ts_start: log.ts_start(),
            ts_end: log.ts_end(),
            duration: log.duration(),
            num_frames: log.frames().len(),
            stats: *log.stats(),
            controllers: log
                .controllers()
                .iter()
                .map(|controller| ControllerSummary::new(controller, library))
                .collect(),
            frames,
        }
    }

    pub fn write<W: Write>(&self, format: OutputFormat, out: &mut W) -> Result<()> {
        match format {
            OutputFormat::Table => self.write_table(out),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, self)?;
                writeln!(out)?;
                Ok(())
            }
        }
    }

    fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "📄 {} ({})", self.file, self.source)?;
        writeln!(
            out,
            "  Recorded: {} → {} ({:.3}s)",
            format_time(self.ts_start),
            format_time(self.ts_end),
            self.duration
        )?;
        writeln!(
            out,
            "  Frames:   {} kept, {} ignored, {} malformed",
            self.num_frames,
            self.stats.ignored,
            self.stats.malformed_identifier
                + self.stats.malformed_timestamp
                + self.stats.malformed_record
        )?;
        if self.stats.malformed_payload > 0 {
            writeln!(
                out,
                "  ⚠️  {} frames kept with an empty payload",
                self.stats.malformed_payload
            )?;
        }

        writeln!(out, "\n🔌 Controllers ({}):", self.controllers.len())?;
        writeln!(
            out,
            "  {:<24} {:<24} {:>3}  {:<20} APIs",
            "Type", "Manufacturer", "#", "Device"
        )?;
        writeln!(out, "  {}", "─".repeat(86))?;
        for row in &self.controllers {
            let apis: Vec<String> = row.apis.iter().map(|api| format!("0x{:03X}", api)).collect();
            writeln!(
                out,
                "  {:<24} {:<24} {:>3}  {:<20} {}",
                row.device_type,
                row.manufacturer,
                row.device_number,
                row.name,
                apis.join(" ")
            )?;
        }

        if let Some(frames) = &self.frames {
            writeln!(out, "\n📊 Frames:")?;
            for line in frames {
                writeln!(
                    out,
                    "  [{:>10.6}s] 0x{:08X} {:<8} api=0x{:03X} {:<14} [{}]",
                    line.relative_timestamp,
                    line.identifier,
                    line.address.to_string(),
                    line.api,
                    line.api_class.unwrap_or("-"),
                    line.payload
                )?;
                if let Some(message) = &line.decoded {
                    let fields: Vec<String> = message.fields.iter().map(|f| f.to_string()).collect();
                    writeln!(out, "      {} {}", message.name, fields.join(", "))?;
                }
            }
        }

        Ok(())
    }
}

/// Epoch seconds as UTC date-time; small values (relative captures) stay in seconds
pub fn format_time(secs: f64) -> String {
    // Captures that do not carry wall-clock time start near zero
    if secs < 1_000_000_000.0 {
        return format!("{:.6}s", secs);
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0) as u32;
    match DateTime::<Utc>::from_timestamp(whole as i64, nanos) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => format!("{:.6}s", secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frc_can_decoder::{identifier, RawRecord, SessionConfig};

    fn sample_log() -> LogSession {
        let addr = GlobalAddress::new(2, 5, 7).unwrap();
        let records = vec![
            RawRecord::new(10.0, identifier::encode(addr, 0x60).unwrap(), &[1, 2]),
            RawRecord::new(12.5, identifier::encode(addr, 0x61).unwrap(), &[]),
        ];
        LogSession::from_records(&records, LogSource::Live, SessionConfig::new())
    }

    #[test]
    fn test_table_lists_controllers() {
        let report = LogReport::new("capture.json", &sample_log(), &DeviceLibrary::new(), true);
        let mut out = Vec::new();
        report.write(OutputFormat::Table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Motor Controller"));
        assert!(text.contains("REV Robotics"));
        assert!(text.contains("Unknown"));
        assert!(text.contains("0x060 0x061"));
        assert!(text.contains("(2.500s)"));
        assert!(text.contains("[01 02]"));
    }

    #[test]
    fn test_json_output() {
        let report = LogReport::new("capture.json", &sample_log(), &DeviceLibrary::new(), false);
        let mut out = Vec::new();
        report.write(OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["num_frames"], 2);
        assert_eq!(value["source"], "live");
        assert_eq!(value["controllers"][0]["apis"][1], 0x61);
        assert!(value.get("frames").is_none());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(2.5), "2.500000s");
        assert_eq!(format_time(1_700_000_000.25), "2023-11-14 22:13:20.250 UTC");
    }
}
