use crate::monitor::SampleRecord;
use crate::stats::RateSample;
use crate::validation;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

pub const CSV_HEADER: &str = "time_s,rx_Bps,tx_Bps,rx_pps,tx_pps";

/// CSV sink for per-tick rates. A `device` column follows `time_s` when
/// more than one device is monitored.
pub struct RateLogger<W: Write = BufWriter<File>> {
    writer: Option<W>,
    devices: Vec<String>,
}

impl RateLogger {
    /// Truncates `path` unless `append` is set. The header is written to a
    /// truncated or empty file, or to any file when `force_header` is set.
    pub fn open(
        path: &Path,
        append: bool,
        force_header: bool,
        devices: Vec<String>,
    ) -> anyhow::Result<Self> {
        validation::validate_file_path(&path.to_string_lossy())?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        let empty = file.metadata()?.len() == 0;

        info!(path = %path.display(), append, "CSV log opened");
        Ok(Self::from_writer(
            BufWriter::new(file),
            !append || force_header || empty,
            devices,
        ))
    }
}

impl<W: Write> RateLogger<W> {
    pub fn from_writer(writer: W, write_header: bool, devices: Vec<String>) -> Self {
        let mut logger = Self {
            writer: Some(writer),
            devices,
        };
        if write_header {
            let header = header_line(logger.devices.len() > 1);
            logger.write_line(&header);
        }
        logger
    }

    /// False once a write has failed.
    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }

    pub fn log(&mut self, record: &SampleRecord) {
        if self.writer.is_none() {
            return;
        }

        let device = if self.devices.len() > 1 {
            self.devices.get(record.device_index).map(String::as_str)
        } else {
            None
        };
        let time_s = epoch_seconds(DateTime::<Utc>::from(record.wall_time));
        let line = format_row(time_s, device, &record.rate);
        self.write_line(&line);
    }

    fn write_line(&mut self, line: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let result = writeln!(writer, "{line}").and_then(|()| writer.flush());
        if let Err(e) = result {
            warn!(error = %e, "CSV write failed, disabling CSV log");
            self.writer = None;
        }
    }

    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}

pub fn header_line(with_device: bool) -> String {
    if with_device {
        "time_s,device,rx_Bps,tx_Bps,rx_pps,tx_pps".to_string()
    } else {
        CSV_HEADER.to_string()
    }
}

pub fn format_row(time_s: f64, device: Option<&str>, rate: &RateSample) -> String {
    let device = device.map(|d| format!("{d},")).unwrap_or_default();
    format!(
        "{time_s:.6},{device}{:.0},{:.0},{:.0},{:.0}",
        rate.rx_bytes_per_sec, rate.tx_bytes_per_sec, rate.rx_packets_per_sec, rate.tx_packets_per_sec
    )
}

fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1e6
}
