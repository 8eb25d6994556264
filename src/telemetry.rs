//! ═══════════════════════════════════════════════════════════════════════════════
//! TELEMETRY — Per-Tick Observability Emission
//! ═══════════════════════════════════════════════════════════════════════════════
//! One console status line per tick, plus an optional JSONL journal kept in a
//! bounded vault and flushed when full and on shutdown.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::governor::Bands;

const VAULT_CAPACITY: usize = 100;

/// Everything one tick decided, in emission order.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    pub max_temp: i64,
    pub avg_temp: i64,
    pub fan: i64,
    pub cpu: i64,
    pub clamp: i64,
    pub variability: i64,
    pub velocity: i64,
    pub load: f64,
}

/// The per-tick status line, colored by the dominant band.
pub fn console_line(record: &TickRecord, bands: &Bands) {
    println!(
        "{}[GOVERN]  max_temp: {}, clamp {}, fan {}, cpu {}, var {} ({})\x1b[0m",
        bands.color(),
        record.max_temp,
        record.clamp,
        record.fan,
        record.cpu,
        record.variability,
        bands.name(),
    );
}

/// Append-only JSONL telemetry journal with a bounded in-memory vault.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    vault: VecDeque<String>,
}

impl Journal {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            vault: VecDeque::with_capacity(VAULT_CAPACITY),
        }
    }

    pub fn record(&mut self, record: &TickRecord) {
        if let Ok(line) = serde_json::to_string(record) {
            self.vault.push_back(line);
        }
        if self.vault.len() >= VAULT_CAPACITY {
            self.flush();
        }
    }

    /// Best effort: a journal that cannot be written must never stall the
    /// control loop.
    pub fn flush(&mut self) {
        if self.vault.is_empty() {
            return;
        }
        let mut file = match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => file,
            Err(err) => {
                println!(
                    "\x1b[31m[JOURNAL] {} unwritable: {}\x1b[0m",
                    self.path.display(),
                    err
                );
                self.vault.clear();
                return;
            }
        };
        while let Some(line) = self.vault.pop_front() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.write_all(b"\n");
        }
        let _ = file.flush();
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        self.flush();
    }
}

/// ASCII heat bar for probe output.
pub fn heat_bar(value: f64, width: usize) -> String {
    let value = value.clamp(0.0, 1.0);
    let filled = (value * width as f64) as usize;
    let color = if value > 0.75 {
        "\x1b[31m" // red
    } else if value > 0.55 {
        "\x1b[33m" // yellow
    } else {
        "\x1b[32m" // green
    };
    format!(
        "{}[{}{}]\x1b[0m",
        color,
        "█".repeat(filled.min(width)),
        "░".repeat(width.saturating_sub(filled))
    )
}
