//! ═══════════════════════════════════════════════════════════════════════════════
//! ERROR — Unified Error Type for Thermite
//! ═══════════════════════════════════════════════════════════════════════════════
//! Centralized error handling. No scattered .unwrap() or .expect() calls.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;
use std::path::PathBuf;

/// The unified error type for the thermite crate
#[derive(Debug)]
pub enum ThermiteError {
    /// I/O error (device files, journal, etc.)
    Io(std::io::Error),
    /// A required capability could not be located at startup
    StartupCapabilityMissing(String),
    /// A single sensor endpoint failed to read this tick
    SensorRead {
        /// Endpoint name as discovered
        name: String,
        source: std::io::Error,
    },
    /// Every known sensor failed to read this tick
    AllSensorsUnavailable,
    /// An actuator write was rejected by the OS
    DeviceWrite {
        device: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    /// A device file held something that does not parse as an integer
    Parse { path: PathBuf, contents: String },
}

pub type ThermiteResult<T> = Result<T, ThermiteError>;

impl std::error::Error for ThermiteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ThermiteError::Io(e) => Some(e),
            ThermiteError::SensorRead { source, .. } => Some(source),
            ThermiteError::DeviceWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for ThermiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThermiteError::Io(e) => write!(f, "I/O error: {}", e),
            ThermiteError::StartupCapabilityMissing(what) => {
                write!(f, "startup capability missing: {}", what)
            }
            ThermiteError::SensorRead { name, source } => {
                write!(f, "sensor '{}' unreadable: {}", name, source)
            }
            ThermiteError::AllSensorsUnavailable => {
                write!(f, "no temperature sensor could be read this tick")
            }
            ThermiteError::DeviceWrite {
                device,
                path,
                source,
            } => {
                write!(f, "{} write to {} failed: {}", device, path.display(), source)
            }
            ThermiteError::Parse { path, contents } => {
                write!(f, "{} held non-integer data: {:?}", path.display(), contents)
            }
        }
    }
}

impl From<std::io::Error> for ThermiteError {
    fn from(err: std::io::Error) -> Self {
        ThermiteError::Io(err)
    }
}
