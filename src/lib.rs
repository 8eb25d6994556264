//! ═══════════════════════════════════════════════════════════════════════════════
//! THERMITE — Heuristic Thermal Feedback Governor
//! ═══════════════════════════════════════════════════════════════════════════════
//! Samples temperature sensors and system load on a fixed period and drives
//! three thermal actuators (fan, CPU performance ceiling, power clamp) with
//! hysteresis and rate limits. Model-free: it reacts to the current reading
//! and a short trend window, nothing more.
//! ═══════════════════════════════════════════════════════════════════════════════

// ═══════════════════════════════════════════════════════════════════════════════
// FOUNDATION MODULES — I/O wrappers, sensing, trend statistics
// ═══════════════════════════════════════════════════════════════════════════════

pub mod sensors;
pub mod sysfs;
pub mod trend;

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROL MODULES — the decision core and the devices it commands
// ═══════════════════════════════════════════════════════════════════════════════

pub mod actuators;
pub mod governor;

// ═══════════════════════════════════════════════════════════════════════════════
// RUNTIME MODULES — loop driver, observability, errors
// ═══════════════════════════════════════════════════════════════════════════════

pub mod error;
pub mod runner;
pub mod telemetry;

// Re-export common types
pub use error::{ThermiteError, ThermiteResult};
pub use governor::{Bands, GovernorConfig, GovernorState, TickDecision, TickInputs};
pub use sensors::{SensorBank, ThermalSample};
pub use trend::TrendWindow;
