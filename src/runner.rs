//! ═══════════════════════════════════════════════════════════════════════════════
//! RUNNER — Blocking Control Loop
//! ═══════════════════════════════════════════════════════════════════════════════
//! Thin driver around the governor step function: blocking sensor reads, the
//! decision, blocking actuator writes, fixed-period sleep. Strictly
//! sequential, single thread, no watchdog; a stalled device stalls the loop.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::actuators::{
    Actuator, ActuatorSet, PowerClamp, CPU_ROOT, FAN_PATH, PSTATE_ROOT, THERMAL_ROOT,
};
use crate::error::{ThermiteError, ThermiteResult};
use crate::governor::{GovernorConfig, GovernorState, TickInputs};
use crate::sensors::{load_average_1m, SensorBank};
use crate::sysfs;
use crate::telemetry::{self, Journal, TickRecord};
use crate::trend::TrendWindow;

/// Default control period.
pub const DEFAULT_INTERVAL_MS: u64 = 300;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub interval: Duration,
    /// JSONL telemetry sink, off by default
    pub journal: Option<PathBuf>,
    /// Stop after this many ticks; None runs until killed
    pub max_ticks: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            journal: None,
            max_ticks: None,
        }
    }
}

/// The governor loop. Returns only on a fatal startup condition or after
/// `max_ticks`; steady-state failures are logged and survived.
pub fn run(config: RunnerConfig) -> ThermiteResult<()> {
    let bank = SensorBank::discover()?;
    let mut actuators = ActuatorSet::discover()?;

    println!(
        "\x1b[35m[GOVERN]  online: {} sensors, cap via {}, fan {}, clamp {}\x1b[0m",
        bank.sensors().len(),
        actuators.cap.backend_name(),
        if actuators.fan.is_some() { "present" } else { "absent" },
        if actuators.clamp.is_some() { "present" } else { "absent" },
    );

    let mut governor = GovernorState::new(
        GovernorConfig::default(),
        actuators.cap.level(),
        actuators.fan.as_ref().map(|fan| fan.level()),
        actuators.clamp.is_some(),
    );
    let mut trend = TrendWindow::default();
    let mut journal = config.journal.clone().map(Journal::new);

    loop {
        match bank.sample() {
            Ok(sample) => {
                trend.push(sample.max_temp);
                let inputs = TickInputs {
                    sample,
                    load_avg: load_average_1m(),
                    variability: trend.variability(),
                    rising: trend.rising(),
                };
                let decision = governor.tick(&inputs);

                if let (Some(fan), Some(level)) = (actuators.fan.as_mut(), decision.fan) {
                    fan.set_level(level);
                }
                actuators.cap.set_level(decision.cpu);
                if let (Some(clamp), Some(level)) = (actuators.clamp.as_mut(), decision.clamp) {
                    clamp.set_level(level);
                }

                let record = TickRecord {
                    tick: governor.tick_index,
                    max_temp: sample.max_temp,
                    avg_temp: sample.avg_temp,
                    fan: governor.fan_level,
                    cpu: governor.cpu_level,
                    clamp: governor.clamp_level,
                    variability: inputs.variability,
                    velocity: trend.velocity(),
                    load: inputs.load_avg,
                };
                telemetry::console_line(&record, &decision.bands);
                if let Some(journal) = journal.as_mut() {
                    journal.record(&record);
                }
            }
            Err(ThermiteError::AllSensorsUnavailable) => {
                // Blackout tick: no new commands, previous levels stand.
                println!(
                    "\x1b[31m[GOVERN]  all sensors unreadable, holding levels this tick\x1b[0m"
                );
                governor.hold();
            }
            Err(other) => return Err(other),
        }

        if let Some(max) = config.max_ticks {
            if governor.tick_index >= max {
                break;
            }
        }
        thread::sleep(config.interval);
    }

    if let Some(journal) = journal.as_mut() {
        journal.flush();
    }
    Ok(())
}

/// Report what discovery would find, without committing any actuator.
pub fn probe() -> ThermiteResult<()> {
    let bank = SensorBank::discover()?;

    println!("\x1b[36m─── sensors ────────────────────────────────────────\x1b[0m");
    for sensor in bank.sensors() {
        match sysfs::read_int(&sensor.path) {
            Ok(millideg) => {
                // Scale against a 100C ceiling for display.
                let bar = telemetry::heat_bar(millideg as f64 / 100_000.0, 20);
                println!("  {:24} {} {:5.1}C", sensor.name, bar, millideg as f64 / 1000.0);
            }
            Err(err) => println!("  {:24} unreadable: {}", sensor.name, err),
        }
    }

    println!("\x1b[36m─── actuators ──────────────────────────────────────\x1b[0m");
    println!(
        "  fan        {}",
        if Path::new(FAN_PATH).exists() { "present" } else { "absent" }
    );
    let cap_backend = if Path::new(PSTATE_ROOT).join("max_perf_pct").exists() {
        "intel_pstate"
    } else if Path::new(CPU_ROOT).join("cpu0/cpufreq/cpuinfo_max_freq").exists() {
        "cpufreq"
    } else {
        "absent"
    };
    println!("  perf cap   {}", cap_backend);
    println!(
        "  powerclamp {}",
        if PowerClamp::locate(Path::new(THERMAL_ROOT)).is_some() {
            "present"
        } else {
            "absent"
        }
    );
    println!("  load 1m    {:.2}", load_average_1m());
    Ok(())
}
