//! ═══════════════════════════════════════════════════════════════════════════════
//! SENSORS — Temperature Discovery and Per-Tick Aggregation
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Two OS subsystems feed the governor:
//! - /sys/class/thermal/thermal_zone*/temp — one aggregate value per zone
//! - /sys/class/hwmon/hwmon*/temp*_input  — labeled channels per chip
//!
//! Discovery runs once at startup; the endpoint set is then fixed for the
//! lifetime of the process. Per tick, every endpoint is read fresh. An
//! endpoint whose backing file has vanished is excluded from that tick's
//! aggregation; the tick itself fails only when nothing remains readable.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::PathBuf;

use crate::error::{ThermiteError, ThermiteResult};
use crate::sysfs;

/// Roots scanned at discovery. Overridable so tests can point the bank at a
/// fixture tree.
#[derive(Debug, Clone)]
pub struct DiscoveryPaths {
    pub thermal_root: PathBuf,
    pub hwmon_root: PathBuf,
}

impl Default for DiscoveryPaths {
    fn default() -> Self {
        Self {
            thermal_root: PathBuf::from("/sys/class/thermal"),
            hwmon_root: PathBuf::from("/sys/class/hwmon"),
        }
    }
}

/// One readable temperature endpoint, fixed at discovery.
#[derive(Debug, Clone)]
pub struct TempSensor {
    /// Zone directory name, or `<chip>:<channel>` for hwmon channels
    pub name: String,
    /// Backing file yielding integer millidegrees Celsius
    pub path: PathBuf,
}

/// Aggregate of one tick's readings. Immutable, tick-scoped.
#[derive(Debug, Clone, Copy)]
pub struct ThermalSample {
    /// Hottest reading this tick (millidegrees)
    pub max_temp: i64,
    /// Mean of all readings this tick (millidegrees)
    pub avg_temp: i64,
}

/// The fixed sensor set, built once at startup.
#[derive(Debug)]
pub struct SensorBank {
    sensors: Vec<TempSensor>,
}

impl SensorBank {
    /// Discover every readable endpoint under the default roots.
    /// Zero endpoints is a fatal startup condition.
    pub fn discover() -> ThermiteResult<Self> {
        Self::discover_in(&DiscoveryPaths::default())
    }

    pub fn discover_in(paths: &DiscoveryPaths) -> ThermiteResult<Self> {
        let mut sensors = Vec::new();

        for zone in sysfs::scan_dir(&paths.thermal_root, "thermal_zone", "") {
            let temp = zone.join("temp");
            if !temp.exists() {
                continue;
            }
            let name = zone
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "thermal_zone".to_string());
            sensors.push(TempSensor { name, path: temp });
        }

        for chip_dir in sysfs::scan_dir(&paths.hwmon_root, "hwmon", "") {
            let chip = sysfs::read_trimmed(&chip_dir.join("name")).unwrap_or_else(|_| {
                chip_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "hwmon".to_string())
            });
            for input in sysfs::scan_dir(&chip_dir, "temp", "_input") {
                let channel = input
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let channel = channel.trim_end_matches("_input");
                sensors.push(TempSensor {
                    name: format!("{}:{}", chip, channel),
                    path: input,
                });
            }
        }

        if sensors.is_empty() {
            return Err(ThermiteError::StartupCapabilityMissing(
                "no temperature sensors under thermal or hwmon roots".to_string(),
            ));
        }
        Ok(Self { sensors })
    }

    pub fn sensors(&self) -> &[TempSensor] {
        &self.sensors
    }

    /// Read every endpoint and aggregate. A sensor whose file has vanished is
    /// dropped from this tick (logged critical); if none remain the tick
    /// fails with `AllSensorsUnavailable` and the caller must hold previous
    /// actuator levels.
    pub fn sample(&self) -> ThermiteResult<ThermalSample> {
        let mut readings: Vec<i64> = Vec::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            match sysfs::read_int(&sensor.path) {
                Ok(value) => readings.push(value),
                Err(ThermiteError::Io(source)) => {
                    let dropped = ThermiteError::SensorRead {
                        name: sensor.name.clone(),
                        source,
                    };
                    println!("\x1b[31m[SENSE]   dropped this tick: {}\x1b[0m", dropped);
                }
                Err(other) => {
                    println!(
                        "\x1b[31m[SENSE]   dropped '{}' this tick: {}\x1b[0m",
                        sensor.name, other
                    );
                }
            }
        }
        if readings.is_empty() {
            return Err(ThermiteError::AllSensorsUnavailable);
        }
        let max_temp = readings.iter().copied().max().unwrap_or(0);
        let sum: i64 = readings.iter().sum();
        let avg_temp = sum / readings.len() as i64;
        Ok(ThermalSample { max_temp, avg_temp })
    }
}

/// The load collaborator: current 1-minute run-queue average.
pub fn load_average_1m() -> f64 {
    sysinfo::System::load_average().one
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_roots(tag: &str) -> DiscoveryPaths {
        let base = std::env::temp_dir().join(format!("thermite_sensors_{}", tag));
        let _ = fs::remove_dir_all(&base);
        let paths = DiscoveryPaths {
            thermal_root: base.join("thermal"),
            hwmon_root: base.join("hwmon"),
        };
        fs::create_dir_all(&paths.thermal_root).expect("thermal root");
        fs::create_dir_all(&paths.hwmon_root).expect("hwmon root");
        paths
    }

    fn add_zone(paths: &DiscoveryPaths, index: usize, millideg: i64) -> PathBuf {
        let zone = paths.thermal_root.join(format!("thermal_zone{}", index));
        fs::create_dir_all(&zone).expect("zone dir");
        let temp = zone.join("temp");
        fs::write(&temp, millideg.to_string()).expect("temp file");
        temp
    }

    #[test]
    fn test_discovery_finds_zones_and_hwmon_channels() {
        let paths = fixture_roots("discovery");
        add_zone(&paths, 0, 45_000);

        let chip = paths.hwmon_root.join("hwmon0");
        fs::create_dir_all(&chip).expect("chip dir");
        fs::write(chip.join("name"), "coretemp\n").expect("name");
        fs::write(chip.join("temp1_input"), "51000").expect("channel 1");
        fs::write(chip.join("temp2_input"), "49000").expect("channel 2");

        let bank = SensorBank::discover_in(&paths).expect("discovery");
        let names: Vec<_> = bank.sensors().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["thermal_zone0", "coretemp:temp1", "coretemp:temp2"]);
    }

    #[test]
    fn test_discovery_with_nothing_is_fatal() {
        let paths = fixture_roots("empty");
        assert!(
            matches!(
                SensorBank::discover_in(&paths),
                Err(ThermiteError::StartupCapabilityMissing(_))
            ),
            "zero sensors must be a startup failure"
        );
    }

    #[test]
    fn test_sample_aggregates_max_and_mean() {
        let paths = fixture_roots("aggregate");
        add_zone(&paths, 0, 40_000);
        add_zone(&paths, 1, 50_000);

        let bank = SensorBank::discover_in(&paths).expect("discovery");
        let sample = bank.sample().expect("sample");
        assert_eq!(sample.max_temp, 50_000);
        assert_eq!(sample.avg_temp, 45_000);
    }

    #[test]
    fn test_vanished_sensor_is_excluded() {
        let paths = fixture_roots("vanished");
        add_zone(&paths, 0, 40_000);
        let doomed = add_zone(&paths, 1, 90_000);

        let bank = SensorBank::discover_in(&paths).expect("discovery");
        fs::remove_file(&doomed).expect("vanish");

        let sample = bank.sample().expect("survivor should carry the tick");
        assert_eq!(sample.max_temp, 40_000);
        assert_eq!(sample.avg_temp, 40_000);
    }

    #[test]
    fn test_all_sensors_vanished_fails_the_tick() {
        let paths = fixture_roots("all_vanished");
        let only = add_zone(&paths, 0, 40_000);

        let bank = SensorBank::discover_in(&paths).expect("discovery");
        fs::remove_file(&only).expect("vanish");

        assert!(
            matches!(bank.sample(), Err(ThermiteError::AllSensorsUnavailable)),
            "an empty tick must surface as AllSensorsUnavailable"
        );
    }
}
