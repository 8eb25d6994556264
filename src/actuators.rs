//! ═══════════════════════════════════════════════════════════════════════════════
//! ACTUATORS — Thermal Actuator Capability and Device Kinds
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! One capability seam for three device kinds:
//! - ThinkpadFan: /proc/acpi/ibm/fan, levels 0..8, level 8 is "disengaged"
//! - PerfCap: percent ceiling on CPU performance, via intel_pstate or the
//!   cpufreq frequency table as a fallback backend
//! - PowerClamp: idle-injection duty cycle, located by cooling-device type
//!
//! Contract: `set_level` clamps into bounds and re-commits the device on
//! every call, even when the level is unchanged. The cached level advances
//! whether or not the OS accepted the write; the governor's own state is
//! ground truth and hardware is never re-read after the initial probe.
//! A rejected write is logged critical and the tick continues.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::{Path, PathBuf};

use crate::error::{ThermiteError, ThermiteResult};
use crate::sysfs;

pub const FAN_PATH: &str = "/proc/acpi/ibm/fan";
pub const PSTATE_ROOT: &str = "/sys/devices/system/cpu/intel_pstate";
pub const CPU_ROOT: &str = "/sys/devices/system/cpu";
pub const THERMAL_ROOT: &str = "/sys/class/thermal";
pub const POWERCLAMP_TYPE: &str = "intel_powerclamp";

pub const FAN_MAX_LEVEL: i64 = 8;
/// Moderate startup default, neither silent nor screaming.
pub const FAN_INITIAL_LEVEL: i64 = 3;
pub const CAP_MAX_LEVEL: i64 = 100;
/// Floor bound written once at startup so the cap can never park the CPU.
pub const CAP_FLOOR_PCT: i64 = 1;
pub const CLAMP_DEVICE_MAX: i64 = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// CAPABILITY SEAM
// ═══════════════════════════════════════════════════════════════════════════════

/// Uniform actuator capability. No base-class hierarchy; each device kind
/// implements this seam and the registry below holds them by kind.
pub trait Actuator {
    /// Tag used in log lines.
    fn label(&self) -> &'static str;
    /// Cached level; never re-reads hardware.
    fn level(&self) -> i64;
    /// Inclusive (min, max) commandable range.
    fn bounds(&self) -> (i64, i64);
    /// Clamp, commit to the device, advance the cached level.
    /// Returns the clamped level actually adopted.
    fn set_level(&mut self, requested: i64) -> i64;
}

fn log_write_failure(err: &ThermiteError) {
    println!("\x1b[31m[ACTUATE] {}\x1b[0m", err);
}

// ═══════════════════════════════════════════════════════════════════════════════
// THINKPAD FAN — textual command channel, disengaged sentinel at level 8
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ThinkpadFan {
    path: PathBuf,
    level: i64,
    previous_level: i64,
    /// Consecutive set_level calls that kept the same level.
    duration: u32,
}

impl ThinkpadFan {
    /// Optional capability: absent command file means the platform has no
    /// such controller and the fan path is skipped for the run.
    pub fn discover() -> Option<Self> {
        Self::at(PathBuf::from(FAN_PATH))
    }

    pub fn at(path: PathBuf) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let fan = Self {
            path,
            level: FAN_INITIAL_LEVEL,
            previous_level: FAN_INITIAL_LEVEL,
            duration: 0,
        };
        fan.commit(FAN_INITIAL_LEVEL);
        Some(fan)
    }

    pub fn previous_level(&self) -> i64 {
        self.previous_level
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    fn commit(&self, level: i64) {
        let command = if level == FAN_MAX_LEVEL {
            // Hardware convention: full speed is requested by disengaging
            // the firmware limiter, not by a numeric level.
            "level disengaged".to_string()
        } else {
            format!("level {}", level)
        };
        if let Err(source) = sysfs::write_str(&self.path, &command) {
            log_write_failure(&ThermiteError::DeviceWrite {
                device: "fan",
                path: self.path.clone(),
                source,
            });
        }
    }
}

impl Actuator for ThinkpadFan {
    fn label(&self) -> &'static str {
        "fan"
    }

    fn level(&self) -> i64 {
        self.level
    }

    fn bounds(&self) -> (i64, i64) {
        (0, FAN_MAX_LEVEL)
    }

    fn set_level(&mut self, requested: i64) -> i64 {
        let level = requested.clamp(0, FAN_MAX_LEVEL);
        self.commit(level);
        if level == self.level {
            self.duration += 1;
        } else {
            self.duration = 0;
            self.previous_level = self.level;
            self.level = level;
        }
        level
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERFORMANCE CAP — percent ceiling, intel_pstate primary / cpufreq fallback
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct IntelPstate {
    ceiling_path: PathBuf,
    level: i64,
}

impl IntelPstate {
    /// Writes the fixed bounds once (floor 1%, ceiling 100%) and adopts the
    /// ceiling as the working level. Bound-write failure here is fatal: a cap
    /// that cannot be activated is a missing required capability.
    pub fn at(root: PathBuf) -> ThermiteResult<Self> {
        let ceiling_path = root.join("max_perf_pct");
        sysfs::write_int(&ceiling_path, CAP_MAX_LEVEL).map_err(|source| {
            ThermiteError::DeviceWrite {
                device: "perf cap",
                path: ceiling_path.clone(),
                source,
            }
        })?;
        let floor_path = root.join("min_perf_pct");
        sysfs::write_int(&floor_path, CAP_FLOOR_PCT).map_err(|source| {
            ThermiteError::DeviceWrite {
                device: "perf cap",
                path: floor_path,
                source,
            }
        })?;
        let level = sysfs::read_int(&ceiling_path)?;
        Ok(Self {
            ceiling_path,
            level,
        })
    }
}

impl Actuator for IntelPstate {
    fn label(&self) -> &'static str {
        "perf cap"
    }

    fn level(&self) -> i64 {
        self.level
    }

    fn bounds(&self) -> (i64, i64) {
        (0, CAP_MAX_LEVEL)
    }

    fn set_level(&mut self, requested: i64) -> i64 {
        let level = requested.clamp(0, CAP_MAX_LEVEL);
        if let Err(source) = sysfs::write_int(&self.ceiling_path, level) {
            log_write_failure(&ThermiteError::DeviceWrite {
                device: "perf cap",
                path: self.ceiling_path.clone(),
                source,
            });
        }
        self.level = level;
        level
    }
}

/// Fallback cap backend for machines without intel_pstate: maps the percent
/// level onto the cpufreq frequency table and writes `scaling_max_freq`
/// across every CPU.
#[derive(Debug)]
pub struct CpufreqPolicy {
    ceiling_paths: Vec<PathBuf>,
    /// Ascending commandable frequencies (kHz)
    table: Vec<i64>,
    level: i64,
}

impl CpufreqPolicy {
    pub fn at(root: PathBuf) -> ThermiteResult<Self> {
        let cpu0 = root.join("cpu0/cpufreq");
        let min_freq = sysfs::read_int(&cpu0.join("cpuinfo_min_freq"))?;
        let max_freq = sysfs::read_int(&cpu0.join("cpuinfo_max_freq"))?;

        let mut ceiling_paths = Vec::new();
        for dir in sysfs::scan_dir(&root, "cpu", "") {
            let is_cpu_dir = dir
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("cpu"))
                .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()));
            if is_cpu_dir {
                ceiling_paths.push(dir.join("cpufreq/scaling_max_freq"));
            }
        }
        if ceiling_paths.is_empty() {
            return Err(ThermiteError::StartupCapabilityMissing(
                "cpufreq present but no cpu policy directories".to_string(),
            ));
        }

        let avail = cpu0.join("scaling_available_frequencies");
        let mut table = if avail.exists() {
            sysfs::read_ints(&avail)?
        } else {
            // No published table: synthesize a linear one across the
            // hardware range, matching the granularity the governor needs.
            const STEPS: i64 = 255;
            (0..=STEPS)
                .map(|i| min_freq + (max_freq - min_freq) * i / STEPS)
                .collect()
        };
        table.sort_unstable();
        table.dedup();
        if table.is_empty() {
            return Err(ThermiteError::StartupCapabilityMissing(
                "cpufreq frequency table is empty".to_string(),
            ));
        }

        let mut policy = Self {
            ceiling_paths,
            table,
            level: CAP_MAX_LEVEL,
        };
        // Assert the unrestricted ceiling once so the startup state matches
        // the cached level.
        policy.set_level(CAP_MAX_LEVEL);
        Ok(policy)
    }

    fn frequency_for(&self, level: i64) -> i64 {
        let last = (self.table.len() - 1) as i64;
        let index = level * last / CAP_MAX_LEVEL;
        self.table[index as usize]
    }
}

impl Actuator for CpufreqPolicy {
    fn label(&self) -> &'static str {
        "perf cap"
    }

    fn level(&self) -> i64 {
        self.level
    }

    fn bounds(&self) -> (i64, i64) {
        (0, CAP_MAX_LEVEL)
    }

    fn set_level(&mut self, requested: i64) -> i64 {
        let level = requested.clamp(0, CAP_MAX_LEVEL);
        let freq = self.frequency_for(level);
        for path in &self.ceiling_paths {
            if let Err(source) = sysfs::write_int(path, freq) {
                log_write_failure(&ThermiteError::DeviceWrite {
                    device: "perf cap",
                    path: path.clone(),
                    source,
                });
            }
        }
        self.level = level;
        level
    }
}

/// Tagged-variant cap registry entry: whichever backend discovery found.
#[derive(Debug)]
pub enum PerfCap {
    Pstate(IntelPstate),
    Cpufreq(CpufreqPolicy),
}

impl PerfCap {
    /// Required capability: neither backend present is a fatal startup error.
    pub fn discover() -> ThermiteResult<Self> {
        let pstate_root = PathBuf::from(PSTATE_ROOT);
        if pstate_root.join("max_perf_pct").exists() {
            return Ok(PerfCap::Pstate(IntelPstate::at(pstate_root)?));
        }
        let cpu_root = PathBuf::from(CPU_ROOT);
        if cpu_root.join("cpu0/cpufreq/cpuinfo_max_freq").exists() {
            return Ok(PerfCap::Cpufreq(CpufreqPolicy::at(cpu_root)?));
        }
        Err(ThermiteError::StartupCapabilityMissing(
            "no intel_pstate or cpufreq performance cap".to_string(),
        ))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            PerfCap::Pstate(_) => "intel_pstate",
            PerfCap::Cpufreq(_) => "cpufreq",
        }
    }
}

impl Actuator for PerfCap {
    fn label(&self) -> &'static str {
        "perf cap"
    }

    fn level(&self) -> i64 {
        match self {
            PerfCap::Pstate(inner) => inner.level(),
            PerfCap::Cpufreq(inner) => inner.level(),
        }
    }

    fn bounds(&self) -> (i64, i64) {
        (0, CAP_MAX_LEVEL)
    }

    fn set_level(&mut self, requested: i64) -> i64 {
        match self {
            PerfCap::Pstate(inner) => inner.set_level(requested),
            PerfCap::Cpufreq(inner) => inner.set_level(requested),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POWER CLAMP — idle-injection duty cycle, located by cooling-device type
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct PowerClamp {
    path: PathBuf,
    level: i64,
}

impl PowerClamp {
    /// Scan cooling devices for the powerclamp marker. Pure lookup so probe
    /// can report presence without touching the device.
    pub fn locate(thermal_root: &Path) -> Option<PathBuf> {
        for dev in sysfs::scan_dir(thermal_root, "cooling_device", "") {
            if let Ok(ty) = sysfs::read_trimmed(&dev.join("type")) {
                if ty == POWERCLAMP_TYPE {
                    return Some(dev.join("cur_state"));
                }
            }
        }
        None
    }

    /// Optional capability: a machine without the powerclamp driver simply
    /// runs without the clamp branch.
    pub fn discover(thermal_root: &Path) -> Option<Self> {
        let path = Self::locate(thermal_root)?;
        let mut clamp = Self { path, level: 0 };
        clamp.set_level(0);
        Some(clamp)
    }
}

impl Actuator for PowerClamp {
    fn label(&self) -> &'static str {
        "power clamp"
    }

    fn level(&self) -> i64 {
        self.level
    }

    fn bounds(&self) -> (i64, i64) {
        (0, CLAMP_DEVICE_MAX)
    }

    fn set_level(&mut self, requested: i64) -> i64 {
        let level = requested.clamp(0, CLAMP_DEVICE_MAX);
        if let Err(source) = sysfs::write_int(&self.path, level) {
            log_write_failure(&ThermiteError::DeviceWrite {
                device: "power clamp",
                path: self.path.clone(),
                source,
            });
        }
        self.level = level;
        level
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY — built once at startup by discovery
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ActuatorSet {
    pub fan: Option<ThinkpadFan>,
    pub cap: PerfCap,
    pub clamp: Option<PowerClamp>,
}

impl ActuatorSet {
    pub fn discover() -> ThermiteResult<Self> {
        Ok(Self {
            fan: ThinkpadFan::discover(),
            cap: PerfCap::discover()?,
            clamp: PowerClamp::discover(Path::new(THERMAL_ROOT)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("thermite_actuators_{}", tag));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("fixture dir");
        dir
    }

    #[test]
    fn test_fan_commands_and_disengaged_sentinel() {
        let dir = fixture_dir("fan");
        let path = dir.join("fan");
        fs::write(&path, "").expect("fan file");

        let mut fan = ThinkpadFan::at(path.clone()).expect("fan present");
        assert_eq!(fan.level(), FAN_INITIAL_LEVEL);
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            format!("level {}", FAN_INITIAL_LEVEL)
        );

        fan.set_level(5);
        assert_eq!(fs::read_to_string(&path).expect("read"), "level 5");

        fan.set_level(FAN_MAX_LEVEL);
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "level disengaged",
            "full speed must use the disengage token, not a number"
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_fan_clamps_requests_into_range() {
        let dir = fixture_dir("fan_clamp");
        let path = dir.join("fan");
        fs::write(&path, "").expect("fan file");

        let mut fan = ThinkpadFan::at(path).expect("fan present");
        assert_eq!(fan.set_level(99), FAN_MAX_LEVEL);
        assert_eq!(fan.set_level(-3), 0);
        assert_eq!(fan.level(), 0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_fan_duration_and_previous_bookkeeping() {
        let dir = fixture_dir("fan_duration");
        let path = dir.join("fan");
        fs::write(&path, "").expect("fan file");

        let mut fan = ThinkpadFan::at(path).expect("fan present");
        fan.set_level(FAN_INITIAL_LEVEL);
        fan.set_level(FAN_INITIAL_LEVEL);
        assert_eq!(fan.duration(), 2, "held level accumulates duration");

        fan.set_level(4);
        assert_eq!(fan.duration(), 0, "level change resets duration");
        assert_eq!(fan.previous_level(), FAN_INITIAL_LEVEL);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_fan_absent_is_none() {
        let path = std::env::temp_dir().join("thermite_actuators_no_fan/fan");
        assert!(ThinkpadFan::at(path).is_none());
    }

    #[test]
    fn test_cached_level_advances_past_failed_write() {
        let dir = fixture_dir("fan_drift");
        let path = dir.join("fan");
        fs::write(&path, "").expect("fan file");

        let mut fan = ThinkpadFan::at(path).expect("fan present");
        // Yank the device out from under the actuator.
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(fan.set_level(7), 7);
        assert_eq!(
            fan.level(),
            7,
            "cached level is ground truth even when the write is rejected"
        );
    }

    #[test]
    fn test_pstate_writes_bounds_once_and_starts_at_ceiling() {
        let root = fixture_dir("pstate");
        let mut cap = IntelPstate::at(root.clone()).expect("pstate");
        assert_eq!(cap.level(), CAP_MAX_LEVEL);
        assert_eq!(
            sysfs::read_int(&root.join("min_perf_pct")).expect("floor"),
            CAP_FLOOR_PCT
        );
        assert_eq!(
            sysfs::read_int(&root.join("max_perf_pct")).expect("ceiling"),
            CAP_MAX_LEVEL
        );

        cap.set_level(60);
        assert_eq!(
            sysfs::read_int(&root.join("max_perf_pct")).expect("ceiling"),
            60
        );
        assert_eq!(
            sysfs::read_int(&root.join("min_perf_pct")).expect("floor"),
            CAP_FLOOR_PCT,
            "ticks only rewrite the working ceiling"
        );

        let _ = fs::remove_dir_all(&root);
    }

    fn cpufreq_fixture(tag: &str, cpus: usize) -> PathBuf {
        let root = fixture_dir(tag);
        for index in 0..cpus {
            let policy = root.join(format!("cpu{}/cpufreq", index));
            fs::create_dir_all(&policy).expect("policy dir");
            fs::write(policy.join("scaling_max_freq"), "0").expect("ceiling");
        }
        let cpu0 = root.join("cpu0/cpufreq");
        fs::write(cpu0.join("cpuinfo_min_freq"), "400000").expect("min");
        fs::write(cpu0.join("cpuinfo_max_freq"), "3000000").expect("max");
        root
    }

    #[test]
    fn test_cpufreq_maps_percent_onto_published_table() {
        let root = cpufreq_fixture("cpufreq_table", 2);
        fs::write(
            root.join("cpu0/cpufreq/scaling_available_frequencies"),
            "400000 1200000 2000000 3000000",
        )
        .expect("table");

        let mut cap = CpufreqPolicy::at(root.clone()).expect("cpufreq");
        assert_eq!(cap.level(), CAP_MAX_LEVEL);
        for index in 0..2 {
            assert_eq!(
                sysfs::read_int(&root.join(format!("cpu{}/cpufreq/scaling_max_freq", index)))
                    .expect("ceiling"),
                3_000_000,
                "startup asserts the top of the table on every cpu"
            );
        }

        cap.set_level(0);
        assert_eq!(
            sysfs::read_int(&root.join("cpu0/cpufreq/scaling_max_freq")).expect("ceiling"),
            400_000
        );

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_cpufreq_synthesizes_table_when_absent() {
        let root = cpufreq_fixture("cpufreq_synth", 1);
        let mut cap = CpufreqPolicy::at(root.clone()).expect("cpufreq");

        cap.set_level(50);
        let written =
            sysfs::read_int(&root.join("cpu0/cpufreq/scaling_max_freq")).expect("ceiling");
        assert!(
            (400_000..=3_000_000).contains(&written),
            "synthesized table must stay inside the hardware range, wrote {}",
            written
        );
        assert!(
            written < 3_000_000,
            "a 50% cap must land below the hardware maximum"
        );

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_powerclamp_located_by_type_marker() {
        let root = fixture_dir("clamp");
        let other = root.join("cooling_device0");
        fs::create_dir_all(&other).expect("dev dir");
        fs::write(other.join("type"), "Processor\n").expect("type");
        fs::write(other.join("cur_state"), "0").expect("state");

        let target = root.join("cooling_device1");
        fs::create_dir_all(&target).expect("dev dir");
        fs::write(target.join("type"), "intel_powerclamp\n").expect("type");
        fs::write(target.join("cur_state"), "17").expect("state");

        let mut clamp = PowerClamp::discover(&root).expect("clamp present");
        assert_eq!(clamp.level(), 0, "startup forces the clamp to zero");
        assert_eq!(
            sysfs::read_int(&target.join("cur_state")).expect("state"),
            0
        );

        clamp.set_level(30);
        assert_eq!(
            sysfs::read_int(&target.join("cur_state")).expect("state"),
            30
        );

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_powerclamp_absent_is_none() {
        let root = fixture_dir("clamp_absent");
        let dev = root.join("cooling_device0");
        fs::create_dir_all(&dev).expect("dev dir");
        fs::write(dev.join("type"), "Fan\n").expect("type");

        assert!(PowerClamp::discover(&root).is_none());
        let _ = fs::remove_dir_all(&root);
    }
}
