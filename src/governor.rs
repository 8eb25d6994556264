//! ═══════════════════════════════════════════════════════════════════════════════
//! GOVERNOR — Per-Tick Thermal Control Decisions
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! The only component with cross-tick memory beyond the trend window. One
//! tick is one atomic decision cycle over three competing goals: maximize
//! performance, bound peak temperature, avoid mechanical and acoustic
//! oscillation.
//!
//! Design:
//! - Deterministic step function over GovernorState + inputs. No I/O in
//!   here; the runner owns sensors, devices, and timing.
//! - Fan logic is a fixed-order override-rule list, each rule independently
//!   testable, later rules winning.
//! - Asymmetric cpu response: large fast cuts under thermal stress, a slow
//!   bounded ramp on recovery, with current demand as a hard ceiling.
//! - Clamp accumulator engages only past the extreme/overtemp bands and
//!   decays whenever the overtemp band clears.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::collections::VecDeque;

use crate::sensors::ThermalSample;

/// Retained clamp commitments, observability only. No decision reads it.
pub const CLAMP_HISTORY_LEN: usize = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG — control thresholds and their defaults
// ═══════════════════════════════════════════════════════════════════════════════

/// All control thresholds. Temperatures are millidegrees Celsius, levels are
/// device units (fan 0..8, cpu/clamp percent).
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Above this, the clamp takes its large step
    pub extreme_mdeg: i64,
    /// Above this, cpu shedding engages and the fan is forced to maximum
    pub overtemp_mdeg: i64,
    /// Above this (and not overtemp), the fan is forced to maximum
    pub hot_mdeg: i64,
    /// Above this (and not hot/overtemp), the fan creeps with the trend
    pub warm_mdeg: i64,
    /// Below this, the fan is allowed to stop entirely
    pub cold_mdeg: i64,

    /// Idle fan floor outside the cold band
    pub fan_floor: i64,
    /// Cap while merely warm; full blast is reserved for hot and above
    pub fan_warm_ceiling: i64,
    /// Ticks a warm, non-rising level must hold before stepping down
    pub fan_hold_ticks: u32,

    /// Upward cpu ramp per tick when below demand
    pub cpu_step_up: i64,
    /// Overtemp reduction, quiet window
    pub cpu_cut_base: i64,
    /// Overtemp reduction when the window is noisy and still rising
    pub cpu_cut_moderate: i64,
    /// Overtemp reduction when the window is wild and still rising
    pub cpu_cut_heavy: i64,
    /// Variability past this selects the heavy cut
    pub high_variability_mdeg: i64,
    /// Variability past this selects the moderate cut
    pub moderate_variability_mdeg: i64,

    /// Clamp step while extreme
    pub clamp_step_fast: i64,
    /// Clamp step while overtemp with the cpu already cut low
    pub clamp_step_slow: i64,
    /// Clamp decay per non-overtemp tick
    pub clamp_decay: i64,
    /// Governor ceiling on the duty cycle, well under the device maximum
    pub clamp_max: i64,
    /// Cpu level at or under which the clamp assists during overtemp
    pub clamp_assist_cpu: i64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            extreme_mdeg: 80_000,
            overtemp_mdeg: 75_000,
            hot_mdeg: 60_000,
            warm_mdeg: 55_000,
            cold_mdeg: 40_000,

            fan_floor: 1,
            fan_warm_ceiling: 6,
            fan_hold_ticks: 3,

            cpu_step_up: 5,
            cpu_cut_base: 5,
            cpu_cut_moderate: 10,
            cpu_cut_heavy: 20,
            high_variability_mdeg: 20_000,
            moderate_variability_mdeg: 10_000,

            clamp_step_fast: 10,
            clamp_step_slow: 5,
            clamp_decay: 5,
            clamp_max: 50,
            clamp_assist_cpu: 75,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BANDS — derived flags over the tick's peak temperature
// ═══════════════════════════════════════════════════════════════════════════════

/// Temperature bands for one tick. `extreme` implies `overtemp`; `hot` and
/// `warm` are exclusive of `overtemp` and of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bands {
    pub extreme: bool,
    pub overtemp: bool,
    pub hot: bool,
    pub warm: bool,
    pub cold: bool,
}

impl Bands {
    pub fn classify(max_temp: i64, config: &GovernorConfig) -> Self {
        let extreme = max_temp > config.extreme_mdeg;
        let overtemp = max_temp > config.overtemp_mdeg;
        let hot = !overtemp && max_temp > config.hot_mdeg;
        let warm = !overtemp && !hot && max_temp > config.warm_mdeg;
        let cold = max_temp < config.cold_mdeg;
        Self {
            extreme,
            overtemp,
            hot,
            warm,
            cold,
        }
    }

    /// Dominant band for display.
    pub fn name(&self) -> &'static str {
        if self.extreme {
            "Extreme"
        } else if self.overtemp {
            "Overtemp"
        } else if self.hot {
            "Hot"
        } else if self.warm {
            "Warm"
        } else if self.cold {
            "Cold"
        } else {
            "Cool"
        }
    }

    pub fn color(&self) -> &'static str {
        if self.overtemp {
            "\x1b[31m" // red
        } else if self.hot {
            "\x1b[91m" // light red
        } else if self.warm {
            "\x1b[33m" // yellow
        } else if self.cold {
            "\x1b[36m" // cyan
        } else {
            "\x1b[32m" // green
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE AND STEP FUNCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-tick inputs assembled by the runner.
#[derive(Debug, Clone, Copy)]
pub struct TickInputs {
    pub sample: ThermalSample,
    /// 1-minute run-queue average
    pub load_avg: f64,
    /// Trend window range
    pub variability: i64,
    /// Trend window rising flag
    pub rising: bool,
}

/// Commands produced by one tick. `None` means the capability is absent and
/// its branch was skipped.
#[derive(Debug, Clone, Copy)]
pub struct TickDecision {
    pub bands: Bands,
    pub fan: Option<i64>,
    pub cpu: i64,
    pub clamp: Option<i64>,
}

/// All cross-tick control state. Single instance, constructed at startup,
/// mutated only by `tick`/`hold`, never shared.
#[derive(Debug)]
pub struct GovernorState {
    config: GovernorConfig,
    pub target_cpu_level: i64,
    pub cpu_level: i64,
    pub clamp_level: i64,
    pub fan_level: i64,
    pub fan_duration: u32,
    pub tick_index: u64,
    clamp_history: VecDeque<i64>,
    has_fan: bool,
    has_clamp: bool,
}

impl GovernorState {
    /// `fan` carries the actuator's startup level when the fan capability is
    /// present. `initial_cpu` is the cap's startup level (its ceiling).
    pub fn new(config: GovernorConfig, initial_cpu: i64, fan: Option<i64>, has_clamp: bool) -> Self {
        Self {
            config,
            target_cpu_level: initial_cpu,
            cpu_level: initial_cpu,
            clamp_level: 0,
            fan_level: fan.unwrap_or(0),
            fan_duration: 0,
            tick_index: 0,
            clamp_history: VecDeque::with_capacity(CLAMP_HISTORY_LEN),
            has_fan: fan.is_some(),
            has_clamp,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Retained clamp commitments, oldest first.
    pub fn clamp_history(&self) -> impl Iterator<Item = i64> + '_ {
        self.clamp_history.iter().copied()
    }

    /// One atomic decision cycle. Deterministic; no I/O.
    pub fn tick(&mut self, inputs: &TickInputs) -> TickDecision {
        let bands = Bands::classify(inputs.sample.max_temp, &self.config);

        let fan = if self.has_fan {
            Some(self.decide_fan(bands, inputs.rising))
        } else {
            None
        };
        let cpu = self.decide_cpu(bands, inputs.load_avg, inputs.variability, inputs.rising);
        let clamp = if self.has_clamp {
            Some(self.decide_clamp(bands, cpu))
        } else {
            None
        };

        self.tick_index += 1;
        TickDecision {
            bands,
            fan,
            cpu,
            clamp,
        }
    }

    /// Sensor blackout tick: keep every level exactly where it was and only
    /// advance the tick counter.
    pub fn hold(&mut self) {
        self.tick_index += 1;
    }

    /// Fan rules, fixed order, later rules override earlier ones.
    fn decide_fan(&mut self, bands: Bands, rising: bool) -> i64 {
        let config = &self.config;
        let mut fan = self.fan_level;

        // 1. Band response: force max when hot or worse; creep up while warm
        //    and rising; step down from a warm plateau only after holding
        //    long enough; otherwise drop to the idle floor.
        if bands.hot || bands.overtemp {
            fan = FAN_MAX;
        } else if bands.warm && rising {
            fan += 1;
        } else if bands.warm {
            if self.fan_duration > config.fan_hold_ticks {
                fan -= 1;
            }
        } else {
            fan = config.fan_floor;
        }

        // 2. Working range.
        fan = fan.clamp(config.fan_floor, FAN_MAX);

        // 3. Never full blast while merely warm.
        if bands.warm {
            fan = fan.min(config.fan_warm_ceiling);
        }

        // 4. Cold overrides the floor entirely.
        if bands.cold {
            fan = 0;
        }

        // 5. Duration bookkeeping for the plateau rule.
        if fan == self.fan_level {
            self.fan_duration += 1;
        } else {
            self.fan_duration = 0;
        }
        self.fan_level = fan;
        fan
    }

    fn decide_cpu(&mut self, bands: Bands, load_avg: f64, variability: i64, rising: bool) -> i64 {
        let config = &self.config;
        // One fully loaded core of run-queue demand maps to a 100% ceiling.
        let target = ((load_avg * 100.0).round() as i64).clamp(0, 100);
        self.target_cpu_level = target;

        let mut cpu = self.cpu_level;
        if bands.overtemp {
            let cut = if variability > config.high_variability_mdeg && rising {
                config.cpu_cut_heavy
            } else if variability > config.moderate_variability_mdeg && rising {
                config.cpu_cut_moderate
            } else {
                config.cpu_cut_base
            };
            cpu -= cut;
        } else if cpu < target {
            cpu += config.cpu_step_up;
        }

        // Demand is a hard ceiling even while recovering upward.
        cpu = cpu.clamp(0, target);
        self.cpu_level = cpu;
        cpu
    }

    fn decide_clamp(&mut self, bands: Bands, cpu: i64) -> i64 {
        let config = &self.config;
        let mut clamp = self.clamp_level;

        if bands.extreme {
            clamp += config.clamp_step_fast;
        } else if cpu <= config.clamp_assist_cpu && bands.overtemp {
            clamp += config.clamp_step_slow;
        } else if !bands.overtemp {
            clamp -= config.clamp_decay;
        }

        clamp = clamp.clamp(0, config.clamp_max);
        self.clamp_level = clamp;

        if self.clamp_history.len() >= CLAMP_HISTORY_LEN {
            self.clamp_history.pop_front();
        }
        self.clamp_history.push_back(clamp);
        clamp
    }
}

const FAN_MAX: i64 = crate::actuators::FAN_MAX_LEVEL;
