use qzs_core::*;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Tunable cadence parameters for the tick source.
#[derive(Debug, Clone, Copy)]
pub struct ClockConfig {
    /// Full round length in seconds; ticks align to multiples of this.
    pub cycle: Secs,
    /// Recurring periods in milliseconds, one per [`Interval`].
    pub normal: u64,
    pub fast: u64,
    pub slow: u64,
    pub faster: u64,
    pub slower: u64,
    /// Phase error beyond which the period is nudged (ms).
    pub err_threshold: i64,
    /// Phase error beyond which large-skew mode nudges harder (ms).
    pub err_threshold_large: i64,
    /// Lead applied to the aligning one-shot (ms, negative fires early).
    pub init_offset: i64,
    /// Enables the Faster/Slower periods for hosts with heavy timer slop.
    pub large_skew: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            cycle: CYCLE_SECS,
            normal: NORMAL_TICK_MS,
            fast: FAST_TICK_MS,
            slow: SLOW_TICK_MS,
            faster: FASTER_TICK_MS,
            slower: SLOWER_TICK_MS,
            err_threshold: ERR_THRESHOLD_MS,
            err_threshold_large: ERR_THRESHOLD_LARGE_MS,
            init_offset: INIT_OFFSET_MS,
            large_skew: false,
        }
    }
}

/// Discrete recurring-timer periods the fine calibration selects among.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Normal,
    Fast,
    Slow,
    Faster,
    Slower,
}

impl Interval {
    pub fn period(&self, config: &ClockConfig) -> Duration {
        let ms = match self {
            Self::Normal => config.normal,
            Self::Fast => config.fast,
            Self::Slow => config.slow,
            Self::Faster => config.faster,
            Self::Slower => config.slower,
        };
        Duration::from_millis(ms)
    }
    /// Pick the period for the next tick from the signed phase error.
    pub fn choose(err: i64, config: &ClockConfig) -> Self {
        if config.large_skew && err > config.err_threshold_large {
            Self::Faster
        } else if config.large_skew && err < -config.err_threshold_large {
            Self::Slower
        } else if err > config.err_threshold {
            Self::Fast
        } else if err < -config.err_threshold {
            Self::Slow
        } else {
            Self::Normal
        }
    }
}

/// Ticks delivered to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The aligning one-shot landed; carries seconds left to the boundary
    /// measured at fire time (zero when the shot landed on the boundary).
    First { secs_remaining: Secs },
    /// Ordinary recurring tick, nominally one per second.
    Periodic,
}

/// Where the aligning one-shot lands relative to startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    /// Milliseconds from now until the one-shot fires.
    pub delay_ms: i64,
    /// Whole seconds from now until the next cycle boundary.
    pub secs_remaining: Secs,
    /// Absolute epoch of the next cycle boundary.
    pub next_cycle_ms: EpochMs,
}

/// Wall clock in milliseconds since the Unix epoch.
pub fn unix_ms() -> EpochMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_millis() as EpochMs
}

/// Compute the aligning one-shot for a clock started at `now_ms`.
pub fn align(now_ms: EpochMs, cycle: Secs, init_offset: i64) -> Alignment {
    let cycle_ms = cycle as i64 * 1000;
    let next_cycle_ms = now_ms.div_euclid(cycle_ms) * cycle_ms
        + if now_ms.rem_euclid(cycle_ms) == 0 {
            0
        } else {
            cycle_ms
        };
    Alignment {
        delay_ms: (next_cycle_ms - now_ms + init_offset).max(0),
        secs_remaining: ((next_cycle_ms - now_ms) / 1000) as Secs,
        next_cycle_ms,
    }
}

/// Signed offset of `now_ms` from the nearest whole second, in [-500, 499].
pub fn phase_error(now_ms: EpochMs) -> i64 {
    (now_ms + 500).rem_euclid(1000) - 500
}

/// Self-calibrating once-per-second tick source.
///
/// `start` schedules a one-shot aligned to the next cycle boundary, then a
/// recurring loop whose period is re-chosen after every tick so firings stay
/// near the whole-second mark. The scheduler consumes the resulting stream;
/// the clock itself never touches game state.
#[derive(Debug)]
pub struct Clock {
    config: ClockConfig,
    handle: Option<JoinHandle<()>>,
}

impl Clock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            handle: None,
        }
    }
    pub fn with_defaults() -> Self {
        Self::new(ClockConfig::default())
    }
    pub fn running(&self) -> bool {
        self.handle.is_some()
    }
    /// Spawn the tick task. Returns the startup alignment so the scheduler
    /// can seed `secs_remaining` before the first tick arrives.
    pub fn start(&mut self, ticks: UnboundedSender<Tick>) -> Alignment {
        let config = self.config;
        let alignment = align(unix_ms(), config.cycle, config.init_offset);
        log::info!(
            "[clock] first tick in {}ms, {}s to cycle boundary",
            alignment.delay_ms,
            alignment.secs_remaining
        );
        let next_cycle_ms = alignment.next_cycle_ms;
        self.stop();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(alignment.delay_ms as u64)).await;
            let landed = ((next_cycle_ms - unix_ms()).max(0) / 1000) as Secs;
            if ticks.send(Tick::First { secs_remaining: landed }).is_err() {
                return;
            }
            let mut interval = Interval::Normal;
            loop {
                tokio::time::sleep(interval.period(&config)).await;
                if ticks.send(Tick::Periodic).is_err() {
                    break;
                }
                let chosen = Interval::choose(phase_error(unix_ms()), &config);
                if chosen != interval {
                    log::debug!("[clock] recalibrated {:?} -> {:?}", interval, chosen);
                    interval = chosen;
                }
            }
        }));
        alignment
    }
    /// Cancel the pending one-shot and the recurring loop.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::info!("[clock] stopped");
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.stop();
    }
}
