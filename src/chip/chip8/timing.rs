use std::time::{Duration, Instant};

use log::warn;

use crate::chip::{
    chip8::constants::{
        period_of, CHIP8_DEFAULT_INSTRUCTION_HZ, CHIP8_DEFAULT_MAX_CATCH_UP,
        CHIP8_DEFAULT_TIMER_HZ,
    },
    Chip, MachineError,
};

/// Rates at which a host drives the chip. Both are wall-clock rates and are
/// independent of each other. Both are never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingConfig {
    /// Instruction cycles per second.
    instruction_hz: u32,

    /// Delay/sound timer ticks per second.
    timer_hz: u32,

    /// Most periods a single activity fires in one go when the host fell behind.
    max_catch_up: u32,
}

impl PacingConfig {
    /// Returns `None` if either rate is zero.
    pub fn new(instruction_hz: u32, timer_hz: u32) -> Option<Self> {
        if instruction_hz == 0 || timer_hz == 0 {
            return None;
        }
        Some(PacingConfig {
            instruction_hz,
            timer_hz,
            max_catch_up: CHIP8_DEFAULT_MAX_CATCH_UP,
        })
    }

    pub fn instruction_hz(&self) -> u32 {
        self.instruction_hz
    }

    pub fn timer_hz(&self) -> u32 {
        self.timer_hz
    }

    pub fn max_catch_up(&self) -> u32 {
        self.max_catch_up
    }

    pub fn instruction_period(&self) -> Duration {
        period_of(self.instruction_hz)
    }

    pub fn timer_period(&self) -> Duration {
        period_of(self.timer_hz)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            instruction_hz: CHIP8_DEFAULT_INSTRUCTION_HZ,
            timer_hz: CHIP8_DEFAULT_TIMER_HZ,
            max_catch_up: CHIP8_DEFAULT_MAX_CATCH_UP,
        }
    }
}

/// Fires at a fixed wall-clock interval. Callers supply the current time, which
/// keeps the ticker free of any clock of its own.
#[derive(Clone, Debug)]
pub struct Ticker {
    interval: Duration,
    next_deadline: Instant,
    max_catch_up: u32,
}

impl Ticker {
    pub fn new(interval: Duration, max_catch_up: u32, now: Instant) -> Self {
        Ticker {
            interval,
            next_deadline: now + interval,
            max_catch_up: max_catch_up.max(1),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Changes the interval. The next deadline is one new interval after `now`.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        self.next_deadline = now + interval;
    }

    /// Returns how many periods elapsed up to `now` and advances the schedule past
    /// them. If more than `max_catch_up` periods are overdue, only that many are
    /// reported and the schedule restarts from `now`.
    pub fn due(&mut self, now: Instant) -> u32 {
        if now < self.next_deadline {
            return 0;
        }
        let overdue = now.duration_since(self.next_deadline);
        let periods = 1 + overdue.as_nanos() / self.interval.as_nanos().max(1);
        if periods > self.max_catch_up as u128 {
            self.next_deadline = now + self.interval;
            return self.max_catch_up;
        }
        let periods = periods as u32;
        self.next_deadline += self.interval * periods;
        periods
    }
}

/// What one call to `Pacer::run_due` did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaceReport {
    pub timer_ticks: u32,
    pub steps: u32,
    /// The error that halted the chip during this call, if any.
    pub halted: Option<MachineError>,
}

/// Drives a chip's instruction cycle and its timers from two independent tickers.
pub struct Pacer {
    config: PacingConfig,
    cycle: Ticker,
    timer: Ticker,
}

impl Pacer {
    pub fn new(config: PacingConfig, now: Instant) -> Self {
        Pacer {
            config,
            cycle: Ticker::new(config.instruction_period(), config.max_catch_up, now),
            timer: Ticker::new(config.timer_period(), config.max_catch_up, now),
        }
    }

    pub fn config(&self) -> PacingConfig {
        self.config
    }

    /// Changes the instruction rate, leaving the timers untouched. Zero is
    /// rejected and leaves the rate as it was.
    pub fn set_instruction_hz(&mut self, instruction_hz: u32, now: Instant) -> bool {
        match PacingConfig::new(instruction_hz, self.config.timer_hz) {
            Some(config) => {
                self.config.instruction_hz = config.instruction_hz;
                self.cycle.set_interval(self.config.instruction_period(), now);
                true
            }
            None => false,
        }
    }

    /// Fires the timer ticks and then the instruction cycles that are due at
    /// `now`. Stepping stops at once when the chip halts; a chip that is already
    /// halted is not stepped at all, but its timers keep running down.
    pub fn run_due<C: Chip>(&mut self, chip: &mut C, now: Instant) -> PaceReport {
        let mut report = PaceReport::default();

        for _ in 0..self.timer.due(now) {
            chip.tick_timers();
            report.timer_ticks += 1;
        }

        let due_steps = self.cycle.due(now);
        for _ in 0..due_steps {
            if chip.is_halted() {
                break;
            }
            match chip.step() {
                Ok(_) => report.steps += 1,
                Err(e) => {
                    warn!("Stopped stepping after {} of {} cycles: {}", report.steps, due_steps, e);
                    report.halted = Some(e);
                    break;
                }
            }
        }

        report
    }
}
