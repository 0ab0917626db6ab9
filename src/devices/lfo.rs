//! LFO ("MOD OSC") timer driver.
//!
//! The LFO is a triangle-core oscillator: a CA3080 OTA (U49) charges C58 with
//! a constant current of +/- Iabc between the triangle peaks of about
//! +/-1.5V, while a comparator produces the +/-14V square wave. The OTA input
//! swing is far outside its linear range, so the charge current saturates at
//! Iabc and each half-period is simply `2 * Vpeak * C / Iabc`.
//!
//! Only the square wave is visible to the firmware (keyboard status D5) and
//! to the front panel (MOD RATE LED), so the driver reduces the oscillator to
//! a periodic timer that flips a bit.

use crate::analog::{cap_u, res_k, voltage_divider};
use std::time::Duration;
use tracing::{debug, trace};

/// Peak of the square wave, close to the 15V supply.
pub const V_PEAK_SQUARE: f32 = 14.0;

/// Peak of the triangle wave (R219/R220 divider on the square wave).
pub fn v_peak_triangle() -> f32 {
    V_PEAK_SQUARE * voltage_divider(res_k(100.0), res_k(12.0))
}

/// LFO timing capacitor C58.
pub fn lfo_c() -> f32 {
    cap_u(0.33)
}

/// Shortest half-period the timer is armed with.
pub const MIN_HALF_PERIOD: Duration = Duration::from_nanos(1);

/// Time to swing the triangle from one peak to the other with `current`
/// amps.
///
/// Returns `None` when the oscillator is stopped: the current is not strictly
/// positive, or the half-period is too long to represent.
///
/// ```rust
/// use moog_source::devices::lfo::half_period;
///
/// assert_eq!(half_period(0.0), None);
/// let fast = half_period(10e-6).unwrap();
/// let slow = half_period(1e-6).unwrap();
/// assert!(fast < slow);
/// ```
pub fn half_period(current: f32) -> Option<Duration> {
    if current.is_nan() || current <= 0.0 {
        return None;
    }
    let seconds = 2.0 * f64::from(v_peak_triangle()) * f64::from(lfo_c()) / f64::from(current);
    Duration::try_from_secs_f64(seconds)
        .ok()
        .map(|t| t.max(MIN_HALF_PERIOD))
}

/// One-shot-then-periodic timer with cancellation by generation.
///
/// Every [`arm`](Self::arm) or [`disarm`](Self::disarm) bumps the generation,
/// so firings already queued for an older generation are recognized as stale
/// and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodicTimer {
    generation: u64,
    next_fire: Option<Duration>,
    period: Duration,
}

impl PeriodicTimer {
    /// Create a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the timer is running.
    pub fn is_armed(&self) -> bool {
        self.next_fire.is_some()
    }

    /// Fire first at `now + first`, then every `period`. Returns the new
    /// generation.
    pub fn arm(&mut self, now: Duration, first: Duration, period: Duration) -> u64 {
        self.generation += 1;
        self.next_fire = Some(now + first);
        self.period = period;
        self.generation
    }

    /// Stop the timer, invalidating pending firings.
    pub fn disarm(&mut self) {
        self.generation += 1;
        self.next_fire = None;
    }

    /// Time left until the next firing, if armed.
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        self.next_fire.map(|at| at.saturating_sub(now))
    }

    /// Interval between firings of the armed timer.
    pub fn period(&self) -> Option<Duration> {
        self.next_fire.map(|_| self.period)
    }

    /// Fraction of the current period still to run, 0 when disarmed.
    pub fn remaining_fraction(&self, now: Duration) -> f64 {
        match (self.remaining(now), self.period()) {
            (Some(remaining), Some(period)) if !period.is_zero() => {
                (remaining.as_secs_f64() / period.as_secs_f64()).min(1.0)
            }
            _ => 0.0,
        }
    }

    /// Handle a firing queued under `generation`. Returns when the timer
    /// fires next, or `None` if the firing is stale. A timer whose next
    /// firing falls past the end of representable time disarms itself.
    pub fn fire(&mut self, generation: u64, now: Duration) -> Option<Duration> {
        if generation != self.generation || self.next_fire.is_none() {
            return None;
        }
        self.next_fire = now.checked_add(self.period);
        self.next_fire
    }
}

/// What the caller must schedule after an LFO recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoSchedule {
    /// Queue a tick at `first_tick` under `generation`.
    Armed {
        /// Absolute time of the next square-wave edge.
        first_tick: Duration,
        /// Timer generation to tag the tick with.
        generation: u64,
        /// New half-period.
        half_period: Duration,
    },
    /// Oscillation stopped; nothing to queue.
    Stopped,
}

/// LFO driver state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lfo {
    control_current: f32,
    state: bool,
    timer: PeriodicTimer,
}

impl Lfo {
    /// Create a stopped LFO with its square wave low.
    pub fn new() -> Self {
        Self::default()
    }

    /// OTA control current (Iabc) in amps.
    pub fn control_current(&self) -> f32 {
        self.control_current
    }

    /// Store a new control current. The caller schedules the recompute.
    pub fn set_control_current(&mut self, amps: f32) {
        self.control_current = amps;
    }

    /// Square-wave output.
    pub fn state(&self) -> bool {
        self.state
    }

    /// Force the square-wave output, for save states.
    pub fn set_state(&mut self, state: bool) {
        self.state = state;
    }

    /// MOD RATE LED level (active low, so lit while the square wave is low).
    pub fn mod_rate_led(&self) -> u8 {
        u8::from(!self.state)
    }

    /// Underlying timer.
    pub fn timer(&self) -> &PeriodicTimer {
        &self.timer
    }

    /// Stop the timer without touching the square-wave output. The next
    /// recompute starts a new half-cycle with an immediate edge.
    pub fn stop_timer(&mut self) {
        self.timer.disarm();
    }

    /// Re-derive the half-period from the control current and re-arm the
    /// timer at `now`, keeping the same fraction of the current half-cycle
    /// still to run.
    pub fn recompute(&mut self, now: Duration) -> LfoSchedule {
        let fraction = self.timer.remaining_fraction(now);
        let schedule = half_period(self.control_current).and_then(|t_half| {
            let t_remaining = t_half.mul_f64(fraction);
            now.checked_add(t_remaining)
                .map(|first_tick| (first_tick, t_remaining, t_half))
        });
        match schedule {
            Some((first_tick, t_remaining, t_half)) => {
                let generation = self.timer.arm(now, t_remaining, t_half);
                debug!(
                    target: "moog_source::lfo",
                    "LFO frequency updated - Icharge: {} uA, t_remaining: {:?}, t_half: {:?}, f: {}",
                    self.control_current * 1e6,
                    t_remaining,
                    t_half,
                    1.0 / (2.0 * t_half.as_secs_f64())
                );
                LfoSchedule::Armed {
                    first_tick,
                    generation,
                    half_period: t_half,
                }
            }
            None => {
                self.timer.disarm();
                debug!(
                    target: "moog_source::lfo",
                    "LFO stopped - Icharge: {} uA",
                    self.control_current * 1e6
                );
                LfoSchedule::Stopped
            }
        }
    }

    /// Handle a timer tick queued under `generation`. Flips the square wave
    /// and returns when the next tick is due; stale ticks change nothing.
    pub fn tick(&mut self, generation: u64, now: Duration) -> Option<Duration> {
        let next = self.timer.fire(generation, now)?;
        self.state = !self.state;
        trace!(target: "moog_source::lfo", "LFO Timer ticked: {}", self.state);
        Some(next)
    }
}
