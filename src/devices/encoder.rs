//! Rotary encoder (parameter value knob).
//!
//! The encoder reports an absolute position in `0..240` that wraps around.
//! Every movement latches the direction and asserts /INT; the firmware's
//! interrupt handler reads the direction bit, which also clears /INT
//! (U21B, U7A, U15A).

use tracing::debug;

/// Number of encoder positions before wrapping.
pub const ENCODER_POSITIONS: u8 = 240;

/// Positions on either side of the wrap point treated as a wrap.
pub const WRAP_BUFFER: u8 = 10;

/// Direction of the last encoder movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Value decreased.
    Decrement,
    /// Value increased.
    Increment,
}

/// Direction of a move from `old` to `new`, taking the wrap at 240 into
/// account.
///
/// ```rust
/// use moog_source::devices::encoder::movement_direction;
/// use moog_source::Direction;
///
/// assert_eq!(movement_direction(100, 101), Direction::Increment);
/// assert_eq!(movement_direction(238, 2), Direction::Increment);
/// assert_eq!(movement_direction(2, 238), Direction::Decrement);
/// ```
pub fn movement_direction(old: u8, new: u8) -> Direction {
    let top = ENCODER_POSITIONS - WRAP_BUFFER;
    let overflowed = new <= WRAP_BUFFER && old >= top;
    let underflowed = new >= top && old <= WRAP_BUFFER;
    if (new > old || overflowed) && !underflowed {
        Direction::Increment
    } else {
        Direction::Decrement
    }
}

/// Encoder direction latch and interrupt flip-flop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoder {
    direction: Direction,
    irq_pending: bool,
}

impl Encoder {
    /// Create an idle encoder.
    pub fn new() -> Self {
        Self {
            direction: Direction::Decrement,
            irq_pending: false,
        }
    }

    /// Last latched direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether /INT is asserted.
    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Restore latched state, for save states.
    pub fn restore(&mut self, direction: Direction, irq_pending: bool) {
        self.direction = direction;
        self.irq_pending = irq_pending;
    }

    /// Latch the direction of a move and assert the interrupt.
    pub fn moved(&mut self, old: u8, new: u8) -> Direction {
        self.direction = movement_direction(old, new);
        self.irq_pending = true;
        debug!(target: "moog_source::encoder", "Encoder changed: {} {:?}", new, self.direction);
        self.direction
    }

    /// Read the direction bit (D0 = 1 for increment). With `acknowledge`
    /// the read also clears the interrupt.
    pub fn read(&mut self, acknowledge: bool) -> u8 {
        if acknowledge {
            self.irq_pending = false;
        }
        debug!(target: "moog_source::encoder", "Encoder read: {:?}", self.direction);
        match self.direction {
            Direction::Increment => 1,
            Direction::Decrement => 0,
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
