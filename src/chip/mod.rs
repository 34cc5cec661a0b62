pub mod chip8;

use std::io;

use thiserror::Error;

/// The interface a host application drives. A host repeatedly calls `step`, calls
/// `tick_timers` at an independent fixed rate, feeds key state via the input pins and
/// polls the output pins for presentation.
pub trait Chip {
    /// Address type used to select an input pin.
    type PinAddress;

    /// The outcome of a successful step.
    type StepOutcome;

    /// Loads the program stored at `path` and returns its size in bytes.
    fn load_program(&mut self, path: &str) -> Result<usize, LoadProgramError>;

    /// Executes exactly one instruction cycle.
    fn step(&mut self) -> Result<Self::StepOutcome, MachineError>;

    /// Advances the chip's countdown timers by one tick.
    fn tick_timers(&mut self);

    fn read_output_pins(&self) -> &[bool];

    fn set_input_pin(&mut self, pin: Self::PinAddress, value: bool) -> Result<(), MachineError>;

    fn reset_input_pins(&mut self);

    /// Whether the chip reached its terminal state. A halted chip refuses to step.
    fn is_halted(&self) -> bool;

    /// Whether an audio collaborator should currently be playing a tone.
    fn sound_active(&self) -> bool;
}

/// Errors raised while loading a program image.
#[derive(Debug, Error)]
pub enum LoadProgramError {
    #[error("Program too large: {0} bytes (at most 3584 bytes fit into memory)")]
    ProgramTooLarge(usize),

    #[error("Could not read program file {path}")]
    CouldNotReadFile {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the execution engine. All variants except `InvalidKeyIndex`
/// and `Halted` move the machine into its halted state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("Unknown opcode {0:#06X}")]
    UnknownOpcode(u16),

    #[error("Program counter {0:#06X} exceeds memory")]
    ProgramCounterOutOfBounds(u16),

    #[error("Stack overflow on call at {0:#06X}")]
    StackOverflow(u16),

    #[error("Stack underflow on return at {0:#06X}")]
    StackUnderflow(u16),

    #[error("Memory access at {0:#06X} exceeds memory")]
    AddressOutOfBounds(u16),

    #[error("Invalid key index {0} (expected 0 to 15)")]
    InvalidKeyIndex(u8),

    #[error("Machine is halted")]
    Halted,
}

/// A chip that can push its display to a cursive user interface.
pub trait ChipWithCursiveDisplay {
    /// Sends the current display to `gfx_sink` if it changed since the last
    /// update. Returns `false` once the user interface is gone.
    fn update_ui(&mut self, gfx_sink: &cursive::CbSink) -> bool;
}
