/// CHIP-8 constants.
pub mod constants;
/// Cursive display output.
pub mod cursive_display;
/// The monochrome display buffer.
pub mod framebuffer;
/// Decoding of opcodes and their execution.
mod opcodes;
/// The machine state the engine operates on.
pub mod state;
/// Wall-clock pacing of instruction cycles and timer ticks.
pub mod timing;
/// Convenience functions for modification of the CHIP-8 state.
mod util;

#[cfg(test)]
mod tests;

use std::fs;

use log::{debug, error, info};
use rand::{rngs::StdRng, SeedableRng};

use crate::chip::{
    chip8::{
        constants::CHIP8_MEMORY_SIZE,
        framebuffer::Framebuffer,
        opcodes::Opcode,
        state::{MachineState, RunState},
    },
    Chip, LoadProgramError, MachineError,
};

/// What a successful call to `Chip8::step` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// One instruction completed.
    Executed,

    /// The machine waits in `FX0A` for a key press. The program counter did not move.
    AwaitingKey,
}

/// The CHIP-8 execution engine. It exclusively owns the machine state and is the
/// only thing that mutates it.
pub struct Chip8 {
    state: MachineState,

    /// Source of the `CXNN` random bytes.
    rng: StdRng,
}

impl Chip for Chip8 {
    /// The CHIP-8's pins can actually be addressed by using just half a byte.
    /// However, we use a whole byte here and check whether it is in the right
    /// range, because it is more convenient to handle.
    type PinAddress = u8;

    type StepOutcome = StepOutcome;

    fn load_program(&mut self, path: &str) -> Result<usize, LoadProgramError> {
        let program = fs::read(path).map_err(|source| LoadProgramError::CouldNotReadFile {
            path: path.to_string(),
            source,
        })?;
        self.load_program_bytes(&program)
    }

    fn step(&mut self) -> Result<StepOutcome, MachineError> {
        Chip8::step(self)
    }

    fn tick_timers(&mut self) {
        Chip8::tick_timers(self)
    }

    fn read_output_pins(&self) -> &[bool] {
        self.state.display.pixels()
    }

    fn set_input_pin(&mut self, pin: u8, value: bool) -> Result<(), MachineError> {
        self.state.set_key(pin, value)
    }

    fn reset_input_pins(&mut self) {
        self.state.release_all_keys();
    }

    fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    fn sound_active(&self) -> bool {
        self.state.sound_timer != 0
    }
}

impl Chip8 {
    /// Constructs a new CHIP-8 and appropriately initializes all fields so that
    /// it is ready for the first execution cycle. Essentially this means that
    /// the program counter is set to 0x200 and the default CHIP-8 charset is
    /// loaded at memory address `CHIP8_CHARSET_OFFSET`. Note that no program is
    /// loaded upon initialization.
    pub fn new() -> Self {
        Chip8 {
            state: MachineState::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Like `new`, but with a deterministic source for the random instruction.
    pub fn with_seed(seed: u64) -> Self {
        Chip8 {
            state: MachineState::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
        info!("Machine reset");
    }

    /// Convenience method to load a program from a slice.
    pub fn load_program_bytes(&mut self, program: &[u8]) -> Result<usize, LoadProgramError> {
        self.state.load_program(program)
    }

    /// Reads the big-endian instruction word at the program counter.
    pub fn fetch_opcode(&self) -> Result<u16, MachineError> {
        let pc = self.state.program_counter as usize;
        if pc + 1 >= CHIP8_MEMORY_SIZE {
            return Err(MachineError::ProgramCounterOutOfBounds(
                self.state.program_counter,
            ));
        }
        Ok(u16::from_be_bytes([
            self.state.memory[pc],
            self.state.memory[pc + 1],
        ]))
    }

    /// Performs one fetch/decode/execute cycle. While an `FX0A` waits for a key the
    /// cycle only polls the key latch. Any execution error halts the machine and is
    /// returned; once halted, every further call fails with `MachineError::Halted`.
    pub fn step(&mut self) -> Result<StepOutcome, MachineError> {
        match self.state.run_state {
            RunState::Halted(_) => return Err(MachineError::Halted),
            RunState::AwaitingKey { register } => return Ok(self.poll_awaited_key(register)),
            RunState::Running => {}
        }

        let executed = match self.fetch_opcode() {
            Ok(raw) => Opcode::new(&raw.to_be_bytes()).execute(self),
            Err(e) => Err(e),
        };

        match executed {
            Ok(()) if self.state.run_state == RunState::Running => Ok(StepOutcome::Executed),
            Ok(()) => Ok(StepOutcome::AwaitingKey),
            Err(e) => {
                self.halt(e.clone());
                Err(e)
            }
        }
    }

    /// Decrements the delay and sound timers by one, stopping at zero.
    pub fn tick_timers(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// Returns a copy of the display if it changed since the last call.
    pub fn take_frame(&mut self) -> Option<Framebuffer> {
        if !self.state.display_changed {
            return None;
        }
        self.state.display_changed = false;
        Some(self.state.display.clone())
    }

    fn poll_awaited_key(&mut self, register: u8) -> StepOutcome {
        match self.state.highest_pressed_key() {
            Some(key) => {
                debug!("Key {:X} pressed, stored in V{:X}", key, register);
                self.state.registers[register as usize] = key;
                util::increment_program_counter(&mut self.state);
                self.state.run_state = RunState::Running;
                StepOutcome::Executed
            }
            None => StepOutcome::AwaitingKey,
        }
    }

    fn halt(&mut self, reason: MachineError) {
        error!(
            "Halting at {:#06X}: {}",
            self.state.program_counter, reason
        );
        self.state.run_state = RunState::Halted(reason);
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Chip8::new()
    }
}
