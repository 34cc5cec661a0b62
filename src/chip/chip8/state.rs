use std::ops::Range;

use log::info;

use crate::chip::{
    chip8::{
        constants::{
            CHIP8_CHARSET, CHIP8_CHARSET_OFFSET, CHIP8_KEY_COUNT, CHIP8_MAX_PROGRAM_SIZE,
            CHIP8_MEMORY_SIZE, CHIP8_PROGRAM_OFFSET, CHIP8_REGISTER_COUNT, CHIP8_STACK_DEPTH,
        },
        framebuffer::Framebuffer,
    },
    LoadProgramError, MachineError,
};

/// Bytes per line of `MachineState::memory_dump`.
const MEMORY_DUMP_LINE_LEN: usize = 8;

/// Whether the machine executes instructions, waits for a key press, or has
/// stopped for good.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,

    /// An `FX0A` instruction is waiting for a key. Once one is pressed its index is
    /// stored in `register` and execution continues after the instruction.
    AwaitingKey { register: u8 },

    /// Terminal state. The machine refuses to step any further.
    Halted(MachineError),
}

/// Represents the complete state of the CHIP-8.
#[derive(Clone, Debug)]
pub struct MachineState {
    /// 4096 bytes of main memory
    pub(crate) memory: [u8; CHIP8_MEMORY_SIZE],

    /// 16 registers where each can store one byte. Register 0xF doubles as
    /// flag register.
    pub(crate) registers: [u8; CHIP8_REGISTER_COUNT],

    /// An index register. Logically 12 bit, but `FX1E` may push it beyond 0xFFF.
    pub(crate) index: u16,

    pub(crate) program_counter: u16,

    /// Decremented by the timer ticks, never below zero.
    pub(crate) delay_timer: u8,

    /// Decremented by the timer ticks, never below zero. A tone plays while it is
    /// not zero.
    pub(crate) sound_timer: u8,

    /// A stack. Note that there are no instructions allowing to modify the
    /// stack and it is only used to store return addresses for the return
    /// opcode.
    pub(crate) stack: [u16; CHIP8_STACK_DEPTH],

    /// Number of occupied stack slots, 0 to 16.
    pub(crate) stack_pointer: u8,

    pub(crate) display: Framebuffer,

    /// Set whenever the display changed since it was last handed out.
    pub(crate) display_changed: bool,

    /// Key-down state as last reported by the input collaborator.
    pub(crate) keys: [bool; CHIP8_KEY_COUNT],

    pub(crate) run_state: RunState,
}

impl MachineState {
    /// Constructs a freshly reset state.
    pub fn new() -> Self {
        let mut state = MachineState {
            memory: [0; CHIP8_MEMORY_SIZE],
            registers: [0; CHIP8_REGISTER_COUNT],
            index: 0,
            program_counter: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; CHIP8_STACK_DEPTH],
            stack_pointer: 0,
            display: Framebuffer::new(),
            display_changed: false,
            keys: [false; CHIP8_KEY_COUNT],
            run_state: RunState::Running,
        };
        state.reset();
        state
    }

    /// Zeroes memory, registers, stack, display and keys, loads the built-in charset
    /// at `CHIP8_CHARSET_OFFSET` and points the program counter at 0x200.
    pub fn reset(&mut self) {
        self.memory = [0; CHIP8_MEMORY_SIZE];
        let charset_start = CHIP8_CHARSET_OFFSET as usize;
        self.memory[charset_start..charset_start + CHIP8_CHARSET.len()]
            .copy_from_slice(&CHIP8_CHARSET);

        self.registers = [0; CHIP8_REGISTER_COUNT];
        self.index = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.stack = [0; CHIP8_STACK_DEPTH];
        self.stack_pointer = 0;
        self.program_counter = CHIP8_PROGRAM_OFFSET;
        self.display.clear();
        self.display_changed = true;
        self.keys = [false; CHIP8_KEY_COUNT];
        self.run_state = RunState::Running;
    }

    /// Copies `program` into memory starting at 0x200 and returns its length. Other
    /// state is left untouched, so reusing a machine requires a `reset` first.
    pub fn load_program(&mut self, program: &[u8]) -> Result<usize, LoadProgramError> {
        if program.len() > CHIP8_MAX_PROGRAM_SIZE {
            return Err(LoadProgramError::ProgramTooLarge(program.len()));
        }

        let start = CHIP8_PROGRAM_OFFSET as usize;
        self.memory[start..start + program.len()].copy_from_slice(program);
        info!("Loaded program of {} bytes", program.len());
        Ok(program.len())
    }

    /// Records the key-down state of key `index`.
    pub fn set_key(&mut self, index: u8, pressed: bool) -> Result<(), MachineError> {
        let key = self
            .keys
            .get_mut(index as usize)
            .ok_or(MachineError::InvalidKeyIndex(index))?;
        *key = pressed;
        Ok(())
    }

    pub fn release_all_keys(&mut self) {
        self.keys = [false; CHIP8_KEY_COUNT];
    }

    /// The highest-numbered key currently held down.
    pub fn highest_pressed_key(&self) -> Option<u8> {
        self.keys.iter().rposition(|pressed| *pressed).map(|key| key as u8)
    }

    pub fn is_key_pressed(&self, index: u8) -> bool {
        self.keys.get(index as usize).copied().unwrap_or(false)
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// The occupied part of the return address stack, oldest entry first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.stack_pointer as usize]
    }

    pub fn stack_pointer(&self) -> u8 {
        self.stack_pointer
    }

    pub fn display(&self) -> &Framebuffer {
        &self.display
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.run_state, RunState::Halted(_))
    }

    /// The error that halted the machine, if it is halted.
    pub fn halt_reason(&self) -> Option<&MachineError> {
        match &self.run_state {
            RunState::Halted(reason) => Some(reason),
            _ => None,
        }
    }

    /// Renders all of memory as hex, eight bytes per line, each line prefixed with
    /// the address of its first byte.
    pub fn memory_dump(&self) -> String {
        self.memory
            .chunks(MEMORY_DUMP_LINE_LEN)
            .enumerate()
            .map(|(line, bytes)| {
                let bytes: String = bytes.iter().map(|byte| format!(" {:02X}", byte)).collect();
                format!("0x{:03X}:{}\n", line * MEMORY_DUMP_LINE_LEN, bytes)
            })
            .collect()
    }

    /// Validates that `len` bytes starting at `address` lie within memory and
    /// returns them as an index range. The error carries the first address past
    /// the end of memory that the access would touch. An empty access is always
    /// valid.
    pub(crate) fn memory_range(address: u16, len: usize) -> Result<Range<usize>, MachineError> {
        let start = address as usize;
        if len == 0 {
            return Ok(start..start);
        }
        let end = start + len;
        if end > CHIP8_MEMORY_SIZE {
            let offending = start.max(CHIP8_MEMORY_SIZE);
            return Err(MachineError::AddressOutOfBounds(offending as u16));
        }
        Ok(start..end)
    }
}

impl Default for MachineState {
    fn default() -> Self {
        MachineState::new()
    }
}
