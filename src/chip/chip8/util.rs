use crate::chip::chip8::{constants::CHIP8_FLAG_REGISTER, state::MachineState};

pub fn conditional_skip<T>(opcode: &T, state: &mut MachineState, f: fn(&T, &MachineState) -> bool) {
    if f(opcode, state) {
        increment_program_counter(state);
    }
}

pub fn increment_program_counter(state: &mut MachineState) {
    state.program_counter = state.program_counter.wrapping_add(2);
}

/// Writes 1 or 0 into the flag register.
pub fn set_flag(state: &mut MachineState, flag: bool) {
    state.registers[CHIP8_FLAG_REGISTER] = flag as u8;
}
