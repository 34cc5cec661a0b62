use core::convert::TryFrom;
use std::marker::PhantomData;

use crate::chip::{
    chip8::{
        opcodes::{ExecutableOpcode, InstructionParsingError, InstructionWithAddress, Opcode},
        util, Chip8,
    },
    MachineError,
};

define_instruction_with_address!(Sys, SysInstruction, 0x0, |instruction: &SysInstruction| {
    matches!(instruction.address, 0x0E0 | 0x0EE)
});
impl ExecutableOpcode for SysInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        let state = &mut chip.state;
        match self.address {
            0x0E0 => {
                state.display.clear();
                state.display_changed = true;
                util::increment_program_counter(state);
            }
            0x0EE => {
                if state.stack_pointer == 0 {
                    return Err(MachineError::StackUnderflow(state.program_counter));
                }
                state.stack_pointer -= 1;
                state.program_counter = state.stack[state.stack_pointer as usize];
                util::increment_program_counter(state);
            }
            _ => return Err(MachineError::UnknownOpcode(self.address)),
        };
        Ok(())
    }
}
