use core::convert::TryFrom;
use std::marker::PhantomData;

use crate::chip::{
    chip8::{
        constants::CHIP8_STACK_DEPTH,
        opcodes::{
            ExecutableOpcode, InstructionParsingError, InstructionWithAddress,
            InstructionWithOperands, InstructionWithRegAndValue, Opcode,
        },
        util, Chip8,
    },
    MachineError,
};

define_instruction_with_address!(Jmp, JmpInstruction, 0x1);
impl ExecutableOpcode for JmpInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        chip.state.program_counter = self.address;
        Ok(())
    }
}

define_instruction_with_address!(Call, CallInstruction, 0x2);
impl ExecutableOpcode for CallInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        let state = &mut chip.state;
        if state.stack_pointer as usize >= CHIP8_STACK_DEPTH {
            return Err(MachineError::StackOverflow(state.program_counter));
        }
        // the return instruction skips past the call site
        state.stack[state.stack_pointer as usize] = state.program_counter;
        state.stack_pointer += 1;
        state.program_counter = self.address;
        Ok(())
    }
}

define_instruction_with_reg_and_value!(Se, SeInstruction, 0x3);
impl ExecutableOpcode for SeInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        util::conditional_skip(self, &mut chip.state, |instruction, state| {
            state.registers[instruction.reg as usize] == instruction.value
        });
        util::increment_program_counter(&mut chip.state);
        Ok(())
    }
}

define_instruction_with_reg_and_value!(Sne, SneInstruction, 0x4);
impl ExecutableOpcode for SneInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        util::conditional_skip(self, &mut chip.state, |instruction, state| {
            state.registers[instruction.reg as usize] != instruction.value
        });
        util::increment_program_counter(&mut chip.state);
        Ok(())
    }
}

define_instruction_with_operands!(Sre, SreInstruction, 0x5, |instruction: &SreInstruction| {
    instruction.op3 == 0
});
impl ExecutableOpcode for SreInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        util::conditional_skip(self, &mut chip.state, |instruction, state| {
            state.registers[instruction.op1 as usize] == state.registers[instruction.op2 as usize]
        });
        util::increment_program_counter(&mut chip.state);
        Ok(())
    }
}

define_instruction_with_operands!(Srne, SrneInstruction, 0x9, |instruction: &SrneInstruction| {
    instruction.op3 == 0
});
impl ExecutableOpcode for SrneInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        util::conditional_skip(self, &mut chip.state, |instruction, state| {
            state.registers[instruction.op1 as usize] != state.registers[instruction.op2 as usize]
        });
        util::increment_program_counter(&mut chip.state);
        Ok(())
    }
}

define_instruction_with_address!(Jmpr, JmprInstruction, 0xB);
impl ExecutableOpcode for JmprInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        chip.state.program_counter = self.address.wrapping_add(chip.state.registers[0] as u16);
        Ok(())
    }
}

define_instruction_with_reg_and_value!(Sk, SkInstruction, 0xE, |instruction: &SkInstruction| {
    matches!(instruction.value, 0x9E | 0xA1)
});
impl ExecutableOpcode for SkInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        let state = &mut chip.state;
        // keys beyond 0xF do not exist and therefore count as released
        let pressed = state.is_key_pressed(state.registers[self.reg as usize]);
        let skip = match self.value {
            0x9E => pressed,
            0xA1 => !pressed,
            _ => {
                return Err(MachineError::UnknownOpcode(
                    0xE000 | (self.reg as u16) << 8 | self.value as u16,
                ))
            }
        };
        if skip {
            util::increment_program_counter(state);
        }
        util::increment_program_counter(state);
        Ok(())
    }
}
