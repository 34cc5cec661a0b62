use core::convert::TryFrom;
use std::marker::PhantomData;

use log::debug;
use rand::Rng;

use crate::chip::{
    chip8::{
        constants::{CHIP8_ADDRESS_MASK, CHIP8_CHARSET_OFFSET, CHIP8_GLYPH_HEIGHT},
        opcodes::{
            ExecutableOpcode, InstructionParsingError, InstructionWithAddress,
            InstructionWithOperands, InstructionWithRegAndValue, Opcode,
        },
        state::{MachineState, RunState},
        util, Chip8,
    },
    MachineError,
};

define_instruction_with_reg_and_value!(Ldr, LdrInstruction, 0x6);
impl ExecutableOpcode for LdrInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        chip.state.registers[self.reg as usize] = self.value;
        util::increment_program_counter(&mut chip.state);
        Ok(())
    }
}

define_instruction_with_reg_and_value!(Add, AddInstruction, 0x7);
impl ExecutableOpcode for AddInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        let state = &mut chip.state;
        state.registers[self.reg as usize] =
            state.registers[self.reg as usize].wrapping_add(self.value);
        util::increment_program_counter(state);
        Ok(())
    }
}

define_instruction_with_operands!(Reg, RegInstruction, 0x8, |instruction: &RegInstruction| {
    matches!(instruction.op3, 0x0..=0x7 | 0xE)
});
impl ExecutableOpcode for RegInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        /// Where VF is written relative to VX. Both values are computed from the
        /// operands before either write, so the write order only matters when
        /// X is F.
        #[derive(Clone, Copy)]
        enum FlagWrite {
            BeforeResult,
            AfterResult,
        }

        /// Applies `f` to VX and VY, stores the result in VX and, if `f` reports
        /// one, the flag in VF in the given order.
        fn modify_registers(
            state: &mut MachineState,
            r1: u8,
            r2: u8,
            order: FlagWrite,
            f: fn(u8, u8) -> (u8, Option<bool>),
        ) {
            let (val, flag) = f(state.registers[r1 as usize], state.registers[r2 as usize]);
            match (order, flag) {
                (_, None) => state.registers[r1 as usize] = val,
                (FlagWrite::BeforeResult, Some(flag)) => {
                    util::set_flag(state, flag);
                    state.registers[r1 as usize] = val;
                }
                (FlagWrite::AfterResult, Some(flag)) => {
                    state.registers[r1 as usize] = val;
                    util::set_flag(state, flag);
                }
            }
        }

        use FlagWrite::{AfterResult, BeforeResult};
        let state = &mut chip.state;
        match self.op3 {
            0x0 => modify_registers(state, self.op1, self.op2, AfterResult, |_, v2| (v2, None)),
            0x1 => modify_registers(state, self.op1, self.op2, AfterResult, |v1, v2| {
                (v1 | v2, None)
            }),
            0x2 => modify_registers(state, self.op1, self.op2, AfterResult, |v1, v2| {
                (v1 & v2, None)
            }),
            0x3 => modify_registers(state, self.op1, self.op2, AfterResult, |v1, v2| {
                (v1 ^ v2, None)
            }),
            0x4 => modify_registers(state, self.op1, self.op2, AfterResult, |v1, v2| {
                let (result, overflow) = v1.overflowing_add(v2);
                (result, Some(overflow))
            }),
            0x5 => modify_registers(state, self.op1, self.op2, BeforeResult, |v1, v2| {
                (v1.wrapping_sub(v2), Some(v1 > v2))
            }),
            0x6 => modify_registers(state, self.op1, self.op2, BeforeResult, |v1, _| {
                (v1 >> 1, Some(v1 & 1 != 0))
            }),
            0x7 => modify_registers(state, self.op1, self.op2, BeforeResult, |v1, v2| {
                (v2.wrapping_sub(v1), Some(v1 <= v2))
            }),
            0xE => modify_registers(state, self.op1, self.op2, BeforeResult, |v1, _| {
                (v1 << 1, Some(v1 & 0x80 != 0))
            }),
            _ => {
                return Err(MachineError::UnknownOpcode(
                    0x8000 | (self.op1 as u16) << 8 | (self.op2 as u16) << 4 | self.op3 as u16,
                ))
            }
        };
        util::increment_program_counter(state);
        Ok(())
    }
}

define_instruction_with_address!(Ld, LdInstruction, 0xA);
impl ExecutableOpcode for LdInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        chip.state.index = self.address;
        util::increment_program_counter(&mut chip.state);
        Ok(())
    }
}

define_instruction_with_reg_and_value!(Rnd, RndInstruction, 0xC);
impl ExecutableOpcode for RndInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        let sample: u8 = chip.rng.gen();
        chip.state.registers[self.reg as usize] = sample & self.value;
        util::increment_program_counter(&mut chip.state);
        Ok(())
    }
}

define_instruction_with_operands!(Drw, DrwInstruction, 0xD);
impl ExecutableOpcode for DrwInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        let state = &mut chip.state;
        let sprite = MachineState::memory_range(state.index, self.op3 as usize)?;

        let x = state.registers[self.op1 as usize] as usize;
        let y = state.registers[self.op2 as usize] as usize;

        let mut collision = false;
        for (y_pos, address) in sprite.enumerate() {
            let (row_collision, row_changed) =
                state.display.xor_row(x, y + y_pos, state.memory[address]);
            collision |= row_collision;
            state.display_changed |= row_changed;
        }
        util::set_flag(state, collision);
        util::increment_program_counter(state);
        Ok(())
    }
}

define_instruction_with_reg_and_value!(Ldu, LduInstruction, 0xF, |instruction: &LduInstruction| {
    matches!(
        instruction.value,
        0x07 | 0x0A | 0x15 | 0x18 | 0x1E | 0x29 | 0x33 | 0x55 | 0x65
    )
});
impl ExecutableOpcode for LduInstruction {
    fn execute(&self, chip: &mut Chip8) -> Result<(), MachineError> {
        let state = &mut chip.state;
        let vx = state.registers[self.reg as usize];
        match self.value {
            0x07 => {
                state.registers[self.reg as usize] = state.delay_timer;
            }
            0x0A => match state.highest_pressed_key() {
                Some(key) => {
                    state.registers[self.reg as usize] = key;
                }
                None => {
                    // the program counter stays on this instruction until a
                    // key arrives, see `Chip8::step`
                    debug!("Waiting for a key press into V{:X}", self.reg);
                    state.run_state = RunState::AwaitingKey { register: self.reg };
                    return Ok(());
                }
            },
            0x15 => {
                state.delay_timer = vx;
            }
            0x18 => {
                state.sound_timer = vx;
            }
            0x1E => {
                let sum = state.index as u32 + vx as u32;
                state.index = sum as u16;
                util::set_flag(state, sum > CHIP8_ADDRESS_MASK as u32);
            }
            0x29 => {
                state.index = CHIP8_CHARSET_OFFSET + vx as u16 * CHIP8_GLYPH_HEIGHT;
            }
            0x33 => {
                let digits = MachineState::memory_range(state.index, 3)?;
                state.memory[digits].copy_from_slice(&[vx / 100, (vx / 10) % 10, vx % 10]);
            }
            0x55 => {
                let count = self.reg as usize + 1;
                let target = MachineState::memory_range(state.index, count)?;
                state.memory[target].copy_from_slice(&state.registers[..count]);
                state.index = state.index.wrapping_add(count as u16);
            }
            0x65 => {
                let count = self.reg as usize + 1;
                let source = MachineState::memory_range(state.index, count)?;
                state.registers[..count].copy_from_slice(&state.memory[source]);
                state.index = state.index.wrapping_add(count as u16);
            }
            _ => {
                return Err(MachineError::UnknownOpcode(
                    0xF000 | (self.reg as u16) << 8 | self.value as u16,
                ))
            }
        }
        util::increment_program_counter(state);
        Ok(())
    }
}
