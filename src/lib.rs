//! A virtual machine for the CHIP-8 instruction set. The implementation follows the
//! instruction set described [here](https://en.wikipedia.org/wiki/CHIP-8#Opcode_table).
//! The core (machine state, fetch/decode/execute and wall-clock pacing) lives in
//! [`chip::chip8`]; a cursive text user interface is provided as the
//! `emulator_text_ui` binary.
pub mod chip;
