use std::time::{Duration, Instant};

use crate::chip::chip8::{
    state::RunState,
    timing::{Pacer, PacingConfig},
    Chip8, StepOutcome,
};
use crate::chip::{Chip, LoadProgramError, MachineError};

fn prepare_state_with_program(instructions: &[u16]) -> Chip8 {
    let mut chip8 = Chip8::with_seed(0xC8);
    let program: Vec<u8> = instructions
        .iter()
        .flat_map(|instruction| instruction.to_be_bytes())
        .collect();
    chip8.load_program_bytes(&program).unwrap();
    chip8
}

fn prepare_state_with_single_instruction(instruction: u16) -> Chip8 {
    prepare_state_with_program(&[instruction])
}

fn do_cycle(instruction: u16, before_cycle: fn(&mut Chip8), after_cycle: fn(&mut Chip8)) {
    let mut chip = prepare_state_with_single_instruction(instruction);

    before_cycle(&mut chip);
    assert_eq!(chip.step(), Ok(StepOutcome::Executed));
    after_cycle(&mut chip);
}

fn run(chip: &mut Chip8, steps: usize) {
    for _ in 0..steps {
        chip.step().unwrap();
    }
}

#[test]
fn test_fetch_opcode_is_big_endian() {
    let chip = prepare_state_with_single_instruction(0xA2F0);
    assert_eq!(chip.fetch_opcode(), Ok(0xA2F0));
}

#[test]
fn test_clear_screen() {
    let mut chip = prepare_state_with_program(&[0xF029, 0xD015, 0x00E0]);
    run(&mut chip, 2);
    assert!(!chip.state().display().is_blank());
    chip.take_frame();

    run(&mut chip, 1);
    assert!(chip.state().display().is_blank());
    assert_eq!(chip.state().program_counter(), 0x206);
    assert!(chip.take_frame().is_some());
}

#[test]
fn test_jump() {
    do_cycle(
        0x1CAF,
        |state| {
            assert_eq!(state.state.program_counter, 0x200);
        },
        |state| {
            assert_eq!(state.state.program_counter, 0xCAF);
        },
    )
}

#[test]
fn test_call() {
    do_cycle(
        0x2CAF,
        |state| {
            assert_eq!(state.state.program_counter, 0x200);
        },
        |state| {
            assert_eq!(state.state.program_counter, 0xCAF);
            assert_eq!(state.state.stack(), &[0x200]);
        },
    )
}

#[test]
fn test_return_after_call() {
    let mut chip = prepare_state_with_program(&[0x2300]);
    chip.state.memory[0x300] = 0x00;
    chip.state.memory[0x301] = 0xEE;

    run(&mut chip, 1);
    assert_eq!(chip.state().program_counter(), 0x300);
    assert_eq!(chip.state().stack_pointer(), 1);

    run(&mut chip, 1);
    assert_eq!(chip.state().program_counter(), 0x202);
    assert_eq!(chip.state().stack_pointer(), 0);
}

#[test]
fn test_skip_if_equal() {
    do_cycle(
        0x34AF,
        |state| {
            state.state.registers[4] = 0xAF;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x204);
        },
    );

    do_cycle(
        0x34BF,
        |state| {
            state.state.registers[4] = 0xAF;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x202);
        },
    );
}

#[test]
fn test_skip_if_not_equal() {
    do_cycle(
        0x4A01,
        |state| {
            state.state.registers[0xA] = 0x02;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x204);
        },
    );

    do_cycle(
        0x4A02,
        |state| {
            state.state.registers[0xA] = 0x02;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x202);
        },
    );
}

#[test]
fn test_skip_if_registers_equal_or_not() {
    do_cycle(
        0x5120,
        |state| {
            state.state.registers[1] = 9;
            state.state.registers[2] = 9;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x204);
        },
    );

    do_cycle(
        0x9120,
        |state| {
            state.state.registers[1] = 9;
            state.state.registers[2] = 9;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x202);
        },
    );

    do_cycle(
        0x9120,
        |state| {
            state.state.registers[1] = 9;
            state.state.registers[2] = 8;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x204);
        },
    );
}

#[test]
fn test_load_and_add_immediate() {
    let mut chip = prepare_state_with_program(&[0x63FF, 0x7302]);
    chip.state.registers[0xF] = 0x55;
    run(&mut chip, 2);
    assert_eq!(chip.state().registers()[3], 0x01);
    // no carry flag for 7XNN
    assert_eq!(chip.state().registers()[0xF], 0x55);
}

#[test]
fn test_register_logic() {
    let mut chip = prepare_state_with_program(&[0x8010, 0x8121, 0x8232, 0x8303]);
    chip.state.registers[0] = 0x00;
    chip.state.registers[1] = 0b1100;
    chip.state.registers[2] = 0b1010;
    chip.state.registers[3] = 0b0110;
    run(&mut chip, 4);
    let v = chip.state().registers();
    assert_eq!(v[0], 0b1100);
    assert_eq!(v[1], 0b1110);
    assert_eq!(v[2], 0b0010);
    assert_eq!(v[3], 0b0110 ^ 0b1100);
}

#[test]
fn test_add_registers_with_carry() {
    do_cycle(
        0x8014,
        |state| {
            state.state.registers[0] = 0xF0;
            state.state.registers[1] = 0x20;
        },
        |state| {
            assert_eq!(state.state.registers[0], 0x10);
            assert_eq!(state.state.registers[0xF], 1);
        },
    );

    do_cycle(
        0x8014,
        |state| {
            state.state.registers[0] = 0xF0;
            state.state.registers[1] = 0x0F;
            state.state.registers[0xF] = 1;
        },
        |state| {
            assert_eq!(state.state.registers[0], 0xFF);
            assert_eq!(state.state.registers[0xF], 0);
        },
    );
}

#[test]
fn test_sub_borrow_polarity() {
    // VX = VX - VY
    do_cycle(
        0x8015,
        |state| {
            state.state.registers[0] = 5;
            state.state.registers[1] = 10;
        },
        |state| {
            assert_eq!(state.state.registers[0], 251);
            assert_eq!(state.state.registers[0xF], 0);
        },
    );
    do_cycle(
        0x8015,
        |state| {
            state.state.registers[0] = 10;
            state.state.registers[1] = 5;
        },
        |state| {
            assert_eq!(state.state.registers[0], 5);
            assert_eq!(state.state.registers[0xF], 1);
        },
    );

    // VX = VY - VX
    do_cycle(
        0x8017,
        |state| {
            state.state.registers[0] = 5;
            state.state.registers[1] = 10;
        },
        |state| {
            assert_eq!(state.state.registers[0], 5);
            assert_eq!(state.state.registers[0xF], 1);
        },
    );
    do_cycle(
        0x8017,
        |state| {
            state.state.registers[0] = 10;
            state.state.registers[1] = 5;
        },
        |state| {
            assert_eq!(state.state.registers[0], 251);
            assert_eq!(state.state.registers[0xF], 0);
        },
    );
}

#[test]
fn test_sub_of_equal_values() {
    do_cycle(
        0x8015,
        |state| {
            state.state.registers[0] = 7;
            state.state.registers[1] = 7;
        },
        |state| {
            assert_eq!(state.state.registers[0], 0);
            assert_eq!(state.state.registers[0xF], 0);
        },
    );
    do_cycle(
        0x8017,
        |state| {
            state.state.registers[0] = 7;
            state.state.registers[1] = 7;
        },
        |state| {
            assert_eq!(state.state.registers[0], 0);
            assert_eq!(state.state.registers[0xF], 1);
        },
    );
}

#[test]
fn test_shifts() {
    do_cycle(
        0x8126,
        |state| {
            state.state.registers[1] = 0b0000_0101;
        },
        |state| {
            assert_eq!(state.state.registers[1], 0b0000_0010);
            assert_eq!(state.state.registers[0xF], 1);
        },
    );
    do_cycle(
        0x812E,
        |state| {
            state.state.registers[1] = 0b1000_0001;
        },
        |state| {
            assert_eq!(state.state.registers[1], 0b0000_0010);
            assert_eq!(state.state.registers[0xF], 1);
        },
    );
    do_cycle(
        0x812E,
        |state| {
            state.state.registers[1] = 0b0100_0000;
        },
        |state| {
            assert_eq!(state.state.registers[1], 0b1000_0000);
            assert_eq!(state.state.registers[0xF], 0);
        },
    );
}

#[test]
fn test_flag_register_as_destination_of_add_keeps_flag() {
    do_cycle(
        0x8F04,
        |state| {
            state.state.registers[0xF] = 0xFF;
            state.state.registers[0] = 0x02;
        },
        |state| {
            assert_eq!(state.state.registers[0xF], 1);
        },
    );
}

#[test]
fn test_flag_register_as_destination_of_sub_keeps_result() {
    do_cycle(
        0x8F05,
        |state| {
            state.state.registers[0xF] = 0x0A;
            state.state.registers[0] = 0x03;
        },
        |state| {
            assert_eq!(state.state.registers[0xF], 0x07);
        },
    );
    do_cycle(
        0x8F07,
        |state| {
            state.state.registers[0xF] = 0x03;
            state.state.registers[0] = 0x0A;
        },
        |state| {
            assert_eq!(state.state.registers[0xF], 0x07);
        },
    );
}

#[test]
fn test_flag_register_as_destination_of_shift_keeps_result() {
    do_cycle(
        0x8F06,
        |state| {
            state.state.registers[0xF] = 0x81;
        },
        |state| {
            assert_eq!(state.state.registers[0xF], 0x40);
        },
    );
    do_cycle(
        0x8F0E,
        |state| {
            state.state.registers[0xF] = 0x81;
        },
        |state| {
            assert_eq!(state.state.registers[0xF], 0x02);
        },
    );
}

#[test]
fn test_set_index_and_jump_with_offset() {
    do_cycle(
        0xA123,
        |_| {},
        |state| {
            assert_eq!(state.state.index, 0x123);
            assert_eq!(state.state.program_counter, 0x202);
        },
    );
    do_cycle(
        0xB300,
        |state| {
            state.state.registers[0] = 4;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x304);
        },
    );
}

#[test]
fn test_random_is_masked() {
    do_cycle(
        0xC500,
        |state| {
            state.state.registers[5] = 0xAA;
        },
        |state| {
            assert_eq!(state.state.registers[5], 0);
        },
    );

    let mut chip = prepare_state_with_program(&[0xC50F; 32]);
    for _ in 0..32 {
        chip.step().unwrap();
        assert!(chip.state().registers()[5] <= 0x0F);
    }
}

#[test]
fn test_draw_twice_collides_and_clears() {
    // draw glyph 0 twice at (3, 4)
    let mut chip = prepare_state_with_program(&[0x6003, 0x6104, 0x6200, 0xF229, 0xD015, 0xD015]);
    run(&mut chip, 5);
    assert_eq!(chip.state().registers()[0xF], 0);
    assert!(chip.state().display().pixel(3, 4));
    assert!(chip.state().display().pixel(6, 4));
    assert!(!chip.state().display().pixel(4, 5));
    assert!(chip.take_frame().is_some());
    assert!(chip.take_frame().is_none());

    run(&mut chip, 1);
    assert_eq!(chip.state().registers()[0xF], 1);
    assert!(chip.state().display().is_blank());
    assert!(chip.take_frame().is_some());
}

#[test]
fn test_draw_wraps_around_display() {
    let mut chip = prepare_state_with_program(&[0x603E, 0x611F, 0xA300, 0xD012]);
    chip.state.memory[0x300] = 0xFF;
    chip.state.memory[0x301] = 0x80;
    run(&mut chip, 4);
    let display = chip.state().display();
    assert!(display.pixel(62, 31));
    assert!(display.pixel(63, 31));
    assert!(display.pixel(0, 31));
    assert!(display.pixel(5, 31));
    assert!(display.pixel(62, 0));
    assert!(!display.pixel(63, 0));
}

#[test]
fn test_draw_beyond_memory_halts() {
    let mut chip = prepare_state_with_program(&[0xAFFE, 0xD015]);
    run(&mut chip, 1);
    assert_eq!(chip.step(), Err(MachineError::AddressOutOfBounds(0x1000)));
    assert!(chip.state().display().is_blank());
    assert_eq!(chip.state().program_counter(), 0x202);
    assert!(chip.is_halted());
}

#[test]
fn test_draw_zero_rows_with_index_past_memory() {
    let mut chip = prepare_state_with_program(&[0xAFFF, 0x60FF, 0xF01E, 0xD010]);
    run(&mut chip, 3);
    assert_eq!(chip.state().index(), 0x10FE);

    assert_eq!(chip.step(), Ok(StepOutcome::Executed));
    assert_eq!(chip.state().registers()[0xF], 0);
    assert_eq!(chip.state().program_counter(), 0x208);
    assert!(chip.state().display().is_blank());
    assert!(!chip.is_halted());
}

#[test]
fn test_skip_on_key() {
    do_cycle(
        0xE09E,
        |state| {
            state.state.registers[0] = 0xB;
            state.set_input_pin(0xB, true).unwrap();
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x204);
        },
    );
    do_cycle(
        0xE09E,
        |state| {
            state.state.registers[0] = 0xB;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x202);
        },
    );
    do_cycle(
        0xE0A1,
        |state| {
            state.state.registers[0] = 0xB;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x204);
        },
    );
    do_cycle(
        0xE0A1,
        |state| {
            state.state.registers[0] = 0xB;
            state.set_input_pin(0xB, true).unwrap();
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x202);
        },
    );
}

#[test]
fn test_skip_on_key_beyond_keypad() {
    do_cycle(
        0xE0A1,
        |state| {
            state.state.registers[0] = 0x20;
        },
        |state| {
            assert_eq!(state.state.program_counter, 0x204);
        },
    );
}

#[test]
fn test_timer_registers() {
    let mut chip = prepare_state_with_program(&[0x6A2A, 0xFA15, 0xFA18, 0xFB07]);
    run(&mut chip, 4);
    assert_eq!(chip.state().delay_timer(), 0x2A);
    assert_eq!(chip.state().sound_timer(), 0x2A);
    assert_eq!(chip.state().registers()[0xB], 0x2A);
    assert!(chip.sound_active());
}

#[test]
fn test_timers_floor_at_zero() {
    let mut chip = prepare_state_with_program(&[0x6002, 0xF015, 0xF018]);
    run(&mut chip, 3);
    for _ in 0..10 {
        chip.tick_timers();
    }
    assert_eq!(chip.state().delay_timer(), 0);
    assert_eq!(chip.state().sound_timer(), 0);
    assert!(!chip.sound_active());
}

#[test]
fn test_wait_for_key() {
    let mut chip = prepare_state_with_program(&[0x6005, 0xF015, 0xF30A, 0x1206]);
    run(&mut chip, 2);

    assert_eq!(chip.step(), Ok(StepOutcome::AwaitingKey));
    assert_eq!(
        *chip.state().run_state(),
        RunState::AwaitingKey { register: 3 }
    );
    for _ in 0..3 {
        assert_eq!(chip.step(), Ok(StepOutcome::AwaitingKey));
        chip.tick_timers();
    }
    assert_eq!(chip.state().program_counter(), 0x204);
    assert_eq!(chip.state().delay_timer(), 2);

    chip.set_input_pin(0x9, true).unwrap();
    assert_eq!(chip.step(), Ok(StepOutcome::Executed));
    assert_eq!(chip.state().registers()[3], 0x9);
    assert_eq!(chip.state().program_counter(), 0x206);
    assert_eq!(*chip.state().run_state(), RunState::Running);
}

#[test]
fn test_wait_for_key_already_pressed() {
    do_cycle(
        0xF70A,
        |state| {
            state.set_input_pin(0xE, true).unwrap();
        },
        |state| {
            assert_eq!(state.state.registers[7], 0xE);
            assert_eq!(state.state.program_counter, 0x202);
        },
    );
}

#[test]
fn test_wait_for_key_takes_highest_held_key() {
    let mut chip = prepare_state_with_program(&[0xF20A]);
    assert_eq!(chip.step(), Ok(StepOutcome::AwaitingKey));

    chip.set_input_pin(0x1, true).unwrap();
    chip.set_input_pin(0xC, true).unwrap();
    chip.set_input_pin(0x5, true).unwrap();
    assert_eq!(chip.step(), Ok(StepOutcome::Executed));
    assert_eq!(chip.state().registers()[2], 0xC);
}

#[test]
fn test_add_to_index() {
    do_cycle(
        0xF01E,
        |state| {
            state.state.index = 0xFFE;
            state.state.registers[0] = 0x01;
        },
        |state| {
            assert_eq!(state.state.index, 0xFFF);
            assert_eq!(state.state.registers[0xF], 0);
        },
    );
    do_cycle(
        0xF01E,
        |state| {
            state.state.index = 0xFFE;
            state.state.registers[0] = 0x02;
        },
        |state| {
            assert_eq!(state.state.index, 0x1000);
            assert_eq!(state.state.registers[0xF], 1);
        },
    );
}

#[test]
fn test_font_glyph_address() {
    do_cycle(
        0xF429,
        |state| {
            state.state.registers[4] = 0xA;
        },
        |state| {
            assert_eq!(state.state.index, 0x050 + 0xA * 5);
            assert_eq!(state.state.memory[state.state.index as usize], 0xF0);
        },
    );
}

#[test]
fn test_binary_coded_decimal() {
    do_cycle(
        0xF633,
        |state| {
            state.state.registers[6] = 234;
            state.state.index = 0x400;
        },
        |state| {
            assert_eq!(state.state.memory[0x400..0x403], [2, 3, 4]);
            assert_eq!(state.state.index, 0x400);
        },
    );
}

#[test]
fn test_store_and_load_registers() {
    let mut chip = prepare_state_with_program(&[0xA500, 0xF355, 0xA500, 0xF365]);
    chip.state.registers[..5].copy_from_slice(&[0x11, 0x22, 0x33, 0x44, 0x55]);

    run(&mut chip, 2);
    assert_eq!(chip.state().memory()[0x500..0x505], [0x11, 0x22, 0x33, 0x44, 0x00]);
    assert_eq!(chip.state().index(), 0x504);

    chip.state.registers = [0; 16];
    run(&mut chip, 2);
    assert_eq!(chip.state().registers()[..5], [0x11, 0x22, 0x33, 0x44, 0x00]);
    assert_eq!(chip.state().index(), 0x504);
}

#[test]
fn test_unknown_opcode_halts_without_side_effects() {
    let mut chip = prepare_state_with_program(&[0x5001]);
    chip.state.registers[0] = 3;
    chip.state.index = 0x321;
    let registers = chip.state.registers;
    let memory = chip.state.memory;

    assert_eq!(chip.step(), Err(MachineError::UnknownOpcode(0x5001)));
    assert!(chip.is_halted());
    assert_eq!(
        chip.state().halt_reason(),
        Some(&MachineError::UnknownOpcode(0x5001))
    );
    assert_eq!(chip.state.registers, registers);
    assert_eq!(chip.state.memory[..], memory[..]);
    assert_eq!(chip.state().index(), 0x321);
    assert_eq!(chip.state().program_counter(), 0x200);

    assert_eq!(chip.step(), Err(MachineError::Halted));
}

#[test]
fn test_program_counter_beyond_memory_halts() {
    let mut chip = prepare_state_with_single_instruction(0x1FFF);
    run(&mut chip, 1);
    assert_eq!(
        chip.step(),
        Err(MachineError::ProgramCounterOutOfBounds(0xFFF))
    );
    assert!(chip.is_halted());
}

#[test]
fn test_stack_overflow_halts() {
    // a subroutine calling itself
    let mut chip = prepare_state_with_single_instruction(0x2200);
    run(&mut chip, 16);
    assert_eq!(chip.state().stack_pointer(), 16);
    assert_eq!(chip.step(), Err(MachineError::StackOverflow(0x200)));
    assert_eq!(chip.state().stack_pointer(), 16);
    assert!(chip.is_halted());
}

#[test]
fn test_stack_underflow_halts() {
    let mut chip = prepare_state_with_single_instruction(0x00EE);
    assert_eq!(chip.step(), Err(MachineError::StackUnderflow(0x200)));
    assert_eq!(chip.state().program_counter(), 0x200);
    assert!(chip.is_halted());
}

#[test]
fn test_reset_after_halt() {
    let mut chip = prepare_state_with_single_instruction(0x00EE);
    assert!(chip.step().is_err());
    chip.reset();
    assert!(!chip.is_halted());
    assert_eq!(chip.state().program_counter(), 0x200);
    assert_eq!(chip.state().memory()[0x200], 0);
}

#[test]
fn test_invalid_input_pin() {
    let mut chip = Chip8::new();
    assert_eq!(
        chip.set_input_pin(0x10, true),
        Err(MachineError::InvalidKeyIndex(0x10))
    );
    chip.set_input_pin(0x1, true).unwrap();
    chip.reset_input_pins();
    assert_eq!(chip.state().highest_pressed_key(), None);
}

#[test]
fn test_load_program_from_file() {
    let path = std::env::temp_dir().join(format!("chip-8-vm-test-{}.ch8", std::process::id()));
    std::fs::write(&path, [0x12u8, 0x00]).unwrap();

    let mut chip = Chip8::new();
    let loaded = chip.load_program(path.to_str().unwrap());
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.unwrap(), 2);
    assert_eq!(chip.fetch_opcode(), Ok(0x1200));
}

#[test]
fn test_load_program_missing_file() {
    let mut chip = Chip8::new();
    match chip.load_program("/nonexistent/chip-8-vm/program.ch8") {
        Err(LoadProgramError::CouldNotReadFile { path, .. }) => {
            assert_eq!(path, "/nonexistent/chip-8-vm/program.ch8")
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_pacer_drives_chip() {
    // count V0 up in an endless loop
    let mut chip = prepare_state_with_program(&[0x7001, 0x1200]);
    let start = Instant::now();
    let mut pacer = Pacer::new(PacingConfig::default(), start);

    let report = pacer.run_due(&mut chip, start + Duration::from_millis(8));
    assert_eq!(report.steps, 4);
    assert_eq!(chip.state().registers()[0], 2);
}
