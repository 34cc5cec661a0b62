use std::time::Duration;

/// Size of the addressable memory in bytes.
pub const CHIP8_MEMORY_SIZE: usize = 4096;

/// Address at which programs are loaded and execution starts.
pub const CHIP8_PROGRAM_OFFSET: u16 = 0x200;

/// Largest program image that fits between `CHIP8_PROGRAM_OFFSET` and the end of memory.
pub const CHIP8_MAX_PROGRAM_SIZE: usize = CHIP8_MEMORY_SIZE - CHIP8_PROGRAM_OFFSET as usize; // 3584

/// Highest address reachable by the logically 12 bit index register.
pub const CHIP8_ADDRESS_MASK: u16 = 0x0FFF;

pub const CHIP8_REGISTER_COUNT: usize = 16;

/// Index of the register doubling as carry/borrow/collision flag.
pub const CHIP8_FLAG_REGISTER: usize = 0xF;

pub const CHIP8_STACK_DEPTH: usize = 16;

pub const CHIP8_KEY_COUNT: usize = 16;

pub const CHIP8_DISPLAY_WIDTH: usize = 64;

pub const CHIP8_DISPLAY_HEIGHT: usize = 32;

pub const CHIP8_DISPLAY_SIZE: usize = CHIP8_DISPLAY_WIDTH * CHIP8_DISPLAY_HEIGHT;

/// Bytes per pixel of the packed RGBA display export.
pub const CHIP8_RGBA_BYTES_PER_PIXEL: usize = 4;

pub const CHIP8_CHARSET_OFFSET: u16 = 0x50; // 80

pub const CHIP8_CHARSET_LEN: u16 = 0x50; // 80

/// Height in bytes of one built-in glyph.
pub const CHIP8_GLYPH_HEIGHT: u16 = 5;

pub const CHIP8_CHARSET: [u8; CHIP8_CHARSET_LEN as usize] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Default instruction rate (~2ms per instruction).
pub const CHIP8_DEFAULT_INSTRUCTION_HZ: u32 = 500;

/// Default rate of the delay and sound timers (~16.6ms per tick).
pub const CHIP8_DEFAULT_TIMER_HZ: u32 = 60;

/// Number of overdue periods a ticker fires at once before it re-anchors.
pub const CHIP8_DEFAULT_MAX_CATCH_UP: u32 = 8;

/// Converts a rate in Hz into the length of one period.
pub const fn period_of(hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / hz as u64)
}
