use crate::chip::{
    chip8::{
        constants::{CHIP8_DISPLAY_HEIGHT, CHIP8_DISPLAY_WIDTH},
        framebuffer::Framebuffer,
        Chip8,
    },
    ChipWithCursiveDisplay,
};

use cursive::{
    event::{Event, EventResult},
    theme::{BaseColor, Color, ColorStyle},
    view::View,
    CbSink, Cursive, Printer, Vec2,
};

/// Name under which the display view is registered in the cursive tree.
pub const DISPLAY_VIEW_NAME: &str = "chip8-display";

/// Represents the display of the Chip 8
pub struct Display {
    frame: Framebuffer,
}

impl Display {
    /// Creates a new display showing `frame`.
    pub fn new(frame: Framebuffer) -> Self {
        Display { frame }
    }

    pub fn set_frame(&mut self, frame: Framebuffer) {
        self.frame = frame;
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new(Framebuffer::new())
    }
}

/// Implements cursive::view::View for Display to enable drawing it
/// as a View out of the box.
impl View for Display {
    fn draw(&self, printer: &Printer) {
        printer.with_color(
            ColorStyle::new(Color::Dark(BaseColor::Black), Color::Light(BaseColor::White)),
            |printer| {
                for x in 0..CHIP8_DISPLAY_WIDTH {
                    for y in 0..CHIP8_DISPLAY_HEIGHT {
                        if self.frame.pixel(x, y) {
                            printer.print((x, y), " ");
                        }
                    }
                }
            },
        );
    }

    fn on_event(&mut self, _event: Event) -> EventResult {
        EventResult::Ignored
    }

    fn required_size(&mut self, _: Vec2) -> Vec2 {
        Vec2::new(CHIP8_DISPLAY_WIDTH, CHIP8_DISPLAY_HEIGHT)
    }
}

impl ChipWithCursiveDisplay for Chip8 {
    fn update_ui(&mut self, gfx_sink: &CbSink) -> bool {
        let frame = match self.take_frame() {
            Some(frame) => frame,
            None => return true,
        };
        gfx_sink
            .send(Box::new(move |s: &mut Cursive| {
                s.call_on_name(DISPLAY_VIEW_NAME, |display: &mut Display| {
                    display.set_frame(frame)
                });
            }))
            .is_ok()
    }
}
