use std::error::Error as _;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use cursive::{
    view::Nameable,
    views::{LinearLayout, TextView},
    CbSink, Cursive,
};
use log::{error, info, warn};

use chip_8_vm::chip::{
    chip8::{
        constants::{CHIP8_DEFAULT_INSTRUCTION_HZ, CHIP8_DEFAULT_TIMER_HZ},
        cursive_display::{Display, DISPLAY_VIEW_NAME},
        timing::{Pacer, PacingConfig},
        Chip8,
    },
    Chip, ChipWithCursiveDisplay,
};

/// Name of the status line below the display.
const STATUS_VIEW_NAME: &str = "chip8-status";

/// How much SpeedUp/SlowDown change the instruction rate.
const SPEED_STEP_HZ: u32 = 50;

/// Pause between two rounds of the event loop.
const EVENT_LOOP_SLEEP: Duration = Duration::from_millis(1);

/// Keyboard layout: the left-hand 4x4 block of a qwerty keyboard.
const KEY_MAP: [(char, u8); 16] = [
    ('1', 0x1),
    ('2', 0x2),
    ('3', 0x3),
    ('4', 0xC),
    ('q', 0x4),
    ('w', 0x5),
    ('e', 0x6),
    ('r', 0xD),
    ('a', 0x7),
    ('s', 0x8),
    ('d', 0x9),
    ('f', 0xE),
    ('z', 0xA),
    ('x', 0x0),
    ('c', 0xB),
    ('v', 0xF),
];

/// Runs a CHIP-8 program in the terminal.
///
/// Keys 1-4, q-r, a-f and z-v form the keypad, space releases all keys, the arrow
/// keys up and down change the speed and Esc quits.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the program image to run
    program: String,

    /// Instructions executed per second
    #[arg(long, default_value_t = CHIP8_DEFAULT_INSTRUCTION_HZ)]
    cpu_hz: u32,

    /// Delay and sound timer ticks per second
    #[arg(long, default_value_t = CHIP8_DEFAULT_TIMER_HZ)]
    timer_hz: u32,

    /// Print a hex dump of memory after loading the program
    #[arg(long)]
    dump_memory: bool,
}

/// Represents an event to be processed by the event loop. It is generic
/// over the type representing the pressed key.
enum Event<T> {
    /// Occurs when the key passed in the enum value was pressed.
    Key(T),

    /// Indicates that all keys are released. Note that this is a
    /// hack because terminals do not report key up events. To get
    /// around this we simply read the stdin (indirectly via registering
    /// for cursive events) and assign one key to trigger releasing all
    /// keys.
    KeyRelease,

    /// Raises the instruction rate.
    SpeedUp,

    /// Lowers the instruction rate.
    SlowDown,

    /// Shut down.
    Quit,
}

/// Represents the channels available to the event loop. It is generic
/// over the type representing the pressed keys.
#[derive(Clone)]
struct EventLoopChannels<T> {
    /// The channel to send the UI refresh messages to.
    gfx_sender: CbSink,

    /// The channel on which the Events are received.
    key_receiver: Receiver<Event<T>>,

    /// A channel to report that the thread has completed
    /// shutdown.
    shutdown_sender: Sender<()>,
}

/// What the status line shows.
#[derive(Clone, PartialEq, Eq)]
struct Status {
    instruction_hz: u32,
    sound: bool,
    halted: Option<String>,
}

impl Status {
    fn render(&self) -> String {
        let sound = if self.sound { "♪" } else { " " };
        match &self.halted {
            Some(reason) => format!("{} {} Hz | halted: {} | Esc quits", sound, self.instruction_hz, reason),
            None => format!("{} {} Hz | space releases keys | Esc quits", sound, self.instruction_hz),
        }
    }
}

/// The event loop. Constantly loops over (1) process pending events. (2) Run the
/// instruction cycles and timer ticks that are due. (3) Update the UI. (4) Sleep
/// briefly. (5) Start over. A halted chip is no longer stepped, but the loop keeps
/// serving events so the UI stays responsive.
fn event_loop<T>(mut chip: T, mut pacer: Pacer, io_channels: EventLoopChannels<u8>)
where
    T: Chip<PinAddress = u8> + ChipWithCursiveDisplay,
{
    let mut halted: Option<String> = None;
    let mut shown_status: Option<Status> = None;
    loop {
        loop {
            match io_channels.key_receiver.try_recv() {
                Ok(Event::Key(key)) => {
                    let result = chip.set_input_pin(key, true);
                    debug_assert!(result.is_ok(), "key map produced {:?}", result);
                    if let Err(e) = result {
                        error!("{}", e);
                    }
                }
                Ok(Event::KeyRelease) => {
                    chip.reset_input_pins();
                }
                Ok(Event::Quit) => {
                    if io_channels.shutdown_sender.send(()).is_err() {
                        warn!("UI went away before shutdown completed");
                    }
                    return;
                }
                Ok(Event::SpeedUp) => {
                    let hz = pacer.config().instruction_hz().saturating_add(SPEED_STEP_HZ);
                    pacer.set_instruction_hz(hz, Instant::now());
                    info!("Instruction rate {} Hz", hz);
                }
                Ok(Event::SlowDown) => {
                    let hz = pacer.config().instruction_hz().saturating_sub(SPEED_STEP_HZ);
                    if pacer.set_instruction_hz(hz, Instant::now()) {
                        info!("Instruction rate {} Hz", hz);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        let report = pacer.run_due(&mut chip, Instant::now());
        if let Some(reason) = report.halted {
            halted = Some(reason.to_string());
        }

        if !chip.update_ui(&io_channels.gfx_sender) {
            return;
        }

        let status = Status {
            instruction_hz: pacer.config().instruction_hz(),
            sound: chip.sound_active(),
            halted: halted.clone(),
        };
        if shown_status.as_ref() != Some(&status) {
            let text = status.render();
            let sent = io_channels.gfx_sender.send(Box::new(move |s: &mut Cursive| {
                s.call_on_name(STATUS_VIEW_NAME, |view: &mut TextView| view.set_content(text));
            }));
            if sent.is_err() {
                return;
            }
            shown_status = Some(status);
        }

        thread::sleep(EVENT_LOOP_SLEEP);
    }
}

/// Forwards `event` to the event loop without blocking the UI thread.
fn forward(sender: &Sender<Event<u8>>, event: Event<u8>) {
    if let Err(TrySendError::Full(_)) = sender.try_send(event) {
        warn!("Event loop is lagging, dropped an input event");
    }
}

/// Constructs the UI and spawns the event loop and the UI thread.
fn main() {
    env_logger::init();

    // usage errors are reported, but do not change the exit code
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return;
        }
    };

    let config = match PacingConfig::new(args.cpu_hz, args.timer_hz) {
        Some(config) => config,
        None => {
            println!("Usage: --cpu-hz and --timer-hz must be greater than zero.");
            return;
        }
    };

    let mut chip8 = Chip8::new();
    match chip8.load_program(&args.program) {
        Ok(size) => info!("Loaded {} ({} bytes)", args.program, size),
        Err(e) => {
            match e.source() {
                Some(source) => println!("{}: {}", e, source),
                None => println!("{}", e),
            }
            return;
        }
    }

    if args.dump_memory {
        print!("{}", chip8.state().memory_dump());
    }

    let mut siv = cursive::default();

    let cb_sink = siv.cb_sink().clone();
    let (key_sender, key_receiver) = bounded::<Event<u8>>(10);
    let (shutdown_sender, shutdown_receiver) = bounded::<()>(1);

    thread::spawn(move || {
        event_loop(
            chip8,
            Pacer::new(config, Instant::now()),
            EventLoopChannels {
                gfx_sender: cb_sink,
                key_receiver,
                shutdown_sender,
            },
        );
    });

    let sender = key_sender.clone();
    siv.add_global_callback(cursive::event::Key::Esc, move |s| {
        if sender.send(Event::Quit).is_ok() {
            let _ = shutdown_receiver.recv();
        }
        s.quit();
    });

    for (key, pin) in KEY_MAP {
        let sender = key_sender.clone();
        siv.add_global_callback(key, move |_s| forward(&sender, Event::Key(pin)));
    }

    let sender = key_sender.clone();
    siv.add_global_callback(' ', move |_s| forward(&sender, Event::KeyRelease));

    let sender = key_sender.clone();
    siv.add_global_callback(cursive::event::Key::Up, move |_s| {
        forward(&sender, Event::SpeedUp)
    });

    let sender = key_sender;
    siv.add_global_callback(cursive::event::Key::Down, move |_s| {
        forward(&sender, Event::SlowDown)
    });

    siv.add_layer(
        LinearLayout::vertical()
            .child(Display::default().with_name(DISPLAY_VIEW_NAME))
            .child(TextView::new("").with_name(STATUS_VIEW_NAME)),
    );

    siv.run();
}
