use chip8::{Emulator, TickSchedule, KEY_COUNT, TIMER_PERIOD};
use clap::{crate_version, value_t, App, Arg};
use log::{debug, error, info};
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};

use std::path::PathBuf;
use std::time::{Duration, Instant};

const MICROS_BETWEEN_DISPLAY_REFRESH: u64 = 1_000_000 / 60;
const IDLE_SLEEP: Duration = Duration::from_micros(200);

const BACKGROUND_COLOUR: u32 = 0x002C_50_66;
const FOREGROUND_COLOUR: u32 = 0x00_68_BB_ED;

struct Config {
    rom: PathBuf,
    cycles_per_second: u32,
    scale: Scale,
    seed: Option<u64>,
    start_paused: bool,
}

impl Config {
    fn from_args() -> Self {
        let matches = App::new("CHIP-8")
            .version(crate_version!())
            .about("A CHIP-8 interpreter")
            .arg(
                Arg::with_name("ROM")
                    .help("The CHIP-8 ROM to run")
                    .required(true)
                    .index(1),
            )
            .arg(
                Arg::with_name("speed")
                    .long("speed")
                    .short("s")
                    .value_name("HZ")
                    .help("Instructions executed per second")
                    .takes_value(true)
                    .default_value("700"),
            )
            .arg(
                Arg::with_name("scale")
                    .long("scale")
                    .value_name("FACTOR")
                    .help("Window scale factor")
                    .takes_value(true)
                    .possible_values(&["1", "2", "4", "8", "16", "32"])
                    .default_value("16"),
            )
            .arg(
                Arg::with_name("seed")
                    .long("seed")
                    .value_name("SEED")
                    .help("Seed for the random number generator, for reproducible runs")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("paused")
                    .long("paused")
                    .help("Start paused; press N to execute one instruction at a time"),
            )
            .get_matches();

        let cycles_per_second = value_t!(matches, "speed", u32).unwrap_or_else(|e| e.exit());
        let seed = if matches.is_present("seed") {
            Some(value_t!(matches, "seed", u64).unwrap_or_else(|e| e.exit()))
        } else {
            None
        };
        let scale = match matches.value_of("scale") {
            Some("1") => Scale::X1,
            Some("2") => Scale::X2,
            Some("4") => Scale::X4,
            Some("8") => Scale::X8,
            Some("32") => Scale::X32,
            _ => Scale::X16,
        };

        Self {
            rom: PathBuf::from(matches.value_of("ROM").unwrap_or_default()),
            cycles_per_second: cycles_per_second.max(1),
            scale,
            seed,
            start_paused: matches.is_present("paused"),
        }
    }

    fn cycle_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.cycles_per_second))
    }
}

struct MiniFBInput {
    key_states: [bool; KEY_COUNT],
}

impl MiniFBInput {
    fn new() -> Self {
        Self {
            key_states: [false; KEY_COUNT],
        }
    }

    fn update_key_state(&mut self, window: &Window) {
        for key in 0..KEY_COUNT as u8 {
            self.key_states[key as usize] = window.is_key_down(MiniFBInput::map_key(key));
        }
    }

    fn key_states(&self) -> [bool; KEY_COUNT] {
        self.key_states
    }

    fn map_key(key: u8) -> Key {
        match key {
            0x1 => Key::Key1,
            0x2 => Key::Key2,
            0x3 => Key::Key3,
            0xc => Key::Key4,

            0x4 => Key::Q,
            0x5 => Key::W,
            0x6 => Key::E,
            0xd => Key::R,

            0x7 => Key::A,
            0x8 => Key::S,
            0x9 => Key::D,
            0xe => Key::F,

            0xa => Key::Z,
            0x0 => Key::X,
            0xb => Key::C,
            _ => Key::V,
        }
    }
}

fn create_window(scale: Scale) -> Result<Window, Box<dyn std::error::Error>> {
    let mut opts = WindowOptions::default();

    opts.scale = scale;
    let window = Window::new("CHIP-8", 64, 32, opts)?;

    Ok(window)
}

fn load_emulator(config: &Config) -> Result<Emulator, chip8::LoadError> {
    let emulator = match config.seed {
        Some(seed) => {
            let rom = std::fs::read(&config.rom)?;
            Emulator::with_seed(rom, seed)
        }
        None => Emulator::from_path(&config.rom),
    };

    emulator.map_err(|e| {
        error!("Unable to load {}: {}", config.rom.display(), e);
        e
    })
}

fn log_machine_state(emulator: &Emulator) {
    let cpu = emulator.cpu();
    error!(
        "  PC {:03X}  I {:03X}  SP {}  V {:02X?}",
        cpu.pc(),
        cpu.i(),
        cpu.stack_depth(),
        cpu.registers()
    );
}

fn log_recent_trace(emulator: &Emulator) {
    for entry in emulator.trace().iter().take(16) {
        error!("  {}", entry);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_args();
    let mut emulator = load_emulator(&config)?;
    info!(
        "Running {} at {} instructions per second",
        config.rom.display(),
        config.cycles_per_second
    );

    let mut window = create_window(config.scale)?;
    let mut input = MiniFBInput::new();
    let mut paused = config.start_paused;
    let mut reported_fault = false;

    let now = Instant::now();
    let mut cycle_schedule = TickSchedule::new(config.cycle_period(), now);
    let mut delay_schedule = TickSchedule::new(TIMER_PERIOD, now);
    let mut sound_schedule = TickSchedule::new(TIMER_PERIOD, now);
    let mut redraw_schedule =
        TickSchedule::new(Duration::from_micros(MICROS_BETWEEN_DISPLAY_REFRESH), now);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if window.is_key_pressed(Key::F1, KeyRepeat::No) && !emulator.is_initial_state() {
            emulator = emulator.reset();
            reported_fault = false;
            let now = Instant::now();
            cycle_schedule.restart(now);
            delay_schedule.restart(now);
            sound_schedule.restart(now);
            continue;
        }

        if window.is_key_pressed(Key::P, KeyRepeat::No) {
            paused = !paused;
            debug!("{}", if paused { "Paused" } else { "Resumed" });
        }

        input.update_key_state(&window);
        emulator.set_keys(input.key_states());

        let now = Instant::now();
        if paused {
            if window.is_key_pressed(Key::N, KeyRepeat::Yes) {
                // Faults are reported below.
                let _ = emulator.step();
                if let Some(entry) = emulator.trace().latest() {
                    debug!("Stepped {}", entry);
                }
            }
        } else {
            if cycle_schedule.due(now) {
                let _ = emulator.step();
            }
            if delay_schedule.due(now) {
                emulator.tick_delay_timer();
            }
            if sound_schedule.due(now) {
                emulator.tick_sound_timer();
            }
        }

        if let Some(fault) = emulator.fault() {
            if !reported_fault {
                error!("{} (press F1 to reset)", fault);
                log_machine_state(&emulator);
                error!("Most recent instructions:");
                log_recent_trace(&emulator);
                reported_fault = true;
            }
        }

        if redraw_schedule.due(now) {
            if emulator.display().is_dirty() {
                let buffer = emulator
                    .display()
                    .rgba_framebuffer()
                    .into_iter()
                    .map(|value| {
                        if value == 0x0 {
                            BACKGROUND_COLOUR
                        } else {
                            FOREGROUND_COLOUR
                        }
                    })
                    .collect::<Vec<u32>>();

                window.update_with_buffer(&buffer)?;
                emulator.display_mut().clear_dirty();
            } else {
                window.update();
            }
        } else {
            std::thread::sleep(IDLE_SLEEP);
        }
    }

    Ok(())
}
