use anyhow::{Context, Result};
use cando::bus::BusBinding;
use cando::display::{Display, SnapshotQueue, TerminalDisplay};
use cando::input::{ControlSource, GamepadDriver, InputDriver, KeyboardDriver, KeyboardSession};
use cando::noise::NoiseVolume;
use cando::sim::{self, SimConfig};
use clap::Parser;
use crossterm::{cursor, execute, terminal};
use std::io::Write;
use std::time::Duration;

/// CANdo, a CAN bus simulator for practicing bus sniffing
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Drive with a gamepad instead of the keyboard
    #[arg(short, long)]
    gamepad: bool,
    /// Disable background noise (cheating if reverse engineering)
    #[arg(short = 'X')]
    no_noise: bool,
    /// Noise difficulty, 1 = 20, 2 = 50, 3 = 100 noise sources
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=3))]
    difficulty: u8,
    /// CAN interface
    #[arg(short, long, default_value = "vcan0")]
    interface: String,
    /// Nominal bitrate of the interface
    #[arg(short, long, default_value_t = 500000)]
    bitrate: u32,
    /// Sender ticks per second
    #[arg(long, default_value_t = 25)]
    tick_rate: u32,
    /// Joystick device of the gamepad
    #[arg(long, default_value = "/dev/input/js0")]
    gamepad_device: String,
    /// Run on an in process bus instead of socketcan
    #[arg(long = "virtual")]
    virtual_bus: bool,
}

impl Args {
    fn config(&self) -> Result<SimConfig> {
        let noise = if self.no_noise {
            None
        } else {
            Some(
                NoiseVolume::try_from(self.difficulty)
                    .map_err(|_| anyhow::anyhow!("invalid difficulty {}", self.difficulty))?,
            )
        };
        Ok(SimConfig {
            control: if self.gamepad {
                ControlSource::Gamepad
            } else {
                ControlSource::Keyboard
            },
            noise,
            binding: BusBinding {
                interface: self.interface.clone(),
                bitrate: self.bitrate,
            },
            tick_rate: self.tick_rate,
            gamepad_device: self.gamepad_device.clone(),
            virtual_bus: self.virtual_bus,
        })
    }
}

fn print_header(config: &SimConfig) {
    println!();
    println!("   ____    _    _   _     _");
    println!("  / ___|  / \\  | \\ | | __| | ___");
    println!(" | |     / _ \\ |  \\| |/ _` |/ _ \\");
    println!(" | |___ / ___ \\| |\\  | (_| | (_) |");
    println!("  \\____/_/   \\_\\_| \\_|\\__,_|\\___/");
    println!();
    println!("A CAN BUS simulating program");
    println!();
    match config.control {
        ControlSource::Keyboard => println!("Controller set to - KEYBOARD"),
        ControlSource::Gamepad => println!("Controller set to - GAMEPAD"),
    }
    if config.virtual_bus {
        println!("Bus - in process loopback");
    } else {
        println!(
            "Bus - {} @ {} bit/s",
            config.binding.interface, config.binding.bitrate
        );
    }
}

fn open_input(
    config: &SimConfig,
    keyboard: Option<&KeyboardSession>,
) -> impl FnOnce() -> Result<Box<dyn InputDriver>, cando::InputError> {
    let control = config.control;
    let device = config.gamepad_device.clone();
    let releases = keyboard.is_some_and(KeyboardSession::releases);
    move || -> Result<Box<dyn InputDriver>, cando::InputError> {
        match control {
            ControlSource::Keyboard => Ok(Box::new(KeyboardDriver::new(releases))),
            ControlSource::Gamepad => Ok(Box::new(GamepadDriver::open(&device)?)),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = args.config()?;
    print_header(&config);
    println!("Starting sim...");

    // terminal modes are set here, stdout belongs to this thread from now on
    let keyboard = match config.control {
        ControlSource::Keyboard => Some(KeyboardSession::start()?),
        ControlSource::Gamepad => None,
    };
    let queue = SnapshotQueue::new();
    let simulation = sim::start_on_binding(
        &config,
        queue.clone(),
        open_input(&config, keyboard.as_ref()),
    )
        .with_context(|| format!("failed to start on {}", config.binding.interface))?;

    let mut stdout = std::io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
    let mut dashboard = TerminalDisplay::new(std::io::stdout());
    let frame_time = Duration::from_millis(1000 / u64::from(config.tick_rate.max(1)));
    while !simulation.is_finished() {
        if let Some(snapshot) = queue.latest() {
            dashboard.show(snapshot);
        }
        std::thread::sleep(frame_time);
    }
    drop(dashboard);
    execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen)?;
    stdout.flush()?;
    drop(keyboard);

    let result = simulation.join();
    println!("Closing...");
    result.context("simulation failed")
}
