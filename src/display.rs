//! Dashboard side of the simulator.
//! The receiver publishes a [DisplaySnapshot] for every recognized frame, rendering
//! is done elsewhere and never blocks the receiver.

use crate::input::ControlSource;
use crossbeam_queue::ArrayQueue;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor, queue, terminal};
use log::info;
use std::io::Write;
use std::sync::Arc;

/// Snapshots kept for a slow renderer, older ones are overwritten
pub const SNAPSHOT_BUFFER: usize = 16;

/// Dashboard theme, selected by control source and head lights
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BackgroundVariant {
    /// keyboard layout, lights off
    KeyboardDark,
    /// keyboard layout, lights on
    KeyboardLight,
    /// gamepad layout, lights off
    GamepadDark,
    /// gamepad layout, lights on
    GamepadLight,
}

impl BackgroundVariant {
    /// Resolves the variant once from its two inputs
    pub fn resolve(source: ControlSource, lights_on: bool) -> Self {
        match (source, lights_on) {
            (ControlSource::Keyboard, false) => BackgroundVariant::KeyboardDark,
            (ControlSource::Keyboard, true) => BackgroundVariant::KeyboardLight,
            (ControlSource::Gamepad, false) => BackgroundVariant::GamepadDark,
            (ControlSource::Gamepad, true) => BackgroundVariant::GamepadLight,
        }
    }
    /// 2 bit selector: bit 1 control source, bit 0 lights
    pub fn selector(self) -> u8 {
        match self {
            BackgroundVariant::KeyboardDark => 0b00,
            BackgroundVariant::KeyboardLight => 0b01,
            BackgroundVariant::GamepadDark => 0b10,
            BackgroundVariant::GamepadLight => 0b11,
        }
    }
    /// Check for one of the light variants
    pub fn is_light(self) -> bool {
        self.selector() & 1 == 1
    }
}

/// Everything the dashboard shows
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DisplaySnapshot {
    /// head lights on
    pub lights_on: bool,
    /// doors locked
    pub doors_closed: bool,
    /// left lamp lit
    pub indicator_left: bool,
    /// right lamp lit
    pub indicator_right: bool,
    /// km/h
    pub speed: i64,
    /// dashboard theme
    pub background: BackgroundVariant,
}

/// Consumer of dashboard snapshots
pub trait Display {
    /// Called by the receiver for each recognized frame, must not block
    fn show(&mut self, snapshot: DisplaySnapshot);
}

/// Lossy hand-off to a renderer on another thread
#[derive(Clone)]
pub struct SnapshotQueue {
    queue: Arc<ArrayQueue<DisplaySnapshot>>,
}

impl SnapshotQueue {
    /// Creates a queue holding at most [SNAPSHOT_BUFFER] snapshots
    pub fn new() -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(SNAPSHOT_BUFFER)),
        }
    }
    /// Drains the queue and returns the most recent snapshot
    pub fn latest(&self) -> Option<DisplaySnapshot> {
        let mut latest = None;
        while let Some(snapshot) = self.queue.pop() {
            latest = Some(snapshot);
        }
        latest
    }
}

impl Default for SnapshotQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SnapshotQueue {
    fn show(&mut self, snapshot: DisplaySnapshot) {
        self.queue.force_push(snapshot);
    }
}

/// Writes every snapshot to the log
#[derive(Debug, Default)]
pub struct LogDisplay;

impl Display for LogDisplay {
    fn show(&mut self, snapshot: DisplaySnapshot) {
        info!("{:?}", snapshot);
    }
}

/// Renders the dashboard into the terminal
pub struct TerminalDisplay<W: Write> {
    out: W,
}

impl<W: Write> TerminalDisplay<W> {
    /// Creates a renderer writing to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Redraws the whole dashboard
    pub fn render(&mut self, snapshot: &DisplaySnapshot) -> std::io::Result<()> {
        let (background, foreground) = if snapshot.background.is_light() {
            (Color::White, Color::Black)
        } else {
            (Color::Black, Color::White)
        };
        let layout = match snapshot.background {
            BackgroundVariant::KeyboardDark | BackgroundVariant::KeyboardLight => {
                "up/down: drive  left/right: indicate  enter: lights  rshift/tab: locks  esc: quit"
            }
            BackgroundVariant::GamepadDark | BackgroundVariant::GamepadLight => {
                "triggers: drive  shoulders: indicate  A: lights  B: locks  back: quit"
            }
        };
        let lamp = |lit: bool, symbol: &'static str| if lit { symbol } else { "  " };

        queue!(
            self.out,
            SetBackgroundColor(background),
            SetForegroundColor(foreground),
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0),
            Print("CANdo   -   A CAN BUS Simulator"),
            cursor::MoveTo(0, 2),
            Print(format!(
                "   {}      {:>4} km/h      {}",
                lamp(snapshot.indicator_left, "<-"),
                snapshot.speed,
                lamp(snapshot.indicator_right, "->"),
            )),
            cursor::MoveTo(0, 4),
            Print(format!(
                "   doors: {:<6}   lights: {}",
                if snapshot.doors_closed { "LOCKED" } else { "OPEN" },
                if snapshot.lights_on { "ON" } else { "OFF" },
            )),
            cursor::MoveTo(0, 6),
            Print(layout),
            ResetColor,
        )?;
        self.out.flush()
    }
}

impl<W: Write> Display for TerminalDisplay<W> {
    fn show(&mut self, snapshot: DisplaySnapshot) {
        if let Err(e) = self.render(&snapshot) {
            log::warn!("dashboard render failed: {}", e);
        }
    }
}
