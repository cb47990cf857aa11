use super::{ControlSource, InputDriver, Intent};
use crate::error::InputError;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    ModifierKeyCode, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};
use log::{debug, warn};

/// Pedal rate of a pressed arrow key
pub const KEY_RATE: f64 = 0.5;

/// Keys the simulator reacts to
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Key {
    /// accelerate
    Up,
    /// brake
    Down,
    /// left indicator
    Left,
    /// right indicator
    Right,
    /// toggle head lights
    Enter,
    /// toggle door lock
    RightShift,
    /// stop the simulation
    Quit,
}

/// Translates key transitions into intents
/// Pedal rates and indicators stay active while their key is held
#[derive(Debug, Default)]
pub struct KeyboardMapper {
    accelerate: f64,
    brake: f64,
    left: bool,
    right: bool,
}

impl KeyboardMapper {
    /// Creates a mapper with nothing pressed
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the key transitions of one tick into an intent
    pub fn map(&mut self, events: &[(Key, bool)]) -> Intent {
        let mut intent = Intent::default();
        for (key, pressed) in events.iter().copied() {
            match (key, pressed) {
                (Key::Up, true) => {
                    self.accelerate = KEY_RATE;
                    self.brake = 0.0;
                }
                (Key::Down, true) => {
                    self.brake = KEY_RATE;
                    self.accelerate = 0.0;
                }
                (Key::Up, false) => self.accelerate = 0.0,
                (Key::Down, false) => self.brake = 0.0,
                (Key::Left, true) => self.left = true,
                (Key::Right, true) => self.right = true,
                (Key::Left, false) => {
                    self.left = false;
                    intent.left_released = true;
                }
                (Key::Right, false) => {
                    self.right = false;
                    intent.right_released = true;
                }
                (Key::Enter, true) => intent.toggle_lights = true,
                (Key::RightShift, true) => intent.toggle_lock = true,
                (Key::Quit, true) => intent.quit = true,
                _ => (),
            }
        }
        intent.accelerate = self.accelerate;
        intent.brake = self.brake;
        intent.left_indicator = self.left;
        intent.right_indicator = self.right;
        intent
    }
}

/// Maps a terminal key event, None for keys without a function
pub fn translate(event: &KeyEvent) -> Option<(Key, bool)> {
    let pressed = match event.kind {
        KeyEventKind::Press => true,
        KeyEventKind::Release => false,
        // held keys repeat, the press is already known
        KeyEventKind::Repeat => return None,
    };
    let key = match event.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Modifier(ModifierKeyCode::RightShift) | KeyCode::Tab => Key::RightShift,
        KeyCode::Esc | KeyCode::Char('q') => Key::Quit,
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Key::Quit,
        _ => return None,
    };
    Some((key, pressed))
}

/// Terminal setup for keyboard control.
/// Enables raw mode and, where the terminal supports it, key release reporting.
/// Both are undone on drop. Owned by the thread that also draws to stdout,
/// the input driver itself never writes to the terminal.
pub struct KeyboardSession {
    releases: bool,
}

impl KeyboardSession {
    /// Prepares the terminal
    pub fn start() -> Result<Self, InputError> {
        terminal::enable_raw_mode().map_err(InputError::Terminal)?;
        let releases = matches!(terminal::supports_keyboard_enhancement(), Ok(true));
        if releases {
            execute!(
                std::io::stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )
            .map_err(InputError::Terminal)?;
        } else {
            warn!("terminal does not report key releases, keys act as taps");
        }
        Ok(Self { releases })
    }

    /// Whether the terminal reports key releases
    pub fn releases(&self) -> bool {
        self.releases
    }
}

impl Drop for KeyboardSession {
    fn drop(&mut self) {
        if self.releases {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
    }
}

/// Keyboard input read from the controlling terminal.
/// Terminals reporting key releases give hold semantics, on all others every
/// press is released again on the following tick.
pub struct KeyboardDriver {
    mapper: KeyboardMapper,
    releases: bool,
    pending_release: Vec<Key>,
}

impl KeyboardDriver {
    /// Creates a driver, `releases` as reported by [KeyboardSession::releases]
    pub fn new(releases: bool) -> Self {
        Self {
            mapper: KeyboardMapper::new(),
            releases,
            pending_release: Vec::new(),
        }
    }
}

impl InputDriver for KeyboardDriver {
    fn kind(&self) -> ControlSource {
        ControlSource::Keyboard
    }

    fn poll(&mut self) -> Result<Intent, InputError> {
        let mut keys: Vec<(Key, bool)> = self
            .pending_release
            .drain(..)
            .map(|key| (key, false))
            .collect();
        while event::poll(std::time::Duration::ZERO).map_err(InputError::Terminal)? {
            if let Event::Key(key_event) = event::read().map_err(InputError::Terminal)? {
                if let Some((key, pressed)) = translate(&key_event) {
                    debug!("key {:?} pressed={}", key, pressed);
                    keys.push((key, pressed));
                    if pressed && !self.releases {
                        self.pending_release.push(key);
                    }
                }
            }
        }
        Ok(self.mapper.map(&keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::TerminalDisplay;
    use crossterm::event::KeyEventState;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn pedals_are_held() {
        let mut mapper = KeyboardMapper::new();
        let intent = mapper.map(&[(Key::Up, true)]);
        assert_eq!(intent.accelerate, KEY_RATE);
        assert_eq!(intent.brake, 0.0);
        // still held on the next tick
        assert_eq!(mapper.map(&[]).accelerate, KEY_RATE);
        // down overrides up
        let intent = mapper.map(&[(Key::Down, true)]);
        assert_eq!(intent.accelerate, 0.0);
        assert_eq!(intent.brake, KEY_RATE);
        let intent = mapper.map(&[(Key::Down, false)]);
        assert_eq!(intent.brake, 0.0);
    }

    #[test]
    fn indicators() {
        let mut mapper = KeyboardMapper::new();
        let intent = mapper.map(&[(Key::Left, true)]);
        assert!(intent.left_indicator);
        assert!(!intent.left_released);
        assert!(mapper.map(&[]).left_indicator);
        let intent = mapper.map(&[(Key::Left, false)]);
        assert!(!intent.left_indicator);
        assert!(intent.left_released);
        assert!(!mapper.map(&[]).left_released);
    }

    #[test]
    fn toggles_on_press_only() {
        let mut mapper = KeyboardMapper::new();
        let intent = mapper.map(&[(Key::Enter, true), (Key::RightShift, true)]);
        assert!(intent.toggle_lights);
        assert!(intent.toggle_lock);
        let intent = mapper.map(&[(Key::Enter, false), (Key::RightShift, false)]);
        assert!(!intent.toggle_lights);
        assert!(!intent.toggle_lock);
        assert!(mapper.map(&[(Key::Quit, true)]).quit);
    }

    #[test]
    fn terminal_keys() {
        let event = |code, kind| KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        };
        assert_eq!(
            translate(&event(KeyCode::Up, KeyEventKind::Press)),
            Some((Key::Up, true))
        );
        assert_eq!(
            translate(&event(KeyCode::Left, KeyEventKind::Release)),
            Some((Key::Left, false))
        );
        assert_eq!(translate(&event(KeyCode::Up, KeyEventKind::Repeat)), None);
        assert_eq!(
            translate(&event(
                KeyCode::Modifier(ModifierKeyCode::RightShift),
                KeyEventKind::Press
            )),
            Some((Key::RightShift, true))
        );
        assert_eq!(translate(&event(KeyCode::Char('x'), KeyEventKind::Press)), None);
        let ctrl_c = KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        assert_eq!(translate(&ctrl_c), Some((Key::Quit, true)));
    }

    #[test]
    fn driver_leaves_stdout_to_the_dashboard() {
        // holds stdout until the end of the test
        let _dashboard = TerminalDisplay::new(std::io::stdout().lock());
        let (done, finished) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let driver = KeyboardDriver::new(true);
            assert_eq!(driver.kind(), ControlSource::Keyboard);
            drop(driver);
            let _ = done.send(());
        });
        assert!(finished.recv_timeout(Duration::from_secs(1)).is_ok());
        handle.join().unwrap();
    }
}
