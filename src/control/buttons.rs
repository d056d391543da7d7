// src/control/buttons.rs - Four-button navigation input
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Select,
    Back,
}

impl Button {
    /// Scan order when several buttons are held.
    pub const ALL: [Button; 4] = [Button::Up, Button::Down, Button::Select, Button::Back];

    fn index(self) -> usize {
        match self {
            Button::Up => 0,
            Button::Down => 1,
            Button::Select => 2,
            Button::Back => 3,
        }
    }
}

/// Source of discrete button presses. Non-blocking.
pub trait ButtonInput: Send {
    fn read_pressed_button(&mut self) -> Option<Button>;
}

/// Raw button levels, e.g. GPIO inputs with pull-ups.
pub trait ButtonPins: Send {
    fn is_down(&mut self, button: Button) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
struct ButtonState {
    was_down: bool,
    last_press: Option<Instant>,
}

/// Turns pin levels into presses: a press fires on the released-to-held edge
/// and no more often than `min_interval` per button.
pub struct DebouncedButtons<P: ButtonPins> {
    pins: P,
    min_interval: Duration,
    state: [ButtonState; 4],
}

impl<P: ButtonPins> DebouncedButtons<P> {
    pub fn new(pins: P, min_interval: Duration) -> Self {
        Self { pins, min_interval, state: [ButtonState::default(); 4] }
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }
}

impl<P: ButtonPins> ButtonInput for DebouncedButtons<P> {
    fn read_pressed_button(&mut self) -> Option<Button> {
        for button in Button::ALL {
            let down = self.pins.is_down(button);
            let state = &mut self.state[button.index()];
            let edge = down && !state.was_down;
            state.was_down = down;
            if !edge {
                continue;
            }
            let settled = state.last_press.is_none_or(|t| t.elapsed() >= self.min_interval);
            if settled {
                state.last_press = Some(Instant::now());
                return Some(button);
            }
        }
        None
    }
}

/// Presses delivered over a channel, typically from the terminal.
pub struct KeyboardButtons {
    rx: mpsc::UnboundedReceiver<Button>,
    min_interval: Duration,
    last_press: [Option<Instant>; 4],
}

impl KeyboardButtons {
    pub fn channel() -> (mpsc::UnboundedSender<Button>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx, min_interval: Duration::ZERO, last_press: [None; 4] })
    }

    /// Drop repeats of the same button that arrive sooner than `interval`.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Read keys from stdin on a background task: `w`/`k` up, `s`/`j` down,
    /// empty line or `e` select, `q`/`b` back.
    pub fn spawn_stdin() -> Self {
        let (tx, buttons) = Self::channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(button) = parse_key(&line) {
                            if tx.send(button).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Keyboard input stopped: {}", e);
                        break;
                    }
                }
            }
        });
        buttons
    }
}

fn parse_key(line: &str) -> Option<Button> {
    match line.trim().to_ascii_lowercase().as_str() {
        "w" | "k" | "up" => Some(Button::Up),
        "s" | "j" | "down" => Some(Button::Down),
        "" | "e" | "select" => Some(Button::Select),
        "q" | "b" | "back" => Some(Button::Back),
        _ => None,
    }
}

impl ButtonInput for KeyboardButtons {
    fn read_pressed_button(&mut self) -> Option<Button> {
        while let Ok(button) = self.rx.try_recv() {
            let last = &mut self.last_press[button.index()];
            if last.is_some_and(|t| t.elapsed() < self.min_interval) {
                tracing::trace!("Dropping repeated {:?}", button);
                continue;
            }
            *last = Some(Instant::now());
            return Some(button);
        }
        None
    }
}
