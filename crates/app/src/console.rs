use std::io::{self, BufRead, Write};

use doubleclock_core::{BuzzerOutput, ClockId, DisplayDriver, EventSender, InputEvent, InputSource};

pub const HELP: &str = "keys: p=push u/d/l/r=up/down/left/right s=start </>=slider q=quit";

/// Prints both displays on one status line whenever their content changes.
#[derive(Debug)]
pub struct ConsoleDisplay {
    text: [String; 2],
    brightness: [u8; 2],
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self {
            text: [String::new(), String::new()],
            brightness: [0; 2],
        }
    }
}

impl ConsoleDisplay {
    fn print(&self) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "[{}]  [{}]", self.text[0], self.text[1]);
    }
}

fn with_colon(text: &str, colon: bool) -> String {
    let (minutes, seconds) = text.split_at(text.len().min(2));
    let separator = if colon { ':' } else { ' ' };
    format!("{minutes}{separator}{seconds}")
}

impl DisplayDriver for ConsoleDisplay {
    fn set_brightness(&mut self, clock: ClockId, level: u8) {
        let slot = &mut self.brightness[clock.index()];
        if *slot != level {
            tracing::debug!(?clock, level, "brightness");
            *slot = level;
        }
    }

    fn show_digits(&mut self, clock: ClockId, text: &str, colon: bool) {
        let rendered = with_colon(text, colon);
        if self.text[clock.index()] != rendered {
            self.text[clock.index()] = rendered;
            self.print();
        }
    }
}

/// Rings the terminal bell whenever the buzzer switches on.
#[derive(Debug, Default)]
pub struct ConsoleBuzzer {
    on: bool,
}

impl BuzzerOutput for ConsoleBuzzer {
    fn set_on(&mut self, on: bool) {
        if self.on == on {
            return;
        }
        self.on = on;
        tracing::debug!(on, "buzzer");
        if on {
            print!("\x07");
            let _ = io::stdout().flush();
        }
    }
}

/// Reads one command per line from stdin.
#[derive(Debug)]
pub struct StdinInput {
    slider_high: bool,
}

impl StdinInput {
    /// Input whose slider reads `slider_high` for the whole session.
    pub fn new(slider_high: bool) -> Self {
        Self { slider_high }
    }

    /// Forwards commands until `q` or end of input.
    pub fn pump(&self, sender: &EventSender) -> doubleclock_core::Result<()> {
        for line in io::stdin().lock().lines() {
            let line = line?;
            let command = line.trim();
            if command == "q" {
                break;
            }
            match parse_command(command) {
                Some(event) => sender.send(event)?,
                None if command.is_empty() => {}
                None => tracing::warn!(command, "unknown command; {HELP}"),
            }
        }
        Ok(())
    }
}

impl InputSource for StdinInput {
    fn slider_level(&self) -> bool {
        self.slider_high
    }
}

fn parse_command(command: &str) -> Option<InputEvent> {
    let event = match command {
        "p" => InputEvent::Push,
        "u" => InputEvent::Up,
        "d" => InputEvent::Down,
        "l" => InputEvent::Left,
        "r" => InputEvent::Right,
        "s" => InputEvent::Start,
        "<" => InputEvent::SliderChanged(false),
        ">" => InputEvent::SliderChanged(true),
        _ => return None,
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_command("p"), Some(InputEvent::Push));
        assert_eq!(parse_command(">"), Some(InputEvent::SliderChanged(true)));
        assert_eq!(parse_command("x"), None);
    }

    #[test]
    fn colon_is_inserted_between_minutes_and_seconds() {
        assert_eq!(with_colon("1234", true), "12:34");
        assert_eq!(with_colon("    ", false), "     ");
    }

    #[test]
    fn display_only_records_changes() {
        let mut display = ConsoleDisplay::default();
        display.show_digits(ClockId::Right, "0005", true);
        display.show_digits(ClockId::Right, "0005", true);
        assert_eq!(display.text[1], "00:05");
        assert_eq!(display.text[0], "");
    }
}
