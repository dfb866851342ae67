use crate::device_display::interface::{DeviceDisplay, DeviceDisplayEvent};
use std::error::Error;
use std::io::{self, BufRead};
use std::sync::mpsc::{channel, Receiver};
use std::thread;

const SETUP_HINT: &str = "start <model url> | quit";
const RUNNING_HINT: &str = "reset | quit";

/// Draws the screen as a text box on stdout and reads commands from stdin.
pub struct DeviceDisplayConsole {
    running: bool,
    label: String,
}

impl DeviceDisplayConsole {
    pub fn new() -> Self {
        Self {
            running: false,
            label: String::new(),
        }
    }

    fn render(&self) {
        if self.running {
            let label = if self.label.is_empty() {
                "..."
            } else {
                self.label.as_str()
            };
            draw_box(&["Running", label, RUNNING_HINT]);
        } else {
            draw_box(&["Setup", SETUP_HINT]);
        }
    }
}

fn draw_box(lines: &[&str]) {
    let width = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);

    println!("┌{}┐", "─".repeat(width + 2));
    for line in lines {
        let padding = width - line.chars().count();
        println!("│ {}{} │", line, " ".repeat(padding));
    }
    println!("└{}┘", "─".repeat(width + 2));
}

/// Parses one line typed by the user. A bare url is a start request.
pub fn parse_command(line: &str) -> Option<DeviceDisplayEvent> {
    let line = line.trim();
    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    match command.to_lowercase().as_str() {
        "start" if !argument.is_empty() => Some(DeviceDisplayEvent::StartRequested {
            model_url: argument.to_string(),
        }),
        "reset" | "back" => Some(DeviceDisplayEvent::ResetRequested),
        "quit" | "exit" => Some(DeviceDisplayEvent::QuitRequested),
        _ if command.starts_with("http://") || command.starts_with("https://") => {
            Some(DeviceDisplayEvent::StartRequested {
                model_url: command.to_string(),
            })
        }
        _ => None,
    }
}

impl DeviceDisplay for DeviceDisplayConsole {
    fn show_setup_mode(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.running = false;
        self.label.clear();
        self.render();
        Ok(())
    }

    fn show_running_mode(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.running = true;
        self.render();
        Ok(())
    }

    fn update_label(&mut self, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.label == text {
            return Ok(());
        }
        self.label = text.to_string();
        if self.running {
            self.render();
        }
        Ok(())
    }

    fn show_alert(&mut self, message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        draw_box(&["Alert", message]);
        Ok(())
    }

    fn events(&mut self) -> Receiver<DeviceDisplayEvent> {
        let (sender, receiver) = channel();

        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let Some(event) = parse_command(&line) else {
                    continue;
                };
                if sender.send(event).is_err() {
                    return;
                }
            }
            let _ = sender.send(DeviceDisplayEvent::QuitRequested);
        });

        receiver
    }
}
