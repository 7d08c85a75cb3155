//! User interaction events

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One interaction event fed to the monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPress,
    Pointer { x: f64, y: f64 },
    /// Start or stop the breathing routine
    ToggleBreathing,
}

impl InputEvent {
    /// Parse one line: `key`, `pointer <x> <y>` or `zen`.
    ///
    /// Pointer coordinates must be finite numbers.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        match parts.next()? {
            "key" | "k" => Some(InputEvent::KeyPress),
            "zen" => Some(InputEvent::ToggleBreathing),
            "pointer" | "p" => {
                let x: f64 = parts.next()?.parse().ok()?;
                let y: f64 = parts.next()?.parse().ok()?;
                (x.is_finite() && y.is_finite()).then_some(InputEvent::Pointer { x, y })
            }
            _ => None,
        }
    }
}

/// Forward events typed on stdin until it closes or the monitor goes away
pub fn spawn_stdin_reader(tx: mpsc::Sender<InputEvent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match InputEvent::parse(&line) {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    None => debug!("Ignoring input line {:?}", line),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(InputEvent::parse("key"), Some(InputEvent::KeyPress));
        assert_eq!(InputEvent::parse("  k "), Some(InputEvent::KeyPress));
        assert_eq!(
            InputEvent::parse("pointer 10 20.5"),
            Some(InputEvent::Pointer { x: 10.0, y: 20.5 })
        );
        assert_eq!(InputEvent::parse("zen"), Some(InputEvent::ToggleBreathing));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(InputEvent::parse(""), None);
        assert_eq!(InputEvent::parse("pointer 10"), None);
        assert_eq!(InputEvent::parse("pointer a b"), None);
        assert_eq!(InputEvent::parse("jump"), None);
    }

    #[test]
    fn test_parse_rejects_non_finite_pointer() {
        assert_eq!(InputEvent::parse("pointer nan 0"), None);
        assert_eq!(InputEvent::parse("pointer 0 inf"), None);
        assert_eq!(InputEvent::parse("p -infinity 3"), None);
        assert_eq!(InputEvent::parse("p NaN NaN"), None);
    }
}
