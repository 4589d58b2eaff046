//! Bounded log of commands issued by the script, shipped with each snapshot

use std::collections::VecDeque;
use std::fmt;

use crate::game::block::Cell;

/// Entries kept between two drains; older ones are dropped first
pub const ACTION_LOG_CAPACITY: usize = 32;

/// A successful script command
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Activate(Cell),
    Deactivate(Cell),
    Rotate { cell: Cell, degrees: f32 },
    Fire { cell: Cell, bullet: u32 },
    EnginePower { cell: Cell, fraction: f32 },
    ShieldIntensity { cell: Cell, level: u8 },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activate(cell) => write!(f, "activate {cell}"),
            Self::Deactivate(cell) => write!(f, "deactivate {cell}"),
            Self::Rotate { cell, degrees } => write!(f, "rotate {cell} to {degrees:.1}"),
            Self::Fire { cell, bullet } => write!(f, "fire {cell} bullet {bullet}"),
            Self::EnginePower { cell, fraction } => write!(f, "engine {cell} power {fraction:.2}"),
            Self::ShieldIntensity { cell, level } => write!(f, "shield {cell} intensity {level}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<Action>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(ACTION_LOG_CAPACITY),
        }
    }

    pub fn push(&mut self, action: Action) {
        if self.entries.len() == ACTION_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(action);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take all entries, oldest first
    pub fn drain(&mut self) -> Vec<Action> {
        self.entries.drain(..).collect()
    }

    /// Drain into the wire form
    pub fn drain_lines(&mut self) -> Vec<String> {
        self.entries.drain(..).map(|a| a.to_string()).collect()
    }
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_drops_oldest() {
        let mut log = ActionLog::new();
        for bullet in 0..(ACTION_LOG_CAPACITY as u32 + 3) {
            log.push(Action::Fire {
                cell: Cell::new(0, 0),
                bullet,
            });
        }
        let entries = log.drain();
        assert_eq!(entries.len(), ACTION_LOG_CAPACITY);
        assert_eq!(
            entries[0],
            Action::Fire {
                cell: Cell::new(0, 0),
                bullet: 3
            }
        );
        assert!(log.is_empty());
    }

    #[test]
    fn test_lines_are_readable() {
        let mut log = ActionLog::new();
        log.push(Action::Rotate {
            cell: Cell::new(1, 2),
            degrees: 45.0,
        });
        log.push(Action::Deactivate(Cell::new(3, 3)));
        assert_eq!(
            log.drain_lines(),
            vec!["rotate (1, 2) to 45.0".to_string(), "deactivate (3, 3)".to_string()]
        );
    }
}
