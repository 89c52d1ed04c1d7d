//! Keyboard mapping: WASD moves, arrow keys turn in place, Enter or Space
//! attacks, R restarts.

use macroquad::prelude::*;
use shared::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Face(Direction),
    Attack,
    Restart,
}

/// Maps a single key to its game command, if it has one.
pub fn key_command(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::W => Some(Command::Move(Direction::Up)),
        KeyCode::S => Some(Command::Move(Direction::Down)),
        KeyCode::A => Some(Command::Move(Direction::Left)),
        KeyCode::D => Some(Command::Move(Direction::Right)),
        KeyCode::Up => Some(Command::Face(Direction::Up)),
        KeyCode::Down => Some(Command::Face(Direction::Down)),
        KeyCode::Left => Some(Command::Face(Direction::Left)),
        KeyCode::Right => Some(Command::Face(Direction::Right)),
        KeyCode::Enter | KeyCode::Space => Some(Command::Attack),
        KeyCode::R => Some(Command::Restart),
        _ => None,
    }
}

const BOUND_KEYS: [KeyCode; 11] = [
    KeyCode::W,
    KeyCode::S,
    KeyCode::A,
    KeyCode::D,
    KeyCode::Up,
    KeyCode::Down,
    KeyCode::Left,
    KeyCode::Right,
    KeyCode::Enter,
    KeyCode::Space,
    KeyCode::R,
];

/// Collects the commands pressed this frame, edge-triggered so holding a key
/// produces a single step per press.
pub fn poll_commands() -> Vec<Command> {
    BOUND_KEYS
        .iter()
        .filter(|key| is_key_pressed(**key))
        .filter_map(|key| key_command(*key))
        .collect()
}
