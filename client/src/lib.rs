//! # Game Client Library
//!
//! Native client for the zone-based grid game. It owns the full game
//! simulation locally and only talks to the server for two things:
//! authenticating at startup and reporting the final kill count when a run
//! ends.
//!
//! ## Architecture Overview
//!
//! The game is single-threaded and cooperative: all state mutation happens on
//! discrete input commands or on the fixed enemy cadence inside the render
//! loop. Each frame runs to completion before the next one; the only
//! asynchronous boundary is the fire-and-forget score report, which captures
//! the kill count before the session resets.
//!
//! ## Module Organization
//!
//! ### World Module (`world`)
//! The immutable zone graph: zones, their spawn points, directional
//! connections to neighbouring zones, and static items. Built once and
//! shared between game sessions.
//!
//! ### Game Module (`game`)
//! The game state machine. Tracks player position, facing, hit points,
//! current zone, the enemy roster, and the kill counter; advances on input
//! commands and on the periodic enemy turn; handles zone transitions and the
//! defeat-and-reset cycle.
//!
//! ### Input Module (`input`)
//! Keyboard-to-command mapping, edge-triggered per frame.
//!
//! ### Rendering Module (`rendering`)
//! Grid, entity, and HUD drawing. Purely visual; never mutates game state.
//!
//! ### Score Module (`score`)
//! Login and score submission over HTTP with a bounded retry-or-drop policy.

pub mod game;
pub mod input;
pub mod rendering;
pub mod score;
pub mod world;
