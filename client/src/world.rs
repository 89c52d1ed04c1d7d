//! Static zone graph: zones are nodes, directional exits are edges.
//!
//! The map is built once at startup and never mutated; game sessions share it
//! behind an `Arc` and resolve zone ids against it on every transition.

use shared::Direction;
use std::collections::HashMap;

pub type ZoneId = &'static str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Chest,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub x: i32,
    pub y: i32,
    pub kind: ItemKind,
}

/// Directed edge out of a zone: walking off the grid edge in `dir` lands the
/// player in zone `to` at coordinate `dest`.
#[derive(Debug, Clone)]
pub struct Connection {
    pub dir: Direction,
    pub to: ZoneId,
    pub dest: (i32, i32),
}

#[derive(Debug, Clone)]
pub struct Zone {
    pub name: &'static str,
    pub spawn: (i32, i32),
    pub connections: Vec<Connection>,
    pub items: Vec<Item>,
    pub enemy_count: usize,
}

#[derive(Debug, Clone)]
pub struct WorldMap {
    zones: HashMap<ZoneId, Zone>,
    start: ZoneId,
}

impl WorldMap {
    pub fn new(zones: HashMap<ZoneId, Zone>, start: ZoneId) -> Self {
        Self { zones, start }
    }

    /// The four-zone overworld: forest in the middle, castle to the east,
    /// cave below the forest, dungeon below the castle.
    pub fn standard() -> Self {
        let mut zones: HashMap<ZoneId, Zone> = HashMap::new();
        zones.insert(
            "forest",
            Zone {
                name: "Forest",
                spawn: (4, 4),
                connections: vec![
                    Connection {
                        dir: Direction::Right,
                        to: "castle",
                        dest: (1, 4),
                    },
                    Connection {
                        dir: Direction::Down,
                        to: "cave",
                        dest: (4, 1),
                    },
                ],
                items: vec![Item {
                    x: 7,
                    y: 7,
                    kind: ItemKind::Chest,
                }],
                enemy_count: 3,
            },
        );
        zones.insert(
            "castle",
            Zone {
                name: "Castle",
                spawn: (7, 4),
                connections: vec![
                    Connection {
                        dir: Direction::Left,
                        to: "forest",
                        dest: (7, 4),
                    },
                    Connection {
                        dir: Direction::Down,
                        to: "dungeon",
                        dest: (4, 1),
                    },
                ],
                items: vec![Item {
                    x: 3,
                    y: 3,
                    kind: ItemKind::Chest,
                }],
                enemy_count: 2,
            },
        );
        zones.insert(
            "cave",
            Zone {
                name: "Cave",
                spawn: (4, 7),
                connections: vec![Connection {
                    dir: Direction::Up,
                    to: "forest",
                    dest: (4, 7),
                }],
                items: vec![Item {
                    x: 2,
                    y: 4,
                    kind: ItemKind::Chest,
                }],
                enemy_count: 3,
            },
        );
        zones.insert(
            "dungeon",
            Zone {
                name: "Dungeon",
                spawn: (4, 7),
                connections: vec![Connection {
                    dir: Direction::Up,
                    to: "castle",
                    dest: (4, 7),
                }],
                items: Vec::new(),
                enemy_count: 4,
            },
        );

        Self::new(zones, "forest")
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id)
    }

    pub fn start_zone(&self) -> ZoneId {
        self.start
    }

    /// Connection leaving `from` in direction `dir`, if the zone has one.
    pub fn exit(&self, from: ZoneId, dir: Direction) -> Option<&Connection> {
        self.zones
            .get(from)?
            .connections
            .iter()
            .find(|c| c.dir == dir)
    }
}
