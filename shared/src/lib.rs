use serde::{Deserialize, Serialize};

pub const GRID_SIZE: i32 = 9;
pub const PLAYER_MAX_HP: i32 = 10;
pub const ENEMY_HP: i32 = 30;
pub const ATTACK_DAMAGE: i32 = 30;
pub const HEAL_PER_KILL: i32 = 1;
pub const ENEMY_MOVE_CHANCE: f64 = 0.15;
pub const ENEMY_TICK_FRAMES: u64 = 20;
pub const SPAWN_EXCLUSION_RADIUS: i32 = 2;
pub const SPAWN_MAX_ATTEMPTS: u32 = 100;

/// Fixed server-side session lifetime in seconds.
pub const SESSION_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Grid offset for one step in this direction. Y grows downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }
}

/// Returns true if (x, y) lies on the playfield grid.
pub fn in_bounds(x: i32, y: i32) -> bool {
    x >= 0 && x < GRID_SIZE && y >= 0 && y < GRID_SIZE
}

// Request/response bodies for the HTTP API. Both the server handlers and the
// native client speak these types; the score body is parsed untyped on the
// server so malformed kill counts can be rejected with a client error instead
// of a framework rejection.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub ok: bool,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupResponse {
    pub ok: bool,
    pub group_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberView {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub status: String,
    pub best_kills: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupView {
    pub group_id: i64,
    pub name: String,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub ok: bool,
    pub previous: i64,
    pub updated: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_deltas() {
        assert_eq!(Direction::Up.delta(), (0, -1));
        assert_eq!(Direction::Down.delta(), (0, 1));
        assert_eq!(Direction::Left.delta(), (-1, 0));
        assert_eq!(Direction::Right.delta(), (1, 0));
    }

    #[test]
    fn test_deltas_are_unit_steps() {
        for dir in Direction::all() {
            let (dx, dy) = dir.delta();
            assert_eq!(dx.abs() + dy.abs(), 1);
        }
    }

    #[test]
    fn test_bounds_check() {
        assert!(in_bounds(0, 0));
        assert!(in_bounds(GRID_SIZE - 1, GRID_SIZE - 1));
        assert!(!in_bounds(-1, 4));
        assert!(!in_bounds(4, GRID_SIZE));
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        let json = serde_json::to_string(&Direction::Left).unwrap();
        assert_eq!(json, "\"left\"");
        let back: Direction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Direction::Left);
    }

    #[test]
    fn test_score_outcome_roundtrip() {
        let outcome = ScoreOutcome {
            ok: true,
            previous: 5,
            updated: 8,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let back: ScoreOutcome = serde_json::from_str(&json).unwrap();
        assert!(back.ok);
        assert_eq!(back.previous, 5);
        assert_eq!(back.updated, 8);
    }

    #[test]
    fn test_constants_are_consistent() {
        assert!(SPAWN_EXCLUSION_RADIUS < GRID_SIZE);
        assert!(ATTACK_DAMAGE >= ENEMY_HP);
        assert!(HEAL_PER_KILL <= PLAYER_MAX_HP);
        assert!(ENEMY_MOVE_CHANCE > 0.0 && ENEMY_MOVE_CHANCE < 1.0);
    }
}
