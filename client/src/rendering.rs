use crate::game::GameSession;
use crate::world::ItemKind;
use macroquad::prelude::*;
use shared::{Direction, GRID_SIZE, PLAYER_MAX_HP};

pub const CELL_SIZE: f32 = 48.0;
pub const HUD_HEIGHT: f32 = 48.0;

pub fn canvas_size() -> f32 {
    GRID_SIZE as f32 * CELL_SIZE
}

#[derive(Debug, Clone)]
pub struct HudInfo {
    pub online: bool,
}

pub struct Renderer {
    cell: f32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer { cell: CELL_SIZE }
    }

    pub fn render(&self, session: &GameSession, hud: &HudInfo) {
        clear_background(Color::from_rgba(6, 16, 40, 255));

        self.draw_grid();
        self.draw_items(session);
        self.draw_enemies(session);
        self.draw_player(session);
        self.draw_hud(session, hud);
    }

    fn draw_grid(&self) {
        let size = canvas_size();
        let line = Color::from_rgba(8, 50, 67, 255);
        for i in 0..=GRID_SIZE {
            let offset = i as f32 * self.cell;
            draw_line(offset, 0.0, offset, size, 1.0, line);
            draw_line(0.0, offset, size, offset, 1.0, line);
        }
    }

    fn draw_items(&self, session: &GameSession) {
        let Some(zone) = session.world().zone(session.player().zone) else {
            return;
        };
        for item in &zone.items {
            let (cx, cy) = self.cell_center(item.x, item.y);
            match item.kind {
                ItemKind::Chest => {
                    draw_circle(cx, cy, self.cell / 2.0 - 6.0, Color::from_rgba(249, 115, 22, 255));
                    self.draw_glyph("C", cx, cy);
                }
            }
        }
    }

    fn draw_enemies(&self, session: &GameSession) {
        for enemy in session.visible_enemies() {
            let (cx, cy) = self.cell_center(enemy.x, enemy.y);
            draw_circle(cx, cy, self.cell / 2.0 - 6.0, Color::from_rgba(255, 107, 107, 255));
            self.draw_glyph("E", cx, cy);
        }
    }

    fn draw_player(&self, session: &GameSession) {
        let player = session.player();
        let (cx, cy) = self.cell_center(player.x, player.y);
        draw_circle(cx, cy, self.cell / 2.0 - 6.0, Color::from_rgba(96, 165, 250, 255));
        self.draw_glyph("P", cx, cy);

        // Facing marker: a dot offset a third of a cell toward the faced side.
        let offset = self.cell * 0.33;
        let (ox, oy) = match player.facing {
            Direction::Up => (0.0, -offset),
            Direction::Down => (0.0, offset),
            Direction::Left => (-offset, 0.0),
            Direction::Right => (offset, 0.0),
        };
        draw_circle(cx + ox, cy + oy, 5.0, WHITE);
    }

    fn draw_hud(&self, session: &GameSession, hud: &HudInfo) {
        let y = canvas_size() + 20.0;
        let text = format!(
            "HP {}/{}  Kills {}  Zone: {}",
            session.player().hp,
            PLAYER_MAX_HP,
            session.kills(),
            session.zone_name(),
        );
        draw_text(&text, 10.0, y, 20.0, WHITE);

        let (label, color) = if hud.online {
            ("online", GREEN)
        } else {
            ("offline", Color::from_rgba(136, 136, 136, 255))
        };
        draw_text(label, canvas_size() - 80.0, y, 20.0, color);
    }

    fn cell_center(&self, x: i32, y: i32) -> (f32, f32) {
        (grid_to_pixel(x, self.cell), grid_to_pixel(y, self.cell))
    }

    fn draw_glyph(&self, glyph: &str, cx: f32, cy: f32) {
        draw_text(glyph, cx - 5.0, cy + 5.0, 16.0, WHITE);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Center of a grid cell in pixels.
pub fn grid_to_pixel(coord: i32, cell: f32) -> f32 {
    coord as f32 * cell + cell / 2.0
}
