use clap::Parser;
use client::game::GameSession;
use client::input::{poll_commands, Command};
use client::rendering::{canvas_size, HudInfo, Renderer, HUD_HEIGHT};
use client::score::ScoreReporter;
use client::world::WorldMap;
use log::{info, warn};
use macroquad::prelude::*;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the group server
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Account name for score reporting
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Account password
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// Group to report scores to; without it the game runs offline
    #[arg(short = 'g', long)]
    group: Option<i64>,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "gridquest".to_owned(),
        window_width: canvas_size() as i32,
        window_height: (canvas_size() + HUD_HEIGHT) as i32,
        window_resizable: false,
        ..Default::default()
    }
}

/// Logs in when a full group context was given on the command line; any
/// failure degrades to offline play instead of aborting.
fn connect_reporter(args: &Args) -> Option<(ScoreReporter, i64)> {
    let (username, password, group_id) = match (&args.username, &args.password, args.group) {
        (Some(u), Some(p), Some(g)) => (u, p, g),
        _ => {
            info!("no group context given, playing offline");
            return None;
        }
    };

    let mut reporter = match ScoreReporter::new(&args.server) {
        Ok(reporter) => reporter,
        Err(e) => {
            warn!("could not set up score reporting: {}", e);
            return None;
        }
    };
    match reporter.login(username, password) {
        Ok(login) => {
            info!("reporting scores to group {} as {}", group_id, login.username);
            Some((reporter, group_id))
        }
        Err(e) => {
            warn!("login failed ({}), playing offline", e);
            None
        }
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Controls: WASD to move, arrows to turn, Enter/Space to attack, R to restart");

    let reporter = connect_reporter(&args);
    let hud = HudInfo {
        online: reporter.is_some(),
    };

    let world = Arc::new(WorldMap::standard());
    let mut session = GameSession::new(world);
    let renderer = Renderer::new();

    loop {
        for command in poll_commands() {
            match command {
                Command::Move(dir) => session.try_move(dir),
                Command::Face(dir) => session.face(dir),
                Command::Attack => session.attack(),
                Command::Restart => session.restart(),
            }
        }

        if let Some(defeat) = session.advance_frame() {
            info!(
                "defeated in {} with {} kills",
                defeat.zone_name, defeat.kills
            );
            if let Some((reporter, group_id)) = &reporter {
                reporter.report(*group_id, defeat.kills);
            }
        }

        renderer.render(&session, &hud);
        next_frame().await;
    }
}
