use std::thread;
use std::time::{Duration, Instant};

use rally_client::collaborators::{Collaborators, InputSource};
use rally_client::game::GameClient;
use rally_client::headless::{Autopilot, GltfAssetLoader, HeadlessAudio, HeadlessScene};
use rally_client::session::ClientSession;
use rally_core::world::WorldDefinition;
use rally_core::GLOBAL_CONFIG;
use tracing::{debug, info, warn};

// how many track samples ahead the autopilot aims
const AUTOPILOT_LOOKAHEAD: usize = 3;
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(5);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let world =
        WorldDefinition::load(&GLOBAL_CONFIG.world_path).expect("failed to load world file");

    let ip_addr = format!("{}:{}", GLOBAL_CONFIG.server_address, GLOBAL_CONFIG.port);
    let mut game_client = GameClient::connect(&ip_addr).expect("could not connect to relay");

    let mut session = ClientSession::new(
        &world,
        &GLOBAL_CONFIG,
        Collaborators {
            assets: Box::new(GltfAssetLoader),
            scene: Box::new(HeadlessScene::new()),
            audio: Box::new(HeadlessAudio),
        },
    );
    let mut input = Autopilot::new(session.track(), AUTOPILOT_LOOKAHEAD);
    session.join(&GLOBAL_CONFIG.player_name);

    let tick = GLOBAL_CONFIG.client_tick();
    let dt = tick.as_secs_f64();
    let mut last_progress_log = Instant::now();
    loop {
        let start_time = Instant::now();

        if let Err(err) = game_client.fetch_incoming_packets() {
            if game_client.is_closed() {
                warn!(%err, "lost connection to relay");
                break;
            }
            debug!(%err, "could not read from relay");
        }
        for packet in game_client.current_packets() {
            session.apply_packet(packet, start_time);
        }

        let inputs = input.snapshot(&session.local().transform);
        session.tick(start_time, dt, &inputs);

        if start_time.duration_since(last_progress_log) >= PROGRESS_LOG_INTERVAL {
            info!(
                progress = session.lap_progress(),
                score = session.local().score,
                "lap progress"
            );
            last_progress_log = start_time;
        }

        game_client.send_all(session.take_outgoing());
        if let Err(err) = game_client.sync_outgoing() {
            debug!(%err, "could not flush to relay");
        }

        // wait until client tick time has elapsed
        match tick.checked_sub(start_time.elapsed()) {
            Some(remaining_tick_duration) => thread::sleep(remaining_tick_duration),
            None => warn!(
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "client tick took longer than configured length"
            ),
        }
    }

    session.shutdown();
    info!(score = session.local().score, "session over");
}
