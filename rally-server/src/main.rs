use rally_core::world::WorldDefinition;
use rally_core::GLOBAL_CONFIG;

mod registry;
mod relay;
mod server;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let world = WorldDefinition::load(&GLOBAL_CONFIG.world_path).expect("failed to load world file");

    // kick off the relay loop
    server::RelayServer::new(&GLOBAL_CONFIG, &world)
        .expect("could not bind to configured relay address")
        .start_loop();
}
