//! MUD Game Server
//!
//! Runs the world tick in the background and plays one character from the
//! console. Narration is delivered through a channel sink.

use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use mud_server::commands::CommandRegistry;
use mud_server::config::{ServerConfig, CONFIG_FILE};
use mud_server::dice::GameRng;
use mud_server::entities::EntityId;
use mud_server::events::ChannelSink;
use mud_server::npc::{MaintenanceDroneFactory, SecurityBotFactory, StreetThugFactory};
use mud_server::persistence::EmptyProvider;
use mud_server::tick::TickScheduler;
use mud_server::world::{build_default_map, NpcSpawner, SpawnableNpc, World};
use mud_shared::{CharacterClass, EventKind, GameEvent, Race};

const WELCOME: &str = "Welcome to the Neon Spaceport.\n\
    create <name> <race> <class> - Make a new character (races: Human, Draconian, Synth; \
    classes: Soldier, Hacker, Medic, Smuggler)\n\
    login <name> - Play an existing character\n\
    quit - Leave the game (or shut down when not playing)";

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting MUD Server...");
    let config = ServerConfig::load_or_default(Path::new(CONFIG_FILE));

    let map = match build_default_map() {
        Ok(map) => map,
        Err(e) => {
            error!("Failed to build world: {}", e);
            return;
        }
    };

    let (sink, events) = ChannelSink::channel(config.event_buffer);
    let mut world = World::new(map, Arc::new(sink));
    if let Some(seed) = config.rng_seed {
        info!("Using fixed dice seed {}", seed);
        world = world.with_dice(Box::new(GameRng::new(seed)));
    }
    if !config.starter_kit {
        world = world.with_item_provider(Arc::new(EmptyProvider));
    }
    let world = Arc::new(world);

    let spawner = Arc::new(NpcSpawner::with_check_interval(world.clone(), config.spawn_check_interval()));
    let species: [Box<dyn SpawnableNpc>; 3] = [
        Box::new(SecurityBotFactory),
        Box::new(StreetThugFactory),
        Box::new(MaintenanceDroneFactory),
    ];
    for factory in species {
        if let Err(e) = spawner.register_npc_type(factory) {
            error!("Failed to register NPC type: {}", e);
        }
    }
    info!("Registered {} NPC types", spawner.species_ids().len());
    if config.initial_spawn {
        spawner.spawn_initial_npcs();
    }

    // Background tick
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ticker = Arc::new(TickScheduler::with_period(spawner.clone(), config.tick_interval()));
    let tick_task = {
        let ticker = ticker.clone();
        tokio::spawn(async move { ticker.run(shutdown_rx).await })
    };

    // Narration delivery
    let (session_tx, session_rx) = watch::channel::<Option<EntityId>>(None);
    let printer = tokio::spawn(deliver_events(events, world.clone(), session_rx));

    info!("Server started successfully!");
    println!("{}", WELCOME);

    let registry = CommandRegistry::with_defaults();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut playing: Option<EntityId> = None;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match playing {
            Some(id) if line.eq_ignore_ascii_case("quit") => {
                if let Err(e) = world.leave_game(id) {
                    error!("Failed to leave game: {}", e);
                }
                playing = None;
                session_tx.send_replace(None);
                println!("Goodbye.\n{}", WELCOME);
            }
            Some(id) => {
                let result = registry.execute(&world, id, line);
                println!("{}", result.text());
            }
            None if line.eq_ignore_ascii_case("quit") => break,
            None => match login(&world, line) {
                Ok((id, description)) => {
                    playing = Some(id);
                    session_tx.send_replace(Some(id));
                    println!("{}", description);
                }
                Err(message) => println!("{}", message),
            },
        }
    }

    info!("Shutting down...");
    world.narrate_system("The server is shutting down.");
    if let Some(id) = playing {
        if let Err(e) = world.leave_game(id) {
            error!("Failed to leave game: {}", e);
        }
    }
    let _ = shutdown_tx.send(true);
    if let Err(e) = tick_task.await {
        error!("Tick task failed: {}", e);
    }
    spawner.clear_all_npcs();
    printer.abort();
    info!("Server stopped after {} ticks", ticker.tick_count());
}

/// Handle `create` and `login` before a character is in play
fn login(world: &World, line: &str) -> Result<(EntityId, String), String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [command, name, race, class] if command.eq_ignore_ascii_case("create") => {
            let race = Race::from_name(race).ok_or_else(|| format!("Unknown race: {}", race))?;
            let class = CharacterClass::from_name(class).ok_or_else(|| format!("Unknown class: {}", class))?;
            let id = world.create_character(name, race, class)?;
            let description = world.join_game(id)?;
            Ok((id, description))
        }
        [command, name] if command.eq_ignore_ascii_case("login") => {
            let id = world
                .find_player_by_name(name)
                .ok_or_else(|| format!("No character named {}", name))?;
            let description = world.join_game(id)?;
            Ok((id, description))
        }
        _ => Err(WELCOME.to_string()),
    }
}

/// Print narration the console player can perceive
async fn deliver_events(
    mut events: mpsc::Receiver<GameEvent>,
    world: Arc<World>,
    session: watch::Receiver<Option<EntityId>>,
) {
    while let Some(event) = events.recv().await {
        let player = *session.borrow();
        let Some(player) = player else {
            continue;
        };
        let visible = match event.kind {
            EventKind::System => true,
            EventKind::Player => event.target == player.to_string(),
            EventKind::Room => {
                let room = world
                    .with_actor(player, |a| a.as_player().and_then(|p| p.room_name.clone()))
                    .flatten();
                room.as_deref() == Some(event.target.as_str())
            }
        };
        if visible {
            println!("{}", event.message);
        }
    }
}
