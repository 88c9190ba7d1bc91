//! NPC population control.
//!
//! Each species registers a [`SpawnConfiguration`] and a factory. The spawner
//! keeps every species under its cap, places new instances in rooms whose
//! names match the species' patterns, and periodically rolls for respawns.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde::{Deserialize, Serialize};

use mud_shared::SPAWN_CHECK_INTERVAL_SECS;

use crate::dice::Dice;
use crate::entities::{next_entity_id, EntityId, Npc};
use crate::error::{ConfigError, SpawnError};

use super::{ActorRef, RoomId, World};

/// Respawn interval meaning "never respawn"
pub const NEVER_RESPAWN: i32 = -1;

/// Immutable spawn descriptor for one NPC species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfiguration {
    pub species_id: String,
    pub max_instances: u32,
    /// Seconds, or [`NEVER_RESPAWN`]
    pub respawn_secs: i32,
    /// Regular expressions matched against the whole room name
    pub room_patterns: Vec<String>,
    pub min_level: u32,
    pub max_level: u32,
    /// Probability in `[0, 1]` of a spawn attempt at each respawn check
    pub spawn_chance: f64,
}

impl SpawnConfiguration {
    /// Validate the descriptor and compile its room patterns
    fn compile(&self) -> Result<Vec<Regex>, ConfigError> {
        let species = self.species_id.trim();
        if species.is_empty() {
            return Err(ConfigError::MissingSpeciesId);
        }
        if self.room_patterns.is_empty() {
            return Err(ConfigError::NoRoomPatterns(species.to_string()));
        }
        if self.min_level > self.max_level {
            return Err(ConfigError::LevelRange {
                species: species.to_string(),
                min: self.min_level,
                max: self.max_level,
            });
        }
        if !(0.0..=1.0).contains(&self.spawn_chance) {
            return Err(ConfigError::SpawnChance {
                species: species.to_string(),
                chance: self.spawn_chance,
            });
        }
        if self.respawn_secs < NEVER_RESPAWN {
            return Err(ConfigError::RespawnInterval {
                species: species.to_string(),
                secs: self.respawn_secs,
            });
        }

        self.room_patterns
            .iter()
            .map(|pattern| {
                // Whole-name match
                Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| ConfigError::InvalidPattern {
                    species: species.to_string(),
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    pub fn respawns(&self) -> bool {
        self.respawn_secs != NEVER_RESPAWN
    }
}

/// A species that the spawner can create
pub trait SpawnableNpc: Send + Sync {
    fn spawn_configuration(&self) -> SpawnConfiguration;

    /// Build a fresh instance at `level`. The spawner places it.
    fn create_instance(&self, id: EntityId, level: u32, dice: &mut dyn Dice) -> Npc;
}

struct RegisteredSpecies {
    config: SpawnConfiguration,
    patterns: Vec<Regex>,
    factory: Box<dyn SpawnableNpc>,
}

impl RegisteredSpecies {
    fn matches_room(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }
}

/// Keeps NPC populations topped up
pub struct NpcSpawner {
    world: Arc<World>,
    species: RwLock<BTreeMap<String, Arc<RegisteredSpecies>>>,
    check_interval: Duration,
    last_check: Mutex<Instant>,
    /// Serializes the cap check with the insert
    spawn_lock: Mutex<()>,
}

impl NpcSpawner {
    pub fn new(world: Arc<World>) -> Self {
        Self::with_check_interval(world, Duration::from_secs(SPAWN_CHECK_INTERVAL_SECS))
    }

    pub fn with_check_interval(world: Arc<World>, check_interval: Duration) -> Self {
        Self {
            world,
            species: RwLock::new(BTreeMap::new()),
            check_interval,
            last_check: Mutex::new(Instant::now()),
            spawn_lock: Mutex::new(()),
        }
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Register a species. Invalid descriptors are rejected and logged.
    pub fn register_npc_type(&self, factory: Box<dyn SpawnableNpc>) -> Result<(), ConfigError> {
        let config = factory.spawn_configuration();
        let patterns = config.compile().map_err(|e| {
            warn!("Rejected NPC species: {}", e);
            e
        })?;

        let mut species = self.species.write();
        if species.contains_key(&config.species_id) {
            warn!("NPC species {} registered twice", config.species_id);
            return Err(ConfigError::DuplicateSpecies(config.species_id));
        }
        info!("Registered NPC type: {}", config.species_id);
        species.insert(
            config.species_id.clone(),
            Arc::new(RegisteredSpecies {
                config,
                patterns,
                factory,
            }),
        );
        Ok(())
    }

    pub fn species_ids(&self) -> Vec<String> {
        self.species.read().keys().cloned().collect()
    }

    pub fn configuration(&self, species_id: &str) -> Option<SpawnConfiguration> {
        self.species.read().get(species_id).map(|s| s.config.clone())
    }

    fn registered(&self, species_id: &str) -> Option<Arc<RegisteredSpecies>> {
        self.species.read().get(species_id).cloned()
    }

    fn all_registered(&self) -> Vec<Arc<RegisteredSpecies>> {
        self.species.read().values().cloned().collect()
    }

    fn roll_level(&self, config: &SpawnConfiguration) -> u32 {
        let level = self.world.roll(|dice| dice.range(config.min_level as i32, config.max_level as i32));
        level.max(0) as u32
    }

    /// Populate the world at startup: a random count in `0..=max` per species.
    /// Returns how many NPCs were placed.
    pub fn spawn_initial_npcs(&self) -> usize {
        info!("Initializing NPC spawns...");
        let mut spawned = 0;

        for species in self.all_registered() {
            let config = &species.config;
            let count = self.world.roll(|dice| dice.range(0, config.max_instances as i32));
            debug!("Spawning {} {}(s)", count, config.species_id);

            for _ in 0..count {
                let level = self.roll_level(config);
                match self.spawn_npc(&config.species_id, level) {
                    Ok(_) => spawned += 1,
                    Err(e) => {
                        debug!("Initial spawn of {} stopped: {}", config.species_id, e);
                        break;
                    }
                }
            }
        }

        info!("Initial NPC spawning complete. Active NPCs: {}", self.world.npc_count());
        spawned
    }

    /// Create one instance of `species_id` at `level` and place it. Nothing is
    /// created or changed when any check fails.
    pub fn spawn_npc(&self, species_id: &str, level: u32) -> Result<EntityId, SpawnError> {
        let species = self
            .registered(species_id)
            .ok_or_else(|| SpawnError::UnknownSpecies(species_id.to_string()))?;
        let config = &species.config;

        if level < config.min_level || level > config.max_level {
            warn!("Invalid level {} for {}", level, species_id);
            return Err(SpawnError::LevelOutOfRange {
                species: species_id.to_string(),
                level,
                min: config.min_level,
                max: config.max_level,
            });
        }

        let _guard = self.spawn_lock.lock();

        if self.world.npc_count_by_species(species_id) >= config.max_instances as usize {
            return Err(SpawnError::AtCapacity {
                species: species_id.to_string(),
                max: config.max_instances,
            });
        }

        let room = self
            .find_spawn_room(&species)
            .ok_or_else(|| SpawnError::NoSpawnRoom(species_id.to_string()))?;

        let id = next_entity_id();
        let created = panic::catch_unwind(AssertUnwindSafe(|| {
            self.world.roll(|dice| species.factory.create_instance(id, level, dice))
        }));
        let mut npc = match created {
            Ok(npc) => npc,
            Err(_) => {
                error!("Factory for {} panicked", species_id);
                return Err(SpawnError::FactoryPanicked(species_id.to_string()));
            }
        };
        npc.body.species = config.species_id.clone();

        let name = npc.name().to_string();
        let id = self
            .world
            .insert_npc(npc, room)
            .map_err(|_| SpawnError::NoSpawnRoom(species_id.to_string()))?;

        info!(
            "Spawned {} (Level {}) in {}",
            name,
            level,
            self.world.room_name(room).unwrap_or_default()
        );
        Ok(id)
    }

    /// Pick a matching room, preferring rooms with no NPCs in them
    fn find_spawn_room(&self, species: &RegisteredSpecies) -> Option<RoomId> {
        let mut candidates: Vec<(RoomId, bool)> = self
            .world
            .map
            .rooms()
            .filter(|room| species.matches_room(&room.name))
            .map(|room| (room.id, room.has_npcs()))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_unstable();

        let empty: Vec<RoomId> = candidates.iter().filter(|(_, busy)| !busy).map(|(id, _)| *id).collect();
        let pool: Vec<RoomId> = if empty.is_empty() {
            candidates.iter().map(|(id, _)| *id).collect()
        } else {
            empty
        };
        let pick = self.world.roll(|dice| dice.index(pool.len()));
        pool.get(pick).copied()
    }

    /// Respawn check, gated to the spawner's own interval
    pub fn handle_respawns(&self) -> usize {
        self.handle_respawns_at(Instant::now())
    }

    /// Respawn check at `now`. For each species under its cap, roll its spawn
    /// chance and try one spawn. Returns how many NPCs were placed.
    pub fn handle_respawns_at(&self, now: Instant) -> usize {
        {
            let mut last = self.last_check.lock();
            if now.saturating_duration_since(*last) < self.check_interval {
                return 0;
            }
            *last = now;
        }

        let mut spawned = 0;
        for species in self.all_registered() {
            let config = &species.config;
            if !config.respawns() {
                continue;
            }

            let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
                if self.world.npc_count_by_species(&config.species_id) >= config.max_instances as usize {
                    return Ok(None);
                }
                if !self.world.roll(|dice| dice.chance(config.spawn_chance)) {
                    return Ok(None);
                }
                let level = self.roll_level(config);
                self.spawn_npc(&config.species_id, level).map(Some)
            }));

            match attempt {
                Ok(Ok(Some(id))) => {
                    debug!("Respawned {} as {}", config.species_id, id);
                    spawned += 1;
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!("Error handling respawn for {}: {}", config.species_id, e),
                Err(_) => error!("Respawn for {} panicked", config.species_id),
            }
        }
        spawned
    }

    /// Detach an NPC from its room and the active index
    pub fn remove_npc(&self, id: EntityId) -> bool {
        match self.world.remove_npc(id) {
            Some(_) => {
                info!("Removed NPC {}", id);
                true
            }
            None => false,
        }
    }

    pub fn active_npcs(&self) -> Vec<ActorRef> {
        self.world.active_npcs()
    }

    pub fn npc(&self, id: EntityId) -> Option<ActorRef> {
        self.world.npc(id)
    }

    pub fn npcs_by_species(&self, species_id: &str) -> Vec<EntityId> {
        self.world.npcs_by_species(species_id)
    }

    pub fn count_by_species(&self, species_id: &str) -> usize {
        self.world.npc_count_by_species(species_id)
    }

    /// Remove every NPC (shutdown or reset)
    pub fn clear_all_npcs(&self) -> usize {
        let removed = self.world.clear_npcs();
        info!("Cleared {} NPCs", removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::FixedDice;
    use crate::entities::{CombatEntity, NpcBody, NpcType};
    use crate::npc::{MaintenanceDroneFactory, NpcAction, NpcBehavior, TickContext};
    use crate::world::tests::test_world;
    use mud_shared::Attributes;

    struct Idle;

    impl NpcBehavior for Idle {
        fn on_tick(&mut self, _body: &mut NpcBody, _ctx: &TickContext<'_>, _dice: &mut dyn Dice) -> Vec<NpcAction> {
            Vec::new()
        }
    }

    struct Dummy {
        config: SpawnConfiguration,
    }

    impl Dummy {
        fn boxed(max_instances: u32, patterns: &[&str]) -> Box<Self> {
            Box::new(Self {
                config: SpawnConfiguration {
                    species_id: "dummy".into(),
                    max_instances,
                    respawn_secs: 30,
                    room_patterns: patterns.iter().map(|p| p.to_string()).collect(),
                    min_level: 1,
                    max_level: 5,
                    spawn_chance: 1.0,
                },
            })
        }
    }

    impl SpawnableNpc for Dummy {
        fn spawn_configuration(&self) -> SpawnConfiguration {
            self.config.clone()
        }

        fn create_instance(&self, id: EntityId, level: u32, _dice: &mut dyn Dice) -> Npc {
            let entity = CombatEntity::new(id, "Dummy", level, 10, Attributes::new());
            Npc::new(NpcBody::new(entity, "dummy", "A training dummy.", NpcType::Enemy, false), Box::new(Idle))
        }
    }

    struct Exploding;

    impl SpawnableNpc for Exploding {
        fn spawn_configuration(&self) -> SpawnConfiguration {
            SpawnConfiguration {
                species_id: "exploding".into(),
                max_instances: 1,
                respawn_secs: 10,
                room_patterns: vec![".*".into()],
                min_level: 1,
                max_level: 1,
                spawn_chance: 1.0,
            }
        }

        fn create_instance(&self, _id: EntityId, _level: u32, _dice: &mut dyn Dice) -> Npc {
            panic!("factory blew up");
        }
    }

    fn spawner() -> NpcSpawner {
        let (world, _, _, _) = test_world();
        NpcSpawner::with_check_interval(Arc::new(world), Duration::from_secs(60))
    }

    #[test]
    fn test_cap_is_never_exceeded() {
        let spawner = spawner();
        spawner.register_npc_type(Dummy::boxed(3, &[".*Hall"])).unwrap();

        for _ in 0..3 {
            spawner.spawn_npc("dummy", 2).unwrap();
        }
        assert_eq!(spawner.count_by_species("dummy"), 3);

        for _ in 0..5 {
            assert_eq!(
                spawner.spawn_npc("dummy", 2),
                Err(SpawnError::AtCapacity { species: "dummy".into(), max: 3 })
            );
        }
        assert_eq!(spawner.count_by_species("dummy"), 3);
        assert_eq!(spawner.world().npc_count(), 3);
    }

    #[test]
    fn test_concurrent_spawns_respect_cap() {
        let spawner = spawner();
        spawner.register_npc_type(Dummy::boxed(3, &[".*Hall"])).unwrap();

        let spawned: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let spawner = &spawner;
                    s.spawn(move || (0..5).filter(|_| spawner.spawn_npc("dummy", 2).is_ok()).count())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(spawned, 3);
        assert_eq!(spawner.count_by_species("dummy"), 3);
        assert_eq!(spawner.world().npc_count(), 3);
    }

    #[test]
    fn test_out_of_range_level_changes_nothing() {
        let spawner = spawner();
        spawner.register_npc_type(Dummy::boxed(3, &[".*Hall"])).unwrap();

        assert!(matches!(spawner.spawn_npc("dummy", 0), Err(SpawnError::LevelOutOfRange { .. })));
        assert!(matches!(spawner.spawn_npc("dummy", 6), Err(SpawnError::LevelOutOfRange { .. })));
        assert_eq!(spawner.world().npc_count(), 0);
        assert!(spawner.world().map.rooms().all(|room| !room.has_npcs()));
        assert_eq!(
            spawner.spawn_npc("ghost", 1),
            Err(SpawnError::UnknownSpecies("ghost".into()))
        );
    }

    #[test]
    fn test_patterns_match_the_whole_name() {
        let spawner = spawner();
        spawner.register_npc_type(Dummy::boxed(3, &["Hall"])).unwrap();
        assert_eq!(spawner.spawn_npc("dummy", 1), Err(SpawnError::NoSpawnRoom("dummy".into())));

        let spawner = self::spawner();
        spawner.register_npc_type(Dummy::boxed(3, &["West.*"])).unwrap();
        let id = spawner.spawn_npc("dummy", 1).unwrap();
        let room = spawner.world().with_actor(id, |a| a.entity().room).flatten().unwrap();
        assert_eq!(spawner.world().room_name(room).as_deref(), Some("West Hall"));
    }

    #[test]
    fn test_prefers_rooms_without_npcs() {
        let spawner = spawner();
        spawner.register_npc_type(Dummy::boxed(2, &[".*Hall"])).unwrap();
        spawner.spawn_npc("dummy", 1).unwrap();
        spawner.spawn_npc("dummy", 1).unwrap();
        assert!(spawner.world().map.rooms().all(|room| room.npcs().len() == 1));
    }

    #[test]
    fn test_invalid_configurations_are_rejected() {
        let spawner = spawner();

        let mut bad = Dummy::boxed(3, &["(unclosed"]);
        assert!(matches!(
            spawner.register_npc_type(bad),
            Err(ConfigError::InvalidPattern { .. })
        ));

        bad = Dummy::boxed(3, &[]);
        assert!(matches!(spawner.register_npc_type(bad), Err(ConfigError::NoRoomPatterns(_))));

        bad = Dummy::boxed(3, &[".*"]);
        bad.config.min_level = 9;
        assert!(matches!(spawner.register_npc_type(bad), Err(ConfigError::LevelRange { .. })));

        bad = Dummy::boxed(3, &[".*"]);
        bad.config.spawn_chance = 1.5;
        assert!(matches!(spawner.register_npc_type(bad), Err(ConfigError::SpawnChance { .. })));

        bad = Dummy::boxed(3, &[".*"]);
        bad.config.respawn_secs = -2;
        assert!(matches!(spawner.register_npc_type(bad), Err(ConfigError::RespawnInterval { .. })));

        bad = Dummy::boxed(3, &[".*"]);
        bad.config.species_id = " ".into();
        assert!(matches!(spawner.register_npc_type(bad), Err(ConfigError::MissingSpeciesId)));

        assert!(spawner.species_ids().is_empty());

        spawner.register_npc_type(Dummy::boxed(3, &[".*"])).unwrap();
        assert!(matches!(
            spawner.register_npc_type(Dummy::boxed(3, &[".*"])),
            Err(ConfigError::DuplicateSpecies(_))
        ));
    }

    #[test]
    fn test_respawns_are_gated_by_interval() {
        let spawner = spawner();
        spawner.register_npc_type(Dummy::boxed(2, &[".*Hall"])).unwrap();
        let start = *spawner.last_check.lock();

        assert_eq!(spawner.handle_respawns_at(start + Duration::from_secs(10)), 0);
        assert_eq!(spawner.world().npc_count(), 0);

        // Quiet dice never pass a chance roll
        assert_eq!(spawner.handle_respawns_at(start + Duration::from_secs(61)), 0);

        let (world, _, _, _) = test_world();
        let world = world.with_dice(Box::new(FixedDice::lucky()));
        let spawner = NpcSpawner::with_check_interval(Arc::new(world), Duration::from_secs(60));
        spawner.register_npc_type(Dummy::boxed(2, &[".*Hall"])).unwrap();
        let start = *spawner.last_check.lock();

        assert_eq!(spawner.handle_respawns_at(start + Duration::from_secs(60)), 1);
        assert_eq!(spawner.handle_respawns_at(start + Duration::from_secs(90)), 0);
        assert_eq!(spawner.handle_respawns_at(start + Duration::from_secs(120)), 1);
        assert_eq!(spawner.handle_respawns_at(start + Duration::from_secs(180)), 0);
        assert_eq!(spawner.count_by_species("dummy"), 2);
    }

    #[test]
    fn test_never_respawning_species_is_skipped() {
        let (world, _, _, _) = test_world();
        let world = world.with_dice(Box::new(FixedDice::lucky()));
        let spawner = NpcSpawner::with_check_interval(Arc::new(world), Duration::ZERO);
        let mut drone = Dummy::boxed(2, &[".*Hall"]);
        drone.config.respawn_secs = NEVER_RESPAWN;
        spawner.register_npc_type(drone).unwrap();

        assert_eq!(spawner.handle_respawns(), 0);
        assert_eq!(spawner.world().npc_count(), 0);
        assert!(!MaintenanceDroneFactory.spawn_configuration().respawns());
    }

    #[test]
    fn test_panicking_factory_is_isolated() {
        let (world, _, _, _) = test_world();
        let world = world.with_dice(Box::new(FixedDice::lucky()));
        let spawner = NpcSpawner::with_check_interval(Arc::new(world), Duration::ZERO);
        spawner.register_npc_type(Box::new(Exploding)).unwrap();
        spawner.register_npc_type(Dummy::boxed(1, &[".*Hall"])).unwrap();

        assert_eq!(
            spawner.spawn_npc("exploding", 1),
            Err(SpawnError::FactoryPanicked("exploding".into()))
        );
        assert_eq!(spawner.handle_respawns(), 1);
        assert_eq!(spawner.count_by_species("dummy"), 1);
    }

    #[test]
    fn test_initial_spawn_and_clear() {
        let (world, _, _, _) = test_world();
        let dice = FixedDice {
            percent: 99.9,
            chance: false,
            pick_max: true,
        };
        let spawner = NpcSpawner::new(Arc::new(world.with_dice(Box::new(dice))));
        spawner.register_npc_type(Dummy::boxed(2, &[".*Hall"])).unwrap();

        assert_eq!(spawner.spawn_initial_npcs(), 2);
        let ids = spawner.npcs_by_species("dummy");
        assert_eq!(ids.len(), 2);
        assert!(spawner.npc(ids[0]).is_some());
        // pick_max rolls the top level
        assert!(ids.iter().all(|id| spawner.world().with_actor(*id, |a| a.entity().level) == Some(5)));

        assert!(spawner.remove_npc(ids[0]));
        assert!(!spawner.remove_npc(ids[0]));
        assert_eq!(spawner.clear_all_npcs(), 1);
        assert!(spawner.active_npcs().is_empty());
    }
}
