//! Game world management.
//!
//! The world owns the room graph and the entity registries. Entities are
//! shared as `Arc<Mutex<Actor>>` so command handlers and the tick driver can
//! work on them concurrently.
//!
//! Lock discipline: hold at most one actor lock at a time, except through
//! [`World::lock_pair`], which always locks the lower id first. Room
//! membership locks and the dice lock are leaves; nothing else is locked
//! while they are held.

mod builder;
mod map;
mod spawner;

pub use builder::build_default_map;
pub use map::{GameMap, Room, RoomId};
pub use spawner::{NpcSpawner, SpawnConfiguration, SpawnableNpc};

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};

use mud_shared::{CharacterClass, Direction, EventKind, Race};

use crate::combat;
use crate::dice::{Dice, GameRng};
use crate::entities::{next_entity_id, Actor, EntityId, Npc, Player};
use crate::events::EventSink;
use crate::persistence::{ItemProvider, StarterKitProvider};

/// Shared handle to a live entity
pub type ActorRef = Arc<Mutex<Actor>>;

/// The game world containing all rooms and entities
pub struct World {
    pub map: GameMap,
    players: DashMap<EntityId, ActorRef>,
    /// Active-NPC index
    npcs: DashMap<EntityId, ActorRef>,
    events: Arc<dyn EventSink>,
    dice: Mutex<Box<dyn Dice>>,
    items: Arc<dyn ItemProvider>,
}

impl World {
    pub fn new(map: GameMap, events: Arc<dyn EventSink>) -> Self {
        Self {
            map,
            players: DashMap::new(),
            npcs: DashMap::new(),
            events,
            dice: Mutex::new(Box::new(GameRng::from_entropy())),
            items: Arc::new(StarterKitProvider::default()),
        }
    }

    /// Replace the randomness source (seeded runs, scripted tests)
    pub fn with_dice(mut self, dice: Box<dyn Dice>) -> Self {
        self.dice = Mutex::new(dice);
        self
    }

    pub fn with_item_provider(mut self, items: Arc<dyn ItemProvider>) -> Self {
        self.items = items;
        self
    }

    /// Roll with the world's dice. Must not be called while holding the dice.
    pub fn roll<T>(&self, f: impl FnOnce(&mut dyn Dice) -> T) -> T {
        let mut dice = self.dice.lock();
        f(dice.as_mut())
    }

    // ---- Registries ----

    pub fn actor(&self, id: EntityId) -> Option<ActorRef> {
        if let Some(entry) = self.players.get(&id) {
            return Some(entry.value().clone());
        }
        self.npcs.get(&id).map(|entry| entry.value().clone())
    }

    /// Run `f` against an entity under its lock
    pub fn with_actor<T>(&self, id: EntityId, f: impl FnOnce(&Actor) -> T) -> Option<T> {
        let actor = self.actor(id)?;
        let guard = actor.lock();
        let out = f(&guard);
        Some(out)
    }

    pub fn player(&self, id: EntityId) -> Option<ActorRef> {
        self.players.get(&id).map(|entry| entry.value().clone())
    }

    pub fn npc(&self, id: EntityId) -> Option<ActorRef> {
        self.npcs.get(&id).map(|entry| entry.value().clone())
    }

    pub fn player_ids(&self) -> Vec<EntityId> {
        self.players.iter().map(|entry| *entry.key()).collect()
    }

    pub fn npc_ids(&self) -> Vec<EntityId> {
        self.npcs.iter().map(|entry| *entry.key()).collect()
    }

    /// Snapshot of the active-NPC index
    pub fn active_npcs(&self) -> Vec<ActorRef> {
        self.npcs.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    pub fn npcs_by_species(&self, species: &str) -> Vec<EntityId> {
        self.npc_ids()
            .into_iter()
            .filter(|id| {
                self.with_actor(*id, |a| a.as_npc().map(|n| n.body.species == species).unwrap_or(false))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn npc_count_by_species(&self, species: &str) -> usize {
        self.npcs_by_species(species).len()
    }

    /// Lock two distinct entities, lower id first. The guards come back in
    /// argument order.
    pub fn lock_pair<'a>(
        &self,
        first: &'a ActorRef,
        second: &'a ActorRef,
    ) -> Option<(MutexGuard<'a, Actor>, MutexGuard<'a, Actor>)> {
        if Arc::ptr_eq(first, second) {
            return None;
        }
        let first_id = first.lock().id();
        let second_id = second.lock().id();
        if first_id < second_id {
            let a = first.lock();
            let b = second.lock();
            Some((a, b))
        } else {
            let b = second.lock();
            let a = first.lock();
            Some((a, b))
        }
    }

    // ---- Players ----

    /// Create a character, hydrate its belongings and register it offline
    pub fn create_character(&self, name: &str, race: Race, class: CharacterClass) -> Result<EntityId, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Name cannot be empty".to_string());
        }
        if self.find_player_by_name(name).is_some() {
            return Err(format!("Name {} is already taken", name));
        }

        let mut player = Player::new(next_entity_id(), name, race, class);
        self.items.hydrate(&mut player)?;
        let id = player.id();
        self.players.insert(id, Arc::new(Mutex::new(Actor::Player(player))));
        info!("Created character {} ({})", name, id);
        Ok(id)
    }

    /// Register a ready-made player, online, in a room
    pub fn add_player(&self, mut player: Player, room: RoomId) -> Result<ActorRef, String> {
        let target = self.map.room(room).ok_or_else(|| format!("Unknown room {}", room))?;
        player.online = true;
        player.entity.room = Some(room);
        player.room_name = Some(target.name.clone());
        let id = player.id();
        let actor = Arc::new(Mutex::new(Actor::Player(player)));
        target.add_player(id);
        self.players.insert(id, actor.clone());
        Ok(actor)
    }

    pub fn find_player_by_name(&self, name: &str) -> Option<EntityId> {
        self.player_ids()
            .into_iter()
            .find(|id| self.with_actor(*id, |a| a.name().eq_ignore_ascii_case(name)).unwrap_or(false))
    }

    /// Bring a character into the world at its saved room (or the starting
    /// room). Defeated characters come back at full health. Returns the
    /// description of the room they land in.
    pub fn join_game(&self, id: EntityId) -> Result<String, String> {
        let actor = self.player(id).ok_or_else(|| format!("No character {}", id))?;
        let (room_id, name) = {
            let mut guard = actor.lock();
            let player = guard.as_player_mut().ok_or("Not a player")?;
            if player.online {
                return Err(format!("{} is already in the game", player.name()));
            }
            let room_id = player
                .room_name
                .as_deref()
                .and_then(|name| self.map.room_by_name(name))
                .map(|room| room.id)
                .or_else(|| self.map.starting_room())
                .ok_or("The world has no rooms")?;
            if player.entity.is_dead() {
                player.revive();
            }
            player.online = true;
            player.entity.room = Some(room_id);
            player.room_name = self.map.room(room_id).map(|r| r.name.clone());
            if let Some(room) = self.map.room(room_id) {
                room.add_player(id);
            }
            (room_id, player.name().to_string())
        };

        info!("{} joined the game", name);
        self.narrate_room(room_id, &format!("{} has entered the game.", name));
        Ok(self.describe_room(room_id, Some(id)))
    }

    /// Take a character out of the world; it stops fighting and leaves its room
    pub fn leave_game(&self, id: EntityId) -> Result<(), String> {
        let actor = self.player(id).ok_or_else(|| format!("No character {}", id))?;
        let (room, name, opponents) = {
            let mut guard = actor.lock();
            let opponents = combat::opponents_of(guard.entity());
            let player = guard.as_player_mut().ok_or("Not a player")?;
            if !player.online {
                return Ok(());
            }
            player.online = false;
            player.entity.combat.exit_combat();
            let room = player.entity.room.take();
            if let Some(room) = room.and_then(|r| self.map.room(r)) {
                room.remove_player(id);
            }
            (room, player.name().to_string(), opponents)
        };

        self.withdraw_from(id, opponents);
        if let Some(room) = room {
            self.narrate_room(room, &format!("{} has left the game.", name));
        }
        info!("{} left the game", name);
        Ok(())
    }

    /// Living, online players standing in a room
    pub fn living_players_in(&self, room_id: RoomId) -> Vec<EntityId> {
        let Some(room) = self.map.room(room_id) else {
            return Vec::new();
        };
        room.players()
            .into_iter()
            .filter(|id| {
                self.with_actor(*id, |a| {
                    !a.entity().is_dead() && a.as_player().map(|p| p.online).unwrap_or(false)
                })
                .unwrap_or(false)
            })
            .collect()
    }

    // ---- NPCs ----

    /// Place an NPC in a room and register it in the active index
    pub fn insert_npc(&self, mut npc: Npc, room_id: RoomId) -> Result<EntityId, String> {
        let room = self.map.room(room_id).ok_or_else(|| format!("Unknown room {}", room_id))?;
        let id = npc.id();
        npc.body.entity.room = Some(room_id);
        room.add_npc(id);
        self.npcs.insert(id, Arc::new(Mutex::new(Actor::Npc(npc))));
        debug!("NPC {} placed in {}", id, room.name);
        Ok(id)
    }

    /// Detach an NPC from its room and the active index, and release everyone
    /// it was fighting
    pub fn remove_npc(&self, id: EntityId) -> Option<ActorRef> {
        let (_, actor) = self.npcs.remove(&id)?;
        let (room, mut opponents) = {
            let guard = actor.lock();
            (guard.entity().room, combat::opponents_of(guard.entity()))
        };
        if let Some(room) = room.and_then(|r| self.map.room(r)) {
            room.remove_npc(id);
            opponents.extend(room.players());
            opponents.extend(room.npcs());
        }
        self.withdraw_from(id, opponents);
        Some(actor)
    }

    /// Remove every NPC (shutdown or reset)
    pub fn clear_npcs(&self) -> usize {
        let ids = self.npc_ids();
        let count = ids.len();
        for id in ids {
            self.remove_npc(id);
        }
        count
    }

    /// First NPC in the room whose name contains `name` (case-insensitive)
    pub fn find_npc_in_room(&self, room_id: RoomId, name: &str) -> Option<EntityId> {
        let needle = name.to_lowercase();
        let room = self.map.room(room_id)?;
        room.npcs().into_iter().find(|id| {
            self.with_actor(*id, |a| a.name().to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }

    pub fn find_player_in_room(&self, room_id: RoomId, name: &str) -> Option<EntityId> {
        let needle = name.to_lowercase();
        let room = self.map.room(room_id)?;
        room.players().into_iter().find(|id| {
            self.with_actor(*id, |a| a.name().to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }

    /// Drop `gone` from each listed entity's attacker set and target
    pub(crate) fn withdraw_from(&self, gone: EntityId, others: impl IntoIterator<Item = EntityId>) {
        let others: BTreeSet<EntityId> = others.into_iter().filter(|id| *id != gone).collect();
        for other in others {
            if let Some(actor) = self.actor(other) {
                combat::release_opponent(actor.lock().entity_mut(), gone);
            }
        }
    }

    // ---- Movement ----

    /// Walk an entity through an exit, keeping room membership consistent.
    /// Returns the room it arrived in.
    pub fn move_actor(&self, id: EntityId, direction: Direction) -> Result<RoomId, String> {
        let actor = self.actor(id).ok_or_else(|| format!("No entity {}", id))?;
        let mut guard = actor.lock();
        let from_id = guard.entity().room.ok_or("You are nowhere.")?;
        let from = self.map.room(from_id).ok_or("You are nowhere.")?;
        let to_id = from
            .exit(direction)
            .ok_or_else(|| format!("You can't go {} from here.", direction))?;
        let to = self.map.room(to_id).ok_or_else(|| format!("You can't go {} from here.", direction))?;

        let name = guard.name().to_string();
        match &mut *guard {
            Actor::Player(player) => {
                from.remove_player(id);
                to.add_player(id);
                player.room_name = Some(to.name.clone());
            }
            Actor::Npc(_) => {
                from.remove_npc(id);
                to.add_npc(id);
            }
        }
        guard.entity_mut().room = Some(to_id);
        drop(guard);

        self.narrate_room(from_id, &format!("{} leaves {}.", name, direction));
        self.narrate_room(to_id, &format!("{} arrives.", name));
        Ok(to_id)
    }

    // ---- Descriptions ----

    pub fn room_name(&self, room_id: RoomId) -> Option<String> {
        self.map.room(room_id).map(|room| room.name.clone())
    }

    /// Full room description as seen by `viewer`
    pub fn describe_room(&self, room_id: RoomId, viewer: Option<EntityId>) -> String {
        let Some(room) = self.map.room(room_id) else {
            return "You see nothing.".to_string();
        };

        let mut out = format!("{}\n{}", room.name, room.description);

        let exits: Vec<&str> = room.exits().keys().map(|d| d.name()).collect();
        if exits.is_empty() {
            out.push_str("\nThere are no obvious exits.");
        } else {
            out.push_str(&format!("\nExits: {}", exits.join(", ")));
        }

        let items = room.items();
        if !items.is_empty() {
            let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
            out.push_str(&format!("\nYou see: {}", names.join(", ")));
        }

        let players: Vec<String> = room
            .players()
            .into_iter()
            .filter(|id| Some(*id) != viewer)
            .filter_map(|id| self.with_actor(id, |a| a.as_player().map(|p| p.full_name())).flatten())
            .collect();
        if !players.is_empty() {
            out.push_str(&format!("\nPlayers here: {}", players.join(", ")));
        }

        let npcs: Vec<String> = room
            .npcs()
            .into_iter()
            .filter_map(|id| self.with_actor(id, |a| a.as_npc().map(|n| n.body.status_line())).flatten())
            .collect();
        for npc in npcs {
            out.push_str(&format!("\n{}", npc));
        }

        out
    }

    // ---- Narration ----

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    pub fn narrate_room(&self, room_id: RoomId, message: &str) {
        match self.map.room(room_id) {
            Some(room) => self.events.on_event(EventKind::Room, &room.name, message),
            None => warn!("Narration for unknown room {}: {}", room_id, message),
        }
    }

    pub fn narrate_player(&self, id: EntityId, message: &str) {
        self.events.on_event(EventKind::Player, &id.to_string(), message);
    }

    /// Broadcast to everyone online
    pub fn narrate_system(&self, message: &str) {
        self.events.on_event(EventKind::System, "", message);
    }
}
