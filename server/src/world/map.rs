//! Room graph.
//!
//! Rooms are built once at startup; afterwards the graph never changes shape,
//! only who and what is standing in each room. Membership sets sit behind
//! their own locks so status queries can read them while the tick and command
//! handlers move entities around.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use parking_lot::RwLock;

use mud_shared::{Direction, ItemDef};

use crate::entities::EntityId;

pub type RoomId = u32;

/// A single location in the world
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    exits: BTreeMap<Direction, RoomId>,
    items: RwLock<Vec<ItemDef>>,
    players: RwLock<BTreeSet<EntityId>>,
    npcs: RwLock<BTreeSet<EntityId>>,
}

impl Room {
    fn new(id: RoomId, name: String, description: String) -> Self {
        Self {
            id,
            name,
            description,
            exits: BTreeMap::new(),
            items: RwLock::new(Vec::new()),
            players: RwLock::new(BTreeSet::new()),
            npcs: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn exit(&self, direction: Direction) -> Option<RoomId> {
        self.exits.get(&direction).copied()
    }

    pub fn exits(&self) -> &BTreeMap<Direction, RoomId> {
        &self.exits
    }

    pub fn exit_directions(&self) -> Vec<Direction> {
        self.exits.keys().copied().collect()
    }

    pub fn players(&self) -> Vec<EntityId> {
        self.players.read().iter().copied().collect()
    }

    pub fn npcs(&self) -> Vec<EntityId> {
        self.npcs.read().iter().copied().collect()
    }

    pub fn has_player(&self, id: EntityId) -> bool {
        self.players.read().contains(&id)
    }

    pub fn has_npc(&self, id: EntityId) -> bool {
        self.npcs.read().contains(&id)
    }

    pub fn has_npcs(&self) -> bool {
        !self.npcs.read().is_empty()
    }

    pub(crate) fn add_player(&self, id: EntityId) {
        self.players.write().insert(id);
    }

    pub(crate) fn remove_player(&self, id: EntityId) -> bool {
        self.players.write().remove(&id)
    }

    pub(crate) fn add_npc(&self, id: EntityId) {
        self.npcs.write().insert(id);
    }

    pub(crate) fn remove_npc(&self, id: EntityId) -> bool {
        self.npcs.write().remove(&id)
    }

    pub fn add_item(&self, item: ItemDef) {
        self.items.write().push(item);
    }

    pub fn items(&self) -> Vec<ItemDef> {
        self.items.read().clone()
    }

    /// Remove up to `amount` copies of the first item whose name contains
    /// `name` (case-insensitive)
    pub fn take_items(&self, name: &str, amount: usize) -> Vec<ItemDef> {
        let wanted = name.to_lowercase();
        let mut items = self.items.write();
        let Some(id) = items.iter().find(|i| i.name.to_lowercase().contains(&wanted)).map(|i| i.id) else {
            return Vec::new();
        };
        let mut taken = Vec::new();
        let mut index = 0;
        while index < items.len() && taken.len() < amount {
            if items[index].id == id {
                taken.push(items.remove(index));
            } else {
                index += 1;
            }
        }
        taken
    }
}

/// Directed graph of rooms
#[derive(Debug, Default)]
pub struct GameMap {
    rooms: HashMap<RoomId, Room>,
    by_name: HashMap<String, RoomId>,
    starting_room: Option<RoomId>,
    next_room_id: RoomId,
}

impl GameMap {
    pub fn new() -> Self {
        Self {
            next_room_id: 1,
            ..Self::default()
        }
    }

    /// Add a room. The first room added becomes the starting room.
    pub fn add_room(&mut self, name: impl Into<String>, description: impl Into<String>) -> RoomId {
        let id = self.next_room_id;
        self.next_room_id += 1;

        let name = name.into();
        self.by_name.insert(name.clone(), id);
        self.rooms.insert(id, Room::new(id, name, description.into()));
        if self.starting_room.is_none() {
            self.starting_room = Some(id);
        }
        id
    }

    /// Link `from` to `to` through `direction`; bidirectional links also add
    /// the opposite exit back.
    pub fn connect_rooms(&mut self, from: RoomId, direction: Direction, to: RoomId, bidirectional: bool) -> Result<(), String> {
        if !self.rooms.contains_key(&to) {
            return Err(format!("Unknown room {}", to));
        }
        self.rooms
            .get_mut(&from)
            .ok_or_else(|| format!("Unknown room {}", from))?
            .exits
            .insert(direction, to);
        if bidirectional {
            if let Some(room) = self.rooms.get_mut(&to) {
                room.exits.insert(direction.opposite(), from);
            }
        }
        Ok(())
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// Exact-name lookup
    pub fn room_by_name(&self, name: &str) -> Option<&Room> {
        self.by_name.get(name).and_then(|id| self.rooms.get(id))
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn starting_room(&self) -> Option<RoomId> {
        self.starting_room
    }

    pub fn set_starting_room(&mut self, id: RoomId) -> Result<(), String> {
        if !self.rooms.contains_key(&id) {
            return Err(format!("Unknown room {}", id));
        }
        self.starting_room = Some(id);
        Ok(())
    }

    /// Shortest route as a list of directions. `Some(vec![])` when start and
    /// destination are the same room, `None` when unreachable.
    pub fn find_path(&self, start: RoomId, destination: RoomId) -> Option<Vec<Direction>> {
        if !self.rooms.contains_key(&start) || !self.rooms.contains_key(&destination) {
            return None;
        }
        if start == destination {
            return Some(Vec::new());
        }

        let mut came_from: HashMap<RoomId, (RoomId, Direction)> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let Some(room) = self.rooms.get(&current) else {
                continue;
            };
            for (&direction, &next) in &room.exits {
                if next == start || came_from.contains_key(&next) {
                    continue;
                }
                came_from.insert(next, (current, direction));
                if next == destination {
                    let mut path = Vec::new();
                    let mut at = destination;
                    while let Some(&(prev, dir)) = came_from.get(&at) {
                        path.push(dir);
                        at = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }
}
