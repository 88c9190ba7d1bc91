//! Maintenance drones patrolling the service tunnels.

use mud_shared::{Attribute, Attributes};

use crate::dice::Dice;
use crate::entities::{CombatEntity, EntityId, Npc, NpcBody, NpcState, NpcType, Response};
use crate::world::{SpawnConfiguration, SpawnableNpc};

use super::{NpcAction, NpcBehavior, TickContext};

/// Ticks between patrol moves
const PATROL_INTERVAL: u32 = 5;

/// Chance per tick of a flavor line
const FLAVOR_CHANCE: f64 = 0.05;

const FLAVOR_LINES: [&str; 5] = [
    "sweeps a thin beam of light along the wall seams.",
    "buzzes quietly as it tightens a loose bolt.",
    "pauses to sample the air, then moves on.",
    "chirps a short status tone.",
    "scrapes a patch of corrosion off a pipe.",
];

/// Wanders between rooms and keeps to itself
#[derive(Debug, Clone, Default)]
pub struct DroneBehavior {
    ticks_since_move: u32,
}

impl DroneBehavior {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NpcBehavior for DroneBehavior {
    fn on_tick(&mut self, body: &mut NpcBody, ctx: &TickContext<'_>, dice: &mut dyn Dice) -> Vec<NpcAction> {
        let mut actions = Vec::new();

        if dice.chance(FLAVOR_CHANCE) {
            let line = FLAVOR_LINES[dice.index(FLAVOR_LINES.len())];
            actions.push(NpcAction::Say(format!("{} {}", body.entity.name, line)));
        }

        self.ticks_since_move += 1;
        if self.ticks_since_move >= PATROL_INTERVAL && !ctx.exits.is_empty() {
            self.ticks_since_move = 0;
            body.state = NpcState::Moving;
            actions.push(NpcAction::Move(ctx.exits[dice.index(ctx.exits.len())]));
        } else {
            body.state = NpcState::Idle;
        }

        actions
    }
}

#[derive(Debug, Default)]
pub struct MaintenanceDroneFactory;

impl SpawnableNpc for MaintenanceDroneFactory {
    fn spawn_configuration(&self) -> SpawnConfiguration {
        SpawnConfiguration {
            species_id: "maintenance_drone".into(),
            max_instances: 2,
            respawn_secs: -1,
            room_patterns: vec![".*Maintenance.*".into(), ".*Tunnel.*".into(), ".*Shaft.*".into()],
            min_level: 1,
            max_level: 3,
            spawn_chance: 0.2,
        }
    }

    fn create_instance(&self, id: EntityId, level: u32, dice: &mut dyn Dice) -> Npc {
        let serial = dice.range(100, 999);
        let attributes = Attributes::uniform(8).with(Attribute::Speed, 30);
        let entity = CombatEntity::new(id, format!("Maintenance Drone D-{}", serial), level, 30 + level * 5, attributes);
        let mut body = NpcBody::new(
            entity,
            "maintenance_drone",
            "A squat, six-legged drone with a tool arm folded under its belly.",
            NpcType::Ambient,
            false,
        );
        body.add_response("hello", Response::Static("The drone beeps twice and returns to its work.".into()));
        body.add_response(
            "help",
            Response::Static("A small screen flickers: 'REPORT FAULTS TO STATION MAINTENANCE.'".into()),
        );
        Npc::new(body, Box::new(DroneBehavior::new()))
    }
}
