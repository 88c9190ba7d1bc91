//! Generic hostile species.

use mud_shared::{Attribute, Attributes};

use crate::combat::AttackOutcome;
use crate::dice::Dice;
use crate::entities::{CombatEntity, EntityId, Npc, NpcBody, NpcState, NpcType, Player, Response};
use crate::world::{SpawnConfiguration, SpawnableNpc};

use super::{NpcAction, NpcBehavior, TickContext};

/// Ticks between attacks for ordinary hostiles
const DEFAULT_ATTACK_SPEED: u32 = 3;

/// Shared "pick a player and hit them" routine for hostile species
#[derive(Debug, Clone)]
pub struct HostileRoutine {
    /// Ticks between attacks
    attack_speed: u32,
    ticks_since_last_attack: u32,
}

impl HostileRoutine {
    pub fn new(attack_speed: u32) -> Self {
        Self {
            attack_speed: attack_speed.max(1),
            ticks_since_last_attack: 0,
        }
    }

    pub fn attack_speed(&self) -> u32 {
        self.attack_speed
    }

    /// Count one tick and, if hostile with players present and the attack
    /// interval has passed, choose whom to attack. The current target is kept
    /// while it stays in the room; otherwise a random player is picked.
    /// The interval restarts only once [`HostileRoutine::resolved`] reports
    /// a swing that happened.
    pub fn tick(&mut self, body: &mut NpcBody, ctx: &TickContext<'_>, dice: &mut dyn Dice) -> Option<NpcAction> {
        self.ticks_since_last_attack = self.ticks_since_last_attack.saturating_add(1);

        if !body.hostile || ctx.players.is_empty() || self.ticks_since_last_attack < self.attack_speed {
            return None;
        }

        let target = body
            .entity
            .combat
            .current_target()
            .filter(|t| ctx.players.contains(t))
            .unwrap_or_else(|| ctx.players[dice.index(ctx.players.len())]);

        body.state = NpcState::Hostile;
        Some(NpcAction::Attack(target))
    }

    /// A rejected attack keeps the window open for the next tick
    pub fn resolved(&mut self, outcome: &AttackOutcome) {
        if matches!(outcome, AttackOutcome::Hit { .. } | AttackOutcome::Dodged) {
            self.ticks_since_last_attack = 0;
        }
    }
}

/// Pay the killer for an ordinary hostile. Returns room narration.
pub fn award_kill_credits(body: &NpcBody, killer: Option<&mut Player>, dice: &mut dyn Dice) -> Vec<String> {
    let name = &body.entity.name;
    match killer {
        Some(player) => {
            let spread = (body.entity.level * 10).saturating_sub(1) as i32;
            let credits = 10 + dice.range(0, spread).max(0) as u32;
            player.add_credits(credits);
            vec![format!("{} has been defeated! {} gains {} credits.", name, player.name(), credits)]
        }
        None => vec![format!("{} has been defeated!", name)],
    }
}

/// Register the replies every hostile understands
pub fn add_hostile_responses(body: &mut NpcBody) {
    let name = body.entity.name.clone();
    body.add_response("hello", Response::Static(format!("The {} snarls menacingly!", name)));
    body.add_response("attack", Response::Static(format!("The {} prepares to defend itself!", name)));
}

/// Plain melee enemy
#[derive(Debug, Clone)]
pub struct EnemyBehavior {
    routine: HostileRoutine,
}

impl EnemyBehavior {
    pub fn new(attack_speed: u32) -> Self {
        Self {
            routine: HostileRoutine::new(attack_speed),
        }
    }
}

impl NpcBehavior for EnemyBehavior {
    fn on_tick(&mut self, body: &mut NpcBody, ctx: &TickContext<'_>, dice: &mut dyn Dice) -> Vec<NpcAction> {
        self.routine.tick(body, ctx, dice).into_iter().collect()
    }

    fn on_attack_outcome(&mut self, _body: &mut NpcBody, outcome: &AttackOutcome) {
        self.routine.resolved(outcome);
    }

    fn interact(&mut self, body: &mut NpcBody, _player: EntityId, action: &str) -> Option<String> {
        match action {
            "attack" => {
                body.set_hostile(true);
                body.state = NpcState::Hostile;
                Some(format!("The {} turns to face you, ready to fight!", body.entity.name))
            }
            _ => None,
        }
    }

    fn on_death(&mut self, body: &mut NpcBody, killer: Option<&mut Player>, dice: &mut dyn Dice) -> Vec<String> {
        award_kill_credits(body, killer, dice)
    }
}

/// Back-alley muggers around the markets
#[derive(Debug, Default)]
pub struct StreetThugFactory;

impl SpawnableNpc for StreetThugFactory {
    fn spawn_configuration(&self) -> SpawnConfiguration {
        SpawnConfiguration {
            species_id: "street_thug".into(),
            max_instances: 4,
            respawn_secs: 120,
            room_patterns: vec![".*Alley.*".into(), ".*Market.*".into()],
            min_level: 1,
            max_level: 5,
            spawn_chance: 0.25,
        }
    }

    fn create_instance(&self, id: EntityId, level: u32, _dice: &mut dyn Dice) -> Npc {
        let attributes = Attributes::uniform(10)
            .with(Attribute::Strength, 12 + level as i32)
            .with(Attribute::Agility, 12)
            .with(Attribute::Speed, 40)
            .with(Attribute::Luck, 8);
        let entity = CombatEntity::new(id, "Street Thug", level, 40 + level * 10, attributes);
        let mut body = NpcBody::new(
            entity,
            "street_thug",
            "A wiry figure in a stained synthleather coat, knuckles wrapped in tape.",
            NpcType::Enemy,
            true,
        );
        add_hostile_responses(&mut body);
        Npc::new(body, Box::new(EnemyBehavior::new(DEFAULT_ATTACK_SPEED)))
    }
}
