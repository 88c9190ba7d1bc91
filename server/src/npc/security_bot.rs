//! Station security bots.
//!
//! Bots idle until someone they consider hostile shows up in their room.
//! Fighting drains their energy; at zero they power down and must recharge
//! before they will engage again.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use mud_shared::{Attribute, Attributes};

use crate::combat::AttackOutcome;
use crate::dice::Dice;
use crate::entities::{CombatEntity, EntityId, Npc, NpcBody, NpcState, NpcType, Player, Response};
use crate::world::{SpawnConfiguration, SpawnableNpc};

use super::enemy::{add_hostile_responses, award_kill_credits, HostileRoutine};
use super::{NpcAction, NpcBehavior, TickContext};

const MAX_ENERGY: i32 = 100;
/// Energy lost per tick while hostile
const ENERGY_DRAIN_RATE: i32 = 1;
/// Energy gained per tick while not hostile
const ENERGY_RECHARGE_RATE: i32 = 2;
/// Below this a reboot is allowed and idle chatter stops
const LOW_POWER_THRESHOLD: i32 = 20;

const SCAN_INTERVAL: Duration = Duration::from_secs(5);
const IDLE_MESSAGE_COOLDOWN: Duration = Duration::from_secs(10);
const IDLE_MESSAGE_CHANCE: f64 = 0.05;
const ALERT_DECAY_CHANCE: f64 = 0.10;

const ATTACK_SPEED: u32 = 3;

const IDLE_MESSAGES: [&str; 10] = [
    "performs a routine sensor sweep of the area.",
    "emits a low humming sound as it runs diagnostics.",
    "adjusts its positioning servos with a quiet whir.",
    "scans the surroundings with pulsing blue sensors.",
    "rotates slowly, monitoring the area.",
    "projects a holographic security grid briefly.",
    "recalibrates its internal systems.",
    "emits a series of soft beeping sounds.",
    "runs a quick systems check, status lights blinking.",
    "patrols the perimeter of the room.",
];

/// Alert levels: 0 normal, 1 elevated, 2 high alert, 3 combat ready
fn alert_status(alert: u8) -> &'static str {
    match alert {
        0 => "Normal",
        1 => "Elevated",
        2 => "High Alert",
        3 => "Combat Ready",
        _ => "Unknown",
    }
}

/// Energy, alert and threat tracking on top of the hostile routine
#[derive(Debug, Clone)]
pub struct SecurityBotBehavior {
    routine: HostileRoutine,
    energy: i32,
    alert: u8,
    last_scan: Option<Instant>,
    last_idle_message: Option<Instant>,
    known_hostiles: BTreeSet<EntityId>,
}

impl Default for SecurityBotBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityBotBehavior {
    pub fn new() -> Self {
        Self {
            routine: HostileRoutine::new(ATTACK_SPEED),
            energy: MAX_ENERGY,
            alert: 0,
            last_scan: None,
            last_idle_message: None,
            known_hostiles: BTreeSet::new(),
        }
    }

    pub fn energy(&self) -> i32 {
        self.energy
    }

    pub fn alert_level(&self) -> u8 {
        self.alert
    }

    pub fn is_known_hostile(&self, id: EntityId) -> bool {
        self.known_hostiles.contains(&id)
    }

    fn update_energy(&mut self, body: &mut NpcBody, actions: &mut Vec<NpcAction>) {
        if body.hostile {
            self.energy = (self.energy - ENERGY_DRAIN_RATE).max(0);
            if self.energy == 0 {
                body.set_hostile(false);
                body.state = NpcState::Idle;
                self.alert = 0;
                actions.push(NpcAction::Say(format!(
                    "{} powers down, entering emergency conservation mode.",
                    body.entity.name
                )));
            }
        } else if self.energy < MAX_ENERGY {
            self.energy = (self.energy + ENERGY_RECHARGE_RATE).min(MAX_ENERGY);
            if self.energy == MAX_ENERGY && self.alert > 0 {
                self.alert = 1;
                actions.push(NpcAction::Say(format!(
                    "{} is fully recharged and resumes patrolling.",
                    body.entity.name
                )));
            }
        }
    }

    /// Every few seconds look around for players it has reason to distrust.
    /// Anyone currently attacking the bot counts.
    fn scan_room(&mut self, body: &mut NpcBody, ctx: &TickContext<'_>) {
        let due = self
            .last_scan
            .map(|last| ctx.now.saturating_duration_since(last) > SCAN_INTERVAL)
            .unwrap_or(true);
        if !due {
            return;
        }
        self.last_scan = Some(ctx.now);

        for player in ctx.players {
            if body.entity.combat.attackers().contains(player) {
                self.known_hostiles.insert(*player);
            }
            if self.known_hostiles.contains(player) {
                self.alert = self.alert.max(2);
                body.set_hostile(true);
            }
        }
    }

    fn decay_alert(&mut self, ctx: &TickContext<'_>, dice: &mut dyn Dice) {
        if self.alert > 0 && ctx.players.is_empty() && dice.chance(ALERT_DECAY_CHANCE) {
            self.alert -= 1;
        }
    }

    fn idle_chatter(&mut self, body: &NpcBody, ctx: &TickContext<'_>, dice: &mut dyn Dice) -> Option<NpcAction> {
        if body.hostile || self.energy <= LOW_POWER_THRESHOLD {
            return None;
        }
        let cooled_down = self
            .last_idle_message
            .map(|last| ctx.now.saturating_duration_since(last) >= IDLE_MESSAGE_COOLDOWN)
            .unwrap_or(true);
        if !cooled_down || !dice.chance(IDLE_MESSAGE_CHANCE) {
            return None;
        }
        self.last_idle_message = Some(ctx.now);
        let line = IDLE_MESSAGES[dice.index(IDLE_MESSAGES.len())];
        Some(NpcAction::Say(format!("{} {}", body.entity.name, line)))
    }

    fn scan_report(&self, body: &NpcBody, player: EntityId) -> String {
        format!(
            "Security Scan Results:\nUnit: {}\nEnergy Level: {}%\nAlert Status: {}\nThreat Assessment: {}",
            body.entity.name,
            self.energy,
            alert_status(self.alert),
            if self.is_known_hostile(player) { "HOSTILE" } else { "Neutral" }
        )
    }

    fn hack(&mut self, body: &mut NpcBody, player: EntityId) -> String {
        body.set_hostile(true);
        body.state = NpcState::Hostile;
        self.alert = 3;
        self.known_hostiles.insert(player);
        "ALERT! Unauthorized access detected! Engaging defense protocols.".to_string()
    }

    fn deactivate(&mut self, body: &mut NpcBody) -> String {
        if self.alert > 0 {
            body.set_hostile(true);
            return "ERROR: Cannot deactivate while security protocols are active!".to_string();
        }
        "Access denied. Security authorization required.".to_string()
    }

    fn reboot(&mut self, body: &mut NpcBody) -> String {
        if self.energy < LOW_POWER_THRESHOLD {
            self.energy = MAX_ENERGY / 2;
            self.alert = 0;
            body.set_hostile(false);
            body.state = NpcState::Idle;
            return format!("{} performs an emergency reboot, returning to standby mode.", body.entity.name);
        }
        "ERROR: Reboot only available in low power state.".to_string()
    }

    fn stand_down(&mut self, body: &mut NpcBody) -> String {
        if self.alert <= 1 {
            self.alert = 0;
            body.set_hostile(false);
            body.state = NpcState::Idle;
            return format!("{} acknowledges command, returning to standard patrol mode.", body.entity.name);
        }
        "Unable to comply - threat level too high.".to_string()
    }
}

impl NpcBehavior for SecurityBotBehavior {
    fn on_tick(&mut self, body: &mut NpcBody, ctx: &TickContext<'_>, dice: &mut dyn Dice) -> Vec<NpcAction> {
        let mut actions = Vec::new();

        self.update_energy(body, &mut actions);
        self.scan_room(body, ctx);
        self.decay_alert(ctx, dice);
        actions.extend(self.idle_chatter(body, ctx, dice));

        if body.hostile {
            actions.extend(self.routine.tick(body, ctx, dice));
        }
        actions
    }

    fn on_attack_outcome(&mut self, _body: &mut NpcBody, outcome: &AttackOutcome) {
        self.routine.resolved(outcome);
    }

    fn interact(&mut self, body: &mut NpcBody, player: EntityId, action: &str) -> Option<String> {
        if body.entity.is_dead() {
            return Some("The security bot lies motionless, occasional sparks shooting from its damaged circuits.".into());
        }
        match action {
            "scan" => Some(self.scan_report(body, player)),
            "hack" => Some(self.hack(body, player)),
            "deactivate" => Some(self.deactivate(body)),
            "reboot" => Some(self.reboot(body)),
            _ => None,
        }
    }

    fn computed_response(&mut self, body: &mut NpcBody, trigger: &str) -> Option<String> {
        let entity = &body.entity;
        let reply = match trigger {
            "status" => format!(
                "Status Report - {}\nPower: {}%\nAlert Level: {}\nSystems: {}",
                entity.name,
                self.energy,
                alert_status(self.alert),
                if entity.health_percent() > 50 { "Nominal" } else { "Warning" }
            ),
            "identify" => format!("Security Unit {} - Authorization Level {}", entity.name, entity.level),
            "diagnostic" => format!(
                "Diagnostic Results:\nModel: Security Bot MK-{}\nPower Systems: {}%\nCombat Systems: {}%\nSensor Array: {}\nThreat Level: {}",
                entity.level,
                self.energy,
                entity.health_percent(),
                if self.alert > 0 { "ACTIVE" } else { "Standard" },
                alert_status(self.alert)
            ),
            "systems" => format!(
                "Systems Status:\nMain Power: {}\nWeapon Systems: {}\nDefense Grid: {}\nSensor Array: {}",
                if self.energy > 50 { "ONLINE" } else { "WARNING" },
                if body.hostile { "ENGAGED" } else { "STANDBY" },
                if entity.health_percent() > 30 { "ACTIVE" } else { "CRITICAL" },
                if self.alert > 0 { "ENHANCED" } else { "NORMAL" }
            ),
            "stand down" => self.stand_down(body),
            "threat" => format!(
                "Current Threat Assessment:\nAlert Level: {}\nKnown Hostiles: {}\nResponse Protocol: {}",
                alert_status(self.alert),
                self.known_hostiles.len(),
                if body.hostile { "ENGAGE" } else { "MONITOR" }
            ),
            _ => return None,
        };
        Some(reply)
    }

    fn on_death(&mut self, body: &mut NpcBody, killer: Option<&mut Player>, dice: &mut dyn Dice) -> Vec<String> {
        let name = body.entity.name.clone();
        match killer {
            Some(player) => {
                let mut lines = award_kill_credits(body, Some(&mut *player), dice);
                let salvage = 50 + body.entity.level * 10 + dice.range(0, 99).max(0) as u32;
                player.add_credits(salvage);
                lines.push(format!(
                    "{} emits a final warning tone before powering down permanently. {} salvages {} credits worth of parts.",
                    name,
                    player.name(),
                    salvage
                ));
                lines
            }
            None => {
                let mut lines = award_kill_credits(body, None, dice);
                lines.push(format!("{} emits a final warning tone before powering down permanently.", name));
                lines
            }
        }
    }
}

fn describe(level: u32) -> String {
    let build = if level <= 2 {
        "basic sensors and lightweight plating."
    } else if level <= 5 {
        "advanced optical sensors and reinforced plating."
    } else {
        "military-grade targeting systems and heavy combat plating."
    };
    format!(
        "A heavily armored security robot with {} Its chassis bears the station security insignia \
         and warning symbols. Model designation is clearly visible on its surface.",
        build
    )
}

#[derive(Debug, Default)]
pub struct SecurityBotFactory;

impl SpawnableNpc for SecurityBotFactory {
    fn spawn_configuration(&self) -> SpawnConfiguration {
        SpawnConfiguration {
            species_id: "security_bot".into(),
            max_instances: 3,
            respawn_secs: 300,
            room_patterns: vec![
                "Shibuya Crossing".into(),
                "Shibuya Security Post".into(),
                ".*Security.*".into(),
                ".*Maintenance.*".into(),
                ".*Restricted.*".into(),
                ".*Cargo Bay.*".into(),
            ],
            min_level: 1,
            max_level: 10,
            spawn_chance: 0.1,
        }
    }

    fn create_instance(&self, id: EntityId, level: u32, dice: &mut dyn Dice) -> Npc {
        let model = level as i32 + dice.range(0, 998);
        let attributes = Attributes::uniform(10)
            .with(Attribute::Strength, 14 + level as i32)
            .with(Attribute::Constitution, 15)
            .with(Attribute::Agility, 6)
            .with(Attribute::Speed, 40)
            .with(Attribute::Perception, 14)
            .with(Attribute::Luck, 5);
        let entity = CombatEntity::new(id, format!("Security Bot MK-{}", model), level, 100 + level * 20, attributes);
        let mut body = NpcBody::new(entity, "security_bot", describe(level), NpcType::Enemy, false);

        add_hostile_responses(&mut body);
        body.add_response(
            "hello",
            Response::Static(
                "The security bot's sensors focus on you momentarily before emitting a low acknowledgment tone.".into(),
            ),
        );
        body.add_response(
            "help",
            Response::Static("The security bot displays a scrolling message: 'FOR SECURITY ASSISTANCE, REMAIN IN PLACE.'".into()),
        );
        for trigger in ["status", "identify", "diagnostic", "systems", "stand down", "threat"] {
            body.add_response(trigger, Response::Computed);
        }

        Npc::new(body, Box::new(SecurityBotBehavior::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::FixedDice;
    use mud_shared::{CharacterClass, Race};

    fn bot_body(level: u32) -> NpcBody {
        SecurityBotFactory.create_instance(50, level, &mut FixedDice::quiet()).body
    }

    #[test]
    fn test_hostile_bot_drains_and_powers_down() {
        let mut body = bot_body(1);
        let mut bot = SecurityBotBehavior::new();
        let mut dice = FixedDice::quiet();
        let ctx = TickContext::empty("Shibuya Security Post");

        body.set_hostile(true);
        bot.alert = 2;
        bot.energy = 2;

        assert!(bot.on_tick(&mut body, &ctx, &mut dice).is_empty());
        assert_eq!(bot.energy(), 1);

        let actions = bot.on_tick(&mut body, &ctx, &mut dice);
        assert_eq!(bot.energy(), 0);
        assert!(!body.hostile);
        assert_eq!(body.state, NpcState::Idle);
        assert_eq!(bot.alert_level(), 0);
        assert!(matches!(&actions[0], NpcAction::Say(s) if s.contains("emergency conservation mode")));
    }

    #[test]
    fn test_recharge_lowers_alert_when_full() {
        let mut body = bot_body(1);
        let mut bot = SecurityBotBehavior::new();
        let mut dice = FixedDice::quiet();
        let ctx = TickContext::empty("Shibuya Security Post");
        bot.energy = 97;
        bot.alert = 3;

        bot.on_tick(&mut body, &ctx, &mut dice);
        assert_eq!(bot.energy(), 99);
        let actions = bot.on_tick(&mut body, &ctx, &mut dice);
        assert_eq!(bot.energy(), MAX_ENERGY);
        assert_eq!(bot.alert_level(), 1);
        assert!(matches!(&actions[0], NpcAction::Say(s) if s.contains("fully recharged")));
    }

    #[test]
    fn test_hacker_is_remembered_and_attacked() {
        let mut body = bot_body(2);
        let mut bot = SecurityBotBehavior::new();
        let mut dice = FixedDice::quiet();

        bot.hack(&mut body, 7);
        bot.alert = 0;
        body.set_hostile(false);

        // Player 7 walks in; the next scan spots them
        let players = [7];
        let start = Instant::now();
        let mut attacked = false;
        for tick in 0..4u64 {
            let ctx = TickContext {
                now: start + Duration::from_secs(tick),
                players: &players,
                ..TickContext::empty("Shibuya Security Post")
            };
            let actions = bot.on_tick(&mut body, &ctx, &mut dice);
            attacked |= actions.contains(&NpcAction::Attack(7));
        }
        assert!(body.hostile);
        assert!(bot.alert_level() >= 2);
        assert!(attacked);
    }

    #[test]
    fn test_attacker_counts_as_hostile() {
        let mut body = bot_body(1);
        let mut bot = SecurityBotBehavior::new();
        let mut dice = FixedDice::quiet();
        body.entity.combat.add_attacker(11);

        let players = [11];
        let ctx = TickContext {
            players: &players,
            ..TickContext::empty("Shibuya Crossing")
        };
        bot.on_tick(&mut body, &ctx, &mut dice);
        assert!(bot.is_known_hostile(11));
        assert!(body.hostile);
    }

    #[test]
    fn test_alert_decays_only_when_room_empty() {
        let mut body = bot_body(1);
        let mut bot = SecurityBotBehavior::new();
        let mut dice = FixedDice::lucky();
        bot.alert = 2;

        let players = [3];
        let occupied = TickContext {
            players: &players,
            ..TickContext::empty("Harbor Cargo Bay")
        };
        bot.on_tick(&mut body, &occupied, &mut dice);
        assert_eq!(bot.alert_level(), 2);

        let empty = TickContext::empty("Harbor Cargo Bay");
        bot.on_tick(&mut body, &empty, &mut dice);
        assert_eq!(bot.alert_level(), 1);
    }

    #[test]
    fn test_idle_chatter_respects_cooldown() {
        let mut body = bot_body(1);
        let mut bot = SecurityBotBehavior::new();
        let mut dice = FixedDice::lucky();
        let start = Instant::now();

        let says = |actions: Vec<NpcAction>| actions.iter().filter(|a| matches!(a, NpcAction::Say(_))).count();

        let at = |secs: u64| TickContext {
            now: start + Duration::from_secs(secs),
            ..TickContext::empty("Shibuya Crossing")
        };
        assert_eq!(says(bot.on_tick(&mut body, &at(0), &mut dice)), 1);
        assert_eq!(says(bot.on_tick(&mut body, &at(5), &mut dice)), 0);
        assert_eq!(says(bot.on_tick(&mut body, &at(10), &mut dice)), 1);
    }

    #[test]
    fn test_reboot_only_in_low_power() {
        let mut body = bot_body(1);
        let mut bot = SecurityBotBehavior::new();
        assert!(bot.reboot(&mut body).starts_with("ERROR"));

        bot.energy = 10;
        bot.alert = 3;
        body.set_hostile(true);
        assert!(bot.reboot(&mut body).contains("emergency reboot"));
        assert_eq!(bot.energy(), 50);
        assert_eq!(bot.alert_level(), 0);
        assert!(!body.hostile);
    }

    #[test]
    fn test_responses_through_npc() {
        let mut npc = SecurityBotFactory.create_instance(50, 4, &mut FixedDice::quiet());
        // quiet dice pick the low end of the model roll
        assert_eq!(npc.name(), "Security Bot MK-4");
        assert_eq!(npc.interact(1, "identify"), "Security Unit Security Bot MK-4 - Authorization Level 4");
        assert!(npc.interact(1, "status").contains("Power: 100%"));
        assert!(npc.interact(1, "scan").contains("Threat Assessment: Neutral"));
        assert!(npc.interact(1, "hello").contains("low acknowledgment tone"));
        assert!(npc.interact(1, "STAND DOWN").contains("acknowledges command"));
        assert!(npc.interact(1, "deactivate").starts_with("Access denied"));

        npc.interact(1, "hack");
        assert!(npc.interact(1, "scan").contains("Threat Assessment: HOSTILE"));
        assert!(npc.interact(1, "deactivate").starts_with("ERROR"));
        assert_eq!(npc.interact(1, "stand down"), "Unable to comply - threat level too high.");
    }

    #[test]
    fn test_death_salvage() {
        let mut npc = SecurityBotFactory.create_instance(50, 3, &mut FixedDice::quiet());
        let mut player = Player::new(1, "Ren", Race::Human, CharacterClass::Hacker);
        let before = player.credits;
        let lines = npc.on_death(Some(&mut player), &mut FixedDice::quiet());

        // 10 + 0 for the kill, 50 + 30 + 0 salvage
        assert_eq!(player.credits, before + 90);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("salvages 80 credits"));
    }

    #[test]
    fn test_dead_bot_is_motionless() {
        let mut npc = SecurityBotFactory.create_instance(50, 1, &mut FixedDice::quiet());
        npc.body.entity.apply_damage(10_000);
        assert!(npc.interact(1, "hack").contains("lies motionless"));
    }
}
