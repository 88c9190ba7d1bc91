//! Combat resolution.
//!
//! [`attack`] is the single entry point used by player commands, NPC intents
//! and the auto-attack tick. It re-checks liveness, cooldown and co-location
//! under both entities' locks, so two attackers racing for the same victim
//! never hit a corpse.

mod state;

pub use state::CombatState;

use std::fmt;
use std::time::Instant;

use log::debug;

use mud_shared::Attribute;

use crate::dice::Dice;
use crate::entities::{Actor, CombatEntity, EntityId};
use crate::world::World;

/// Verbs NPCs pick from when narrating a hit
const NPC_ATTACK_VERBS: [&str; 3] = ["strikes", "attacks", "hits"];

/// Why an attack was not carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackRejection {
    UnknownTarget,
    SelfTarget,
    AttackerDead,
    TargetDead,
    /// Stunned, fleeing or still cooling down
    NotReady,
    NotInSameRoom,
}

impl fmt::Display for AttackRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnknownTarget => "There is nothing like that to attack.",
            Self::SelfTarget => "You can't attack yourself.",
            Self::AttackerDead => "You are in no state to fight.",
            Self::TargetDead => "Your target is already dead.",
            Self::NotReady => "You're not ready to attack yet!",
            Self::NotInSameRoom => "Your target is not here.",
        };
        f.write_str(text)
    }
}

/// Result of one attack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Hit { damage: u32, critical: bool, killed: bool },
    Dodged,
    Rejected(AttackRejection),
}

impl AttackOutcome {
    /// Whether the attack landed
    pub fn is_success(&self) -> bool {
        matches!(self, AttackOutcome::Hit { .. })
    }
}

/// Attack `target_id` with `attacker_id`
pub fn attack(world: &World, attacker_id: EntityId, target_id: EntityId) -> AttackOutcome {
    attack_at(world, attacker_id, target_id, Instant::now())
}

pub fn attack_at(world: &World, attacker_id: EntityId, target_id: EntityId, now: Instant) -> AttackOutcome {
    if attacker_id == target_id {
        return AttackOutcome::Rejected(AttackRejection::SelfTarget);
    }
    let (Some(attacker), Some(target)) = (world.actor(attacker_id), world.actor(target_id)) else {
        return AttackOutcome::Rejected(AttackRejection::UnknownTarget);
    };
    let Some((mut a, mut t)) = world.lock_pair(&attacker, &target) else {
        return AttackOutcome::Rejected(AttackRejection::SelfTarget);
    };
    resolve_attack(world, &mut a, &mut t, now)
}

fn check_legal(attacker: &Actor, target: &Actor, now: Instant) -> Result<(), AttackRejection> {
    let a = attacker.entity();
    let t = target.entity();
    if a.id == t.id {
        return Err(AttackRejection::SelfTarget);
    }
    if a.is_dead() {
        return Err(AttackRejection::AttackerDead);
    }
    if t.is_dead() {
        return Err(AttackRejection::TargetDead);
    }
    if !a.combat.can_attack_at(now) {
        return Err(AttackRejection::NotReady);
    }
    if a.room.is_none() || a.room != t.room {
        return Err(AttackRejection::NotInSameRoom);
    }
    Ok(())
}

/// Raw damage before the defender's mitigation
fn roll_base_damage(attacker: &Actor, dice: &mut dyn Dice) -> u32 {
    let entity = attacker.entity();
    let strength = entity.attribute(Attribute::Strength).max(0);
    let mut damage = strength / 2;

    if attacker.as_npc().is_some() {
        damage += entity.level as i32 * 2;
        let variance = damage / 4;
        damage += dice.range(-variance, variance);
    }

    if let Some((min, max)) = attacker.equipped_weapon().and_then(|w| w.damage_range()) {
        damage += dice.range(min as i32, max as i32);
    }

    damage.max(0) as u32
}

/// Resolve an attack between two already-locked entities
pub fn resolve_attack(world: &World, attacker: &mut Actor, target: &mut Actor, now: Instant) -> AttackOutcome {
    if let Err(rejection) = check_legal(attacker, target, now) {
        debug!("{} cannot attack {}: {:?}", attacker.name(), target.name(), rejection);
        return AttackOutcome::Rejected(rejection);
    }

    let attacker_id = attacker.id();
    let target_id = target.id();
    let Some(room) = attacker.entity().room else {
        return AttackOutcome::Rejected(AttackRejection::NotInSameRoom);
    };

    let (raw, critical, dodged) = world.roll(|dice| {
        let mut raw = roll_base_damage(attacker, dice);
        let luck = f64::from(attacker.entity().attribute(Attribute::Luck));
        let critical = dice.percent() <= luck * 0.5;
        if critical {
            raw *= 2;
        }
        let agility = f64::from(target.entity().attribute(Attribute::Agility));
        let dodged = dice.percent() <= agility * 0.3;
        (raw, critical, dodged)
    });

    if dodged {
        target.entity_mut().combat.increment_dodges();
        world.narrate_room(
            room,
            &format!("{} tries to attack {}, but they dodge!", attacker.name(), target.name()),
        );
        return AttackOutcome::Dodged;
    }

    let result = target.damage(raw.max(1));

    {
        let a = attacker.entity_mut();
        a.combat.record_damage_dealt_at(target_id, result.dealt, now);
        a.combat.mark_attack(now);
        if critical {
            a.combat.increment_critical_hits();
        }
        if !a.combat.is_in_combat() {
            a.combat.enter_combat_at(target_id, now);
        }
    }
    {
        let t = target.entity_mut();
        t.combat.record_damage_taken_at(attacker_id, result.dealt, now);
        if !t.combat.is_in_combat() {
            t.combat.enter_combat_at(attacker_id, now);
        }
        t.combat.add_attacker_at(attacker_id, now);
    }

    let verb = if attacker.is_player() {
        if critical { "critically hits" } else { "hits" }.to_string()
    } else {
        world.roll(|dice| NPC_ATTACK_VERBS[dice.index(NPC_ATTACK_VERBS.len())].to_string())
    };
    world.narrate_room(
        room,
        &format!(
            "{} {} {} for {}{} damage!",
            attacker.name(),
            verb,
            target.name(),
            result.dealt,
            if critical { " CRITICAL" } else { "" }
        ),
    );

    if result.died {
        handle_death(world, room, attacker, target);
    } else if let Some(status) = health_status(target.entity()) {
        world.narrate_room(room, &status);
    }

    AttackOutcome::Hit {
        damage: result.dealt,
        critical,
        killed: result.died,
    }
}

/// Health line shown once a defender drops to half health or below
fn health_status(target: &CombatEntity) -> Option<String> {
    let percent = target.health_percent();
    if percent <= 25 {
        Some(format!(
            "{} is critically wounded! ({}/{} HP)",
            target.name,
            target.health(),
            target.max_health()
        ))
    } else if percent <= 50 {
        Some(format!("{} is badly hurt. ({}/{} HP)", target.name, target.health(), target.max_health()))
    } else {
        None
    }
}

fn handle_death(world: &World, room: crate::world::RoomId, killer: &mut Actor, victim: &mut Actor) {
    let victim_id = victim.id();
    match victim {
        Actor::Player(player) => {
            let lost = player.on_death();
            world.narrate_room(room, &format!("{} has been defeated!", player.full_name()));
            if lost > 0 {
                world.narrate_player(victim_id, &format!("You lose {} credits.", lost));
            }
        }
        Actor::Npc(npc) => {
            let lines = world.roll(|dice| npc.on_death(killer.as_player_mut(), dice));
            for line in lines {
                world.narrate_room(room, &line);
            }
        }
    }
    release_opponent(killer.entity_mut(), victim_id);
}

/// Everyone this entity is fighting with
pub fn opponents_of(entity: &CombatEntity) -> Vec<EntityId> {
    let mut opponents: Vec<EntityId> = entity.combat.attackers().iter().copied().collect();
    if let Some(target) = entity.combat.current_target() {
        if !opponents.contains(&target) {
            opponents.push(target);
        }
    }
    opponents
}

/// Forget an opponent that died, fled or left. If it was the current target,
/// switch to another attacker or leave combat.
pub fn release_opponent(entity: &mut CombatEntity, gone: EntityId) {
    let combat = &mut entity.combat;
    if combat.attackers().contains(&gone) {
        combat.remove_attacker(gone);
    }
    if combat.current_target() == Some(gone) {
        match combat.attackers().iter().next().copied() {
            Some(next) => combat.set_current_target(Some(next)),
            None => combat.exit_combat(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use mud_shared::{find_item_definition, EventKind, COMBAT_KNIFE};

    use crate::dice::FixedDice;
    use crate::entities::{next_entity_id, NpcState};
    use crate::npc::StreetThugFactory;
    use crate::world::tests::{spawn_player, test_world};
    use crate::world::SpawnableNpc;

    fn set_attr(world: &World, id: EntityId, attr: Attribute, value: i32) {
        world.actor(id).unwrap().lock().entity_mut().set_attribute(attr, value);
    }

    fn health(world: &World, id: EntityId) -> u32 {
        world.with_actor(id, |a| a.entity().health()).unwrap()
    }

    /// Attacker with strength 20 and defender with constitution 10 at 50 health
    fn duel(world: &World, room: crate::world::RoomId) -> (EntityId, EntityId) {
        let a = spawn_player(world, "Ren", room);
        let d = spawn_player(world, "Kai", room);
        set_attr(world, a, Attribute::Strength, 20);
        set_attr(world, d, Attribute::Constitution, 10);
        set_attr(world, d, Attribute::Agility, 10);
        world.actor(d).unwrap().lock().entity_mut().set_health(50);
        (a, d)
    }

    #[test]
    fn test_plain_hit_scenario() {
        let (world, _, west, _) = test_world();
        let (a, d) = duel(&world, west);

        let outcome = attack(&world, a, d);
        assert_eq!(outcome, AttackOutcome::Hit { damage: 8, critical: false, killed: false });
        assert_eq!(health(&world, d), 42);

        let actor = world.actor(a).unwrap();
        let attacker = actor.lock();
        assert_eq!(attacker.entity().combat.damage_dealt_to(d), 8);
        assert_eq!(attacker.entity().combat.current_target(), Some(d));
        drop(attacker);

        let defender = world.actor(d).unwrap();
        let defender = defender.lock();
        assert!(defender.entity().combat.attackers().contains(&a));
        assert_eq!(defender.entity().combat.total_damage_taken(), 8);
        assert!(defender.entity().combat.is_in_combat());
    }

    #[test]
    fn test_forced_dodge_scenario() {
        let (world, sink, west, _) = test_world();
        let (a, d) = duel(&world, west);
        set_attr(&world, d, Attribute::Agility, 400);

        let outcome = attack(&world, a, d);
        assert_eq!(outcome, AttackOutcome::Dodged);
        assert!(!outcome.is_success());
        assert_eq!(health(&world, d), 50);

        let defender = world.actor(d).unwrap();
        let defender = defender.lock();
        assert_eq!(defender.entity().combat.dodges(), 1);
        assert_eq!(defender.entity().combat.total_damage_taken(), 0);
        drop(defender);
        assert!(sink
            .messages_for(EventKind::Room, "West Hall")
            .contains(&"Ren tries to attack Kai, but they dodge!".to_string()));
    }

    #[test]
    fn test_cooldown_gates_next_attack() {
        let (world, _, west, _) = test_world();
        let (a, d) = duel(&world, west);
        let now = Instant::now();

        assert!(attack_at(&world, a, d, now).is_success());
        let snapshot = |id: EntityId| {
            world
                .with_actor(id, |x| {
                    let combat = &x.entity().combat;
                    (
                        combat.is_in_combat(),
                        combat.current_target(),
                        combat.attackers().clone(),
                        combat.total_damage_dealt(),
                        combat.total_damage_taken(),
                        combat.critical_hits(),
                        combat.last_attack(),
                    )
                })
                .unwrap()
        };
        let (attacker_before, defender_before) = (snapshot(a), snapshot(d));

        let blocked = attack_at(&world, a, d, now + Duration::from_millis(10));
        assert_eq!(blocked, AttackOutcome::Rejected(AttackRejection::NotReady));
        assert_eq!(health(&world, d), 42);
        assert_eq!(snapshot(a), attacker_before);
        assert_eq!(snapshot(d), defender_before);

        let cooldown = world.with_actor(a, |x| x.entity().combat.attack_cooldown()).unwrap();
        assert!(attack_at(&world, a, d, now + cooldown).is_success());
        assert_eq!(health(&world, d), 34);
    }

    #[test]
    fn test_illegal_attacks_change_nothing() {
        let (world, _, west, east) = test_world();
        let (a, d) = duel(&world, west);
        let far = spawn_player(&world, "Far", east);

        assert_eq!(attack(&world, a, a), AttackOutcome::Rejected(AttackRejection::SelfTarget));
        assert_eq!(attack(&world, a, far), AttackOutcome::Rejected(AttackRejection::NotInSameRoom));
        assert_eq!(attack(&world, a, 999_999), AttackOutcome::Rejected(AttackRejection::UnknownTarget));

        world.actor(d).unwrap().lock().entity_mut().set_health(0);
        assert_eq!(attack(&world, a, d), AttackOutcome::Rejected(AttackRejection::TargetDead));

        let actor = world.actor(a).unwrap();
        let attacker = actor.lock();
        assert!(!attacker.entity().combat.is_in_combat());
        assert!(attacker.entity().combat.last_attack().is_none());
        assert_eq!(attacker.entity().combat.total_damage_dealt(), 0);
    }

    #[test]
    fn test_critical_hit_doubles_damage() {
        let (world, _, west, _) = test_world();
        let world = world.with_dice(Box::new(FixedDice {
            percent: 50.0,
            chance: false,
            pick_max: false,
        }));
        let (a, d) = duel(&world, west);
        // 50 <= 120 * 0.5 crits; 50 <= 10 * 0.3 does not dodge
        set_attr(&world, a, Attribute::Luck, 120);

        let outcome = attack(&world, a, d);
        assert_eq!(outcome, AttackOutcome::Hit { damage: 18, critical: true, killed: false });
        assert_eq!(world.with_actor(a, |x| x.entity().combat.critical_hits()), Some(1));
    }

    #[test]
    fn test_weapon_adds_to_damage() {
        let (world, _, west, _) = test_world();
        let (a, d) = duel(&world, west);
        world
            .actor(a)
            .unwrap()
            .lock()
            .as_player_mut()
            .unwrap()
            .equip(find_item_definition(COMBAT_KNIFE).unwrap())
            .unwrap();

        // 10 + knife min 2 - 2
        assert_eq!(attack(&world, a, d), AttackOutcome::Hit { damage: 10, critical: false, killed: false });
    }

    #[test]
    fn test_health_status_narration() {
        let (world, sink, west, _) = test_world();
        let (a, d) = duel(&world, west);
        world.actor(d).unwrap().lock().entity_mut().set_max_health(100);

        attack(&world, a, d);
        let lines = sink.messages_for(EventKind::Room, "West Hall");
        assert!(lines.contains(&"Ren hits Kai for 8 damage!".to_string()));
        assert!(lines.contains(&"Kai is badly hurt. (42/100 HP)".to_string()));
    }

    #[test]
    fn test_killing_a_player() {
        let (world, sink, west, _) = test_world();
        let (a, d) = duel(&world, west);
        world.actor(d).unwrap().lock().entity_mut().set_health(5);
        world.actor(d).unwrap().lock().as_player_mut().unwrap().credits = 100;

        let outcome = attack(&world, a, d);
        assert_eq!(outcome, AttackOutcome::Hit { damage: 5, critical: false, killed: true });

        let victim = world.actor(d).unwrap();
        let victim = victim.lock();
        assert_eq!(victim.as_player().unwrap().credits, 90);
        assert!(!victim.entity().combat.is_in_combat());
        drop(victim);
        assert!(!world.with_actor(a, |x| x.entity().combat.is_in_combat()).unwrap());
        assert!(sink
            .messages_for(EventKind::Room, "West Hall")
            .contains(&"Kai the Human Medic has been defeated!".to_string()));
        assert_eq!(attack(&world, a, d), AttackOutcome::Rejected(AttackRejection::TargetDead));
    }

    #[test]
    fn test_killing_an_npc_pays_out() {
        let (world, sink, west, _) = test_world();
        let a = spawn_player(&world, "Ren", west);
        set_attr(&world, a, Attribute::Strength, 400);
        let thug = world.roll(|dice| StreetThugFactory.create_instance(next_entity_id(), 1, dice));
        let thug_id = world.insert_npc(thug, west).unwrap();
        let before = world.with_actor(a, |x| x.as_player().unwrap().credits).unwrap();

        let outcome = attack(&world, a, thug_id);
        assert!(matches!(outcome, AttackOutcome::Hit { killed: true, .. }));
        assert_eq!(world.with_actor(a, |x| x.as_player().unwrap().credits), Some(before + 10));
        assert_eq!(world.with_actor(thug_id, |x| x.as_npc().unwrap().body.state), Some(NpcState::Dead));
        assert!(sink
            .messages_for(EventKind::Room, "West Hall")
            .iter()
            .any(|m| m.starts_with("Street Thug has been defeated! Ren gains")));
    }

    #[test]
    fn test_racing_killers_pay_out_once() {
        for _ in 0..20 {
            let (world, sink, west, _) = test_world();
            let killers = [spawn_player(&world, "Ren", west), spawn_player(&world, "Sol", west)];
            for id in killers {
                set_attr(&world, id, Attribute::Strength, 400);
            }
            let thug = world.roll(|dice| StreetThugFactory.create_instance(next_entity_id(), 1, dice));
            let thug_id = world.insert_npc(thug, west).unwrap();
            let credits = |id| world.with_actor(id, |x| x.as_player().unwrap().credits).unwrap();
            let before: u32 = killers.iter().map(|id| credits(*id)).sum();

            let barrier = std::sync::Barrier::new(killers.len());
            let outcomes: Vec<AttackOutcome> = std::thread::scope(|s| {
                let handles: Vec<_> = killers
                    .iter()
                    .map(|id| {
                        let (world, barrier) = (&world, &barrier);
                        s.spawn(move || {
                            barrier.wait();
                            attack(world, *id, thug_id)
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let kills = outcomes.iter().filter(|o| matches!(o, AttackOutcome::Hit { killed: true, .. })).count();
            assert_eq!(kills, 1, "{:?}", outcomes);
            assert!(outcomes.contains(&AttackOutcome::Rejected(AttackRejection::TargetDead)));
            let after: u32 = killers.iter().map(|id| credits(*id)).sum();
            assert_eq!(after, before + 10);
            let defeats = sink
                .messages_for(EventKind::Room, "West Hall")
                .iter()
                .filter(|m| m.starts_with("Street Thug has been defeated!"))
                .count();
            assert_eq!(defeats, 1);
        }
    }

    #[test]
    fn test_multiple_attackers_tracked() {
        let (world, _, west, _) = test_world();
        let (a, d) = duel(&world, west);
        let b = spawn_player(&world, "Sol", west);
        world.actor(d).unwrap().lock().entity_mut().set_max_health(500);
        world.actor(d).unwrap().lock().entity_mut().set_health(500);

        attack(&world, a, d);
        attack(&world, b, d);
        let attackers = world.with_actor(d, |x| x.entity().combat.attackers().clone()).unwrap();
        assert_eq!(attackers.len(), 2);
        // The defender keeps its first opponent as target
        assert_eq!(world.with_actor(d, |x| x.entity().combat.current_target()), Some(Some(a)));
    }

    #[test]
    fn test_release_opponent() {
        let mut entity = CombatEntity::new(1, "x", 1, 10, mud_shared::Attributes::new());
        entity.combat.enter_combat(2);
        entity.combat.add_attacker(2);
        entity.combat.add_attacker(3);

        release_opponent(&mut entity, 2);
        assert!(entity.combat.is_in_combat());
        assert_eq!(entity.combat.current_target(), Some(3));

        release_opponent(&mut entity, 3);
        assert!(!entity.combat.is_in_combat());
    }
}
