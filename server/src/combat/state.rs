//! Per-entity combat session record.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use mud_shared::{BASE_ATTACK_COOLDOWN_MS, COMBAT_TIMEOUT_MS};

use crate::entities::EntityId;

/// Speed at which the attack cooldown equals the base cooldown
const NORMAL_SPEED: f64 = 50.0;

/// Combat status, timers and statistics of one entity
#[derive(Debug, Clone)]
pub struct CombatState {
    in_combat: bool,
    current_target: Option<EntityId>,
    attackers: BTreeSet<EntityId>,

    last_attack: Option<Instant>,
    combat_start: Option<Instant>,
    last_combat_action: Option<Instant>,
    attack_cooldown: Duration,

    auto_attack: bool,
    stunned: bool,
    fleeing: bool,

    damage_dealt: HashMap<EntityId, u32>,
    damage_taken: HashMap<EntityId, u32>,
    total_damage_dealt: u32,
    total_damage_taken: u32,
    critical_hits: u32,
    dodges: u32,
}

impl Default for CombatState {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatState {
    pub fn new() -> Self {
        Self {
            in_combat: false,
            current_target: None,
            attackers: BTreeSet::new(),
            last_attack: None,
            combat_start: None,
            last_combat_action: None,
            attack_cooldown: Duration::from_millis(BASE_ATTACK_COOLDOWN_MS),
            auto_attack: false,
            stunned: false,
            fleeing: false,
            damage_dealt: HashMap::new(),
            damage_taken: HashMap::new(),
            total_damage_dealt: 0,
            total_damage_taken: 0,
            critical_hits: 0,
            dodges: 0,
        }
    }

    /// Whether an attack is admitted right now
    pub fn can_attack(&self) -> bool {
        self.can_attack_at(Instant::now())
    }

    /// Whether an attack would be admitted at `now`: not stunned, not fleeing,
    /// and the cooldown since the last attack has elapsed.
    pub fn can_attack_at(&self, now: Instant) -> bool {
        if self.stunned || self.fleeing {
            return false;
        }
        match self.last_attack {
            Some(last) => now.saturating_duration_since(last) >= self.attack_cooldown,
            None => true,
        }
    }

    /// Recompute the cooldown from the speed attribute. Faster entities
    /// attack more often, within half to double the base cooldown.
    pub fn update_attack_cooldown(&mut self, speed: i32) {
        let modifier = (NORMAL_SPEED / f64::from(speed.max(1))).clamp(0.5, 2.0);
        self.attack_cooldown = Duration::from_secs_f64(BASE_ATTACK_COOLDOWN_MS as f64 * modifier / 1000.0);
    }

    pub fn enter_combat(&mut self, target: EntityId) {
        self.enter_combat_at(target, Instant::now());
    }

    pub fn enter_combat_at(&mut self, target: EntityId, now: Instant) {
        self.in_combat = true;
        self.current_target = Some(target);
        self.combat_start = Some(now);
        self.last_combat_action = Some(now);
    }

    /// Leave combat. Clears the target, attackers and flags, and resets the
    /// session statistics.
    pub fn exit_combat(&mut self) {
        self.in_combat = false;
        self.current_target = None;
        self.attackers.clear();
        self.auto_attack = false;
        self.fleeing = false;
        self.reset_statistics();
    }

    fn reset_statistics(&mut self) {
        self.combat_start = None;
        self.damage_dealt.clear();
        self.damage_taken.clear();
        self.total_damage_dealt = 0;
        self.total_damage_taken = 0;
        self.critical_hits = 0;
        self.dodges = 0;
    }

    pub fn record_damage_dealt(&mut self, target: EntityId, amount: u32) {
        self.record_damage_dealt_at(target, amount, Instant::now());
    }

    pub fn record_damage_dealt_at(&mut self, target: EntityId, amount: u32, now: Instant) {
        *self.damage_dealt.entry(target).or_insert(0) += amount;
        self.total_damage_dealt += amount;
        self.last_combat_action = Some(now);
    }

    pub fn record_damage_taken(&mut self, attacker: EntityId, amount: u32) {
        self.record_damage_taken_at(attacker, amount, Instant::now());
    }

    pub fn record_damage_taken_at(&mut self, attacker: EntityId, amount: u32, now: Instant) {
        *self.damage_taken.entry(attacker).or_insert(0) += amount;
        self.total_damage_taken += amount;
        self.last_combat_action = Some(now);
    }

    /// Whether combat has gone idle long enough to be dropped. The caller
    /// decides whether to act on it.
    pub fn should_timeout_combat(&self) -> bool {
        self.should_timeout_combat_at(Instant::now())
    }

    pub fn should_timeout_combat_at(&self, now: Instant) -> bool {
        if !self.in_combat {
            return false;
        }
        let timeout = Duration::from_millis(COMBAT_TIMEOUT_MS);
        match self.last_combat_action {
            Some(last) => now.saturating_duration_since(last) >= timeout,
            None => true,
        }
    }

    pub fn add_attacker(&mut self, attacker: EntityId) {
        self.add_attacker_at(attacker, Instant::now());
    }

    pub fn add_attacker_at(&mut self, attacker: EntityId, now: Instant) {
        self.attackers.insert(attacker);
        self.last_combat_action = Some(now);
    }

    /// Drop an attacker. Losing the last one while not fleeing ends combat.
    pub fn remove_attacker(&mut self, attacker: EntityId) {
        self.attackers.remove(&attacker);
        if self.attackers.is_empty() && !self.fleeing {
            self.exit_combat();
        }
    }

    /// Stamp a landed attack; starts the cooldown
    pub fn mark_attack(&mut self, now: Instant) {
        self.last_attack = Some(now);
    }

    pub fn increment_critical_hits(&mut self) {
        self.critical_hits += 1;
    }

    pub fn increment_dodges(&mut self) {
        self.dodges += 1;
    }

    /// Point the session at a different opponent without resetting it
    pub fn set_current_target(&mut self, target: Option<EntityId>) {
        self.current_target = target;
    }

    pub fn is_in_combat(&self) -> bool {
        self.in_combat
    }

    pub fn current_target(&self) -> Option<EntityId> {
        self.current_target
    }

    pub fn attackers(&self) -> &BTreeSet<EntityId> {
        &self.attackers
    }

    pub fn is_auto_attack(&self) -> bool {
        self.auto_attack
    }

    pub fn set_auto_attack(&mut self, auto_attack: bool) {
        self.auto_attack = auto_attack;
    }

    pub fn is_stunned(&self) -> bool {
        self.stunned
    }

    pub fn set_stunned(&mut self, stunned: bool) {
        self.stunned = stunned;
    }

    pub fn is_fleeing(&self) -> bool {
        self.fleeing
    }

    pub fn set_fleeing(&mut self, fleeing: bool) {
        self.fleeing = fleeing;
    }

    pub fn last_attack(&self) -> Option<Instant> {
        self.last_attack
    }

    pub fn combat_start(&self) -> Option<Instant> {
        self.combat_start
    }

    pub fn attack_cooldown(&self) -> Duration {
        self.attack_cooldown
    }

    pub fn damage_dealt_to(&self, target: EntityId) -> u32 {
        self.damage_dealt.get(&target).copied().unwrap_or(0)
    }

    pub fn damage_taken_from(&self, attacker: EntityId) -> u32 {
        self.damage_taken.get(&attacker).copied().unwrap_or(0)
    }

    pub fn total_damage_dealt(&self) -> u32 {
        self.total_damage_dealt
    }

    pub fn total_damage_taken(&self) -> u32 {
        self.total_damage_taken
    }

    pub fn critical_hits(&self) -> u32 {
        self.critical_hits
    }

    pub fn dodges(&self) -> u32 {
        self.dodges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_scales_with_speed() {
        let mut state = CombatState::new();

        state.update_attack_cooldown(50);
        assert_eq!(state.attack_cooldown(), Duration::from_millis(2000));

        state.update_attack_cooldown(100);
        assert_eq!(state.attack_cooldown(), Duration::from_millis(1000));

        // Clamped at both ends
        state.update_attack_cooldown(1000);
        assert_eq!(state.attack_cooldown(), Duration::from_millis(1000));
        state.update_attack_cooldown(10);
        assert_eq!(state.attack_cooldown(), Duration::from_millis(4000));
        state.update_attack_cooldown(0);
        assert_eq!(state.attack_cooldown(), Duration::from_millis(4000));
    }

    #[test]
    fn test_can_attack_waits_for_cooldown() {
        let mut state = CombatState::new();
        state.update_attack_cooldown(50);
        let now = Instant::now();
        assert!(state.can_attack_at(now));

        state.mark_attack(now);
        assert!(!state.can_attack_at(now));
        assert!(!state.can_attack_at(now + Duration::from_millis(1999)));
        assert!(state.can_attack_at(now + Duration::from_millis(2000)));
    }

    #[test]
    fn test_stunned_or_fleeing_blocks_attacks() {
        let mut state = CombatState::new();
        state.set_stunned(true);
        assert!(!state.can_attack());
        state.set_stunned(false);
        state.set_fleeing(true);
        assert!(!state.can_attack());
        state.set_fleeing(false);
        assert!(state.can_attack());
    }

    #[test]
    fn test_exit_combat_resets_session() {
        let mut state = CombatState::new();
        state.enter_combat(2);
        state.add_attacker(2);
        state.add_attacker(3);
        state.set_auto_attack(true);
        state.set_fleeing(true);
        state.record_damage_dealt(2, 12);
        state.record_damage_taken(3, 5);
        state.increment_critical_hits();
        state.increment_dodges();

        state.exit_combat();

        assert!(!state.is_in_combat());
        assert_eq!(state.current_target(), None);
        assert!(state.attackers().is_empty());
        assert!(!state.is_auto_attack());
        assert!(!state.is_fleeing());
        assert_eq!(state.total_damage_dealt(), 0);
        assert_eq!(state.total_damage_taken(), 0);
        assert_eq!(state.damage_dealt_to(2), 0);
        assert_eq!(state.damage_taken_from(3), 0);
        assert_eq!(state.critical_hits(), 0);
        assert_eq!(state.dodges(), 0);
    }

    #[test]
    fn test_removing_last_attacker_ends_combat() {
        let mut state = CombatState::new();
        state.enter_combat(7);
        state.add_attacker(7);
        state.add_attacker(8);

        state.remove_attacker(7);
        assert!(state.is_in_combat());

        state.remove_attacker(8);
        assert!(!state.is_in_combat());
        assert_eq!(state.current_target(), None);
    }

    #[test]
    fn test_fleeing_keeps_combat_when_attackers_leave() {
        let mut state = CombatState::new();
        state.enter_combat(7);
        state.add_attacker(7);
        state.set_fleeing(true);

        state.remove_attacker(7);
        assert!(state.is_in_combat());
        assert!(state.attackers().is_empty());
    }

    #[test]
    fn test_per_opponent_statistics() {
        let mut state = CombatState::new();
        state.record_damage_dealt(4, 6);
        state.record_damage_dealt(4, 3);
        state.record_damage_dealt(5, 1);
        state.record_damage_taken(4, 2);

        assert_eq!(state.damage_dealt_to(4), 9);
        assert_eq!(state.damage_dealt_to(5), 1);
        assert_eq!(state.total_damage_dealt(), 10);
        assert_eq!(state.total_damage_taken(), 2);
    }

    #[test]
    fn test_combat_timeout_is_polled() {
        let mut state = CombatState::new();
        let now = Instant::now();
        assert!(!state.should_timeout_combat_at(now + Duration::from_secs(60)));

        state.enter_combat_at(1, now);
        assert!(!state.should_timeout_combat_at(now + Duration::from_millis(9_999)));
        assert!(state.should_timeout_combat_at(now + Duration::from_millis(COMBAT_TIMEOUT_MS)));

        // Any recorded action pushes the deadline out
        state.record_damage_taken_at(1, 3, now + Duration::from_secs(8));
        assert!(!state.should_timeout_combat_at(now + Duration::from_secs(12)));
        // Polling alone changes nothing
        assert!(state.is_in_combat());
    }
}
