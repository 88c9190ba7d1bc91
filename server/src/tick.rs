//! Global tick driver.
//!
//! Each tick runs NPC behaviors, player auto-attacks, combat timeouts, dead
//! NPC cleanup and the spawner's respawn check, in that order. A tick always
//! finishes before the next one starts.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use mud_shared::TICK_INTERVAL_MS;

use crate::combat;
use crate::entities::EntityId;
use crate::npc::{NpcAction, TickContext};
use crate::world::{ActorRef, NpcSpawner, World};

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub npcs_ticked: usize,
    /// NPCs whose tick panicked
    pub npc_faults: usize,
    pub auto_attacks: usize,
    /// Player auto-attacks that panicked
    pub auto_attack_faults: usize,
    /// Timeout, cleanup or respawn phases that panicked
    pub phase_faults: usize,
    pub combats_ended: usize,
    pub npcs_removed: usize,
    pub npcs_respawned: usize,
}

pub struct TickScheduler {
    spawner: Arc<NpcSpawner>,
    period: Duration,
    tick_count: AtomicU64,
}

impl TickScheduler {
    pub fn new(spawner: Arc<NpcSpawner>) -> Self {
        Self::with_period(spawner, Duration::from_millis(TICK_INTERVAL_MS))
    }

    pub fn with_period(spawner: Arc<NpcSpawner>, period: Duration) -> Self {
        Self {
            spawner,
            period,
            tick_count: AtomicU64::new(0),
        }
    }

    pub fn world(&self) -> &Arc<World> {
        self.spawner.world()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> TickReport {
        self.tick_at(Instant::now())
    }

    /// Run one full tick as of `now`
    pub fn tick_at(&self, now: Instant) -> TickReport {
        let mut report = TickReport {
            tick: self.tick_count.fetch_add(1, Ordering::Relaxed),
            ..TickReport::default()
        };

        for npc in self.world().active_npcs() {
            report.npcs_ticked += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.tick_npc(&npc, now)));
            if outcome.is_err() {
                report.npc_faults += 1;
                error!("NPC tick panicked; continuing with the rest of the tick");
            }
        }

        let (attacks, attack_faults) = self.process_auto_attacks(now);
        report.auto_attacks = attacks;
        report.auto_attack_faults = attack_faults;

        let mut phase_faults = 0;
        report.combats_ended = guarded("timeout", &mut phase_faults, || self.process_timeouts(now));
        report.npcs_removed = guarded("cleanup", &mut phase_faults, || self.remove_dead_npcs());
        report.npcs_respawned = guarded("respawn", &mut phase_faults, || self.spawner.handle_respawns_at(now));
        report.phase_faults = phase_faults;

        if report.npc_faults + report.auto_attack_faults + report.phase_faults > 0
            || report.npcs_removed > 0
            || report.npcs_respawned > 0
        {
            debug!("{:?}", report);
        }
        report
    }

    fn tick_npc(&self, npc: &ActorRef, now: Instant) {
        let world = self.world();
        let (id, room_id) = {
            let guard = npc.lock();
            (guard.id(), guard.entity().room)
        };
        let Some(room) = room_id.and_then(|r| world.map.room(r)) else {
            return;
        };

        let players = world.living_players_in(room.id);
        let exits = room.exit_directions();
        let ctx = TickContext {
            now,
            room_name: &room.name,
            players: &players,
            exits: &exits,
        };

        let actions = {
            let mut guard = npc.lock();
            match guard.as_npc_mut() {
                Some(npc) => world.roll(|dice| npc.on_tick(&ctx, dice)),
                None => Vec::new(),
            }
        };

        for action in actions {
            match action {
                NpcAction::Attack(target) => {
                    let outcome = combat::attack_at(world, id, target, now);
                    debug!("NPC {} attacks {}: {:?}", id, target, outcome);
                    if let Some(npc) = npc.lock().as_npc_mut() {
                        npc.attack_resolved(&outcome);
                    }
                }
                NpcAction::Say(line) => world.narrate_room(room.id, &line),
                NpcAction::Move(direction) => {
                    if let Err(e) = world.move_actor(id, direction) {
                        debug!("NPC {} could not move {}: {}", id, direction, e);
                    }
                }
            }
        }
    }

    /// Swing for every online player with auto-attack on. A target that died,
    /// left or vanished ends the player's combat instead. Returns the hits
    /// landed and the swings that panicked.
    fn process_auto_attacks(&self, now: Instant) -> (usize, usize) {
        let world = self.world();
        let mut attacks = 0;
        let mut faults = 0;

        for id in world.player_ids() {
            let snapshot = world
                .with_actor(id, |actor| {
                    let online = actor.as_player().map(|p| p.online).unwrap_or(false);
                    let entity = actor.entity();
                    if !online || entity.is_dead() || !entity.combat.is_auto_attack() {
                        return None;
                    }
                    Some((entity.combat.current_target(), entity.room, entity.combat.can_attack_at(now)))
                })
                .flatten();
            let Some((target, room, ready)) = snapshot else {
                continue;
            };

            if !target_is_valid(world, target, room) {
                if let Some(actor) = world.actor(id) {
                    actor.lock().entity_mut().combat.exit_combat();
                }
                world.narrate_player(id, "You are no longer in combat.");
                continue;
            }

            if ready {
                if let Some(target) = target {
                    match panic::catch_unwind(AssertUnwindSafe(|| combat::attack_at(world, id, target, now))) {
                        Ok(outcome) if outcome.is_success() => attacks += 1,
                        Ok(_) => {}
                        Err(_) => {
                            faults += 1;
                            error!("Auto-attack by {} on {} panicked; continuing with the rest of the tick", id, target);
                        }
                    }
                }
            }
        }
        (attacks, faults)
    }

    /// End combat for anyone who has gone quiet too long
    fn process_timeouts(&self, now: Instant) -> usize {
        let world = self.world();
        let mut ended = 0;

        for id in world.player_ids().into_iter().chain(world.npc_ids()) {
            let Some(actor) = world.actor(id) else {
                continue;
            };
            let mut guard = actor.lock();
            if guard.entity().combat.should_timeout_combat_at(now) {
                guard.entity_mut().combat.exit_combat();
                ended += 1;
                debug!("{} left combat after going idle", guard.name());
            }
        }
        ended
    }

    fn remove_dead_npcs(&self) -> usize {
        let world = self.world();
        let dead: Vec<EntityId> = world
            .npc_ids()
            .into_iter()
            .filter(|id| world.with_actor(*id, |a| a.entity().is_dead()).unwrap_or(false))
            .collect();
        dead.iter().filter(|id| self.spawner.remove_npc(**id)).count()
    }

    /// Drive ticks at the configured period until `shutdown` flips to true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Tick scheduler running every {:?}", self.period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if panic::catch_unwind(AssertUnwindSafe(|| self.tick())).is_err() {
                        error!("Tick {} panicked; scheduler keeps running", self.tick_count());
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Tick scheduler stopped after {} ticks", self.tick_count());
    }
}

/// Run one tick phase, turning a panic into a logged fault and a zero count
fn guarded(phase: &str, faults: &mut usize, f: impl FnOnce() -> usize) -> usize {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(count) => count,
        Err(_) => {
            *faults += 1;
            error!("Tick {} phase panicked; continuing with the rest of the tick", phase);
            0
        }
    }
}

fn target_is_valid(world: &World, target: Option<EntityId>, room: Option<crate::world::RoomId>) -> bool {
    let Some(target) = target else {
        return false;
    };
    world
        .with_actor(target, |t| !t.entity().is_dead() && room.is_some() && t.entity().room == room)
        .unwrap_or(false)
}
