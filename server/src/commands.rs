//! Player command system.
//!
//! Commands are looked up by name in a [`CommandRegistry`] and run against
//! the shared [`World`] on behalf of one player. Bare directions (`n`,
//! `north`, ...) are treated as `move <direction>`.

use std::collections::BTreeMap;

use log::debug;

use mud_shared::{Attribute, Direction, EquipmentSlot};

use crate::combat::{self, AttackOutcome};
use crate::entities::{EntityId, NpcType};
use crate::world::World;

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was successful
    pub success: bool,
    /// Short status line
    pub message: String,
    /// Shown only to the acting player
    pub private_message: Option<String>,
    /// Narrated to the room the player was in when the command ran
    pub room_message: Option<String>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            private_message: None,
            room_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            private_message: None,
            room_message: None,
        }
    }

    pub fn with_private_message(mut self, message: impl Into<String>) -> Self {
        self.private_message = Some(message.into());
        self
    }

    pub fn with_room_message(mut self, message: impl Into<String>) -> Self {
        self.room_message = Some(message.into());
        self
    }

    /// What the acting player should see
    pub fn text(&self) -> &str {
        self.private_message.as_deref().unwrap_or(&self.message)
    }
}

pub type CommandHandler = fn(&World, EntityId, &[&str]) -> CommandResult;

struct RegisteredCommand {
    handler: CommandHandler,
    help: &'static str,
}

/// Name-keyed command table
pub struct CommandRegistry {
    commands: BTreeMap<String, RegisteredCommand>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CommandRegistry {
    /// An empty table
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// The built-in command set
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("attack", "attack <target> - Attack a target (alias: kill)", cmd_attack);
        registry.register("kill", "", cmd_attack);
        registry.register("autoattack", "autoattack - Toggle automatic attacks in combat", cmd_autoattack);
        registry.register("flee", "flee - Try to escape from combat; faster characters escape more often", cmd_flee);
        registry.register("move", "move <direction> - Walk through an exit (alias: go, or just the direction)", cmd_move);
        registry.register("go", "", cmd_move);
        registry.register("combat", "combat - Show your combat status and statistics", cmd_combat);
        registry.register("look", "look [npc] - Describe the room or someone in it", cmd_look);
        registry.register("talk", "talk <npc> [topic] - Talk to someone", cmd_talk);
        registry.register("use", "use <item> - Use an item from your inventory", cmd_use);
        registry.register("inventory", "inventory - List what you are carrying (alias: i)", cmd_inventory);
        registry.register("i", "", cmd_inventory);
        registry.register("get", "get <item> [amount] - Pick something up", cmd_get);
        registry.register("drop", "drop <item> [amount] - Put something down", cmd_drop);
        registry.register("equip", "equip <item> - Wear or wield an item from your inventory", cmd_equip);
        registry.register("unequip", "unequip <slot> - Take off whatever is in a slot", cmd_unequip);
        registry.register("equipment", "equipment - Show what you are wearing", cmd_equipment);
        registry.register("examine", "examine <target> - Look closely at yourself, someone or something", cmd_examine);
        registry.register("say", "say <message> - Speak to everyone in the room", cmd_say);
        registry
    }

    /// Add or replace a command. An empty help line hides it from `help`.
    pub fn register(&mut self, name: &str, help: &'static str, handler: CommandHandler) {
        self.commands
            .insert(name.to_lowercase(), RegisteredCommand { handler, help });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    pub fn help_text(&self) -> String {
        let mut help = String::from("Available commands:\n");
        help.push_str("  help - Show this help message\n");
        for command in self.commands.values().filter(|c| !c.help.is_empty()) {
            help.push_str(&format!("  {}\n", command.help));
        }
        help
    }

    /// Parse and run one line of input for `player`. The result's room
    /// message is narrated to the room the player started in.
    pub fn execute(&self, world: &World, player: EntityId, input: &str) -> CommandResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some((name, args)) = parts.split_first() else {
            return CommandResult::error("Say what?");
        };
        let name = name.to_lowercase();

        let Some(room) = world.with_actor(player, |a| a.entity().room) else {
            return CommandResult::error("You are not in the game.");
        };

        let result = if name == "help" {
            CommandResult::success(self.help_text())
        } else if let Some(command) = self.commands.get(&name) {
            (command.handler)(world, player, args)
        } else if Direction::from_command(&name).is_some() {
            cmd_move(world, player, &[name.as_str()])
        } else {
            CommandResult::error(format!("Unknown command: {}", name))
        };

        debug!("Player {} ran {:?}: success={}", player, input.trim(), result.success);
        if let (Some(message), Some(room)) = (&result.room_message, room) {
            world.narrate_room(room, message);
        }
        result
    }
}

// =============================================================================
// Combat Commands
// =============================================================================

fn cmd_attack(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return CommandResult::error("Who do you want to attack?");
    }

    let Some((room, can_attack, was_in_combat, full_name)) = world.with_actor(player, |a| {
        let combat = &a.entity().combat;
        let full_name = a.as_player().map(|p| p.full_name()).unwrap_or_default();
        (a.entity().room, combat.can_attack(), combat.is_in_combat(), full_name)
    }) else {
        return CommandResult::error("You are not in the game.");
    };
    if !can_attack {
        return CommandResult::error("You can't attack yet.");
    }
    let Some(room) = room else {
        return CommandResult::error("You are not in any room!");
    };

    let target_name = args.join(" ").to_lowercase();

    if let Some(target) = world.find_npc_in_room(room, &target_name) {
        let Some((name, dead, combatant)) = world.with_actor(target, |a| {
            let combatant = a.as_npc().map(|n| n.body.kind.is_combatant()).unwrap_or(false);
            (a.name().to_string(), a.entity().is_dead(), combatant)
        }) else {
            return CommandResult::error("You don't see them here.");
        };
        if dead {
            return CommandResult::error(format!("{} is already dead.", name));
        }
        if !combatant {
            return CommandResult::error(format!("You cannot attack {}.", name));
        }

        match combat::attack(world, player, target) {
            AttackOutcome::Hit { .. } => {}
            AttackOutcome::Dodged | AttackOutcome::Rejected(_) => {
                return CommandResult::error(format!("You failed to attack {}.", name));
            }
        }

        if let Some(actor) = world.player(player) {
            let mut guard = actor.lock();
            let combat = &mut guard.entity_mut().combat;
            // A killing blow has already ended the fight
            if combat.is_in_combat() {
                combat.set_current_target(Some(target));
                // The opening attack of a fight turns auto-attack on
                if !was_in_combat {
                    combat.set_auto_attack(true);
                }
            }
        }

        return CommandResult::success(format!("You attack {}!", name))
            .with_private_message(format!("You attack {}!", name))
            .with_room_message(format!("{} attacks {}!", full_name, name));
    }

    let other_player = world.map.room(room).and_then(|r| {
        r.players().into_iter().filter(|id| *id != player).find(|id| {
            world
                .with_actor(*id, |a| {
                    a.as_player()
                        .map(|p| p.full_name().to_lowercase().contains(&target_name))
                        .unwrap_or(false)
                })
                .unwrap_or(false)
        })
    });
    if other_player.is_some() {
        return CommandResult::error("PvP combat is not enabled.");
    }

    CommandResult::error("You don't see them here.")
}

fn cmd_autoattack(world: &World, player: EntityId, _args: &[&str]) -> CommandResult {
    let Some(actor) = world.player(player) else {
        return CommandResult::error("You are not in the game.");
    };
    let mut guard = actor.lock();
    let combat = &mut guard.entity_mut().combat;
    if !combat.is_in_combat() {
        return CommandResult::error("You are not in combat.");
    }
    let enabled = !combat.is_auto_attack();
    combat.set_auto_attack(enabled);
    CommandResult::success(if enabled { "Auto-attack enabled." } else { "Auto-attack disabled." })
}

fn cmd_flee(world: &World, player: EntityId, _args: &[&str]) -> CommandResult {
    let Some((in_combat, room, speed, full_name)) = world.with_actor(player, |a| {
        let entity = a.entity();
        let full_name = a.as_player().map(|p| p.full_name()).unwrap_or_default();
        (entity.combat.is_in_combat(), entity.room, entity.attribute(Attribute::Speed), full_name)
    }) else {
        return CommandResult::error("You are not in the game.");
    };
    if !in_combat {
        return CommandResult::error("You are not in combat.");
    }
    let Some(room) = room.and_then(|r| world.map.room(r)) else {
        return CommandResult::error("You are not in any room!");
    };
    let exits = room.exit_directions();
    if exits.is_empty() {
        return CommandResult::error("There's nowhere to flee to!");
    }

    // 40% base + 2% per speed, capped at 80%
    let flee_chance = (0.4 + f64::from(speed) * 0.02).min(0.8);
    let escape = world.roll(|dice| dice.chance(flee_chance).then(|| exits[dice.index(exits.len())]));

    let Some(direction) = escape else {
        return CommandResult {
            success: false,
            message: "You fail to escape!".to_string(),
            private_message: Some("You fail to escape!".to_string()),
            room_message: Some(format!("{} tries to flee but fails!", full_name)),
        };
    };

    let Some(actor) = world.player(player) else {
        return CommandResult::error("You are not in the game.");
    };
    let opponents = {
        let mut guard = actor.lock();
        guard.entity_mut().combat.set_fleeing(true);
        combat::opponents_of(guard.entity())
    };

    let destination = match world.move_actor(player, direction) {
        Ok(destination) => destination,
        Err(e) => {
            actor.lock().entity_mut().combat.set_fleeing(false);
            return CommandResult::error(e);
        }
    };

    actor.lock().entity_mut().combat.exit_combat();
    world.withdraw_from(player, opponents);

    let destination_name = world.room_name(destination).unwrap_or_default();
    CommandResult::success(format!("You flee {}.", direction))
        .with_private_message(format!("You successfully flee to {}!", destination_name))
        .with_room_message(format!("{} flees to the {}!", full_name, direction))
}

fn cmd_combat(world: &World, player: EntityId, _args: &[&str]) -> CommandResult {
    let Some((mut status, fight)) = world.with_actor(player, |a| {
        let entity = a.entity();
        let combat = &entity.combat;
        let mut status = String::from("=== Combat Status ===\n");

        if !combat.is_in_combat() {
            status.push_str("You are not in combat.\n");
            return (status, None);
        }

        status.push_str("Status: In Combat\n");
        status.push_str(&format!("Health: {}/{}\n", entity.health(), entity.max_health()));
        status.push_str(&format!(
            "Auto-Attack: {}\n",
            if combat.is_auto_attack() { "Enabled" } else { "Disabled" }
        ));
        let mut stats = String::new();
        push_combat_stats(&mut stats, combat);
        let attackers: Vec<EntityId> = combat.attackers().iter().copied().collect();
        (status, Some((combat.current_target(), attackers, stats)))
    }) else {
        return CommandResult::error("You are not in the game.");
    };

    // Opponents are looked up after the player's lock is released
    if let Some((target, attackers, stats)) = fight {
        if let Some((name, health, max)) = target.and_then(|t| {
            world.with_actor(t, |a| (a.name().to_string(), a.entity().health(), a.entity().max_health()))
        }) {
            status.push_str(&format!("\nCurrent Target: {}\n", name));
            status.push_str(&format!("Target Health: {}/{}\n", health, max));
        }

        let names: Vec<String> = attackers
            .iter()
            .filter_map(|id| world.with_actor(*id, |a| a.name().to_string()))
            .collect();
        if !names.is_empty() {
            status.push_str("\nCurrently attacked by:\n");
            for name in names {
                status.push_str(&format!("- {}\n", name));
            }
        }

        status.push_str("\nCurrent Combat Statistics:\n");
        status.push_str(&stats);

        status.push_str("\nCombat Commands:\n");
        status.push_str("- attack <target> - Attack a specific target\n");
        status.push_str("- flee - Attempt to escape combat\n");
        status.push_str("- autoattack - Toggle automatic attacks\n");
    }

    CommandResult::success(status)
}

fn push_combat_stats(out: &mut String, combat: &combat::CombatState) {
    out.push_str(&format!("Damage Dealt: {}\n", combat.total_damage_dealt()));
    out.push_str(&format!("Damage Taken: {}\n", combat.total_damage_taken()));
    out.push_str(&format!("Critical Hits: {}\n", combat.critical_hits()));
    out.push_str(&format!("Dodges: {}\n", combat.dodges()));
}

// =============================================================================
// Movement and Interaction
// =============================================================================

fn cmd_move(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    let Some(direction) = args.first().and_then(|d| Direction::from_command(d)) else {
        return CommandResult::error("Go where?");
    };
    if world.with_actor(player, |a| a.entity().is_dead()).unwrap_or(true) {
        return CommandResult::error("You are in no state to move.");
    }

    match world.move_actor(player, direction) {
        Ok(destination) => CommandResult::success(format!("You go {}.", direction))
            .with_private_message(world.describe_room(destination, Some(player))),
        Err(e) => CommandResult::error(e),
    }
}

fn cmd_look(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    let Some(room) = world.with_actor(player, |a| a.entity().room).flatten() else {
        return CommandResult::error("You are not in any room!");
    };
    if args.is_empty() {
        return CommandResult::success(world.describe_room(room, Some(player)));
    }

    let name = args.join(" ");
    let description = world.find_npc_in_room(room, &name).and_then(|id| {
        world
            .with_actor(id, |a| {
                a.as_npc()
                    .map(|n| format!("{}\n{}\n{}", n.name(), n.body.description, n.body.status_line()))
            })
            .flatten()
    });
    match description {
        Some(text) => CommandResult::success(text),
        None => CommandResult::error("You don't see them here."),
    }
}

fn cmd_talk(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    let Some((name, topic)) = args.split_first() else {
        return CommandResult::error("Talk to whom?");
    };
    let topic = if topic.is_empty() { "hello".to_string() } else { topic.join(" ") };

    let Some(room) = world.with_actor(player, |a| a.entity().room).flatten() else {
        return CommandResult::error("You are not in any room!");
    };
    let Some(npc) = world.find_npc_in_room(room, name).and_then(|id| world.npc(id)) else {
        return CommandResult::error("You don't see them here.");
    };

    let (npc_name, reply) = {
        let mut guard = npc.lock();
        match guard.as_npc_mut() {
            Some(npc) => (npc.name().to_string(), npc.interact(player, &topic)),
            None => return CommandResult::error("You don't see them here."),
        }
    };
    let speaker = world.with_actor(player, |a| a.name().to_string()).unwrap_or_default();

    CommandResult::success(reply.clone())
        .with_private_message(reply)
        .with_room_message(format!("{} talks to {}.", speaker, npc_name))
}

fn cmd_use(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return CommandResult::error("Use what?");
    }
    let wanted = args.join(" ").to_lowercase();
    let Some(actor) = world.player(player) else {
        return CommandResult::error("You are not in the game.");
    };
    let mut guard = actor.lock();
    let Some(p) = guard.as_player_mut() else {
        return CommandResult::error("You are not in the game.");
    };
    let Some(item_id) = p
        .inventory
        .stacks()
        .find(|stack| stack.item.name.to_lowercase().contains(&wanted))
        .map(|stack| stack.item.id)
    else {
        return CommandResult::error("You don't have that.");
    };

    match p.use_item(item_id) {
        Ok(message) => CommandResult::success(message),
        Err(message) => CommandResult::error(message),
    }
}

fn cmd_inventory(world: &World, player: EntityId, _args: &[&str]) -> CommandResult {
    let listing = world
        .with_actor(player, |a| {
            a.as_player().map(|p| {
                let mut out = format!("Credits: {}\n", p.credits);
                if p.inventory.is_empty() {
                    out.push_str("You are carrying nothing.");
                } else {
                    out.push_str("You are carrying:");
                    for stack in p.inventory.stacks() {
                        out.push_str(&format!("\n  {} x{}", stack.item.name, stack.quantity));
                    }
                }
                out
            })
        })
        .flatten();
    match listing {
        Some(text) => CommandResult::success(text),
        None => CommandResult::error("You are not in the game."),
    }
}

// =============================================================================
// Items and Equipment
// =============================================================================

/// Optional trailing amount; anything but a positive number is rejected
fn parse_amount(arg: Option<&&str>) -> Result<u32, CommandResult> {
    match arg {
        None => Ok(1),
        Some(raw) => match raw.parse::<u32>() {
            Ok(amount) if amount >= 1 => Ok(amount),
            _ => Err(CommandResult::error("Invalid amount specified.")),
        },
    }
}

fn cmd_get(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        return CommandResult::error("What do you want to get?");
    };
    let amount = match parse_amount(args.get(1)) {
        Ok(amount) => amount,
        Err(e) => return e,
    };
    let Some(room) = world.with_actor(player, |a| a.entity().room).flatten().and_then(|r| world.map.room(r)) else {
        return CommandResult::error("You are not in any room!");
    };
    let Some(actor) = world.player(player) else {
        return CommandResult::error("You are not in the game.");
    };

    let mut guard = actor.lock();
    let Some(p) = guard.as_player_mut() else {
        return CommandResult::error("You are not in the game.");
    };
    let taken = room.take_items(name, amount as usize);
    let Some(item_name) = taken.first().map(|item| item.name.clone()) else {
        return CommandResult::error("You don't see that here.");
    };

    // Whatever does not fit stays on the floor
    let mut picked = 0;
    for item in taken {
        if p.inventory.add(&item, 1) {
            picked += 1;
        } else {
            room.add_item(item);
        }
    }
    if picked == 0 {
        return CommandResult::error("Your inventory is full.");
    }

    let private = if picked > 1 {
        format!("You picked up {} {}", picked, item_name)
    } else {
        format!("You picked up {}", item_name)
    };
    CommandResult::success(private.clone())
        .with_private_message(private)
        .with_room_message(format!("{} picks up {}", p.full_name(), item_name))
}

fn cmd_drop(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        return CommandResult::error("What do you want to drop?");
    };
    let amount = match parse_amount(args.get(1)) {
        Ok(amount) => amount,
        Err(e) => return e,
    };
    let Some(room) = world.with_actor(player, |a| a.entity().room).flatten().and_then(|r| world.map.room(r)) else {
        return CommandResult::error("You are not in any room!");
    };
    let Some(actor) = world.player(player) else {
        return CommandResult::error("You are not in the game.");
    };

    let mut guard = actor.lock();
    let Some(p) = guard.as_player_mut() else {
        return CommandResult::error("You are not in the game.");
    };
    let Some(item) = p.inventory.find_by_name(name).map(|stack| stack.item.clone()) else {
        return CommandResult::error("You don't have that item.");
    };

    let dropped = p.inventory.remove(item.id, amount);
    for _ in 0..dropped {
        room.add_item(item.clone());
    }

    let private = if dropped > 1 {
        format!("You dropped {} {}", dropped, item.name)
    } else {
        format!("You dropped {}", item.name)
    };
    CommandResult::success(private.clone())
        .with_private_message(private)
        .with_room_message(format!("{} drops {}", p.full_name(), item.name))
}

fn cmd_equip(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return CommandResult::error("What do you want to equip?");
    }
    let wanted = args.join(" ").to_lowercase();
    let Some(actor) = world.player(player) else {
        return CommandResult::error("You are not in the game.");
    };

    let mut guard = actor.lock();
    let Some(p) = guard.as_player_mut() else {
        return CommandResult::error("You are not in the game.");
    };
    // Exact name first, then any partial match
    let item = p
        .inventory
        .stacks()
        .find(|stack| stack.item.name.to_lowercase() == wanted)
        .or_else(|| p.inventory.find_by_name(&wanted))
        .map(|stack| stack.item.clone());
    let Some(item) = item else {
        return CommandResult::error("You don't have that item.");
    };
    let Some(slot) = item.slot else {
        return CommandResult::error("That item cannot be equipped.");
    };
    if let Some(worn) = p.equipment.at(slot) {
        return CommandResult::error(format!(
            "You already have {} equipped in the {} slot. Unequip it first.",
            worn.name, slot
        ));
    }
    if item.level_required > p.entity.level {
        return CommandResult::error(format!("You need to be level {} to equip this item.", item.level_required));
    }

    if p.inventory.take_one(item.id).is_none() {
        return CommandResult::error("You don't have that item.");
    }
    if let Err(e) = p.equip(item.clone()) {
        p.inventory.add(&item, 1);
        return CommandResult::error(e);
    }

    let private = format!("You equipped {} in your {} slot.", item.name, slot);
    CommandResult::success(private.clone())
        .with_private_message(private)
        .with_room_message(format!("{} equips {}", p.full_name(), item.name))
}

fn cmd_unequip(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    let Some(raw) = args.first() else {
        return CommandResult::error("Which slot do you want to unequip from?");
    };
    let Some(slot) = EquipmentSlot::from_name(raw) else {
        let names: Vec<&str> = EquipmentSlot::ALL.iter().map(|s| s.name()).collect();
        return CommandResult::error(format!("Invalid equipment slot. Valid slots are: {}", names.join(", ")));
    };
    let Some(actor) = world.player(player) else {
        return CommandResult::error("You are not in the game.");
    };

    let mut guard = actor.lock();
    let Some(p) = guard.as_player_mut() else {
        return CommandResult::error("You are not in the game.");
    };
    let Some(worn) = p.equipment.at(slot).cloned() else {
        return CommandResult::error("Nothing is equipped in that slot.");
    };
    if !p.inventory.add(&worn, 1) {
        return CommandResult::error("Not enough inventory space to unequip");
    }
    p.unequip(slot);

    let private = format!("You unequipped {}", worn.name);
    CommandResult::success(private.clone())
        .with_private_message(private)
        .with_room_message(format!("{} unequips {}", p.full_name(), worn.name))
}

fn cmd_equipment(world: &World, player: EntityId, _args: &[&str]) -> CommandResult {
    match world.with_actor(player, |a| a.as_player().map(|p| p.equipment.display())).flatten() {
        Some(text) => CommandResult::success(text),
        None => CommandResult::error("You are not in the game."),
    }
}

fn health_description(percent: u32) -> &'static str {
    if percent > 90 {
        "They appear to be in perfect health."
    } else if percent > 75 {
        "They have a few minor scratches."
    } else if percent > 50 {
        "They show signs of injury."
    } else if percent > 25 {
        "They are badly wounded."
    } else if percent > 10 {
        "They are critically injured."
    } else {
        "They are barely clinging to life."
    }
}

fn cmd_examine(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return CommandResult::error("What do you want to examine?");
    }
    let target = args.join(" ").to_lowercase();

    let Some((own_name, room)) = world.with_actor(player, |a| (a.name().to_lowercase(), a.entity().room)) else {
        return CommandResult::error("You are not in the game.");
    };
    if target == "self" || target == own_name {
        let stats = world
            .with_actor(player, |a| {
                a.as_player().map(|p| {
                    format!(
                        "=== Your Statistics ===\n\nName: {}\nLevel {} {} {}\n\nHealth: {}/{}\nEnergy: {}/{}\nCredits: {}",
                        p.full_name(),
                        p.entity.level,
                        p.race.name(),
                        p.class.name(),
                        p.entity.health(),
                        p.entity.max_health(),
                        p.energy,
                        p.max_energy,
                        p.credits
                    )
                })
            })
            .flatten();
        return match stats {
            Some(text) => CommandResult::success(text),
            None => CommandResult::error("You are not in the game."),
        };
    }

    let Some(room) = room.and_then(|r| world.map.room(r)) else {
        return CommandResult::error("You are not in any room!");
    };

    // Other players
    for other in room.players().into_iter().filter(|id| *id != player) {
        let description = world
            .with_actor(other, |a| {
                let p = a.as_player()?;
                if !p.full_name().to_lowercase().contains(&target) {
                    return None;
                }
                let mut out = format!(
                    "You examine {}:\n\nLevel {} {} {}\n\nNotable Equipment:\n",
                    p.full_name(),
                    p.entity.level,
                    p.race.name(),
                    p.class.name()
                );
                for (slot, item) in p.equipment.items() {
                    out.push_str(&format!("- {}: {}\n", slot, item.name));
                }
                out.push('\n');
                out.push_str(health_description(p.entity.health_percent()));
                Some(out)
            })
            .flatten();
        if let Some(text) = description {
            return CommandResult::success(text);
        }
    }

    // NPCs
    if let Some(npc) = world.find_npc_in_room(room.id, &target) {
        let description = world
            .with_actor(npc, |a| {
                a.as_npc().map(|n| {
                    let mut out = format!("You examine {}:\n\n{}\n", n.name(), n.body.description);
                    match n.body.kind {
                        NpcType::Merchant => {
                            out.push_str("\nThey appear to be a merchant. Perhaps you could trade with them.\n");
                        }
                        NpcType::Enemy => {
                            out.push('\n');
                            out.push_str(health_description(n.body.entity.health_percent()));
                        }
                        _ => {}
                    }
                    out
                })
            })
            .flatten();
        if let Some(text) = description {
            return CommandResult::success(text);
        }
    }

    // Carried, worn, then lying in the room
    let carried = world
        .with_actor(player, |a| {
            a.as_player().and_then(|p| {
                p.inventory
                    .find_by_name(&target)
                    .map(|stack| stack.item.detailed_description())
                    .or_else(|| {
                        p.equipment
                            .items()
                            .find(|(_, item)| item.name.to_lowercase().contains(&target))
                            .map(|(_, item)| item.detailed_description())
                    })
            })
        })
        .flatten();
    if let Some(text) = carried {
        return CommandResult::success(text);
    }
    if let Some(item) = room.items().into_iter().find(|item| item.name.to_lowercase().contains(&target)) {
        return CommandResult::success(item.detailed_description());
    }

    CommandResult::error("You don't see that here.")
}

fn cmd_say(world: &World, player: EntityId, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return CommandResult::error("What do you want to say?");
    }
    let message = args.join(" ");
    let Some(speaker) = world.with_actor(player, |a| a.as_player().map(|p| p.full_name())).flatten() else {
        return CommandResult::error("You are not in the game.");
    };
    CommandResult::success(format!("You say: {}", message))
        .with_private_message(format!("You say: {}", message))
        .with_room_message(format!("{} says: {}", speaker, message))
}
