//! Built-in world layout.

use log::info;

use mud_shared::{find_item_definition, Direction, SCRAP_METAL, STIM_PACK};

use super::GameMap;

/// Central spaceport hub with a Neo Tokyo district to the east and an
/// Old London district to the west.
pub fn build_default_map() -> Result<GameMap, String> {
    let mut map = GameMap::new();

    let spaceport = map.add_room(
        "Central Spaceport",
        "Shuttles scream overhead as travellers stream between the district gates. \
         Departure boards flicker in a dozen languages.",
    );

    // Neo Tokyo
    let crossing = map.add_room(
        "Shibuya Crossing",
        "Holographic billboards wash the famous crossing in pink and cyan. \
         Crowds surge across the intersection at every signal change.",
    );
    let security_post = map.add_room(
        "Shibuya Security Post",
        "A squat armored kiosk bristling with cameras. Charging cradles line the back wall.",
    );
    let market = map.add_room(
        "Neon Market",
        "Stalls crammed with black-market cybernetics and noodle carts compete for space \
         under dripping neon signs.",
    );
    let tunnel = map.add_room(
        "Maintenance Tunnel 7",
        "A cramped service tunnel. Conduits hum along the walls and condensation drips from the ceiling.",
    );
    let lab = map.add_room(
        "Restricted Research Lab",
        "Sterile white surfaces and sealed specimen tanks. A drop chute in the floor leads down to the tunnels.",
    );
    let cargo_bay = map.add_room(
        "Harbor Cargo Bay",
        "Stacked shipping containers form narrow canyons. Loader cranes creak overhead.",
    );

    // Old London
    let plaza = map.add_room(
        "Big Ben Plaza",
        "The restored clock tower looms over a rain-slick plaza ringed with surveillance masts.",
    );
    let embankment = map.add_room(
        "Thames Embankment",
        "Barges drift along the dark river. The embankment wall is plastered with faded protest posters.",
    );
    let shaft = map.add_room(
        "Underground Maintenance Shaft",
        "Rusting ladders descend into the old Underground. Somewhere below, a pump thumps steadily.",
    );
    let tower_gate = map.add_room(
        "Tower Security Gate",
        "Checkpoint barriers and scanner arches guard the approach to the Tower.",
    );
    let alley = map.add_room(
        "Whitechapel Alley",
        "A narrow alley choked with steam from street vents. Footsteps echo from nowhere in particular.",
    );

    map.connect_rooms(spaceport, Direction::East, crossing, true)?;
    map.connect_rooms(spaceport, Direction::West, plaza, true)?;

    map.connect_rooms(crossing, Direction::North, security_post, true)?;
    map.connect_rooms(crossing, Direction::East, market, true)?;
    map.connect_rooms(crossing, Direction::Down, tunnel, true)?;
    map.connect_rooms(crossing, Direction::South, cargo_bay, true)?;
    map.connect_rooms(security_post, Direction::Up, lab, true)?;
    // One-way drop chute
    map.connect_rooms(lab, Direction::East, tunnel, false)?;

    map.connect_rooms(plaza, Direction::South, embankment, true)?;
    map.connect_rooms(plaza, Direction::Down, shaft, true)?;
    map.connect_rooms(plaza, Direction::North, tower_gate, true)?;
    map.connect_rooms(plaza, Direction::West, alley, true)?;

    if let (Some(room), Some(item)) = (map.room(market), find_item_definition(STIM_PACK)) {
        room.add_item(item);
    }
    if let (Some(room), Some(item)) = (map.room(tunnel), find_item_definition(SCRAP_METAL)) {
        room.add_item(item);
    }

    map.set_starting_room(spaceport)?;
    info!("Built default map with {} rooms", map.room_count());
    Ok(map)
}
