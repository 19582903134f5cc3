//! Auto-naming for unlabeled equipment: room codes and sequential
//! socket/junction-box labels. Pure and total; callers supply the sequence
//! number and decide when a generated label may be applied (only when the
//! current label is empty and a room is newly assigned).

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Curated room-name to code dictionary. Immutable configuration: passed
/// into the resolver rather than consulted as a mutable global, so tests
/// can swap in their own table.
#[derive(Debug, Clone)]
pub struct RoomCodeTable {
    entries: HashMap<&'static str, &'static str>,
}

static DEFAULT_ENTRIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Residential
        ("kitchen", "KIT"),
        ("living room", "LR"),
        ("dining room", "DR"),
        ("bedroom", "BR"),
        ("master bedroom", "MBR"),
        ("bathroom", "BA"),
        ("garage", "GAR"),
        ("basement", "BASE"),
        ("attic", "ATT"),
        ("laundry", "LAU"),
        ("hallway", "HALL"),
        ("hall", "HALL"),
        ("entry", "ENT"),
        ("entryway", "ENT"),
        ("utility", "UTIL"),
        ("utility room", "UTIL"),
        ("pantry", "PAN"),
        ("den", "DEN"),
        ("study", "STUDY"),
        ("office", "OFF"),
        ("closet", "CLST"),
        ("porch", "PORCH"),
        ("deck", "DECK"),
        ("patio", "PATIO"),
        ("yard", "YARD"),
        // Commercial
        ("conference", "CONF"),
        ("conference room", "CONF"),
        ("reception", "RECEP"),
        ("restroom", "REST"),
        ("storage", "STOR"),
        ("mechanical", "MECH"),
        ("mechanical room", "MECH"),
        ("electrical", "ELEC"),
        ("electrical room", "ELEC"),
        ("server", "SERV"),
        ("server room", "SERV"),
        ("corridor", "CORR"),
        ("lobby", "LOBBY"),
    ])
});

impl Default for RoomCodeTable {
    fn default() -> Self {
        Self { entries: DEFAULT_ENTRIES.clone() }
    }
}

impl RoomCodeTable {
    pub fn get(&self, normalized: &str) -> Option<&'static str> {
        self.entries.get(normalized).copied()
    }

    fn substring_match(&self, normalized: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .filter(|(key, _)| normalized.contains(*key))
            // Longest key wins so "master bedroom suite" maps to MBR, not BR.
            .max_by_key(|(key, _)| key.len())
            .map(|(_, code)| *code)
    }
}

/// Derive a short room code from a room name ("Kitchen" -> "KIT",
/// "Bedroom 2" -> "BR2"). Deterministic and total: empty input yields an
/// empty string, nothing else fails.
pub fn generate_room_code(table: &RoomCodeTable, room_name: &str) -> String {
    let normalized = room_name.trim().to_lowercase();
    if normalized.is_empty() {
        return String::new();
    }

    if let Some(code) = table.get(&normalized) {
        return code.to_string();
    }

    // Numbered rooms: "bedroom 2" -> dictionary base + the number.
    if let Some((base, number)) = split_trailing_number(&normalized) {
        if let Some(code) = table.get(base.trim()) {
            return format!("{code}{number}");
        }
    }

    if let Some(code) = table.substring_match(&normalized) {
        return code.to_string();
    }

    // Fallback abbreviation.
    let words: Vec<&str> = normalized.split_whitespace().collect();
    if words.len() == 1 {
        words[0].chars().take(4).collect::<String>().to_uppercase()
    } else {
        words
            .iter()
            .take(4)
            .filter_map(|w| w.chars().next())
            .collect::<String>()
            .to_uppercase()
    }
}

fn split_trailing_number(normalized: &str) -> Option<(&str, &str)> {
    let (base, number) = normalized.rsplit_once(' ')?;
    if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) && !base.is_empty() {
        Some((base, number))
    } else {
        None
    }
}

/// Label for a socket: "KIT-S1", "Kitchen Socket 1" or "Socket 1"
/// depending on what is known about the room.
pub fn generate_socket_label(
    room_code: Option<&str>,
    room_name: Option<&str>,
    sequence_number: u32,
) -> String {
    match (room_code, room_name) {
        (Some(code), _) if !code.is_empty() => format!("{code}-S{sequence_number}"),
        (_, Some(name)) if !name.is_empty() => format!("{name} Socket {sequence_number}"),
        _ => format!("Socket {sequence_number}"),
    }
}

/// Label for a junction box: "KIT-JB1", "Kitchen JB1" or "JB1".
pub fn generate_junction_box_label(
    room_code: Option<&str>,
    room_name: Option<&str>,
    sequence_number: u32,
) -> String {
    match (room_code, room_name) {
        (Some(code), _) if !code.is_empty() => format!("{code}-JB{sequence_number}"),
        (_, Some(name)) if !name.is_empty() => format!("{name} JB{sequence_number}"),
        _ => format!("JB{sequence_number}"),
    }
}
