// Player profile: attribute ratings and card text derived from one
// aggregated player.

use chrono::{Datelike, TimeZone, Utc};

use crate::model::{AggregatedPlayer, Player};
use crate::scoring::Role;

/// Ceiling for every rating.
pub const RATING_CAP: u8 = 95;

/// Shown when a player has no description.
pub const NO_DESCRIPTION: &str =
    "Este jugador prefiere que su fútbol hable por él. No hay descripción disponible todavía.";

/// Shown when a player has no traits assigned.
pub const NO_TRAITS: &str = "Aún no se han asignado rasgos a este jugador.";

/// One labelled attribute on the profile, `0..=RATING_CAP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating {
    pub label: &'static str,
    pub value: u8,
}

fn rating(label: &'static str, raw: f64) -> Rating {
    // NaN casts to 0.
    let value = raw.clamp(0.0, f64::from(RATING_CAP)).round() as u8;
    Rating { label, value }
}

fn scaled(base: f64, count: i64, weight: f64) -> f64 {
    base + count as f64 * weight
}

/// Share of goals over shots that ended in a goal or a miss, as a percentage.
/// No goals means no accuracy; no misses counts as a tenth of a miss.
fn accuracy(goals: i64, missed: i64) -> f64 {
    if goals <= 0 {
        return 0.0;
    }
    let missed = if missed == 0 { 0.1 } else { missed as f64 };
    let shots = goals as f64 + missed;
    if shots <= 0.0 {
        return 0.0;
    }
    goals as f64 / shots * 100.0
}

/// Five attribute ratings, shaped by the player's role.
pub fn ratings(player: &AggregatedPlayer) -> Vec<Rating> {
    let p = player;
    match Role::of(&p.player) {
        Role::Goalkeeper => vec![
            rating("ATAJADAS", scaled(20.0, p.total_saves, 5.0)),
            rating("SEGURIDAD", scaled(20.0, p.total_clean_sheets, 15.0)),
            rating("REFLEJOS", scaled(40.0, p.total_saves, 3.0)),
            rating("SALIDA", scaled(30.0, p.total_assists, 12.0)),
            rating("PUNTOS", scaled(10.0, p.total_points, 5.0)),
        ],
        Role::FieldPlayer => vec![
            rating("ATAQUE", scaled(20.0, p.total_goals, 8.0)),
            rating("CREACIÓN", scaled(20.0, p.total_assists, 10.0)),
            rating("PUNTERÍA", accuracy(p.total_goals, p.total_missed_goals)),
            rating("PUNTOS", scaled(10.0, p.total_points, 3.5)),
            rating(
                "DEFENSA",
                scaled(20.0, p.total_saves, 12.0) + p.total_clean_sheets as f64 * 8.0,
            ),
        ],
    }
}

/// Headline counters on the card. Legends keep their numbers private.
pub fn headline_stats(player: &AggregatedPlayer) -> Option<[(&'static str, i64); 2]> {
    if player.player.is_legendary {
        return None;
    }
    Some(match Role::of(&player.player) {
        Role::Goalkeeper => [
            ("Vallas Inv.", player.total_clean_sheets),
            ("Atajadas", player.total_saves),
        ],
        Role::FieldPlayer => [("Goles", player.total_goals), ("Asist.", player.total_assists)],
    })
}

pub fn status_label(player: &Player) -> &'static str {
    if player.is_legendary {
        "RETIRADO (LEYENDA)"
    } else {
        "ACTIVO"
    }
}

pub fn description(player: &Player) -> &str {
    let text = player.description.trim();
    if text.is_empty() {
        NO_DESCRIPTION
    } else {
        text
    }
}

/// First eight characters of the id.
pub fn short_id(player: &Player) -> &str {
    let id = player.id.as_str();
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Calendar year the player was created, from a millisecond timestamp.
pub fn joined_year(player: &Player) -> Option<i32> {
    Utc.timestamp_millis_opt(player.created_at)
        .single()
        .map(|at| at.year())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
