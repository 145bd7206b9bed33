//! Raw game log adapter.
//!
//! The game server writes one JSON object per line. Lines that carry a
//! `stage` marker (survey pages, round transitions) or no `state` are not
//! game ticks. A tick entry looks like:
//!
//! ```json
//! {"layout": "RSMM3", "state": {
//!   "timestep": 12,
//!   "objects": [{"name": "soup", "position": [3, 2], "is_cooking": true,
//!                "is_ready": false, "_ingredients": [{"name": "onion", "position": [3, 2]}]}],
//!   "players": [{"position": [1, 1], "orientation": [0, -1], "held_object": null}]}}
//! ```
//!
//! Board objects become `T1..=Tn` in list order and players `A0..`. Held
//! objects become inline literals tagged with their holder; the snapshot's
//! normalization gives them their own [`TempId`] later.

use serde::Deserialize;
use smm_types::{
    AgentId, Category, HeldObject, ObservedAgent, ObservedObject, Orientation, ParseError,
    Position, TempId, WorldSnapshot,
};

/// Errors that can occur while adapting a log line.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The line is not a JSON log entry.
    #[error("malformed log entry: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The entry names an unknown category or a bad orientation.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The entry is not a game tick.
    #[error("log entry carries no game state")]
    NotATick,

    /// More objects or players than identifiers.
    #[error("log entry has too many {0}")]
    TooMany(&'static str),
}

/// One line of a game log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogEntry {
    /// Layout (round) the entry was recorded on.
    #[serde(default)]
    pub layout: Option<String>,

    /// Non-tick marker written between rounds.
    #[serde(default)]
    pub stage: Option<serde_json::Value>,

    /// Game state, present on tick entries.
    #[serde(default)]
    pub state: Option<RawState>,
}

/// The `state` block of a tick entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawState {
    /// Game timestep, when the server recorded one.
    #[serde(default)]
    pub timestep: Option<u64>,

    /// Board objects.
    #[serde(default)]
    pub objects: Vec<RawObject>,

    /// Players, robot first.
    #[serde(default)]
    pub players: Vec<RawPlayer>,
}

/// An object as the game server serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObject {
    /// Category name.
    pub name: String,
    /// Tile `[x, y]`.
    pub position: (i32, i32),
    /// Soup contents.
    #[serde(default, rename = "_ingredients")]
    pub ingredients: Option<Vec<RawIngredient>>,
    /// Cooking flag.
    #[serde(default)]
    pub is_cooking: Option<bool>,
    /// Ready flag.
    #[serde(default)]
    pub is_ready: Option<bool>,
    /// Idle flag.
    #[serde(default)]
    pub is_idle: Option<bool>,
    /// Total cook time.
    #[serde(default)]
    pub cook_time: Option<i32>,
}

/// One entry of a soup's `_ingredients` list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIngredient {
    /// Category name.
    pub name: String,
}

/// A player as the game server serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayer {
    /// Tile `[x, y]`.
    pub position: (i32, i32),
    /// Facing unit vector `[dx, dy]`.
    pub orientation: (i32, i32),
    /// What the player carries.
    #[serde(default)]
    pub held_object: Option<RawObject>,
}

impl LogEntry {
    /// Parse one log line.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Json`] if the line is not a JSON object of
    /// the expected shape.
    pub fn parse(line: &str) -> Result<Self, AdapterError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Whether this entry is a game tick.
    pub const fn is_tick(&self) -> bool {
        self.stage.is_none() && self.state.is_some()
    }

    /// Whether this entry belongs to the round named by `filter`. Every
    /// entry passes an absent filter; an entry without a layout fails a
    /// present one.
    pub fn matches_layout(&self, filter: Option<&str>) -> bool {
        filter.is_none_or(|wanted| self.layout.as_deref() == Some(wanted))
    }

    /// Convert a tick entry into a snapshot. The server's timestep is used
    /// as the tick when present, `fallback_tick` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::NotATick`] for non-tick entries and
    /// [`AdapterError::Parse`] for unknown categories or orientations.
    pub fn to_snapshot(&self, fallback_tick: u64) -> Result<WorldSnapshot, AdapterError> {
        let state = match &self.state {
            Some(state) if self.stage.is_none() => state,
            _ => return Err(AdapterError::NotATick),
        };
        let mut snapshot = WorldSnapshot::new(state.timestep.unwrap_or(fallback_tick));

        for (index, raw) in state.objects.iter().enumerate() {
            let number = u32::try_from(index)
                .ok()
                .and_then(|n| n.checked_add(1))
                .ok_or(AdapterError::TooMany("objects"))?;
            snapshot.objects.insert(TempId::new(number), observe(raw, None)?);
        }

        for (index, raw) in state.players.iter().enumerate() {
            let agent_id = u32::try_from(index)
                .map(AgentId::new)
                .ok()
                .ok_or(AdapterError::TooMany("players"))?;
            let (dx, dy) = raw.orientation;
            let mut agent =
                ObservedAgent::new(Position::from(raw.position), Orientation::from_vector(dx, dy)?);
            if let Some(held) = &raw.held_object {
                let mut literal = observe(held, Some(agent_id))?;
                literal.position = agent.position;
                agent.holding = Some(HeldObject::Inline(literal));
            }
            snapshot.agents.insert(agent_id, agent);
        }

        Ok(snapshot)
    }
}

fn observe(raw: &RawObject, holder: Option<AgentId>) -> Result<ObservedObject, ParseError> {
    let category: Category = raw.name.parse()?;
    let ingredients = raw
        .ingredients
        .as_ref()
        .map(|list| {
            list.iter()
                .map(|ingredient| ingredient.name.parse::<Category>())
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    Ok(ObservedObject {
        position: Position::from(raw.position),
        category,
        ingredients,
        is_cooking: raw.is_cooking,
        is_ready: raw.is_ready,
        is_idle: raw.is_idle,
        cook_time: raw.cook_time,
        holder,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TICK: &str = r#"{"layout": "RSMM3", "state": {"timestep": 7,
        "objects": [
            {"name": "onion", "position": [1, 1]},
            {"name": "soup", "position": [3, 2], "is_cooking": true, "is_ready": false,
             "_ingredients": [{"name": "onion", "position": [3, 2]}, {"name": "tomato", "position": [3, 2]}]}
        ],
        "players": [
            {"position": [2, 1], "orientation": [1, 0], "held_object": null},
            {"position": [4, 1], "orientation": [0, -1], "held_object": {"name": "dish", "position": [4, 1]}}
        ]}}"#;

    #[test]
    fn tick_entry_becomes_snapshot() {
        let entry = LogEntry::parse(TICK).unwrap();
        assert!(entry.is_tick());
        let snapshot = entry.to_snapshot(0).unwrap();
        assert_eq!(snapshot.tick, 7);

        let soup = snapshot.objects.get(&TempId::new(2)).unwrap();
        assert_eq!(soup.category, Category::Soup);
        assert_eq!(soup.ingredients, Some(vec![Category::Onion, Category::Tomato]));
        assert_eq!(soup.is_cooking, Some(true));
        assert_eq!(snapshot.objects.get(&TempId::new(1)).unwrap().ingredients, None);

        let human = snapshot.agents.get(&AgentId::new(1)).unwrap();
        assert_eq!(human.facing, Orientation::North);
        let dish = match &human.holding {
            Some(HeldObject::Inline(dish)) => Some(dish),
            _ => None,
        };
        assert_eq!(dish.map(|d| d.category), Some(Category::Dish));
        assert_eq!(dish.and_then(|d| d.holder), Some(AgentId::new(1)));
        assert_eq!(dish.map(|d| d.position), Some(Position::new(4, 1)));
    }

    #[test]
    fn stage_markers_are_not_ticks() {
        let entry = LogEntry::parse(r#"{"stage": "survey", "layout": "RSMM3"}"#).unwrap();
        assert!(!entry.is_tick());
        assert!(matches!(entry.to_snapshot(0), Err(AdapterError::NotATick)));
    }

    #[test]
    fn layout_filter() {
        let entry = LogEntry::parse(TICK).unwrap();
        assert!(entry.matches_layout(None));
        assert!(entry.matches_layout(Some("RSMM3")));
        assert!(!entry.matches_layout(Some("RSMM4")));
        let bare = LogEntry::parse(r#"{"state": {"objects": [], "players": []}}"#).unwrap();
        assert!(!bare.matches_layout(Some("RSMM3")));
    }

    #[test]
    fn fallback_tick_without_timestep() {
        let entry = LogEntry::parse(r#"{"state": {"players": [{"position": [0, 0], "orientation": [0, 1]}]}}"#).unwrap();
        let snapshot = entry.to_snapshot(41).unwrap();
        assert_eq!(snapshot.tick, 41);
        assert_eq!(
            snapshot.agents.get(&AgentId::new(0)).map(|a| a.facing),
            Some(Orientation::South)
        );
    }

    #[test]
    fn unknown_category_fails_loudly() {
        let line = r#"{"state": {"objects": [{"name": "lettuce", "position": [0, 0]}], "players": []}}"#;
        let result = LogEntry::parse(line).unwrap().to_snapshot(0);
        assert!(matches!(result, Err(AdapterError::Parse(ParseError::UnknownCategory(_)))));
    }

    #[test]
    fn diagonal_orientation_fails_loudly() {
        let line = r#"{"state": {"players": [{"position": [0, 0], "orientation": [1, 1]}]}}"#;
        let result = LogEntry::parse(line).unwrap().to_snapshot(0);
        assert!(matches!(result, Err(AdapterError::Parse(ParseError::InvalidOrientation { .. }))));
    }
}
