//! Observation side of the data model: one simulation tick as perceived.
//!
//! A [`WorldSnapshot`] is produced outside the belief tracker (by the log
//! adapter, or by an upstream belief model when models are chained). Its
//! object keys are [`TempId`]s that only mean something within that one
//! snapshot.
//!
//! Held objects arrive either as a reference to another object of the same
//! snapshot or as an inline literal. [`WorldSnapshot::normalized`] resolves
//! both forms once, so nothing downstream branches on them again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Category;
use crate::geometry::{Orientation, Position};
use crate::ids::{AgentId, TempId};

/// An object as observed in one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ObservedObject {
    /// Tile the object occupies (the holder's tile when carried).
    pub position: Position,
    /// Ontology category.
    pub category: Category,
    /// Ingredient list of a soup. `None` means the source carried no
    /// ingredient data, which is not the same as an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<Category>>,
    /// Whether the soup is cooking.
    #[serde(default)]
    pub is_cooking: Option<bool>,
    /// Whether the soup is done.
    #[serde(default)]
    pub is_ready: Option<bool>,
    /// Whether the soup is idle (not yet started).
    #[serde(default)]
    pub is_idle: Option<bool>,
    /// Total cook time of the soup, when reported.
    #[serde(default)]
    pub cook_time: Option<i32>,
    /// Agent carrying the object, if any.
    #[serde(default)]
    pub holder: Option<AgentId>,
}

impl ObservedObject {
    /// An object of `category` at `position` with no soup data and no holder.
    pub const fn new(category: Category, position: Position) -> Self {
        Self {
            position,
            category,
            ingredients: None,
            is_cooking: None,
            is_ready: None,
            is_idle: None,
            cook_time: None,
            holder: None,
        }
    }

    /// Set the soup ingredient list.
    #[must_use]
    pub fn with_ingredients(mut self, ingredients: Vec<Category>) -> Self {
        self.ingredients = Some(ingredients);
        self
    }

    /// Set the cooking flag.
    #[must_use]
    pub const fn cooking(mut self, is_cooking: bool) -> Self {
        self.is_cooking = Some(is_cooking);
        self
    }

    /// Set the ready flag.
    #[must_use]
    pub const fn ready(mut self, is_ready: bool) -> Self {
        self.is_ready = Some(is_ready);
        self
    }

    /// Tag the object as carried by `agent`.
    #[must_use]
    pub const fn held_by(mut self, agent: AgentId) -> Self {
        self.holder = Some(agent);
        self
    }

    /// The ingredient list, empty when absent.
    pub fn ingredient_list(&self) -> &[Category] {
        self.ingredients.as_deref().unwrap_or_default()
    }

    /// Whether the source reported ingredient data for this object.
    pub const fn has_ingredient_data(&self) -> bool {
        self.ingredients.is_some()
    }
}

/// What an agent is carrying, as delivered by the snapshot source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum HeldObject {
    /// Another object of the same snapshot.
    Reference(TempId),
    /// An anonymous object literal, promoted to a snapshot object during
    /// normalization.
    Inline(ObservedObject),
}

/// A player as observed in one tick. Agents are always observable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ObservedAgent {
    /// Tile the agent stands on.
    pub position: Position,
    /// Direction the agent faces.
    pub facing: Orientation,
    /// Carried object, if any.
    #[serde(default)]
    pub holding: Option<HeldObject>,
}

impl ObservedAgent {
    /// An empty-handed agent.
    pub const fn new(position: Position, facing: Orientation) -> Self {
        Self {
            position,
            facing,
            holding: None,
        }
    }

    /// The referenced held object, once normalized.
    pub const fn held_reference(&self) -> Option<TempId> {
        match &self.holding {
            Some(HeldObject::Reference(temp)) => Some(*temp),
            _ => None,
        }
    }
}

/// Everything observed in one simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldSnapshot {
    /// Simulation tick the snapshot was taken at.
    pub tick: u64,
    /// Players by identifier.
    pub agents: BTreeMap<AgentId, ObservedAgent>,
    /// Board objects by snapshot-local identifier.
    pub objects: BTreeMap<TempId, ObservedObject>,
}

impl WorldSnapshot {
    /// An empty snapshot for `tick`.
    pub const fn new(tick: u64) -> Self {
        Self {
            tick,
            agents: BTreeMap::new(),
            objects: BTreeMap::new(),
        }
    }

    /// Resolve every [`HeldObject`] into a reference to a tagged object.
    ///
    /// Inline literals become new objects keyed after the highest existing
    /// [`TempId`]. Referenced objects are tagged with their holder and moved
    /// onto the holder's tile. A reference to an object missing from the
    /// snapshot is kept as is: the agent holds something the snapshot does
    /// not show. Normalizing twice is a no-op.
    #[must_use]
    pub fn normalized(self) -> Self {
        let Self {
            tick,
            mut agents,
            mut objects,
        } = self;
        let mut next = objects
            .keys()
            .next_back()
            .map_or(1, |last| last.index().saturating_add(1));

        for (&agent_id, agent) in &mut agents {
            let temp = match agent.holding.take() {
                None => continue,
                Some(HeldObject::Reference(temp)) => temp,
                Some(HeldObject::Inline(literal)) => {
                    let temp = TempId::new(next);
                    next = next.saturating_add(1);
                    objects.insert(temp, literal);
                    temp
                }
            };
            if let Some(object) = objects.get_mut(&temp) {
                object.holder = Some(agent_id);
                object.position = agent.position;
            }
            agent.holding = Some(HeldObject::Reference(temp));
        }

        Self {
            tick,
            agents,
            objects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onion_at(x: i32, y: i32) -> ObservedObject {
        ObservedObject::new(Category::Onion, Position::new(x, y))
    }

    #[test]
    fn inline_held_object_is_promoted() {
        let mut snapshot = WorldSnapshot::new(4);
        snapshot.objects.insert(TempId::new(1), onion_at(0, 0));
        snapshot.objects.insert(TempId::new(2), onion_at(1, 0));
        let mut agent = ObservedAgent::new(Position::new(3, 2), Orientation::East);
        agent.holding = Some(HeldObject::Inline(ObservedObject::new(
            Category::Dish,
            Position::new(0, 0),
        )));
        snapshot.agents.insert(AgentId::new(0), agent);

        let normalized = snapshot.normalized();
        let promoted = normalized.objects.get(&TempId::new(3));
        assert_eq!(promoted.map(|o| o.category), Some(Category::Dish));
        assert_eq!(promoted.and_then(|o| o.holder), Some(AgentId::new(0)));
        assert_eq!(promoted.map(|o| o.position), Some(Position::new(3, 2)));
        let holding = normalized
            .agents
            .get(&AgentId::new(0))
            .and_then(ObservedAgent::held_reference);
        assert_eq!(holding, Some(TempId::new(3)));
    }

    #[test]
    fn referenced_object_is_tagged_with_holder() {
        let mut snapshot = WorldSnapshot::new(0);
        snapshot.objects.insert(TempId::new(5), onion_at(9, 9));
        let mut agent = ObservedAgent::new(Position::new(2, 2), Orientation::North);
        agent.holding = Some(HeldObject::Reference(TempId::new(5)));
        snapshot.agents.insert(AgentId::new(1), agent);

        let normalized = snapshot.normalized();
        let held = normalized.objects.get(&TempId::new(5));
        assert_eq!(held.and_then(|o| o.holder), Some(AgentId::new(1)));
        assert_eq!(held.map(|o| o.position), Some(Position::new(2, 2)));
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let mut snapshot = WorldSnapshot::new(0);
        let mut agent = ObservedAgent::new(Position::new(1, 1), Orientation::South);
        agent.holding = Some(HeldObject::Inline(onion_at(0, 0)));
        snapshot.agents.insert(AgentId::new(0), agent);

        let once = snapshot.normalized();
        let twice = once.clone().normalized();
        assert_eq!(once, twice);
        assert_eq!(twice.objects.len(), 1);
    }

    #[test]
    fn dangling_reference_is_kept() {
        let mut snapshot = WorldSnapshot::new(0);
        let mut agent = ObservedAgent::new(Position::new(1, 1), Orientation::South);
        agent.holding = Some(HeldObject::Reference(TempId::new(42)));
        snapshot.agents.insert(AgentId::new(0), agent);

        let normalized = snapshot.normalized();
        assert!(normalized.objects.is_empty());
        let holding = normalized
            .agents
            .get(&AgentId::new(0))
            .and_then(ObservedAgent::held_reference);
        assert_eq!(holding, Some(TempId::new(42)));
    }
}
