//! Belief side of the data model: what one observer believes exists.
//!
//! Records are keyed by stable [`ObjectId`]s. A record that is no longer
//! believed to exist (an onion merged into a soup, a delivered soup) stays in
//! the store with `visible = false` so later ticks can still reason about it;
//! identifiers are never removed or reused.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Category, RecipeStep};
use crate::geometry::{Orientation, Position};
use crate::ids::{AgentId, ObjectId, TempId};
use crate::snapshot::{HeldObject, ObservedAgent, ObservedObject, WorldSnapshot};

/// Last known state of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ObjectRecord {
    /// Last known tile.
    pub position: Position,
    /// Category, fixed for the lifetime of the identifier.
    pub category: Category,
    /// Composite debug title, e.g. `O4-soup:onion+onion`.
    pub title: String,
    /// Soup contents, at most [`Category::MAX_INGREDIENTS`] entries.
    pub ingredients: Vec<Category>,
    /// Whether the soup is cooking; `None` when unknown.
    pub is_cooking: Option<bool>,
    /// Whether the soup is done; `None` when unknown.
    pub is_ready: Option<bool>,
    /// Whether the soup is idle; `None` when unknown.
    pub is_idle: Option<bool>,
    /// Reported total cook time.
    pub cook_time: Option<i32>,
    /// Agent carrying the object.
    pub holder: Option<AgentId>,
    /// Whether the object is still believed to exist and be observable.
    pub visible: bool,
    /// Derived interaction relation, recomputed every update.
    pub usable_with: BTreeMap<ObjectId, bool>,
}

impl ObjectRecord {
    /// A fresh, visible record with default soup fields.
    pub fn new(id: ObjectId, category: Category, position: Position) -> Self {
        let mut record = Self {
            position,
            category,
            title: String::new(),
            ingredients: Vec::new(),
            is_cooking: None,
            is_ready: None,
            is_idle: None,
            cook_time: None,
            holder: None,
            visible: true,
            usable_with: BTreeMap::new(),
        };
        record.refresh_title(id);
        record
    }

    /// Recompute [`title`](Self::title) from the category and contents.
    pub fn refresh_title(&mut self, id: ObjectId) {
        let mut title = format!("{id}-{}", self.category);
        if self.category == Category::Soup && !self.ingredients.is_empty() {
            let contents: Vec<&str> = self.ingredients.iter().map(|c| c.name()).collect();
            title.push(':');
            title.push_str(&contents.join("+"));
        }
        self.title = title;
    }

    /// A soup that has finished cooking.
    pub fn is_ready_soup(&self) -> bool {
        self.category == Category::Soup && self.is_ready == Some(true)
    }

    /// A soup that is cooking and not done.
    pub fn is_cooking_soup(&self) -> bool {
        self.category == Category::Soup
            && self.is_cooking == Some(true)
            && self.is_ready != Some(true)
    }

    /// Re-express this record as an observation.
    ///
    /// Soups always carry ingredient data, so an empty pot soup stays
    /// distinguishable from one whose contents are unknown.
    pub fn to_observed(&self) -> ObservedObject {
        let ingredients = if self.category == Category::Soup || !self.ingredients.is_empty() {
            Some(self.ingredients.clone())
        } else {
            None
        };
        ObservedObject {
            position: self.position,
            category: self.category,
            ingredients,
            is_cooking: self.is_cooking,
            is_ready: self.is_ready,
            is_idle: self.is_idle,
            cook_time: self.cook_time,
            holder: self.holder,
        }
    }
}

/// Last known state of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentRecord {
    /// Last known tile.
    pub position: Position,
    /// Last known facing.
    pub facing: Orientation,
    /// Object the agent is believed to carry.
    pub holding: Option<ObjectId>,
    /// Capability tags. Carried for consumers; no behavior reads them.
    pub capable_of: BTreeSet<String>,
    /// Inferred current recipe step.
    pub goal: Option<RecipeStep>,
}

impl AgentRecord {
    /// An empty-handed agent with no inferred goal.
    pub const fn new(position: Position, facing: Orientation) -> Self {
        Self {
            position,
            facing,
            holding: None,
            capable_of: BTreeSet::new(),
            goal: None,
        }
    }
}

/// One directed edge of the usability graph: `from` can be used with `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UsabilityEdge {
    /// Acting object.
    pub from: ObjectId,
    /// Target object.
    pub to: ObjectId,
}

/// A complete belief state: every agent plus a set of object records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BeliefState {
    /// Agents by identifier.
    pub agents: BTreeMap<AgentId, AgentRecord>,
    /// Objects by identifier.
    pub objects: BTreeMap<ObjectId, ObjectRecord>,
}

impl BeliefState {
    /// Convert into a snapshot a downstream observer can consume.
    ///
    /// Each object keeps its number as the [`TempId`]; agent holdings become
    /// references. Holdings of objects absent from this state stay as
    /// dangling references.
    pub fn to_snapshot(&self, tick: u64) -> WorldSnapshot {
        let objects = self
            .objects
            .iter()
            .map(|(id, record)| (TempId::new(id.index()), record.to_observed()))
            .collect();
        let agents = self
            .agents
            .iter()
            .map(|(&id, agent)| {
                let observed = ObservedAgent {
                    position: agent.position,
                    facing: agent.facing,
                    holding: agent
                        .holding
                        .map(|held| HeldObject::Reference(TempId::new(held.index()))),
                };
                (id, observed)
            })
            .collect();
        WorldSnapshot {
            tick,
            agents,
            objects,
        }
    }

    /// Every `true` usability relation between visible objects.
    pub fn usability_edges(&self) -> Vec<UsabilityEdge> {
        self.objects
            .iter()
            .filter(|(_, record)| record.visible)
            .flat_map(|(&from, record)| {
                record
                    .usable_with
                    .iter()
                    .filter(|&(_, &usable)| usable)
                    .map(move |(&to, _)| UsabilityEdge { from, to })
            })
            .collect()
    }

    /// Goal of every agent that has one.
    pub fn goals(&self) -> BTreeMap<AgentId, RecipeStep> {
        self.agents
            .iter()
            .filter_map(|(&id, agent)| agent.goal.map(|goal| (id, goal)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn soup_title_lists_ingredients() {
        let id = ObjectId::new(4);
        let mut soup = ObjectRecord::new(id, Category::Soup, Position::new(3, 2));
        assert_eq!(soup.title, "O4-soup");
        soup.ingredients = vec![Category::Onion, Category::Onion];
        soup.refresh_title(id);
        assert_eq!(soup.title, "O4-soup:onion+onion");
    }

    #[test]
    fn snapshot_keeps_numbers_and_holdings() {
        let mut state = BeliefState::default();
        let mut dish = ObjectRecord::new(ObjectId::new(7), Category::Dish, Position::new(1, 1));
        dish.holder = Some(AgentId::new(0));
        state.objects.insert(ObjectId::new(7), dish);
        let mut agent = AgentRecord::new(Position::new(1, 1), Orientation::West);
        agent.holding = Some(ObjectId::new(7));
        state.agents.insert(AgentId::new(0), agent);

        let snapshot = state.to_snapshot(12);
        assert_eq!(snapshot.tick, 12);
        let observed = snapshot.objects.get(&TempId::new(7)).unwrap();
        assert_eq!(observed.category, Category::Dish);
        assert_eq!(observed.ingredients, None);
        assert_eq!(
            snapshot.agents.get(&AgentId::new(0)).unwrap().held_reference(),
            Some(TempId::new(7))
        );
    }

    #[test]
    fn empty_soup_carries_ingredient_data() {
        let soup = ObjectRecord::new(ObjectId::new(1), Category::Soup, Position::new(0, 0));
        assert_eq!(soup.to_observed().ingredients, Some(Vec::new()));
    }

    #[test]
    fn usability_edges_skip_invisible_sources() {
        let mut state = BeliefState::default();
        let mut onion = ObjectRecord::new(ObjectId::new(1), Category::Onion, Position::new(0, 0));
        onion.usable_with.insert(ObjectId::new(2), true);
        onion.usable_with.insert(ObjectId::new(3), false);
        let mut gone = ObjectRecord::new(ObjectId::new(4), Category::Onion, Position::new(0, 1));
        gone.visible = false;
        gone.usable_with.insert(ObjectId::new(2), true);
        state.objects.insert(ObjectId::new(1), onion);
        state.objects.insert(ObjectId::new(4), gone);

        assert_eq!(
            state.usability_edges(),
            vec![UsabilityEdge {
                from: ObjectId::new(1),
                to: ObjectId::new(2)
            }]
        );
    }
}
