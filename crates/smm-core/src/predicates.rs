//! Predicate updater: writes a match outcome into the belief store.
//!
//! After identities are settled the updater pushes every observation into
//! its record, retires what the matcher retired, tracks who carries what,
//! recomputes the usability relation, and classifies each agent's current
//! recipe step.
//!
//! The usability relation is a full O(n^2) pass over visible objects every
//! tick. Kitchens hold tens of objects, not thousands.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use smm_types::{
    AgentId, AgentRecord, BeliefState, Category, ObjectId, ObjectRecord, ObservedObject, Position,
    Predicate, RecipeStep, TempId, WorldSnapshot,
};
use tracing::{debug, warn};

use crate::error::SmmError;
use crate::matcher::{Absorber, Assignment, MatchOutcome};
use crate::store::BeliefStore;

/// A retired object and the object it was folded into, once known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredObject {
    /// The retired object.
    pub id: ObjectId,
    /// The object that absorbed it (a soup, or the delivery station).
    pub into: Option<ObjectId>,
}

/// What one application changed in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    /// Final identity of every observation.
    pub assigned: BTreeMap<TempId, ObjectId>,
    /// Identifiers allocated this tick.
    pub created: Vec<ObjectId>,
    /// Objects retired this tick.
    pub retired: Vec<RetiredObject>,
}

/// Applies match outcomes to a [`BeliefStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateUpdater;

impl PredicateUpdater {
    /// Apply `outcome`, computed for the normalized `snapshot`, to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::IdSpaceExhausted`] if a new observation cannot be
    /// given an identifier.
    pub fn apply(
        store: &mut BeliefStore,
        snapshot: &WorldSnapshot,
        outcome: &MatchOutcome,
    ) -> Result<UpdateSummary, SmmError> {
        let mut summary = UpdateSummary::default();

        for (&id, agent) in &snapshot.agents {
            let record = store.agent_entry(id, AgentRecord::new(agent.position, agent.facing));
            record.position = agent.position;
            record.facing = agent.facing;
        }

        for retirement in &outcome.retirements {
            store.retire(retirement.id, retirement.position);
        }

        for (&temp, &assignment) in &outcome.assignments {
            let Some(object) = snapshot.objects.get(&temp) else {
                continue;
            };
            let id = match assignment {
                Assignment::Known(id) => id,
                Assignment::New => {
                    let id = store.allocate(object.category, object.position)?;
                    debug!(object = %id, observation = %temp, category = %object.category, "registered new object");
                    summary.created.push(id);
                    id
                }
            };
            if let Some(record) = store.object_mut(id) {
                observe(record, id, object);
            }
            summary.assigned.insert(temp, id);
        }

        for retirement in &outcome.retirements {
            let into = match retirement.absorbed_into {
                Absorber::Known { id } => Some(id),
                Absorber::Observed { temp } => summary.assigned.get(&temp).copied(),
                Absorber::Delivered { station } => station,
            };
            debug!(object = %retirement.id, into = ?into, "object folded into another");
            summary.retired.push(RetiredObject {
                id: retirement.id,
                into,
            });
        }

        update_holdings(store, snapshot, &summary.assigned);

        let state = store.state_mut();
        refresh_usability(state);
        let goals: Vec<(AgentId, RecipeStep)> = state
            .agents
            .iter()
            .map(|(&id, agent)| (id, infer_goal(&observed_predicates(state, agent))))
            .collect();
        for (id, goal) in goals {
            if let Some(agent) = state.agents.get_mut(&id) {
                agent.goal = Some(goal);
            }
        }

        Ok(summary)
    }
}

/// Push one observation into its record. The category never changes.
fn observe(record: &mut ObjectRecord, id: ObjectId, object: &ObservedObject) {
    record.position = object.position;
    if let Some(ingredients) = &object.ingredients {
        if ingredients.len() > Category::MAX_INGREDIENTS {
            warn!(object = %id, count = ingredients.len(), "soup reports too many ingredients, truncating");
        }
        record.ingredients = ingredients
            .iter()
            .copied()
            .take(Category::MAX_INGREDIENTS)
            .collect();
    }
    if object.is_cooking.is_some() {
        record.is_cooking = object.is_cooking;
    }
    if object.is_ready.is_some() {
        record.is_ready = object.is_ready;
    }
    if object.is_idle.is_some() {
        record.is_idle = object.is_idle;
    }
    if object.cook_time.is_some() {
        record.cook_time = object.cook_time;
    }
    record.holder = object.holder;
    record.visible = true;
    record.refresh_title(id);
}

/// Settle what every observed agent carries and clear stale holder tags.
fn update_holdings(
    store: &mut BeliefStore,
    snapshot: &WorldSnapshot,
    assigned: &BTreeMap<TempId, ObjectId>,
) {
    let mut holdings: BTreeMap<AgentId, ObjectId> = BTreeMap::new();
    for (&agent_id, agent) in &snapshot.agents {
        let previous = store.agent(agent_id).and_then(|record| record.holding);
        let holding = match agent.held_reference() {
            None => None,
            Some(temp) => match assigned.get(&temp) {
                Some(&id) => Some(id),
                // Carrying something this observer cannot see: keep the old
                // belief and let it ride along.
                None => previous,
            },
        };
        if let Some(id) = holding {
            if let Some(record) = store.object_mut(id) {
                record.position = agent.position;
                record.holder = Some(agent_id);
            }
            holdings.insert(agent_id, id);
        }
        if let Some(record) = store.state_mut().agents.get_mut(&agent_id) {
            record.holding = holding;
        }
    }

    for (&id, record) in &mut store.state_mut().objects {
        if let Some(holder) = record.holder
            && snapshot.agents.contains_key(&holder)
            && holdings.get(&holder) != Some(&id)
        {
            record.holder = None;
        }
    }
}

/// Whether a loose soup sits on `position`.
fn soup_at(visible: &[(ObjectId, &ObjectRecord)], position: Position) -> bool {
    visible
        .iter()
        .any(|(_, r)| r.category == Category::Soup && r.holder.is_none() && r.position == position)
}

/// Whether a pot occupies `position`.
fn pot_at(visible: &[(ObjectId, &ObjectRecord)], position: Position) -> bool {
    visible
        .iter()
        .any(|(_, r)| r.category == Category::Pot && r.position == position)
}

/// The interaction precondition for `from` acting on `to`.
fn usable(from: &ObjectRecord, to: &ObjectRecord, visible: &[(ObjectId, &ObjectRecord)]) -> bool {
    match (from.category, to.category) {
        (ingredient, Category::Soup) if ingredient.is_ingredient() => {
            to.ingredients.len() < Category::MAX_INGREDIENTS
        }
        (Category::Soup, Category::Station) => {
            from.ingredients.len() == Category::MAX_INGREDIENTS && from.is_ready == Some(true)
        }
        (ingredient, Category::Pot) if ingredient.is_ingredient() => !soup_at(visible, to.position),
        (Category::Dish, Category::Soup) => {
            from.ingredients.is_empty() && to.is_ready == Some(true) && pot_at(visible, to.position)
        }
        _ => false,
    }
}

/// Recompute `usable_with` for every visible pair; retired objects get none.
fn refresh_usability(state: &mut BeliefState) {
    let visible: Vec<(ObjectId, &ObjectRecord)> = state
        .objects
        .iter()
        .filter(|(_, record)| record.visible)
        .map(|(&id, record)| (id, record))
        .collect();
    let relation: BTreeMap<ObjectId, BTreeMap<ObjectId, bool>> = visible
        .iter()
        .map(|&(from_id, from)| {
            let row = visible
                .iter()
                .map(|&(to_id, to)| (to_id, from_id != to_id && usable(from, to, &visible)))
                .collect();
            (from_id, row)
        })
        .collect();
    for (id, record) in &mut state.objects {
        record.usable_with = relation.get(id).cloned().unwrap_or_default();
    }
}

/// The recipe predicates that hold for `agent` under `state`.
pub fn observed_predicates(state: &BeliefState, agent: &AgentRecord) -> BTreeSet<Predicate> {
    let mut predicates = BTreeSet::new();

    let held = agent
        .holding
        .and_then(|id| state.objects.get(&id))
        .map(|record| record.category);
    match held {
        None => {
            predicates.insert(Predicate::HoldingNothing);
        }
        Some(Category::Onion | Category::Tomato) => {
            predicates.insert(Predicate::HoldingIngredient);
        }
        Some(Category::Dish) => {
            predicates.insert(Predicate::HoldingDish);
        }
        Some(Category::Soup) => {
            predicates.insert(Predicate::HoldingSoup);
        }
        Some(Category::Pot | Category::Station) => {}
    }

    let visible: Vec<&ObjectRecord> = state.objects.values().filter(|r| r.visible).collect();
    for pot in visible.iter().filter(|r| r.category == Category::Pot) {
        let soup = visible.iter().find(|r| {
            r.category == Category::Soup && r.holder.is_none() && r.position == pot.position
        });
        match soup {
            None => {
                predicates.insert(Predicate::PotContainsNothing);
                predicates.insert(Predicate::PotNotCooking);
            }
            Some(soup) if soup.is_ready_soup() => {
                predicates.insert(Predicate::PotCookingComplete);
            }
            Some(soup) if soup.is_cooking_soup() => {
                predicates.insert(Predicate::PotCooking);
                predicates.insert(Predicate::PotCookingInProgress);
            }
            Some(soup) => {
                predicates.insert(Predicate::PotNotCooking);
                predicates.insert(if soup.ingredients.is_empty() {
                    Predicate::PotContainsNothing
                } else {
                    Predicate::PotContainsIngredients
                });
            }
        }
    }
    predicates
}

/// The recipe step with the most satisfied predicates; ties go to the
/// earlier step.
pub fn infer_goal(predicates: &BTreeSet<Predicate>) -> RecipeStep {
    let mut best = RecipeStep::PickUpIngredient;
    let mut best_score = 0_usize;
    for step in RecipeStep::ALL {
        let score = step
            .requirements()
            .iter()
            .filter(|predicate| predicates.contains(predicate))
            .count();
        if score > best_score {
            best = step;
            best_score = score;
        }
    }
    best
}
