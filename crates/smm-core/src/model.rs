//! Belief model: one observer's belief about the kitchen.
//!
//! A model is `Uninitialized` until it is seeded from a layout (or adopts
//! another model's belief), and `Initialized` from then on. Each update
//! consumes one snapshot:
//!
//! 1. Normalize held objects and locate the model's own agent.
//! 2. Redact the snapshot to what that agent can see.
//! 3. Match observations to known objects.
//! 4. Apply the outcome to a copy of the store, then swap it in.
//!
//! A failed update leaves the previous belief untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smm_types::{
    AgentId, BeliefState, ObjectId, RecipeStep, TempId, UsabilityEdge, VisibilityPolicy,
    WorldSnapshot,
};
use tracing::debug;

use crate::error::SmmError;
use crate::layout::Layout;
use crate::matcher::{ObjectMatcher, PassStats};
use crate::predicates::{PredicateUpdater, RetiredObject};
use crate::store::BeliefStore;
use crate::visibility::{Observer, redact};

/// Lifecycle of a [`BeliefModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    /// Not seeded yet; updates are rejected.
    Uninitialized,
    /// Seeded and tracking.
    Initialized(BeliefStore),
}

/// What one update did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick of the consumed snapshot.
    pub tick: u64,
    /// Number of objects the observer could see.
    pub observed: usize,
    /// Final identity of every visible observation.
    pub assignments: BTreeMap<TempId, ObjectId>,
    /// Identifiers allocated this tick.
    pub new_objects: Vec<ObjectId>,
    /// Objects retired this tick and what absorbed them.
    pub retired: Vec<RetiredObject>,
    /// Matcher pass counters.
    pub stats: PassStats,
}

/// Belief tracker for one agent under one visibility policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeliefModel {
    agent: AgentId,
    policy: VisibilityPolicy,
    state: ModelState,
}

impl BeliefModel {
    /// A model for `agent` that has not been seeded yet.
    pub const fn new(agent: AgentId, policy: VisibilityPolicy) -> Self {
        Self {
            agent,
            policy,
            state: ModelState::Uninitialized,
        }
    }

    /// The observing agent.
    pub const fn agent(&self) -> AgentId {
        self.agent
    }

    /// The observer's visibility policy.
    pub const fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    /// Whether the model has been seeded.
    pub const fn is_initialized(&self) -> bool {
        matches!(self.state, ModelState::Initialized(_))
    }

    /// Seed the belief with the fixed appliances of `layout`, replacing any
    /// previous belief.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::IdSpaceExhausted`] if the layout has more objects
    /// than identifiers.
    pub fn seed(&mut self, layout: &Layout) -> Result<(), SmmError> {
        self.state = ModelState::Initialized(BeliefStore::seeded(layout)?);
        Ok(())
    }

    /// Take over `belief` as this model's own, e.g. an upstream model's
    /// projection on first contact.
    pub fn adopt(&mut self, belief: BeliefState) {
        debug!(agent = %self.agent, objects = belief.objects.len(), "adopting belief");
        self.state = ModelState::Initialized(BeliefStore::from_projection(belief));
    }

    /// Consume one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::NotInitialized`] before [`seed`](Self::seed),
    /// [`SmmError::UnknownAgent`] if the model's agent is absent from the
    /// snapshot, and [`SmmError::IdSpaceExhausted`] if identifiers run out.
    pub fn update(&mut self, snapshot: &WorldSnapshot) -> Result<TickReport, SmmError> {
        let ModelState::Initialized(store) = &self.state else {
            return Err(SmmError::NotInitialized);
        };

        let normalized = snapshot.clone().normalized();
        let observer = Observer::locate(&normalized, self.agent, self.policy)?;
        let visible = redact(normalized, &observer);

        let outcome = ObjectMatcher::run(store, &visible, &observer);
        let mut next = store.clone();
        let summary = PredicateUpdater::apply(&mut next, &visible, &outcome)?;

        debug!(
            agent = %self.agent,
            tick = visible.tick,
            observed = visible.objects.len(),
            new = summary.created.len(),
            retired = summary.retired.len(),
            "belief updated"
        );

        self.state = ModelState::Initialized(next);
        Ok(TickReport {
            tick: visible.tick,
            observed: visible.objects.len(),
            assignments: summary.assigned,
            new_objects: summary.created,
            retired: summary.retired,
            stats: outcome.stats,
        })
    }

    /// Agents plus visible objects, as an owned copy.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::NotInitialized`] before the model was seeded.
    pub fn visible_projection(&self) -> Result<BeliefState, SmmError> {
        Ok(self.store()?.visible_projection())
    }

    /// The inferred recipe step of every known agent.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::NotInitialized`] before the model was seeded.
    pub fn goals(&self) -> Result<BTreeMap<AgentId, RecipeStep>, SmmError> {
        Ok(self.store()?.state().goals())
    }

    /// Every `true` usability relation between visible objects.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::NotInitialized`] before the model was seeded.
    pub fn usability_edges(&self) -> Result<Vec<UsabilityEdge>, SmmError> {
        Ok(self.store()?.state().usability_edges())
    }

    /// The underlying store.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::NotInitialized`] before the model was seeded.
    pub const fn store(&self) -> Result<&BeliefStore, SmmError> {
        match &self.state {
            ModelState::Initialized(store) => Ok(store),
            ModelState::Uninitialized => Err(SmmError::NotInitialized),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smm_types::{Category, ObservedAgent, ObservedObject, Orientation, Position};

    use super::*;

    fn layout() -> Layout {
        Layout::from_grid("XXXXX\nX   P\nX   X\nXXXSX").unwrap()
    }

    fn snapshot(tick: u64) -> WorldSnapshot {
        let mut snapshot = WorldSnapshot::new(tick);
        snapshot.agents.insert(
            AgentId::new(0),
            ObservedAgent::new(Position::new(1, 1), Orientation::East),
        );
        snapshot.objects.insert(
            TempId::new(1),
            ObservedObject::new(Category::Pot, Position::new(4, 1)),
        );
        snapshot.objects.insert(
            TempId::new(2),
            ObservedObject::new(Category::Onion, Position::new(2, 2)),
        );
        snapshot
    }

    #[test]
    fn update_before_seed_is_rejected() {
        let mut model = BeliefModel::new(AgentId::new(0), VisibilityPolicy::omni(20));
        assert!(matches!(model.update(&snapshot(0)), Err(SmmError::NotInitialized)));
        assert!(matches!(model.visible_projection(), Err(SmmError::NotInitialized)));
        assert!(!model.is_initialized());
    }

    #[test]
    fn missing_agent_leaves_belief_untouched() {
        let mut model = BeliefModel::new(AgentId::new(3), VisibilityPolicy::omni(20));
        model.seed(&layout()).unwrap();
        let before = model.visible_projection().unwrap();
        let result = model.update(&snapshot(0));
        assert!(matches!(result, Err(SmmError::UnknownAgent(_))));
        assert_eq!(model.visible_projection().unwrap(), before);
    }

    #[test]
    fn first_update_registers_unseen_objects() {
        let mut model = BeliefModel::new(AgentId::new(0), VisibilityPolicy::omni(20));
        model.seed(&layout()).unwrap();
        let report = model.update(&snapshot(0)).unwrap();

        // O1 is the pot, O2 the station; the onion is new.
        assert_eq!(report.assignments.get(&TempId::new(1)), Some(&ObjectId::new(1)));
        assert_eq!(report.new_objects, vec![ObjectId::new(3)]);
        assert_eq!(report.observed, 2);

        let goals = model.goals().unwrap();
        assert_eq!(goals.get(&AgentId::new(0)), Some(&RecipeStep::PickUpIngredient));
        let edges = model.usability_edges().unwrap();
        assert!(edges.contains(&UsabilityEdge {
            from: ObjectId::new(3),
            to: ObjectId::new(1),
        }));
    }

    #[test]
    fn adopted_belief_is_initialized() {
        let mut upstream = BeliefModel::new(AgentId::new(0), VisibilityPolicy::omni(20));
        upstream.seed(&layout()).unwrap();
        upstream.update(&snapshot(0)).unwrap();

        let mut downstream = BeliefModel::new(AgentId::new(0), VisibilityPolicy::directional(2));
        downstream.adopt(upstream.visible_projection().unwrap());
        assert!(downstream.is_initialized());
        assert_eq!(
            downstream.store().unwrap().next_id(),
            upstream.store().unwrap().next_id()
        );
    }
}
