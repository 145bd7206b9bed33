//! The belief store: an arena of object records that only ever grows.
//!
//! Object identifiers are allocated monotonically starting at `O1` and are
//! never removed or reused. An object that stops existing is retired
//! (flagged invisible) and stays available for later reasoning.

use std::collections::BTreeMap;

use smm_types::{AgentId, AgentRecord, BeliefState, Category, ObjectId, ObjectRecord, Position};
use tracing::info;

use crate::error::SmmError;
use crate::layout::Layout;

/// Persistent belief state of one observer, plus its id allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeliefStore {
    state: BeliefState,
    next_id: ObjectId,
}

impl Default for BeliefStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BeliefStore {
    /// An empty store whose first object will be `O1`.
    pub const fn new() -> Self {
        Self {
            state: BeliefState {
                agents: BTreeMap::new(),
                objects: BTreeMap::new(),
            },
            next_id: ObjectId::new(1),
        }
    }

    /// A store seeded with the fixed appliances of `layout`.
    pub fn seeded(layout: &Layout) -> Result<Self, SmmError> {
        let mut store = Self::new();
        for (category, position) in layout.fixed_appliances() {
            store.allocate(category, position)?;
        }
        info!(
            objects = store.state.objects.len(),
            width = layout.width(),
            height = layout.height(),
            "seeded belief store from layout"
        );
        Ok(store)
    }

    /// A store that starts from someone else's belief.
    ///
    /// Allocation resumes after the highest identifier present.
    pub fn from_projection(state: BeliefState) -> Self {
        let next_id = state
            .objects
            .keys()
            .next_back()
            .and_then(|last| last.next())
            .unwrap_or(ObjectId::new(1));
        Self { state, next_id }
    }

    /// Register a new visible object and return its identifier.
    pub fn allocate(&mut self, category: Category, position: Position) -> Result<ObjectId, SmmError> {
        let id = self.next_id;
        self.next_id = id.next().ok_or(SmmError::IdSpaceExhausted)?;
        self.state
            .objects
            .insert(id, ObjectRecord::new(id, category, position));
        Ok(id)
    }

    /// Mark an object as no longer existing, optionally moving it first.
    ///
    /// Returns `false` if the identifier is unknown.
    pub fn retire(&mut self, id: ObjectId, position: Option<Position>) -> bool {
        let Some(record) = self.state.objects.get_mut(&id) else {
            return false;
        };
        record.visible = false;
        record.holder = None;
        record.usable_with.clear();
        if let Some(position) = position {
            record.position = position;
        }
        true
    }

    /// Agents plus every visible object, as an owned copy.
    pub fn visible_projection(&self) -> BeliefState {
        BeliefState {
            agents: self.state.agents.clone(),
            objects: self
                .state
                .objects
                .iter()
                .filter(|(_, record)| record.visible)
                .map(|(&id, record)| (id, record.clone()))
                .collect(),
        }
    }

    /// Visible objects in identifier order.
    pub fn visible_objects(&self) -> impl Iterator<Item = (ObjectId, &ObjectRecord)> {
        self.state
            .objects
            .iter()
            .filter(|(_, record)| record.visible)
            .map(|(&id, record)| (id, record))
    }

    /// Look up an object record, visible or not.
    pub fn object(&self, id: ObjectId) -> Option<&ObjectRecord> {
        self.state.objects.get(&id)
    }

    /// Mutable access to an object record.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut ObjectRecord> {
        self.state.objects.get_mut(&id)
    }

    /// Look up an agent record.
    pub fn agent(&self, id: AgentId) -> Option<&AgentRecord> {
        self.state.agents.get(&id)
    }

    /// The agent record for `id`, inserting `default` if absent.
    pub fn agent_entry(&mut self, id: AgentId, default: AgentRecord) -> &mut AgentRecord {
        self.state.agents.entry(id).or_insert(default)
    }

    /// The full state, including retired objects.
    pub const fn state(&self) -> &BeliefState {
        &self.state
    }

    pub(crate) const fn state_mut(&mut self) -> &mut BeliefState {
        &mut self.state
    }

    /// The identifier the next allocation will receive.
    pub const fn next_id(&self) -> ObjectId {
        self.next_id
    }
}
