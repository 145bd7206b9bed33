//! Chained belief models: nested, second-order belief.
//!
//! Each stage's visible projection becomes the next stage's observation,
//! so a later stage can only ever perceive what every earlier stage
//! believed and it could itself see. The usual chain is ground truth, then
//! the robot's partial view, then the robot's estimate of the human's view.
//!
//! Stages hand belief downstream by value. No stage holds a reference into
//! another's store.

use std::collections::BTreeMap;

use serde::Serialize;
use smm_types::{AgentId, BeliefState, RecipeStep, UsabilityEdge, VisibilityPolicy, WorldSnapshot};
use tracing::{debug, info};

use crate::config::{ConfigError, PipelineConfig};
use crate::error::SmmError;
use crate::layout::Layout;
use crate::model::{BeliefModel, TickReport};
use crate::visibility::{Observer, visibility_mask};

/// One labelled model in a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Name used in reports.
    pub label: String,
    /// The stage's belief model.
    pub model: BeliefModel,
}

/// What one stage believed after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Stage name.
    pub label: String,
    /// Observing agent.
    pub agent: AgentId,
    /// Visibility policy.
    pub policy: VisibilityPolicy,
    /// Matching summary.
    pub update: TickReport,
    /// Agents and visible objects after the update.
    pub projection: BeliefState,
    /// Inferred recipe step per agent.
    pub goals: BTreeMap<AgentId, RecipeStep>,
    /// Usability graph over visible objects.
    pub usability: Vec<UsabilityEdge>,
    /// Tiles the observer could see, `[row][column]`, when the grid size is
    /// known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<Vec<bool>>>,
}

/// Every stage's belief after one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Tick of the consumed snapshot.
    pub tick: u64,
    /// Stage reports, upstream first.
    pub stages: Vec<StageReport>,
}

/// A sequence of belief models where each feeds the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeliefChain {
    stages: Vec<Stage>,
    sync_on_first_view: bool,
    synced: bool,
    grid: Option<(usize, usize)>,
}

impl BeliefChain {
    /// A chain over `stages`, upstream first.
    pub const fn new(stages: Vec<Stage>, sync_on_first_view: bool) -> Self {
        Self {
            stages,
            sync_on_first_view,
            synced: false,
            grid: None,
        }
    }

    /// Build the chain described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a stage is malformed or there are
    /// no stages.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let stages = config
            .resolve()?
            .into_iter()
            .map(|stage| Stage {
                label: stage.label,
                model: BeliefModel::new(stage.agent, stage.policy),
            })
            .collect();
        Ok(Self::new(stages, config.sync_on_first_view))
    }

    /// Seed every stage from `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::IdSpaceExhausted`] if seeding runs out of
    /// identifiers.
    pub fn seed(&mut self, layout: &Layout) -> Result<(), SmmError> {
        for stage in &mut self.stages {
            stage.model.seed(layout)?;
        }
        self.grid = Some((layout.width(), layout.height()));
        self.synced = false;
        info!(stages = self.stages.len(), "belief chain seeded");
        Ok(())
    }

    /// Run one snapshot through every stage.
    ///
    /// On the first run with `sync_on_first_view`, every downstream stage
    /// first adopts the first stage's updated belief.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's [`SmmError`]. Stages before it
    /// have already consumed the snapshot; later ones keep their belief.
    pub fn run(&mut self, snapshot: &WorldSnapshot) -> Result<ChainReport, SmmError> {
        let sync = self.sync_on_first_view && !self.synced;
        let grid = self.grid;
        let mut reports = Vec::with_capacity(self.stages.len());
        let mut input = snapshot.clone();
        let mut upstream_truth: Option<BeliefState> = None;

        for stage in &mut self.stages {
            if sync && let Some(truth) = &upstream_truth {
                debug!(stage = %stage.label, "adopting upstream belief on first view");
                stage.model.adopt(truth.clone());
            }
            let update = stage.model.update(&input)?;
            let projection = stage.model.visible_projection()?;
            if upstream_truth.is_none() {
                upstream_truth = Some(projection.clone());
            }
            let mask = grid.and_then(|(width, height)| {
                let agent = projection.agents.get(&stage.model.agent())?;
                let observer = Observer {
                    agent: stage.model.agent(),
                    position: agent.position,
                    facing: agent.facing,
                    policy: stage.model.policy(),
                };
                Some(visibility_mask(width, height, &observer))
            });
            input = projection.to_snapshot(snapshot.tick);
            reports.push(StageReport {
                label: stage.label.clone(),
                agent: stage.model.agent(),
                policy: stage.model.policy(),
                update,
                goals: projection.goals(),
                usability: projection.usability_edges(),
                projection,
                mask,
            });
        }

        self.synced = true;
        Ok(ChainReport {
            tick: snapshot.tick,
            stages: reports,
        })
    }

    /// The stages, upstream first.
    pub const fn stages(&self) -> &[Stage] {
        self.stages.as_slice()
    }

    /// Number of stages.
    pub const fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub const fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smm_types::{Category, ObservedAgent, ObservedObject, Orientation, Position, TempId};

    use super::*;

    fn chain(sync: bool) -> BeliefChain {
        BeliefChain::new(
            vec![
                Stage {
                    label: "truth".to_owned(),
                    model: BeliefModel::new(AgentId::new(0), VisibilityPolicy::omni(20)),
                },
                Stage {
                    label: "robot".to_owned(),
                    model: BeliefModel::new(AgentId::new(0), VisibilityPolicy::directional(3)),
                },
            ],
            sync,
        )
    }

    fn snapshot() -> WorldSnapshot {
        let mut snapshot = WorldSnapshot::new(1);
        snapshot.agents.insert(
            AgentId::new(0),
            ObservedAgent::new(Position::new(2, 1), Orientation::East),
        );
        snapshot.objects.insert(
            TempId::new(1),
            ObservedObject::new(Category::Onion, Position::new(4, 1)),
        );
        snapshot.objects.insert(
            TempId::new(2),
            ObservedObject::new(Category::Tomato, Position::new(0, 1)),
        );
        snapshot
    }

    fn layout() -> Layout {
        Layout::from_grid("XXXXXXX\nX     P\nXXXXSXX").unwrap()
    }

    #[test]
    fn downstream_sees_only_what_upstream_believes_and_it_can_see() {
        let mut chain = chain(false);
        chain.seed(&layout()).unwrap();
        let report = chain.run(&snapshot()).unwrap();

        let truth = report.stages.first().unwrap();
        let robot = report.stages.get(1).unwrap();
        let categories = |stage: &StageReport| -> Vec<Category> {
            stage
                .projection
                .objects
                .values()
                .map(|record| record.category)
                .collect()
        };
        assert!(categories(truth).contains(&Category::Tomato));
        // The tomato is behind the robot.
        assert!(!categories(robot).contains(&Category::Tomato));
        assert!(categories(robot).contains(&Category::Onion));
        // Onion and station are in range; the pot is too far east.
        assert_eq!(robot.update.observed, 2);
    }

    #[test]
    fn first_view_sync_copies_upstream_belief() {
        let mut chain = chain(true);
        chain.seed(&layout()).unwrap();
        let report = chain.run(&snapshot()).unwrap();
        let truth = report.stages.first().unwrap();
        let robot = report.stages.get(1).unwrap();
        // The robot inherits the tomato it cannot see.
        assert_eq!(
            truth.projection.objects.keys().collect::<Vec<_>>(),
            robot.projection.objects.keys().collect::<Vec<_>>()
        );
        assert!(robot.update.new_objects.is_empty());
    }

    #[test]
    fn mask_matches_grid_size() {
        let mut chain = chain(false);
        chain.seed(&layout()).unwrap();
        let report = chain.run(&snapshot()).unwrap();
        let mask = report.stages.get(1).and_then(|s| s.mask.clone()).unwrap();
        assert_eq!(mask.len(), 3);
        assert!(mask.iter().all(|row| row.len() == 7));
        // Row 1: the robot at column 2 faces east with radius 3.
        let row = mask.get(1).unwrap();
        assert!(!row.first().copied().unwrap());
        assert!(row.get(5).copied().unwrap());
    }

    #[test]
    fn unseeded_chain_is_rejected() {
        let mut chain = chain(false);
        assert!(matches!(chain.run(&snapshot()), Err(SmmError::NotInitialized)));
    }

    #[test]
    fn from_config_builds_every_stage() {
        let chain = BeliefChain::from_config(&PipelineConfig::default()).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(
            chain.stages().get(2).map(|s| s.model.policy()),
            Some(VisibilityPolicy::directional(2))
        );
    }
}
