//! Visibility filter: what an observer can perceive from where it stands.
//!
//! One implementation serves every call site. The game side uses
//! [`visibility_mask`] to render what each player sees, and the belief side
//! uses [`redact`] to strip a snapshot down to an observer's view before
//! matching.
//!
//! All comparisons are integer-only: squared distances against the squared
//! radius, and the cone test compares the lateral and forward components of
//! the offset directly.

use smm_types::{
    AgentId, Offset, Orientation, Position, VisibilityKind, VisibilityPolicy, WorldSnapshot,
};

use crate::error::SmmError;

/// Whether a target at `offset` from an observer facing `facing` is visible
/// under `policy`.
///
/// - Omni: within the radius.
/// - Directional: within the radius and not behind the observer.
/// - Cone: within the radius and inside the 90 degree cone around the
///   facing direction (lateral component no larger than forward component).
pub fn can_see(facing: Orientation, policy: VisibilityPolicy, offset: Offset) -> bool {
    if offset.squared_length() > policy.squared_radius() {
        return false;
    }
    let forward = offset.forward(facing);
    match policy.kind {
        VisibilityKind::Omni => true,
        VisibilityKind::Directional => forward >= 0,
        VisibilityKind::Cone => forward >= 0 && offset.lateral(facing) <= forward,
    }
}

/// A positioned observer with its visibility policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observer {
    /// The observing agent.
    pub agent: AgentId,
    /// Where the agent stands.
    pub position: Position,
    /// Where the agent looks.
    pub facing: Orientation,
    /// What the agent can perceive.
    pub policy: VisibilityPolicy,
}

impl Observer {
    /// Locate `agent` in `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`SmmError::UnknownAgent`] if the snapshot has no such agent.
    pub fn locate(
        snapshot: &WorldSnapshot,
        agent: AgentId,
        policy: VisibilityPolicy,
    ) -> Result<Self, SmmError> {
        let observed = snapshot
            .agents
            .get(&agent)
            .ok_or(SmmError::UnknownAgent(agent))?;
        Ok(Self {
            agent,
            position: observed.position,
            facing: observed.facing,
            policy,
        })
    }

    /// Whether the observer can see the tile at `target`.
    pub fn sees(&self, target: Position) -> bool {
        can_see(self.facing, self.policy, self.position.offset_to(target))
    }
}

/// Strip `snapshot` down to what `observer` can perceive.
///
/// Agents are always visible, and so is whatever they carry. Board objects
/// survive only if their tile is visible.
pub fn redact(snapshot: WorldSnapshot, observer: &Observer) -> WorldSnapshot {
    let WorldSnapshot {
        tick,
        agents,
        mut objects,
    } = snapshot;
    objects.retain(|_, object| object.holder.is_some() || observer.sees(object.position));
    WorldSnapshot {
        tick,
        agents,
        objects,
    }
}

/// Per-tile visibility for a `width` x `height` grid, indexed `[row][column]`.
pub fn visibility_mask(width: usize, height: usize, observer: &Observer) -> Vec<Vec<bool>> {
    (0..height)
        .map(|row| {
            (0..width)
                .map(|column| {
                    let (Ok(x), Ok(y)) = (i32::try_from(column), i32::try_from(row)) else {
                        return false;
                    };
                    observer.sees(Position::new(x, y))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smm_types::{Category, ObservedAgent, ObservedObject, TempId};

    use super::*;

    fn observer(x: i32, y: i32, facing: Orientation, policy: &str) -> Observer {
        Observer {
            agent: AgentId::new(0),
            position: Position::new(x, y),
            facing,
            policy: policy.parse().unwrap(),
        }
    }

    #[test]
    fn directional_boundary() {
        let east = observer(5, 2, Orientation::East, "D4");
        assert!(!east.sees(Position::new(4, 2)));
        assert!(east.sees(Position::new(8, 2)));
        assert!(!east.sees(Position::new(10, 2)));
        // Perpendicular tiles lie on the boundary of the half-plane.
        assert!(east.sees(Position::new(5, 0)));
    }

    #[test]
    fn cone_excludes_wide_angles() {
        let cone = observer(0, 0, Orientation::South, "V5");
        assert!(cone.sees(Position::new(2, 2)));
        assert!(!cone.sees(Position::new(3, 2)));
        assert!(!cone.sees(Position::new(0, -1)));
        assert!(cone.sees(Position::new(0, 0)));
    }

    #[test]
    fn omni_ignores_facing() {
        for facing in Orientation::ALL {
            let omni = observer(3, 3, facing, "O2");
            assert!(omni.sees(Position::new(1, 3)));
            assert!(omni.sees(Position::new(4, 4)));
            assert!(!omni.sees(Position::new(5, 5)));
        }
    }

    #[test]
    fn radius_growth_never_hides_tiles() {
        for facing in Orientation::ALL {
            for kind in ['O', 'D', 'V'] {
                for radius in 0_u32..6 {
                    let near = observer(4, 4, facing, &format!("{kind}{radius}"));
                    let far = observer(4, 4, facing, &format!("{kind}{}", radius.saturating_add(1)));
                    let near_mask = visibility_mask(9, 9, &near);
                    let far_mask = visibility_mask(9, 9, &far);
                    for (near_row, far_row) in near_mask.iter().zip(&far_mask) {
                        for (&a, &b) in near_row.iter().zip(far_row) {
                            assert!(!a || b, "{kind}{radius} facing {facing:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn redact_keeps_agents_and_held_objects() {
        let mut snapshot = WorldSnapshot::new(1);
        snapshot.agents.insert(
            AgentId::new(0),
            ObservedAgent::new(Position::new(0, 0), Orientation::East),
        );
        snapshot.agents.insert(
            AgentId::new(1),
            ObservedAgent::new(Position::new(0, 5), Orientation::North),
        );
        snapshot.objects.insert(
            TempId::new(1),
            ObservedObject::new(Category::Onion, Position::new(2, 0)),
        );
        snapshot.objects.insert(
            TempId::new(2),
            ObservedObject::new(Category::Onion, Position::new(0, 4)),
        );
        snapshot.objects.insert(
            TempId::new(3),
            ObservedObject::new(Category::Dish, Position::new(0, 5)).held_by(AgentId::new(1)),
        );

        let viewer = Observer::locate(&snapshot, AgentId::new(0), "D3".parse().unwrap()).unwrap();
        let redacted = redact(snapshot, &viewer);
        assert_eq!(redacted.agents.len(), 2);
        let kept: Vec<TempId> = redacted.objects.keys().copied().collect();
        assert_eq!(kept, vec![TempId::new(1), TempId::new(3)]);
    }

    #[test]
    fn locate_rejects_missing_agent() {
        let snapshot = WorldSnapshot::new(0);
        let result = Observer::locate(&snapshot, AgentId::new(1), VisibilityPolicy::omni(3));
        assert!(matches!(result, Err(SmmError::UnknownAgent(agent)) if agent == AgentId::new(1)));
    }
}
