//! Object matcher: re-identifies this tick's observations against belief.
//!
//! The matcher reconciles the visible objects of a [`BeliefStore`] with the
//! objects of a redacted [`WorldSnapshot`] and returns a total assignment of
//! snapshot [`TempId`]s to stable [`ObjectId`]s (or [`Assignment::New`]),
//! plus the known objects it believes stopped existing.
//!
//! Five passes run in order, from most to least confident. Each pass only
//! sees what earlier passes left unmatched and never revisits a decision:
//!
//! 1. **Exact**: same category on the same tile. A known soup with contents
//!    only matches an observed soup whose contents are a superset; the
//!    surplus (the ingredient delta) is resolved in pass 4.
//! 2. **Held**: observations tagged with a holder. A soup the agent was
//!    already carrying is followed as is. A freshly plated soup absorbs the
//!    dish it was plated on and links to the soup it was scooped from.
//!    Other held objects link to the nearest same-category object that was
//!    carried by the same agent or was in plain view.
//! 3. **Nearest**: repeated rounds of nearest same-category proposals, each
//!    known object taking its closest bidder, until a round adds nothing.
//! 4. **Transform**: ingredient deltas consume the nearest free ingredients,
//!    then soups with no antecedent consume one free ingredient per content.
//! 5. **Disposal**: unmatched ready soups were delivered to the nearest
//!    station; unmatched observations are new.
//!
//! Ties on distance always go to the lowest identifier, so identical inputs
//! produce identical assignments. The matcher never mutates the store; the
//! [`PredicateUpdater`](crate::predicates::PredicateUpdater) applies the
//! outcome.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use smm_types::{Category, ObjectId, ObjectRecord, ObservedObject, Position, TempId, WorldSnapshot};
use tracing::{debug, warn};

use crate::store::BeliefStore;
use crate::visibility::Observer;

/// Identity chosen for one observed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Assignment {
    /// The observation is a known object.
    Known(ObjectId),
    /// The observation needs a fresh identifier.
    New,
}

/// What a retired object turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Absorber {
    /// Merged into a known object.
    Known {
        /// The absorbing object.
        id: ObjectId,
    },
    /// Merged into an observation whose identity is settled by the updater.
    Observed {
        /// The absorbing observation.
        temp: TempId,
    },
    /// Handed in at a serving station.
    Delivered {
        /// The station, if one was known.
        station: Option<ObjectId>,
    },
}

/// A known object the matcher believes no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retirement {
    /// The retired object.
    pub id: ObjectId,
    /// Where the object ended up, if it moved.
    pub position: Option<Position>,
    /// What the object became.
    pub absorbed_into: Absorber,
}

/// Per-pass counters for one matching run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    /// Pass 1 matches.
    pub exact: usize,
    /// Pass 2 matches.
    pub held: usize,
    /// Pass 3 matches.
    pub nearest: usize,
    /// Pass 3 rounds, including the final empty one.
    pub nearest_rounds: usize,
    /// Ingredients absorbed by a known soup's delta.
    pub absorbed: usize,
    /// Ingredients consumed by a soup without antecedent.
    pub congealed: usize,
    /// Dishes absorbed by a plated soup.
    pub plated: usize,
    /// Ready soups assumed delivered.
    pub delivered: usize,
    /// Observations assigned a fresh identifier.
    pub new: usize,
    /// Ingredients that could not be resolved to any known object.
    pub unresolved: usize,
}

/// Result of one matching run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Identity of every observed object.
    pub assignments: BTreeMap<TempId, Assignment>,
    /// Known objects to retire, in the order they were decided.
    pub retirements: Vec<Retirement>,
    /// Pass counters.
    pub stats: PassStats,
}

/// Ingredients added to a matched soup since it was last seen.
#[derive(Debug, Clone)]
struct SoupDelta {
    soup: ObjectId,
    anchor: Position,
    ingredients: Vec<Category>,
}

/// Multiset difference `observed - known`, or `None` if `known` has an
/// ingredient `observed` lacks.
fn ingredient_delta(known: &[Category], observed: &[Category]) -> Option<Vec<Category>> {
    let mut remaining = observed.to_vec();
    for ingredient in known {
        let index = remaining.iter().position(|c| c == ingredient)?;
        remaining.remove(index);
    }
    Some(remaining)
}

fn bump(counter: &mut usize) {
    *counter = counter.saturating_add(1);
}

/// One matching run over a fixed store and snapshot.
pub struct ObjectMatcher<'a> {
    known: BTreeMap<ObjectId, &'a ObjectRecord>,
    observed: &'a BTreeMap<TempId, ObservedObject>,
    observer: &'a Observer,
    ids: BTreeMap<TempId, ObjectId>,
    claimed: BTreeSet<ObjectId>,
    deltas: Vec<SoupDelta>,
    retirements: Vec<Retirement>,
    stats: PassStats,
}

impl<'a> ObjectMatcher<'a> {
    /// Match the objects of a normalized, redacted `snapshot` against the
    /// visible objects of `store`.
    pub fn run(store: &'a BeliefStore, snapshot: &'a WorldSnapshot, observer: &'a Observer) -> MatchOutcome {
        let mut matcher = Self {
            known: store.visible_objects().collect(),
            observed: &snapshot.objects,
            observer,
            ids: BTreeMap::new(),
            claimed: BTreeSet::new(),
            deltas: Vec::new(),
            retirements: Vec::new(),
            stats: PassStats::default(),
        };
        matcher.exact_pass();
        matcher.held_pass();
        matcher.nearest_pass();
        matcher.resolve_deltas();
        matcher.congeal_soups();
        matcher.dispose();
        matcher.finish()
    }

    /// Observations without an identity yet, in snapshot order.
    fn unmatched_observed(&self) -> Vec<TempId> {
        self.observed
            .keys()
            .filter(|temp| !self.ids.contains_key(temp))
            .copied()
            .collect()
    }

    /// Movable known objects nobody has claimed, in identifier order.
    fn unmatched_known(&self) -> Vec<ObjectId> {
        self.known
            .iter()
            .filter(|(id, record)| !self.claimed.contains(id) && !record.category.is_fixed_appliance())
            .map(|(&id, _)| id)
            .collect()
    }

    /// The unmatched known object closest to `target` among those accepted
    /// by `eligible`.
    fn nearest_unmatched(
        &self,
        target: Position,
        eligible: impl Fn(&ObjectRecord) -> bool,
    ) -> Option<ObjectId> {
        self.unmatched_known()
            .into_iter()
            .filter_map(|id| {
                let record = self.known.get(&id).copied()?;
                eligible(record).then(|| (record.position.squared_distance(target), id))
            })
            .min_by_key(|&(distance, _)| distance)
            .map(|(_, id)| id)
    }

    fn claim(&mut self, temp: TempId, id: ObjectId) {
        self.ids.insert(temp, id);
        self.claimed.insert(id);
    }

    fn retire(&mut self, id: ObjectId, position: Option<Position>, absorbed_into: Absorber) {
        debug!(object = %id, ?position, ?absorbed_into, "retiring known object");
        self.claimed.insert(id);
        self.retirements.push(Retirement {
            id,
            position,
            absorbed_into,
        });
    }

    fn record_delta(&mut self, soup: ObjectId, anchor: Position, ingredients: Vec<Category>) {
        if !ingredients.is_empty() {
            self.deltas.push(SoupDelta {
                soup,
                anchor,
                ingredients,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Pass 1: exact
    // -----------------------------------------------------------------------

    fn exact_pass(&mut self) {
        let observed = self.observed;
        for (&temp, object) in observed {
            let candidate = self.known.iter().find_map(|(&id, record)| {
                if self.claimed.contains(&id)
                    || record.category != object.category
                    || record.position != object.position
                {
                    return None;
                }
                if record.category != Category::Soup {
                    return Some((id, Vec::new()));
                }
                if record.ingredients.is_empty() {
                    return None;
                }
                ingredient_delta(&record.ingredients, object.ingredient_list())
                    .map(|delta| (id, delta))
            });
            if let Some((id, delta)) = candidate {
                self.claim(temp, id);
                self.record_delta(id, object.position, delta);
                bump(&mut self.stats.exact);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pass 2: held
    // -----------------------------------------------------------------------

    fn held_pass(&mut self) {
        let observed = self.observed;
        for (&temp, object) in observed {
            let Some(holder) = object.holder else {
                continue;
            };
            if object.category == Category::Soup {
                match self.ids.get(&temp).copied() {
                    Some(soup) => {
                        // Scooped from where it sat last tick.
                        let was_loose = self.known.get(&soup).is_some_and(|r| r.holder.is_none());
                        if was_loose {
                            self.absorb_dish(temp, object);
                        }
                    }
                    None => {
                        if !self.follow_carried_soup(temp, object) {
                            self.absorb_dish(temp, object);
                            self.link_plated_soup(temp, object);
                        }
                    }
                }
            } else if !self.ids.contains_key(&temp) {
                let observer = self.observer;
                let found = self.nearest_unmatched(object.position, |record| {
                    record.category == object.category
                        && match record.holder {
                            Some(previous) => previous == holder,
                            None => observer.sees(record.position),
                        }
                });
                if let Some(id) = found {
                    self.claim(temp, id);
                    bump(&mut self.stats.held);
                }
            }
        }
    }

    /// Retire the dish a held soup was plated on: one the same agent was
    /// carrying, or one lying on the agent's tile.
    fn absorb_dish(&mut self, temp: TempId, soup: &ObservedObject) {
        let dish = self
            .unmatched_known()
            .into_iter()
            .filter_map(|id| {
                let record = self.known.get(&id)?;
                let carried = record.holder.is_some() && record.holder == soup.holder;
                let underfoot = record.holder.is_none() && record.position == soup.position;
                (record.category == Category::Dish && (carried || underfoot))
                    .then(|| ((!carried, record.position.squared_distance(soup.position)), id))
            })
            .min_by_key(|&(key, _)| key)
            .map(|(_, id)| id);
        match dish {
            Some(id) => {
                self.retire(id, Some(soup.position), Absorber::Observed { temp });
                bump(&mut self.stats.plated);
            }
            None => debug!(observation = %temp, "held soup has no known dish to absorb"),
        }
    }

    /// Follow a soup the same agent was already carrying. Returns whether
    /// one was found.
    fn follow_carried_soup(&mut self, temp: TempId, soup: &ObservedObject) -> bool {
        let contents = soup.ingredient_list();
        let carried = self.nearest_unmatched(soup.position, |record| {
            record.category == Category::Soup
                && record.holder.is_some()
                && record.holder == soup.holder
                && ingredient_delta(&record.ingredients, contents).is_some()
        });
        let Some(id) = carried else {
            return false;
        };
        self.claim(temp, id);
        bump(&mut self.stats.held);
        true
    }

    /// Link a freshly plated soup to the loose soup it was scooped from.
    fn link_plated_soup(&mut self, temp: TempId, soup: &ObservedObject) {
        let contents = soup.ingredient_list();
        let source = self.nearest_unmatched(soup.position, |record| {
            record.category == Category::Soup
                && record.holder.is_none()
                && ingredient_delta(&record.ingredients, contents).is_some()
        });
        match source {
            Some(id) => {
                self.claim(temp, id);
                bump(&mut self.stats.held);
            }
            None => warn!(
                observation = %temp,
                position = %soup.position,
                "held soup matches no known soup, leaving it to later passes"
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Pass 3: nearest
    // -----------------------------------------------------------------------

    fn soup_compatible(record: &ObjectRecord, object: &ObservedObject) -> Option<Vec<Category>> {
        if record.ingredients.is_empty() {
            return object.ingredient_list().is_empty().then(Vec::new);
        }
        if !object.has_ingredient_data() {
            return None;
        }
        ingredient_delta(&record.ingredients, object.ingredient_list())
    }

    fn nearest_pass(&mut self) {
        let observed = self.observed;
        loop {
            let pending = self.unmatched_observed();
            if pending.is_empty() {
                break;
            }
            bump(&mut self.stats.nearest_rounds);

            let mut proposals: BTreeMap<ObjectId, Vec<(i64, TempId)>> = BTreeMap::new();
            for temp in pending {
                let Some(object) = observed.get(&temp) else {
                    continue;
                };
                let best = self
                    .unmatched_known()
                    .into_iter()
                    .filter_map(|id| {
                        let record = self.known.get(&id).copied()?;
                        if record.category != object.category {
                            return None;
                        }
                        if record.category == Category::Soup {
                            Self::soup_compatible(record, object)?;
                        }
                        Some((record.position.squared_distance(object.position), id))
                    })
                    .min_by_key(|&(distance, _)| distance);
                if let Some((distance, id)) = best {
                    proposals.entry(id).or_default().push((distance, temp));
                }
            }

            let mut progressed = false;
            for (id, bids) in proposals {
                let Some(&(_, temp)) = bids.iter().min_by_key(|&&(distance, _)| distance) else {
                    continue;
                };
                let (Some(record), Some(object)) = (self.known.get(&id).copied(), observed.get(&temp))
                else {
                    continue;
                };
                let delta = if record.category == Category::Soup {
                    Self::soup_compatible(record, object).unwrap_or_default()
                } else {
                    Vec::new()
                };
                self.claim(temp, id);
                self.record_delta(id, object.position, delta);
                bump(&mut self.stats.nearest);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pass 4: transform
    // -----------------------------------------------------------------------

    fn resolve_deltas(&mut self) {
        for delta in std::mem::take(&mut self.deltas) {
            for &ingredient in &delta.ingredients {
                let best = self
                    .unmatched_known()
                    .into_iter()
                    .filter_map(|id| {
                        let record = self.known.get(&id)?;
                        (record.category == ingredient).then(|| {
                            let key = (
                                record.position.squared_distance(delta.anchor),
                                record.holder.is_none(),
                            );
                            (key, id)
                        })
                    })
                    .min_by_key(|&(key, _)| key)
                    .map(|(_, id)| id);
                let Some(id) = best else {
                    warn!(
                        soup = %delta.soup,
                        %ingredient,
                        "no known ingredient left to account for soup contents"
                    );
                    bump(&mut self.stats.unresolved);
                    break;
                };
                self.retire(id, Some(delta.anchor), Absorber::Known { id: delta.soup });
                bump(&mut self.stats.absorbed);
            }
        }
    }

    fn congeal_soups(&mut self) {
        let observed = self.observed;
        for temp in self.unmatched_observed() {
            let Some(soup) = observed.get(&temp) else {
                continue;
            };
            if soup.category != Category::Soup {
                continue;
            }
            let contents = soup.ingredient_list();
            if contents.is_empty() {
                warn!(observation = %temp, position = %soup.position, "soup without ingredients has no antecedent");
                bump(&mut self.stats.unresolved);
                continue;
            }
            for &ingredient in contents {
                match self.nearest_unmatched(soup.position, |record| record.category == ingredient) {
                    Some(id) => {
                        self.retire(id, Some(soup.position), Absorber::Observed { temp });
                        bump(&mut self.stats.congealed);
                    }
                    None => {
                        warn!(observation = %temp, %ingredient, "soup ingredient has no known antecedent");
                        bump(&mut self.stats.unresolved);
                    }
                }
            }
            let placeholder = self.unmatched_known().into_iter().find(|id| {
                self.known
                    .get(id)
                    .is_some_and(|r| r.category == Category::Soup && r.position == soup.position)
            });
            if let Some(id) = placeholder {
                debug!(observation = %temp, soup = %id, "soup takes over placeholder on its tile");
                self.claim(temp, id);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pass 5: disposal
    // -----------------------------------------------------------------------

    fn dispose(&mut self) {
        let stations: Vec<(ObjectId, Position)> = self
            .known
            .iter()
            .filter(|(_, record)| record.category == Category::Station)
            .map(|(&id, record)| (id, record.position))
            .collect();
        for id in self.unmatched_known() {
            let Some(record) = self.known.get(&id).copied() else {
                continue;
            };
            if !record.is_ready_soup() {
                continue;
            }
            let origin = record.position;
            let station = stations
                .iter()
                .min_by_key(|&&(_, position)| position.squared_distance(origin))
                .copied();
            self.retire(
                id,
                station.map(|(_, position)| position),
                Absorber::Delivered {
                    station: station.map(|(station, _)| station),
                },
            );
            bump(&mut self.stats.delivered);
        }
    }

    fn finish(mut self) -> MatchOutcome {
        let assignments: BTreeMap<TempId, Assignment> = self
            .observed
            .keys()
            .map(|temp| {
                let assignment = self.ids.get(temp).map_or(Assignment::New, |&id| Assignment::Known(id));
                (*temp, assignment)
            })
            .collect();
        self.stats.new = assignments
            .values()
            .filter(|assignment| **assignment == Assignment::New)
            .count();
        debug!(
            observed = self.observed.len(),
            exact = self.stats.exact,
            held = self.stats.held,
            nearest = self.stats.nearest,
            rounds = self.stats.nearest_rounds,
            retired = self.retirements.len(),
            new = self.stats.new,
            unresolved = self.stats.unresolved,
            "matching complete"
        );
        MatchOutcome {
            assignments,
            retirements: self.retirements,
            stats: self.stats,
        }
    }
}
