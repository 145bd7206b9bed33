//! Enumeration types for the kitchen ontology and the task recipe.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Object categories
// ---------------------------------------------------------------------------

/// The fixed ontology of things that can exist on the kitchen board.
///
/// A category is immutable once assigned to an identifier: objects that
/// "transform" (three onions into a soup) retire their old identities
/// instead of changing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Category {
    /// A cooking pot. Fixed appliance, seeded from the layout.
    Pot,
    /// A serving station where finished soups are delivered. Fixed appliance.
    Station,
    /// Onion ingredient.
    Onion,
    /// Tomato ingredient.
    Tomato,
    /// An empty dish.
    Dish,
    /// A soup: in a pot while cooking, on a dish once plated.
    Soup,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Pot,
        Self::Station,
        Self::Onion,
        Self::Tomato,
        Self::Dish,
        Self::Soup,
    ];

    /// Maximum number of ingredients a soup can hold.
    pub const MAX_INGREDIENTS: usize = 3;

    /// The lowercase name used by logs and layouts.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pot => "pot",
            Self::Station => "station",
            Self::Onion => "onion",
            Self::Tomato => "tomato",
            Self::Dish => "dish",
            Self::Soup => "soup",
        }
    }

    /// Whether this category can be put into a pot.
    pub const fn is_ingredient(self) -> bool {
        matches!(self, Self::Onion | Self::Tomato)
    }

    /// Whether this category is a fixed appliance that never moves.
    pub const fn is_fixed_appliance(self) -> bool {
        matches!(self, Self::Pot | Self::Station)
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::str::FromStr for Category {
    type Err = ParseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.name() == name)
            .ok_or_else(|| ParseError::UnknownCategory(name.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Shape of an observer's field of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum VisibilityKind {
    /// Everything within the radius, all around (`O`).
    Omni,
    /// The half-plane in front of the observer, within the radius (`D`).
    Directional,
    /// A 90 degree cone centered on the facing direction, within the radius (`V`).
    Cone,
}

impl VisibilityKind {
    /// The letter used by the textual policy form.
    pub const fn letter(self) -> char {
        match self {
            Self::Omni => 'O',
            Self::Directional => 'D',
            Self::Cone => 'V',
        }
    }

    /// Parse a policy letter.
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'O' => Some(Self::Omni),
            'D' => Some(Self::Directional),
            'V' => Some(Self::Cone),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// An observable fact used to classify what an agent is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Predicate {
    /// The agent's hands are empty.
    HoldingNothing,
    /// The agent carries an onion or a tomato.
    HoldingIngredient,
    /// The agent carries an empty dish.
    HoldingDish,
    /// The agent carries a plated soup.
    HoldingSoup,
    /// Some pot holds no ingredients.
    PotContainsNothing,
    /// Some pot holds ingredients that are not cooking yet.
    PotContainsIngredients,
    /// Some pot is not cooking.
    PotNotCooking,
    /// Some pot is cooking.
    PotCooking,
    /// Some pot is part way through cooking.
    PotCookingInProgress,
    /// Some pot holds a finished soup.
    PotCookingComplete,
}

impl Predicate {
    /// The predicate string used in recipe tables.
    pub const fn label(self) -> &'static str {
        match self {
            Self::HoldingNothing => "A holding null",
            Self::HoldingIngredient => "A holding ingredient",
            Self::HoldingDish => "A holding dish",
            Self::HoldingSoup => "A holding soup",
            Self::PotContainsNothing => "Pot contains null",
            Self::PotContainsIngredients => "Pot contains ingredients",
            Self::PotNotCooking => "Pot cooking no",
            Self::PotCooking => "Pot cooking",
            Self::PotCookingInProgress => "Pot cooking progress",
            Self::PotCookingComplete => "Pot cooking complete",
        }
    }
}

impl core::fmt::Display for Predicate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// One step of the fixed soup recipe, used as an agent's inferred goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RecipeStep {
    /// Fetch an onion or tomato.
    PickUpIngredient,
    /// Drop the carried ingredient into a pot.
    PlaceIngredientIntoPot,
    /// Start cooking a filled pot.
    ActivatePot,
    /// Fetch a dish while a soup cooks.
    PickUpDish,
    /// Idle until the soup is done.
    WaitForCooking,
    /// Scoop the finished soup onto the carried dish.
    PlaceSoupOnDish,
    /// Deliver the plated soup at a station.
    PlaceSoupOnCounter,
}

impl RecipeStep {
    /// The recipe table, in priority order for tie-breaking.
    pub const ALL: [Self; 7] = [
        Self::PickUpIngredient,
        Self::PlaceIngredientIntoPot,
        Self::ActivatePot,
        Self::PickUpDish,
        Self::WaitForCooking,
        Self::PlaceSoupOnDish,
        Self::PlaceSoupOnCounter,
    ];

    /// Human-readable step name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::PickUpIngredient => "pick up ingredient",
            Self::PlaceIngredientIntoPot => "place ingredient into pot",
            Self::ActivatePot => "activate pot",
            Self::PickUpDish => "picking up dish",
            Self::WaitForCooking => "wait for cooking",
            Self::PlaceSoupOnDish => "place soup on dish",
            Self::PlaceSoupOnCounter => "place soup on counter",
        }
    }

    /// Predicates that indicate this step is the agent's current goal.
    pub const fn requirements(self) -> &'static [Predicate] {
        match self {
            Self::PickUpIngredient => &[Predicate::HoldingNothing, Predicate::PotContainsNothing],
            Self::PlaceIngredientIntoPot => {
                &[Predicate::HoldingIngredient, Predicate::PotNotCooking]
            }
            Self::ActivatePot => &[Predicate::PotContainsIngredients, Predicate::PotNotCooking],
            Self::PickUpDish => &[Predicate::HoldingNothing, Predicate::PotCookingInProgress],
            Self::WaitForCooking => &[Predicate::PotCooking],
            Self::PlaceSoupOnDish => &[Predicate::HoldingDish, Predicate::PotCookingComplete],
            Self::PlaceSoupOnCounter => &[Predicate::HoldingSoup],
        }
    }
}

impl core::fmt::Display for RecipeStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
