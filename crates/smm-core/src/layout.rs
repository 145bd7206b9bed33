//! Kitchen layouts: the character grid a belief store is seeded from.
//!
//! A layout file is YAML (JSON works too) with a `grid` literal and an
//! optional start state:
//!
//! ```yaml
//! grid: |
//!   XXPXX
//!   O  2O
//!   X1  X
//!   XDXSX
//! start_state:
//!   objects:
//!     - { name: onion, position: [2, 1] }
//! ```
//!
//! `P` marks a pot and `S` a serving station. Starting ingredients are
//! overlaid onto the grid as `o` (onion) and `t` (tomato) markers before
//! seeding.

use std::path::Path;

use serde::Deserialize;
use smm_types::{Category, ParseError, Position};
use tracing::debug;

/// Errors that can occur while loading a layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Failed to read the layout file from disk.
    #[error("failed to read layout file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse the layout document.
    #[error("failed to parse layout: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The grid has no rows.
    #[error("layout grid is empty")]
    EmptyGrid,

    /// A start-state object lies outside the grid.
    #[error("start object {name} at {position} is outside the {width}x{height} grid")]
    OutOfBounds {
        /// Category name of the object.
        name: String,
        /// Offending position.
        position: Position,
        /// Grid width in tiles.
        width: usize,
        /// Grid height in tiles.
        height: usize,
    },

    /// A start-state object has an unknown category.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<serde_yml::Error> for LayoutError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// On-disk layout document.
#[derive(Debug, Clone, Deserialize)]
struct LayoutFile {
    grid: String,
    #[serde(default)]
    start_state: Option<StartState>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StartState {
    #[serde(default)]
    objects: Vec<StartObject>,
}

#[derive(Debug, Clone, Deserialize)]
struct StartObject {
    name: String,
    position: (i32, i32),
}

/// A parsed kitchen grid, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    rows: Vec<Vec<char>>,
}

impl Layout {
    /// Load a layout document from `path`.
    pub fn from_file(path: &Path) -> Result<Self, LayoutError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a layout document and overlay its start state.
    pub fn parse(document: &str) -> Result<Self, LayoutError> {
        let file: LayoutFile = serde_yml::from_str(document)?;
        let mut layout = Self::from_grid(&file.grid)?;
        for object in file.start_state.unwrap_or_default().objects {
            layout.place_start_object(&object)?;
        }
        Ok(layout)
    }

    /// Build a layout from a bare grid literal.
    ///
    /// Trailing whitespace is trimmed from each line and blank lines are
    /// dropped. Leading spaces are floor tiles and keep their column.
    pub fn from_grid(grid: &str) -> Result<Self, LayoutError> {
        let rows: Vec<Vec<char>> = grid
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();
        if rows.is_empty() {
            return Err(LayoutError::EmptyGrid);
        }
        Ok(Self { rows })
    }

    /// Number of columns of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// The character at `position`, if it lies on the grid.
    pub fn tile(&self, position: Position) -> Option<char> {
        let row = usize::try_from(position.y).ok()?;
        let column = usize::try_from(position.x).ok()?;
        self.rows.get(row)?.get(column).copied()
    }

    /// Fixed appliances and starting ingredients in row-major order.
    pub fn fixed_appliances(&self) -> Vec<(Category, Position)> {
        let mut found = Vec::new();
        for (row, line) in self.rows.iter().enumerate() {
            for (column, &tile) in line.iter().enumerate() {
                let category = match tile {
                    'P' => Category::Pot,
                    'S' => Category::Station,
                    'o' => Category::Onion,
                    't' => Category::Tomato,
                    _ => continue,
                };
                if let (Ok(x), Ok(y)) = (i32::try_from(column), i32::try_from(row)) {
                    found.push((category, Position::new(x, y)));
                }
            }
        }
        found
    }

    fn place_start_object(&mut self, object: &StartObject) -> Result<(), LayoutError> {
        let category: Category = object.name.parse()?;
        let marker = match category {
            Category::Onion => 'o',
            Category::Tomato => 't',
            _ => {
                debug!(name = %object.name, "ignoring non-ingredient start object");
                return Ok(());
            }
        };
        let position = Position::from(object.position);
        let (width, height) = (self.width(), self.height());
        let out_of_bounds = || LayoutError::OutOfBounds {
            name: object.name.clone(),
            position,
            width,
            height,
        };
        let row = usize::try_from(position.y).ok().ok_or_else(out_of_bounds)?;
        let column = usize::try_from(position.x).ok().ok_or_else(out_of_bounds)?;
        let tile = self
            .rows
            .get_mut(row)
            .and_then(|line| line.get_mut(column))
            .ok_or_else(out_of_bounds)?;
        *tile = marker;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r"
grid: |
    XXPXX
    O  2O
    X1  X
    XDXSX
start_state:
  objects:
    - { name: onion, position: [1, 1] }
    - { name: tomato, position: [3, 2] }
    - { name: dish, position: [2, 2] }
";

    #[test]
    fn block_scalar_indentation_is_not_part_of_the_grid() {
        let layout = Layout::parse(DOCUMENT).unwrap();
        assert_eq!(layout.width(), 5);
        assert_eq!(layout.height(), 4);
        assert_eq!(layout.tile(Position::new(2, 0)), Some('P'));
        assert_eq!(layout.tile(Position::new(5, 0)), None);
    }

    #[test]
    fn start_ingredients_are_overlaid() {
        let layout = Layout::parse(DOCUMENT).unwrap();
        assert_eq!(layout.tile(Position::new(1, 1)), Some('o'));
        assert_eq!(layout.tile(Position::new(3, 2)), Some('t'));
        // Dishes are not seeded.
        assert_eq!(layout.tile(Position::new(2, 2)), Some(' '));
        assert_eq!(
            layout.fixed_appliances(),
            vec![
                (Category::Pot, Position::new(2, 0)),
                (Category::Onion, Position::new(1, 1)),
                (Category::Tomato, Position::new(3, 2)),
                (Category::Station, Position::new(3, 3)),
            ]
        );
    }

    #[test]
    fn out_of_bounds_start_object_is_rejected() {
        let document = "grid: \"XPX\\nXSX\"\nstart_state:\n  objects:\n    - { name: onion, position: [7, 0] }\n";
        let result = Layout::parse(document);
        assert!(matches!(result, Err(LayoutError::OutOfBounds { .. })));
    }

    #[test]
    fn unknown_start_object_is_rejected() {
        let document = "grid: \"XPX\"\nstart_state:\n  objects:\n    - { name: lettuce, position: [0, 0] }\n";
        let result = Layout::parse(document);
        assert!(matches!(result, Err(LayoutError::Parse(ParseError::UnknownCategory(_)))));
    }

    #[test]
    fn json_documents_are_accepted() {
        let layout = Layout::parse(r#"{"grid": "XPX\nXSX"}"#).unwrap();
        assert_eq!(layout.fixed_appliances().len(), 2);
    }

    #[test]
    fn leading_floor_tiles_keep_their_column() {
        let layout = Layout::from_grid("XXPX\n  SX  \r\nX  X").unwrap();
        assert_eq!(layout.width(), 4);
        assert_eq!(layout.tile(Position::new(0, 1)), Some(' '));
        assert_eq!(layout.tile(Position::new(2, 1)), Some('S'));
        assert_eq!(
            layout.fixed_appliances(),
            vec![(Category::Pot, Position::new(2, 0)), (Category::Station, Position::new(2, 1))]
        );
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert!(matches!(Layout::from_grid("  \n \n"), Err(LayoutError::EmptyGrid)));
    }
}
