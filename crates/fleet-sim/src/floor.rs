//! Table layout for a simulated dining room.
//!
//! Tables sit on a square grid, 3 m apart and offset 3 m from the kitchen
//! at the origin.  Robots start in a row next to the kitchen.

use fleet_core::{Position, TableId};

use crate::{SimError, SimResult};

const SPACING: f32 = 3.0;

#[derive(Clone, Debug)]
pub struct FloorPlan {
    tables: Vec<Position>,
}

impl FloorPlan {
    pub fn grid(table_count: u32) -> Self {
        let columns = (table_count as f64).sqrt().ceil().max(1.0) as u32;
        let tables = (0..table_count)
            .map(|i| {
                let (row, col) = (i / columns, i % columns);
                Position::new(SPACING * (col + 1) as f32, SPACING * (row + 1) as f32)
            })
            .collect();
        Self { tables }
    }

    /// Position of `table`.  Table ids are 1-based.
    pub fn position(&self, table: TableId) -> SimResult<Position> {
        (table.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.tables.get(i))
            .copied()
            .ok_or_else(|| SimError::NotFound(format!("table {table}")))
    }

    pub fn robot_home(&self, index: u32) -> Position {
        Position::new(0.5 * index as f32, 0.0)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
