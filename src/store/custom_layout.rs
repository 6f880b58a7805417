//! User-defined layouts and their zone geometry.

use serde::{Deserialize, Serialize};

use crate::overlay::types::{Rect, Zone, ZoneLayout};

/// Percentages of a grid's rows or columns add up to this.
pub const GRID_PERCENT_TOTAL: u32 = 10_000;

/// A custom layout created in the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomZoneSet {
    pub uuid: String,
    pub name: String,
    pub layout: CustomLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomLayout {
    Canvas(CanvasLayout),
    Grid(GridLayout),
}

/// Free-form zones drawn on a reference work area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CanvasLayout {
    pub ref_width: u32,
    pub ref_height: u32,
    pub zones: Vec<CanvasZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasZone {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Zones built from merged grid cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GridLayout {
    pub rows: usize,
    pub columns: usize,
    pub rows_percentage: Vec<u32>,
    pub columns_percentage: Vec<u32>,
    /// Zone index of every cell, row-major.
    pub cell_child_map: Vec<Vec<usize>>,
}

impl CustomZoneSet {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, layout: CustomLayout) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            layout,
        }
    }

    /// Zones laid out on `work_area`.
    pub fn zones(&self, work_area: Rect) -> ZoneLayout {
        match &self.layout {
            CustomLayout::Canvas(canvas) => canvas.zones(work_area),
            CustomLayout::Grid(grid) => grid.zones(work_area),
        }
    }

    pub fn is_valid(&self) -> bool {
        match &self.layout {
            CustomLayout::Canvas(canvas) => canvas.is_valid(),
            CustomLayout::Grid(grid) => grid.is_valid(),
        }
    }
}

impl CanvasLayout {
    pub fn is_valid(&self) -> bool {
        self.ref_width > 0 && self.ref_height > 0
    }

    /// Zones scaled from the reference size to `work_area`.
    pub fn zones(&self, work_area: Rect) -> ZoneLayout {
        if !self.is_valid() {
            return ZoneLayout::new();
        }

        let sx = work_area.width() as f64 / self.ref_width as f64;
        let sy = work_area.height() as f64 / self.ref_height as f64;
        let scale_x = |v: i64| work_area.left + (v as f64 * sx).round() as i32;
        let scale_y = |v: i64| work_area.top + (v as f64 * sy).round() as i32;

        ZoneLayout::from_zones(self.zones.iter().enumerate().map(|(id, z)| {
            let right = z.x as i64 + z.width as i64;
            let bottom = z.y as i64 + z.height as i64;
            Zone::new(
                id,
                Rect::new(
                    scale_x(z.x as i64),
                    scale_y(z.y as i64),
                    scale_x(right),
                    scale_y(bottom),
                ),
            )
        }))
    }
}

impl GridLayout {
    /// Dimensions agree, both percentage lists add up to 10000, and every
    /// cell names a zone index below `rows * columns`.
    pub fn is_valid(&self) -> bool {
        let Some(cell_count) = self.rows.checked_mul(self.columns) else {
            return false;
        };
        self.rows > 0
            && self.columns > 0
            && self.rows_percentage.len() == self.rows
            && self.columns_percentage.len() == self.columns
            && percent_total(&self.rows_percentage) == GRID_PERCENT_TOTAL as u64
            && percent_total(&self.columns_percentage) == GRID_PERCENT_TOTAL as u64
            && self.cell_child_map.len() == self.rows
            && self.cell_child_map.iter().all(|row| row.len() == self.columns)
            && self.cell_child_map.iter().flatten().all(|&index| index < cell_count)
    }

    /// Each zone is the bounding box of the cells carrying its index.
    pub fn zones(&self, work_area: Rect) -> ZoneLayout {
        if !self.is_valid() {
            return ZoneLayout::new();
        }

        let row_edges = edges(work_area.top, work_area.height(), &self.rows_percentage);
        let col_edges = edges(work_area.left, work_area.width(), &self.columns_percentage);

        let zone_count = self
            .cell_child_map
            .iter()
            .flatten()
            .max()
            .map_or(0, |max| max + 1);
        let mut bounds: Vec<Option<Rect>> = vec![None; zone_count];

        for (row, cells) in self.cell_child_map.iter().enumerate() {
            for (col, &index) in cells.iter().enumerate() {
                let cell = Rect::new(
                    col_edges[col],
                    row_edges[row],
                    col_edges[col + 1],
                    row_edges[row + 1],
                );
                let slot = &mut bounds[index];
                *slot = Some(slot.map_or(cell, |r| r.union(&cell)));
            }
        }

        ZoneLayout::from_zones(
            bounds
                .into_iter()
                .enumerate()
                .filter_map(|(id, rect)| rect.map(|r| Zone::new(id, r))),
        )
    }
}

/// Cumulative pixel edges for a list of percentages over `extent`.
fn percent_total(percents: &[u32]) -> u64 {
    percents.iter().map(|&p| p as u64).sum()
}

fn edges(start: i32, extent: u32, percents: &[u32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(percents.len() + 1);
    let mut acc: u64 = 0;
    out.push(start);
    for p in percents {
        acc += *p as u64;
        out.push(start + (acc * extent as u64 / GRID_PERCENT_TOTAL as u64) as i32);
    }
    out
}
