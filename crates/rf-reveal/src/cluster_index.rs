//! ClusterIndex: "is cell (r, c) part of an active winning cluster?"
//!
//! Built from the clusters of the current tumble step. Lookups are O(1).

use serde::{Deserialize, Serialize};

use crate::model::{Cluster, GridSize, Position};

/// Cell → cluster lookup for the active highlight set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIndex {
    size: Option<GridSize>,
    /// Row-major cluster ordinal per cell
    cells: Vec<Option<u16>>,
    clusters: usize,
    highlighted: usize,
}

impl ClusterIndex {
    /// Index with nothing highlighted
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a step's clusters
    ///
    /// Cells outside the grid are ignored. A cell claimed by two clusters stays
    /// with the first one.
    pub fn build(size: GridSize, clusters: &[Cluster]) -> Self {
        let mut cells = vec![None; size.cells()];
        let mut highlighted = 0;

        for (ordinal, cluster) in clusters.iter().enumerate() {
            let ordinal = u16::try_from(ordinal).unwrap_or(u16::MAX);
            for pos in &cluster.positions {
                if !size.contains(*pos) {
                    log::warn!(
                        "[ClusterIndex] Cell ({}, {}) outside {} grid ignored",
                        pos.row,
                        pos.col,
                        size
                    );
                    continue;
                }
                let slot = &mut cells[pos.row * size.cols + pos.col];
                if slot.is_none() {
                    *slot = Some(ordinal);
                    highlighted += 1;
                } else {
                    log::debug!(
                        "[ClusterIndex] Cell ({}, {}) already in cluster {:?}",
                        pos.row,
                        pos.col,
                        slot
                    );
                }
            }
        }

        Self {
            size: Some(size),
            cells,
            clusters: clusters.len(),
            highlighted,
        }
    }

    /// Is this cell part of an active winning cluster?
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cluster_at(row, col).is_some()
    }

    /// Ordinal of the cluster covering this cell
    pub fn cluster_at(&self, row: usize, col: usize) -> Option<usize> {
        let size = self.size?;
        if !size.contains(Position::new(row, col)) {
            return None;
        }
        self.cells
            .get(row * size.cols + col)
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Number of clusters in the highlight set
    pub fn cluster_count(&self) -> usize {
        self.clusters
    }

    /// Number of highlighted cells
    pub fn highlighted_cells(&self) -> usize {
        self.highlighted
    }

    pub fn is_empty(&self) -> bool {
        self.highlighted == 0
    }

    /// Highlighted positions, row-major
    pub fn positions(&self) -> Vec<Position> {
        let Some(size) = self.size else {
            return Vec::new();
        };
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_some())
            .map(|(i, _)| Position::new(i / size.cols, i % size.cols))
            .collect()
    }
}
