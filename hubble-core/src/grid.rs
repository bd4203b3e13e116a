//! Raw systematic grid — one row per analysis configuration.
//!
//! Each row carries an outcome value (H0), a group code naming which
//! calibration anchors produced it, and an optional period-luminosity relation
//! variant. Group codes are parsed into anchor sets once, at construction:
//!
//! - `M`, `L`, `N` — single anchors (Milky Way, LMC, NGC 4258)
//! - any combination of those letters, optionally joined by `+` (`NL`, `M+L`)
//! - `All` — every anchor
//!
//! Rows with the same code form one anchor population; the estimators demean
//! by code, not by anchor set, so `All` and `NML` stay separate populations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Anchors ─────────────────────────────────────────────────────────

/// A calibration anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Anchor {
    /// Milky Way parallaxes. The primary anchor whose offset the correction targets.
    MilkyWay,
    /// Large Magellanic Cloud.
    Lmc,
    /// NGC 4258 maser distance.
    Ngc4258,
}

impl Anchor {
    pub const ALL: [Anchor; 3] = [Anchor::MilkyWay, Anchor::Lmc, Anchor::Ngc4258];

    /// Single-letter group code.
    pub fn code(self) -> char {
        match self {
            Anchor::MilkyWay => 'M',
            Anchor::Lmc => 'L',
            Anchor::Ngc4258 => 'N',
        }
    }

    pub fn from_code(c: char) -> Option<Anchor> {
        match c {
            'M' => Some(Anchor::MilkyWay),
            'L' => Some(Anchor::Lmc),
            'N' => Some(Anchor::Ngc4258),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Anchor::MilkyWay => "MW",
            Anchor::Lmc => "LMC",
            Anchor::Ngc4258 => "NGC4258",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Anchor::MilkyWay => 0b001,
            Anchor::Lmc => 0b010,
            Anchor::Ngc4258 => 0b100,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of anchors, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AnchorSet(u8);

impl AnchorSet {
    pub const EMPTY: AnchorSet = AnchorSet(0);
    pub const ALL: AnchorSet = AnchorSet(0b111);

    pub fn of(anchors: &[Anchor]) -> Self {
        anchors.iter().fold(Self::EMPTY, |set, &a| set.with(a))
    }

    pub fn with(self, anchor: Anchor) -> Self {
        Self(self.0 | anchor.bit())
    }

    pub fn without(self, anchor: Anchor) -> Self {
        Self(self.0 & !anchor.bit())
    }

    pub fn contains(self, anchor: Anchor) -> bool {
        self.0 & anchor.bit() != 0
    }

    pub fn is_subset_of(self, other: AnchorSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Anchor> {
        Anchor::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

// ─── Rows ────────────────────────────────────────────────────────────

/// A group code as written in the raw table, with its parsed anchor set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupCode {
    label: String,
    anchors: AnchorSet,
}

impl GroupCode {
    pub fn parse(label: &str) -> Result<Self, GridError> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(GridError::UnknownGroupCode {
                code: label.to_string(),
            });
        }
        if trimmed == "All" {
            return Ok(Self {
                label: trimmed.to_string(),
                anchors: AnchorSet::ALL,
            });
        }

        let mut anchors = AnchorSet::EMPTY;
        for c in trimmed.chars().filter(|&c| c != '+') {
            match Anchor::from_code(c) {
                Some(a) => anchors = anchors.with(a),
                None => {
                    return Err(GridError::UnknownGroupCode {
                        code: label.to_string(),
                    })
                }
            }
        }
        if anchors.is_empty() {
            return Err(GridError::UnknownGroupCode {
                code: label.to_string(),
            });
        }

        Ok(Self {
            label: trimmed.to_string(),
            anchors,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn anchors(&self) -> AnchorSet {
        self.anchors
    }

    /// The anchor this code isolates, if it names exactly one.
    pub fn single_anchor(&self) -> Option<Anchor> {
        if self.anchors.len() == 1 {
            self.anchors.iter().next()
        } else {
            None
        }
    }
}

/// One configuration of the systematic grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub value: f64,
    pub group: GroupCode,
    /// Period-luminosity relation variant, when the table records one.
    pub relation: Option<String>,
}

impl GridRow {
    pub fn new(value: f64, group: &str, relation: Option<&str>) -> Result<Self, GridError> {
        Ok(Self {
            value,
            group: GroupCode::parse(group)?,
            relation: relation
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }
}

// ─── Table ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("grid table is empty")]
    Empty,
    #[error("unknown group code '{code}' (expected M, L, N, combinations of them, or All)")]
    UnknownGroupCode { code: String },
    #[error("row {row}: value must be finite, got {value}")]
    NonFiniteValue { row: usize, value: f64 },
    #[error("row index {index} out of range for a table of {len} rows")]
    RowIndex { index: usize, len: usize },
}

/// An immutable, validated grid table. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridTable {
    rows: Vec<GridRow>,
}

impl GridTable {
    pub fn new(rows: Vec<GridRow>) -> Result<Self, GridError> {
        if rows.is_empty() {
            return Err(GridError::Empty);
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| !r.value.is_finite()) {
            return Err(GridError::NonFiniteValue {
                row,
                value: r.value,
            });
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrowed view of every row.
    pub fn view(&self) -> Vec<&GridRow> {
        self.rows.iter().collect()
    }

    /// Rows whose anchor set lies entirely inside `keep`.
    pub fn retained(&self, keep: AnchorSet) -> Vec<&GridRow> {
        self.rows
            .iter()
            .filter(|r| r.group.anchors().is_subset_of(keep))
            .collect()
    }

    /// Rows picked by index, repeats allowed (bootstrap resamples).
    pub fn pick(&self, indices: &[usize]) -> Result<Vec<&GridRow>, GridError> {
        indices
            .iter()
            .map(|&index| {
                self.rows.get(index).ok_or(GridError::RowIndex {
                    index,
                    len: self.rows.len(),
                })
            })
            .collect()
    }

    /// BLAKE3 digest over values, codes and variants, in row order.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for r in &self.rows {
            hasher.update(&r.value.to_le_bytes());
            hasher.update(r.group.label().as_bytes());
            hasher.update(&[0]);
            if let Some(rel) = &r.relation {
                hasher.update(rel.as_bytes());
            }
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}
