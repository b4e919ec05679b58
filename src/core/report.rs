use serde::{Deserialize, Serialize};

use crate::algorithms::mine::SignificantShapelet;
use crate::core::contingency::ContingencyTable;

/// JSON form of one significant shapelet.
///
/// The p-value is carried as a string in scientific notation so that
/// sub-normal values survive writers that would round-trip them through
/// a lossy decimal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeletRecord {
    /// The extracted subsequence values.
    pub shapelet: Vec<f64>,
    /// p-value in scientific notation.
    pub p: String,
    /// The best contingency table for this shapelet.
    pub table: TableRecord,
    /// Window size.
    pub size: usize,
    /// Offset within the source series, when provenance is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
}

/// JSON form of a contingency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub d: usize,
    pub n: usize,
    pub n1: usize,
    pub threshold: f64,
}

impl From<&ContingencyTable> for TableRecord {
    fn from(table: &ContingencyTable) -> Self {
        Self {
            a: table.a(),
            b: table.b(),
            c: table.c(),
            d: table.d(),
            n: table.n(),
            n1: table.n1(),
            threshold: table.threshold(),
        }
    }
}

impl From<&SignificantShapelet> for ShapeletRecord {
    fn from(ss: &SignificantShapelet) -> Self {
        Self {
            shapelet: ss.shapelet.values.clone(),
            p: format!("{:e}", ss.p),
            table: TableRecord::from(&ss.table),
            size: ss.shapelet.values.len(),
            start: Some(ss.shapelet.start),
        }
    }
}
