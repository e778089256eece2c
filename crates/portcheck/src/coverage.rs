//! Functional coverage: named points with declared bins and crosses over
//! two or more points.
//!
//! A cross is sampled from the most recent hit of each of its points, so
//! points must be recorded before the crosses that use them. Hit counts
//! only ever grow.

use crate::HashMap;
use itertools::Itertools;
use serde::Serialize;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

mod report;
mod xml;

pub use report::{BinReport, CoverageReport, ItemKind, ItemReport};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoverageError {
    #[error("coverage point '{0}' is not registered")]
    UnknownPoint(String),
    #[error("coverage cross '{0}' is not registered")]
    UnknownCross(String),
    #[error("value '{value}' is outside the bins of '{point}'")]
    BinViolation { point: String, value: BinValue },
    #[error("cross '{cross}' sampled before '{point}' was hit")]
    CrossNotReady { cross: String, point: String },
    #[error("'{0}' is already registered")]
    Duplicate(String),
    #[error("'{0}' needs at least one bin (points) or two items (crosses)")]
    Empty(String),
}

/// A single bin of a coverage point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum BinValue {
    Int(u64),
    Label(String),
}

impl fmt::Display for BinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinValue::Int(v) => write!(f, "{v}"),
            BinValue::Label(s) => f.write_str(s),
        }
    }
}

impl From<u64> for BinValue {
    fn from(v: u64) -> Self {
        BinValue::Int(v)
    }
}

impl From<&str> for BinValue {
    fn from(s: &str) -> Self {
        BinValue::Label(s.to_string())
    }
}

impl From<String> for BinValue {
    fn from(s: String) -> Self {
        BinValue::Label(s)
    }
}

#[derive(Debug, Clone)]
pub struct CoverPoint {
    name: String,
    bins: Vec<BinValue>,
    hits: Vec<u64>,
    last: Option<usize>,
}

impl CoverPoint {
    fn new(name: String, bins: Vec<BinValue>) -> Self {
        let hits = vec![0; bins.len()];
        Self {
            name,
            bins,
            hits,
            last: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bins(&self) -> &[BinValue] {
        &self.bins
    }

    pub fn hits(&self) -> &[u64] {
        &self.hits
    }

    fn hit(&mut self, value: &BinValue) -> Result<(), CoverageError> {
        let Some(idx) = self.bins.iter().position(|b| b == value) else {
            return Err(CoverageError::BinViolation {
                point: self.name.clone(),
                value: value.clone(),
            });
        };
        self.hits[idx] += 1;
        self.last = Some(idx);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CoverCross {
    name: String,
    /// Indices into the tracker's point list.
    items: Vec<usize>,
    labels: Vec<String>,
    hits: Vec<u64>,
}

impl CoverCross {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hits(&self) -> &[u64] {
        &self.hits
    }
}

#[derive(Debug, Clone, Copy)]
enum Item {
    Point(usize),
    Cross(usize),
}

/// Every registered point and cross of one run.
#[derive(Debug, Clone, Default)]
pub struct CoverageTracker {
    points: Vec<CoverPoint>,
    crosses: Vec<CoverCross>,
    index: HashMap<String, Item>,
    order: Vec<Item>,
}

impl CoverageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_point<B>(&mut self, name: &str, bins: B) -> Result<(), CoverageError>
    where
        B: IntoIterator,
        B::Item: Into<BinValue>,
    {
        if self.index.contains_key(name) {
            return Err(CoverageError::Duplicate(name.to_string()));
        }
        let bins: Vec<BinValue> = bins.into_iter().map(Into::into).collect();
        if bins.is_empty() {
            return Err(CoverageError::Empty(name.to_string()));
        }
        let item = Item::Point(self.points.len());
        self.points.push(CoverPoint::new(name.to_string(), bins));
        self.index.insert(name.to_string(), item);
        self.order.push(item);
        Ok(())
    }

    pub fn register_cross(&mut self, name: &str, items: &[&str]) -> Result<(), CoverageError> {
        if self.index.contains_key(name) {
            return Err(CoverageError::Duplicate(name.to_string()));
        }
        if items.len() < 2 {
            return Err(CoverageError::Empty(name.to_string()));
        }
        let items = items
            .iter()
            .map(|item| self.point_index(item))
            .collect::<Result<Vec<_>, _>>()?;
        let labels: Vec<String> = items
            .iter()
            .map(|&p| self.points[p].bins.iter())
            .multi_cartesian_product()
            .map(|tuple| format!("({})", tuple.iter().join(", ")))
            .collect();
        let hits = vec![0; labels.len()];
        let item = Item::Cross(self.crosses.len());
        self.crosses.push(CoverCross {
            name: name.to_string(),
            items,
            labels,
            hits,
        });
        self.index.insert(name.to_string(), item);
        self.order.push(item);
        Ok(())
    }

    /// Marks `value` hit in the bins of `name`.
    pub fn record_point(
        &mut self,
        name: &str,
        value: impl Into<BinValue>,
    ) -> Result<(), CoverageError> {
        let idx = self.point_index(name)?;
        self.points[idx].hit(&value.into())
    }

    /// Marks the tuple of the latest hits of the cross's points.
    pub fn record_cross(&mut self, name: &str) -> Result<(), CoverageError> {
        let Some(&Item::Cross(idx)) = self.index.get(name) else {
            return Err(CoverageError::UnknownCross(name.to_string()));
        };
        let cross = &self.crosses[idx];
        let mut flat = 0;
        for &p in &cross.items {
            let point = &self.points[p];
            let Some(last) = point.last else {
                return Err(CoverageError::CrossNotReady {
                    cross: cross.name.clone(),
                    point: point.name.clone(),
                });
            };
            // Mixed radix, first item most significant.
            flat = flat * point.bins.len() + last;
        }
        self.crosses[idx].hits[flat] += 1;
        Ok(())
    }

    /// Records a point, then every cross whose last item is that point.
    pub fn sample(&mut self, name: &str, value: impl Into<BinValue>) -> Result<(), CoverageError> {
        let idx = self.point_index(name)?;
        self.points[idx].hit(&value.into())?;
        let completed: Vec<String> = self
            .crosses
            .iter()
            .filter(|c| c.items.last() == Some(&idx))
            .map(|c| c.name.clone())
            .collect();
        for cross in completed {
            self.record_cross(&cross)?;
        }
        Ok(())
    }

    pub fn point(&self, name: &str) -> Option<&CoverPoint> {
        match self.index.get(name) {
            Some(&Item::Point(idx)) => Some(&self.points[idx]),
            _ => None,
        }
    }

    pub fn cross(&self, name: &str) -> Option<&CoverCross> {
        match self.index.get(name) {
            Some(&Item::Cross(idx)) => Some(&self.crosses[idx]),
            _ => None,
        }
    }

    /// Snapshot of every item in registration order.
    pub fn report(&self) -> CoverageReport {
        let items = self
            .order
            .iter()
            .map(|item| match *item {
                Item::Point(idx) => {
                    let point = &self.points[idx];
                    ItemReport::new(
                        &point.name,
                        ItemKind::Point,
                        point.bins.iter().map(ToString::to_string),
                        &point.hits,
                    )
                }
                Item::Cross(idx) => {
                    let cross = &self.crosses[idx];
                    ItemReport::new(
                        &cross.name,
                        ItemKind::Cross,
                        cross.labels.iter().cloned(),
                        &cross.hits,
                    )
                }
            })
            .collect();
        CoverageReport { items }
    }

    fn point_index(&self, name: &str) -> Result<usize, CoverageError> {
        match self.index.get(name) {
            Some(&Item::Point(idx)) => Ok(idx),
            _ => Err(CoverageError::UnknownPoint(name.to_string())),
        }
    }
}

/// Receives samples from monitors.
pub trait CoverageSink {
    fn record(&mut self, point: &str, value: BinValue) -> Result<(), CoverageError>;
}

impl CoverageSink for CoverageTracker {
    fn record(&mut self, point: &str, value: BinValue) -> Result<(), CoverageError> {
        self.sample(point, value)
    }
}

/// A tracker shared between the sequencer and the monitors of one run.
#[derive(Debug, Clone, Default)]
pub struct SharedCoverage(Rc<RefCell<CoverageTracker>>);

impl SharedCoverage {
    pub fn new(tracker: CoverageTracker) -> Self {
        Self(Rc::new(RefCell::new(tracker)))
    }

    pub fn borrow(&self) -> Ref<'_, CoverageTracker> {
        self.0.borrow()
    }

    pub fn report(&self) -> CoverageReport {
        self.0.borrow().report()
    }
}

impl CoverageSink for SharedCoverage {
    fn record(&mut self, point: &str, value: BinValue) -> Result<(), CoverageError> {
        self.0.borrow_mut().sample(point, value)
    }
}
