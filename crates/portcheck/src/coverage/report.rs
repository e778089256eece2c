use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Point,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinReport {
    pub label: String,
    pub hits: u64,
}

/// Coverage of one point or cross.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub name: String,
    pub kind: ItemKind,
    pub size: usize,
    pub covered: usize,
    pub percentage: f64,
    pub bins: Vec<BinReport>,
}

impl ItemReport {
    pub(crate) fn new(
        name: &str,
        kind: ItemKind,
        labels: impl Iterator<Item = String>,
        hits: &[u64],
    ) -> Self {
        let bins: Vec<BinReport> = labels
            .zip(hits)
            .map(|(label, &hits)| BinReport { label, hits })
            .collect();
        let size = bins.len();
        let covered = bins.iter().filter(|b| b.hits > 0).count();
        Self {
            name: name.to_string(),
            kind,
            size,
            covered,
            percentage: percentage(covered, size),
            bins,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.covered == self.size
    }
}

/// Snapshot of a [`CoverageTracker`](super::CoverageTracker), items in
/// registration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub items: Vec<ItemReport>,
}

impl CoverageReport {
    pub fn item(&self, name: &str) -> Option<&ItemReport> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn total_bins(&self) -> usize {
        self.items.iter().map(|i| i.size).sum()
    }

    pub fn covered_bins(&self) -> usize {
        self.items.iter().map(|i| i.covered).sum()
    }

    pub fn percentage(&self) -> f64 {
        percentage(self.covered_bins(), self.total_bins())
    }

    /// Writes one `info` line per item.
    pub fn log(&self) {
        for item in &self.items {
            log::info!(
                "coverage {:<32} {}/{} ({:.2}%)",
                item.name,
                item.covered,
                item.size,
                item.percentage
            );
        }
        log::info!(
            "coverage total {}/{} ({:.2}%)",
            self.covered_bins(),
            self.total_bins(),
            self.percentage()
        );
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(
                f,
                "{} {}: {}/{} ({:.2}%)",
                match item.kind {
                    ItemKind::Point => "point",
                    ItemKind::Cross => "cross",
                },
                item.name,
                item.covered,
                item.size,
                item.percentage
            )?;
            for bin in &item.bins {
                writeln!(f, "  {} = {}", bin.label, bin.hits)?;
            }
        }
        write!(
            f,
            "total: {}/{} ({:.2}%)",
            self.covered_bins(),
            self.total_bins(),
            self.percentage()
        )
    }
}

fn percentage(covered: usize, size: usize) -> f64 {
    if size == 0 {
        return 0.0;
    }
    100.0 * covered as f64 / size as f64
}
