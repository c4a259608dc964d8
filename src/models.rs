//! Data models for the flow dashboard.
//!
//! This module contains the core data structures used throughout
//! the application for representing flow records, Sankey diagrams,
//! and the rendered dashboard.

use crate::config::{ChartConfig, ZoneConfig};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Suffix appended to the origin node label.
pub const ORIGIN_SUFFIX: &str = "(Origen)";

/// Suffix appended to destination node labels.
pub const DESTINATION_SUFFIX: &str = "(Destino)";

/// One row of the flow table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowRecord {
    /// Macro-zone the workers live in.
    pub origin_zone: String,
    /// Department where they work.
    pub destination_region: String,
    /// Employed population moving along this flow. Zero when the cell
    /// could not be parsed; see `invalid_population`.
    pub employed_population: i64,
    /// Unparseable population cell, kept so only this row's zone fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_population: Option<InvalidCell>,
}

/// A population cell that is empty or non-numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidCell {
    /// Line number in the source file.
    pub row: usize,
    /// Trimmed cell text.
    pub value: String,
}

impl FlowRecord {
    /// Creates a record from already-trimmed fields.
    pub fn new(
        origin_zone: impl Into<String>,
        destination_region: impl Into<String>,
        employed_population: i64,
    ) -> Self {
        Self {
            origin_zone: origin_zone.into(),
            destination_region: destination_region.into(),
            employed_population,
            invalid_population: None,
        }
    }

    /// Creates a record whose population cell could not be parsed.
    pub fn with_invalid_population(
        origin_zone: impl Into<String>,
        destination_region: impl Into<String>,
        row: usize,
        value: impl Into<String>,
    ) -> Self {
        Self {
            origin_zone: origin_zone.into(),
            destination_region: destination_region.into(),
            employed_population: 0,
            invalid_population: Some(InvalidCell {
                row,
                value: value.into(),
            }),
        }
    }
}

/// A labeled Sankey node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub label: String,
}

impl Node {
    /// The origin node for a macro-zone.
    pub fn origin(zone: &str) -> Self {
        Self {
            label: format!("{} {}", zone, ORIGIN_SUFFIX),
        }
    }

    /// A destination node for a department.
    pub fn destination(region: &str) -> Self {
        Self {
            label: format!("{} {}", region, DESTINATION_SUFFIX),
        }
    }
}

/// RGBA color, rendered as a CSS `rgba(...)` string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl RgbaColor {
    pub fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for RgbaColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl Serialize for RgbaColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single flow from the origin node to a destination node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub source_index: usize,
    pub target_index: usize,
    pub value: i64,
    pub color: RgbaColor,
}

/// Nodes and links for one Sankey diagram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    /// Origin zone this diagram was built for.
    pub zone: String,
    /// Index 0 is the origin, the rest are destinations in rank order.
    pub nodes: Vec<Node>,
    /// One link per retained record, in input order.
    pub links: Vec<Link>,
}

impl AggregationResult {
    /// A diagram with only the origin node and no flows.
    pub fn empty(zone: &str) -> Self {
        Self {
            zone: zone.to_string(),
            nodes: vec![Node::origin(zone)],
            links: Vec::new(),
        }
    }

    /// Returns true if no flows were retained.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.label.as_str()).collect()
    }

    pub fn sources(&self) -> Vec<usize> {
        self.links.iter().map(|l| l.source_index).collect()
    }

    pub fn targets(&self) -> Vec<usize> {
        self.links.iter().map(|l| l.target_index).collect()
    }

    pub fn values(&self) -> Vec<i64> {
        self.links.iter().map(|l| l.value).collect()
    }

    pub fn colors(&self) -> Vec<String> {
        self.links.iter().map(|l| l.color.to_string()).collect()
    }

    /// Sum of every link value.
    pub fn total_population(&self) -> i64 {
        self.links
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.value))
    }

    /// Summed link value per destination node, in node order.
    pub fn destination_totals(&self) -> Vec<(&str, i64)> {
        let mut totals = vec![0i64; self.nodes.len()];
        for link in &self.links {
            totals[link.target_index] = totals[link.target_index].saturating_add(link.value);
        }

        self.nodes
            .iter()
            .zip(totals)
            .skip(1)
            .map(|(node, total)| (node.label.as_str(), total))
            .collect()
    }
}

/// Outcome of aggregating a single zone.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ZoneOutcome {
    /// The diagram was built (possibly with no links).
    Rendered(AggregationResult),
    /// Aggregation failed; the page shows a notice instead of the chart.
    Failed { message: String },
}

impl ZoneOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ZoneOutcome::Failed { .. })
    }
}

/// A configured zone together with its aggregation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneReport {
    pub zone: ZoneConfig,
    pub outcome: ZoneOutcome,
}

/// Metadata about a dashboard run.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetadata {
    /// Path of the CSV that was loaded.
    pub input_path: String,
    /// Date and time the dashboard was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of flow records loaded.
    pub records_loaded: usize,
    /// Number of zones with a chart.
    pub zones_rendered: usize,
    /// Number of zones whose aggregation failed.
    pub zones_failed: usize,
    /// Seed used for link colors, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    /// Page title.
    pub title: String,
    /// Introductory paragraph shown under the title.
    pub introduction: String,
    /// One section per zone, in configured order.
    pub zones: Vec<ZoneReport>,
    /// Presentation constants for the charts.
    pub chart: ChartConfig,
}
