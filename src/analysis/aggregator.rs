//! Flow aggregation for Sankey diagrams.
//!
//! This module filters the flow table down to one origin zone, keeps the
//! destinations with the largest summed population, and emits the node
//! list and per-record links for a single diagram.

use crate::analysis::color::ColorPicker;
use crate::error::FlowError;
use crate::models::{AggregationResult, FlowRecord, Link, Node};
use std::collections::HashMap;
use tracing::debug;

/// Number of destinations kept per zone unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 10;

/// Build the diagram for `origin_zone`, keeping the top 10 destinations.
pub fn aggregate(
    records: &[FlowRecord],
    origin_zone: &str,
    colors: &mut dyn ColorPicker,
) -> Result<AggregationResult, FlowError> {
    aggregate_top(records, origin_zone, DEFAULT_TOP_N, colors)
}

/// Build the diagram for `origin_zone`, keeping the top `top_n` destinations.
///
/// A zone with no matching records yields only the origin node and no
/// links. A matching record whose population cell was unparseable fails
/// the zone with [`FlowError::InvalidPopulation`]; a negative population,
/// or a zone total that does not fit in an `i64`, fails it with
/// [`FlowError::InvalidInput`].
pub fn aggregate_top(
    records: &[FlowRecord],
    origin_zone: &str,
    top_n: usize,
    colors: &mut dyn ColorPicker,
) -> Result<AggregationResult, FlowError> {
    let zone_records: Vec<&FlowRecord> = records
        .iter()
        .filter(|r| r.origin_zone == origin_zone)
        .collect();

    if zone_records.is_empty() {
        debug!("No flows found for zone '{}'", origin_zone);
        return Ok(AggregationResult::empty(origin_zone));
    }

    if let Some(cell) = zone_records.iter().find_map(|r| r.invalid_population.as_ref()) {
        return Err(FlowError::InvalidPopulation {
            row: cell.row,
            value: cell.value.clone(),
        });
    }

    if let Some(bad) = zone_records.iter().find(|r| r.employed_population < 0) {
        return Err(FlowError::InvalidInput(format!(
            "negative population {} for '{}' -> '{}'",
            bad.employed_population, bad.origin_zone, bad.destination_region
        )));
    }

    zone_records
        .iter()
        .try_fold(0i64, |acc, r| acc.checked_add(r.employed_population))
        .ok_or_else(|| overflow(origin_zone))?;

    let top = top_destinations(&zone_records, top_n)?;

    let mut nodes = Vec::with_capacity(top.len() + 1);
    nodes.push(Node::origin(origin_zone));
    nodes.extend(top.iter().map(|(region, _)| Node::destination(region)));

    let color = colors.pick(origin_zone);

    let links: Vec<Link> = {
        let node_index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.label.as_str(), i))
            .collect();

        zone_records
            .iter()
            .filter_map(|record| {
                let label = Node::destination(&record.destination_region).label;
                node_index.get(label.as_str()).map(|&target_index| Link {
                    source_index: 0,
                    target_index,
                    value: record.employed_population,
                    color,
                })
            })
            .collect()
    };

    debug!(
        "Zone '{}': {} records, {} destinations kept, {} links",
        origin_zone,
        zone_records.len(),
        top.len(),
        links.len()
    );

    Ok(AggregationResult {
        zone: origin_zone.to_string(),
        nodes,
        links,
    })
}

/// Sum population per destination and keep the `n` largest.
///
/// Groups are kept in first-encounter order before the stable sort, so
/// ties rank by which region appeared first.
pub fn top_destinations<'a>(
    records: &[&'a FlowRecord],
    n: usize,
) -> Result<Vec<(&'a str, i64)>, FlowError> {
    let mut totals: Vec<(&'a str, i64)> = Vec::new();
    let mut position: HashMap<&'a str, usize> = HashMap::new();

    for record in records {
        let region = record.destination_region.as_str();
        match position.get(region) {
            Some(&i) => {
                totals[i].1 = totals[i]
                    .1
                    .checked_add(record.employed_population)
                    .ok_or_else(|| overflow(&record.origin_zone))?;
            }
            None => {
                position.insert(region, totals.len());
                totals.push((region, record.employed_population));
            }
        }
    }

    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals.truncate(n);
    Ok(totals)
}

fn overflow(zone: &str) -> FlowError {
    FlowError::InvalidInput(format!("population total overflows for '{}'", zone))
}

/// Summary of one origin zone present in the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSummary {
    pub zone: String,
    pub records: usize,
    pub population: i64,
}

/// List origin zones in first-encounter order with record counts and totals.
///
/// Unparseable rows are counted but add nothing to the total, and totals
/// saturate instead of overflowing.
pub fn zone_summary(records: &[FlowRecord]) -> Vec<ZoneSummary> {
    let mut summaries: Vec<ZoneSummary> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for record in records {
        match position.get(record.origin_zone.as_str()) {
            Some(&i) => {
                summaries[i].records += 1;
                summaries[i].population =
                    summaries[i].population.saturating_add(record.employed_population);
            }
            None => {
                position.insert(record.origin_zone.as_str(), summaries.len());
                summaries.push(ZoneSummary {
                    zone: record.origin_zone.clone(),
                    records: 1,
                    population: record.employed_population,
                });
            }
        }
    }

    summaries
}
