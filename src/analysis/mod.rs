//! Flow analysis modules.
//!
//! The aggregator turns flow records into Sankey diagrams; link colors
//! come from an injected [`ColorPicker`].

pub mod aggregator;
pub mod color;

pub use aggregator::*;
pub use color::{ColorPicker, FixedColor, RandomColors};
