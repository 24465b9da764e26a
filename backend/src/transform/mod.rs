//! Transformation module.
//!
//! One processor per dashboard domain, all reading through the shared
//! [`crate::source::TableLoader`]:
//! - Incidents: event list, release volumes, serious event tallies
//! - Conditions: status summary and per-region map data
//! - Traffic: throughput and capacity per key point
//! - Tolls: toll series per pipeline path
//! - Most common: ranked value counts used by the summaries
//! - Pipeline: artifact writing and profile builds

pub mod conditions;
pub mod incidents;
pub mod most_common;
pub mod pipeline;
pub mod tolls;
pub mod traffic;

pub use conditions::{conditions_from_table, process_conditions, ConditionOutput, ConditionRequest};
pub use incidents::{incidents_from_table, process_incidents, IncidentOutput, IncidentRequest};
pub use most_common::{most_common, most_common_values, MostCommon, OrderedCounts};
pub use pipeline::*;
pub use tolls::{process_tolls, tolls_from_table, TollsBundle, TollsRequest};
pub use traffic::{process_traffic, traffic_from_table, TrafficBundle, TrafficOutput, TrafficRequest};
