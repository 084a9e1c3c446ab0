//! Alert normalization for the dashboard feed.
//!
//! [`normalizer::normalize`] maps one upstream customer alert into the
//! dashboard's [`NormalizedAlert`](csmon_common::types::NormalizedAlert)
//! shape. [`fixture`] holds the sample dataset served whenever live data is
//! unavailable, and [`feed`] orders alerts the way the feed displays them.

pub mod feed;
pub mod fixture;
pub mod normalizer;
