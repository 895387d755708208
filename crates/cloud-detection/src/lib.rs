//! Tropical cloud cluster detection.
//!
//! Turns a brightness-temperature grid and its geolocation into a binary
//! mask of organized cold-cloud clusters plus summary statistics:
//!
//! 1. [`threshold::classify`] marks pixels colder than a latitude-banded threshold
//! 2. [`noise::remove_small_regions`] clears noise-sized regions
//! 3. [`radius::filter_by_radius`] keeps regions of sufficient physical size
//! 4. [`statistics::aggregate`] summarizes the final mask
//!
//! [`pipeline::detect`] runs the stages in order.

pub mod config;
pub mod error;
pub mod labeling;
pub mod noise;
pub mod pipeline;
pub mod radius;
pub mod statistics;
pub mod threshold;

pub use config::{
    Connectivity, DetectionConfig, DetectionMode, DetectionParams, LargeFilePolicy,
    ThresholdConfig,
};
pub use error::{DetectionError, DetectionResult, Stage};
pub use labeling::{find_regions, label_regions, Labeling, Region};
pub use noise::remove_small_regions;
pub use pipeline::{detect, DetectionOutput};
pub use radius::{
    equivalent_radius_km, filter_by_radius, RadiusFilterOutput, RegionDescriptor, RegionSummary,
};
pub use statistics::{aggregate, StatisticsRecord, WeatherCondition};
pub use threshold::classify;
