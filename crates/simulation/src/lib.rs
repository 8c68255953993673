//! Synthetic funnel data for demos. Counts are randomized but always form a
//! well-formed funnel.

pub mod generator;

pub use generator::{
    expected_visitors, time_multiplier, traffic_multiplier, ConversionRates, DataGenerator,
    MAX_HISTORY_DAYS,
};
