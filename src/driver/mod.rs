//! Lookup driver layer
//!
//! Turns a configuration file into a cache schema plus bound conditions, and
//! runs incoming rows through a shared `ReadAllCache` applying the match
//! policies.

mod config;
mod driver;

pub use config::{ConditionConfig, KeyFieldConfig, LookupConfig, OutputFieldConfig};
pub use driver::{
    ConditionSpec, DriverOptions, InputRow, LookupDriver, LookupOutcome, LookupSink,
    MultipleMatchPolicy, VecSink,
};
