mod calculator;
mod fanout;
mod metadata;

pub use calculator::{check_compatibility, CompatibilityResult};
pub use fanout::check_all;
pub use metadata::{MetadataError, RegionConnectorMetadata};
