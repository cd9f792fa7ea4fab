mod duration;
mod need;
mod period;

pub use duration::{CalendarUnit, Duration, DurationError, ResolvedTimeframe};
pub use need::{ConnectorFilter, DataNeed, DataNeedError, DataNeedKind, GranularityRange};
pub use period::IsoPeriod;
