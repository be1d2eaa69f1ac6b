//! The five shipped validators.

mod news;
mod regime_consistency;
mod risk;
mod trend;
mod volatility;

pub use news::{EventCalendar, NewsValidator};
pub use regime_consistency::RegimeConsistencyValidator;
pub use risk::RiskValidator;
pub use trend::TrendValidator;
pub use volatility::VolatilityValidator;
