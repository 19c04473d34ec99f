// Market data domain
pub mod candle;
pub mod indicator_set;
pub mod symbol;
pub mod timeframe;

pub use candle::{Candle, SeriesKey};
pub use indicator_set::{EnrichedRow, IndicatorSet};
pub use timeframe::Timeframe;
