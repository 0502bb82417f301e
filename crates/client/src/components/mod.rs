pub mod status_indicator;

pub use status_indicator::{IndicatorColor, IndicatorIcon, StatusIndicator};
