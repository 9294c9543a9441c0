//! Seiir Series
//!
//! Pure, in-memory transforms over one draw's time series:
//!
//! - [`split`] partitions an observed series into train and validation
//!   windows and re-masks observation flags for the train window.
//! - [`splice`] merges a draw's historical segment with its forecast segment
//!   into one continuous, date-unique series.
//!
//! Tables are read and written as CSV through [`TimeSeries::from_csv`] and
//! [`TimeSeries::to_csv`]; per-draw parameters through [`ParameterTable`].
//! Nothing here performs I/O beyond those byte buffers.

mod error;
mod params;
mod splice;
mod split;
mod table;

pub use error::SeriesError;
pub use params::{DAY_SHIFT, ParameterLookup, ParameterTable};
pub use splice::splice;
pub use split::{HoldoutSplit, draw_lag, split};
pub use table::{Row, TimeSeries};
