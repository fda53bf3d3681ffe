pub mod aggregator;
pub mod cleaner;
pub mod consumption;
pub mod data_loader;
pub mod error;
pub mod filter;
pub mod geo;
pub mod metrics;
pub mod models;
pub mod monthly;
pub mod regression;

pub use consumption::{ConsumptionPattern, ConsumptionReport};
pub use data_loader::{DataLoader, SurveyData};
pub use error::{AnalyticsError, Result};
pub use filter::Selection;
pub use geo::GeoPoint;
pub use models::{
    AggregateRow, CoordinateEntry, Dimension, ExpenseRecord, Extrema, IncomeRecord, Metric,
    MonthlyColumn, RankedExtremum, SurveyRecord,
};
pub use regression::{LinearFit, RegressionReport};
