mod defaults;
mod engine;
mod types;

pub use defaults::default_parameters;
pub use engine::{compare, project_bes, project_etf};
pub use types::{
    BesParameters, BesProjection, BesYearRecord, ComparisonMetrics, ComparisonResult,
    DefaultParameters, EtfParameters, EtfProjection, EtfYearRecord, IndexChoice,
    YearlyBalancePoint,
};
