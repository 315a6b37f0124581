pub use schoolhouse_models::academic_years::*;
pub use schoolhouse_models::common::SchoolScopeParams;
