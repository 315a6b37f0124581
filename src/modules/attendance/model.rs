pub use schoolhouse_models::DateRangeParams;
pub use schoolhouse_models::attendance::*;
