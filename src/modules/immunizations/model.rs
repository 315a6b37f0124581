pub use schoolhouse_models::immunizations::*;
