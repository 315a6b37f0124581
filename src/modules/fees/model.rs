pub use schoolhouse_models::fees::*;
