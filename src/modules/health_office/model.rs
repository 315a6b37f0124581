pub use schoolhouse_models::health::*;
