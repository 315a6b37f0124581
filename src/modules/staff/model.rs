pub use schoolhouse_models::staff::*;
