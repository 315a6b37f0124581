pub use schoolhouse_models::gradebook::*;
