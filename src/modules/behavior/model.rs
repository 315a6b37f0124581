pub use schoolhouse_models::behavior::*;
