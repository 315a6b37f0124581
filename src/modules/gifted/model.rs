pub use schoolhouse_models::gifted::*;
