pub use schoolhouse_models::students::*;
