pub use schoolhouse_models::scheduling::*;
