pub use schoolhouse_models::cafeteria::*;
