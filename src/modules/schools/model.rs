pub use schoolhouse_models::schools::*;
