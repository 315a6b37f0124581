pub use schoolhouse_models::auth::*;
pub use schoolhouse_models::staff::Staff;
