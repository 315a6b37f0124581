pub mod academic_years;
pub mod attendance;
pub mod auth;
pub mod behavior;
pub mod cafeteria;
pub mod fees;
pub mod gifted;
pub mod gradebook;
pub mod health_office;
pub mod immunizations;
pub mod scheduling;
pub mod schools;
pub mod staff;
pub mod students;

pub use self::auth::model::LoginRequest;
pub use self::staff::model::Staff;
