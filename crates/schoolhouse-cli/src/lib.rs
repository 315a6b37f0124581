//! # Schoolhouse CLI
//!
//! Database seeding utilities for local development and load testing.
//!
//! ```ignore
//! use schoolhouse_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3); // 3 schools with default staff and students
//! seed_all(&pool, config).await?;
//! ```

pub mod seeder;
