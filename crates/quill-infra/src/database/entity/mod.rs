//! SeaORM entities.

pub mod monthly_stat;
pub mod post;
pub mod push_subscription;
pub mod subscriber;
pub mod user;
