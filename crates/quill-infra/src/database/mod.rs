//! Database access: connection management, SeaORM repositories, and the
//! in-memory fallback store used when no database is configured.

mod connections;

pub mod memory;

#[cfg(feature = "postgres")]
mod postgres_base;
#[cfg(feature = "postgres")]
pub mod postgres_repo;

#[cfg(feature = "postgres")]
pub mod entity;

pub use connections::{DatabaseConfig, DatabaseConnections};

#[cfg(feature = "postgres")]
pub use postgres_repo::{
    PostgresPostRepository, PostgresPushSubscriptionRepository, PostgresStatsRepository,
    PostgresSubscriberRepository, PostgresUserRepository,
};

#[cfg(feature = "postgres")]
#[cfg(test)]
mod tests;
