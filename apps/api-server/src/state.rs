//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{
    Cache, JobQueue, PostRepository, PubSub, PushSubscriptionRepository, StatsRepository,
    SubscriberRepository, UserRepository,
};
use quill_core::services::{EngagementService, PostService};
use quill_infra::cache::InMemoryCache;
use quill_infra::database::memory::InMemoryStore;
use quill_infra::database::DatabaseConnections;
use quill_infra::jobs::InMemoryJobQueue;
use quill_infra::pubsub::InMemoryPubSub;

#[cfg(feature = "postgres")]
use quill_infra::database::{
    PostgresPostRepository, PostgresPushSubscriptionRepository, PostgresStatsRepository,
    PostgresSubscriberRepository, PostgresUserRepository,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostRepository>,
    pub users: Arc<dyn UserRepository>,
    pub stats: Arc<dyn StatsRepository>,
    pub subscribers: Arc<dyn SubscriberRepository>,
    pub push_subscriptions: Arc<dyn PushSubscriptionRepository>,
    pub cache: Arc<dyn Cache>,
    pub events: Arc<dyn PubSub>,
    pub jobs: Arc<dyn JobQueue>,
    pub engagement: Arc<EngagementService>,
    pub lifecycle: Arc<PostService>,
    pub db: Option<Arc<DatabaseConnections>>,
}

struct Repositories {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    stats: Arc<dyn StatsRepository>,
    subscribers: Arc<dyn SubscriberRepository>,
    push_subscriptions: Arc<dyn PushSubscriptionRepository>,
}

impl Repositories {
    /// Process-local store; everything runs, nothing survives a restart.
    fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            posts: store.clone(),
            users: store.clone(),
            stats: store.clone(),
            subscribers: store.clone(),
            push_subscriptions: store,
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(conn: &DatabaseConnections) -> Self {
        Self {
            posts: Arc::new(PostgresPostRepository::new(conn.main.clone())),
            users: Arc::new(PostgresUserRepository::new(conn.main.clone())),
            stats: Arc::new(PostgresStatsRepository::new(conn.main.clone())),
            subscribers: Arc::new(PostgresSubscriberRepository::new(conn.main.clone())),
            push_subscriptions: Arc::new(PostgresPushSubscriptionRepository::new(
                conn.main.clone(),
            )),
        }
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let (cache, events) = Self::cache_and_events(config).await;
        let jobs: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::from_env());

        #[cfg(feature = "postgres")]
        let (db, repos) = {
            if let Some(db_config) = &config.database {
                match DatabaseConnections::init(db_config).await {
                    Ok(connections) => {
                        let conn = Arc::new(connections);
                        let repos = Repositories::postgres(&conn);
                        (Some(conn), repos)
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                        (None, Repositories::in_memory())
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                (None, Repositories::in_memory())
            }
        };

        #[cfg(not(feature = "postgres"))]
        let (db, repos) = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            (None::<Arc<DatabaseConnections>>, Repositories::in_memory())
        };

        let engagement = Arc::new(EngagementService::new(
            repos.posts.clone(),
            repos.stats.clone(),
            cache.clone(),
        ));
        let lifecycle = Arc::new(PostService::new(
            repos.posts.clone(),
            cache.clone(),
            events.clone(),
        ));

        tracing::info!("Application state initialized");

        Self {
            posts: repos.posts,
            users: repos.users,
            stats: repos.stats,
            subscribers: repos.subscribers,
            push_subscriptions: repos.push_subscriptions,
            cache,
            events,
            jobs,
            engagement,
            lifecycle,
            db,
        }
    }

    #[cfg(feature = "redis")]
    async fn cache_and_events(config: &AppConfig) -> (Arc<dyn Cache>, Arc<dyn PubSub>) {
        use quill_infra::cache::RedisCache;
        use quill_infra::pubsub::RedisPubSub;

        if config.redis_url.is_some() {
            match (RedisCache::from_env().await, RedisPubSub::from_env().await) {
                (Ok(cache), Ok(pubsub)) => return (Arc::new(cache), Arc::new(pubsub)),
                (cache, pubsub) => {
                    if let Err(e) = cache {
                        tracing::error!("Redis cache unavailable: {}. Falling back to memory.", e);
                    }
                    if let Err(e) = pubsub {
                        tracing::error!("Redis pub/sub unavailable: {}. Falling back to memory.", e);
                    }
                }
            }
        }

        (
            Arc::new(InMemoryCache::new()),
            Arc::new(InMemoryPubSub::default()),
        )
    }

    #[cfg(not(feature = "redis"))]
    async fn cache_and_events(_config: &AppConfig) -> (Arc<dyn Cache>, Arc<dyn PubSub>) {
        (
            Arc::new(InMemoryCache::new()),
            Arc::new(InMemoryPubSub::default()),
        )
    }
}
