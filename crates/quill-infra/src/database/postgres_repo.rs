//! PostgreSQL repository implementations.
//!
//! Counter updates go through raw single-statement SQL so the increment
//! and the `RETURNING` read are one atomic operation; everything else uses
//! the SeaORM query builder.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DbBackend, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Statement,
};
use uuid::Uuid;

use quill_core::domain::{MonthlyStat, Post, PostStatus, PushSubscription, Subscriber, User};
use quill_core::error::RepoError;
use quill_core::ports::{
    PostRepository, PushSubscriptionRepository, StatsRepository, SubscriberRepository,
    UserRepository,
};

use super::entity::monthly_stat::{self, Entity as MonthlyStatEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::push_subscription::{self, Entity as PushSubscriptionEntity};
use super::entity::subscriber::{self, Entity as SubscriberEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL monthly rollup repository.
pub type PostgresStatsRepository = PostgresBaseRepository<MonthlyStatEntity>;

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL newsletter subscriber repository.
pub type PostgresSubscriberRepository = PostgresBaseRepository<SubscriberEntity>;

/// PostgreSQL push subscription repository.
pub type PostgresPushSubscriptionRepository = PostgresBaseRepository<PushSubscriptionEntity>;

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.fetch_by_id(id).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        let mut query = PostEntity::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(post::Column::Id.ne(id));
        }

        let count = query.count(&self.db).await.map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        self.insert_row(post).await
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        self.update_row(post).await
    }

    async fn list_by_status(
        &self,
        status: PostStatus,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Status.eq(status.as_str()))
            .order_by_desc(post::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn list_public_by_author(
        &self,
        author_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(post::Column::Status.eq(PostStatus::Approved.as_str()))
            .order_by_desc(post::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn increment_views(&self, id: Uuid) -> Result<i64, RepoError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE posts SET views = views + 1 WHERE id = $1 RETURNING views",
            [id.into()],
        );

        let row = self
            .db
            .query_one(stmt)
            .await
            .map_err(map_db_err)?
            .ok_or(RepoError::NotFound)?;

        row.try_get::<i64>("", "views").map_err(map_db_err)
    }

    async fn increment_likes(&self, id: Uuid) -> Result<i64, RepoError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE posts SET likes = likes + 1 WHERE id = $1 RETURNING likes",
            [id.into()],
        );

        let row = self
            .db
            .query_one(stmt)
            .await
            .map_err(map_db_err)?
            .ok_or(RepoError::NotFound)?;

        row.try_get::<i64>("", "likes").map_err(map_db_err)
    }

    async fn decrement_likes(&self, id: Uuid) -> Result<Option<i64>, RepoError> {
        // The `likes > 0` guard makes the decrement a no-op when a
        // concurrent unlike already drained the counter.
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE posts SET likes = likes - 1 WHERE id = $1 AND likes > 0 RETURNING likes",
            [id.into()],
        );

        let row = self.db.query_one(stmt).await.map_err(map_db_err)?;
        match row {
            Some(row) => Ok(Some(row.try_get::<i64>("", "likes").map_err(map_db_err)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StatsRepository for PostgresStatsRepository {
    async fn bump(
        &self,
        post_id: Uuid,
        month: &str,
        views_delta: i64,
        likes_delta: i64,
    ) -> Result<(), RepoError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO monthly_stats (post_id, month, views, likes) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (post_id, month) \
             DO UPDATE SET views = monthly_stats.views + $3, likes = monthly_stats.likes + $4",
            [
                post_id.into(),
                month.into(),
                views_delta.into(),
                likes_delta.into(),
            ],
        );

        self.db.execute(stmt).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn for_post(&self, post_id: Uuid) -> Result<Vec<MonthlyStat>, RepoError> {
        let result = MonthlyStatEntity::find()
            .filter(monthly_stat::Column::PostId.eq(post_id))
            .order_by_desc(monthly_stat::Column::Month)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        self.fetch_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        // Mask email for logging to avoid PII in logs
        let masked = if let Some(at_pos) = email.find('@') {
            let (local, domain) = email.split_at(at_pos);
            let masked_local = if local.len() > 1 {
                format!("{}***", &local[..1])
            } else {
                "***".to_string()
            };
            format!("{}{}", masked_local, domain)
        } else {
            "***".to_string()
        };
        tracing::debug!(user_email = %masked, "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::ResetToken.eq(token))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        self.insert_row(user).await
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        self.update_row(user).await
    }
}

#[async_trait]
impl SubscriberRepository for PostgresSubscriberRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, RepoError> {
        let result = SubscriberEntity::find()
            .filter(subscriber::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn insert(&self, sub: Subscriber) -> Result<Subscriber, RepoError> {
        self.insert_row(sub).await
    }

    async fn delete_by_email(&self, email: &str) -> Result<(), RepoError> {
        let result = SubscriberEntity::delete_many()
            .filter(subscriber::Column::Email.eq(email))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl PushSubscriptionRepository for PostgresPushSubscriptionRepository {
    async fn find_by_endpoint(
        &self,
        endpoint: &str,
    ) -> Result<Option<PushSubscription>, RepoError> {
        let result = PushSubscriptionEntity::find()
            .filter(push_subscription::Column::Endpoint.eq(endpoint))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn insert(&self, sub: PushSubscription) -> Result<PushSubscription, RepoError> {
        self.insert_row(sub).await
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<(), RepoError> {
        let result = PushSubscriptionEntity::delete_many()
            .filter(push_subscription::Column::Endpoint.eq(endpoint))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PushSubscription>, RepoError> {
        let result = PushSubscriptionEntity::find()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}
