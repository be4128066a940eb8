#[cfg(test)]
mod tests {
    use crate::database::entity::{monthly_stat, post};
    use crate::database::postgres_repo::{PostgresPostRepository, PostgresStatsRepository};
    use quill_core::domain::{Post, PostStatus};
    use quill_core::ports::{PostRepository, StatsRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn post_model(slug: &str, status: &str) -> post::Model {
        let now = chrono::Utc::now();
        post::Model {
            id: uuid::Uuid::new_v4(),
            author_id: uuid::Uuid::new_v4(),
            slug: slug.to_owned(),
            title: "Test Post".to_owned(),
            content: "Content".to_owned(),
            excerpt: None,
            category: "general".to_owned(),
            language: "en".to_owned(),
            tags: serde_json::json!(["rust", "web"]),
            status: status.to_owned(),
            likes: 3,
            views: 7,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn test_find_post_by_id_maps_domain_fields() {
        let model = post_model("test-post", "approved");
        let post_id = model.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

        let post = result.unwrap();
        assert_eq!(post.id, post_id);
        assert_eq!(post.slug, "test-post");
        assert_eq!(post.status, PostStatus::Approved);
        assert_eq!(post.tags, vec!["rust".to_string(), "web".to_string()]);
        assert_eq!(post.likes, 3);
        assert_eq!(post.views, 7);
    }

    #[tokio::test]
    async fn test_find_by_slug() {
        let model = post_model("hello-world", "approved");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let post = repo.find_by_slug("hello-world").await.unwrap().unwrap();
        assert_eq!(post.slug, "hello-world");
    }

    #[tokio::test]
    async fn test_unknown_status_falls_back_to_draft() {
        let model = post_model("odd-row", "syndicated");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let post = repo.find_by_slug("odd-row").await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_rollup_bump_executes_single_upsert() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let repo = PostgresStatsRepository::new(db);

        repo.bump(uuid::Uuid::new_v4(), "2025-03", 1, 0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stats_for_post_ordered() {
        let post_id = uuid::Uuid::new_v4();
        let rows = vec![
            monthly_stat::Model {
                post_id,
                month: "2025-04".to_owned(),
                views: 2,
                likes: 1,
            },
            monthly_stat::Model {
                post_id,
                month: "2025-03".to_owned(),
                views: 10,
                likes: 4,
            },
        ];

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![rows])
            .into_connection();

        let repo = PostgresStatsRepository::new(db);

        let stats = repo.for_post(post_id).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].month, "2025-04");
        assert_eq!(stats[1].views, 10);
    }
}
