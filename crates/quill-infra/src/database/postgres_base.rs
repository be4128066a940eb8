use std::marker::PhantomData;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DbConn, DbErr, EntityTrait, IntoActiveModel,
    PrimaryKeyTrait,
};

use quill_core::error::RepoError;

/// Generic PostgreSQL repository over one entity. Domain-specific queries
/// live in the per-repository trait impls; this provides the shared
/// fetch/insert/update plumbing and the error mapping.
pub struct PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub(crate) db: DbConn,
    _entity: PhantomData<E>,
}

impl<E> PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

impl<E> PostgresBaseRepository<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
{
    pub(crate) async fn fetch_by_id<T, ID>(&self, id: ID) -> Result<Option<T>, RepoError>
    where
        E::PrimaryKey: PrimaryKeyTrait<ValueType = ID>,
        ID: Send + Sync,
        T: From<E::Model>,
    {
        let result = E::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    pub(crate) async fn insert_row<T>(&self, entity: T) -> Result<T, RepoError>
    where
        T: From<E::Model> + Into<E::ActiveModel>,
    {
        let active: E::ActiveModel = entity.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;
        Ok(model.into())
    }

    pub(crate) async fn update_row<T>(&self, entity: T) -> Result<T, RepoError>
    where
        T: From<E::Model> + Into<E::ActiveModel>,
    {
        let active: E::ActiveModel = entity.into();
        let model = active.update(&self.db).await.map_err(map_db_err)?;
        Ok(model.into())
    }
}

/// Map driver errors onto the repository taxonomy. Unique-violation
/// detection is string based; the driver does not expose a typed code
/// through this layer.
pub(crate) fn map_db_err(e: DbErr) -> RepoError {
    match &e {
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
        _ => {
            let msg = e.to_string();
            if msg.contains("duplicate") || msg.contains("unique") {
                RepoError::Constraint(msg)
            } else {
                RepoError::Query(msg)
            }
        }
    }
}
