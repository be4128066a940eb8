//! Monthly rollup entity for SeaORM. Composite key `(post_id, month)`.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "monthly_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub post_id: Uuid,
    /// Calendar month in `YYYY-MM` form.
    #[sea_orm(primary_key, auto_increment = false)]
    pub month: String,
    pub views: i64,
    pub likes: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for quill_core::domain::MonthlyStat {
    fn from(model: Model) -> Self {
        Self {
            post_id: model.post_id,
            month: model.month,
            views: model.views,
            likes: model.likes,
        }
    }
}

impl From<quill_core::domain::MonthlyStat> for ActiveModel {
    fn from(stat: quill_core::domain::MonthlyStat) -> Self {
        Self {
            post_id: Set(stat.post_id),
            month: Set(stat.month),
            views: Set(stat.views),
            likes: Set(stat.likes),
        }
    }
}
