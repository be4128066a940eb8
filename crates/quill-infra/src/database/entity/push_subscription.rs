//! Web Push subscription entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "push_subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique, column_type = "Text")]
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    #[sea_orm(nullable)]
    pub user_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for quill_core::domain::PushSubscription {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            endpoint: model.endpoint,
            p256dh: model.p256dh,
            auth: model.auth,
            user_id: model.user_id,
            created_at: model.created_at.into(),
        }
    }
}

impl From<quill_core::domain::PushSubscription> for ActiveModel {
    fn from(sub: quill_core::domain::PushSubscription) -> Self {
        Self {
            id: Set(sub.id),
            endpoint: Set(sub.endpoint),
            p256dh: Set(sub.p256dh),
            auth: Set(sub.auth),
            user_id: Set(sub.user_id),
            created_at: Set(sub.created_at.into()),
        }
    }
}
