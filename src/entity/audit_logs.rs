use sea_orm::entity::prelude::*;
use serde_json::Value;

/// Append-only record of a staff or checkout mutation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Acting user; `None` for system-initiated writes.
    pub user_id: Option<Uuid>,
    /// Snake-case verb such as `order_create` or `review_status_update`.
    pub action: String,
    /// Table the action touched.
    pub resource: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub metadata: Option<Value>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
