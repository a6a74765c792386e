use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "client")]
    Client,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "superadmin")]
    SuperAdmin,
}

impl Role {
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub firstname: String,
    pub lastname: Option<String>,
    #[sea_orm(unique)]
    pub email: Option<String>,
    #[sea_orm(unique)]
    pub phonenumber: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub reset_code_hash: Option<String>,
    pub reset_code_expires_at: Option<DateTimeWithTimeZone>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Where notifications for this user go.
    pub fn contact(&self) -> Option<&str> {
        self.email.as_deref().or(self.phonenumber.as_deref())
    }

    pub fn display_name(&self) -> String {
        match &self.lastname {
            Some(last) if !last.is_empty() => format!("{} {}", self.firstname, last),
            _ => self.firstname.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
