use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::LinkDef;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Database entity for staff accounts
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    #[validate(length(min = 1, max = 256, message = "User name must be between 1 and 256 characters"))]
    pub user_name: String,
    #[validate(length(min = 2, max = 20, message = "Nickname must be between 2 and 20 characters"))]
    pub nickname: Option<String>,
    #[validate(regex(
        path = "crate::validation::PHONE_NUMBER",
        message = "Phone number must be exactly 11 digits"
    ))]
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Database relationships for User entity
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::auth::user_role::Entity")]
    UserRole,
}

impl Related<crate::auth::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRole.def()
    }
}

impl Related<crate::auth::role::Entity> for Entity {
    fn to() -> RelationDef {
        crate::auth::user_role::Relation::Role.def()
    }

    fn via() -> Option<RelationDef> {
        Some(crate::auth::user_role::Relation::User.def().rev())
    }
}

/// Walks `users` → `user_roles` → `roles`.
#[derive(Debug)]
pub struct UserToRole;

impl Linked for UserToRole {
    type FromEntity = Entity;
    type ToEntity = crate::auth::role::Entity;

    fn link(&self) -> Vec<LinkDef> {
        vec![
            crate::auth::user_role::Relation::User.def().rev(),
            crate::auth::user_role::Relation::Role.def(),
        ]
    }
}

impl ActiveModelBehavior for ActiveModel {}
