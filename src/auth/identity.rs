//! Account and role storage on top of the `users`, `roles` and `user_roles` tables.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::password::{hash_password_blocking, verify_password_blocking};
use super::password_policy::PasswordPolicy;
use super::types::{IdentityError, IdentityErrorCode, IdentityResult, NewUser};
use super::{role, user, user_role};
use crate::errors::ServiceError;
use crate::validation::PHONE_NUMBER;

const ALLOWED_USER_NAME_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._@+";

/// Either the value produced by an identity operation or the reasons it was refused.
pub type IdentityOutcome<T> = Result<T, IdentityResult>;

#[derive(Clone, Debug)]
pub struct IdentityStore {
    db: Arc<DatabaseConnection>,
    policy: PasswordPolicy,
}

impl IdentityStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self::with_policy(db, PasswordPolicy::default())
    }

    pub fn with_policy(db: Arc<DatabaseConnection>, policy: PasswordPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    #[instrument(skip(self))]
    pub async fn create_role(&self, name: &str) -> Result<IdentityResult, ServiceError> {
        if self.find_role(name).await?.is_some() {
            return Ok(IdentityResult::failed(vec![duplicate_role(name)]));
        }

        let inserted = role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
        }
        .insert(&*self.db)
        .await;

        match inserted {
            Ok(_) => {
                info!(role = name, "role created");
                Ok(IdentityResult::success())
            }
            Err(e) if is_unique_violation(&e) => {
                Ok(IdentityResult::failed(vec![duplicate_role(name)]))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Creates an account after checking the profile and the password policy.
    #[instrument(skip(self, password), fields(user_name = %new_user.user_name))]
    pub async fn create_user(
        &self,
        new_user: NewUser,
        password: &str,
    ) -> Result<IdentityOutcome<user::Model>, ServiceError> {
        let mut errors = profile_errors(
            Some(&new_user.user_name),
            new_user.nickname.as_deref(),
            new_user.phone_number.as_deref(),
        );
        errors.extend(self.policy.validate(password));

        if errors.is_empty() && self.find_by_name(&new_user.user_name).await?.is_some() {
            errors.push(duplicate_user(&new_user.user_name));
        }
        if !errors.is_empty() {
            return Ok(Err(IdentityResult::failed(errors)));
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;
        let inserted = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_name: Set(new_user.user_name.clone()),
            nickname: Set(new_user.nickname),
            phone_number: Set(new_user.phone_number),
            phone_number_confirmed: Set(new_user.phone_number_confirmed),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await;

        match inserted {
            Ok(model) => {
                info!(user_id = %model.id, "user created");
                Ok(Ok(model))
            }
            Err(e) if is_unique_violation(&e) => Ok(Err(IdentityResult::failed(vec![
                duplicate_user(&new_user.user_name),
            ]))),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn add_to_role(
        &self,
        user_id: Uuid,
        role_name: &str,
    ) -> Result<IdentityResult, ServiceError> {
        let Some(role) = self.find_role(role_name).await? else {
            return Ok(IdentityResult::failed(vec![role_not_found(role_name)]));
        };

        let existing = user_role::Entity::find_by_id((user_id, role.id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(IdentityResult::failed(vec![IdentityError::new(
                IdentityErrorCode::UserAlreadyInRole,
                format!("User already in role '{role_name}'."),
            )]));
        }

        user_role::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role.id),
        }
        .insert(&*self.db)
        .await?;
        Ok(IdentityResult::success())
    }

    pub async fn find_by_name(&self, user_name: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::UserName.eq(user_name))
            .one(&*self.db)
            .await?)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find_by_id(user_id).one(&*self.db).await?)
    }

    async fn find_role(&self, name: &str) -> Result<Option<role::Model>, ServiceError> {
        Ok(role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(&*self.db)
            .await?)
    }

    /// Role names of an account, alphabetical.
    pub async fn roles_for(&self, user: &user::Model) -> Result<Vec<String>, ServiceError> {
        let roles = user
            .find_linked(user::UserToRole)
            .order_by_asc(role::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(roles.into_iter().map(|r| r.name).collect())
    }

    pub async fn count_users(&self) -> Result<u64, ServiceError> {
        Ok(user::Entity::find().count(&*self.db).await?)
    }

    pub async fn count_roles(&self) -> Result<u64, ServiceError> {
        Ok(role::Entity::find().count(&*self.db).await?)
    }

    /// The account matching the credentials, or `None` for an unknown user or wrong password.
    #[instrument(skip(self, password))]
    pub async fn check_password(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<Option<user::Model>, ServiceError> {
        let Some(user) = self.find_by_name(user_name).await? else {
            return Ok(None);
        };
        let valid =
            verify_password_blocking(password.to_string(), user.password_hash.clone()).await?;
        if !valid {
            warn!("password mismatch");
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Replaces the role memberships of an account in one transaction.
    #[instrument(skip(self))]
    pub async fn set_roles(
        &self,
        user_id: Uuid,
        role_names: &[String],
    ) -> Result<IdentityResult, ServiceError> {
        let txn = self.db.begin().await?;

        if user::Entity::find_by_id(user_id).one(&txn).await?.is_none() {
            return Err(ServiceError::NotFound(format!("User {user_id} not found")));
        }

        let mut role_ids = Vec::with_capacity(role_names.len());
        let mut errors = Vec::new();
        for name in role_names {
            match role::Entity::find()
                .filter(role::Column::Name.eq(name.as_str()))
                .one(&txn)
                .await?
            {
                Some(role) if !role_ids.contains(&role.id) => role_ids.push(role.id),
                Some(_) => {}
                None => errors.push(role_not_found(name)),
            }
        }
        if !errors.is_empty() {
            txn.rollback().await?;
            return Ok(IdentityResult::failed(errors));
        }

        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        for role_id in role_ids {
            user_role::ActiveModel {
                user_id: Set(user_id),
                role_id: Set(role_id),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(IdentityResult::success())
    }

    #[instrument(skip(self, password))]
    pub async fn set_password(
        &self,
        user_id: Uuid,
        password: &str,
    ) -> Result<IdentityResult, ServiceError> {
        let errors = self.policy.validate(password);
        if !errors.is_empty() {
            return Ok(IdentityResult::failed(errors));
        }

        let user = self.require_user(user_id).await?;
        let password_hash = hash_password_blocking(password.to_string()).await?;
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.update(&*self.db).await?;
        Ok(IdentityResult::success())
    }

    /// Changes nickname and phone number. `None` leaves a field as it is.
    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        nickname: Option<String>,
        phone_number: Option<String>,
    ) -> Result<IdentityResult, ServiceError> {
        let errors = profile_errors(None, nickname.as_deref(), phone_number.as_deref());
        if !errors.is_empty() {
            return Ok(IdentityResult::failed(errors));
        }

        let user = self.require_user(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        if let Some(nickname) = nickname {
            active.nickname = Set(Some(nickname));
        }
        if let Some(phone_number) = phone_number {
            active.phone_number = Set(Some(phone_number));
        }
        if active.is_changed() {
            active.update(&*self.db).await?;
        }
        Ok(IdentityResult::success())
    }

    /// Removes an account; its role memberships go with it.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let user = self.require_user(user_id).await?;
        user.delete(&*self.db).await?;
        info!("user deleted");
        Ok(())
    }

    async fn require_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} not found")))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn profile_errors(
    user_name: Option<&str>,
    nickname: Option<&str>,
    phone_number: Option<&str>,
) -> Vec<IdentityError> {
    let mut errors = Vec::new();

    if let Some(user_name) = user_name {
        if user_name.is_empty()
            || user_name.chars().count() > 256
            || !user_name.chars().all(|c| ALLOWED_USER_NAME_CHARS.contains(c))
        {
            errors.push(IdentityError::new(
                IdentityErrorCode::InvalidUserName,
                format!("Username '{user_name}' is invalid, can only contain letters or digits."),
            ));
        }
    }

    if let Some(nickname) = nickname {
        let len = nickname.chars().count();
        if !(2..=20).contains(&len) {
            errors.push(IdentityError::new(
                IdentityErrorCode::InvalidNickname,
                "Nickname must be between 2 and 20 characters.",
            ));
        }
    }

    if let Some(phone_number) = phone_number {
        if !PHONE_NUMBER.is_match(phone_number) {
            errors.push(IdentityError::new(
                IdentityErrorCode::InvalidPhoneNumber,
                format!("Phone number '{phone_number}' must be exactly 11 digits."),
            ));
        }
    }

    errors
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn duplicate_role(name: &str) -> IdentityError {
    IdentityError::new(
        IdentityErrorCode::DuplicateRoleName,
        format!("Role name '{name}' is already taken."),
    )
}

fn duplicate_user(name: &str) -> IdentityError {
    IdentityError::new(
        IdentityErrorCode::DuplicateUserName,
        format!("Username '{name}' is already taken."),
    )
}

fn role_not_found(name: &str) -> IdentityError {
    IdentityError::new(
        IdentityErrorCode::RoleNotFound,
        format!("Role {name} does not exist."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection, run_migrations};
    use assert_matches::assert_matches;

    async fn store() -> IdentityStore {
        let db = establish_connection("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();
        IdentityStore::new(Arc::new(db))
    }

    fn clerk(user_name: &str) -> NewUser {
        NewUser {
            user_name: user_name.to_string(),
            nickname: Some("小王".to_string()),
            phone_number: Some("13500000000".to_string()),
            phone_number_confirmed: true,
        }
    }

    #[tokio::test]
    async fn duplicate_role_names_are_refused() {
        let store = store().await;
        assert!(store.create_role("admin").await.unwrap().succeeded());

        let again = store.create_role("admin").await.unwrap();
        assert!(again.has(IdentityErrorCode::DuplicateRoleName));
        assert_eq!(store.count_roles().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_user_reports_every_problem() {
        let store = store().await;
        let bad = NewUser {
            user_name: "小王 wang".to_string(),
            nickname: Some("王".to_string()),
            phone_number: Some("1350000".to_string()),
            phone_number_confirmed: false,
        };

        let result = store.create_user(bad, "abc").await.unwrap().unwrap_err();
        for code in [
            IdentityErrorCode::InvalidUserName,
            IdentityErrorCode::InvalidNickname,
            IdentityErrorCode::InvalidPhoneNumber,
            IdentityErrorCode::PasswordTooShort,
        ] {
            assert!(result.has(code), "missing {code}");
        }
        assert_eq!(store.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_user_names_are_refused() {
        let store = store().await;
        store
            .create_user(clerk("wang"), "Aa.123456")
            .await
            .unwrap()
            .unwrap();

        let result = store
            .create_user(clerk("wang"), "Aa.123456")
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(result.errors[0].code, IdentityErrorCode::DuplicateUserName);
    }

    #[tokio::test]
    async fn role_membership_rules() {
        let store = store().await;
        store.create_role("salesman").await.unwrap();
        let user = store
            .create_user(clerk("wang"), "Aa.123456")
            .await
            .unwrap()
            .unwrap();

        assert!(store.add_to_role(user.id, "salesman").await.unwrap().succeeded());
        assert!(store
            .add_to_role(user.id, "salesman")
            .await
            .unwrap()
            .has(IdentityErrorCode::UserAlreadyInRole));
        assert!(store
            .add_to_role(user.id, "admin")
            .await
            .unwrap()
            .has(IdentityErrorCode::RoleNotFound));
        assert_eq!(store.roles_for(&user).await.unwrap(), vec!["salesman"]);
    }

    #[tokio::test]
    async fn set_roles_replaces_memberships() {
        let store = store().await;
        store.create_role("admin").await.unwrap();
        store.create_role("salesman").await.unwrap();
        let user = store
            .create_user(clerk("wang"), "Aa.123456")
            .await
            .unwrap()
            .unwrap();
        store.add_to_role(user.id, "salesman").await.unwrap();

        let result = store
            .set_roles(user.id, &["admin".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert!(result.has(IdentityErrorCode::RoleNotFound));
        assert_eq!(store.roles_for(&user).await.unwrap(), vec!["salesman"]);

        store.set_roles(user.id, &["admin".to_string()]).await.unwrap();
        assert_eq!(store.roles_for(&user).await.unwrap(), vec!["admin"]);
    }

    #[tokio::test]
    async fn passwords_are_checked_and_changed() {
        let store = store().await;
        let user = store
            .create_user(clerk("wang"), "Aa.123456")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(user.password_hash, "Aa.123456");

        assert!(store.check_password("wang", "Aa.123456").await.unwrap().is_some());
        assert!(store.check_password("wang", "Bb.123456").await.unwrap().is_none());
        assert!(store.check_password("nobody", "Aa.123456").await.unwrap().is_none());

        assert!(store
            .set_password(user.id, "short")
            .await
            .unwrap()
            .has(IdentityErrorCode::PasswordTooShort));
        assert!(store.set_password(user.id, "Bb.123456").await.unwrap().succeeded());
        assert!(store.check_password("wang", "Bb.123456").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_a_user_drops_memberships() {
        let store = store().await;
        store.create_role("admin").await.unwrap();
        let user = store
            .create_user(clerk("wang"), "Aa.123456")
            .await
            .unwrap()
            .unwrap();
        store.add_to_role(user.id, "admin").await.unwrap();

        store.delete_user(user.id).await.unwrap();
        let memberships = user_role::Entity::find()
            .count(store.connection())
            .await
            .unwrap();
        assert_eq!(memberships, 0);
        assert_matches!(
            store.delete_user(user.id).await,
            Err(ServiceError::NotFound(_))
        );
    }
}
