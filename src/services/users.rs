use crate::{
    auth::{
        user, IdentityErrorCode, IdentityOutcome, IdentityResult, IdentityStore, NewUser,
    },
    errors::{FieldErrors, ServiceError},
    validation::display::role_label,
};
use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{not_found, Page};

/// An account together with the names of its roles.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: user::Model,
    pub roles: Vec<String>,
    pub role_labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    #[serde(flatten)]
    pub profile: NewUser,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Fields left out stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub nickname: Option<String>,
    pub phone_number: Option<String>,
    pub roles: Option<Vec<String>>,
    pub password: Option<String>,
}

/// Administration of staff accounts
#[derive(Clone)]
pub struct UserService {
    identity: IdentityStore,
}

impl UserService {
    pub fn new(identity: IdentityStore) -> Self {
        Self { identity }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<Page<UserView>, ServiceError> {
        let paginator = user::Entity::find()
            .order_by_asc(user::Column::UserName)
            .paginate(self.identity.connection(), per_page);
        let total = paginator.num_items().await?;
        let accounts = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut items = Vec::with_capacity(accounts.len());
        for account in accounts {
            items.push(self.view(account).await?);
        }
        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Uuid) -> Result<UserView, ServiceError> {
        let account = self.find(user_id).await?;
        self.view(account).await
    }

    /// Creates the account, then grants its roles. The account is removed again when a role is
    /// unknown.
    #[instrument(skip(self, input), fields(user_name = %input.profile.user_name))]
    pub async fn create(&self, input: CreateUser) -> Result<UserView, ServiceError> {
        let account = accept(
            self.identity
                .create_user(input.profile, &input.password)
                .await?,
        )?;

        let granted = self.identity.set_roles(account.id, &input.roles).await?;
        if !granted.succeeded() {
            self.identity.delete_user(account.id).await?;
            return Err(identity_failure(&granted));
        }

        info!(user_id = %account.id, "user registered");
        self.view(account).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, user_id: Uuid, input: UpdateUser) -> Result<UserView, ServiceError> {
        self.find(user_id).await?;

        if let Some(password) = &input.password {
            let refused = self.identity.policy().validate(password);
            if !refused.is_empty() {
                return Err(identity_failure(&IdentityResult::failed(refused)));
            }
        }

        check(
            self.identity
                .update_profile(user_id, input.nickname, input.phone_number)
                .await?,
        )?;
        if let Some(roles) = &input.roles {
            check(self.identity.set_roles(user_id, roles).await?)?;
        }
        if let Some(password) = &input.password {
            check(self.identity.set_password(user_id, password).await?)?;
            info!(%user_id, "password changed");
        }

        self.get(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.identity.delete_user(user_id).await
    }

    async fn find(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        self.identity
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn view(&self, user: user::Model) -> Result<UserView, ServiceError> {
        let roles = self.identity.roles_for(&user).await?;
        let role_labels = roles
            .iter()
            .map(|role| role_label(role))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UserView {
            user,
            roles,
            role_labels,
        })
    }
}

fn accept<T>(outcome: IdentityOutcome<T>) -> Result<T, ServiceError> {
    outcome.map_err(|refused| identity_failure(&refused))
}

fn check(result: IdentityResult) -> Result<(), ServiceError> {
    if result.succeeded() {
        Ok(())
    } else {
        Err(identity_failure(&result))
    }
}

/// Reports refused identity operations per field; a duplicate user name is a conflict.
pub fn identity_failure(result: &IdentityResult) -> ServiceError {
    if result.has(IdentityErrorCode::DuplicateUserName) && result.errors.len() == 1 {
        return ServiceError::Conflict(result.errors[0].description.clone());
    }

    let mut fields = FieldErrors::new();
    for error in &result.errors {
        fields
            .entry(field_for(error.code).to_string())
            .or_default()
            .push(format!("{}: {}", error.code, error.description));
    }
    ServiceError::InvalidFields(fields)
}

fn field_for(code: IdentityErrorCode) -> &'static str {
    use IdentityErrorCode::*;
    match code {
        DuplicateUserName | InvalidUserName => "user_name",
        InvalidNickname => "nickname",
        InvalidPhoneNumber => "phone_number",
        PasswordTooShort
        | PasswordRequiresDigit
        | PasswordRequiresLower
        | PasswordRequiresUpper
        | PasswordRequiresNonAlphanumeric
        | PasswordRequiresUniqueChars => "password",
        DuplicateRoleName => "name",
        RoleNotFound | UserAlreadyInRole => "roles",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityError;
    use assert_matches::assert_matches;

    #[test]
    fn password_rules_are_grouped_under_password() {
        let result = IdentityResult::failed(vec![
            IdentityError::new(IdentityErrorCode::PasswordTooShort, "too short"),
            IdentityError::new(IdentityErrorCode::PasswordRequiresDigit, "needs a digit"),
            IdentityError::new(IdentityErrorCode::InvalidNickname, "bad nickname"),
        ]);

        assert_matches!(identity_failure(&result), ServiceError::InvalidFields(fields) => {
            assert_eq!(fields["password"].len(), 2);
            assert_eq!(fields["password"][0], "PasswordTooShort: too short");
            assert_eq!(fields["nickname"], vec!["InvalidNickname: bad nickname"]);
        });
    }

    #[test]
    fn duplicate_user_name_alone_is_a_conflict() {
        let result = IdentityResult::failed(vec![IdentityError::new(
            IdentityErrorCode::DuplicateUserName,
            "User name 'xiaohe' is already taken.",
        )]);
        assert_matches!(identity_failure(&result), ServiceError::Conflict(_));
    }
}
