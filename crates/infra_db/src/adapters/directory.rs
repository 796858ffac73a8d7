//! User directory backed by the `user_profiles` table

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, PortError, UserId};
use domain_lifecycle::IdentityResolver;
use domain_request::{Actor, Role};

use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
struct ProfileRow {
    user_id: Uuid,
    display_name: String,
    email: Option<String>,
    role: Option<String>,
}

impl ProfileRow {
    fn into_actor(self) -> Actor {
        let actor = Actor::new(UserId::from_uuid(self.user_id), Role::from_metadata(self.role.as_deref()))
            .with_name(self.display_name);
        match self.email {
            Some(email) => actor.with_email(email),
            None => actor,
        }
    }
}

/// Resolves actors from profile rows; the role lives in `metadata->>'role'`
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgDirectory {}

#[async_trait]
impl IdentityResolver for PgDirectory {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn resolve(&self, user_id: UserId) -> Result<Actor, PortError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, display_name, email, metadata->>'role' AS role
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let actor = row
            .map(ProfileRow::into_actor)
            .ok_or_else(|| PortError::not_found("User", user_id))?;
        debug!(role = %actor.role, "Resolved actor");
        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_without_role_is_plain_user() {
        let row = ProfileRow {
            user_id: Uuid::new_v4(),
            display_name: "Maria Souza".to_string(),
            email: None,
            role: None,
        };

        let actor = row.into_actor();

        assert_eq!(actor.role, Role::User);
        assert_eq!(actor.display_name, "Maria Souza");
        assert!(actor.email.is_none());
    }

    #[test]
    fn test_profile_role_is_case_insensitive() {
        let row = ProfileRow {
            user_id: Uuid::new_v4(),
            display_name: "Ana".to_string(),
            email: Some("ana@acme.com.br".to_string()),
            role: Some("finance".to_string()),
        };

        let actor = row.into_actor();

        assert_eq!(actor.role, Role::Finance);
        assert_eq!(actor.email.as_deref(), Some("ana@acme.com.br"));
    }
}
