/// Current-user account and profile
///
/// `update_me` writes only the fields that are present. A new email is
/// stored lowercased; email and username stay unique across accounts.

use tracing::info;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::user::{UpdateUser, UserMe};
use crate::repository::{Store, StoreError};

pub async fn me<S>(store: &S, actor: Uuid) -> Result<UserMe, DomainError>
where
    S: Store + ?Sized,
{
    let user = store.find_user(actor).await?.ok_or(DomainError::UserNotFound)?;
    let profile = store.find_profile(actor).await?.ok_or(DomainError::UserNotFound)?;
    Ok(UserMe::new(user, profile))
}

pub async fn update_me<S>(store: &S, actor: Uuid, data: UpdateUser) -> Result<UserMe, DomainError>
where
    S: Store + ?Sized,
{
    let data = UpdateUser {
        email: data.email.map(|e| e.trim().to_lowercase()),
        username: data.username.map(|u| u.trim().to_string()),
        ..data
    };

    if data.email.as_deref() == Some("") || data.username.as_deref() == Some("") {
        return Err(DomainError::BadRequest("Email and username must not be empty".to_string()));
    }

    if data.touches_account()
        && store
            .login_taken(data.email.as_deref(), data.username.as_deref(), Some(actor))
            .await?
    {
        return Err(DomainError::AuthDataIsNotUnique);
    }

    match store.update_user(actor, &data).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(DomainError::UserNotFound),
        Err(StoreError::Conflict(_)) => return Err(DomainError::AuthDataIsNotUnique),
        Err(err) => return Err(err.into()),
    }

    info!(user_id = %actor, "User profile updated");
    me(store, actor).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;
    use crate::service::testing::user;

    #[tokio::test]
    async fn test_me_combines_account_and_profile() {
        let store = MemoryStore::new();
        let anna = user(&store, "anna", Some("Иванова")).await;

        let me = me(&store, anna.id).await.unwrap();
        assert_eq!(me.id, anna.id);
        assert_eq!(me.username, "anna");
        assert_eq!(me.email, "anna@example.com");
        assert_eq!(me.surname.as_deref(), Some("Иванова"));
        assert!(me.phone.is_none());
    }

    #[tokio::test]
    async fn test_update_me_partial() {
        let store = MemoryStore::new();
        let anna = user(&store, "anna", None).await;

        let updated = update_me(
            &store,
            anna.id,
            UpdateUser {
                email: Some(" Anna.New@Example.com ".into()),
                position: Some("Engineer".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.email, "anna.new@example.com");
        assert_eq!(updated.position.as_deref(), Some("Engineer"));
        assert_eq!(updated.username, "anna");
        assert_eq!(updated.name, "anna");
    }

    #[tokio::test]
    async fn test_update_me_rejects_taken_login() {
        let store = MemoryStore::new();
        let anna = user(&store, "anna", None).await;
        user(&store, "boris", None).await;

        let taken_username = UpdateUser { username: Some("boris".into()), ..Default::default() };
        assert!(matches!(
            update_me(&store, anna.id, taken_username).await,
            Err(DomainError::AuthDataIsNotUnique)
        ));

        let taken_email = UpdateUser { email: Some("BORIS@example.com".into()), ..Default::default() };
        assert!(matches!(
            update_me(&store, anna.id, taken_email).await,
            Err(DomainError::AuthDataIsNotUnique)
        ));

        let own_username = UpdateUser { username: Some("anna".into()), ..Default::default() };
        assert!(update_me(&store, anna.id, own_username).await.is_ok());
    }

    #[tokio::test]
    async fn test_me_unknown_user() {
        let store = MemoryStore::new();
        assert!(matches!(me(&store, Uuid::new_v4()).await, Err(DomainError::UserNotFound)));
    }
}
