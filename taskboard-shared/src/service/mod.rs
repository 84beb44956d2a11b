/// Application services
///
/// Each function is one use case: it authorizes the acting user, applies
/// the business rules and calls the store. Services are generic over the
/// store, so handlers pass an `Arc<dyn Store>` and tests pass a
/// `MemoryStore`.
///
/// # Modules
///
/// - `project`: projects, members and deferred invitations
/// - `section`: section CRUD within a project
/// - `task`: tasks, activity recording and the work timer
/// - `user`: the current user's account and profile

pub mod project;
pub mod section;
pub mod task;
pub mod user;

use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::UserRepository;

/// Display name of a user, as used in activity messages
pub(crate) async fn display_name_of<S>(store: &S, user_id: Uuid) -> Result<String, DomainError>
where
    S: UserRepository + ?Sized,
{
    store
        .find_profile(user_id)
        .await?
        .map(|profile| profile.display_name())
        .ok_or(DomainError::UserNotFound)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::models::project::{CreateProject, Project};
    use crate::models::user::{CreateUser, User};
    use crate::repository::memory::MemoryStore;
    use crate::repository::{ProjectRepository, UserRepository};

    pub async fn user(store: &MemoryStore, username: &str, surname: Option<&str>) -> User {
        store
            .create_user(&CreateUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "hash".to_string(),
                name: username.to_string(),
                surname: surname.map(str::to_string),
            })
            .await
            .unwrap()
    }

    pub async fn project(store: &MemoryStore, owner: &User, name: &str) -> Project {
        store
            .create_project(owner.id, &CreateProject { name: name.to_string(), icon_id: 1 })
            .await
            .unwrap()
    }
}
