/// Section use cases
///
/// Every operation requires membership in the project. A section id is only
/// accepted together with the project it belongs to; a section of another
/// project is reported as missing.

use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{require_membership, require_section};
use crate::error::DomainError;
use crate::models::section::{CreateSection, Section, UpdateSection};
use crate::repository::Store;

pub async fn create_section<S>(
    store: &S,
    actor: Uuid,
    project_id: Uuid,
    data: CreateSection,
) -> Result<Section, DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, project_id, actor).await?;

    let data = CreateSection {
        name: data.name.trim().to_string(),
        ..data
    };
    if data.name.is_empty() {
        return Err(DomainError::BadRequest("Section name must not be empty".to_string()));
    }

    let section = store.create_section(project_id, &data).await?;
    info!(project_id = %project_id, section_id = %section.id, "Section created");
    Ok(section)
}

pub async fn list_sections<S>(store: &S, actor: Uuid, project_id: Uuid) -> Result<Vec<Section>, DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, project_id, actor).await?;
    Ok(store.list_sections(project_id).await?)
}

pub async fn get_section<S>(store: &S, actor: Uuid, project_id: Uuid, section_id: Uuid) -> Result<Section, DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, project_id, actor).await?;
    require_section(store, project_id, section_id).await
}

pub async fn update_section<S>(
    store: &S,
    actor: Uuid,
    project_id: Uuid,
    section_id: Uuid,
    data: UpdateSection,
) -> Result<Section, DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, project_id, actor).await?;
    require_section(store, project_id, section_id).await?;

    let data = UpdateSection {
        name: data.name.map(|n| n.trim().to_string()),
        ..data
    };
    if data.name.as_deref() == Some("") {
        return Err(DomainError::BadRequest("Section name must not be empty".to_string()));
    }

    store
        .update_section(section_id, &data)
        .await?
        .ok_or(DomainError::SectionIsNotFound)
}

/// Deletes the section together with its tasks and their messages
pub async fn delete_section<S>(store: &S, actor: Uuid, project_id: Uuid, section_id: Uuid) -> Result<(), DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, project_id, actor).await?;
    require_section(store, project_id, section_id).await?;

    if !store.delete_section(section_id).await? {
        return Err(DomainError::SectionIsNotFound);
    }

    info!(project_id = %project_id, section_id = %section_id, "Section deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{CreateTask, TaskPriority};
    use crate::repository::memory::MemoryStore;
    use crate::repository::{SectionRepository, TaskRepository};
    use crate::service::testing::{project, user};

    fn new_section(name: &str, position: i32) -> CreateSection {
        CreateSection { name: name.to_string(), position, color: Some("#ff0000".to_string()) }
    }

    #[tokio::test]
    async fn test_section_crud() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner", None).await;
        let board = project(&store, &owner, "Board").await;

        let created = create_section(&store, owner.id, board.id, new_section(" Review ", 5)).await.unwrap();
        assert_eq!(created.name, "Review");
        assert_eq!(created.project_id, board.id);

        let sections = list_sections(&store, owner.id, board.id).await.unwrap();
        assert_eq!(sections.len(), 5);
        assert_eq!(sections.last().map(|s| s.id), Some(created.id));

        let updated = update_section(
            &store,
            owner.id,
            board.id,
            created.id,
            UpdateSection { name: Some("QA".into()), ..Default::default() },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "QA");
        assert_eq!(updated.position, 5);

        delete_section(&store, owner.id, board.id, created.id).await.unwrap();
        assert!(matches!(
            get_section(&store, owner.id, board.id, created.id).await,
            Err(DomainError::SectionIsNotFound)
        ));
    }

    #[tokio::test]
    async fn test_section_requires_membership() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner", None).await;
        let outsider = user(&store, "outsider", None).await;
        let board = project(&store, &owner, "Board").await;

        assert!(matches!(
            create_section(&store, outsider.id, board.id, new_section("X", 1)).await,
            Err(DomainError::AccessDenied)
        ));
        assert!(matches!(
            list_sections(&store, outsider.id, board.id).await,
            Err(DomainError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn test_section_of_other_project_is_not_found() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner", None).await;
        let board = project(&store, &owner, "Board").await;
        let other = project(&store, &owner, "Other").await;
        let foreign = store.list_sections(other.id).await.unwrap().remove(0);

        assert!(matches!(
            delete_section(&store, owner.id, board.id, foreign.id).await,
            Err(DomainError::SectionIsNotFound)
        ));
        assert_eq!(store.list_sections(other.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_delete_section_removes_tasks_and_messages() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner", None).await;
        let board = project(&store, &owner, "Board").await;
        let section = store.list_sections(board.id).await.unwrap().remove(0);

        let task = store
            .create_task(
                owner.id,
                &CreateTask {
                    project_id: board.id,
                    section_id: section.id,
                    name: "Write docs".into(),
                    description: None,
                    executor_id: None,
                    priority: TaskPriority::High,
                    deadline: None,
                    tags: vec![],
                },
            )
            .await
            .unwrap();
        crate::service::task::start_timer(&store, owner.id, task.id, chrono::Utc::now())
            .await
            .unwrap();
        assert_eq!(store.message_count().await, 1);

        delete_section(&store, owner.id, board.id, section.id).await.unwrap();
        assert!(store.find_task(task.id).await.unwrap().is_none());
        assert_eq!(store.message_count().await, 0);
    }
}
