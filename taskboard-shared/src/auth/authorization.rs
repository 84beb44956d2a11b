/// Authorization checks
///
/// Access inside the application is decided per project:
///
/// - **Members** may read the project and work with its sections and tasks
/// - **The owner** (`projects.created_by`) may additionally rename or delete
///   the project and remove members
///
/// Each check loads what it verified and returns it, so handlers do not
/// query the same row twice.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::require_membership;
/// use taskboard_shared::repository::memory::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), taskboard_shared::error::DomainError> {
/// let store = MemoryStore::new();
/// let project = require_membership(&store, Uuid::new_v4(), Uuid::new_v4()).await?;
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use crate::error::DomainError;
use crate::models::project::Project;
use crate::models::section::Section;
use crate::models::task::Task;
use crate::repository::{ProjectRepository, SectionRepository, TaskRepository};

/// Loads a project or fails with `ProjectNotFound`
pub async fn require_project<S>(store: &S, project_id: Uuid) -> Result<Project, DomainError>
where
    S: ProjectRepository + ?Sized,
{
    store
        .find_project(project_id)
        .await?
        .ok_or(DomainError::ProjectNotFound)
}

/// Requires the user to be a member of the project
pub async fn require_membership<S>(store: &S, project_id: Uuid, user_id: Uuid) -> Result<Project, DomainError>
where
    S: ProjectRepository + ?Sized,
{
    let project = require_project(store, project_id).await?;

    if !store.is_member(project_id, user_id).await? {
        return Err(DomainError::AccessDenied);
    }

    Ok(project)
}

/// Requires the user to own the project
pub fn require_ownership(project: &Project, user_id: Uuid) -> Result<(), DomainError> {
    if !project.is_owner(user_id) {
        return Err(DomainError::AccessDenied);
    }

    Ok(())
}

/// Loads a project and requires the user to own it
pub async fn require_project_owner<S>(store: &S, project_id: Uuid, user_id: Uuid) -> Result<Project, DomainError>
where
    S: ProjectRepository + ?Sized,
{
    let project = require_project(store, project_id).await?;
    require_ownership(&project, user_id)?;
    Ok(project)
}

/// Loads a section that must belong to `project_id`
pub async fn require_section<S>(store: &S, project_id: Uuid, section_id: Uuid) -> Result<Section, DomainError>
where
    S: SectionRepository + ?Sized,
{
    match store.find_section(section_id).await? {
        Some(section) if section.project_id == project_id => Ok(section),
        _ => Err(DomainError::SectionIsNotFound),
    }
}

/// Loads a task and requires the user to be a member of its project
///
/// Returns the task together with its section.
pub async fn require_task_access<S>(store: &S, task_id: Uuid, user_id: Uuid) -> Result<(Task, Section), DomainError>
where
    S: ProjectRepository + SectionRepository + TaskRepository + ?Sized,
{
    let task = store.find_task(task_id).await?.ok_or(DomainError::TaskNotFound)?;
    let section = store
        .find_section(task.section_id)
        .await?
        .ok_or(DomainError::SectionIsNotFound)?;

    require_membership(store, section.project_id, user_id).await?;

    Ok((task, section))
}
