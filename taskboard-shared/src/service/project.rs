/// Project use cases
///
/// Members may read a project; only its owner may rename it, delete it or
/// remove members. Adding people is open to every member: identifiers that
/// match an account join directly, unknown emails become deferred
/// invitations resolved at signup.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{require_membership, require_project_owner};
use crate::error::DomainError;
use crate::models::project::{CreateProject, Project, ProjectMember, ProjectWithSections, UpdateProject};
use crate::repository::{Store, StoreError};

/// Result of adding users to a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddedMembers {
    /// Accounts that became members
    pub added: Vec<Uuid>,

    /// Emails recorded as deferred invitations
    pub invited: Vec<String>,
}

fn name_conflict(err: StoreError) -> DomainError {
    match err {
        StoreError::Conflict(_) => DomainError::ProjectNameIsNotUnique,
        other => DomainError::Store(other),
    }
}

async fn with_sections<S>(store: &S, project: Project) -> Result<ProjectWithSections, DomainError>
where
    S: Store + ?Sized,
{
    let sections = store.list_sections(project.id).await?;
    Ok(ProjectWithSections { project, sections })
}

/// Creates a project owned by `actor`, with the default sections
pub async fn create_project<S>(store: &S, actor: Uuid, data: CreateProject) -> Result<ProjectWithSections, DomainError>
where
    S: Store + ?Sized,
{
    let data = CreateProject {
        name: data.name.trim().to_string(),
        ..data
    };
    if data.name.is_empty() {
        return Err(DomainError::BadRequest("Project name must not be empty".to_string()));
    }

    if store.find_project_by_name(&data.name).await?.is_some() {
        return Err(DomainError::ProjectNameIsNotUnique);
    }

    let project = store.create_project(actor, &data).await.map_err(name_conflict)?;
    info!(project_id = %project.id, owner = %actor, "Project created");

    with_sections(store, project).await
}

/// Projects `actor` is a member of, each with its sections
pub async fn list_projects<S>(store: &S, actor: Uuid) -> Result<Vec<ProjectWithSections>, DomainError>
where
    S: Store + ?Sized,
{
    let projects = store.list_projects_for_member(actor).await?;

    let mut result = Vec::with_capacity(projects.len());
    for project in projects {
        result.push(with_sections(store, project).await?);
    }
    Ok(result)
}

pub async fn get_project<S>(store: &S, actor: Uuid, project_id: Uuid) -> Result<ProjectWithSections, DomainError>
where
    S: Store + ?Sized,
{
    let project = require_membership(store, project_id, actor).await?;
    with_sections(store, project).await
}

/// Renames or re-icons a project; owner only
pub async fn update_project<S>(
    store: &S,
    actor: Uuid,
    project_id: Uuid,
    data: UpdateProject,
) -> Result<Project, DomainError>
where
    S: Store + ?Sized,
{
    let project = require_project_owner(store, project_id, actor).await?;

    let data = UpdateProject {
        name: data.name.map(|n| n.trim().to_string()),
        ..data
    };

    if let Some(name) = &data.name {
        if name.is_empty() {
            return Err(DomainError::BadRequest("Project name must not be empty".to_string()));
        }
        if *name != project.name && store.find_project_by_name(name).await?.is_some() {
            return Err(DomainError::ProjectNameIsNotUnique);
        }
    }

    store
        .update_project(project_id, &data)
        .await
        .map_err(name_conflict)?
        .ok_or(DomainError::ProjectNotFound)
}

/// Deletes a project with all its sections, tasks and messages; owner only
pub async fn delete_project<S>(store: &S, actor: Uuid, project_id: Uuid) -> Result<(), DomainError>
where
    S: Store + ?Sized,
{
    require_project_owner(store, project_id, actor).await?;

    if !store.delete_project(project_id).await? {
        return Err(DomainError::ProjectNotFound);
    }

    info!(project_id = %project_id, "Project deleted");
    Ok(())
}

pub async fn list_members<S>(store: &S, actor: Uuid, project_id: Uuid) -> Result<Vec<ProjectMember>, DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, project_id, actor).await?;
    Ok(store.list_members(project_id).await?)
}

/// Adds users by email or username
///
/// Existing accounts that are not yet members join the project. Identifiers
/// that look like an email but match no account are stored as deferred
/// invitations. Unknown usernames are ignored.
pub async fn add_members<S>(
    store: &S,
    actor: Uuid,
    project_id: Uuid,
    identifiers: Vec<String>,
) -> Result<AddedMembers, DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, project_id, actor).await?;

    let identifiers: Vec<String> = identifiers
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();

    let users = store.find_users_by_identifiers(&identifiers).await?;

    let mut result = AddedMembers::default();
    for user in &users {
        if !store.is_member(project_id, user.id).await? {
            result.added.push(user.id);
        }
    }
    store.add_members(project_id, &result.added).await?;

    for identifier in &identifiers {
        let lowered = identifier.to_lowercase();
        let known = users
            .iter()
            .any(|u| u.email.to_lowercase() == lowered || u.username == *identifier);
        if known || !identifier.contains('@') || result.invited.contains(&lowered) {
            continue;
        }

        store.add_pending_invite(&lowered, project_id).await?;
        result.invited.push(lowered);
    }

    info!(
        project_id = %project_id,
        added = result.added.len(),
        invited = result.invited.len(),
        "Project members added"
    );
    Ok(result)
}

/// Removes members from one project; owner only, the owner always stays
pub async fn remove_members<S>(
    store: &S,
    actor: Uuid,
    project_id: Uuid,
    user_ids: Vec<Uuid>,
) -> Result<u64, DomainError>
where
    S: Store + ?Sized,
{
    require_project_owner(store, project_id, actor).await?;

    let removed = store.remove_members(project_id, &user_ids).await?;
    info!(project_id = %project_id, removed, "Project members removed");
    Ok(removed)
}
