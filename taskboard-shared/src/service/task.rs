/// Task use cases
///
/// Tasks are reached through their section's project: every operation
/// requires the actor to be a member of that project. Updates that move a
/// task between sections or assign an executor are narrated in the task's
/// message log; the messages and the field changes are written together.
///
/// # Timer
///
/// `start_timer` records the start instant. `stop_timer` adds the elapsed
/// whole seconds to `completion_time` and clears the start. Both append an
/// inner message in the same write.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::activity::{tracked_changes, Activity, ChangeMessage, TrackedField};
use crate::auth::authorization::{require_membership, require_section, require_task_access};
use crate::error::DomainError;
use crate::models::task::{CreateTask, Task, TaskDetails, UpdateTask};
use crate::models::user::UserSummary;
use crate::repository::Store;
use crate::service::display_name_of;

/// Fails with `UserNotFound` unless the executor is a member of the project
async fn require_executor<S>(store: &S, project_id: Uuid, executor_id: Uuid) -> Result<(), DomainError>
where
    S: Store + ?Sized,
{
    if !store.is_member(project_id, executor_id).await? {
        return Err(DomainError::UserNotFound);
    }
    Ok(())
}

pub async fn create_task<S>(store: &S, actor: Uuid, data: CreateTask) -> Result<Task, DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, data.project_id, actor).await?;
    require_section(store, data.project_id, data.section_id).await?;

    if let Some(executor_id) = data.executor_id {
        require_executor(store, data.project_id, executor_id).await?;
    }

    let data = CreateTask {
        name: data.name.trim().to_string(),
        ..data
    };
    if data.name.is_empty() {
        return Err(DomainError::BadRequest("Task name must not be empty".to_string()));
    }

    let task = store.create_task(actor, &data).await?;
    info!(task_id = %task.id, section_id = %task.section_id, "Task created");
    Ok(task)
}

/// Loads a task with its creator, executor and message log
pub async fn get_task<S>(store: &S, actor: Uuid, task_id: Uuid) -> Result<TaskDetails, DomainError>
where
    S: Store + ?Sized,
{
    let (task, _) = require_task_access(store, task_id, actor).await?;

    let mut ids = vec![task.created_by];
    ids.extend(task.executor_id);
    let profiles = store.find_profiles(&ids).await?;

    let summary = |id: Uuid| {
        profiles
            .iter()
            .find(|p| p.user_id == id)
            .map(UserSummary::from)
    };
    let creator = summary(task.created_by);
    let executor = task.executor_id.and_then(summary);

    let messages = store.list_messages(task.id).await?;

    Ok(TaskDetails {
        task,
        creator,
        executor,
        messages,
    })
}

/// Tasks of every section of a project, newest first
pub async fn list_tasks<S>(store: &S, actor: Uuid, project_id: Uuid) -> Result<Vec<Task>, DomainError>
where
    S: Store + ?Sized,
{
    require_membership(store, project_id, actor).await?;
    Ok(store.list_tasks_for_project(project_id).await?)
}

/// Applies a partial update and records the tracked changes
///
/// A section move names the target section; an executor change names the
/// new executor. Both are written by the actor's display name.
pub async fn update_task<S>(
    store: &S,
    actor: Uuid,
    task_id: Uuid,
    update: UpdateTask,
    at: DateTime<Utc>,
) -> Result<Task, DomainError>
where
    S: Store + ?Sized,
{
    let (task, section) = require_task_access(store, task_id, actor).await?;

    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(DomainError::BadRequest("Task name must not be empty".to_string()));
        }
    }
    if update.completion_time.is_some_and(|seconds| seconds < 0) {
        return Err(DomainError::BadRequest("Completion time must not be negative".to_string()));
    }

    let changes = tracked_changes(&task, &update);
    let mut activities = Vec::new();

    if let Some(section_id) = changes.section_id {
        let target = require_section(store, section.project_id, section_id).await?;
        activities.push((TrackedField::Section(section_id), Activity::MovedToSection { section: target.name }));
    }
    if let Some(executor_id) = changes.executor_id {
        require_executor(store, section.project_id, executor_id).await?;
        let executor = display_name_of(store, executor_id).await?;
        activities.push((TrackedField::Executor(executor_id), Activity::AssignedExecutor { executor }));
    }

    let messages = if activities.is_empty() {
        Vec::new()
    } else {
        let actor_name = display_name_of(store, actor).await?;
        activities
            .into_iter()
            .map(|(field, activity)| ChangeMessage {
                field,
                message: activity.message(actor, &actor_name),
            })
            .collect()
    };

    debug!(task_id = %task_id, messages = messages.len(), "Updating task");

    store
        .update_task(task_id, &update, messages, at)
        .await?
        .ok_or(DomainError::TaskNotFound)
}

/// Deletes a task after its messages
pub async fn delete_task<S>(store: &S, actor: Uuid, task_id: Uuid) -> Result<(), DomainError>
where
    S: Store + ?Sized,
{
    require_task_access(store, task_id, actor).await?;

    if !store.delete_task(task_id).await? {
        return Err(DomainError::TaskNotFound);
    }

    info!(task_id = %task_id, "Task deleted");
    Ok(())
}

pub async fn start_timer<S>(store: &S, actor: Uuid, task_id: Uuid, at: DateTime<Utc>) -> Result<Task, DomainError>
where
    S: Store + ?Sized,
{
    let (task, _) = require_task_access(store, task_id, actor).await?;
    if task.timer_running() {
        return Err(DomainError::TimerAlreadyRunning);
    }

    let actor_name = display_name_of(store, actor).await?;
    let message = Activity::TimerStarted.message(actor, &actor_name);

    // A concurrent start may win between the check above and the write.
    store
        .start_timer(task_id, at, &message)
        .await?
        .ok_or(DomainError::TimerAlreadyRunning)
}

pub async fn stop_timer<S>(store: &S, actor: Uuid, task_id: Uuid, at: DateTime<Utc>) -> Result<Task, DomainError>
where
    S: Store + ?Sized,
{
    let (task, _) = require_task_access(store, task_id, actor).await?;
    if !task.timer_running() {
        return Err(DomainError::TimerNotRunning);
    }

    let actor_name = display_name_of(store, actor).await?;
    let message = Activity::TimerStopped.message(actor, &actor_name);

    let task = store
        .stop_timer(task_id, at, &message)
        .await?
        .ok_or(DomainError::TimerNotRunning)?;

    info!(task_id = %task_id, completion_time = task.completion_time, "Task timer stopped");
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::models::project::Project;
    use crate::models::section::Section;
    use crate::models::task::TaskPriority;
    use crate::models::task_message::MessageType;
    use crate::models::user::User;
    use crate::repository::memory::MemoryStore;
    use crate::repository::{ProjectRepository, SectionRepository, TaskRepository};
    use crate::service::testing::{project, user};

    struct Fixture {
        store: MemoryStore,
        owner: User,
        member: User,
        board: Project,
        sections: Vec<Section>,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let owner = user(&store, "anna", Some("Иванова")).await;
        let member = user(&store, "boris", None).await;
        let board = project(&store, &owner, "Board").await;
        store.add_members(board.id, &[member.id]).await.unwrap();
        let sections = store.list_sections(board.id).await.unwrap();
        Fixture { store, owner, member, board, sections }
    }

    fn new_task(f: &Fixture) -> CreateTask {
        CreateTask {
            project_id: f.board.id,
            section_id: f.sections[0].id,
            name: "Ship release".to_string(),
            description: Some("Tag and publish".to_string()),
            executor_id: None,
            priority: TaskPriority::Medium,
            deadline: None,
            tags: vec!["release".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let f = fixture().await;
        let task = create_task(
            &f.store,
            f.owner.id,
            CreateTask { executor_id: Some(f.member.id), ..new_task(&f) },
        )
        .await
        .unwrap();

        let details = get_task(&f.store, f.member.id, task.id).await.unwrap();
        assert_eq!(details.task.id, task.id);
        assert_eq!(details.creator.as_ref().map(|c| c.id), Some(f.owner.id));
        assert_eq!(details.executor.as_ref().map(|e| e.name.as_str()), Some("boris"));
        assert!(details.messages.is_empty());

        let listed = list_tasks(&f.store, f.member.id, f.board.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_create_task_validates_section_and_executor() {
        let f = fixture().await;
        let outsider = user(&f.store, "outsider", None).await;
        let other = project(&f.store, &f.owner, "Other").await;
        let foreign = f.store.list_sections(other.id).await.unwrap().remove(0);

        assert!(matches!(
            create_task(&f.store, f.owner.id, CreateTask { section_id: foreign.id, ..new_task(&f) }).await,
            Err(DomainError::SectionIsNotFound)
        ));
        assert!(matches!(
            create_task(&f.store, f.owner.id, CreateTask { executor_id: Some(outsider.id), ..new_task(&f) }).await,
            Err(DomainError::UserNotFound)
        ));
        assert!(matches!(
            create_task(&f.store, outsider.id, new_task(&f)).await,
            Err(DomainError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn test_executor_change_appends_one_declarative_message() {
        let f = fixture().await;
        let task = create_task(&f.store, f.owner.id, new_task(&f)).await.unwrap();

        let update = UpdateTask { executor_id: Some(f.member.id), ..Default::default() };
        let updated = update_task(&f.store, f.owner.id, task.id, update, Utc::now()).await.unwrap();
        assert_eq!(updated.executor_id, Some(f.member.id));

        let messages = f.store.list_messages(task.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, MessageType::Declarative);
        assert_eq!(messages[0].author_id, Some(f.owner.id));
        assert_eq!(messages[0].text, "anna Иванова назначил(а) boris исполнителем");
    }

    #[tokio::test]
    async fn test_concurrent_identical_assignments_narrated_once() {
        let f = fixture().await;
        let task = create_task(&f.store, f.owner.id, new_task(&f)).await.unwrap();
        let update = UpdateTask { executor_id: Some(f.member.id), ..Default::default() };

        let (a, b) = tokio::join!(
            update_task(&f.store, f.owner.id, task.id, update.clone(), Utc::now()),
            update_task(&f.store, f.owner.id, task.id, update.clone(), Utc::now()),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(f.store.list_messages(task.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_silent_field_changes() {
        let f = fixture().await;
        let task = create_task(&f.store, f.owner.id, new_task(&f)).await.unwrap();

        let update = UpdateTask {
            priority: Some(TaskPriority::OnFire),
            finished: Some(true),
            tags: Some(vec![]),
            ..Default::default()
        };
        let updated = update_task(&f.store, f.member.id, task.id, update, Utc::now()).await.unwrap();

        assert_eq!(updated.priority, TaskPriority::OnFire);
        assert!(updated.finished);
        assert!(updated.finished_at.is_some());
        assert_eq!(f.store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_section_move_names_target_section() {
        let f = fixture().await;
        let task = create_task(&f.store, f.owner.id, new_task(&f)).await.unwrap();
        let target = &f.sections[2];

        let update = UpdateTask { section_id: Some(target.id), ..Default::default() };
        let updated = update_task(&f.store, f.member.id, task.id, update, Utc::now()).await.unwrap();
        assert_eq!(updated.section_id, target.id);

        let messages = f.store.list_messages(task.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, format!("boris перенёс задачу в {}", target.name));
    }

    #[tokio::test]
    async fn test_move_to_foreign_section_writes_nothing() {
        let f = fixture().await;
        let task = create_task(&f.store, f.owner.id, new_task(&f)).await.unwrap();
        let other = project(&f.store, &f.owner, "Other").await;
        let foreign = f.store.list_sections(other.id).await.unwrap().remove(0);

        let update = UpdateTask {
            section_id: Some(foreign.id),
            name: Some("Renamed".into()),
            ..Default::default()
        };
        assert!(matches!(
            update_task(&f.store, f.owner.id, task.id, update, Utc::now()).await,
            Err(DomainError::SectionIsNotFound)
        ));

        let stored = f.store.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Ship release");
        assert_eq!(stored.section_id, f.sections[0].id);
        assert_eq!(f.store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_timer_accumulates_completion_time() {
        let f = fixture().await;
        let task = create_task(&f.store, f.owner.id, new_task(&f)).await.unwrap();
        let started = Utc::now();

        let running = start_timer(&f.store, f.owner.id, task.id, started).await.unwrap();
        assert!(running.timer_running());
        assert!(matches!(
            start_timer(&f.store, f.owner.id, task.id, started).await,
            Err(DomainError::TimerAlreadyRunning)
        ));

        let stopped = stop_timer(&f.store, f.owner.id, task.id, started + Duration::seconds(90))
            .await
            .unwrap();
        assert!(!stopped.timer_running());
        assert_eq!(stopped.completion_time, 90);
        assert!(matches!(
            stop_timer(&f.store, f.owner.id, task.id, Utc::now()).await,
            Err(DomainError::TimerNotRunning)
        ));

        let messages = f.store.list_messages(task.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.message_type == MessageType::Inner));
        assert_eq!(messages[0].text, "anna Иванова запустил(а) таймер");
        assert_eq!(messages[1].text, "anna Иванова остановил(а) таймер");
    }

    #[tokio::test]
    async fn test_delete_task_removes_messages() {
        let f = fixture().await;
        let task = create_task(&f.store, f.owner.id, new_task(&f)).await.unwrap();
        start_timer(&f.store, f.owner.id, task.id, Utc::now()).await.unwrap();

        delete_task(&f.store, f.member.id, task.id).await.unwrap();
        assert_eq!(f.store.message_count().await, 0);
        assert!(matches!(
            get_task(&f.store, f.owner.id, task.id).await,
            Err(DomainError::TaskNotFound)
        ));
    }
}
