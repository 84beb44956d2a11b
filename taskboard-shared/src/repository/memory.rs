/// In-memory store
///
/// A complete [`Store`] kept in process memory. All state sits behind one
/// async mutex and every trait method takes the lock once, so compound
/// operations are all-or-nothing just like their PostgreSQL counterparts.
/// Used by unit tests and by the HTTP tests in `taskboard-api`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    ProjectRepository, SectionRepository, SessionRepository, Store, StoreError, StoreResult,
    TaskRepository, UserRepository,
};
use crate::activity::{pending_messages, ChangeMessage};
use crate::models::project::{CreateProject, Project, ProjectMember, UpdateProject, DEFAULT_SECTIONS};
use crate::models::section::{CreateSection, Section, UpdateSection};
use crate::models::session::{NewSession, Session};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::task_message::{NewTaskMessage, TaskMessage};
use crate::models::user::{CreateUser, UpdateUser, User, UserCredentials, UserProfile};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserCredentials>,
    profiles: HashMap<Uuid, UserProfile>,
    invites: BTreeMap<String, Vec<Uuid>>,
    sessions: HashMap<Uuid, Session>,
    projects: HashMap<Uuid, Project>,
    members: Vec<(Uuid, Uuid)>,
    sections: HashMap<Uuid, Section>,
    tasks: HashMap<Uuid, Task>,
    messages: Vec<TaskMessage>,
}

impl State {
    fn email_or_username_used(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        except: Option<Uuid>,
    ) -> bool {
        let email = email.map(str::to_lowercase);
        self.users.values().any(|c| {
            Some(c.user.id) != except
                && (email.as_deref() == Some(c.user.email.to_lowercase().as_str())
                    || username == Some(c.user.username.as_str()))
        })
    }

    fn is_member(&self, project_id: Uuid, user_id: Uuid) -> bool {
        self.members.contains(&(project_id, user_id))
    }

    fn add_member(&mut self, project_id: Uuid, user_id: Uuid) -> bool {
        if self.is_member(project_id, user_id) {
            return false;
        }
        self.members.push((project_id, user_id));
        true
    }

    fn section_ids(&self, project_id: Uuid) -> Vec<Uuid> {
        self.sections
            .values()
            .filter(|s| s.project_id == project_id)
            .map(|s| s.id)
            .collect()
    }

    fn push_message(&mut self, task_id: Uuid, message: &NewTaskMessage, at: DateTime<Utc>) -> TaskMessage {
        let stored = TaskMessage {
            id: Uuid::new_v4(),
            task_id,
            author_id: Some(message.author_id),
            message_type: message.message_type,
            text: message.text.clone(),
            created_at: at,
        };
        self.messages.push(stored.clone());
        stored
    }

    fn remove_tasks(&mut self, section_ids: &[Uuid]) {
        let task_ids: Vec<Uuid> = self
            .tasks
            .values()
            .filter(|t| section_ids.contains(&t.section_id))
            .map(|t| t.id)
            .collect();

        self.messages.retain(|m| !task_ids.contains(&m.task_id));
        self.tasks.retain(|id, _| !task_ids.contains(id));
    }
}

/// [`Store`] kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Number of stored task messages
    pub async fn message_count(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    /// Projects still waiting for `email` to sign up
    pub async fn pending_invite(&self, email: &str) -> Option<Vec<Uuid>> {
        self.state.lock().await.invites.get(&email.to_lowercase()).cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials(&self, login: &str) -> StoreResult<Option<UserCredentials>> {
        let state = self.state.lock().await;
        let lowered = login.to_lowercase();

        let by_username = state.users.values().find(|c| c.user.username == login);
        let by_email = || state.users.values().find(|c| c.user.email.to_lowercase() == lowered);

        Ok(by_username.or_else(by_email).cloned())
    }

    async fn login_taken(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        except: Option<Uuid>,
    ) -> StoreResult<bool> {
        Ok(self.state.lock().await.email_or_username_used(email, username, except))
    }

    async fn create_user(&self, data: &CreateUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;

        if state.email_or_username_used(Some(&data.email), Some(&data.username), None) {
            return Err(StoreError::Conflict("users".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username.clone(),
            email: data.email.clone(),
            created_at: now,
            updated_at: now,
        };
        let profile = UserProfile {
            user_id: user.id,
            name: data.name.clone(),
            surname: data.surname.clone(),
            patronymic: None,
            phone: None,
            position: None,
            joined_at: now,
        };

        state.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: data.password_hash.clone(),
            },
        );
        state.profiles.insert(user.id, profile);
        Ok(user)
    }

    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.state.lock().await.profiles.get(&user_id).cloned())
    }

    async fn find_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<UserProfile>> {
        let state = self.state.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }

    async fn update_user(&self, id: Uuid, data: &UpdateUser) -> StoreResult<Option<User>> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        if state.email_or_username_used(data.email.as_deref(), data.username.as_deref(), Some(id)) {
            return Err(StoreError::Conflict("users".to_string()));
        }

        let now = Utc::now();
        let user = match state.users.get_mut(&id) {
            Some(credentials) => {
                let user = &mut credentials.user;
                if let Some(username) = &data.username {
                    user.username = username.clone();
                }
                if let Some(email) = &data.email {
                    user.email = email.clone();
                }
                user.updated_at = now;
                user.clone()
            }
            None => return Ok(None),
        };

        if let Some(profile) = state.profiles.get_mut(&id) {
            if let Some(name) = &data.name {
                profile.name = name.clone();
            }
            if let Some(surname) = &data.surname {
                profile.surname = Some(surname.clone());
            }
            if let Some(patronymic) = &data.patronymic {
                profile.patronymic = Some(patronymic.clone());
            }
            if let Some(phone) = &data.phone {
                profile.phone = Some(phone.clone());
            }
            if let Some(position) = &data.position {
                profile.position = Some(position.clone());
            }
        }

        Ok(Some(user))
    }

    async fn find_users_by_identifiers(&self, identifiers: &[String]) -> StoreResult<Vec<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .filter(|c| {
                identifiers.iter().any(|i| {
                    i.to_lowercase() == c.user.email.to_lowercase() || *i == c.user.username
                })
            })
            .map(|c| c.user.clone())
            .collect())
    }

    async fn add_pending_invite(&self, email: &str, project_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let projects = state.invites.entry(email.to_lowercase()).or_default();
        if !projects.contains(&project_id) {
            projects.push(project_id);
        }
        Ok(())
    }

    async fn resolve_pending_invite(&self, email: &str, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let mut state = self.state.lock().await;

        let Some(project_ids) = state.invites.remove(&email.to_lowercase()) else {
            return Ok(Vec::new());
        };

        let mut joined = Vec::with_capacity(project_ids.len());
        for project_id in project_ids {
            if !state.projects.contains_key(&project_id) {
                continue;
            }
            state.add_member(project_id, user_id);
            joined.push(project_id);
        }
        Ok(joined)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create_session(&self, data: &NewSession) -> StoreResult<Session> {
        let mut state = self.state.lock().await;

        if state.sessions.contains_key(&data.id) {
            return Err(StoreError::Conflict("sessions_pkey".to_string()));
        }

        let session = Session {
            id: data.id,
            user_id: data.user_id,
            refresh_token_hash: data.refresh_token_hash.clone(),
            expires_at: data.expires_at,
            remember_me: data.remember_me,
            user_agent: data.user_agent.clone(),
            created_at: Utc::now(),
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        Ok(self.state.lock().await.sessions.get(&id).cloned())
    }

    async fn rotate_session(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(&id) {
            Some(session) if session.refresh_token_hash == expected_hash => {
                session.refresh_token_hash = new_hash.to_string();
                session.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.lock().await.sessions.remove(&id).is_some())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn create_project(&self, owner: Uuid, data: &CreateProject) -> StoreResult<Project> {
        let mut state = self.state.lock().await;

        if state.projects.values().any(|p| p.name == data.name) {
            return Err(StoreError::Conflict("projects_name_key".to_string()));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            icon_id: data.icon_id,
            created_by: owner,
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(project.id, project.clone());
        state.add_member(project.id, owner);

        for (index, name) in DEFAULT_SECTIONS.iter().enumerate() {
            let section = Section {
                id: Uuid::new_v4(),
                project_id: project.id,
                name: (*name).to_string(),
                position: index as i32 + 1,
                color: None,
            };
            state.sections.insert(section.id, section);
        }

        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.state.lock().await.projects.get(&id).cloned())
    }

    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        let state = self.state.lock().await;
        Ok(state.projects.values().find(|p| p.name == name).cloned())
    }

    async fn list_projects_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        let state = self.state.lock().await;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|p| state.is_member(p.id, user_id))
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.created_at);
        Ok(projects)
    }

    async fn update_project(&self, id: Uuid, data: &UpdateProject) -> StoreResult<Option<Project>> {
        let mut state = self.state.lock().await;

        if let Some(name) = &data.name {
            if state.projects.values().any(|p| p.id != id && &p.name == name) {
                return Err(StoreError::Conflict("projects_name_key".to_string()));
            }
        }

        Ok(state.projects.get_mut(&id).map(|project| {
            if let Some(name) = &data.name {
                project.name = name.clone();
            }
            if let Some(icon_id) = data.icon_id {
                project.icon_id = icon_id;
            }
            project.updated_at = Utc::now();
            project.clone()
        }))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;

        state.members.retain(|(project_id, _)| *project_id != id);
        let section_ids = state.section_ids(id);
        state.remove_tasks(&section_ids);
        state.sections.retain(|_, s| s.project_id != id);
        Ok(state.projects.remove(&id).is_some())
    }

    async fn is_member(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.state.lock().await.is_member(project_id, user_id))
    }

    async fn list_members(&self, project_id: Uuid) -> StoreResult<Vec<ProjectMember>> {
        let state = self.state.lock().await;
        let Some(project) = state.projects.get(&project_id) else {
            return Ok(Vec::new());
        };

        let mut members: Vec<ProjectMember> = state
            .members
            .iter()
            .filter(|(p, _)| *p == project_id)
            .filter_map(|(_, user_id)| {
                let credentials = state.users.get(user_id)?;
                let profile = state.profiles.get(user_id)?;
                Some(ProjectMember {
                    user_id: *user_id,
                    username: credentials.user.username.clone(),
                    email: credentials.user.email.clone(),
                    name: profile.name.clone(),
                    surname: profile.surname.clone(),
                    position: profile.position.clone(),
                    is_admin: *user_id == project.created_by,
                })
            })
            .collect();
        members.sort_by(|a, b| b.is_admin.cmp(&a.is_admin).then_with(|| a.username.cmp(&b.username)));
        Ok(members)
    }

    async fn add_members(&self, project_id: Uuid, user_ids: &[Uuid]) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let added = user_ids
            .iter()
            .filter(|user_id| state.add_member(project_id, **user_id))
            .count();
        Ok(added as u64)
    }

    async fn remove_members(&self, project_id: Uuid, user_ids: &[Uuid]) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let Some(owner) = state.projects.get(&project_id).map(|p| p.created_by) else {
            return Ok(0);
        };

        let before = state.members.len();
        state.members.retain(|(p, u)| {
            !(*p == project_id && *u != owner && user_ids.contains(u))
        });
        Ok((before - state.members.len()) as u64)
    }
}

#[async_trait]
impl SectionRepository for MemoryStore {
    async fn create_section(&self, project_id: Uuid, data: &CreateSection) -> StoreResult<Section> {
        let mut state = self.state.lock().await;
        let section = Section {
            id: Uuid::new_v4(),
            project_id,
            name: data.name.clone(),
            position: data.position,
            color: data.color.clone(),
        };
        state.sections.insert(section.id, section.clone());
        Ok(section)
    }

    async fn list_sections(&self, project_id: Uuid) -> StoreResult<Vec<Section>> {
        let state = self.state.lock().await;
        let mut sections: Vec<Section> = state
            .sections
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        sections.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        Ok(sections)
    }

    async fn find_section(&self, id: Uuid) -> StoreResult<Option<Section>> {
        Ok(self.state.lock().await.sections.get(&id).cloned())
    }

    async fn update_section(&self, id: Uuid, data: &UpdateSection) -> StoreResult<Option<Section>> {
        let mut state = self.state.lock().await;
        Ok(state.sections.get_mut(&id).map(|section| {
            if let Some(name) = &data.name {
                section.name = name.clone();
            }
            if let Some(position) = data.position {
                section.position = position;
            }
            if let Some(color) = &data.color {
                section.color = Some(color.clone());
            }
            section.clone()
        }))
    }

    async fn delete_section(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        state.remove_tasks(&[id]);
        Ok(state.sections.remove(&id).is_some())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create_task(&self, created_by: Uuid, data: &CreateTask) -> StoreResult<Task> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            section_id: data.section_id,
            name: data.name.clone(),
            description: data.description.clone(),
            created_by,
            executor_id: data.executor_id,
            priority: data.priority,
            deadline: data.deadline,
            finished: false,
            finished_at: None,
            completion_time: 0,
            timer_started_at: None,
            tags: data.tags.clone(),
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.state.lock().await.tasks.get(&id).cloned())
    }

    async fn list_tasks_for_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.lock().await;
        let section_ids = state.section_ids(project_id);
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| section_ids.contains(&t.section_id))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn list_messages(&self, task_id: Uuid) -> StoreResult<Vec<TaskMessage>> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn update_task(
        &self,
        id: Uuid,
        update: &UpdateTask,
        messages: Vec<ChangeMessage>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.lock().await;

        let Some(mut task) = state.tasks.get(&id).cloned() else {
            return Ok(None);
        };

        for message in pending_messages(&task, messages) {
            state.push_message(id, &message, at);
        }
        task.apply(update, at);
        state.tasks.insert(id, task.clone());
        Ok(Some(task))
    }

    async fn start_timer(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &NewTaskMessage,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.lock().await;

        let task = match state.tasks.get_mut(&id) {
            Some(task) if !task.timer_running() => {
                task.timer_started_at = Some(at);
                task.updated_at = at;
                task.clone()
            }
            _ => return Ok(None),
        };
        state.push_message(id, message, at);
        Ok(Some(task))
    }

    async fn stop_timer(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &NewTaskMessage,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.lock().await;

        let task = match state.tasks.get_mut(&id) {
            Some(task) if task.timer_running() => {
                let elapsed = task.elapsed_seconds(at);
                task.completion_time += elapsed;
                task.timer_started_at = None;
                task.updated_at = at;
                task.clone()
            }
            _ => return Ok(None),
        };
        state.push_message(id, message, at);
        Ok(Some(task))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        state.messages.retain(|m| m.task_id != id);
        Ok(state.tasks.remove(&id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::TrackedField;
    use crate::models::task::TaskPriority;
    use crate::models::task_message::MessageType;

    async fn user(store: &MemoryStore, username: &str) -> User {
        store
            .create_user(&CreateUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "hash".to_string(),
                name: username.to_string(),
                surname: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_find_credentials_by_email_or_username() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;

        let by_name = store.find_credentials("alice").await.unwrap().unwrap();
        assert_eq!(by_name.user.id, alice.id);

        let by_email = store.find_credentials("ALICE@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.user.id, alice.id);

        // Usernames are matched exactly
        assert!(store.find_credentials("ALICE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_project_seeds_default_sections() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;

        let project = store
            .create_project(owner.id, &CreateProject { name: "Board".into(), icon_id: 0 })
            .await
            .unwrap();

        let sections = store.list_sections(project.id).await.unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, DEFAULT_SECTIONS.to_vec());
        assert_eq!(sections[0].position, 1);
        assert_eq!(sections[3].position, 4);
        assert!(store.is_member(project.id, owner.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_members_keeps_owner() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let bob = user(&store, "bob").await;

        let project = store
            .create_project(owner.id, &CreateProject { name: "Board".into(), icon_id: 0 })
            .await
            .unwrap();
        store.add_members(project.id, &[bob.id]).await.unwrap();

        let removed = store.remove_members(project.id, &[owner.id, bob.id]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_member(project.id, owner.id).await.unwrap());
        assert!(!store.is_member(project.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_section_removes_tasks_and_messages() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let project = store
            .create_project(owner.id, &CreateProject { name: "Board".into(), icon_id: 0 })
            .await
            .unwrap();
        let section = store.list_sections(project.id).await.unwrap().remove(0);

        let task = store
            .create_task(
                owner.id,
                &CreateTask {
                    project_id: project.id,
                    section_id: section.id,
                    name: "Task".into(),
                    description: None,
                    executor_id: None,
                    priority: TaskPriority::Low,
                    deadline: None,
                    tags: vec![],
                },
            )
            .await
            .unwrap();
        let message = NewTaskMessage {
            author_id: owner.id,
            message_type: MessageType::Inner,
            text: "started".into(),
        };
        store.start_timer(task.id, Utc::now(), &message).await.unwrap();
        assert_eq!(store.message_count().await, 1);

        assert!(store.delete_section(section.id).await.unwrap());
        assert!(store.find_task(task.id).await.unwrap().is_none());
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_rotate_session_is_conditional() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let session = store
            .create_session(&NewSession {
                id: Uuid::new_v4(),
                user_id: owner.id,
                refresh_token_hash: "old".into(),
                expires_at: Utc::now(),
                remember_me: false,
                user_agent: None,
            })
            .await
            .unwrap();

        assert!(store.rotate_session(session.id, "old", "new", Utc::now()).await.unwrap());
        assert!(!store.rotate_session(session.id, "old", "newer", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_invites_resolve_once() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let project = store
            .create_project(owner.id, &CreateProject { name: "Board".into(), icon_id: 0 })
            .await
            .unwrap();

        store.add_pending_invite("New@Example.com", project.id).await.unwrap();
        store.add_pending_invite("new@example.com", project.id).await.unwrap();
        assert_eq!(store.pending_invite("new@example.com").await, Some(vec![project.id]));

        let newcomer = user(&store, "new").await;
        let joined = store.resolve_pending_invite("new@example.com", newcomer.id).await.unwrap();
        assert_eq!(joined, vec![project.id]);
        assert!(store.is_member(project.id, newcomer.id).await.unwrap());
        assert!(store.pending_invite("new@example.com").await.is_none());

        let again = store.resolve_pending_invite("new@example.com", newcomer.id).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_update_task_skips_messages_for_applied_changes() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let project = store
            .create_project(owner.id, &CreateProject { name: "Board".into(), icon_id: 0 })
            .await
            .unwrap();
        let section = store.list_sections(project.id).await.unwrap().remove(0);
        let task = store
            .create_task(
                owner.id,
                &CreateTask {
                    project_id: project.id,
                    section_id: section.id,
                    name: "Task".into(),
                    description: None,
                    executor_id: None,
                    priority: TaskPriority::Low,
                    deadline: None,
                    tags: vec![],
                },
            )
            .await
            .unwrap();

        // Both writers compared against the same unassigned task
        let update = UpdateTask { executor_id: Some(owner.id), ..Default::default() };
        let assigned = || {
            vec![ChangeMessage {
                field: TrackedField::Executor(owner.id),
                message: NewTaskMessage {
                    author_id: owner.id,
                    message_type: MessageType::Declarative,
                    text: "assigned".into(),
                },
            }]
        };

        store.update_task(task.id, &update, assigned(), Utc::now()).await.unwrap();
        let second = store.update_task(task.id, &update, assigned(), Utc::now()).await.unwrap().unwrap();

        assert_eq!(second.executor_id, Some(owner.id));
        assert_eq!(store.message_count().await, 1);
    }
}
