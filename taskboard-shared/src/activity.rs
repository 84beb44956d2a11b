/// Task activity recorder
///
/// Turns task mutations into human-readable log entries. Rendering is pure:
/// given the actor's display name and the action, the text is fixed. The
/// caller writes the resulting messages in the same transaction as the
/// mutation itself.
///
/// Only changes with user-facing meaning are recorded: moving a task to
/// another section and assigning an executor. Timer start and stop always
/// produce an `inner` message.

use uuid::Uuid;

use crate::models::task::{Task, UpdateTask};
use crate::models::task_message::{MessageType, NewTaskMessage};

/// A recorded action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    /// The task was moved to the named section
    MovedToSection { section: String },

    /// The named user became the executor
    AssignedExecutor { executor: String },

    TimerStarted,

    TimerStopped,
}

impl Activity {
    /// Renders the message text for `actor`
    pub fn render(&self, actor: &str) -> String {
        match self {
            Activity::MovedToSection { section } => format!("{} перенёс задачу в {}", actor, section),
            Activity::AssignedExecutor { executor } => {
                format!("{} назначил(а) {} исполнителем", actor, executor)
            }
            Activity::TimerStarted => format!("{} запустил(а) таймер", actor),
            Activity::TimerStopped => format!("{} остановил(а) таймер", actor),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Activity::MovedToSection { .. } | Activity::AssignedExecutor { .. } => MessageType::Declarative,
            Activity::TimerStarted | Activity::TimerStopped => MessageType::Inner,
        }
    }

    /// Builds the message to store for this action
    pub fn message(&self, author_id: Uuid, actor: &str) -> NewTaskMessage {
        NewTaskMessage {
            author_id,
            message_type: self.message_type(),
            text: self.render(actor),
        }
    }
}

/// Fields of an update that produce activity, when they actually change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackedChanges {
    /// New section, if different from the current one
    pub section_id: Option<Uuid>,

    /// New executor, if different from the current one
    pub executor_id: Option<Uuid>,
}

impl TrackedChanges {
    pub fn is_empty(&self) -> bool {
        self.section_id.is_none() && self.executor_id.is_none()
    }
}

/// Compares an update with the current task and keeps the tracked fields that change
pub fn tracked_changes(task: &Task, update: &UpdateTask) -> TrackedChanges {
    TrackedChanges {
        section_id: update.section_id.filter(|id| *id != task.section_id),
        executor_id: update.executor_id.filter(|id| Some(*id) != task.executor_id),
    }
}

/// Tracked field and the value an update writes to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    Section(Uuid),
    Executor(Uuid),
}

impl TrackedField {
    /// Whether writing this value would still change `task`
    pub fn changes(&self, task: &Task) -> bool {
        match *self {
            TrackedField::Section(id) => id != task.section_id,
            TrackedField::Executor(id) => Some(id) != task.executor_id,
        }
    }
}

/// Message narrating one tracked change
///
/// Stores write it only if the change still applies to the row they hold
/// locked, so concurrent identical updates are narrated once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMessage {
    pub field: TrackedField,
    pub message: NewTaskMessage,
}

/// Keeps the messages whose change still applies to `task`
pub fn pending_messages(task: &Task, messages: Vec<ChangeMessage>) -> Vec<NewTaskMessage> {
    messages
        .into_iter()
        .filter(|m| m.field.changes(task))
        .map(|m| m.message)
        .collect()
}
