//! Typed record-transformation hooks.
//!
//! Plugins customize generated records by registering hooks against
//! specific entity types. Hooks run in registration order and each one
//! receives the record produced by the previous hook. A failing hook
//! aborts the whole generation run.

use crate::model::{Channel, FileRecord, Message, User, Workspace};

/// Error from a hook application, carrying enough context to report
/// which plugin broke on which entity type.
#[derive(Debug, thiserror::Error)]
#[error("hook '{hook}' failed on {entity}: {reason}")]
pub struct HookError {
    pub entity: &'static str,
    pub hook: String,
    pub reason: String,
}

/// A named transformation over records of one entity type.
pub trait RecordHook<R>: Send + Sync {
    /// Identifier recorded in workspace metadata.
    fn name(&self) -> &str;

    /// Transform one record. Errors abort generation.
    fn apply(&self, record: R) -> Result<R, String>;
}

/// Hook built from a closure.
pub struct FnHook<R> {
    name: String,
    func: Box<dyn Fn(R) -> Result<R, String> + Send + Sync>,
}

impl<R> FnHook<R> {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(R) -> Result<R, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl<R: Send + Sync> RecordHook<R> for FnHook<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, record: R) -> Result<R, String> {
        (self.func)(record)
    }
}

/// Ordered hook lists per entity type.
#[derive(Default)]
pub struct HookRegistry {
    identifiers: Vec<String>,
    workspace_hooks: Vec<Box<dyn RecordHook<Workspace>>>,
    user_hooks: Vec<Box<dyn RecordHook<User>>>,
    channel_hooks: Vec<Box<dyn RecordHook<Channel>>>,
    message_hooks: Vec<Box<dyn RecordHook<Message>>>,
    file_hooks: Vec<Box<dyn RecordHook<FileRecord>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook names in first-registration order, deduplicated.
    pub fn plugin_identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn is_empty(&self) -> bool {
        self.workspace_hooks.is_empty()
            && self.user_hooks.is_empty()
            && self.channel_hooks.is_empty()
            && self.message_hooks.is_empty()
            && self.file_hooks.is_empty()
    }

    fn note_identifier(&mut self, name: &str) {
        if !self.identifiers.iter().any(|n| n == name) {
            self.identifiers.push(name.to_string());
        }
    }

    pub fn register_workspace(&mut self, hook: Box<dyn RecordHook<Workspace>>) {
        self.note_identifier(hook.name());
        self.workspace_hooks.push(hook);
    }

    pub fn register_user(&mut self, hook: Box<dyn RecordHook<User>>) {
        self.note_identifier(hook.name());
        self.user_hooks.push(hook);
    }

    pub fn register_channel(&mut self, hook: Box<dyn RecordHook<Channel>>) {
        self.note_identifier(hook.name());
        self.channel_hooks.push(hook);
    }

    pub fn register_message(&mut self, hook: Box<dyn RecordHook<Message>>) {
        self.note_identifier(hook.name());
        self.message_hooks.push(hook);
    }

    pub fn register_file(&mut self, hook: Box<dyn RecordHook<FileRecord>>) {
        self.note_identifier(hook.name());
        self.file_hooks.push(hook);
    }

    pub fn apply_workspace(&self, record: Workspace) -> Result<Workspace, HookError> {
        apply_chain(&self.workspace_hooks, "workspace", record)
    }

    pub fn apply_user(&self, record: User) -> Result<User, HookError> {
        apply_chain(&self.user_hooks, "user", record)
    }

    pub fn apply_channel(&self, record: Channel) -> Result<Channel, HookError> {
        apply_chain(&self.channel_hooks, "channel", record)
    }

    pub fn apply_message(&self, record: Message) -> Result<Message, HookError> {
        apply_chain(&self.message_hooks, "message", record)
    }

    pub fn apply_file(&self, record: FileRecord) -> Result<FileRecord, HookError> {
        apply_chain(&self.file_hooks, "file", record)
    }
}

fn apply_chain<R>(
    hooks: &[Box<dyn RecordHook<R>>],
    entity: &'static str,
    mut record: R,
) -> Result<R, HookError> {
    for hook in hooks {
        record = hook.apply(record).map_err(|reason| HookError {
            entity,
            hook: hook.name().to_string(),
            reason,
        })?;
    }
    Ok(record)
}
