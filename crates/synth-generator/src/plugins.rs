//! Built-in plugins.
//!
//! A plugin is a named bundle of record hooks. Names given on the
//! command line resolve here; the resolved names are recorded in
//! workspace metadata by the generation run.

use synth_core::{Channel, ConfigError, FnHook, HookRegistry, Message, User};

/// Plugin names accepted by [`build_registry`], alphabetical.
pub const BUILTIN_PLUGINS: &[&str] = &[
    "bot-titles",
    "private-banners",
    "quiet-reactions",
    "redact-emails",
];

/// Resolve plugin names into a hook registry. Order is preserved;
/// unknown names fail before any generation work starts.
pub fn build_registry<S: AsRef<str>>(names: &[S]) -> Result<HookRegistry, ConfigError> {
    let mut registry = HookRegistry::new();
    for name in names {
        match name.as_ref() {
            "bot-titles" => {
                registry.register_user(Box::new(FnHook::new("bot-titles", |mut user: User| {
                    if user.is_bot {
                        user.title = "Automation".to_string();
                    }
                    Ok(user)
                })));
            }
            "private-banners" => {
                registry.register_channel(Box::new(FnHook::new(
                    "private-banners",
                    |mut channel: Channel| {
                        if channel.channel_type == synth_core::ChannelType::Private {
                            channel.topic = format!("[private] {}", channel.topic);
                        }
                        Ok(channel)
                    },
                )));
            }
            "quiet-reactions" => {
                registry.register_message(Box::new(FnHook::new(
                    "quiet-reactions",
                    |mut message: Message| {
                        message.reactions_json = "{}".to_string();
                        Ok(message)
                    },
                )));
            }
            "redact-emails" => {
                registry.register_user(Box::new(FnHook::new("redact-emails", |mut user: User| {
                    let prefix: String = user.id.chars().take(8).collect();
                    user.email = format!("{prefix}@redacted.example");
                    Ok(user)
                })));
            }
            other => return Err(ConfigError::UnknownPlugin(other.to_string())),
        }
    }
    Ok(registry)
}
