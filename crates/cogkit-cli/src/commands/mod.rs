//! Built-in commands.
//!
//! Each command implements the
//! [`ManagementCommand`](crate::command::ManagementCommand) trait.

pub mod check;
pub mod preview;
pub mod render;

pub use check::CheckCommand;
pub use preview::PreviewCommand;
pub use render::RenderCommand;

use cogkit_core::{CogError, CogResult};
use cogkit_template::Context;

use crate::command::CommandRegistry;

/// Registers all built-in commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(RenderCommand));
    registry.register(Box::new(CheckCommand));
    registry.register(Box::new(PreviewCommand));
}

pub(crate) fn template_arg() -> clap::Arg {
    clap::Arg::new("template")
        .long("template")
        .short('t')
        .required(true)
        .value_name("TEXT")
        .help("Template source text")
}

pub(crate) fn context_arg() -> clap::Arg {
    clap::Arg::new("context")
        .long("context")
        .short('c')
        .value_name("JSON")
        .help("Render context as a JSON object")
}

pub(crate) fn required_str<'a>(matches: &'a clap::ArgMatches, id: &str) -> CogResult<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| CogError::UsageError(format!("--{id} is required")))
}

/// Parses the `--context` argument into a render context.
///
/// A missing argument gives an empty context.
pub fn parse_context(raw: Option<&str>) -> CogResult<Context> {
    let Some(raw) = raw else {
        return Ok(Context::new());
    };
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CogError::UsageError(format!("--context is not valid JSON: {e}")))?;
    Context::from_json(value)
        .ok_or_else(|| CogError::UsageError("--context must be a JSON object".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_builtin_commands() {
        let mut registry = CommandRegistry::new();
        register_builtin_commands(&mut registry);
        assert_eq!(registry.list_commands(), vec!["check", "preview", "render"]);
    }

    #[test]
    fn test_parse_context_object() {
        let ctx = parse_context(Some(r#"{"username": "amy", "dupenum": 2}"#)).unwrap();
        assert_eq!(ctx.get("username").unwrap().to_display_string(), "amy");
        assert_eq!(ctx.get("dupenum").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn test_parse_context_missing_is_empty() {
        let ctx = parse_context(None).unwrap();
        assert!(!ctx.contains("username"));
    }

    #[test]
    fn test_parse_context_rejects_bad_json() {
        let err = parse_context(Some("{nope")).unwrap_err();
        assert!(matches!(err, CogError::UsageError(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_parse_context_rejects_non_object() {
        let err = parse_context(Some("[1, 2]")).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }
}
