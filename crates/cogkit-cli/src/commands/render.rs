//! The `render` command.
//!
//! Renders a template against a JSON context within the render budget and
//! prints the result.

use std::time::Duration;

use async_trait::async_trait;
use cogkit_core::{CogError, CogResult, Settings};
use cogkit_template::{Context, Engine};

use super::{context_arg, parse_context, required_str, template_arg};
use crate::command::ManagementCommand;

/// Renders a template once and prints the output.
///
/// The budget comes from the settings unless `--timeout-ms` overrides it.
pub struct RenderCommand;

/// Renders `source` with an engine built from `settings`.
pub fn render_template(
    settings: &Settings,
    source: &str,
    context: &Context,
    timeout_ms: Option<u64>,
) -> CogResult<String> {
    let engine = Engine::from_settings(&settings.template);
    let budget = timeout_ms.map_or_else(
        || settings.template.render_timeout(),
        Duration::from_millis,
    );
    Ok(engine.render_with_timeout(source, context, budget)?)
}

#[async_trait]
impl ManagementCommand for RenderCommand {
    fn name(&self) -> &'static str {
        "render"
    }

    fn help(&self) -> &'static str {
        "Render a template and print the result"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(template_arg()).arg(context_arg()).arg(
            clap::Arg::new("timeout-ms")
                .long("timeout-ms")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("Render budget in milliseconds"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), CogError> {
        let source = required_str(matches, "template")?;
        let context = parse_context(matches.get_one::<String>("context").map(String::as_str))?;
        let timeout_ms = matches.get_one::<u64>("timeout-ms").copied();

        let output = render_template(settings, source, &context, timeout_ms)?;
        println!("{output}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogkit_core::RenderError;

    #[test]
    fn test_render_template() {
        let ctx = Context::new().with("username", "amy");
        let out = render_template(
            &Settings::default(),
            "{{ username }}'s room",
            &ctx,
            None,
        )
        .unwrap();
        assert_eq!(out, "amy's room");
    }

    #[test]
    fn test_render_template_syntax_error() {
        let err = render_template(
            &Settings::default(),
            "{% if %}",
            &Context::new(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CogError::Render(RenderError::Syntax { .. })));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_render_template_timeout_override() {
        let source =
            "{% for i in range(100000) %}{% for j in range(100000) %}{% endfor %}{% endfor %}";
        let err = render_template(
            &Settings::default(),
            source,
            &Context::new(),
            Some(50),
        )
        .unwrap_err();
        let CogError::Render(err) = err else {
            panic!("expected a render error");
        };
        assert_eq!(err, RenderError::TimedOut { budget: Duration::from_millis(50) });
    }

    #[tokio::test]
    async fn test_handle_render() {
        let cmd = RenderCommand;
        let matches = cmd
            .add_arguments(clap::Command::new("render"))
            .try_get_matches_from(["render", "--template", "{{ 1 + 1 }}", "--timeout-ms", "500"])
            .unwrap();
        assert!(cmd.handle(&matches, &Settings::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_handle_bad_context() {
        let cmd = RenderCommand;
        let matches = cmd
            .add_arguments(clap::Command::new("render"))
            .try_get_matches_from(["render", "-t", "x", "-c", "42"])
            .unwrap();
        let err = cmd.handle(&matches, &Settings::default()).await.unwrap_err();
        assert!(matches!(err, CogError::UsageError(_)));
    }
}
