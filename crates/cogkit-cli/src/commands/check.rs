//! The `check` command.
//!
//! Compiles a template without rendering it, so authors can find syntax
//! errors before saving a template.

use async_trait::async_trait;
use cogkit_core::{CogError, RenderError, Settings};
use cogkit_template::Engine;

use super::{required_str, template_arg};
use crate::command::ManagementCommand;

/// Compiles a template and reports whether it is valid.
pub struct CheckCommand;

/// Compiles `source`, returning the syntax error if there is one.
pub fn check_template(source: &str) -> Result<(), RenderError> {
    Engine::new().compile(source).map(|_| ())
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Check a template for syntax errors"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(template_arg())
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        _settings: &Settings,
    ) -> Result<(), CogError> {
        let source = required_str(matches, "template")?;
        check_template(source)?;
        println!("Template OK");
        Ok(())
    }
}
