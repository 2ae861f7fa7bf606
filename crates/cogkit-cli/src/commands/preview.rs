//! The `preview` command.
//!
//! Shows the channel names a template would produce for the first few
//! duplicate channels.

use async_trait::async_trait;
use cogkit_core::{CogError, CogResult, Settings};
use cogkit_template::{Context, Engine};

use super::{context_arg, parse_context, required_str, template_arg};
use crate::command::ManagementCommand;

/// Renders a template several times with increasing `dupenum`.
pub struct PreviewCommand;

/// Renders `count` previews of `source`.
pub fn preview_template(
    settings: &Settings,
    source: &str,
    context: &Context,
    count: usize,
) -> CogResult<Vec<String>> {
    let engine = Engine::from_settings(&settings.template);
    Ok(engine.render_previews(source, context, count)?)
}

#[async_trait]
impl ManagementCommand for PreviewCommand {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn help(&self) -> &'static str {
        "Render example outputs of a template"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(template_arg()).arg(context_arg()).arg(
            clap::Arg::new("count")
                .long("count")
                .short('n')
                .value_name("N")
                .default_value("3")
                .value_parser(clap::value_parser!(usize))
                .help("Number of previews"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), CogError> {
        let source = required_str(matches, "template")?;
        let context = parse_context(matches.get_one::<String>("context").map(String::as_str))?;
        let count = matches.get_one::<usize>("count").copied().unwrap_or(3);

        let previews = preview_template(settings, source, &context, count)?;
        for (i, preview) in previews.iter().enumerate() {
            println!("{}. {preview}", i + 1);
        }
        Ok(())
    }
}
