//! Preview generation for template authors.
//!
//! When someone sets a channel-name template, the bot shows what the first
//! few channels would be called. Previews render the template once per
//! channel number (`dupenum = 1..=count`) with a single shared random seed,
//! so every preview in a set makes the same random choices and only the
//! numbering differs.

use std::sync::Arc;

use cogkit_core::error::RenderError;

use crate::context::{Context, ContextValue, RANDOM_SEED_KEY};
use crate::engine::Engine;

/// The context key previews number.
pub const DUPENUM_KEY: &str = "dupenum";

impl Engine {
    /// Renders `count` previews of a template.
    ///
    /// The template is compiled once. Each preview gets its own render budget.
    /// The context's `random_seed` is reused when present; otherwise one seed
    /// is drawn for the whole set.
    pub fn render_previews(
        &self,
        source: &str,
        context: &Context,
        count: usize,
    ) -> Result<Vec<String>, RenderError> {
        let template = self.compile(source)?;
        let seed = shared_seed(context);
        let budget = self.settings().render_timeout();

        (1..=count)
            .map(|dupenum| {
                let ctx = context
                    .clone()
                    .with(DUPENUM_KEY, dupenum)
                    .with(RANDOM_SEED_KEY, seed.clone());
                self.render_compiled(Arc::clone(&template), &ctx, budget)
            })
            .collect()
    }
}

fn shared_seed(context: &Context) -> ContextValue {
    context
        .random_seed()
        .cloned()
        .unwrap_or_else(|| ContextValue::Integer(rand::random()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED: &str = "{{ username }}{% if dupenum > 1 %} ({{ dupenum }}){% endif %}";
    const RANDOM: &str =
        "{{ ['red', 'green', 'blue', 'amber', 'violet', 'teal'] | random }} {{ dupenum }}";

    #[test]
    fn test_previews_number_channels() {
        let ctx = Context::new().with("username", "alice");
        let previews = Engine::new().render_previews(NAMED, &ctx, 3).unwrap();
        assert_eq!(previews, vec!["alice", "alice (2)", "alice (3)"]);
    }

    #[test]
    fn test_previews_share_random_choices() {
        let previews = Engine::new().render_previews(RANDOM, &Context::new(), 4).unwrap();
        let colours: Vec<&str> = previews.iter().map(|p| p.split(' ').next().unwrap()).collect();
        assert!(colours.iter().all(|c| *c == colours[0]));
    }

    #[test]
    fn test_previews_reproduce_with_seed() {
        let ctx = Context::new().with("random_seed", "session-7");
        let engine = Engine::new();
        let first = engine.render_previews(RANDOM, &ctx, 3).unwrap();
        let second = engine.render_previews(RANDOM, &ctx, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_previews() {
        assert!(Engine::new().render_previews(NAMED, &Context::new(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_previews_report_syntax_errors() {
        let err = Engine::new().render_previews("{% if %}", &Context::new(), 2).unwrap_err();
        assert!(matches!(err, RenderError::Syntax { .. }));
    }
}
