//! MiniJinja environment with the dashboard's templates compiled in.

use super::compose;
use minijinja::Environment;
use serde::Serialize;

pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_debug(cfg!(debug_assertions));

        env.add_template("base.html", include_str!("../../templates/base.html"))?;
        env.add_template("index.html", include_str!("../../templates/index.html"))?;
        env.add_template("result.html", include_str!("../../templates/result.html"))?;
        env.add_template("logs.html", include_str!("../../templates/logs.html"))?;

        env.add_filter("clip", clip);

        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}

fn clip(value: String, max: usize) -> String {
    compose::clip(&value, max)
}
