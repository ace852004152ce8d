use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::{
    commands::{Command, CommandCategory, CommandOutput},
    context::Context,
};

/// Get username of owner of the process.
#[derive(Default)]
pub struct Whoami;

#[async_trait]
impl Command for Whoami {
    fn get_name(&self) -> &'static str {
        "whoami"
    }

    fn get_short_desc(&self) -> &'static str {
        "get process owner's username"
    }

    fn get_category(&self) -> CommandCategory {
        CommandCategory::Permissions
    }

    async fn execute(
        &self,
        _ctx: Arc<RwLock<Context>>,
        _args: Vec<String>,
    ) -> anyhow::Result<CommandOutput> {
        let host = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string());
        let output = format!("{}@{}", whoami::username(), host);
        Ok(CommandOutput::Text(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_user_at_host() {
        let ctx = Arc::new(RwLock::new(Context::new()));
        let output = Whoami.execute(ctx, vec![]).await.unwrap();
        let CommandOutput::Text(text) = output else {
            panic!("expected text");
        };
        assert!(text.contains('@'));
    }
}
