//! Implementations of commands used in the agent.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use anyhow::Result;
use async_trait::async_trait;

use crate::{commands::perms::Whoami, context::Context};

pub mod filesystem;
pub mod perms;

/// Command categories used for pretty-printing.
#[derive(Debug)]
pub enum CommandCategory {
    Misc,
    FilesystemManipulation,
    Permissions,
}

/// Possible output types of the command execution.
#[derive(Debug)]
pub enum CommandOutput {
    Nothing,
    Text(String),
    ListText(Vec<String>),
}

impl CommandOutput {
    fn into_text(self) -> String {
        match self {
            CommandOutput::Nothing => String::new(),
            CommandOutput::Text(text) => text,
            CommandOutput::ListText(items) => items.join("\n"),
        }
    }
}

/// General interface for built-in commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Gets name of the command used as the tasking keyword.
    fn get_name(&self) -> &'static str;

    /// Gets one line description of the command.
    fn get_short_desc(&self) -> &'static str;

    /// Gets category of the command.
    fn get_category(&self) -> CommandCategory;

    /// Executes the command.
    async fn execute(&self, ctx: Arc<RwLock<Context>>, args: Vec<String>) -> Result<CommandOutput>;
}

/// Command manager.
#[derive(Default)]
pub struct Commands {
    commands: HashMap<String, Box<dyn Command>>,
}

impl Commands {
    pub fn new() -> Self {
        Self {
            commands: Self::get_commands(),
        }
    }

    fn get_commands() -> HashMap<String, Box<dyn Command>> {
        let mut commands: Vec<Box<dyn Command>> = vec![Box::new(Whoami)];
        commands.extend(filesystem::get_commands());

        commands
            .into_iter()
            .map(|c| (c.get_name().into(), c))
            .collect()
    }

    pub fn get_command(&self, key: &str) -> Option<&dyn Command> {
        self.commands.get(key).map(Box::as_ref)
    }

    pub fn get_supported_commands(&self) -> Vec<(String, String)> {
        self.commands
            .iter()
            .map(|(key, cmd)| (key.clone(), cmd.get_short_desc().to_string()))
            .collect()
    }

    /// Runs one tasking line and renders its outcome as result text.
    ///
    /// Never fails upward: unknown commands and execution errors come back
    /// as `Error: ...` strings for the controller.
    pub async fn dispatch(&self, line: &str, ctx: Arc<RwLock<Context>>) -> String {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return "Error: Empty command".to_string();
        };
        let args: Vec<String> = parts.map(Into::into).collect();

        let Some(command) = self.get_command(name) else {
            return format!("Error: Unknown command '{name}'");
        };

        match command.execute(ctx, args).await {
            Ok(output) => output.into_text(),
            Err(e) => format!("Error: {e}"),
        }
    }
}
