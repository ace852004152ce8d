//! Filesystem-related commands.

use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

use super::CommandOutput;
use crate::{
    commands::{Command, CommandCategory},
    context::Context,
};

pub fn get_commands() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(Cd),
        Box::new(Pwd),
        Box::new(Ls),
        Box::new(Cp),
        Box::new(Mkdir),
    ]
}

fn resolve(ctx: &Arc<RwLock<Context>>, path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    // TODO: fix error handling
    let ctx = ctx.read().unwrap();
    Ok(ctx.get_dir().join(path))
}

/// Change directory.
#[derive(Default)]
pub struct Cd;

#[async_trait]
impl Command for Cd {
    fn get_name(&self) -> &'static str {
        "cd"
    }

    fn get_short_desc(&self) -> &'static str {
        "change directory"
    }

    fn get_category(&self) -> CommandCategory {
        CommandCategory::FilesystemManipulation
    }

    async fn execute(&self, ctx: Arc<RwLock<Context>>, args: Vec<String>) -> Result<CommandOutput> {
        if args.len() != 1 {
            return Err(anyhow!("Exactly one argument supported for cd"));
        }

        let path = resolve(&ctx, PathBuf::from(&args[0]))?;

        if !path.is_dir() {
            return Err(anyhow!("No access or directory does not exist"));
        }

        // TODO: fix error handling
        let mut ctx = ctx.write().unwrap();
        ctx.change_dir(path.clone());

        Ok(CommandOutput::Text(path.to_string_lossy().into_owned()))
    }
}

/// Print contents of the directory.
#[derive(Default)]
pub struct Ls;

impl Ls {
    fn get_dir_contents(path: PathBuf) -> Result<Vec<String>> {
        let dir_entries = match path.read_dir() {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Failed to read directory contents: {:?}", e);
                return Err(e.into());
            },
        };

        let out = dir_entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();

        Ok(out)
    }
}

/// Print current directory.
#[derive(Default)]
pub struct Pwd;

#[async_trait]
impl Command for Ls {
    fn get_name(&self) -> &'static str {
        "ls"
    }

    fn get_short_desc(&self) -> &'static str {
        "list directory contents"
    }

    fn get_category(&self) -> CommandCategory {
        CommandCategory::FilesystemManipulation
    }

    async fn execute(&self, ctx: Arc<RwLock<Context>>, args: Vec<String>) -> Result<CommandOutput> {
        if args.len() > 1 {
            return Err(anyhow!("Only one argument supported for ls"));
        }

        let path = match args.first() {
            Some(arg) => resolve(&ctx, PathBuf::from(arg))?,
            None => {
                // TODO: fix error handling
                let ctx = ctx.read().unwrap();
                ctx.get_dir()
            },
        };

        if !path.is_dir() {
            return Err(anyhow!("No access or directory does not exist"));
        }

        Ok(CommandOutput::ListText(Ls::get_dir_contents(path)?))
    }
}

#[async_trait]
impl Command for Pwd {
    fn get_name(&self) -> &'static str {
        "pwd"
    }

    fn get_short_desc(&self) -> &'static str {
        "print working directory"
    }

    fn get_category(&self) -> CommandCategory {
        CommandCategory::FilesystemManipulation
    }

    async fn execute(&self, ctx: Arc<RwLock<Context>>, args: Vec<String>) -> Result<CommandOutput> {
        if !args.is_empty() {
            return Err(anyhow!("No arguments supported for pwd"));
        }

        // TODO: fix error handling
        let ctx = ctx.read().unwrap();
        let wd = ctx.get_dir();

        Ok(CommandOutput::Text(wd.to_string_lossy().into_owned()))
    }
}

/// Copy a file.
#[derive(Default)]
pub struct Cp;

#[async_trait]
impl Command for Cp {
    fn get_name(&self) -> &'static str {
        "cp"
    }

    fn get_short_desc(&self) -> &'static str {
        "copy file"
    }

    fn get_category(&self) -> CommandCategory {
        CommandCategory::FilesystemManipulation
    }

    async fn execute(&self, ctx: Arc<RwLock<Context>>, args: Vec<String>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(anyhow!("No source or destination specified"));
        }

        let source = resolve(&ctx, PathBuf::from(&args[0]))?;
        let destination = resolve(&ctx, PathBuf::from(&args[1]))?;

        if std::fs::copy(&source, &destination).is_err() {
            return Err(anyhow!(
                "Could not copy file '{}' to '{}'",
                args[0],
                args[1]
            ));
        }

        Ok(CommandOutput::Text(format!(
            "Successfully copied '{}' to '{}'",
            args[0], args[1]
        )))
    }
}

/// Create a directory.
#[derive(Default)]
pub struct Mkdir;

#[async_trait]
impl Command for Mkdir {
    fn get_name(&self) -> &'static str {
        "mkdir"
    }

    fn get_short_desc(&self) -> &'static str {
        "create directory"
    }

    fn get_category(&self) -> CommandCategory {
        CommandCategory::FilesystemManipulation
    }

    async fn execute(&self, ctx: Arc<RwLock<Context>>, args: Vec<String>) -> Result<CommandOutput> {
        if args.len() != 1 {
            return Err(anyhow!("No directory specified"));
        }

        let path = resolve(&ctx, PathBuf::from(&args[0]))?;

        if std::fs::create_dir(&path).is_err() {
            return Err(anyhow!("Could not create directory '{}'", args[0]));
        }

        Ok(CommandOutput::Text(format!(
            "Successfully created directory '{}'",
            args[0]
        )))
    }
}
