//! Context data of agent shell.

use std::{env::current_dir, path::PathBuf};

/// Context for [BurrowAgent](crate::BurrowAgent) built-in commands.
#[derive(Default)]
pub struct Context {
    current_dir: PathBuf,
}

impl Context {
    pub fn new() -> Self {
        Context {
            current_dir: current_dir().unwrap_or_default(),
        }
    }

    pub fn starting_in(mut self, dir: PathBuf) -> Self {
        self.current_dir = dir;
        self
    }

    pub fn get_dir(&self) -> PathBuf {
        self.current_dir.clone()
    }

    pub fn change_dir(&mut self, path: PathBuf) {
        self.current_dir = path;
    }
}
