//! Path resolution for FILEOPEN.
//!
//! The programmer only sends a prompt; choosing the actual file is up to the
//! operator at the host. [`DialogResolver`] asks on the terminal,
//! [`FixedResolver`] always answers the same path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dialoguer::Input;
use tracing::warn;

use crate::error::{HostError, HostResult};
use crate::report::sanitize_for_display;

/// Turns a prompt from the programmer into a host path.
pub trait PathResolver {
    /// Produce a path for `prompt`. When `must_exist` is set the returned path
    /// exists. May block for as long as the operator takes.
    fn resolve(&mut self, prompt: &str, must_exist: bool) -> HostResult<PathBuf>;
}

/// Asks the operator on the controlling terminal.
///
/// Re-prompts until an acceptable path is given. Once the shutdown flag is
/// raised the resolver stops prompting and fails, so Ctrl-C at the prompt
/// ends the session instead of being typed into the answer.
#[derive(Debug, Default, Clone)]
pub struct DialogResolver {
    start_dir: Option<PathBuf>,
    shutdown: Arc<AtomicBool>,
}

impl DialogResolver {
    /// Create a resolver; `start_dir` pre-fills the answer.
    pub fn new(start_dir: Option<PathBuf>) -> Self {
        DialogResolver {
            start_dir,
            shutdown: Arc::default(),
        }
    }

    /// Stop prompting once `shutdown` is raised.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn check_shutdown(&self) -> HostResult<()> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(HostError::Resolve("interrupted at the path prompt".into()));
        }
        Ok(())
    }

    fn initial_text(&self) -> String {
        match &self.start_dir {
            Some(dir) => {
                let mut text = dir.display().to_string();
                if !text.ends_with(std::path::MAIN_SEPARATOR) {
                    text.push(std::path::MAIN_SEPARATOR);
                }
                text
            }
            None => String::new(),
        }
    }
}

impl PathResolver for DialogResolver {
    fn resolve(&mut self, prompt: &str, must_exist: bool) -> HostResult<PathBuf> {
        let title = sanitize_for_display(prompt);

        loop {
            self.check_shutdown()?;
            let answer: String = match Input::new()
                .with_prompt(&title)
                .with_initial_text(self.initial_text())
                .interact_text()
            {
                Ok(answer) => answer,
                Err(e) => {
                    self.check_shutdown()?;
                    return Err(HostError::Resolve(e.to_string()));
                }
            };
            self.check_shutdown()?;

            let path = PathBuf::from(answer.trim());
            if path_satisfies(&path, must_exist) {
                return Ok(path);
            }
            warn!("{} does not exist, choose another file", path.display());
        }
    }
}

/// Always answers one configured path.
#[derive(Debug, Clone)]
pub struct FixedResolver {
    path: PathBuf,
}

impl FixedResolver {
    /// Create a resolver for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FixedResolver { path: path.into() }
    }
}

impl PathResolver for FixedResolver {
    fn resolve(&mut self, _prompt: &str, must_exist: bool) -> HostResult<PathBuf> {
        if !path_satisfies(&self.path, must_exist) {
            return Err(HostError::Resolve(format!(
                "{} does not exist",
                self.path.display()
            )));
        }
        Ok(self.path.clone())
    }
}

fn path_satisfies(path: &Path, must_exist: bool) -> bool {
    !path.as_os_str().is_empty() && (!must_exist || path.exists())
}
