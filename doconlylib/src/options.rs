//! Options controlling which hooks run and which files they own.
//!
//! Options can be read from the environment, using the variables of the
//! GitHub action this tool grew out of:
//!
//! - `LDC_ENABLED_HOOKS`: comma separated hook names
//! - `LDC_HOOK_<NAME>__ALLOWED_FILES`: newline separated patterns

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hooks::{Hook, HookKind};
use crate::Result;

pub const ENABLED_HOOKS_VAR: &str = "LDC_ENABLED_HOOKS";
const HOOK_VAR_PREFIX: &str = "LDC_HOOK_";
const ALLOWED_FILES_OPTION: &str = "allowed_files";

/// Options for checking a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Hooks to run, in priority order
    pub hooks: Vec<HookKind>,
    /// Patterns replacing a hook's default patterns
    pub allowed_files: BTreeMap<HookKind, Vec<String>>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            hooks: HookKind::ALL.to_vec(),
            allowed_files: BTreeMap::new(),
        }
    }
}

impl CheckOptions {
    /// Create options with the default hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Read options from `(name, value)` pairs shaped like environment variables.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let mut options = Self::new();
        for (key, value) in vars {
            if key == ENABLED_HOOKS_VAR {
                options.hooks = parse_hook_list(&value)?;
                continue;
            }
            let Some(rest) = key.strip_prefix(HOOK_VAR_PREFIX) else {
                continue;
            };
            let rest = rest.to_lowercase();
            let Some((hook, option)) = rest.split_once("__") else {
                continue;
            };
            if option != ALLOWED_FILES_OPTION {
                tracing::debug!(%key, "ignoring unsupported hook option");
                continue;
            }
            let kind: HookKind = hook.parse()?;
            let patterns = value.lines().map(str::to_string).collect();
            options = options.with_allowed_files(kind, patterns);
        }
        Ok(options)
    }

    /// Builder: set the enabled hooks
    pub fn with_hooks(mut self, hooks: Vec<HookKind>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Builder: replace the patterns of a hook
    pub fn with_allowed_files(mut self, hook: HookKind, patterns: Vec<String>) -> Self {
        let patterns: Vec<String> = patterns
            .into_iter()
            .filter(|pattern| !pattern.trim().is_empty())
            .collect();
        if patterns.is_empty() {
            self.allowed_files.remove(&hook);
        } else {
            self.allowed_files.insert(hook, patterns);
        }
        self
    }

    /// Instantiate the enabled hooks with their patterns.
    pub fn build_hooks(&self) -> Result<Vec<Hook>> {
        self.hooks
            .iter()
            .map(|&kind| match self.allowed_files.get(&kind) {
                Some(patterns) => Hook::with_patterns(kind, patterns.as_slice()),
                None => Hook::new(kind),
            })
            .collect()
    }
}

/// Parse a comma separated list of hook names.
pub fn parse_hook_list(value: &str) -> Result<Vec<HookKind>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::parse)
        .collect()
}
