use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use berth_core::{
    ParameterValues,
    params::{apply_parameters, resolve_values},
};
use berth_model::StackDeclaration;
use tracing::{debug, instrument};

use crate::{
    error::ConfigError,
    overrides::{self, Overrides},
};

/// Environment variable lookup used for parameter overrides.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A declaration read from disk with its parameters applied.
#[derive(Debug, Clone)]
pub struct LoadedDeclaration {
    pub source: PathBuf,
    /// Declaration as written, `${name}` references intact.
    pub raw: StackDeclaration,
    pub parameters: ParameterValues,
    /// Declaration with every reference substituted.
    pub declaration: StackDeclaration,
}

/// Reads declarations and resolves parameters as override, then environment, then default.
#[derive(Clone)]
pub struct Loader {
    overrides: Overrides,
    env: EnvLookup,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Loader reading the process environment.
    pub fn new() -> Self {
        Self {
            overrides: Overrides::new(),
            env: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the environment lookup.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }

    /// Ignore the environment entirely.
    pub fn without_env(self) -> Self {
        self.with_env(|_| None)
    }

    /// Add `name=value` overrides.
    pub fn with_overrides<I, S>(mut self, raw: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (name, value) in overrides::collect(raw)? {
            if self.overrides.insert(name.clone(), value).is_some() {
                return Err(ConfigError::DuplicateOverride(name));
            }
        }
        Ok(self)
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedDeclaration, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&contents, path)
    }

    /// Parse `contents` as if read from `origin`.
    pub fn load_str(
        &self,
        contents: &str,
        origin: impl AsRef<Path>,
    ) -> Result<LoadedDeclaration, ConfigError> {
        let origin = origin.as_ref();
        let raw: StackDeclaration =
            toml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;

        let param_err = |source| ConfigError::Param {
            path: origin.to_path_buf(),
            source,
        };
        let parameters = resolve_values(&raw.parameters, &self.overrides, |k| (*self.env)(k))
            .map_err(param_err)?;
        let declaration = apply_parameters(&raw, &parameters).map_err(param_err)?;

        debug!(
            stack = %declaration.stack.name,
            units = declaration.task.units.len(),
            parameters = parameters.len(),
            "declaration loaded"
        );
        Ok(LoadedDeclaration {
            source: origin.to_path_buf(),
            raw,
            parameters,
            declaration,
        })
    }
}
