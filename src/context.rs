use crate::config::{Config, ConfigError};
use std::path::PathBuf;
use tracing::info;

/// What the header shows about the active context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSummary {
    pub name: String,
    pub namespace: String,
    pub api: String,
}

#[derive(Debug)]
pub struct ContextManager {
    config: Config,
    path: PathBuf,
}

impl ContextManager {
    /// Fails when the configured current context does not exist.
    pub fn new(config: Config, path: PathBuf) -> Result<Self, ConfigError> {
        config.current_context()?;
        Ok(Self { config, path })
    }

    pub fn list_contexts(&self) -> Vec<String> {
        self.config
            .contexts
            .iter()
            .map(|context| context.name.clone())
            .collect()
    }

    pub fn current_name(&self) -> &str {
        &self.config.current_context
    }

    pub fn summary(&self) -> ContextSummary {
        match self.config.current_context() {
            Ok(context) => ContextSummary {
                name: context.name.clone(),
                namespace: context.context.namespace.clone(),
                api: context.context.api.clone(),
            },
            Err(_) => ContextSummary {
                name: self.config.current_context.clone(),
                ..ContextSummary::default()
            },
        }
    }

    pub fn switch_context(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.config.contexts.iter().any(|context| context.name == name) {
            return Err(ConfigError::UnknownContext(name.to_string()));
        }

        let previous = std::mem::replace(&mut self.config.current_context, name.to_string());
        if let Err(error) = self.config.save_to(&self.path) {
            self.config.current_context = previous;
            return Err(error);
        }
        info!("switched to context {name}");
        Ok(())
    }

    pub fn set_namespace(&mut self, namespace: &str) -> Result<(), ConfigError> {
        let context = self.config.current_context_mut()?;
        let previous = std::mem::replace(&mut context.context.namespace, namespace.to_string());
        if let Err(error) = self.config.save_to(&self.path) {
            if let Ok(context) = self.config.current_context_mut() {
                context.context.namespace = previous;
            }
            return Err(error);
        }
        info!("namespace set to {namespace}");
        Ok(())
    }
}
