use crate::cache::DiskCache;
use crate::model::{ResourceKind, ResourceRecord};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {status}, stderr: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("cache invalidation failed: {0}")]
    Cache(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectorAction {
    Pause,
    Resume,
    Restart,
}

impl ConnectorAction {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Restart => "restart",
        }
    }
}

/// Program plus any fixed leading arguments, e.g. `docker exec broker kafkactl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    leading_args: Vec<String>,
}

impl ToolCommand {
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            leading_args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[derive(Debug, Clone)]
pub struct ResourceClient {
    tool: ToolCommand,
    cache: Option<DiskCache>,
    refresh_interval: Duration,
}

impl ResourceClient {
    pub fn new(tool: ToolCommand, cache: Option<DiskCache>, refresh_interval: Duration) -> Self {
        Self {
            tool,
            cache,
            refresh_interval,
        }
    }

    /// Client whose cache entries belong to `context` only.
    pub fn with_scope(&self, context: &str) -> Self {
        Self {
            tool: self.tool.clone(),
            cache: self.cache.as_ref().map(|cache| cache.scoped(context)),
            refresh_interval: self.refresh_interval,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub async fn fetch(
        &self,
        kind: ResourceKind,
        args: &[String],
        force: bool,
    ) -> Result<Vec<ResourceRecord>, ClientError> {
        let payload = self.fetch_payload(kind, args, force).await?;
        Ok(decode_documents(&payload))
    }

    /// Read-through/write-through fetch of the raw YAML output.
    pub async fn fetch_payload(
        &self,
        kind: ResourceKind,
        args: &[String],
        force: bool,
    ) -> Result<Vec<u8>, ClientError> {
        let kind_name = kind.cli_name();
        if !force
            && let Some(cache) = &self.cache
            && let Some(payload) = cache.get(kind_name, args, self.refresh_interval)
        {
            debug!(
                "cache hit for {kind_name} {args:?}, age {:?}",
                cache.age(kind_name, args).unwrap_or_default()
            );
            return Ok(payload);
        }

        let mut command_args = vec!["get".to_string(), kind_name.to_string()];
        command_args.extend(args.iter().cloned());
        command_args.extend(["-o".to_string(), "yaml".to_string()]);
        let payload = self.execute(&command_args).await?;

        if let Some(cache) = &self.cache
            && let Err(error) = cache.set(kind_name, args, &payload)
        {
            warn!("failed to cache {kind_name} {args:?}: {error}");
        }

        Ok(payload)
    }

    /// Runs the tool once, uncached, returning stdout on a zero exit.
    pub async fn execute(&self, args: &[String]) -> Result<Vec<u8>, ClientError> {
        debug!("exec {} {}", self.tool.program, args.join(" "));
        let output = TokioCommand::new(&self.tool.program)
            .args(&self.tool.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ClientError::Spawn {
                program: self.tool.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("{} exited with {}: {stderr}", self.tool.program, output.status);
            return Err(ClientError::CommandFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(output.stdout)
    }

    pub async fn resource_yaml(&self, kind: ResourceKind, name: &str) -> Result<String, ClientError> {
        let args = [
            "get".to_string(),
            kind.cli_name().to_string(),
            name.to_string(),
            "-o".to_string(),
            "yaml".to_string(),
        ];
        let output = self.execute(&args).await?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    pub async fn connector_action(
        &self,
        action: ConnectorAction,
        name: &str,
    ) -> Result<String, ClientError> {
        let args = [
            "connector".to_string(),
            action.verb().to_string(),
            name.to_string(),
        ];
        let output = self.execute(&args).await?;

        if let Some(cache) = &self.cache
            && let Err(error) = cache.invalidate(ResourceKind::Connectors.cli_name(), &[])
        {
            warn!("failed to drop cached connectors after {}: {error}", action.verb());
        }

        Ok(String::from_utf8_lossy(&output).trim().to_string())
    }

    pub fn invalidate_cache(&self) -> Result<(), ClientError> {
        match &self.cache {
            Some(cache) => cache.invalidate_all().map_err(ClientError::Cache),
            None => Ok(()),
        }
    }
}

/// Splits a multi-document payload and keeps every document that decodes to a mapping.
pub fn decode_documents(payload: &[u8]) -> Vec<ResourceRecord> {
    let text = String::from_utf8_lossy(payload);
    let mut records = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim_end() == "---" {
            push_document(&current, &mut records);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_document(&current, &mut records);

    records
}

fn push_document(document: &str, records: &mut Vec<ResourceRecord>) {
    if document.trim().is_empty() {
        return;
    }

    match serde_yaml::from_str::<serde_yaml::Value>(document) {
        Ok(value) => match ResourceRecord::from_value(value) {
            Some(record) => records.push(record),
            None => debug!("skipping non-mapping document"),
        },
        Err(error) => debug!("skipping undecodable document: {error}"),
    }
}
