//! Agent identity providers
//!
//! Binaries resolve the active agent once through a provider and pass the
//! resulting `AgentId` explicitly to every store, client and panel call.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::knowledge::AgentId;
use crate::validation;

/// Source of the active agent identity
pub trait AgentIdentityProvider: Send + Sync {
    /// The active agent id; stable across calls
    fn agent_id(&self) -> &AgentId;
}

/// A fixed, caller-supplied identity
#[derive(Debug, Clone)]
pub struct StaticIdentity(AgentId);

impl StaticIdentity {
    pub fn new(agent: AgentId) -> Self {
        Self(agent)
    }
}

impl AgentIdentityProvider for StaticIdentity {
    fn agent_id(&self) -> &AgentId {
        &self.0
    }
}

/// Identity persisted in a file: created on first use, stable thereafter
#[derive(Debug, Clone)]
pub struct FileIdentity {
    path: PathBuf,
    agent: AgentId,
}

impl FileIdentity {
    /// Read the agent id stored at `path`, generating and writing a new one
    /// when the file does not exist yet
    pub fn load_or_create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        match fs::read_to_string(&path) {
            Ok(raw) => {
                let agent = validation::validate_agent_id(raw.trim())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
                tracing::debug!(path = ?path, agent_id = %agent, "Loaded agent identity");
                Ok(Self { path, agent })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let agent = AgentId::new(format!("agent-{}", uuid::Uuid::new_v4().simple()));
                fs::write(&path, agent.as_str())?;
                tracing::info!(path = ?path, agent_id = %agent, "Created agent identity");
                Ok(Self { path, agent })
            }
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AgentIdentityProvider for FileIdentity {
    fn agent_id(&self) -> &AgentId {
        &self.agent
    }
}
