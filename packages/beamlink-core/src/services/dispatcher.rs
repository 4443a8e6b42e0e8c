//! Caller-facing command entry point.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::command::{CastCommand, CommandReply};
use crate::error::{CastError, CastResult};
use crate::utils::platform_version;

use super::orchestrator::Inbound;

/// Cloneable handle that routes named commands to the orchestrator.
///
/// Argument validation happens here, on the caller's task, so malformed
/// commands never reach the orchestrator or any collaborator.
#[derive(Clone)]
pub struct CastDispatcher {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl CastDispatcher {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { tx }
    }

    /// Parses and executes the command `name` with its argument map.
    ///
    /// Resolves exactly once, with either a typed reply or a [`CastError`].
    pub async fn dispatch(&self, name: &str, args: &Value) -> CastResult<CommandReply> {
        let command = CastCommand::parse(name, args).map_err(|e| {
            log::debug!("[Dispatcher] Rejected {}: {}", name, e);
            e
        })?;
        self.execute(command).await
    }

    /// Executes an already parsed command.
    pub async fn execute(&self, command: CastCommand) -> CastResult<CommandReply> {
        // Stateless; answered without a round trip.
        if command == CastCommand::GetPlatformVersion {
            return Ok(CommandReply::Text(platform_version()));
        }

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Inbound::Command { command, reply })
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())?
    }

    /// Resolves once the orchestrator has stopped accepting commands.
    pub async fn stopped(&self) {
        self.tx.closed().await;
    }

    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }
}

fn stopped() -> CastError {
    CastError::Internal("orchestrator stopped".to_string())
}
