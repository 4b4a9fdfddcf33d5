//! MCP control surface using rmcp.
//!
//! Exposes each operator action as an MCP tool. Tools target the configured
//! server host and a port from the configured allow-list, send one command,
//! and return `{"success": .., "response": ..}` as the tool output.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::transport::stdio;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::actions::Action;
use crate::command::CommandBatch;
use crate::config::Config;
use crate::transport::CommandSender;

/// MCP server that forwards operator actions to game servers.
#[derive(Clone)]
pub struct ControlServer<S: Clone> {
    config: Arc<Config>,
    sender: Arc<S>,
    tool_router: ToolRouter<Self>,
}

/// Parameters for actions that take no arguments.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TargetParams {
    /// Game server port; defaults to the first allowed port.
    #[schemars(description = "Game server remote command port (optional, must be allow-listed)")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChatParams {
    #[schemars(description = "Message to broadcast in game chat")]
    pub message: String,
    #[schemars(description = "Game server remote command port (optional, must be allow-listed)")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReloadConfigParams {
    #[schemars(description = "Config file to load instead of the current one (optional)")]
    pub path: Option<String>,
    #[schemars(description = "Game server remote command port (optional, must be allow-listed)")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TimeRemainingParams {
    #[schemars(description = "Seconds left in the current mission")]
    pub time: f64,
    #[schemars(description = "Game server remote command port (optional, must be allow-listed)")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NextMissionParams {
    #[schemars(description = "Mission group")]
    pub group: String,
    #[schemars(description = "Mission name")]
    pub name: String,
    #[schemars(description = "Maximum mission time in seconds")]
    pub max_time: f64,
    #[schemars(description = "Game server remote command port (optional, must be allow-listed)")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct KickParams {
    #[schemars(description = "Steam ID of the player")]
    pub steam_id: String,
    #[schemars(description = "Also ban the player (default false)")]
    #[serde(default)]
    pub ban: bool,
    #[schemars(description = "Game server remote command port (optional, must be allow-listed)")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BanlistAddParams {
    #[schemars(description = "Steam ID to ban")]
    pub steam_id: String,
    #[schemars(description = "Append to the ban list file as well (default false)")]
    #[serde(default)]
    pub append: bool,
    #[schemars(description = "Game server remote command port (optional, must be allow-listed)")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BanlistRemoveParams {
    #[schemars(description = "Steam ID to unban")]
    pub steam_id: String,
    #[schemars(description = "Remove from the ban list file as well (default false)")]
    #[serde(default)]
    pub remove: bool,
    #[schemars(description = "Game server remote command port (optional, must be allow-listed)")]
    pub port: Option<u16>,
}

#[tool_router]
impl<S: CommandSender + Clone + 'static> ControlServer<S> {
    /// Create a new control server.
    pub fn new(config: Config, sender: S) -> Self {
        Self {
            config: Arc::new(config),
            sender: Arc::new(sender),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Tell the game server that a new build is ready")]
    async fn update_ready(
        &self,
        Parameters(p): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::UpdateReady).await
    }

    #[tool(description = "Broadcast a chat message to all players")]
    async fn send_chat_message(
        &self,
        Parameters(p): Parameters<ChatParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::SendChatMessage { message: p.message })
            .await
    }

    #[tool(description = "Reload the game server configuration")]
    async fn reload_config(
        &self,
        Parameters(p): Parameters<ReloadConfigParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::ReloadConfig { path: p.path }).await
    }

    #[tool(description = "Get the time remaining in the current mission")]
    async fn get_mission_time(
        &self,
        Parameters(p): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::GetMissionTime).await
    }

    #[tool(description = "Get the current mission")]
    async fn get_mission(
        &self,
        Parameters(p): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::GetMission).await
    }

    #[tool(description = "Set the time remaining in the current mission")]
    async fn set_time_remaining(
        &self,
        Parameters(p): Parameters<TimeRemainingParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::SetTimeRemaining { seconds: p.time })
            .await
    }

    #[tool(description = "Choose the mission that runs next")]
    async fn set_next_mission(
        &self,
        Parameters(p): Parameters<NextMissionParams>,
    ) -> Result<CallToolResult, McpError> {
        let action = Action::SetNextMission {
            group: p.group,
            name: p.name,
            max_time: p.max_time,
        };
        self.dispatch(p.port, action).await
    }

    #[tool(description = "Kick a player, optionally banning them")]
    async fn kick_player(
        &self,
        Parameters(p): Parameters<KickParams>,
    ) -> Result<CallToolResult, McpError> {
        let action = Action::KickPlayer {
            steam_id: p.steam_id,
            ban: p.ban,
        };
        self.dispatch(p.port, action).await
    }

    #[tool(description = "Clear the list of kicked players")]
    async fn clear_kicked_players(
        &self,
        Parameters(p): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::ClearKickedPlayers).await
    }

    #[tool(description = "Reload the ban list from disk")]
    async fn banlist_reload(
        &self,
        Parameters(p): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::BanlistReload).await
    }

    #[tool(description = "Add a Steam ID to the ban list")]
    async fn banlist_add(
        &self,
        Parameters(p): Parameters<BanlistAddParams>,
    ) -> Result<CallToolResult, McpError> {
        let action = Action::BanlistAdd {
            steam_id: p.steam_id,
            append: p.append,
        };
        self.dispatch(p.port, action).await
    }

    #[tool(description = "Remove a Steam ID from the ban list")]
    async fn banlist_remove(
        &self,
        Parameters(p): Parameters<BanlistRemoveParams>,
    ) -> Result<CallToolResult, McpError> {
        let action = Action::BanlistRemove {
            steam_id: p.steam_id,
            remove: p.remove,
        };
        self.dispatch(p.port, action).await
    }

    #[tool(description = "Clear the ban list")]
    async fn banlist_clear(
        &self,
        Parameters(p): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(p.port, Action::BanlistClear).await
    }
}

impl<S: CommandSender + Clone + 'static> ControlServer<S> {
    /// Validate the target and action, send it, and wrap the reply.
    async fn dispatch(&self, port: Option<u16>, action: Action) -> Result<CallToolResult, McpError> {
        let port = self
            .config
            .allowed_port(port)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let name = action.name();
        let command = action
            .into_command()
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        let host = &self.config.server_host;
        info!(command = %name, host = %host, port, "Sending command");

        match self
            .sender
            .send(host, port, &CommandBatch::single(command))
            .await
        {
            Ok(response) => {
                let success = response.is_success();
                let body = json!({ "success": success, "response": response });
                let content = vec![Content::text(body.to_string())];
                if success {
                    Ok(CallToolResult::success(content))
                } else {
                    Ok(CallToolResult::error(content))
                }
            }
            Err(e) => {
                error!(command = %name, error = %e, "Command failed");
                let body = json!({
                    "success": false,
                    "error": e.to_string(),
                    "retryable": e.is_retryable(),
                    "outcome_unknown": e.outcome_unknown(),
                });
                Ok(CallToolResult::error(vec![Content::text(body.to_string())]))
            }
        }
    }
}

#[tool_handler]
impl<S: CommandSender + Clone + 'static> ServerHandler for ControlServer<S> {
    fn get_info(&self) -> ServerInfo {
        let ports = &self.config.server_ports;

        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "server-commander".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Send operator commands to game servers on {}.\n\
                 Allowed ports: {ports:?} (default {}).\n\
                 Each tool returns {{\"success\": bool, \"response\": ...}}.",
                self.config.server_host,
                self.config.default_port(),
            )),
        }
    }
}

/// Serve the control surface over stdio.
pub async fn serve_stdio<S: CommandSender + Clone + 'static>(
    config: Config,
    sender: S,
) -> anyhow::Result<()> {
    let server = ControlServer::new(config, sender);

    info!("Starting MCP control server on stdio");

    let service = server
        .serve(stdio())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))?;

    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::command::Argument;
    use crate::error::Error;
    use crate::transport::{CommandResult, Response};

    /// Records every batch and answers with a canned outcome.
    #[derive(Clone)]
    struct MockSender {
        sent: Arc<Mutex<Vec<(u16, CommandBatch)>>>,
        reply: fn() -> crate::error::Result<Response>,
    }

    impl MockSender {
        fn replying(reply: fn() -> crate::error::Result<Response>) -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                reply,
            }
        }
    }

    #[async_trait]
    impl CommandSender for MockSender {
        async fn send(
            &self,
            _host: &str,
            port: u16,
            batch: &CommandBatch,
        ) -> crate::error::Result<Response> {
            self.sent.lock().unwrap().push((port, batch.clone()));
            (self.reply)()
        }
    }

    fn ok_reply() -> crate::error::Result<Response> {
        Ok(Response {
            results: vec![CommandResult::success(Some(json!(120.0)))],
        })
    }

    fn rejected_reply() -> crate::error::Result<Response> {
        Ok(Response {
            results: vec![CommandResult::error("unknown mission")],
        })
    }

    fn refused_reply() -> crate::error::Result<Response> {
        Err(Error::Connection {
            addr: "127.0.0.1:7779".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        })
    }

    fn test_config() -> Config {
        Config::from_json(r#"{"server_ports": [7779, 7780]}"#).unwrap()
    }

    #[tokio::test]
    async fn kick_player_sends_command() {
        let sender = MockSender::replying(ok_reply);
        let server = ControlServer::new(test_config(), sender.clone());

        let result = server
            .kick_player(Parameters(KickParams {
                steam_id: "76561198000000002".into(),
                ban: true,
                port: Some(7780),
            }))
            .await
            .unwrap();
        assert!(!result.is_error.unwrap_or(false));

        let sent = sender.sent.lock().unwrap();
        let (port, batch) = &sent[0];
        assert_eq!(*port, 7780);
        assert_eq!(batch.names(), vec!["kick-player"]);
        assert_eq!(
            batch.commands()[0].arguments(),
            &[Argument::String("76561198000000002".into()), Argument::Bool(true)]
        );
    }

    #[tokio::test]
    async fn default_port_is_first_allowed() {
        let sender = MockSender::replying(ok_reply);
        let server = ControlServer::new(test_config(), sender.clone());

        server
            .get_mission_time(Parameters(TargetParams { port: None }))
            .await
            .unwrap();
        assert_eq!(sender.sent.lock().unwrap()[0].0, 7779);
    }

    #[tokio::test]
    async fn disallowed_port_is_rejected_before_sending() {
        let sender = MockSender::replying(ok_reply);
        let server = ControlServer::new(test_config(), sender.clone());

        let result = server
            .banlist_clear(Parameters(TargetParams { port: Some(22) }))
            .await;
        assert!(result.is_err());
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_argument_is_invalid_params() {
        let sender = MockSender::replying(ok_reply);
        let server = ControlServer::new(test_config(), sender.clone());

        let result = server
            .send_chat_message(Parameters(ChatParams {
                message: String::new(),
                port: None,
            }))
            .await;
        assert!(result.is_err());
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_rejection_is_tool_error() {
        let server = ControlServer::new(test_config(), MockSender::replying(rejected_reply));

        let result = server
            .set_next_mission(Parameters(NextMissionParams {
                group: "PvE".into(),
                name: "Nowhere".into(),
                max_time: 600.0,
                port: None,
            }))
            .await
            .unwrap();
        assert!(result.is_error.unwrap_or(false));
    }

    #[tokio::test]
    async fn transport_failure_is_tool_error() {
        let server = ControlServer::new(test_config(), MockSender::replying(refused_reply));

        let result = server
            .update_ready(Parameters(TargetParams { port: None }))
            .await
            .unwrap();
        assert!(result.is_error.unwrap_or(false));
    }
}
