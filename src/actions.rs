//! The fixed set of operator actions the game server understands.
//!
//! Each action lowers to a single [`Command`] with its arguments in the
//! order the server expects.

use crate::command::{Argument, Command};
use crate::error::{Error, Result};

/// An operator action with its typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Tell the server a new build is available.
    UpdateReady,
    SendChatMessage { message: String },
    /// Reload server configuration, optionally from another path.
    ReloadConfig { path: Option<String> },
    GetMissionTime,
    GetMission,
    SetTimeRemaining { seconds: f64 },
    SetNextMission {
        group: String,
        name: String,
        max_time: f64,
    },
    KickPlayer { steam_id: String, ban: bool },
    ClearKickedPlayers,
    BanlistReload,
    BanlistAdd { steam_id: String, append: bool },
    BanlistRemove { steam_id: String, remove: bool },
    BanlistClear,
}

impl Action {
    /// Wire name of the command this action sends.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpdateReady => "update-ready",
            Self::SendChatMessage { .. } => "send-chat-message",
            Self::ReloadConfig { .. } => "reload-config",
            Self::GetMissionTime => "get-mission-time",
            Self::GetMission => "get-mission",
            Self::SetTimeRemaining { .. } => "set-time-remaining",
            Self::SetNextMission { .. } => "set-next-mission",
            Self::KickPlayer { .. } => "kick-player",
            Self::ClearKickedPlayers => "clear-kicked-players",
            Self::BanlistReload => "banlist-reload",
            Self::BanlistAdd { .. } => "banlist-add",
            Self::BanlistRemove { .. } => "banlist-remove",
            Self::BanlistClear => "banlist-clear",
        }
    }

    /// Validate parameters and build the command.
    pub fn into_command(self) -> Result<Command> {
        let name = self.name();
        let arguments: Vec<Argument> = match self {
            Self::UpdateReady
            | Self::GetMissionTime
            | Self::GetMission
            | Self::ClearKickedPlayers
            | Self::BanlistReload
            | Self::BanlistClear => Vec::new(),
            Self::SendChatMessage { message } => {
                vec![require("message", message)?.into()]
            }
            Self::ReloadConfig { path } => path
                .filter(|p| !p.is_empty())
                .map(|p| vec![p.into()])
                .unwrap_or_default(),
            Self::SetTimeRemaining { seconds } => vec![seconds.into()],
            Self::SetNextMission {
                group,
                name,
                max_time,
            } => {
                if max_time <= 0.0 {
                    return Err(Error::invalid("max_time must be positive"));
                }
                vec![
                    require("group", group)?.into(),
                    require("name", name)?.into(),
                    max_time.into(),
                ]
            }
            Self::KickPlayer { steam_id, ban } => {
                vec![require("steam_id", steam_id)?.into(), ban.into()]
            }
            Self::BanlistAdd { steam_id, append } => {
                vec![require("steam_id", steam_id)?.into(), append.into()]
            }
            Self::BanlistRemove { steam_id, remove } => {
                vec![require("steam_id", steam_id)?.into(), remove.into()]
            }
        };
        Command::new(name, arguments)
    }
}

fn require(field: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        Err(Error::invalid(format!("{field} not provided")))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_argument_actions() {
        for action in [
            Action::UpdateReady,
            Action::GetMissionTime,
            Action::GetMission,
            Action::ClearKickedPlayers,
            Action::BanlistReload,
            Action::BanlistClear,
        ] {
            let name = action.name();
            let cmd = action.into_command().unwrap();
            assert_eq!(cmd.name(), name);
            assert!(cmd.arguments().is_empty());
        }
    }

    #[test]
    fn kick_player_arguments() {
        let cmd = Action::KickPlayer {
            steam_id: "76561198000000001".into(),
            ban: true,
        }
        .into_command()
        .unwrap();
        assert_eq!(cmd.name(), "kick-player");
        assert_eq!(
            cmd.arguments(),
            &[Argument::String("76561198000000001".into()), Argument::Bool(true)]
        );
    }

    #[test]
    fn set_next_mission_argument_order() {
        let cmd = Action::SetNextMission {
            group: "PvP".into(),
            name: "Terminal Control".into(),
            max_time: 3600.0,
        }
        .into_command()
        .unwrap();
        assert_eq!(
            cmd.arguments(),
            &[
                Argument::String("PvP".into()),
                Argument::String("Terminal Control".into()),
                Argument::Float(3600.0),
            ]
        );
    }

    #[test]
    fn set_next_mission_requires_everything() {
        let missing_group = Action::SetNextMission {
            group: String::new(),
            name: "x".into(),
            max_time: 10.0,
        };
        assert!(matches!(missing_group.into_command(), Err(Error::InvalidCommand(_))));

        let zero_time = Action::SetNextMission {
            group: "g".into(),
            name: "x".into(),
            max_time: 0.0,
        };
        assert!(zero_time.into_command().is_err());
    }

    #[test]
    fn blank_chat_message_rejected() {
        let err = Action::SendChatMessage {
            message: "   ".into(),
        }
        .into_command()
        .unwrap_err();
        assert!(err.to_string().contains("message not provided"));
    }

    #[test]
    fn reload_config_path_is_optional() {
        let bare = Action::ReloadConfig { path: None }.into_command().unwrap();
        assert!(bare.arguments().is_empty());

        let empty = Action::ReloadConfig {
            path: Some(String::new()),
        }
        .into_command()
        .unwrap();
        assert!(empty.arguments().is_empty());

        let with_path = Action::ReloadConfig {
            path: Some("DedicatedServerConfig.json".into()),
        }
        .into_command()
        .unwrap();
        assert_eq!(with_path.arguments().len(), 1);
    }

    #[test]
    fn banlist_flags_default_positionally() {
        let add = Action::BanlistAdd {
            steam_id: "1".into(),
            append: false,
        }
        .into_command()
        .unwrap();
        assert_eq!(add.arguments()[1], Argument::Bool(false));

        let remove = Action::BanlistRemove {
            steam_id: String::new(),
            remove: true,
        };
        assert!(remove.into_command().is_err());
    }

    #[test]
    fn non_finite_time_rejected() {
        let err = Action::SetTimeRemaining { seconds: f64::NAN }
            .into_command()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_)));
    }
}
