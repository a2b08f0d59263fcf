//! Delivery channel names.
//!
//! The string constants match the `{channel}` path segment of the queue
//! monitoring API and the keys of the per-type preference flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// In-app notification stored in the ledger and pushed over WebSocket.
pub const CHANNEL_IN_APP: &str = "in_app";

/// Email notification delivered via the SMTP collaborator.
pub const CHANNEL_EMAIL: &str = "email";

/// Push notification delivered via the push gateway collaborator.
pub const CHANNEL_PUSH: &str = "push";

/// A delivery mechanism for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Push,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::InApp, Channel::Email, Channel::Push];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::InApp => CHANNEL_IN_APP,
            Channel::Email => CHANNEL_EMAIL,
            Channel::Push => CHANNEL_PUSH,
        }
    }

    /// Whether the channel is backed by a durable delivery queue.
    pub fn is_queued(self) -> bool {
        !matches!(self, Channel::InApp)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CHANNEL_IN_APP => Ok(Channel::InApp),
            CHANNEL_EMAIL => Ok(Channel::Email),
            CHANNEL_PUSH => Ok(Channel::Push),
            other => Err(CoreError::UnknownChannel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_channels() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn rejects_unknown_channel() {
        assert!("sms".parse::<Channel>().is_err());
    }

    #[test]
    fn only_email_and_push_are_queued() {
        assert!(!Channel::InApp.is_queued());
        assert!(Channel::Email.is_queued());
        assert!(Channel::Push.is_queued());
    }
}
