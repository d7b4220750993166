//! Roles and media server capability grants.
//!
//! A [`VideoGrant`] is fully determined by the caller's [`Role`]. The grant is
//! serialized with the media server's camelCase field names, and every
//! boolean is always present on the wire: the media server treats a missing
//! permission as its own default, which may be more permissive than ours.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Participant role requested when issuing an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Broadcaster with full room control.
    Host,
    /// Viewer: may join, subscribe, and send data messages.
    #[default]
    Audience,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Audience => "audience",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized role string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}', expected 'host' or 'audience'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Role::Host),
            "audience" => Ok(Role::Audience),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Room-scoped permissions embedded in an access token under `video`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub room_list: bool,
    pub room_record: bool,
    pub room_admin: bool,
    pub room_create: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
}

impl VideoGrant {
    /// Build the grant for `role` in `room`.
    pub fn for_role(role: Role, room: &str) -> Self {
        match role {
            Role::Host => Self {
                room: room.to_string(),
                room_join: true,
                room_list: true,
                room_record: true,
                room_admin: true,
                room_create: true,
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
            },
            Role::Audience => Self {
                room: room.to_string(),
                room_join: true,
                room_list: false,
                room_record: false,
                room_admin: false,
                room_create: false,
                can_publish: false,
                can_subscribe: true,
                can_publish_data: true,
            },
        }
    }
}
