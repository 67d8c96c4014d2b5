//! Role-based permission checks for commands.
//!
//! Each level implies the ones below it: an admin is also a moderator, and a
//! moderator is also an engineer.

use crate::config::RolesConfig;

fn has_any(member_roles: &[u64], wanted: &[u64]) -> bool {
    member_roles.iter().any(|r| wanted.contains(r))
}

pub fn is_admin(roles: &RolesConfig, member_roles: &[u64]) -> bool {
    has_any(member_roles, &roles.admin)
}

pub fn is_mod(roles: &RolesConfig, member_roles: &[u64]) -> bool {
    has_any(member_roles, &roles.moderator) || is_admin(roles, member_roles)
}

pub fn is_engineer(roles: &RolesConfig, member_roles: &[u64]) -> bool {
    has_any(member_roles, &roles.engineer) || is_mod(roles, member_roles)
}

/// True when the message came from the configured home guild.
/// Without a configured home guild every guild qualifies; DMs never do.
pub fn in_home_guild(home_guild_id: Option<u64>, guild_id: Option<u64>) -> bool {
    match (home_guild_id, guild_id) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(home), Some(guild)) => home == guild,
    }
}

/// Permission level required by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Everyone,
    Engineer,
    Moderator,
    Admin,
}

impl Level {
    pub fn allows(self, roles: &RolesConfig, member_roles: &[u64]) -> bool {
        match self {
            Level::Everyone => true,
            Level::Engineer => is_engineer(roles, member_roles),
            Level::Moderator => is_mod(roles, member_roles),
            Level::Admin => is_admin(roles, member_roles),
        }
    }
}
