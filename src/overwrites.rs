//! # Permission resolution
//!
//! Computes effective permissions from role grants and channel overwrites,
//! the way Discord does:
//!
//! 1. guild level: `@everyone` plus every role the member holds; the owner
//!    and anyone with ADMINISTRATOR get everything
//! 2. channel level: the `@everyone` overwrite, then all of the member's role
//!    overwrites combined, then the member's own overwrite. Denies are applied
//!    before allows at each step.

use serenity::model::channel::{PermissionOverwrite, PermissionOverwriteType};
use serenity::model::id::{GuildId, RoleId, UserId};
use serenity::model::permissions::Permissions;
use std::collections::{BTreeMap, HashMap};

/// The `@everyone` role shares its id with the guild.
pub fn everyone_role(guild_id: GuildId) -> RoleId {
    RoleId(guild_id.0)
}

pub fn guild_permissions(
    guild_id: GuildId,
    owner_id: UserId,
    user_id: UserId,
    member_roles: &[RoleId],
    roles: &HashMap<RoleId, Permissions>,
) -> Permissions {
    if user_id == owner_id {
        return Permissions::all();
    }

    let mut permissions = roles
        .get(&everyone_role(guild_id))
        .copied()
        .unwrap_or_else(Permissions::empty);

    for role in member_roles {
        if let Some(granted) = roles.get(role) {
            permissions |= *granted;
        }
    }

    if permissions.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        permissions
    }
}

fn apply(permissions: &mut Permissions, allow: Permissions, deny: Permissions) {
    permissions.remove(deny);
    permissions.insert(allow);
}

pub fn channel_permissions(
    base: Permissions,
    guild_id: GuildId,
    user_id: UserId,
    member_roles: &[RoleId],
    overwrites: &[PermissionOverwrite],
) -> Permissions {
    if base.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    let everyone = everyone_role(guild_id);
    let mut permissions = base;

    for overwrite in overwrites {
        if let PermissionOverwriteType::Role(role) = overwrite.kind {
            if role == everyone {
                apply(&mut permissions, overwrite.allow, overwrite.deny);
            }
        }
    }

    let mut allow = Permissions::empty();
    let mut deny = Permissions::empty();
    for overwrite in overwrites {
        if let PermissionOverwriteType::Role(role) = overwrite.kind {
            if role != everyone && member_roles.contains(&role) {
                allow |= overwrite.allow;
                deny |= overwrite.deny;
            }
        }
    }
    apply(&mut permissions, allow, deny);

    for overwrite in overwrites {
        if let PermissionOverwriteType::Member(member) = overwrite.kind {
            if member == user_id {
                apply(&mut permissions, overwrite.allow, overwrite.deny);
            }
        }
    }

    permissions
}

/// Channel permissions of a single role, ignoring members and other roles.
pub fn role_channel_permissions(
    guild_id: GuildId,
    role_id: RoleId,
    roles: &HashMap<RoleId, Permissions>,
    overwrites: &[PermissionOverwrite],
) -> Permissions {
    let everyone = everyone_role(guild_id);
    let mut permissions = roles.get(&everyone).copied().unwrap_or_else(Permissions::empty);
    if let Some(granted) = roles.get(&role_id) {
        permissions |= *granted;
    }

    if permissions.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    for target in [everyone, role_id] {
        for overwrite in overwrites {
            if let PermissionOverwriteType::Role(role) = overwrite.kind {
                if role == target {
                    apply(&mut permissions, overwrite.allow, overwrite.deny);
                }
            }
        }
        if role_id == everyone {
            break;
        }
    }

    permissions
}

/// Renders every named permission with whether it is granted, as a code block.
pub fn permission_report(permissions: Permissions) -> String {
    let mut report: BTreeMap<&str, bool> = BTreeMap::new();
    for name in permissions.get_permission_names() {
        report.insert(name, true);
    }
    for name in (Permissions::all() & !permissions).get_permission_names() {
        report.insert(name, false);
    }

    let body = serde_json::to_string_pretty(&report).unwrap_or_default();
    format!("```json\n{}\n```", body)
}
