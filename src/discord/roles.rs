use serenity::all::{RoleId, UserId};

use crate::discord::gateway::GuildGateway;
use crate::error::BotResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleChange {
    Revoke(RoleId),
    Grant { evict: Vec<RoleId>, add: RoleId },
}

/// A click toggles `bound`; granting it first evicts the competing roles the member holds.
pub fn plan_toggle(held: &[RoleId], bound: RoleId, competing: &[RoleId]) -> RoleChange {
    if held.contains(&bound) {
        return RoleChange::Revoke(bound);
    }
    let evict = competing.iter().copied().filter(|role| *role != bound && held.contains(role)).collect();
    RoleChange::Grant { evict, add: bound }
}

/// Removals run one at a time before the add; two quick clicks in one panel can still race.
pub async fn apply_toggle(gateway: &dyn GuildGateway, member: UserId, change: &RoleChange) -> BotResult<()> {
    match change {
        RoleChange::Revoke(role) => gateway.remove_role(member, *role).await,
        RoleChange::Grant { evict, add } => {
            for role in evict {
                gateway.remove_role(member, *role).await?;
            }
            gateway.add_role(member, *add).await
        }
    }
}

pub fn confirmation(member: UserId, label: &str, change: &RoleChange) -> String {
    let mention = crate::discord::notice::mention(member);
    match change {
        RoleChange::Revoke(_) => format!("{mention} the `{label}` role was removed!"),
        RoleChange::Grant { .. } => format!("{mention} the `{label}` role was added!"),
    }
}
