//! Role-whitelist permission evaluation and the preconditions built on it.

use std::collections::{HashMap, HashSet};

use crate::{
    commands::{ArgValue, CommandContext},
    domain::{Actor, GuildId, RoleId},
    errors::Error,
    Result,
};

pub const NO_WHITELIST: &str = "This guild does not have a whitelist.";
pub const ROLE_NOT_WHITELISTED: &str = "You do not have a whitelisted role.";

/// Result of a single precondition check. There is no warning state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreconditionOutcome {
    Success,
    Failure(String),
}

impl PreconditionOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Per-guild set of roles allowed to run elevated commands.
///
/// A guild that is absent from the map has no whitelist; that is always a
/// failure, never an implicit allow.
#[derive(Clone, Debug, Default)]
pub struct RoleWhitelist {
    guilds: HashMap<GuildId, HashSet<RoleId>>,
}

impl RoleWhitelist {
    pub fn insert(&mut self, guild: GuildId, roles: impl IntoIterator<Item = RoleId>) {
        self.guilds.entry(guild).or_default().extend(roles);
    }

    pub fn roles_for(&self, guild: GuildId) -> Option<&HashSet<RoleId>> {
        self.guilds.get(&guild)
    }

    /// Parse `{"<guild id>": [<role id>, ...]}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let map: HashMap<String, Vec<i64>> = serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("GUILD_ROLE_MAP is not valid JSON: {e}")))?;
        Self::from_map(map)
    }

    pub fn from_map(map: HashMap<String, Vec<i64>>) -> Result<Self> {
        let mut out = Self::default();
        for (guild, roles) in map {
            let id = guild.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("guild role map: `{guild}` is not a guild id"))
            })?;
            out.insert(GuildId(id), roles.into_iter().map(RoleId));
        }
        Ok(out)
    }
}

/// Whole-command gate: the actor must hold at least one whitelisted role of the
/// guild the command was sent from.
pub fn evaluate(
    actor: &Actor,
    guild: Option<GuildId>,
    whitelist: &RoleWhitelist,
) -> PreconditionOutcome {
    let Some(roles) = guild.and_then(|g| whitelist.roles_for(g)) else {
        return PreconditionOutcome::failure(NO_WHITELIST);
    };

    if actor.roles.iter().any(|r| roles.contains(r)) {
        PreconditionOutcome::Success
    } else {
        PreconditionOutcome::failure(ROLE_NOT_WHITELISTED)
    }
}

/// Single-parameter gate: values at or below `threshold` always pass; larger
/// values require the whole-command gate.
pub fn evaluate_value(
    actor: &Actor,
    guild: Option<GuildId>,
    whitelist: &RoleWhitelist,
    value: i64,
    threshold: i64,
) -> PreconditionOutcome {
    if value <= threshold {
        return PreconditionOutcome::Success;
    }
    evaluate(actor, guild, whitelist)
}

/// A gate evaluated before a command handler runs.
pub trait Precondition: Send + Sync {
    fn check(&self, ctx: &CommandContext) -> PreconditionOutcome;
}

/// A gate evaluated against one parsed argument.
pub trait ParameterPrecondition: Send + Sync {
    fn check(&self, ctx: &CommandContext, value: &ArgValue) -> PreconditionOutcome;
}

/// Requires the invoking actor to hold a whitelisted role.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireElevatedUser;

impl Precondition for RequireElevatedUser {
    fn check(&self, ctx: &CommandContext) -> PreconditionOutcome {
        evaluate(&ctx.actor, ctx.guild_id, &ctx.state.cfg.guild_roles)
    }
}

/// Requires a whitelisted role only when the integer argument exceeds the
/// configured elevated threshold.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireElevatedAbove;

impl ParameterPrecondition for RequireElevatedAbove {
    fn check(&self, ctx: &CommandContext, value: &ArgValue) -> PreconditionOutcome {
        let ArgValue::Int(v) = value else {
            return PreconditionOutcome::Success;
        };
        let cfg = &ctx.state.cfg;
        evaluate_value(
            &ctx.actor,
            ctx.guild_id,
            &cfg.guild_roles,
            *v,
            cfg.elevated_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    const GUILD: GuildId = GuildId(-1001);

    fn whitelist() -> RoleWhitelist {
        let mut wl = RoleWhitelist::default();
        wl.insert(GUILD, [RoleId(1), RoleId(2)]);
        wl
    }

    fn actor(roles: &[i64]) -> Actor {
        Actor::new(UserId(42), "tester").with_roles(roles.iter().copied().map(RoleId))
    }

    #[test]
    fn empty_role_set_never_passes_a_configured_guild() {
        let wl = whitelist();
        assert_eq!(
            evaluate(&actor(&[]), Some(GUILD), &wl),
            PreconditionOutcome::failure(ROLE_NOT_WHITELISTED)
        );
    }

    #[test]
    fn unconfigured_guild_always_fails() {
        let wl = whitelist();
        for roles in [&[][..], &[1][..], &[1, 2, 3][..]] {
            assert_eq!(
                evaluate(&actor(roles), Some(GuildId(5)), &wl),
                PreconditionOutcome::failure(NO_WHITELIST)
            );
        }
        assert_eq!(
            evaluate(&actor(&[1]), None, &wl),
            PreconditionOutcome::failure(NO_WHITELIST)
        );
        assert_eq!(
            evaluate(&actor(&[1]), Some(GUILD), &RoleWhitelist::default()),
            PreconditionOutcome::failure(NO_WHITELIST)
        );
    }

    #[test]
    fn any_shared_role_passes() {
        let wl = whitelist();
        assert!(evaluate(&actor(&[2]), Some(GUILD), &wl).is_success());
        assert!(evaluate(&actor(&[9, 1]), Some(GUILD), &wl).is_success());
        assert!(!evaluate(&actor(&[9]), Some(GUILD), &wl).is_success());
    }

    #[test]
    fn small_values_skip_the_gate() {
        let empty = RoleWhitelist::default();
        for v in [-5, 0, 1, 10] {
            assert!(evaluate_value(&actor(&[]), None, &empty, v, 10).is_success());
            assert!(evaluate_value(&actor(&[]), Some(GUILD), &whitelist(), v, 10).is_success());
        }
    }

    #[test]
    fn large_values_match_command_gate() {
        let wl = whitelist();
        let cases = [
            (actor(&[]), Some(GUILD)),
            (actor(&[1]), Some(GUILD)),
            (actor(&[1]), Some(GuildId(7))),
            (actor(&[3]), None),
        ];
        for (a, g) in cases {
            assert_eq!(
                evaluate_value(&a, g, &wl, 11, 10),
                evaluate(&a, g, &wl),
                "value gate diverged for {a:?} in {g:?}"
            );
        }
    }

    #[test]
    fn threshold_is_configurable() {
        let wl = whitelist();
        assert!(evaluate_value(&actor(&[]), Some(GUILD), &wl, 50, 50).is_success());
        assert!(!evaluate_value(&actor(&[]), Some(GUILD), &wl, 51, 50).is_success());
    }

    #[test]
    fn role_map_parses_from_json() {
        let wl = RoleWhitelist::from_json(r#"{"-1001": [1, 2], "7": []}"#).unwrap();
        assert_eq!(wl.roles_for(GUILD).map(|r| r.len()), Some(2));
        assert!(wl.roles_for(GuildId(7)).unwrap().is_empty());
        assert!(RoleWhitelist::from_json("[1,2]").is_err());
    }
}
