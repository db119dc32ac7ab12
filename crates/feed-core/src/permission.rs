use crate::entity_link::EntityLink;
use crate::error::{FeedError, Result};
use crate::reference::ActorRef;
use crate::types::Operation;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

// ---------------------------------------------------------------------------
// Denial
// ---------------------------------------------------------------------------

/// Structured reason a permission check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Denial {
    pub principal: String,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub policy: String,
    pub rule: String,
}

static DENIAL_RE: OnceLock<Regex> = OnceLock::new();

fn denial_re() -> &'static Regex {
    DENIAL_RE.get_or_init(|| {
        Regex::new(
            r"Principal: CatalogPrincipal\{name='(?P<principal>.*?)'\} operation (?P<op>\w+) denied by (?:role (?P<role>.+?), )?policy (?P<policy>.+?), rule (?P<rule>\S(?:.*\S)?)\s*$",
        )
        .unwrap()
    })
}

impl Denial {
    pub fn new(
        principal: impl Into<String>,
        operation: Operation,
        role: impl Into<String>,
        policy: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            principal: principal.into(),
            operation,
            role: Some(role.into()),
            policy: policy.into(),
            rule: rule.into(),
        }
    }

    /// Recover a denial from the message the backend puts in a 403 body.
    pub fn parse(message: &str) -> Option<Self> {
        let caps = denial_re().captures(message)?;
        let operation = caps["op"].parse().ok()?;
        Some(Self {
            principal: caps["principal"].to_string(),
            operation,
            role: caps.name("role").map(|m| m.as_str().to_string()),
            policy: caps["policy"].to_string(),
            rule: caps["rule"].to_string(),
        })
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Principal: CatalogPrincipal{{name='{}'}} operation {} denied by ",
            self.principal, self.operation
        )?;
        if let Some(role) = &self.role {
            write!(f, "role {role}, ")?;
        }
        write!(f, "policy {}, rule {}", self.policy, self.rule)
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The policy engine as seen by the task lifecycle.
pub trait PermissionGate {
    fn can_perform(&self, actor: &ActorRef, operation: Operation, resource: &EntityLink)
        -> Decision;
}

impl<T: PermissionGate + ?Sized> PermissionGate for &T {
    fn can_perform(&self, actor: &ActorRef, operation: Operation, resource: &EntityLink) -> Decision {
        (**self).can_perform(actor, operation, resource)
    }
}

impl<T: PermissionGate + ?Sized> PermissionGate for Arc<T> {
    fn can_perform(&self, actor: &ActorRef, operation: Operation, resource: &EntityLink) -> Decision {
        (**self).can_perform(actor, operation, resource)
    }
}

/// Gate for callers that leave enforcement to the backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn can_perform(&self, _: &ActorRef, _: Operation, _: &EntityLink) -> Decision {
        Decision::Allow
    }
}

/// Turn a `Deny` into `FeedError::Permission`.
pub fn require<G: PermissionGate + ?Sized>(
    gate: &G,
    actor: &ActorRef,
    operation: Operation,
    resource: &EntityLink,
) -> Result<()> {
    match gate.can_perform(actor, operation, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(denial) => Err(FeedError::Permission(denial)),
    }
}

// ---------------------------------------------------------------------------
// PolicyEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub effect: Effect,
    pub operations: Vec<Operation>,
    /// Entity types the rule applies to. Empty or `all` matches every type.
    #[serde(default)]
    pub resources: Vec<String>,
}

impl Rule {
    fn matches(&self, operation: Operation, resource: &EntityLink) -> bool {
        let op_match = self.operations.iter().any(|o| o.covers(operation));
        let resource_match = self.resources.is_empty()
            || self
                .resources
                .iter()
                .any(|r| r == "all" || r.eq_ignore_ascii_case(&resource.entity_type));
        op_match && resource_match
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub policies: Vec<String>,
}

/// Role-based evaluator: deny rules win over allow rules, and anything not
/// explicitly allowed is denied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyEngine {
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Principal name → role names.
    #[serde(default)]
    pub assignments: HashMap<String, Vec<String>>,
    /// Roles for principals with no explicit assignment.
    #[serde(default)]
    pub default_roles: Vec<String>,
    /// Principals that bypass evaluation.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl PolicyEngine {
    fn roles_for(&self, principal: &str) -> &[String] {
        self.assignments
            .get(principal)
            .map(|v| v.as_slice())
            .unwrap_or(&self.default_roles)
    }

    fn policy(&self, name: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name == name)
    }

    fn role(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }
}

impl PermissionGate for PolicyEngine {
    fn can_perform(&self, actor: &ActorRef, operation: Operation, resource: &EntityLink) -> Decision {
        if self.admins.iter().any(|a| a == &actor.name) {
            return Decision::Allow;
        }

        let mut allowed = false;
        for role_name in self.roles_for(&actor.name) {
            let Some(role) = self.role(role_name) else {
                continue;
            };
            for policy in role.policies.iter().filter_map(|p| self.policy(p)) {
                for rule in policy.rules.iter().filter(|r| r.matches(operation, resource)) {
                    match rule.effect {
                        Effect::Deny => {
                            return Decision::Deny(Denial::new(
                                &actor.name,
                                operation,
                                &role.name,
                                &policy.name,
                                &rule.name,
                            ))
                        }
                        Effect::Allow => allowed = true,
                    }
                }
            }
        }

        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(Denial {
                principal: actor.name.clone(),
                operation,
                role: None,
                policy: "none".to_string(),
                rule: "noMatchingAllowRule".to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
