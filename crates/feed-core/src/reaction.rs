use crate::error::FeedError;
use crate::reference::ActorRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReactionType {
    ThumbsUp,
    ThumbsDown,
    Hooray,
    Laugh,
    Confused,
    Heart,
    Rocket,
    Eyes,
}

impl ReactionType {
    pub fn all() -> &'static [ReactionType] {
        &[
            ReactionType::ThumbsUp,
            ReactionType::ThumbsDown,
            ReactionType::Hooray,
            ReactionType::Laugh,
            ReactionType::Confused,
            ReactionType::Heart,
            ReactionType::Rocket,
            ReactionType::Eyes,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionType::ThumbsUp => "thumbsUp",
            ReactionType::ThumbsDown => "thumbsDown",
            ReactionType::Hooray => "hooray",
            ReactionType::Laugh => "laugh",
            ReactionType::Confused => "confused",
            ReactionType::Heart => "heart",
            ReactionType::Rocket => "rocket",
            ReactionType::Eyes => "eyes",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            ReactionType::ThumbsUp => "👍",
            ReactionType::ThumbsDown => "👎",
            ReactionType::Hooray => "🎉",
            ReactionType::Laugh => "😄",
            ReactionType::Confused => "😕",
            ReactionType::Heart => "❤️",
            ReactionType::Rocket => "🚀",
            ReactionType::Eyes => "👀",
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionType {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionType::all()
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(s) || r.emoji() == s)
            .ok_or_else(|| FeedError::Validation(format!("unknown reaction '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub reaction_type: ReactionType,
    pub user: ActorRef,
}

/// Add `kind` for `user`, or remove it if already present. Returns `true`
/// when the reaction was added.
pub fn toggle(reactions: &mut Vec<Reaction>, kind: ReactionType, user: &ActorRef) -> bool {
    if let Some(pos) = reactions
        .iter()
        .position(|r| r.reaction_type == kind && r.user.is_same(user))
    {
        reactions.remove(pos);
        false
    } else {
        reactions.push(Reaction {
            reaction_type: kind,
            user: user.clone(),
        });
        true
    }
}

pub fn toggle_all(reactions: &mut Vec<Reaction>, kinds: &[ReactionType], user: &ActorRef) {
    for &kind in kinds {
        toggle(reactions, kind, user);
    }
}

/// Per-type counts in the canonical reaction order, omitting zero counts.
pub fn summarize(reactions: &[Reaction]) -> Vec<(ReactionType, usize)> {
    ReactionType::all()
        .iter()
        .map(|&kind| {
            let n = reactions.iter().filter(|r| r.reaction_type == kind).count();
            (kind, n)
        })
        .filter(|(_, n)| *n > 0)
        .collect()
}

/// Rendered reaction slots: one per reaction type in use plus the "add"
/// affordance.
pub fn slot_count(reactions: &[Reaction]) -> usize {
    summarize(reactions).len() + 1
}
