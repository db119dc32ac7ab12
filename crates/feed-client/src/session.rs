use feed_core::config::Config;
use feed_core::feed::DEFAULT_INLINE_REPLIES;
use feed_core::reaction::ReactionType;
use feed_core::reference::ActorRef;

/// Who is acting and how feeds are shown to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: ActorRef,
    pub inline_replies: usize,
    pub reactions: Vec<ReactionType>,
}

impl Session {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: ActorRef::user(user),
            inline_replies: DEFAULT_INLINE_REPLIES,
            reactions: ReactionType::all().to_vec(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            user: ActorRef::user(config.api.user.clone()),
            inline_replies: config.feed.inline_replies,
            reactions: config.feed.reactions.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.user.name
    }
}
