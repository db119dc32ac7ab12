mod common;

use common::{api, seed, session, start_server, FQN};
use feed_client::Conversations;
use feed_core::entity_link::EntityLink;
use feed_core::reaction::{slot_count, ReactionType};
use feed_core::FeedError;

fn conversations(base: &str, user: &str) -> Conversations {
    Conversations::new(api(base, user), session(user))
}

#[tokio::test]
async fn inline_replies_follow_deletions() {
    let base = start_server(seed()).await;
    let admin = conversations(&base, "admin");
    let mut thread = admin
        .start(&EntityLink::table(FQN), "who owns this table?")
        .await
        .unwrap();
    for i in 1..=5 {
        thread = admin.reply(thread.id, &format!("reply {i}")).await.unwrap();
    }

    let view = admin.inline(&thread);
    let shown: Vec<&str> = view.shown.iter().map(|p| p.message.as_str()).collect();
    assert_eq!(shown, ["reply 3", "reply 4", "reply 5"]);
    assert_eq!(view.hidden, 2);
    assert_eq!(view.label, "05 Replies");

    for post in thread.posts.clone().iter().rev().take(2) {
        thread = admin.delete_reply(thread.id, post.id).await.unwrap();
    }
    assert_eq!(thread.posts_count, 3);
    let view = admin.inline(&thread);
    let shown: Vec<&str> = view.shown.iter().map(|p| p.message.as_str()).collect();
    assert_eq!(shown, ["reply 1", "reply 2", "reply 3"]);
    assert_eq!(view.hidden, 0);
}

#[tokio::test]
async fn only_the_author_deletes_a_reply() {
    let base = start_server(seed()).await;
    let admin = conversations(&base, "admin");
    let bob = conversations(&base, "bob");
    let thread = admin.start(&EntityLink::table(FQN), "hello").await.unwrap();
    let thread = admin.reply(thread.id, "mine").await.unwrap();

    let err = bob.delete_reply(thread.id, thread.posts[0].id).await.unwrap_err();
    assert!(matches!(err, FeedError::Policy(_)));
}

#[tokio::test]
async fn empty_reply_is_not_sent() {
    let base = start_server(seed()).await;
    let admin = conversations(&base, "admin");
    let thread = admin.start(&EntityLink::table(FQN), "hello").await.unwrap();
    assert!(matches!(
        admin.reply(thread.id, " ").await,
        Err(FeedError::Validation(_))
    ));
}

#[tokio::test]
async fn toggling_all_reactions_twice_restores_one_slot() {
    let base = start_server(seed()).await;
    let admin = conversations(&base, "admin");
    let thread = admin.start(&EntityLink::table(FQN), "hello").await.unwrap();
    assert_eq!(slot_count(&thread.reactions), 1);

    let thread = admin.toggle_all_reactions(&thread).await.unwrap();
    assert_eq!(thread.reactions.len(), 8);
    assert_eq!(slot_count(&thread.reactions), 9);

    let thread = admin.toggle_all_reactions(&thread).await.unwrap();
    assert!(thread.reactions.is_empty());
    assert_eq!(slot_count(&thread.reactions), 1);
}

#[tokio::test]
async fn reactions_from_two_users_are_kept_apart() {
    let base = start_server(seed()).await;
    let admin = conversations(&base, "admin");
    let bob = conversations(&base, "bob");
    let thread = admin.start(&EntityLink::table(FQN), "hello").await.unwrap();

    let thread = admin.toggle_reaction(&thread, ReactionType::Heart).await.unwrap();
    let thread = bob.toggle_reaction(&thread, ReactionType::Heart).await.unwrap();
    assert_eq!(thread.reactions.len(), 2);

    let thread = admin.toggle_reaction(&thread, ReactionType::Heart).await.unwrap();
    assert_eq!(thread.reactions.len(), 1);
    assert_eq!(thread.reactions[0].user.name, "bob");
}
