use crate::context::{block_on, Context};
use crate::output::{format_ts, print_json};
use clap::Subcommand;
use feed_client::Conversations;
use feed_core::entity_link::EntityLink;
use feed_core::feed::Thread;
use feed_core::reaction::{summarize, ReactionType};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ThreadSubcommand {
    /// Start a conversation about a table
    Start {
        entity: String,
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Show a thread with its inline replies
    Show { thread_id: Uuid },
    /// Reply to a thread
    Reply {
        thread_id: Uuid,
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Delete one of your replies
    DeleteReply { thread_id: Uuid, post_id: Uuid },
    /// Toggle a reaction (thumbsUp, heart, rocket, ...)
    React {
        thread_id: Uuid,
        reaction: ReactionType,
    },
}

pub fn run(ctx: &Context, subcmd: ThreadSubcommand, json: bool) -> anyhow::Result<()> {
    let conversations = Conversations::new(ctx.api()?, ctx.session());
    block_on(dispatch(&conversations, ctx, subcmd, json))?
}

async fn dispatch(
    conversations: &Conversations,
    ctx: &Context,
    subcmd: ThreadSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let thread = match subcmd {
        ThreadSubcommand::Start { entity, message } => {
            conversations
                .start(&EntityLink::table(entity), &message.join(" "))
                .await?
        }
        ThreadSubcommand::Show { thread_id } => ctx.api()?.get_thread(thread_id).await?,
        ThreadSubcommand::Reply { thread_id, message } => {
            conversations.reply(thread_id, &message.join(" ")).await?
        }
        ThreadSubcommand::DeleteReply { thread_id, post_id } => {
            conversations.delete_reply(thread_id, post_id).await?
        }
        ThreadSubcommand::React {
            thread_id,
            reaction,
        } => {
            let thread = ctx.api()?.get_thread(thread_id).await?;
            conversations.toggle_reaction(&thread, reaction).await?
        }
    };
    if json {
        return print_json(&thread);
    }
    print_thread(conversations, &thread);
    Ok(())
}

fn print_thread(conversations: &Conversations, thread: &Thread) {
    println!("{}  {}", thread.id, thread.about);
    println!("{} ({}): {}", thread.created_by, format_ts(thread.thread_ts), thread.message);

    let reactions: Vec<String> = summarize(&thread.reactions)
        .into_iter()
        .map(|(kind, n)| format!("{} {n}", kind.emoji()))
        .collect();
    if !reactions.is_empty() {
        println!("{}", reactions.join("  "));
    }

    if thread.posts.is_empty() {
        return;
    }
    let inline = conversations.inline(thread);
    println!("{}", inline.label);
    if inline.hidden > 0 {
        println!("  ... {} earlier", inline.hidden);
    }
    for post in inline.shown {
        println!("  [{}] {}: {}", post.id, post.from, post.message);
    }
}
