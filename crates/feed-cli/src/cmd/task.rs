use crate::context::{block_on, Context};
use crate::output::{format_ts, print_json, print_table};
use clap::Subcommand;
use feed_client::TaskEngine;
use feed_core::entity::TagLabel;
use feed_core::entity_link::EntityLink;
use feed_core::feed::Thread;
use feed_core::guard;
use feed_core::reference::ActorRef;
use feed_core::suggestion::SuggestedValue;
use feed_core::task::NewTask;
use feed_core::types::{FeedFilter, SuggestionType, TaskStatus, TaskType, ThreadType};
use feed_core::wire::FeedQuery;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// List tasks about a table, or the current user's task feed
    List {
        /// Table FQN (omit to list the user's feed)
        #[arg(long)]
        entity: Option<String>,
        /// open or closed
        #[arg(long, default_value = "open")]
        status: TaskStatus,
        /// OWNER, ASSIGNED_BY or MENTIONS (user feed only)
        #[arg(long)]
        filter: Option<FeedFilter>,
    },
    /// Show open and closed task counts for a table
    Count { entity: String },
    /// Create a task about a table or one of its columns
    Create {
        entity: String,
        /// RequestDescription, UpdateDescription, RequestTag, UpdateTag, Generic
        #[arg(long = "type", value_name = "TYPE")]
        task_type: TaskType,
        /// Column path, dot-separated for nested columns
        #[arg(long)]
        column: Option<String>,
        #[arg(long = "assignee", required = true)]
        assignees: Vec<String>,
        /// Suggested description, or comma-separated tag FQNs for tag tasks
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
    /// Comment on a task
    Comment {
        task_id: u64,
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Close a task with a comment
    Close { task_id: u64, comment: Vec<String> },
    /// Accept the task's suggestion, optionally replacing its value
    Accept {
        task_id: u64,
        #[arg(long, conflicts_with = "tags")]
        description: Option<String>,
        /// Comma-separated tag FQNs
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Reject the task's suggestion and close the task
    Reject { task_id: u64, comment: Vec<String> },
}

pub fn run(ctx: &Context, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    block_on(dispatch(ctx, subcmd, json))?
}

async fn dispatch(ctx: &Context, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TaskSubcommand::List {
            entity,
            status,
            filter,
        } => list(ctx, entity.as_deref(), status, filter, json).await,
        TaskSubcommand::Count { entity } => count(ctx, &entity, json).await,
        TaskSubcommand::Create {
            entity,
            task_type,
            column,
            assignees,
            value,
            message,
        } => {
            let task = new_task(&entity, task_type, column.as_deref(), &assignees, value, message)?;
            create(ctx, task, json).await
        }
        TaskSubcommand::Comment { task_id, message } => {
            let mut engine = engine(ctx)?;
            let thread = engine.add_comment(task_id, &message.join(" ")).await?;
            report(&thread, "Commented on", json)
        }
        TaskSubcommand::Close { task_id, comment } => {
            let mut engine = engine(ctx)?;
            let thread = engine.close_task(task_id, &comment.join(" ")).await?;
            report(&thread, "Closed", json)
        }
        TaskSubcommand::Accept {
            task_id,
            description,
            tags,
        } => {
            let value = match (description, tags.is_empty()) {
                (Some(d), _) => Some(SuggestedValue::Description(d)),
                (None, false) => Some(tag_labels(&tags)),
                (None, true) => None,
            };
            accept(ctx, task_id, value, json).await
        }
        TaskSubcommand::Reject { task_id, comment } => {
            let mut engine = engine(ctx)?;
            let thread = engine.reject_suggestion(task_id, &comment.join(" ")).await?;
            report(&thread, "Rejected suggestion on", json)
        }
    }
}

fn engine(ctx: &Context) -> anyhow::Result<TaskEngine> {
    Ok(TaskEngine::new(ctx.api()?, ctx.session()))
}

fn tag_labels(tags: &[String]) -> SuggestedValue {
    SuggestedValue::TagLabels(
        tags.iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(TagLabel::classification)
            .collect(),
    )
}

fn new_task(
    fqn: &str,
    task_type: TaskType,
    column: Option<&str>,
    assignees: &[String],
    value: Option<String>,
    message: Option<String>,
) -> anyhow::Result<NewTask> {
    let suggestion_type = task_type.suggestion_type();
    let about = match (column, suggestion_type) {
        (Some(col), Some(kind)) => EntityLink::table_column(fqn, col, kind.to_string()),
        (Some(col), None) => EntityLink::table_column(fqn, col, "description"),
        (None, _) => EntityLink::table(fqn),
    };
    let about = about.to_string();
    let assignees: Vec<ActorRef> = assignees.iter().map(ActorRef::user).collect();
    if !guard::can_create_task(&about, &assignees) {
        anyhow::bail!("a task needs a valid entity link and at least one assignee, got {about}");
    }
    let mut task = NewTask::new(task_type, &about, assignees)?;
    if let Some(value) = value {
        let value = match suggestion_type {
            Some(SuggestionType::Tags) => {
                tag_labels(&value.split(',').map(str::to_string).collect::<Vec<_>>())
            }
            _ => SuggestedValue::Description(value),
        };
        task = task.with_suggestion(value)?;
    }
    if let Some(message) = message {
        task = task.with_message(message);
    }
    Ok(task)
}

fn task_rows(threads: &[Thread]) -> Vec<Vec<String>> {
    threads
        .iter()
        .filter_map(|t| t.task.as_ref().map(|task| (t, task)))
        .map(|(t, task)| {
            vec![
                task.id.to_string(),
                task.task_type.to_string(),
                task.status.to_string(),
                t.about.to_string(),
                task.assignees
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                task.suggestion
                    .as_ref()
                    .map(|s| s.value.as_text())
                    .unwrap_or_default(),
                format_ts(t.thread_ts),
            ]
        })
        .collect()
}

async fn list(
    ctx: &Context,
    entity: Option<&str>,
    status: TaskStatus,
    filter: Option<FeedFilter>,
    json: bool,
) -> anyhow::Result<()> {
    let api = ctx.api()?;
    let query = match (entity, filter) {
        (Some(fqn), _) => FeedQuery::tasks_about(&EntityLink::table(fqn), status),
        (None, Some(filter)) => FeedQuery::tasks_for_user(api.user(), filter, status),
        (None, None) => FeedQuery {
            thread_type: Some(ThreadType::Task),
            task_status: Some(status),
            user_id: Some(api.user().to_string()),
            ..FeedQuery::default()
        },
    };
    let list = api.list_threads(&query).await?;

    if json {
        return print_json(&list.data);
    }
    if list.data.is_empty() {
        println!("No {status} tasks.");
        return Ok(());
    }
    print_table(
        &["ID", "TYPE", "STATUS", "ABOUT", "ASSIGNEES", "SUGGESTION", "CREATED"],
        task_rows(&list.data),
    );
    Ok(())
}

async fn count(ctx: &Context, fqn: &str, json: bool) -> anyhow::Result<()> {
    let counts = ctx.api()?.count(Some(&EntityLink::table(fqn))).await?;
    if json {
        print_json(&counts)
    } else {
        let (open, closed) = counts.labels();
        println!("{open}  {closed}");
        Ok(())
    }
}

async fn create(ctx: &Context, task: NewTask, json: bool) -> anyhow::Result<()> {
    let mut engine = engine(ctx)?;
    let thread = engine.create_task(task).await?;
    report(&thread, "Created", json)
}

async fn accept(
    ctx: &Context,
    task_id: u64,
    value: Option<SuggestedValue>,
    json: bool,
) -> anyhow::Result<()> {
    let mut engine = engine(ctx)?;
    let entity = engine.accept_with(task_id, value).await?;
    if json {
        print_json(&entity)
    } else {
        println!(
            "Accepted task #{task_id}; {} is now at version {:.1}",
            entity.fully_qualified_name, entity.version
        );
        Ok(())
    }
}

fn report(thread: &Thread, verb: &str, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(thread);
    }
    match &thread.task {
        Some(task) => println!("{verb} task #{} ({})", task.id, task.status),
        None => println!("{verb} thread {}", thread.id),
    }
    Ok(())
}
