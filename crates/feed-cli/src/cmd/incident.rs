use crate::context::{block_on, Context};
use crate::output::{format_ts, print_json, print_table};
use clap::Subcommand;
use feed_client::IncidentManager;
use feed_core::clock::now_millis;
use feed_core::incident::ResolutionStatus;
use feed_core::reference::ActorRef;
use feed_core::types::{ResolutionStatusType, Severity};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum IncidentSubcommand {
    /// List the latest incident per test case
    List {
        /// Incident list URL query, e.g. "assignee=bob&startTs=..&endTs=.."
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long)]
        assignee: Option<String>,
        /// New, Ack, Assigned or Resolved
        #[arg(long)]
        status: Option<ResolutionStatusType>,
        /// Test case FQN
        #[arg(long = "test-case")]
        test_case: Option<String>,
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Set or clear (none) an incident's severity
    Severity {
        id: Uuid,
        severity: String,
        /// List query used to find the incident
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Assign an incident to a user or team
    Assign {
        id: Uuid,
        assignee: String,
        #[arg(long)]
        team: bool,
        #[arg(long, default_value = "")]
        query: String,
    },
}

pub fn run(ctx: &Context, subcmd: IncidentSubcommand, json: bool) -> anyhow::Result<()> {
    block_on(dispatch(ctx, subcmd, json))?
}

async fn dispatch(ctx: &Context, subcmd: IncidentSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        IncidentSubcommand::List {
            query,
            assignee,
            status,
            test_case,
            page,
        } => {
            let mut manager = manager(ctx, &query)?;
            let current = manager.board().filter().clone();
            let filter = current
                .clone()
                .with_assignee(assignee.or_else(|| current.assignee().map(str::to_string)))
                .with_status(status.or(current.status()))
                .with_test_case(test_case.or_else(|| current.test_case_fqn().map(str::to_string)));
            manager.set_filter(filter).await?;
            while manager.board().current_page() < page {
                if !manager.next_page().await? {
                    break;
                }
            }
            list(&manager, json)
        }
        IncidentSubcommand::Severity {
            id,
            severity,
            query,
        } => {
            let severity = match severity.as_str() {
                "none" | "" => None,
                s => Some(s.parse::<Severity>()?),
            };
            let mut manager = locate(ctx, &query, id).await?;
            let record = manager.update_severity(id, severity).await?;
            report(&record, json)
        }
        IncidentSubcommand::Assign {
            id,
            assignee,
            team,
            query,
        } => {
            let actor = if team {
                ActorRef::team(assignee)
            } else {
                ActorRef::user(assignee)
            };
            let mut manager = locate(ctx, &query, id).await?;
            let record = manager.assign(id, actor).await?;
            report(&record, json)
        }
    }
}

fn manager(ctx: &Context, query: &str) -> anyhow::Result<IncidentManager> {
    Ok(IncidentManager::from_url(
        ctx.api()?,
        query.trim_start_matches('?'),
        now_millis(),
        &ctx.config.incidents,
    )?)
}

/// Page through the list until the incident's row is loaded.
async fn locate(ctx: &Context, query: &str, id: Uuid) -> anyhow::Result<IncidentManager> {
    let mut manager = manager(ctx, query)?;
    manager.load().await?;
    loop {
        if manager.board().rows().iter().any(|r| r.id == id) {
            return Ok(manager);
        }
        if !manager.next_page().await? {
            anyhow::bail!("incident {id} not found in ?{}", manager.url_query());
        }
    }
}

fn row(r: &ResolutionStatus) -> Vec<String> {
    vec![
        r.id.to_string(),
        r.test_case_reference.fqn().to_string(),
        r.test_case_resolution_status_type.to_string(),
        r.severity.map(|s| s.to_string()).unwrap_or_default(),
        r.assignee().map(|a| a.label().to_string()).unwrap_or_default(),
        format_ts(r.timestamp),
    ]
}

const HEADERS: [&str; 6] = ["ID", "TEST CASE", "STATUS", "SEVERITY", "ASSIGNEE", "RAISED"];

fn list(manager: &IncidentManager, json: bool) -> anyhow::Result<()> {
    let board = manager.board();
    if json {
        return print_json(&serde_json::json!({
            "data": board.rows(),
            "paging": board.paging(),
            "page": board.current_page(),
            "query": manager.url_query(),
        }));
    }
    if board.rows().is_empty() {
        println!("No incidents.");
        return Ok(());
    }
    print_table(&HEADERS, board.rows().iter().map(row).collect());
    println!(
        "\npage {} ({} total)  ?{}",
        board.current_page(),
        board.paging().total,
        manager.url_query()
    );
    Ok(())
}

fn report(record: &ResolutionStatus, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(record);
    }
    print_table(&HEADERS, vec![row(record)]);
    Ok(())
}
