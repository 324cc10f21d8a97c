use anyhow::Result;
use tracing::info;

use super::{Context, ListArgs, TargetArgs};
use crate::core::query::{self, RunKind};
use crate::core::report::{self, RunRow};

pub(crate) async fn list(ctx: &Context<'_>, args: &ListArgs) -> Result<String> {
    let runs = query::list_task_runs(ctx.store, &args.namespace, args.limit).await?;
    info!(namespace = %args.namespace, count = runs.len(), "listed TaskRuns");
    let rows: Vec<RunRow> = runs.iter().map(RunRow::from_task_run).collect();
    Ok(report::list_table(
        RunKind::TaskRun,
        &rows,
        ctx.clock.now(),
        ctx.decor,
    ))
}

pub(crate) async fn describe(ctx: &Context<'_>, args: &TargetArgs) -> Result<String> {
    let run = query::find_latest(ctx.store, &args.namespace, &args.name).await?;
    let sections = report::describe_sections(&run, ctx.clock.now());
    Ok(report::render(&sections, ctx.decor))
}

/// Raw log bytes, written out unchanged.
pub(crate) async fn logs(ctx: &Context<'_>, args: &TargetArgs) -> Result<Vec<u8>> {
    let chunk = query::fetch_log(ctx.store, &args.namespace, &args.name).await?;
    Ok(chunk.data)
}
