use anyhow::Result;
use tracing::info;

use super::{Context, ListArgs};
use crate::core::query::{self, RunKind};
use crate::core::report::{self, RunRow};

/// PipelineRuns are listed from result summaries; their records are never
/// fetched.
pub(crate) async fn list(ctx: &Context<'_>, args: &ListArgs) -> Result<String> {
    let results = query::list_pipeline_runs(ctx.store, &args.namespace, args.limit).await?;
    info!(namespace = %args.namespace, count = results.len(), "listed PipelineRuns");
    let rows: Vec<RunRow> = results.iter().map(RunRow::from_result).collect();
    Ok(report::list_table(
        RunKind::PipelineRun,
        &rows,
        ctx.clock.now(),
        ctx.decor,
    ))
}
