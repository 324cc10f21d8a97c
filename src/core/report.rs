//! Human-readable reports. A report is first built as a list of typed
//! [`Section`]s and then rendered through one [`TabWriter`].

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::core::model::{
    ComponentState, KeyToPath, LAST_APPLIED_CONFIG_ANNOTATION, TaskRun, WorkspaceBinding,
    WorkspaceSource,
};
use crate::core::ordering::order_by_start;
use crate::core::projection::{self, UNSET};
use crate::core::query::RunKind;
use crate::core::tabwriter::TabWriter;
use crate::core::terminal::{Decor, Icon};
use crate::interfaces::results::StoredResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub icon: Icon,
    pub title: &'static str,
    pub columns: &'static [&'static str],
    /// First cell is the row name; the rest follow the remaining columns.
    pub rows: Vec<Vec<String>>,
    /// Whether the last cell is a status label.
    pub status_cells: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// Aligned `Label:\tvalue` lines.
    Header(Vec<Field>),
    /// `Label:` followed by one ` key=value` line per entry.
    Pairs {
        label: &'static str,
        entries: Vec<(String, String)>,
    },
    Status {
        started: String,
        duration: String,
        status: String,
    },
    Message(String),
    Table(Table),
}

/// Sections describing one TaskRun, with every derived field computed
/// against `now`.
pub fn describe_sections(run: &TaskRun, now: DateTime<Utc>) -> Vec<Section> {
    let mut sections = Vec::new();

    let mut header = vec![
        Field {
            label: "Name",
            value: run.metadata.name.clone(),
        },
        Field {
            label: "Namespace",
            value: run.metadata.namespace.clone(),
        },
    ];
    if let Some(task_ref) = run.spec.task_ref.as_ref().filter(|r| !r.name.is_empty()) {
        header.push(Field {
            label: "Task Ref",
            value: task_ref.name.clone(),
        });
    }
    if !run.spec.service_account_name.is_empty() {
        header.push(Field {
            label: "Service Account",
            value: run.spec.service_account_name.clone(),
        });
    }
    if let Some(timeout) = run.spec.timeout.filter(|t| !t.is_zero()) {
        header.push(Field {
            label: "Timeout",
            value: projection::format_duration(timeout.0),
        });
    }
    sections.push(Section::Header(header));

    if !run.metadata.labels.is_empty() {
        sections.push(Section::Pairs {
            label: "Labels",
            entries: pairs(run.metadata.labels.iter()),
        });
    }
    let annotations = pairs(
        run.metadata
            .annotations
            .iter()
            .filter(|(k, _)| k.as_str() != LAST_APPLIED_CONFIG_ANNOTATION),
    );
    if !annotations.is_empty() {
        sections.push(Section::Pairs {
            label: "Annotations",
            entries: annotations,
        });
    }

    sections.push(Section::Status {
        started: projection::age(run.status.start_time, now),
        duration: projection::duration(run.status.start_time, run.status.completion_time),
        status: projection::condition_label(&run.status.conditions).to_string(),
    });

    let message = projection::failure_message(run);
    if !message.is_empty() {
        sections.push(Section::Message(message.to_string()));
    }

    push_table(
        &mut sections,
        Table {
            icon: Icon::Params,
            title: "Params",
            columns: &["NAME", "VALUE"],
            rows: run
                .spec
                .params
                .iter()
                .map(|p| vec![p.name.clone(), p.value.to_string()])
                .collect(),
            status_cells: false,
        },
    );
    push_table(
        &mut sections,
        Table {
            icon: Icon::Results,
            title: "Results",
            columns: &["NAME", "VALUE"],
            rows: run
                .status
                .results
                .iter()
                .map(|r| vec![r.name.clone(), r.value.to_string()])
                .collect(),
            status_cells: false,
        },
    );
    push_table(
        &mut sections,
        Table {
            icon: Icon::Workspaces,
            title: "Workspaces",
            columns: &["NAME", "SUB PATH", "WORKSPACE BINDING"],
            rows: run.spec.workspaces.iter().map(workspace_row).collect(),
            status_cells: false,
        },
    );
    push_table(
        &mut sections,
        component_table(Icon::Steps, "Steps", &run.status.steps),
    );
    push_table(
        &mut sections,
        component_table(Icon::Sidecars, "Sidecars", &run.status.sidecars),
    );

    sections
}

fn pairs<'a>(entries: impl Iterator<Item = (&'a String, &'a String)>) -> Vec<(String, String)> {
    entries.map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn push_table(sections: &mut Vec<Section>, table: Table) {
    if !table.rows.is_empty() {
        sections.push(Section::Table(table));
    }
}

fn component_table(icon: Icon, title: &'static str, components: &[ComponentState]) -> Table {
    let mut ordered = components.to_vec();
    order_by_start(&mut ordered);
    Table {
        icon,
        title,
        columns: &["NAME", "STATUS"],
        rows: ordered
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    projection::component_label(c.state.as_ref()).to_string(),
                ]
            })
            .collect(),
        status_cells: true,
    }
}

fn workspace_row(ws: &WorkspaceBinding) -> Vec<String> {
    let sub_path = if ws.sub_path.is_empty() {
        UNSET.to_string()
    } else {
        ws.sub_path.clone()
    };
    vec![ws.name.clone(), sub_path, workspace_binding(ws.source.as_ref())]
}

/// One-line description of what backs a workspace.
pub fn workspace_binding(source: Option<&WorkspaceSource>) -> String {
    match source {
        Some(WorkspaceSource::VolumeClaimTemplate) => "VolumeClaimTemplate".to_string(),
        Some(WorkspaceSource::PersistentVolumeClaim { claim_name }) => {
            format!("PVC (claimName={})", claim_name)
        }
        Some(WorkspaceSource::EmptyDir { medium }) => format!("EmptyDir (emptyDir={})", medium),
        Some(WorkspaceSource::ConfigMap { name, items }) => {
            format!("ConfigMap (config={}{})", name, key_paths(items))
        }
        Some(WorkspaceSource::Secret { secret_name, items }) => {
            format!("Secret (secret={}{})", secret_name, key_paths(items))
        }
        Some(WorkspaceSource::Projected) => "Projected".to_string(),
        Some(WorkspaceSource::Csi { driver }) => format!("CSI (driver={})", driver),
        None => String::new(),
    }
}

fn key_paths(items: &[KeyToPath]) -> String {
    items
        .iter()
        .map(|i| format!(", item={}={}", i.key, i.path))
        .collect()
}

/// Renders sections in order. Decoration never changes the layout.
pub fn render(sections: &[Section], decor: Decor) -> String {
    let mut tw = TabWriter::default();
    // Writes into a TabWriter cannot fail.
    let _ = write_sections(&mut tw, sections, decor);
    tw.flush()
}

fn write_sections(tw: &mut TabWriter, sections: &[Section], decor: Decor) -> std::fmt::Result {
    for section in sections {
        match section {
            Section::Header(fields) => {
                for field in fields {
                    writeln!(tw, "{}:\t{}", decor.bold(field.label), field.value)?;
                }
            }
            Section::Pairs { label, entries } => {
                writeln!(tw, "{}:", decor.bold(label))?;
                for (k, v) in entries {
                    writeln!(tw, " {}={}", k, v)?;
                }
            }
            Section::Status {
                started,
                duration,
                status,
            } => {
                writeln!(tw)?;
                writeln!(tw, "{}{}", decor.icon(Icon::Status), decor.title("Status"))?;
                writeln!(tw)?;
                writeln!(tw, "STARTED \tDURATION \tSTATUS")?;
                writeln!(tw, "{}\t{}\t{}", started, duration, decor.status(status))?;
            }
            Section::Message(message) => {
                writeln!(tw)?;
                writeln!(tw, "{}", decor.title("Message"))?;
                writeln!(tw)?;
                writeln!(tw, "{}", message)?;
            }
            Section::Table(table) => {
                writeln!(tw)?;
                writeln!(tw, "{}{}", decor.icon(table.icon), decor.title(table.title))?;
                writeln!(tw)?;
                writeln!(tw, " {}", table.columns.join("\t"))?;
                for row in &table.rows {
                    write_row(tw, row, table.status_cells, decor)?;
                }
            }
        }
    }
    Ok(())
}

fn write_row(tw: &mut TabWriter, row: &[String], status_cells: bool, decor: Decor) -> std::fmt::Result {
    let Some((name, rest)) = row.split_first() else {
        return Ok(());
    };
    write!(tw, " {}", decor.bullet(name))?;
    for (i, cell) in rest.iter().enumerate() {
        if status_cells && i + 1 == rest.len() {
            write!(tw, "\t{}", decor.status(cell))?;
        } else {
            write!(tw, "\t{}", cell)?;
        }
    }
    writeln!(tw)
}

/// One line of a run list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRow {
    pub namespace: String,
    pub identifier: String,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub status: String,
}

impl RunRow {
    pub fn from_task_run(run: &TaskRun) -> Self {
        Self {
            namespace: run.metadata.namespace.clone(),
            identifier: run.metadata.name.clone(),
            started: run.status.start_time,
            finished: run.status.completion_time,
            status: projection::condition_label(&run.status.conditions).to_string(),
        }
    }

    /// Built from the result summary alone; a result without one shows
    /// unset times and an unknown status.
    pub fn from_result(result: &StoredResult) -> Self {
        let summary = result.summary.clone().unwrap_or_default();
        Self {
            namespace: projection::namespace_of(&result.name).to_string(),
            identifier: result.uid.clone(),
            started: summary.start_time,
            finished: summary.end_time,
            status: projection::summary_label(summary.status).to_string(),
        }
    }
}

/// Flat table of runs, or a single "nothing found" line.
pub fn list_table(kind: RunKind, rows: &[RunRow], now: DateTime<Utc>, decor: Decor) -> String {
    if rows.is_empty() {
        return format!("No {} found\n", kind.plural());
    }

    let mut tw = TabWriter::default();
    let _ = writeln!(tw, "NAMESPACE\tUID\tSTARTED\tDURATION\tSTATUS");
    for row in rows {
        let _ = writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}",
            row.namespace,
            row.identifier,
            projection::age(row.started, now),
            projection::duration(row.started, row.finished),
            decor.status(&row.status)
        );
    }
    tw.flush()
}
