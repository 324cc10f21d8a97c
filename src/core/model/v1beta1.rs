//! Legacy `tekton.dev/v1beta1` TaskRun shape and its lossless conversion
//! into the canonical model.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{
    Condition, ObjectMeta, Param, SidecarState, StepSpec, StepState, TaskRef, TaskRun,
    TaskRunResult, TaskRunSpec, TaskRunStatus, Timeout, WorkspaceBinding,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyTaskRun {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: LegacySpec,
    #[serde(default)]
    pub status: LegacyStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySpec {
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub task_ref: Option<LegacyTaskRef>,
    #[serde(default)]
    pub service_account_name: String,
    #[serde(default)]
    pub timeout: Option<Timeout>,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceBinding>,
    #[serde(default)]
    pub step_overrides: Vec<LegacyOverride>,
    #[serde(default)]
    pub sidecar_overrides: Vec<LegacyOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTaskRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub bundle: Option<String>,
    #[serde(default)]
    pub resolver: Option<String>,
    #[serde(default)]
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyOverride {
    pub name: String,
    #[serde(default)]
    pub resources: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStatus {
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub steps: Vec<StepState>,
    #[serde(default)]
    pub sidecars: Vec<SidecarState>,
    #[serde(default)]
    pub task_results: Vec<TaskRunResult>,
}

impl From<LegacyTaskRef> for TaskRef {
    fn from(legacy: LegacyTaskRef) -> Self {
        // Bundle references became a resolver with the bundle coordinates as params.
        let (resolver, params) = match legacy.bundle.filter(|b| !b.is_empty()) {
            Some(bundle) => (
                Some("bundles".to_string()),
                vec![
                    Param::string("bundle", &bundle),
                    Param::string("name", &legacy.name),
                    Param::string("kind", "Task"),
                ],
            ),
            None => (legacy.resolver, legacy.params),
        };

        TaskRef {
            name: legacy.name,
            kind: legacy.kind,
            api_version: legacy.api_version,
            resolver,
            params,
        }
    }
}

impl From<LegacyOverride> for StepSpec {
    fn from(legacy: LegacyOverride) -> Self {
        StepSpec {
            name: legacy.name,
            compute_resources: legacy.resources,
        }
    }
}

impl From<LegacyTaskRun> for TaskRun {
    fn from(legacy: LegacyTaskRun) -> Self {
        let LegacyTaskRun {
            metadata,
            spec,
            status,
        } = legacy;

        TaskRun {
            metadata,
            spec: TaskRunSpec {
                params: spec.params,
                task_ref: spec.task_ref.map(TaskRef::from),
                service_account_name: spec.service_account_name,
                timeout: spec.timeout,
                workspaces: spec.workspaces,
                step_specs: spec.step_overrides.into_iter().map(StepSpec::from).collect(),
                sidecar_specs: spec
                    .sidecar_overrides
                    .into_iter()
                    .map(StepSpec::from)
                    .collect(),
            },
            status: TaskRunStatus {
                pod_name: status.pod_name,
                start_time: status.start_time,
                completion_time: status.completion_time,
                conditions: status.conditions,
                steps: status.steps,
                sidecars: status.sidecars,
                results: status.task_results,
            },
        }
    }
}
