use tracing::trace;

use crate::core::error::DecodeError;
use crate::core::model::TaskRun;
use crate::core::model::v1beta1::LegacyTaskRun;

/// Stored TaskRun schema versions this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V1Beta1,
    V1,
}

impl SchemaVersion {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "tekton.dev/v1beta1.TaskRun" => Some(SchemaVersion::V1Beta1),
            "tekton.dev/v1.TaskRun" => Some(SchemaVersion::V1),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            SchemaVersion::V1Beta1 => "tekton.dev/v1beta1.TaskRun",
            SchemaVersion::V1 => "tekton.dev/v1.TaskRun",
        }
    }
}

/// Decodes a stored payload into the canonical TaskRun, migrating legacy
/// schema versions on the way. `record` only names the source in errors.
pub fn decode(record: &str, payload: &[u8], schema_tag: &str) -> Result<TaskRun, DecodeError> {
    let version = SchemaVersion::from_tag(schema_tag).ok_or_else(|| DecodeError::UnsupportedSchema {
        record: record.to_string(),
        data_type: schema_tag.to_string(),
    })?;
    trace!(record, version = version.as_tag(), "decoding record");

    let malformed = |source| DecodeError::Malformed {
        record: record.to_string(),
        source,
    };

    match version {
        SchemaVersion::V1Beta1 => {
            let legacy: LegacyTaskRun = serde_json::from_slice(payload).map_err(malformed)?;
            Ok(TaskRun::from(legacy))
        }
        SchemaVersion::V1 => serde_json::from_slice(payload).map_err(malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ContainerState, ParamValue};
    use serde_json::json;

    fn legacy_payload() -> serde_json::Value {
        json!({
            "apiVersion": "tekton.dev/v1beta1",
            "kind": "TaskRun",
            "metadata": {
                "name": "build-run-x7k2p",
                "namespace": "ci",
                "uid": "0b1c5e6c-7e4e-4d0c-9c5e-3a3f0c1d2e3f",
                "labels": {"app": "web"},
                "annotations": {"team": "platform"}
            },
            "spec": {
                "params": [{"name": "revision", "value": "main"}],
                "taskRef": {"name": "build", "bundle": "registry.local/tasks:1"},
                "serviceAccountName": "builder",
                "timeout": "1h0m0s",
                "workspaces": [{"name": "src", "subPath": "app", "emptyDir": {}}],
                "stepOverrides": [{"name": "compile", "resources": {"limits": {"memory": "1Gi"}}}],
                "sidecarOverrides": [{"name": "docker", "resources": {}}]
            },
            "status": {
                "podName": "build-run-x7k2p-pod",
                "startTime": "2024-03-01T12:00:00Z",
                "completionTime": "2024-03-01T12:02:00Z",
                "conditions": [{"type": "Succeeded", "status": "True", "reason": "Succeeded"}],
                "steps": [
                    {"name": "compile", "container": "step-compile", "terminated": {
                        "startedAt": "2024-03-01T12:00:05Z",
                        "finishedAt": "2024-03-01T12:01:55Z",
                        "reason": "Completed",
                        "exitCode": 0
                    }}
                ],
                "sidecars": [{"name": "docker", "running": {"startedAt": "2024-03-01T12:00:01Z"}}],
                "taskResults": [{"name": "image", "value": "registry.local/web@sha256:1"}]
            }
        })
    }

    fn canonical_payload() -> serde_json::Value {
        json!({
            "apiVersion": "tekton.dev/v1",
            "kind": "TaskRun",
            "metadata": {
                "name": "build-run-x7k2p",
                "namespace": "ci",
                "uid": "0b1c5e6c-7e4e-4d0c-9c5e-3a3f0c1d2e3f",
                "labels": {"app": "web"},
                "annotations": {"team": "platform"}
            },
            "spec": {
                "params": [{"name": "revision", "value": "main"}],
                "taskRef": {
                    "name": "build",
                    "resolver": "bundles",
                    "params": [
                        {"name": "bundle", "value": "registry.local/tasks:1"},
                        {"name": "name", "value": "build"},
                        {"name": "kind", "value": "Task"}
                    ]
                },
                "serviceAccountName": "builder",
                "timeout": "1h0m0s",
                "workspaces": [{"name": "src", "subPath": "app", "emptyDir": {}}],
                "stepSpecs": [{"name": "compile", "computeResources": {"limits": {"memory": "1Gi"}}}],
                "sidecarSpecs": [{"name": "docker", "computeResources": {}}]
            },
            "status": {
                "podName": "build-run-x7k2p-pod",
                "startTime": "2024-03-01T12:00:00Z",
                "completionTime": "2024-03-01T12:02:00Z",
                "conditions": [{"type": "Succeeded", "status": "True", "reason": "Succeeded"}],
                "steps": [
                    {"name": "compile", "container": "step-compile", "terminated": {
                        "startedAt": "2024-03-01T12:00:05Z",
                        "finishedAt": "2024-03-01T12:01:55Z",
                        "reason": "Completed",
                        "exitCode": 0
                    }}
                ],
                "sidecars": [{"name": "docker", "running": {"startedAt": "2024-03-01T12:00:01Z"}}],
                "results": [{"name": "image", "value": "registry.local/web@sha256:1"}]
            }
        })
    }

    #[test]
    fn legacy_and_canonical_payloads_decode_identically() {
        let legacy = serde_json::to_vec(&legacy_payload()).expect("json");
        let canonical = serde_json::to_vec(&canonical_payload()).expect("json");

        let from_legacy = decode("r/legacy", &legacy, "tekton.dev/v1beta1.TaskRun").expect("legacy");
        let from_canonical = decode("r/v1", &canonical, "tekton.dev/v1.TaskRun").expect("canonical");

        assert_eq!(from_legacy, from_canonical);
    }

    #[test]
    fn renamed_fields_migrate_without_loss() {
        let cases = [
            (
                json!({"spec": {"taskRef": {"name": "build", "kind": "Task"}}}),
                json!({"spec": {"taskRef": {"name": "build", "kind": "Task"}}}),
            ),
            (
                json!({"spec": {"taskRef": {"name": "build", "bundle": ""}}}),
                json!({"spec": {"taskRef": {"name": "build"}}}),
            ),
            (
                json!({"spec": {"taskRef": {
                    "resolver": "git",
                    "params": [{"name": "url", "value": "https://git.local/tasks"}]
                }}}),
                json!({"spec": {"taskRef": {
                    "resolver": "git",
                    "params": [{"name": "url", "value": "https://git.local/tasks"}]
                }}}),
            ),
            (
                json!({"spec": {"stepOverrides": [], "sidecarOverrides": []}}),
                json!({"spec": {}}),
            ),
            (
                json!({"spec": {"stepOverrides": [{"name": "compile"}]}}),
                json!({"spec": {"stepSpecs": [{"name": "compile"}]}}),
            ),
            (
                json!({"status": {"taskResults": [{"name": "files", "value": ["a", "b"]}]}}),
                json!({"status": {"results": [{"name": "files", "value": ["a", "b"]}]}}),
            ),
            (json!({}), json!({})),
        ];

        for (legacy, canonical) in cases {
            let legacy_bytes = serde_json::to_vec(&legacy).expect("json");
            let canonical_bytes = serde_json::to_vec(&canonical).expect("json");
            let from_legacy = decode("r/legacy", &legacy_bytes, "tekton.dev/v1beta1.TaskRun")
                .unwrap_or_else(|e| panic!("{}: {}", legacy, e));
            let from_canonical = decode("r/v1", &canonical_bytes, "tekton.dev/v1.TaskRun")
                .unwrap_or_else(|e| panic!("{}: {}", canonical, e));
            assert_eq!(from_legacy, from_canonical, "{}", legacy);
        }
    }

    #[test]
    fn loosely_typed_values_still_decode() {
        let payload = br#"{
            "spec": {"params": [{"name": "args", "value": null}]},
            "status": {"results": [{"name": "count", "value": 3}]}
        }"#;
        let run = decode("r", payload, "tekton.dev/v1.TaskRun").expect("decode");
        assert_eq!(run.spec.params[0].value, ParamValue::String(String::new()));
        assert_eq!(run.status.results[0].value, ParamValue::String("3".into()));

        let legacy = br#"{"status": {"taskResults": [{"name": "ok", "value": true}]}}"#;
        let run = decode("r", legacy, "tekton.dev/v1beta1.TaskRun").expect("legacy");
        assert_eq!(run.status.results[0].value, ParamValue::String("true".into()));
    }

    #[test]
    fn canonical_payload_fields_are_populated() {
        let canonical = serde_json::to_vec(&canonical_payload()).expect("json");
        let run = decode("r/v1", &canonical, "tekton.dev/v1.TaskRun").expect("decode");

        assert_eq!(run.metadata.name, "build-run-x7k2p");
        assert_eq!(run.metadata.namespace, "ci");
        assert_eq!(run.spec.service_account_name, "builder");
        assert_eq!(run.spec.timeout.map(|t| t.0.as_secs()), Some(3600));
        assert_eq!(
            run.status.results[0].value,
            ParamValue::String("registry.local/web@sha256:1".into())
        );
        assert!(matches!(
            run.status.sidecars[0].state,
            Some(ContainerState::Running { started_at: Some(_) })
        ));
    }

    #[test]
    fn unknown_schema_tag_is_rejected() {
        let err = decode("ns/results/a/records/b", b"{}", "tekton.dev/v1.PipelineRun")
            .expect_err("pipeline runs are not task runs");
        let msg = err.to_string();
        assert!(msg.contains("ns/results/a/records/b"), "{}", msg);
        assert!(msg.contains("tekton.dev/v1.PipelineRun"), "{}", msg);
    }

    #[test]
    fn malformed_payload_names_record() {
        let err = decode("ns/results/a/records/b", b"{not json", "tekton.dev/v1.TaskRun")
            .expect_err("garbage");
        assert!(matches!(err, DecodeError::Malformed { .. }));
        assert!(err.to_string().contains("ns/results/a/records/b"));
    }

    #[test]
    fn unparseable_timestamp_is_a_decode_error() {
        let payload = json!({"status": {"startTime": "last tuesday"}});
        let bytes = serde_json::to_vec(&payload).expect("json");
        assert!(decode("r", &bytes, "tekton.dev/v1.TaskRun").is_err());
    }

    #[test]
    fn tags_round_trip() {
        for v in [SchemaVersion::V1Beta1, SchemaVersion::V1] {
            assert_eq!(SchemaVersion::from_tag(v.as_tag()), Some(v));
        }
    }
}
