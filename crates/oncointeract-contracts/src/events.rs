use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::analysis::VisualizationKey;

/// Everything that lands in `events.jsonl`. The variant name becomes the
/// `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        mode: String,
        out_dir: String,
        text_model: String,
        image_model: String,
    },
    SessionFinished,
    ModelsChanged {
        text_model: String,
        image_model: String,
    },
    AnalysisRequested {
        receptor: String,
        cancer_type: String,
        cancer_class: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        mutation: Option<String>,
        has_experimental_data: bool,
    },
    TransitionApplied {
        transition: String,
        phase: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    TransitionIgnored {
        transition: String,
        phase: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    StaleTransitionDiscarded {
        transition: String,
        current_epoch: u64,
    },
    ImageFailed {
        key: VisualizationKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        error: String,
    },
    ReportExported {
        path: String,
    },
    HtmlExported {
        path: String,
    },
    ImagesExported {
        dir: String,
        count: usize,
    },
}

/// Append-only diagnostics log shared by the session and its worker threads.
///
/// Each line is one `Event` stamped with `session_id` and `ts`; events that
/// belong to a submission cycle also carry its `epoch`.
#[derive(Debug, Clone)]
pub struct EventWriter {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    session_id: String,
    file_lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                path: path.into(),
                session_id: session_id.into(),
                file_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Session-level event with no cycle attached.
    pub fn record(&self, event: &Event) -> anyhow::Result<Value> {
        self.append(None, event)
    }

    pub fn record_cycle(&self, epoch: u64, event: &Event) -> anyhow::Result<Value> {
        self.append(Some(epoch), event)
    }

    fn append(&self, epoch: Option<u64>, event: &Event) -> anyhow::Result<Value> {
        let line = self.stamp(epoch, event)?;
        let encoded = serde_json::to_string(&line)?;

        if let Some(parent) = self.shared.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let _held = self
            .shared
            .file_lock
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.shared.path)
            .with_context(|| format!("failed to open {}", self.shared.path.display()))?;
        writeln!(file, "{encoded}")?;
        Ok(line)
    }

    fn stamp(&self, epoch: Option<u64>, event: &Event) -> anyhow::Result<Value> {
        let mut fields = match serde_json::to_value(event)? {
            Value::Object(fields) => fields,
            other => return Err(anyhow!("event serialized to non-object {other}")),
        };
        let mut line = Map::new();
        if let Some(kind) = fields.remove("type") {
            line.insert("type".to_string(), kind);
        }
        line.insert(
            "session_id".to_string(),
            Value::String(self.shared.session_id.clone()),
        );
        line.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        if let Some(epoch) = epoch {
            line.insert("epoch".to_string(), Value::from(epoch));
        }
        line.extend(fields);
        Ok(Value::Object(line))
    }
}
