//! FileClient - appends telemetry writes to a JSON lines file

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use contracts::{ttl_millis, EventKey, EventPayload, Result, TelemetryClient, TelemetryError};
use serde::Serialize;
use tracing::{debug, error, instrument};

/// Configuration for FileClient
#[derive(Debug, Clone)]
pub struct FileClientConfig {
    /// Output file, created if missing and appended to otherwise
    pub path: PathBuf,
}

impl FileClientConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> io::Result<Self> {
        let path = params.get("path").map(PathBuf::from).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "missing required param 'path'")
        })?;

        Ok(Self { path })
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Hit {
        name: &'a str,
    },
    HitRemoved {
        name: &'a str,
    },
    Metric {
        name: &'a str,
        variation: &'a str,
    },
    MetricRemoved {
        name: &'a str,
        variation: &'a str,
    },
    Event {
        event_type: &'a str,
        name: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        ttl_ms: Option<u64>,
    },
    Exception {
        exception_type: &'a str,
    },
    Dependency {
        interface_type: &'a str,
        resolved_times: u64,
    },
}

#[derive(Serialize)]
struct Line<'a> {
    timestamp: String,
    client: &'a str,
    #[serde(flatten)]
    record: Record<'a>,
}

/// Write-only client that appends one JSON object per write
///
/// Event payloads are opaque and not written; only the key and TTL are.
pub struct FileClient {
    name: String,
    path: PathBuf,
    writer: Mutex<LineWriter<File>>,
}

impl FileClient {
    /// Create a new FileClient
    pub fn new(name: impl Into<String>, config: FileClientConfig) -> io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            writer: Mutex::new(LineWriter::new(file)),
        })
    }

    /// Create from params map (for resolver)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> io::Result<Self> {
        let config = FileClientConfig::from_params(params)?;
        Self::new(name, config)
    }

    /// Output file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered output
    pub fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TelemetryError::backend(&self.name, "writer lock poisoned"))?;
        writer.flush()?;
        Ok(())
    }

    fn append(&self, record: Record<'_>) -> Result<()> {
        let line = Line {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            client: &self.name,
            record,
        };

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TelemetryError::backend(&self.name, "writer lock poisoned"))?;

        let written = serde_json::to_writer(&mut *writer, &line)
            .map_err(io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));

        written.map_err(|e| {
            error!(client = %self.name, path = %self.path.display(), error = %e, "Write failed");
            TelemetryError::backend(&self.name, e.to_string())
        })
    }
}

impl TelemetryClient for FileClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn track_hit(&self, name: &str) -> Result<()> {
        self.append(Record::Hit { name })
    }

    fn get_hit(&self, _name: &str) -> Result<u64> {
        Ok(0)
    }

    fn remove_hit(&self, name: &str) -> Result<()> {
        self.append(Record::HitRemoved { name })
    }

    fn track_metric(&self, name: &str, variation: &str) -> Result<()> {
        self.append(Record::Metric { name, variation })
    }

    fn get_metric(&self, _name: &str, _variation: &str) -> Result<i64> {
        Ok(0)
    }

    fn remove_metric(&self, name: &str, variation: &str) -> Result<()> {
        self.append(Record::MetricRemoved { name, variation })
    }

    #[instrument(name = "file_client_track_event", skip(self, _payload), fields(client = %self.name))]
    fn track_event(&self, key: &EventKey, _payload: EventPayload) -> Result<()> {
        self.append(Record::Event {
            event_type: key.type_name,
            name: &key.name,
            ttl_ms: None,
        })
    }

    #[instrument(name = "file_client_track_event_with_ttl", skip(self, _payload), fields(client = %self.name))]
    fn track_event_with_ttl(
        &self,
        key: &EventKey,
        _payload: EventPayload,
        ttl: Duration,
    ) -> Result<()> {
        self.append(Record::Event {
            event_type: key.type_name,
            name: &key.name,
            ttl_ms: Some(ttl_millis(ttl)),
        })
    }

    fn get_event(&self, _key: &EventKey) -> Result<Option<EventPayload>> {
        Ok(None)
    }

    fn track_exception(&self, exception_type: &str) -> Result<()> {
        self.append(Record::Exception { exception_type })
    }

    fn track_dependency(&self, interface_type: &str, resolved_times: u64) -> Result<()> {
        self.append(Record::Dependency {
            interface_type,
            resolved_times,
        })
    }
}

impl Drop for FileClient {
    fn drop(&mut self) {
        if let Ok(writer) = self.writer.get_mut() {
            if let Err(e) = writer.flush() {
                error!(client = %self.name, error = %e, "Flush failed on drop");
            }
        }
        debug!(client = %self.name, "FileClient closed");
    }
}
