use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

const RESERVED_KEYS: [&str; 4] = ["@timestamp", "message", "logger", "level"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

/// A single significant action, e.g. a file upload, with its event-specific
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub event: String,
    pub fields: Map<String, Value>,
}

impl LogRecord {
    pub fn new(level: Level, event: impl Into<String>) -> Self {
        Self {
            level,
            event: event.into(),
            fields: Map::new(),
        }
    }

    pub fn info(event: impl Into<String>) -> Self {
        Self::new(Level::Info, event)
    }

    pub fn error(event: impl Into<String>) -> Self {
        Self::new(Level::Error, event)
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// `{"event": ..., ...fields}`, the body of the record.
    pub fn body(&self) -> Map<String, Value> {
        let mut body = Map::with_capacity(self.fields.len() + 1);
        body.insert("event".to_string(), Value::String(self.event.clone()));
        for (key, value) in &self.fields {
            body.insert(key.clone(), value.clone());
        }
        body
    }

    pub fn to_document(&self, logger: &str, timestamp: DateTime<Utc>) -> LogDocument {
        let body = self.body();
        let message = Value::Object(body.clone()).to_string();
        let fields = body
            .into_iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        LogDocument {
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            message,
            logger: logger.to_string(),
            level: self.level,
            fields,
        }
    }
}

/// The JSON document indexed by the search cluster.
#[derive(Debug, Clone, Serialize)]
pub struct LogDocument {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub message: String,
    pub logger: String,
    pub level: Level,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_document_shape() {
        let record = LogRecord::info("FileUploaded")
            .field("filename", "sales.csv")
            .field("total_sales", 300.0)
            .field("start_date", Option::<String>::None);
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let document = serde_json::to_value(record.to_document("data-upload", timestamp)).unwrap();

        assert_eq!(document["@timestamp"], "2024-01-02T03:04:05.000000Z");
        assert_eq!(document["logger"], "data-upload");
        assert_eq!(document["level"], "INFO");
        assert_eq!(document["event"], "FileUploaded");
        assert_eq!(document["filename"], "sales.csv");
        assert_eq!(document["total_sales"], 300.0);
        assert_eq!(document["start_date"], Value::Null);

        let message: Value =
            serde_json::from_str(document["message"].as_str().unwrap()).unwrap();
        assert_eq!(
            message,
            json!({
                "event": "FileUploaded",
                "filename": "sales.csv",
                "total_sales": 300.0,
                "start_date": null
            })
        );
    }

    #[test]
    fn test_reserved_fields_stay_in_message_only() {
        let record = LogRecord::error("UploadError").field("level", "bogus");
        let document =
            serde_json::to_value(record.to_document("svc", Utc::now())).unwrap();

        assert_eq!(document["level"], "ERROR");
        assert!(document["message"].as_str().unwrap().contains("bogus"));
    }
}
