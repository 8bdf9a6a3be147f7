//! Sink task configuration.
//!
//! [`SinkTaskSpec`] is the raw YAML shape; [`SinkTaskSpec::validate`] turns it
//! into the immutable [`SinkTaskConfig`] a task runs with.
//!
//! # Example YAML Configuration
//!
//! ```yaml
//! name: "orders-sink"
//! collection: "documents"
//! topic_collections:
//!   orders: "orders"
//! tolerance: all
//! source:
//!   brokers: "localhost:9092"
//!   group_id: "docsink"
//!   topics: ["orders", "payments"]
//! store:
//!   type: local_dir
//!   path: "./data"
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// Whether write failures stop the task.
///
/// Parsed once at configuration time; a task never changes its mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ToleranceMode {
    /// Any write failure is fatal.
    #[default]
    None,
    /// Write failures are logged, counted and skipped.
    All,
}

impl FromStr for ToleranceMode {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(ToleranceMode::None),
            "all" => Ok(ToleranceMode::All),
            other => Err(SinkError::Config(format!(
                "unknown tolerance '{other}', expected 'none' or 'all'"
            ))),
        }
    }
}

impl TryFrom<String> for ToleranceMode {
    type Error = SinkError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ToleranceMode> for String {
    fn from(mode: ToleranceMode) -> Self {
        mode.to_string()
    }
}

impl std::fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToleranceMode::None => write!(f, "none"),
            ToleranceMode::All => write!(f, "all"),
        }
    }
}

/// How a document's `id` is chosen before upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// The value already carries its `id`; documents are written untouched.
    #[default]
    ProvidedInValue,
    /// `id` is set to `{topic}-{partition}-{offset}`.
    KafkaMetadata,
}

/// How Kafka payload bytes are turned into inbound values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    /// Schemaless JSON: objects become maps, everything else primitives.
    #[default]
    Json,
    /// UTF-8 text passed through as a primitive string.
    String,
    /// Raw bytes, parsed as a JSON document during normalization.
    Bytes,
}

/// Topic to collection routes, either as a YAML mapping or in the
/// connector-style inline form `"topic1#coll1,topic2#coll2"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicCollectionsSpec {
    Map(HashMap<String, String>),
    Inline(String),
}

impl Default for TopicCollectionsSpec {
    fn default() -> Self {
        TopicCollectionsSpec::Map(HashMap::new())
    }
}

impl TopicCollectionsSpec {
    fn resolve(&self) -> Result<HashMap<String, String>, SinkError> {
        match self {
            TopicCollectionsSpec::Map(map) => {
                for (topic, collection) in map {
                    if topic.trim().is_empty() || collection.trim().is_empty() {
                        return Err(SinkError::Config(format!(
                            "empty topic or collection in route '{topic}' -> '{collection}'"
                        )));
                    }
                }
                Ok(map.clone())
            }
            TopicCollectionsSpec::Inline(s) => parse_topic_collections(s),
        }
    }
}

/// Parses `"topic1#coll1,topic2#coll2"` into a route map.
///
/// Blank entries are ignored. Topics must be unique.
pub fn parse_topic_collections(s: &str) -> Result<HashMap<String, String>, SinkError> {
    let mut routes = HashMap::new();
    for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (topic, collection) = entry
            .split_once('#')
            .map(|(t, c)| (t.trim(), c.trim()))
            .filter(|(t, c)| !t.is_empty() && !c.is_empty())
            .ok_or_else(|| {
                SinkError::Config(format!(
                    "invalid topic route '{entry}', expected 'topic#collection'"
                ))
            })?;
        if routes.insert(topic.to_string(), collection.to_string()).is_some() {
            return Err(SinkError::Config(format!("duplicate route for topic '{topic}'")));
        }
    }
    Ok(routes)
}

/// Configuration for the Kafka consumer feeding the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaSourceSpec {
    /// Comma-separated list of Kafka broker addresses
    pub brokers: String,

    /// Kafka consumer group ID
    pub group_id: String,

    /// Topics to consume from
    pub topics: Vec<String>,

    #[serde(default)]
    pub value_format: ValueFormat,

    /// Maximum number of records handed to the task per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum time to wait for a batch to fill up
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    /// Extra librdkafka properties, applied after the defaults
    #[serde(default)]
    pub consumer_properties: HashMap<String, String>,
}

fn default_batch_size() -> usize {
    500
}

fn default_batch_timeout_ms() -> u64 {
    1000
}

/// Connection settings for an S3-compatible document bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StoreSpec {
    pub bucket: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    #[serde(default)]
    pub prefix: Option<String>,
    /// Allow plain HTTP endpoints (local MinIO)
    #[serde(default)]
    pub allow_http: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreSpec {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "local_dir")]
    LocalDir { path: String },
    #[serde(rename = "s3")]
    S3(S3StoreSpec),
    #[serde(rename = "stdout")]
    Stdout,
}

/// Complete sink task specification loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkTaskSpec {
    /// Human-readable name of the task
    pub name: String,

    /// Default collection for topics without an explicit route
    #[serde(default)]
    pub collection: Option<String>,

    #[serde(default)]
    pub topic_collections: TopicCollectionsSpec,

    #[serde(default)]
    pub tolerance: ToleranceMode,

    #[serde(default)]
    pub id_strategy: IdStrategy,

    #[serde(default)]
    pub source: Option<KafkaSourceSpec>,

    pub store: StoreSpec,
}

impl SinkTaskSpec {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SinkError> {
        serde_yaml::from_str(yaml).map_err(|e| SinkError::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SinkError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Checks the specification and builds the task configuration.
    ///
    /// Every subscribed topic must resolve to a collection; an unroutable
    /// topic is reported here rather than on its first record.
    pub fn validate(&self) -> Result<SinkTaskConfig, SinkError> {
        if self.name.trim().is_empty() {
            return Err(SinkError::Config("task name must not be empty".into()));
        }
        let default = match self.collection.as_deref().map(str::trim) {
            Some("") => {
                return Err(SinkError::Config("default collection must not be empty".into()));
            }
            other => other.map(str::to_string),
        };
        let router = CollectionRouter::new(default, self.topic_collections.resolve()?);

        if let Some(source) = &self.source {
            if source.topics.is_empty() {
                return Err(SinkError::Config("source must subscribe to at least one topic".into()));
            }
            if source.batch_size == 0 {
                return Err(SinkError::Config("batch_size must be greater than zero".into()));
            }
            if source.batch_timeout_ms == 0 {
                return Err(SinkError::Config("batch_timeout_ms must be greater than zero".into()));
            }
            router.ensure_routable(source.topics.iter().map(String::as_str))?;
        }

        Ok(SinkTaskConfig {
            name: self.name.clone(),
            router,
            tolerance: self.tolerance,
            id_strategy: self.id_strategy,
        })
    }
}

/// Resolves the collection a topic's records are written to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRouter {
    default: Option<String>,
    routes: HashMap<String, String>,
}

impl CollectionRouter {
    pub fn new(default: Option<String>, routes: HashMap<String, String>) -> Self {
        Self { default, routes }
    }

    /// Router with a default collection and no explicit routes.
    pub fn with_default(collection: &str) -> Self {
        Self::new(Some(collection.to_string()), HashMap::new())
    }

    pub fn route(mut self, topic: &str, collection: &str) -> Self {
        self.routes.insert(topic.to_string(), collection.to_string());
        self
    }

    /// Explicit route first, then the default collection.
    pub fn resolve(&self, topic: &str) -> Result<&str, SinkError> {
        self.routes
            .get(topic)
            .or(self.default.as_ref())
            .map(String::as_str)
            .ok_or_else(|| SinkError::Routing {
                topic: topic.to_string(),
            })
    }

    pub fn ensure_routable<'a>(&self, topics: impl IntoIterator<Item = &'a str>) -> Result<(), SinkError> {
        for topic in topics {
            self.resolve(topic)?;
        }
        Ok(())
    }

    pub fn default_collection(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// Validated, immutable settings of one sink task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkTaskConfig {
    pub name: String,
    pub router: CollectionRouter,
    pub tolerance: ToleranceMode,
    pub id_strategy: IdStrategy,
}

impl SinkTaskConfig {
    pub fn new(name: &str, router: CollectionRouter, tolerance: ToleranceMode) -> Self {
        Self {
            name: name.to_string(),
            router,
            tolerance,
            id_strategy: IdStrategy::default(),
        }
    }

    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }
}
