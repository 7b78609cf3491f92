//! Context-scoped logging facade.
//!
//! [`ContextObserver`] wraps a [`ContextLogger`] and observes every logged
//! message in one observer per semantic level. Ambient fields travel in an
//! explicit [`Context`] and are merged with the call's own fields only when
//! a sample is marshaled, not when the message is logged.

use crate::core::Config;
use crate::observer::Observer;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Semantic log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextLevel {
    /// Diagnostics
    Debug,
    /// Routine events
    Info,
    /// Notable events above info
    Important,
    /// Recoverable problems, shown as "Warning"
    Warn,
    /// Failures
    Error,
}

impl ContextLevel {
    /// Levels in ascending severity
    pub const ALL: [ContextLevel; 5] = [
        ContextLevel::Debug,
        ContextLevel::Info,
        ContextLevel::Important,
        ContextLevel::Warn,
        ContextLevel::Error,
    ];

    /// Display name, also the name of the level's observer
    pub fn name(&self) -> &'static str {
        match self {
            ContextLevel::Debug => "Debug",
            ContextLevel::Info => "Info",
            ContextLevel::Important => "Important",
            ContextLevel::Warn => "Warning",
            ContextLevel::Error => "Error",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Error carrying structured fields of its own.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StructuredError {
    message: String,
    fields: Vec<(String, Value)>,
}

impl StructuredError {
    /// Create an error with a message
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Attach a field
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Attached fields
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

/// Value of a logged field.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Plain JSON value
    Value(Value),
    /// Error, its own fields are merged into the payload
    Error(Arc<StructuredError>),
}

/// Key/value pair attached to a log call or a context.
#[derive(Debug, Clone)]
pub struct Field {
    key: String,
    value: FieldValue,
}

impl Field {
    /// Field with a plain value
    pub fn new<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Value(value.into()),
        }
    }

    /// Field holding an error
    pub fn error<K: Into<String>>(key: K, err: StructuredError) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Error(Arc::new(err)),
        }
    }

    /// Field key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field value
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    fn merge_into(&self, map: &mut Map<String, Value>) {
        match &self.value {
            FieldValue::Value(v) => {
                map.insert(self.key.clone(), v.clone());
            },
            FieldValue::Error(err) => {
                for (k, v) in err.fields() {
                    map.insert(k.clone(), v.clone());
                }
                map.insert(self.key.clone(), Value::String(err.to_string()));
            },
        }
    }
}

/// Immutable set of ambient fields, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Context {
    fields: Arc<Vec<Field>>,
}

impl Context {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived context with one more field
    #[must_use]
    pub fn with_field<K: Into<String>, V: Into<Value>>(&self, key: K, value: V) -> Self {
        let mut fields = Vec::with_capacity(self.fields.len() + 1);
        fields.extend(self.fields.iter().cloned());
        fields.push(Field::new(key, value));

        Self {
            fields: Arc::new(fields),
        }
    }

    /// Ambient fields in insertion order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Payload merging call fields with ambient context fields when marshaled.
pub struct Tuples {
    ctx: Context,
    fields: Vec<Field>,
}

impl Tuples {
    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for field in self.fields.iter().chain(self.ctx.fields()) {
            field.merge_into(&mut map);
        }
        map
    }
}

impl Serialize for Tuples {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

/// Logger receiving context-scoped calls.
pub trait ContextLogger: Send + Sync {
    /// Log one message
    fn log(&self, level: ContextLevel, ctx: &Context, msg: &str, fields: &[Field]);
}

/// Logger discarding everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl ContextLogger for NoOpLogger {
    fn log(&self, _level: ContextLevel, _ctx: &Context, _msg: &str, _fields: &[Field]) {}
}

/// Logger emitting `tracing` events with the merged fields as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ContextLogger for TracingLogger {
    fn log(&self, level: ContextLevel, ctx: &Context, msg: &str, fields: &[Field]) {
        let merged = Tuples {
            ctx: ctx.clone(),
            fields: fields.to_vec(),
        }
        .to_map();
        let fields = Value::Object(merged);

        match level {
            ContextLevel::Debug => tracing::debug!(%fields, "{}", msg),
            ContextLevel::Info => tracing::info!(%fields, "{}", msg),
            ContextLevel::Important => tracing::info!(important = true, %fields, "{}", msg),
            ContextLevel::Warn => tracing::warn!(%fields, "{}", msg),
            ContextLevel::Error => tracing::error!(%fields, "{}", msg),
        }
    }
}

/// Observes context-scoped log calls and forwards them to a logger.
pub struct ContextObserver<L> {
    observers: Arc<[Arc<Observer>; 5]>,
    logger: L,
}

impl<L: Clone> Clone for ContextObserver<L> {
    fn clone(&self) -> Self {
        Self {
            observers: Arc::clone(&self.observers),
            logger: self.logger.clone(),
        }
    }
}

impl<L: ContextLogger> ContextObserver<L> {
    /// Create observers sharing `config`, one per [`ContextLevel`]
    pub fn new(logger: L, config: Config) -> Self {
        let observers = ContextLevel::ALL.map(|level| {
            Arc::new(Observer::new(Config {
                name: level.name().to_string(),
                ..config.clone()
            }))
        });

        Self {
            observers: Arc::new(observers),
            logger,
        }
    }

    /// Copy with another logger, observers are shared
    pub fn with_logger<M: ContextLogger>(&self, logger: M) -> ContextObserver<M> {
        ContextObserver {
            observers: Arc::clone(&self.observers),
            logger,
        }
    }

    /// Observers in ascending severity
    pub fn level_observers(&self) -> Vec<Arc<Observer>> {
        self.observers.to_vec()
    }

    /// Observer of `level`
    pub fn observer(&self, level: ContextLevel) -> &Arc<Observer> {
        &self.observers[level.index()]
    }

    /// Log a debug message
    pub fn debug(&self, ctx: &Context, msg: &str, fields: &[Field]) {
        self.log(ContextLevel::Debug, ctx, msg, fields);
    }

    /// Log an informational message
    pub fn info(&self, ctx: &Context, msg: &str, fields: &[Field]) {
        self.log(ContextLevel::Info, ctx, msg, fields);
    }

    /// Log important information
    pub fn important(&self, ctx: &Context, msg: &str, fields: &[Field]) {
        self.log(ContextLevel::Important, ctx, msg, fields);
    }

    /// Log a warning
    pub fn warn(&self, ctx: &Context, msg: &str, fields: &[Field]) {
        self.log(ContextLevel::Warn, ctx, msg, fields);
    }

    /// Log an error
    pub fn error(&self, ctx: &Context, msg: &str, fields: &[Field]) {
        self.log(ContextLevel::Error, ctx, msg, fields);
    }
}

impl<L: ContextLogger> ContextLogger for ContextObserver<L> {
    fn log(&self, level: ContextLevel, ctx: &Context, msg: &str, fields: &[Field]) {
        self.observers[level.index()].observe_message(
            msg,
            Tuples {
                ctx: ctx.clone(),
                fields: fields.to_vec(),
            },
        );
        self.logger.log(level, ctx, msg, fields);
    }
}
