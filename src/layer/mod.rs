//! `tracing` integration.
//!
//! [`ObserverLayer`] is a `tracing-subscriber` layer that forwards every
//! event to the observer of its level, keyed by the formatted message.
//! Event and span fields are captured as values, JSON marshaling happens
//! only if a sample is exported.
//!
//! ```
//! use logz::core::Config;
//! use logz::layer::LevelObservers;
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let observers = LevelObservers::new(Config::default());
//! let subscriber = tracing_subscriber::registry().with(observers.layer());
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::warn!(attempt = 3, "upstream timeout");
//! });
//!
//! let warn = observers.get(&tracing::Level::WARN);
//! assert_eq!(warn.find("upstream timeout").unwrap().count, 1);
//! ```

use crate::core::Config;
use crate::observer::{Observe, Observer};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Levels in ascending severity, one observer each.
pub const LEVELS: [Level; 5] = [Level::TRACE, Level::DEBUG, Level::INFO, Level::WARN, Level::ERROR];

fn level_index(level: &Level) -> usize {
    match *level {
        Level::TRACE => 0,
        Level::DEBUG => 1,
        Level::INFO => 2,
        Level::WARN => 3,
        Level::ERROR => 4,
    }
}

/// One observer per tracing level, named after the level.
#[derive(Clone)]
pub struct LevelObservers {
    observers: Arc<[Arc<Observer>; 5]>,
}

impl LevelObservers {
    /// Create observers sharing `config`, each named after its level
    pub fn new(config: Config) -> Self {
        let observers = LEVELS.map(|level| {
            Arc::new(Observer::new(Config {
                name: level.as_str().to_string(),
                ..config.clone()
            }))
        });

        Self {
            observers: Arc::new(observers),
        }
    }

    /// Observer for `level`
    pub fn get(&self, level: &Level) -> &Arc<Observer> {
        &self.observers[level_index(level)]
    }

    /// All observers in ascending severity
    pub fn all(&self) -> Vec<Arc<Observer>> {
        self.observers.to_vec()
    }

    /// Layer feeding these observers
    pub fn layer(&self) -> ObserverLayer<Observer> {
        ObserverLayer::new(self.observers.as_ref().clone())
    }
}

/// Layer dispatching events to per-level sinks.
pub struct ObserverLayer<O> {
    levels: Arc<[Arc<O>; 5]>,
}

impl<O> Clone for ObserverLayer<O> {
    fn clone(&self) -> Self {
        Self {
            levels: Arc::clone(&self.levels),
        }
    }
}

impl<O: Observe + 'static> ObserverLayer<O> {
    /// Create a layer from sinks ordered like [`LEVELS`]
    pub fn new(levels: [Arc<O>; 5]) -> Self {
        Self {
            levels: Arc::new(levels),
        }
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanFields(Vec<(&'static str, Value)>);

struct FieldVisitor<'a> {
    message: Option<String>,
    fields: &'a mut Vec<(&'static str, Value)>,
}

impl<'a> FieldVisitor<'a> {
    fn new(fields: &'a mut Vec<(&'static str, Value)>) -> Self {
        Self {
            message: None,
            fields,
        }
    }

    fn record(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == field.name()) {
            // Re-recorded span field
            slot.1 = value;
        } else {
            self.fields.push((field.name(), value));
        }
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.record(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record(field, value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{:?}", value).into());
    }
}

/// Built-in keys of an exported event, user fields never replace them.
const RESERVED_KEYS: [&str; 3] = ["level", "target", "msg"];

/// Captured event, marshaled as a flat JSON object on export.
///
/// On duplicate keys the event's own field wins, then inner spans win
/// over outer ones. User fields named `level`, `target` or `msg` are dropped.
pub struct EventRecord {
    level: Level,
    target: &'static str,
    message: String,
    fields: Vec<(&'static str, Value)>,
    /// Innermost span first
    span_fields: Vec<(&'static str, Value)>,
}

impl EventRecord {
    /// Formatted message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Event level
    pub fn level(&self) -> Level {
        self.level
    }
}

impl Serialize for EventRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("level", self.level.as_str())?;
        map.serialize_entry("target", self.target)?;
        map.serialize_entry("msg", &self.message)?;

        let mut seen: Vec<&str> = RESERVED_KEYS.to_vec();
        for (key, value) in self.fields.iter().chain(&self.span_fields) {
            if seen.contains(key) {
                continue;
            }
            seen.push(*key);
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<S, O> Layer<S> for ObserverLayer<O>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    O: Observe + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut fields = Vec::new();
        attrs.record(&mut FieldVisitor::new(&mut fields));
        span.extensions_mut().replace(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            values.record(&mut FieldVisitor::new(fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();

        let mut fields = Vec::new();
        let mut visitor = FieldVisitor::new(&mut fields);
        event.record(&mut visitor);
        let message = visitor.message.take().unwrap_or_else(|| meta.name().to_string());

        let mut span_fields = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(SpanFields(recorded)) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(recorded.iter().cloned());
                }
            }
        }

        let observer = &self.levels[level_index(meta.level())];
        let record = EventRecord {
            level: *meta.level(),
            target: meta.target(),
            message,
            fields,
            span_fields,
        };
        let key = record.message.clone();

        observer.observe_shared(&key, Arc::new(record));
    }
}
