//! HTTP page exposing observed messages.
//!
//! `GET /` lists the message keys of one observer with their first and
//! last occurrence, count and time distribution. Query parameters:
//!
//! - `level`: name of the observer to show, the first one otherwise
//! - `msg`: message key whose samples are listed
//! - `other`: any non-empty value lists samples of grouped messages
//! - `format=json`: same data as JSON instead of HTML

use crate::core::{LogzError, Result};
use crate::observer::{Bucket, Entry, Observer};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

#[derive(Clone)]
struct PageState {
    observers: Arc<[Arc<Observer>]>,
}

/// Query parameters of the page.
#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    level: Option<String>,
    msg: Option<String>,
    other: Option<String>,
    format: Option<String>,
}

/// Everything the page shows.
#[derive(Debug, Serialize)]
struct PageData {
    level: String,
    levels: Vec<String>,
    entries: Vec<Entry>,
    other: Entry,
    details: Option<Entry>,
}

/// Build the page router over `observers`.
///
/// Observer names are the selectable levels, unnamed observers can only be
/// shown as the default (first) one.
pub fn router(observers: Vec<Arc<Observer>>) -> Result<Router> {
    if observers.is_empty() {
        return Err(LogzError::NoObservers);
    }

    let state = PageState {
        observers: observers.into(),
    };

    Ok(Router::new()
        .route("/", get(page_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}

impl PageState {
    fn select(&self, level: Option<&str>) -> &Arc<Observer> {
        level
            .filter(|l| !l.is_empty())
            .and_then(|l| self.observers.iter().find(|o| o.name() == l))
            .unwrap_or(&self.observers[0])
    }

    fn collect(&self, params: &PageQuery) -> PageData {
        let observer = self.select(params.level.as_deref());

        let mut entries = observer.entries();
        entries.sort_by(|a, b| a.message.cmp(&b.message));

        let details = match params.msg.as_deref().filter(|m| !m.is_empty()) {
            Some(msg) => observer.find(msg),
            None if params.other.as_deref().map_or(false, |o| !o.is_empty()) => {
                Some(observer.other(true))
            },
            None => None,
        };

        PageData {
            level: observer.name().to_string(),
            levels: self
                .observers
                .iter()
                .map(|o| o.name().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            entries,
            other: observer.other(false),
            details,
        }
    }
}

/// GET / - Observed messages of one level
async fn page_handler(
    State(state): State<PageState>,
    Query(params): Query<PageQuery>,
) -> Response {
    let data = state.collect(&params);

    let rendered = if params.format.as_deref() == Some("json") {
        serde_json::to_string_pretty(&data)
            .map_err(LogzError::from)
            .map(|body| ([(header::CONTENT_TYPE, "application/json")], body).into_response())
    } else {
        render_page(&data).map(|html| Html(html).into_response())
    };

    match rendered {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, level = %data.level, "Failed to render observed messages");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        },
    }
}

const STYLE: &str = r"
body{margin:0;padding:2em;font-family:sans-serif}
table{border-collapse:collapse;margin:1em 0}
td,th{padding:.5em 1em;border-bottom:1px solid #cbcbcb;text-align:left;vertical-align:top}
thead{background-color:#e0e0e0}
nav a{display:inline-block;padding:.5em 1em;color:#777;text-decoration:none}
nav a.selected{color:#000;background-color:#eee}
pre{margin:0}
.hist{height:100px;padding:0;position:relative;overflow:hidden}
tr .hist{height:20px}
.hist i{margin:0;width:10px;background:rgb(66,184,221);position:relative;display:inline-block;outline:1px solid white}
";

fn render_page(data: &PageData) -> Result<String> {
    let mut out = String::with_capacity(4096);
    let level = urlencoding::encode(&data.level);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<title>Logz</title>\n");
    out.push_str("<meta charset=\"UTF-8\">\n<style>");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n<nav>\n");

    for name in &data.levels {
        let class = if *name == data.level { " class=\"selected\"" } else { "" };
        let _ = writeln!(
            out,
            "<a href=\"?level={}\"{}>{}</a>",
            urlencoding::encode(name),
            class,
            escape_html(name)
        );
    }
    out.push_str("</nav>\n");

    out.push_str("<table>\n<thead><tr><th>Message</th><th>First</th><th>Last</th><th>Count</th></tr></thead>\n<tbody>\n");
    for entry in &data.entries {
        let _ = writeln!(
            out,
            "<tr><td><a href=\"?msg={}&amp;level={}#samples\">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>",
            urlencoding::encode(&entry.message),
            level,
            escape_html(&entry.message),
            format_time(entry.first),
            format_time(entry.last),
            entry.count
        );
        push_histogram_row(&mut out, &entry.buckets);
    }
    if data.entries.is_empty() {
        out.push_str("<tr><td colspan=\"4\">no rows</td></tr>\n");
    }
    if data.other.count > 0 {
        let _ = writeln!(
            out,
            "<tr><td><a href=\"?other=1&amp;level={}#samples\">Other Messages</a></td><td></td><td>{}</td><td>{}</td></tr>",
            level,
            format_time(data.other.last),
            data.other.count
        );
        push_histogram_row(&mut out, &data.other.buckets);
    }
    out.push_str("</tbody>\n</table>\n");

    if let Some(details) = data.details.as_ref().filter(|d| d.count > 0) {
        render_details(&mut out, details)?;
    }

    out.push_str("</body>\n</html>\n");
    Ok(out)
}

fn render_details(out: &mut String, details: &Entry) -> Result<()> {
    let title = if details.message.is_empty() {
        "Other Messages".to_string()
    } else {
        escape_html(&details.message)
    };
    let _ = writeln!(out, "<h2>{}</h2>", title);
    out.push_str(&render_histogram(&details.buckets));

    out.push_str("\n<h3 id=\"samples\">Samples</h3>\n<table>\n");
    out.push_str("<thead><tr><th>When</th><th>Message</th><th>Data</th></tr></thead>\n<tbody>\n");
    for sample in &details.samples {
        let data = sample
            .data_json()
            .and_then(|v| serde_json::to_string_pretty(&v))
            .map_err(|e| LogzError::render(format!("sample of {:?}: {}", sample.msg, e)))?;
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td><pre><code>{}</code></pre></td></tr>",
            format_time(Some(sample.time)),
            escape_html(&sample.msg),
            escape_html(&data)
        );
    }
    out.push_str("</tbody>\n</table>\n");

    Ok(())
}

fn push_histogram_row(out: &mut String, buckets: &[Bucket]) {
    if buckets.is_empty() {
        return;
    }
    let _ = writeln!(out, "<tr><td colspan=\"4\">{}</td></tr>", render_histogram(buckets));
}

/// Render a time distribution as HTML bars.
///
/// Bar width is proportional to the bucket's time span (at least one
/// second), bar height to its rate relative to the busiest bucket.
pub fn render_histogram(buckets: &[Bucket]) -> String {
    let width_of = |b: &Bucket| {
        (b.to - b.from)
            .num_nanoseconds()
            .unwrap_or(i64::MAX)
            .max(NANOS_PER_SECOND) as f64
    };

    let mut max_rate = 0.0_f64;
    let mut total_width = 0.0_f64;
    for b in buckets {
        let width = width_of(b);
        max_rate = max_rate.max(b.count as f64 / width);
        total_width += width;
    }

    let mut out = String::from("<div class=\"hist\">");
    for b in buckets {
        let width = width_of(b);
        let rate = b.count as f64 / width;
        let height = if max_rate > 0.0 { 100.0 * rate / max_rate } else { 0.0 };
        let share = (100.0 * width * 100.0 / total_width).floor() / 100.0;

        let _ = write!(
            out,
            "<i title=\"{} to {}, count: {}\" style=\"width:{:.2}%;height:{:.1}%\"></i>",
            format_time(Some(b.from)),
            format_time(Some(b.to)),
            b.count,
            share,
            height
        );
    }
    out.push_str("</div>");
    out
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
