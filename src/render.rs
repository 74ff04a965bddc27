//! Representations selected by the path suffix: JSON as-is, CSV and HTML as flat tables.

use crate::router::Format;
use serde_json::Value;
use std::collections::BTreeSet;

/// Rows of a body: the `results` of a list envelope, otherwise the object itself.
fn rows(body: &Value) -> Vec<&serde_json::Map<String, Value>> {
    match body.get("results").and_then(Value::as_array) {
        Some(results) => results.iter().filter_map(Value::as_object).collect(),
        None => body.as_object().into_iter().collect(),
    }
}

fn columns(rows: &[&serde_json::Map<String, Value>]) -> Vec<String> {
    let keys: BTreeSet<&str> = rows.iter().flat_map(|r| r.keys().map(String::as_str)).collect();
    let mut cols = Vec::with_capacity(keys.len());
    if keys.contains("id") {
        cols.push("id".to_string());
    }
    cols.extend(keys.into_iter().filter(|k| *k != "id").map(String::from));
    cols
}

fn cell(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) if items.iter().all(|i| i.get("name").and_then(Value::as_str).is_some()) => items
            .iter()
            .filter_map(|i| i.get("name").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(";"),
        Some(other) => other.to_string(),
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn to_csv(body: &Value) -> String {
    let rows = rows(body);
    let cols = columns(&rows);
    let mut out = String::new();
    out.push_str(&cols.iter().map(|c| csv_escape(c)).collect::<Vec<_>>().join(","));
    out.push_str("\r\n");
    for row in &rows {
        let line: Vec<String> = cols.iter().map(|c| csv_escape(&cell(row.get(c)))).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

pub fn to_html(body: &Value, title: &str) -> String {
    let rows = rows(body);
    let cols = columns(&rows);
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>");
    out.push_str(&html_escape(title));
    out.push_str("</title></head><body>\n");
    if let Some(rs) = body.pointer("/metadata/resultset") {
        out.push_str(&format!(
            "<p>count: {} offset: {} limit: {}</p>\n",
            rs["count"], rs["offset"], rs["limit"]
        ));
    }
    out.push_str("<table>\n<thead><tr>");
    for c in &cols {
        out.push_str(&format!("<th>{}</th>", html_escape(c)));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in &rows {
        out.push_str("<tr>");
        for c in &cols {
            out.push_str(&format!("<td>{}</td>", html_escape(&cell(row.get(c)))));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n</body></html>\n");
    out
}

/// Serialize `body` in `format`. `title` names the HTML document.
pub fn render(body: &Value, format: Format, title: &str) -> Result<String, serde_json::Error> {
    Ok(match format {
        Format::Json => serde_json::to_string(body)?,
        Format::Csv => to_csv(body),
        Format::Html => to_html(body, title),
    })
}
