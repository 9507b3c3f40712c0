//! Message rendering for the mail and chat channels.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde_json::{json, Value};

use crate::alerts::{Alert, AlertOrigin};

/// Fixed UTC offset used for human-readable timestamps.
#[derive(Debug, Clone, Copy)]
pub struct DisplayZone(FixedOffset);

impl DisplayZone {
    /// Zone `minutes` east of UTC; out-of-range offsets fall back to UTC.
    pub fn from_minutes(minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(Self::utc_offset);
        Self(offset)
    }

    pub fn utc() -> Self {
        Self(Self::utc_offset())
    }

    fn utc_offset() -> FixedOffset {
        Utc.fix()
    }

    /// Format a timestamp in this zone.
    pub fn format(&self, ts: &DateTime<Utc>) -> String {
        ts.with_timezone(&self.0)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string()
    }
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self::utc()
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

const STYLE: &str = "\
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background-color: #f0f2f5; margin: 0; padding: 20px; line-height: 1.6; }
.container { max-width: 650px; margin: 0 auto; background-color: #ffffff; border-radius: 12px; overflow: hidden; box-shadow: 0 4px 15px rgba(0,0,0,0.1); }
.header { color: white; padding: 15px 20px; text-align: center; }
.header h2 { margin: 0; font-size: 22px; font-weight: 600; }
.content { padding: 25px; color: #333; }
.alert-box { background-color: #f8f9fa; padding: 15px; border-radius: 5px; margin: 15px 0; }
.alert-title { font-size: 18px; font-weight: 600; margin-bottom: 10px; }
.details { font-size: 14px; color: #555; white-space: pre-wrap; }
.facts { font-size: 13px; color: #555; margin: 10px 0 0 0; padding-left: 18px; }
.footer { text-align: center; padding: 15px; font-size: 12px; color: #888; background-color: #f8f9fa; border-top: 1px solid #eee; }";

/// Render the HTML mail body.
pub fn mail_html(alert: &Alert, zone: &DisplayZone) -> String {
    let color = alert.color();
    let subject = escape_html(&alert.subject());
    let time = escape_html(&zone.format(&alert.timestamp));

    let body = match &alert.origin {
        AlertOrigin::Metric(_) => format!(
            "<p>A server alert has been triggered. Please review the details below:</p>\n\
             <div class=\"alert-box\" style=\"border-left: 5px solid {color};\">\n\
             <div class=\"alert-title\" style=\"color: {color};\">{title}</div>\n\
             <div class=\"details\">{details}\nTime: {time}</div>\n\
             {facts}\
             </div>\n\
             <p>Please investigate and take appropriate action to ensure server stability.</p>",
            color = color,
            title = escape_html(&alert.title),
            details = escape_html(&alert.message),
            time = time,
            facts = facts_html(alert.details.as_ref()),
        ),
        AlertOrigin::Lifecycle { process, kind } => format!(
            "<p>The process <strong>\"{name}\"</strong> (ID: {id}) has experienced the following event:</p>\n\
             <p><span style=\"color: {color}; font-weight: bold;\">{kind}</span> at {time}</p>\n\
             <p>Please take appropriate action if necessary.</p>",
            name = escape_html(&process.name),
            id = process.id,
            color = color,
            kind = kind.as_str().to_uppercase(),
            time = time,
        ),
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <style>\n{style}\n</style>\n</head>\n<body>\n<div class=\"container\">\n\
         <div class=\"header\" style=\"background-color: {color};\"><h2>{subject}</h2></div>\n\
         <div class=\"content\">\n{body}\n</div>\n\
         <div class=\"footer\"><p>This is an automated alert from Sentinel server monitoring</p></div>\n\
         </div>\n</body>\n</html>\n",
        style = STYLE,
        color = color,
        subject = subject,
        body = body,
    )
}

/// Structured alert details as a bullet list; empty when there are none.
fn facts_html(details: Option<&Value>) -> String {
    let Some(Value::Object(map)) = details else {
        return String::new();
    };
    if map.is_empty() {
        return String::new();
    }

    let items: String = map
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) if n.is_f64() => n
                    .as_f64()
                    .map(|f| format!("{:.2}", f))
                    .unwrap_or_else(|| n.to_string()),
                other => other.to_string(),
            };
            format!(
                "<li><strong>{}</strong>: {}</li>",
                escape_html(name),
                escape_html(&value)
            )
        })
        .collect();
    format!("<ul class=\"facts\">{}</ul>\n", items)
}

/// Render the chat webhook block payload.
pub fn chat_payload(alert: &Alert, zone: &DisplayZone) -> Value {
    let time = zone.format(&alert.timestamp);

    let (header, fields) = match &alert.origin {
        AlertOrigin::Metric(_) => (
            format!("System Alert: {}", alert.title),
            vec![
                field("Type", &alert.title),
                field("Metrics", &alert.metrics),
                field("Time", &time),
            ],
        ),
        AlertOrigin::Lifecycle { process, kind } => (
            alert.title.clone(),
            vec![
                field("Name", &process.name),
                field("ID", &process.id.to_string()),
                field("Event", kind.as_str()),
                field("Time", &time),
            ],
        ),
    };

    json!({
        "text": format!("{} {}", alert.severity.emoji(), header),
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": header, "emoji": true }
            },
            {
                "type": "section",
                "fields": fields
            }
        ]
    })
}

fn field(name: &str, value: &str) -> Value {
    json!({ "type": "mrkdwn", "text": format!("*{}:*\n{}", name, value) })
}
