//! Calendar tool — returns mock events.
//!
//! Proves multi-tool routing works end to end.
//! TODO: replace with a real calendar backend once one is wired up.

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

use crate::error::Result;
use crate::registry::Tool;

/// Checks the user's calendar for a given date.
pub struct CalendarTool;

#[async_trait]
impl Tool for CalendarTool {
    fn name(&self) -> &str {
        "check_calendar"
    }

    fn description(&self) -> &str {
        "Check your calendar for upcoming events and appointments."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "Date to check in YYYY-MM-DD format. Defaults to today."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let date = args
            .get("date")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());

        Ok(format!(
            "[MOCK DATA] Calendar for {date}:\n\
             - 9:00 AM: Team standup (Zoom)\n\
             - 11:30 AM: Lunch with Alex at Torchy's Tacos\n\
             - 2:00 PM: Dentist appointment\n\
             - 5:00 PM: Yoga class"
        ))
    }
}
