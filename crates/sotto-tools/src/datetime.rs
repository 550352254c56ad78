//! Date/time tool.
//!
//! Lets the model learn the current date and year so time-sensitive search
//! queries can include them for fresh results.

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

use crate::error::Result;
use crate::registry::Tool;

/// Returns the current date, time, day of week, and timezone.
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "get_current_datetime"
    }

    fn description(&self) -> &str {
        "Get the current date, time, day of week, and timezone."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> Result<String> {
        let now = Local::now();
        Ok(format!(
            "Current date: {}\nCurrent time: {}\nDay of week: {}\nYear: {}\nTimezone: {}",
            now.format("%Y-%m-%d"),
            now.format("%I:%M %p"),
            now.format("%A"),
            now.format("%Y"),
            now.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn reports_all_fields() {
        let out = DateTimeTool.execute(json!({})).await.unwrap();
        assert!(out.contains("Current date: "));
        assert!(out.contains("Current time: "));
        assert!(out.contains("Day of week: "));
        assert!(out.contains("Year: 20"));
        assert!(out.contains("Timezone: "));
    }

    #[test]
    fn schema_requires_nothing() {
        let schema = DateTimeTool.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema["required"].as_array().unwrap().is_empty());
    }
}
