use crate::registry::{tool_fn, ToolDefinition, ToolRegistry};
use crate::tool_schema::InputSchema;
use crate::types::Result;
use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

pub fn register(registry: &mut ToolRegistry) -> Result<()> {
    registry.register(
        ToolDefinition::new(
            "get_current_datetime",
            "Gets the current date, time, and day of the week from the system.",
            InputSchema::new(),
        ),
        tool_fn(|_params| async move { Ok(Value::String(describe_datetime(&Local::now()))) }),
    )
}

pub fn describe_datetime<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Today is {}. The current time is {}.",
        now.format("%A, %B %-d, %Y"),
        now.format("%H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_datetime_sentence() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            describe_datetime(&at),
            "Today is Tuesday, March 5, 2024. The current time is 14:07:09."
        );
    }
}
