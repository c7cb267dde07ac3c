use serde_json::Value;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }

    pub fn formatter(self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Human => Box::new(HumanFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        }
    }
}

/// Trait for formatting CLI output
///
/// Status lines go to stderr so that results on stdout stay pipeable.
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
    /// Prints an operation result or any other structured document
    fn result(&self, value: &Value);
}

/// Human-readable output: marks for status, pretty JSON for results
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        eprintln!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn result(&self, value: &Value) {
        match value {
            Value::String(text) => println!("{}", text),
            Value::Null => {}
            other => println!("{}", pretty(other)),
        }
    }
}

/// Machine-readable output: one JSON document per result
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, _message: &str) {}
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"success": false, "error": message}));
    }
    fn info(&self, _message: &str) {}
    fn result(&self, value: &Value) {
        println!("{}", pretty(value));
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selection() {
        assert!(OutputFormat::Json.is_json());
        assert!(!OutputFormat::Human.is_json());
    }

    #[test]
    fn test_pretty_prints_nested_values() {
        let text = pretty(&serde_json::json!({"a": [1, 2]}));
        assert!(text.contains('\n'));
        assert!(text.contains("\"a\""));
    }
}
