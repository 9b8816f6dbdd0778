use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a raw value (API key, secret) without decoration in text mode
pub fn output_value(output_format: &OutputFormat, key: &str, value: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ key: value }))?);
        }
        OutputFormat::Text => {
            println!("{}", value);
        }
    }
    Ok(())
}

/// Output a list of names, one per line in text mode
pub fn output_list(
    output_format: &OutputFormat,
    collection_name: &str,
    items: &[String],
    empty_message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ collection_name: items }))?
            );
        }
        OutputFormat::Text if items.is_empty() => {
            println!("{}", empty_message);
        }
        OutputFormat::Text => {
            for item in items {
                println!("{}", item);
            }
        }
    }
    Ok(())
}
