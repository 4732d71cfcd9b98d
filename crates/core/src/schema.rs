//! JSON schema generation from Rust types.
//!
//! Tool parameter schemas and the final answer schema are both derived
//! with `schemars`, so a type's `#[derive(JsonSchema)]` plus its doc
//! comments are all the model ever sees.

use schemars::JsonSchema;

/// Generate the JSON schema for `T` as a `serde_json::Value`.
pub fn schema_for<T: JsonSchema>() -> serde_json::Result<serde_json::Value> {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema)?;
    // The meta-schema URI is noise for the model.
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct AddParams {
        /// First number to add
        num1: f64,
        /// Second number to add
        num2: f64,
    }

    #[test]
    fn schema_describes_fields() {
        let schema = schema_for::<AddParams>().unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["properties"]["num1"]["description"],
            "First number to add"
        );
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
        assert!(schema.get("$schema").is_none());
    }
}
