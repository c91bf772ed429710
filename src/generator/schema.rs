//! Model schema → TypeScript type mapping.
//!
//! Rust has no runtime reflection, so registered models are described as
//! JSON-Schema style values (`properties`, `type`, `format`, `required`,
//! `$ref`) and walked here into client-side interface declarations.

use crate::registry::ModelDecl;
use serde_json::Value;
use std::collections::HashSet;

/// One field of a generated interface.
#[derive(Debug, Clone)]
pub struct TsField {
    pub name: String,
    pub ty: String,
    pub optional: bool,
}

/// One generated interface declaration.
#[derive(Debug, Clone)]
pub struct TsModel {
    pub name: String,
    pub fields: Vec<TsField>,
}

/// Walk a model declaration into its interface. Unknown or missing
/// `properties` yield an empty interface rather than an error - the model
/// module is best-effort, the call stubs are the strict part.
pub fn model_from_decl(decl: &ModelDecl) -> TsModel {
    let required: HashSet<&str> = decl
        .schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut fields = Vec::new();
    if let Some(props) = decl.schema.get("properties").and_then(|v| v.as_object()) {
        for (name, schema) in props {
            fields.push(TsField {
                name: name.clone(),
                ty: ts_type(schema),
                optional: !required.contains(name.as_str()),
            });
        }
    }
    TsModel {
        name: decl.name.clone(),
        fields,
    }
}

/// Map one schema node to a TypeScript type. Date/time formatted strings
/// become `Date` so clients get a parseable date representation.
pub fn ts_type(schema: &Value) -> String {
    if let Some(reference) = schema.get("$ref").and_then(|v| v.as_str()) {
        return reference
            .rsplit('/')
            .next()
            .unwrap_or("any")
            .to_string();
    }
    match schema.get("type").and_then(|v| v.as_str()) {
        Some("string") => match schema.get("format").and_then(|v| v.as_str()) {
            Some("date-time") | Some("date") => "Date".to_string(),
            _ => "string".to_string(),
        },
        Some("integer") | Some("number") => "number".to_string(),
        Some("boolean") => "boolean".to_string(),
        Some("array") => {
            let inner = schema
                .get("items")
                .map(ts_type)
                .unwrap_or_else(|| "any".to_string());
            format!("{inner}[]")
        }
        _ => "any".to_string(),
    }
}

/// Strip the `[]` array marker from a referenced type name.
pub fn strip_array_marker(name: &str) -> String {
    name.replace("[]", "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn date_time_fields_become_date() {
        let decl = ModelDecl::new(
            "User",
            json!({
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": { "type": "integer" },
                    "created_at": { "type": "string", "format": "date-time" }
                }
            }),
        );
        let model = model_from_decl(&decl);
        assert_eq!(model.name, "User");
        let created = model.fields.iter().find(|f| f.name == "created_at").unwrap();
        assert_eq!(created.ty, "Date");
        assert!(created.optional);
        let id = model.fields.iter().find(|f| f.name == "id").unwrap();
        assert_eq!(id.ty, "number");
        assert!(!id.optional);
    }

    #[test]
    fn arrays_and_refs() {
        assert_eq!(
            ts_type(&json!({"type": "array", "items": {"$ref": "#/components/schemas/Pet"}})),
            "Pet[]"
        );
        assert_eq!(strip_array_marker("Pet[]"), "Pet");
        assert_eq!(strip_array_marker("Pet"), "Pet");
    }
}
