use schemars::generate::SchemaSettings;
use schemars::{JsonSchema, Schema};
use serde::Serialize;
use serde_json::Value;

use super::commit_message::CommitMessageDraft;

/// Name, description and JSON schema derived from a type's `JsonSchema` impl.
///
/// The title comes from the `# heading` line of the type's doc comment and
/// the description from the rest of it.
pub trait SchemaInfo: JsonSchema {
    fn root_schema() -> Schema {
        SchemaSettings::draft2020_12()
            .with(|s| {
                s.inline_subschemas = true;
                s.meta_schema = None;
            })
            .into_generator()
            .into_root_schema_for::<Self>()
    }

    fn title() -> String {
        Self::root_schema()
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| Self::schema_name().into_owned())
    }

    fn description() -> String {
        Self::root_schema()
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default()
    }

    /// The schema as a plain object suitable for a function's `parameters`.
    fn schema_value() -> Value {
        let mut value = Self::root_schema().as_value().to_owned();
        if let Some(obj) = value.as_object_mut() {
            obj.remove("title");
            obj.remove("description");
        }
        value
    }
}

impl<T: JsonSchema> SchemaInfo for T {}

/// The function definition the model is forced to call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaContract {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl SchemaContract {
    pub fn commit_message() -> Self {
        Self::for_type::<CommitMessageDraft>()
    }

    pub fn for_type<T: SchemaInfo>() -> Self {
        SchemaContract {
            name: T::title(),
            description: T::description(),
            parameters: T::schema_value(),
        }
    }

    /// Whether a function or tool name refers to this contract.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::commit_message::CommitType;
    use std::collections::BTreeSet;

    #[test]
    fn contract_is_named_after_the_doc_heading() {
        let contract = SchemaContract::commit_message();
        assert_eq!(contract.name, "generate_commit_message");
        assert!(contract.description.starts_with("Generate a structured git commit message"));
        assert!(contract.is_named("generate_commit_message"));
        assert!(!contract.is_named("get_file"));
    }

    #[test]
    fn type_enum_matches_commit_types() {
        let contract = SchemaContract::commit_message();
        let listed: Vec<&str> = contract.parameters["properties"]["type"]["enum"]
            .as_array()
            .expect("type carries an enum")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        let expected: Vec<&str> = CommitType::ALL.iter().map(CommitType::as_str).collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn only_type_and_title_are_required() {
        let contract = SchemaContract::commit_message();
        let required: BTreeSet<&str> = contract.parameters["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, BTreeSet::from(["title", "type"]));
    }

    #[test]
    fn parameters_are_self_contained() {
        let contract = SchemaContract::commit_message();
        let obj = contract.parameters.as_object().unwrap();
        assert_eq!(obj["type"], "object");
        assert!(!obj.contains_key("$schema"));
        assert!(!obj.contains_key("$defs"));
        assert!(!obj.contains_key("title"));
        for field in ["type", "scope", "title", "description"] {
            assert!(obj["properties"].get(field).is_some(), "missing {field}");
        }
        assert_eq!(obj["properties"]["description"]["type"], "array");
        assert_eq!(obj["properties"]["description"]["items"]["type"], "string");
    }
}
