//! Schema registry types.
//!
//! Every tool declares its arguments as an [`InputShape`]: a flat list of
//! [`Field`]s with types, required flags, enums, and bounds. The shape is
//! advertised to clients as JSON Schema ([`InputShape::to_json_schema`]) and
//! checked locally by [`validate`] before a tool runs.

pub mod validate;

use serde::Serialize;
use serde_json::{Map, Value, json};

pub use validate::validate;

/// Pattern for GitHub owner and repository names.
pub const NAME_PATTERN: &str = r"^[A-Za-z0-9_.-]+$";

/// MCP tool definition for tools/list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A tool's name, description, and argument shape.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub shape: InputShape,
}

impl ToolDescriptor {
    pub const fn new(name: &'static str, description: &'static str, shape: InputShape) -> Self {
        Self {
            name,
            description,
            shape,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_owned(),
            description: self.description.to_owned(),
            input_schema: self.shape.to_json_schema(),
        }
    }
}

/// Value type of a field, with its type-specific constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String {
        one_of: Option<&'static [&'static str]>,
        pattern: Option<&'static str>,
    },
    /// A JSON number written without a fractional part. `2.0` is rejected
    /// like `2.5`: the typed parameters deserialize into integer types,
    /// which refuse any float.
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    Boolean,
    Array {
        items: Box<FieldKind>,
        min_items: Option<usize>,
    },
    Object(Vec<Field>),
}

impl FieldKind {
    pub const fn string() -> Self {
        Self::String {
            one_of: None,
            pattern: None,
        }
    }

    pub const fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Integer { .. } => "integer",
            Self::Boolean => "boolean",
            Self::Array { .. } => "array",
            Self::Object(_) => "object",
        }
    }

    fn to_json_schema(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        schema.insert("type".to_owned(), json!(self.type_name()));
        match self {
            Self::String { one_of, pattern } => {
                if let Some(values) = one_of {
                    schema.insert("enum".to_owned(), json!(values));
                }
                if let Some(p) = pattern {
                    schema.insert("pattern".to_owned(), json!(p));
                }
            }
            Self::Integer { minimum, maximum } => {
                if let Some(min) = minimum {
                    schema.insert("minimum".to_owned(), json!(min));
                }
                if let Some(max) = maximum {
                    schema.insert("maximum".to_owned(), json!(max));
                }
            }
            Self::Boolean => {}
            Self::Array { items, min_items } => {
                schema.insert("items".to_owned(), Value::Object(items.to_json_schema()));
                if let Some(n) = min_items {
                    schema.insert("minItems".to_owned(), json!(n));
                }
            }
            Self::Object(fields) => {
                let (properties, required) = properties_of(fields);
                schema.insert("properties".to_owned(), Value::Object(properties));
                schema.insert("required".to_owned(), json!(required));
            }
        }
        schema
    }
}

/// One named argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, description: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            description,
            required: false,
            kind,
        }
    }

    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::string())
    }

    pub const fn integer(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::integer())
    }

    pub const fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::Boolean)
    }

    pub fn array(name: &'static str, description: &'static str, items: FieldKind) -> Self {
        Self::new(
            name,
            description,
            FieldKind::Array {
                items: Box::new(items),
                min_items: None,
            },
        )
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restrict a string field to the given values.
    #[must_use]
    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        if let FieldKind::String { one_of, .. } = &mut self.kind {
            *one_of = Some(values);
        }
        self
    }

    #[must_use]
    pub fn pattern(mut self, regex: &'static str) -> Self {
        if let FieldKind::String { pattern, .. } = &mut self.kind {
            *pattern = Some(regex);
        }
        self
    }

    /// Inclusive bounds for an integer field.
    #[must_use]
    pub fn range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        if let FieldKind::Integer { minimum, maximum } = &mut self.kind {
            *minimum = min;
            *maximum = max;
        }
        self
    }

    #[must_use]
    pub fn min_items(mut self, n: usize) -> Self {
        if let FieldKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(n);
        }
        self
    }
}

/// The argument shape of one tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputShape {
    pub fields: Vec<Field>,
}

impl InputShape {
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Required `owner` and `repo`.
    #[must_use]
    pub fn repository(self) -> Self {
        self.field(
            Field::string("owner", "Repository owner (username or organization)")
                .pattern(NAME_PATTERN)
                .required(),
        )
        .field(
            Field::string("repo", "Repository name")
                .pattern(NAME_PATTERN)
                .required(),
        )
    }

    /// Optional `page` and `per_page` (1-100).
    #[must_use]
    pub fn paginated(self) -> Self {
        self.field(Field::integer("page", "Page number for pagination (starts at 1)").range(Some(1), None))
            .field(
                Field::integer("per_page", "Number of results per page (max 100)")
                    .range(Some(1), Some(100)),
            )
    }

    pub fn to_json_schema(&self) -> Value {
        let (properties, required) = properties_of(&self.fields);
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn properties_of(fields: &[Field]) -> (Map<String, Value>, Vec<&'static str>) {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut schema = field.kind.to_json_schema();
        schema.insert("description".to_owned(), json!(field.description));
        properties.insert(field.name.to_owned(), Value::Object(schema));
        if field.required {
            required.push(field.name);
        }
    }
    (properties, required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_emission() {
        let shape = InputShape::new()
            .repository()
            .field(Field::string("state", "Issue state").one_of(&["open", "closed", "all"]))
            .paginated();
        let schema = shape.to_json_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["owner", "repo"]));
        assert_eq!(schema["properties"]["owner"]["pattern"], NAME_PATTERN);
        assert_eq!(schema["properties"]["state"]["enum"], json!(["open", "closed", "all"]));
        assert_eq!(schema["properties"]["per_page"]["minimum"], 1);
        assert_eq!(schema["properties"]["per_page"]["maximum"], 100);
        assert!(schema["properties"]["page"].get("maximum").is_none());
    }

    #[test]
    fn test_nested_object_items() {
        let shape = InputShape::new().field(
            Field::array(
                "files",
                "Files to push",
                FieldKind::Object(vec![
                    Field::string("path", "File path").required(),
                    Field::string("content", "File content").required(),
                ]),
            )
            .min_items(1)
            .required(),
        );
        let schema = shape.to_json_schema();
        let files = &schema["properties"]["files"];
        assert_eq!(files["type"], "array");
        assert_eq!(files["minItems"], 1);
        assert_eq!(files["items"]["type"], "object");
        assert_eq!(files["items"]["required"], json!(["path", "content"]));
    }

    #[test]
    fn test_constraint_builders_ignore_wrong_kind() {
        let f = Field::boolean("draft", "Draft").range(Some(1), Some(2)).pattern("x");
        assert_eq!(f.kind, FieldKind::Boolean);
    }
}
