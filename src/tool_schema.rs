//! Tool Input Schemas
//!
//! Declares the parameters a tool accepts and checks model-supplied arguments against them
//! before the tool runs. The same schema renders the JSON-Schema exposed over MCP and the
//! plain-text parameter list embedded in the system prompt.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Enum(Vec<String>),
    Object(InputSchema),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn enumeration(options: &[&str]) -> Self {
        FieldType::Enum(options.iter().map(|s| s.to_string()).collect())
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Enum(_) => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object(_) => "object",
            FieldType::Array(_) => "array",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::Enum(options) => json!({ "type": "string", "enum": options }),
            FieldType::Object(schema) => schema.to_json_schema(),
            FieldType::Array(item) => json!({ "type": "array", "items": item.to_json_schema() }),
            other => json!({ "type": other.type_name() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub ty: FieldType,
    pub required: bool,
    pub description: Option<String>,
}

/// Ordered set of named fields. Order is preserved in every rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    fields: Vec<(String, FieldSpec)>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: &str, ty: FieldType) -> Self {
        self.field(name, ty, true)
    }

    pub fn optional(self, name: &str, ty: FieldType) -> Self {
        self.field(name, ty, false)
    }

    /// Attaches a description to the most recently added field.
    pub fn describe(mut self, description: &str) -> Self {
        if let Some((_, spec)) = self.fields.last_mut() {
            spec.description = Some(description.to_string());
        }
        self
    }

    fn field(mut self, name: &str, ty: FieldType, required: bool) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((
            name.to_string(),
            FieldSpec {
                ty,
                required,
                description: None,
            },
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn required_params(&self) -> Vec<&str> {
        self.fields()
            .filter(|(_, s)| s.required)
            .map(|(n, _)| n)
            .collect()
    }

    /// Validates raw parameters. Unknown keys are dropped from the returned map.
    pub fn validate(&self, params: &Value) -> Result<Map<String, Value>, String> {
        let obj = match params.as_object() {
            Some(o) => o,
            None => {
                return Err(format!(
                    "parameters: Expected object, received {}",
                    json_type_name(params)
                ))
            }
        };

        let mut problems = Vec::new();
        let validated = self.validate_object(obj, "", &mut problems);
        if problems.is_empty() {
            Ok(validated)
        } else {
            Err(problems.join("; "))
        }
    }

    fn validate_object(
        &self,
        obj: &Map<String, Value>,
        prefix: &str,
        problems: &mut Vec<String>,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, spec) in &self.fields {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            match obj.get(name) {
                None if spec.required => problems.push(format!("{}: Required", path)),
                None => {}
                Some(value) => {
                    if let Some(v) = check_value(&spec.ty, value, &path, problems) {
                        out.insert(name.clone(), v);
                    }
                }
            }
        }
        out
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, spec) in &self.fields {
            let mut prop = spec.ty.to_json_schema();
            if let Some(desc) = &spec.description {
                prop["description"] = json!(desc);
            }
            properties.insert(name.clone(), prop);
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_params(),
        })
    }

    /// Human-readable parameter list used in the tool catalog.
    pub fn describe_params(&self, indent: &str) -> String {
        if self.fields.is_empty() {
            return format!("{}None", indent);
        }
        self.fields
            .iter()
            .map(|(name, spec)| describe_field(name, spec, indent))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn describe_field(name: &str, spec: &FieldSpec, indent: &str) -> String {
    let mut details = Vec::new();
    if let Some(desc) = &spec.description {
        details.push(desc.clone());
    }
    details.push(format!("type: {}", spec.ty.type_name()));
    if let FieldType::Enum(options) = &spec.ty {
        details.push(format!("options: [{}]", options.join(", ")));
    }

    let mut line = format!("{}- **{}** ({})", indent, name, details.join("; "));

    if let FieldType::Object(inner) = &spec.ty {
        if !inner.is_empty() {
            let nested = inner
                .fields
                .iter()
                .map(|(n, s)| describe_field(n, s, indent))
                .collect::<Vec<_>>()
                .join("\n");
            let shifted = nested
                .lines()
                .map(|l| format!("{}{}", indent, l))
                .collect::<Vec<_>>()
                .join("\n");
            line.push_str(":\n");
            line.push_str(&shifted);
        }
    }
    line
}

fn check_value(ty: &FieldType, value: &Value, path: &str, problems: &mut Vec<String>) -> Option<Value> {
    let mismatch = |problems: &mut Vec<String>| -> Option<Value> {
        problems.push(format!(
            "{}: Expected {}, received {}",
            path,
            ty.type_name(),
            json_type_name(value)
        ));
        None
    };

    match ty {
        FieldType::String if value.is_string() => Some(value.clone()),
        FieldType::Number if value.is_number() => Some(value.clone()),
        FieldType::Integer if value.is_i64() || value.is_u64() => Some(value.clone()),
        FieldType::Boolean if value.is_boolean() => Some(value.clone()),
        FieldType::Enum(options) => match value.as_str() {
            Some(s) if options.iter().any(|o| o == s) => Some(value.clone()),
            Some(s) => {
                let expected = options
                    .iter()
                    .map(|o| format!("'{}'", o))
                    .collect::<Vec<_>>()
                    .join(" | ");
                problems.push(format!(
                    "{}: Invalid enum value. Expected {}, received '{}'",
                    path, expected, s
                ));
                None
            }
            None => mismatch(problems),
        },
        FieldType::Object(schema) => match value.as_object() {
            Some(obj) => Some(Value::Object(schema.validate_object(obj, path, problems))),
            None => mismatch(problems),
        },
        FieldType::Array(item) => match value.as_array() {
            Some(items) => {
                let checked = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| check_value(item, v, &format!("{}[{}]", path, i), problems))
                    .collect();
                Some(Value::Array(checked))
            }
            None => mismatch(problems),
        },
        _ => mismatch(problems),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
