//! Field specifications for server-requested forms.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input kind of a form field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    /// Free text input.
    #[default]
    Text,
    /// Numeric input.
    Number,
    /// Date input.
    Date,
    /// Email input.
    Email,
    /// Choice among enumerated values.
    Enum,
    /// Any other input kind, carried verbatim.
    Other(String),
}

impl FieldKind {
    /// Return the wire name of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Email => "email",
            FieldKind::Enum => "enum",
            FieldKind::Other(kind) => kind,
        }
    }
}

impl From<String> for FieldKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "string" => FieldKind::Text,
            "number" | "numeric" => FieldKind::Number,
            "date" => FieldKind::Date,
            "email" => FieldKind::Email,
            "enum" | "select" => FieldKind::Enum,
            _ => FieldKind::Other(value),
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One selectable value of an enumerated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEnumOption")]
pub struct EnumOption {
    /// Value submitted with the form.
    pub value: String,
    /// Label shown to the user.
    pub label: String,
}

impl EnumOption {
    /// Build an option whose label equals its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnumOption {
    Labeled { value: Value, label: Option<Value> },
    Plain(Value),
}

impl From<RawEnumOption> for EnumOption {
    fn from(raw: RawEnumOption) -> Self {
        match raw {
            RawEnumOption::Labeled { value, label } => {
                let value = crate::display_string(&value);
                let label = label
                    .as_ref()
                    .map(crate::display_string)
                    .unwrap_or_else(|| value.clone());
                EnumOption { value, label }
            }
            RawEnumOption::Plain(value) => EnumOption::plain(crate::display_string(&value)),
        }
    }
}

/// Where an enumerated field gets its values from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumSource {
    /// Fixed set shipped with the field.
    Inline(Vec<EnumOption>),
    /// URL returning a JSON array of options.
    Fetch(String),
}

/// Specification of a single form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFieldSpec", into = "FieldSpecWire")]
pub struct FieldSpec {
    /// Key used in the submitted payload.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Input kind.
    pub kind: FieldKind,
    /// Optional source of enumerated values.
    pub enum_source: Option<EnumSource>,
    /// Optional input placeholder.
    pub placeholder: Option<String>,
}

impl FieldSpec {
    /// Build a text field whose label is its name.
    pub fn text(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind: FieldKind::Text,
            enum_source: None,
            placeholder: None,
        }
    }

    /// Override the field kind.
    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Override the field label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Attach an enum source.
    pub fn with_enum_source(mut self, source: EnumSource) -> Self {
        self.enum_source = Some(source);
        self
    }

    /// Placeholder shown for an empty input.
    pub fn placeholder_text(&self) -> String {
        match (&self.placeholder, &self.kind) {
            (Some(placeholder), _) => placeholder.clone(),
            (None, FieldKind::Enum) => format!("Select {}", self.label),
            (None, _) => format!("Enter {}", self.label),
        }
    }
}

/// Object form of a field on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldSpecWire {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fetch_enum_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<EnumOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldSpec {
    Name(String),
    Spec(FieldSpecWire),
}

impl From<RawFieldSpec> for FieldSpec {
    fn from(raw: RawFieldSpec) -> Self {
        let wire = match raw {
            RawFieldSpec::Name(name) => return FieldSpec::text(name),
            RawFieldSpec::Spec(wire) => wire,
        };
        let enum_source = match (wire.options, wire.fetch_enum_url) {
            (Some(options), _) => Some(EnumSource::Inline(options)),
            (None, Some(url)) if !url.trim().is_empty() => Some(EnumSource::Fetch(url)),
            _ => None,
        };
        FieldSpec {
            label: wire.label.unwrap_or_else(|| wire.name.clone()),
            name: wire.name,
            kind: wire.kind.map(FieldKind::from).unwrap_or_default(),
            enum_source,
            placeholder: wire.placeholder,
        }
    }
}

impl From<FieldSpec> for FieldSpecWire {
    fn from(spec: FieldSpec) -> Self {
        let (options, fetch_enum_url) = match spec.enum_source {
            Some(EnumSource::Inline(options)) => (Some(options), None),
            Some(EnumSource::Fetch(url)) => (None, Some(url)),
            None => (None, None),
        };
        FieldSpecWire {
            name: spec.name,
            label: Some(spec.label),
            kind: Some(spec.kind.into()),
            fetch_enum_url,
            options,
            placeholder: spec.placeholder,
        }
    }
}
