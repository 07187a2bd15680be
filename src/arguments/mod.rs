//! Transition arguments: descriptors supplied by the controller, encoding of
//! user input into the wire representation, and form specs for the UI.

mod validate;

pub use validate::{check_mandatory, ArgumentViolation};

use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw user input keyed by argument name. `null` means "not supplied".
pub type RawArguments = serde_json::Map<String, Value>;

/// Whether the controller requires an argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Presence {
    Mandatory,
    Optional,
}

/// Declared type of an argument.
///
/// Tags outside the known set are kept so the error can report them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArgumentType {
    Int,
    Float,
    String,
    Bool,
    Unrecognized(i32),
}

impl ArgumentType {
    /// Map a protobuf enum tag to a type.
    pub fn from_tag(tag: i32) -> Self {
        match tag {
            0 => Self::Int,
            1 => Self::Float,
            2 => Self::String,
            3 => Self::Bool,
            other => Self::Unrecognized(other),
        }
    }

    pub fn tag(&self) -> i32 {
        match self {
            Self::Int => 0,
            Self::Float => 1,
            Self::String => 2,
            Self::Bool => 3,
            Self::Unrecognized(tag) => *tag,
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Self::Int => "an integer",
            Self::Float => "a number",
            Self::String => "a string",
            Self::Bool => "a boolean",
            Self::Unrecognized(_) => "a supported type",
        }
    }
}

/// Controller-supplied description of one argument of an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub presence: Presence,
    #[serde(rename = "type")]
    pub ty: ArgumentType,
    /// Encoded default as sent by the controller.
    #[serde(default)]
    pub default_value: Vec<u8>,
}

impl ArgumentDescriptor {
    pub fn new(name: impl Into<String>, presence: Presence, ty: ArgumentType) -> Self {
        Self {
            name: name.into(),
            presence,
            ty,
            default_value: Vec::new(),
        }
    }

    pub fn with_default(mut self, default_value: impl Into<Vec<u8>>) -> Self {
        self.default_value = default_value.into();
        self
    }

    pub fn is_mandatory(&self) -> bool {
        self.presence == Presence::Mandatory
    }

    /// Decode the default into a typed value.
    ///
    /// The text is read as UTF-8 with end-of-transmission characters removed
    /// and surrounding whitespace trimmed. Empty or unparsable defaults give
    /// `None`.
    pub fn decoded_default(&self) -> Option<ArgumentValue> {
        let text = String::from_utf8_lossy(&self.default_value).replace('\u{4}', "");
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match self.ty {
            ArgumentType::Int => text.parse().ok().map(ArgumentValue::Int),
            ArgumentType::Float => text.parse().ok().map(ArgumentValue::Float),
            ArgumentType::String => Some(ArgumentValue::String(text.to_string())),
            ArgumentType::Bool => parse_bool(text).map(ArgumentValue::Bool),
            ArgumentType::Unrecognized(_) => None,
        }
    }

    /// Encode a user-supplied value according to the declared type.
    pub fn encode(&self, value: &Value) -> Result<ArgumentValue, ControlError> {
        let invalid = |reason: String| ControlError::InvalidArgumentValue {
            argument: self.name.clone(),
            expected: self.ty.expected(),
            reason,
        };

        match (self.ty, value) {
            (ArgumentType::Unrecognized(tag), _) => Err(ControlError::UnsupportedArgumentType {
                argument: self.name.clone(),
                tag,
            }),
            (ArgumentType::Int, Value::Number(n)) => n
                .as_i64()
                .map(ArgumentValue::Int)
                .ok_or_else(|| invalid(format!("{n} is not an integer"))),
            (ArgumentType::Int, Value::String(s)) => s
                .trim()
                .parse()
                .map(ArgumentValue::Int)
                .map_err(|e| invalid(format!("'{s}': {e}"))),
            (ArgumentType::Float, Value::Number(n)) => n
                .as_f64()
                .map(ArgumentValue::Float)
                .ok_or_else(|| invalid(format!("{n} is not representable"))),
            (ArgumentType::Float, Value::String(s)) => s
                .trim()
                .parse()
                .map(ArgumentValue::Float)
                .map_err(|e| invalid(format!("'{s}': {e}"))),
            (ArgumentType::String, Value::String(s)) => Ok(ArgumentValue::String(s.clone())),
            (ArgumentType::Bool, Value::Bool(b)) => Ok(ArgumentValue::Bool(*b)),
            (ArgumentType::Bool, Value::String(s)) => parse_bool(s.trim())
                .map(ArgumentValue::Bool)
                .ok_or_else(|| invalid(format!("'{s}' is not a boolean"))),
            (_, other) => Err(invalid(format!("got {other}"))),
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Wire representation of one encoded argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ArgumentValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

/// Encode the arguments `descriptors` declares from `raw`.
///
/// Undeclared keys are dropped. Declared arguments that are absent or `null`
/// are omitted rather than defaulted.
pub fn encode_arguments(
    descriptors: &[ArgumentDescriptor],
    raw: &RawArguments,
) -> Result<BTreeMap<String, ArgumentValue>, ControlError> {
    let mut encoded = BTreeMap::new();
    for descriptor in descriptors {
        match raw.get(&descriptor.name) {
            None | Some(Value::Null) => continue,
            Some(value) => {
                encoded.insert(descriptor.name.clone(), descriptor.encode(value)?);
            }
        }
    }
    Ok(encoded)
}

/// Everything the UI needs to render one input of an event's form.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ArgumentType,
    pub mandatory: bool,
    pub default: Option<ArgumentValue>,
}

/// Build the form spec for an event from its descriptors.
pub fn form_spec(descriptors: &[ArgumentDescriptor]) -> Result<Vec<FormField>, ControlError> {
    descriptors
        .iter()
        .map(|d| match d.ty {
            ArgumentType::Unrecognized(tag) => Err(ControlError::UnsupportedArgumentType {
                argument: d.name.clone(),
                tag,
            }),
            ty => Ok(FormField {
                name: d.name.clone(),
                ty,
                mandatory: d.is_mandatory(),
                default: d.decoded_default(),
            }),
        })
        .collect()
}

/// A transition ready to be sent to the controller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransitionRequest {
    pub event: crate::core::ControlEvent,
    pub arguments: BTreeMap<String, ArgumentValue>,
}
