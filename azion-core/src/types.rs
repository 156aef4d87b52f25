//! Domain types for Azion edge functions.
//!
//! Records are deserialized straight from the remote API envelope and cached
//! verbatim; fields this crate does not interpret are kept in `extra` so a
//! cache snapshot round-trips without loss.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// File stem of the materialized code file (`code.<ext>`).
pub const CODE_FILE_STEM: &str = "code";

/// File name of the materialized arguments file.
pub const ARGS_FILE_NAME: &str = "args.json";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Remote identifier of an edge function. Assigned by the API, immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(pub u64);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for FunctionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Runtime language of an edge function.
///
/// Any string deserializes; unmapped values land in `Unknown` and fail in
/// [`Language::extension`] instead of failing the whole listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    JavaScript,
    Lua,
    Unknown(String),
}

impl Language {
    /// Every language with a local file mapping.
    pub fn known() -> &'static [Language] {
        &[Language::JavaScript, Language::Lua]
    }

    /// Extension of the local code file for this language.
    pub fn extension(&self) -> Result<&'static str, CoreError> {
        match self {
            Language::JavaScript => Ok("js"),
            Language::Lua => Ok("lua"),
            Language::Unknown(other) => Err(CoreError::UnsupportedLanguage(other.clone())),
        }
    }

    /// Inverse of [`Language::extension`].
    pub fn from_extension(ext: &str) -> Option<Language> {
        Language::known()
            .iter()
            .find(|lang| {
                lang.extension()
                    .is_ok_and(|known| known.eq_ignore_ascii_case(ext))
            })
            .cloned()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Language::JavaScript => "javascript",
            Language::Lua => "lua",
            Language::Unknown(other) => other,
        }
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "javascript" => Language::JavaScript,
            "lua" => Language::Lua,
            _ => Language::Unknown(s),
        }
    }
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        Language::from(s.to_owned())
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.as_str().to_owned()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two record fields that a local edit can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Code,
    JsonArgs,
}

impl TrackedField {
    pub fn all() -> &'static [TrackedField] {
        &[TrackedField::Code, TrackedField::JsonArgs]
    }

    /// Key of this field in API payloads.
    pub fn wire_key(self) -> &'static str {
        match self {
            TrackedField::Code => "code",
            TrackedField::JsonArgs => "json_args",
        }
    }

    /// Local file name holding this field for a function written in `language`.
    pub fn file_name(self, language: &Language) -> Result<String, CoreError> {
        match self {
            TrackedField::Code => Ok(format!("{CODE_FILE_STEM}.{}", language.extension()?)),
            TrackedField::JsonArgs => Ok(ARGS_FILE_NAME.to_owned()),
        }
    }

    /// Classify a local file name; `None` for files outside the convention.
    pub fn from_file_name(file_name: &str) -> Option<TrackedField> {
        if file_name == ARGS_FILE_NAME {
            return Some(TrackedField::JsonArgs);
        }
        let (stem, ext) = file_name.rsplit_once('.')?;
        if stem == CODE_FILE_STEM && Language::from_extension(ext).is_some() {
            return Some(TrackedField::Code);
        }
        None
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_key())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

fn empty_args() -> Value {
    Value::Object(Map::new())
}

/// An edge function as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFunctionRecord {
    pub id: FunctionId,
    pub name: String,
    pub language: Language,
    #[serde(default)]
    pub code: String,
    #[serde(default = "empty_args")]
    pub json_args: Value,
    /// Remote fields not interpreted locally (`active`, `modified`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EdgeFunctionRecord {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        language: Language,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: FunctionId(id),
            name: name.into(),
            language,
            code: code.into(),
            json_args: empty_args(),
            extra: Map::new(),
        }
    }

    /// Text as written to the local file for `field`.
    pub fn field_text(&self, field: TrackedField) -> String {
        match field {
            TrackedField::Code => self.code.clone(),
            TrackedField::JsonArgs => render_args(&self.json_args),
        }
    }
}

/// Pretty JSON rendering of `json_args`, newline-terminated.
pub fn render_args(args: &Value) -> String {
    let mut out = serde_json::to_string_pretty(args).unwrap_or_else(|_| args.to_string());
    out.push('\n');
    out
}

/// A single-field change, as sent in a PATCH body.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch {
    Code(String),
    JsonArgs(Value),
}

impl FieldPatch {
    pub fn field(&self) -> TrackedField {
        match self {
            FieldPatch::Code(_) => TrackedField::Code,
            FieldPatch::JsonArgs(_) => TrackedField::JsonArgs,
        }
    }

    /// JSON body carrying only the changed field.
    pub fn body(&self) -> Value {
        let value = match self {
            FieldPatch::Code(code) => Value::String(code.clone()),
            FieldPatch::JsonArgs(args) => args.clone(),
        };
        let mut body = Map::new();
        body.insert(self.field().wire_key().to_owned(), value);
        Value::Object(body)
    }

    /// Apply the change to a record, leaving every other field untouched.
    pub fn apply_to(&self, record: &mut EdgeFunctionRecord) {
        match self {
            FieldPatch::Code(code) => record.code = code.clone(),
            FieldPatch::JsonArgs(args) => record.json_args = args.clone(),
        }
    }
}

/// Payload for creating a new edge function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEdgeFunction {
    pub name: String,
    pub language: Language,
    pub code: String,
    pub json_args: Value,
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
