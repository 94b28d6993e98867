//! Token form of a genome, used for hand-written knowledge archives.
//!
//! ```json
//! [{"tag": "instruction", "value": "exec_if"}, {"tag": "literal", "value": 3},
//!  {"tag": "close"}, {"tag": "input", "value": 0}]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Gene, Genome, InstructionSet, Literal};
use crate::schema::ConfigError;

/// Printable ASCII characters, digits first.
pub const VISIBLE: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "value", rename_all = "snake_case")]
pub enum Token {
    Close,
    Input(usize),
    /// Instruction name, resolved against an [`InstructionSet`].
    Instruction(String),
    Char(char),
    /// The [`VISIBLE`] characters as a string literal.
    Visible,
    /// [`VISIBLE`] plus newline and tab.
    VisiblePlus,
    /// Any other value; its literal type is inferred.
    Literal(Value),
}

impl Token {
    /// Resolve a token into a gene.
    pub fn to_gene(&self, instructions: &InstructionSet) -> Result<Gene, ConfigError> {
        match self {
            Self::Close => Ok(Gene::Close),
            Self::Input(index) => Ok(Gene::input(*index)),
            Self::Instruction(name) => instructions
                .get(name)
                .map(|meta| meta.to_gene())
                .ok_or_else(|| ConfigError::UnknownInstruction(name.clone())),
            Self::Char(c) => Ok(Gene::literal(Literal::Char(*c))),
            Self::Visible => Ok(Gene::literal(Literal::Str(VISIBLE.to_string()))),
            Self::VisiblePlus => Ok(Gene::literal(Literal::Str(format!("{VISIBLE}\n\t")))),
            Self::Literal(value) => infer_literal(value).map(Gene::literal),
        }
    }
}

/// Infer the narrowest literal type for a JSON value.
///
/// Arrays mixing integers and floats become float vectors; an empty array is
/// an int vector.
pub fn infer_literal(value: &Value) -> Result<Literal, ConfigError> {
    let unknown = || ConfigError::UnknownLiteralType(value.to_string());
    match value {
        Value::Bool(b) => Ok(Literal::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Literal::Int(i)),
            None => n.as_f64().map(Literal::Float).ok_or_else(unknown),
        },
        Value::String(s) => Ok(Literal::Str(s.clone())),
        Value::Array(items) => {
            if items.iter().all(Value::is_i64) {
                Ok(Literal::IntVector(items.iter().filter_map(Value::as_i64).collect()))
            } else if items.iter().all(Value::is_boolean) {
                Ok(Literal::BoolVector(items.iter().filter_map(Value::as_bool).collect()))
            } else if items.iter().all(Value::is_number) {
                Ok(Literal::FloatVector(items.iter().filter_map(Value::as_f64).collect()))
            } else if items.iter().all(Value::is_string) {
                Ok(Literal::StrVector(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect(),
                ))
            } else {
                Err(unknown())
            }
        }
        Value::Null | Value::Object(_) => Err(unknown()),
    }
}

/// Build a genome from tokens.
pub fn genome_from_tokens(
    tokens: &[Token],
    instructions: &InstructionSet,
) -> Result<Genome, ConfigError> {
    tokens.iter().map(|t| t.to_gene(instructions)).collect()
}

/// Parse a JSON list of token lists. Unrecognised tags fail here, at load time.
pub fn parse_token_sets(json: &str) -> Result<Vec<Vec<Token>>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::UnknownTag(e.to_string()))
}
