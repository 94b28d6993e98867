//! Genes: the atoms of a linear (plushy) genome.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A literal value carried by a gene.
///
/// Floats compare and hash by bit pattern so that every literal, and therefore
/// every gene, is `Eq + Hash`. This makes `0.0 != -0.0` and `NaN == NaN` (for
/// identical NaN payloads), which is what structural genome equality needs.
///
/// Non-finite floats serialize as the strings `"inf"`, `"-inf"` and `"NaN"`
/// so that saved genomes load back unchanged. NaN loads as [`f64::NAN`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Literal {
    Int(i64),
    #[serde(with = "float_repr")]
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    IntVector(Vec<i64>),
    #[serde(with = "float_repr::vec")]
    FloatVector(Vec<f64>),
    BoolVector(Vec<bool>),
    CharVector(Vec<char>),
    StrVector(Vec<String>),
}

mod float_repr {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    impl From<f64> for Repr {
        fn from(v: f64) -> Self {
            match v {
                v if v.is_finite() => Self::Number(v),
                v if v.is_nan() => Self::Text("NaN".into()),
                v if v > 0.0 => Self::Text("inf".into()),
                _ => Self::Text("-inf".into()),
            }
        }
    }

    impl Repr {
        fn into_f64<E: de::Error>(self) -> Result<f64, E> {
            match self {
                Self::Number(v) => Ok(v),
                Self::Text(text) => match text.as_str() {
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    "NaN" => Ok(f64::NAN),
                    other => Err(E::custom(format!("expected a float, found \"{other}\""))),
                },
            }
        }
    }

    pub fn serialize<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        Repr::from(*v).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Repr::deserialize(deserializer)?.into_f64()
    }

    pub mod vec {
        use super::Repr;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(v.iter().map(|&x| Repr::from(x)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            Vec::<Repr>::deserialize(deserializer)?
                .into_iter()
                .map(Repr::into_f64)
                .collect()
        }
    }
}

impl Literal {
    /// Name of the stack this literal is pushed to.
    pub fn stack(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::Str(_) => "str",
            Self::IntVector(_) => "vector_int",
            Self::FloatVector(_) => "vector_float",
            Self::BoolVector(_) => "vector_bool",
            Self::CharVector(_) => "vector_char",
            Self::StrVector(_) => "vector_str",
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::IntVector(a), Self::IntVector(b)) => a == b,
            (Self::FloatVector(a), Self::FloatVector(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Self::BoolVector(a), Self::BoolVector(b)) => a == b,
            (Self::CharVector(a), Self::CharVector(b)) => a == b,
            (Self::StrVector(a), Self::StrVector(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Bool(v) => v.hash(state),
            Self::Char(v) => v.hash(state),
            Self::Str(v) => v.hash(state),
            Self::IntVector(v) => v.hash(state),
            Self::FloatVector(v) => {
                v.len().hash(state);
                for x in v {
                    x.to_bits().hash(state);
                }
            }
            Self::BoolVector(v) => v.hash(state),
            Self::CharVector(v) => v.hash(state),
            Self::StrVector(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::IntVector(v) => write!(f, "{v:?}"),
            Self::FloatVector(v) => write!(f, "{v:?}"),
            Self::BoolVector(v) => write!(f, "{v:?}"),
            Self::CharVector(v) => write!(f, "{v:?}"),
            Self::StrVector(v) => write!(f, "{v:?}"),
        }
    }
}

/// A reference to a registered instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionRef {
    pub name: String,
    /// Number of code blocks the instruction opens in a plushy genome.
    #[serde(default)]
    pub code_blocks: usize,
}

/// One gene of a linear genome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "gene", rename_all = "snake_case")]
pub enum Gene {
    /// Ends the innermost open code block.
    Close,
    /// Pushes the program input at `index`.
    Input { index: usize },
    Instruction(InstructionRef),
    Literal { value: Literal },
}

impl Gene {
    pub fn instruction(name: impl Into<String>, code_blocks: usize) -> Self {
        Self::Instruction(InstructionRef {
            name: name.into(),
            code_blocks,
        })
    }

    pub fn literal(value: Literal) -> Self {
        Self::Literal { value }
    }

    pub fn input(index: usize) -> Self {
        Self::Input { index }
    }

    /// Number of code blocks this gene opens.
    pub fn opens(&self) -> usize {
        match self {
            Self::Instruction(i) => i.code_blocks,
            _ => 0,
        }
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Close => write!(f, "close"),
            Self::Input { index } => write!(f, "input_{index}"),
            Self::Instruction(i) => write!(f, "{}", i.name),
            Self::Literal { value } => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_float_literals_compare_by_bits() {
        assert_eq!(Literal::Float(1.5), Literal::Float(1.5));
        assert_ne!(Literal::Float(0.0), Literal::Float(-0.0));
        assert_eq!(Literal::Float(f64::NAN), Literal::Float(f64::NAN));
        assert_ne!(Literal::Int(1), Literal::Float(1.0));
    }

    #[test]
    fn test_genes_hash_structurally() {
        let mut set = HashSet::new();
        set.insert(Gene::literal(Literal::FloatVector(vec![1.0, 2.0])));
        set.insert(Gene::literal(Literal::FloatVector(vec![1.0, 2.0])));
        set.insert(Gene::instruction("exec_if", 2));
        set.insert(Gene::instruction("exec_if", 2));
        set.insert(Gene::Close);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_non_finite_floats_survive_json() {
        let literals = vec![
            Literal::Float(f64::INFINITY),
            Literal::Float(f64::NEG_INFINITY),
            Literal::Float(f64::NAN),
            Literal::Float(-2.5),
            Literal::FloatVector(vec![1.0, f64::NAN, f64::NEG_INFINITY]),
        ];
        let json = serde_json::to_string(&literals).unwrap();
        assert!(json.contains(r#""inf""#));
        assert!(!json.contains("null"));
        let back: Vec<Literal> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, literals);

        assert_eq!(
            serde_json::from_str::<Literal>(r#"{"type":"Float","value":3}"#).unwrap(),
            Literal::Float(3.0)
        );
        assert!(serde_json::from_str::<Literal>(r#"{"type":"Float","value":"big"}"#).is_err());
    }

    #[test]
    fn test_gene_json_shape() {
        let gene = Gene::instruction("int_add", 0);
        let json = serde_json::to_string(&gene).unwrap();
        assert_eq!(json, r#"{"gene":"instruction","name":"int_add","code_blocks":0}"#);

        let lit: Gene = serde_json::from_str(r#"{"gene":"literal","value":{"type":"Int","value":3}}"#)
            .unwrap();
        assert_eq!(lit, Gene::literal(Literal::Int(3)));
    }

    #[test]
    fn test_opens() {
        assert_eq!(Gene::instruction("exec_if", 2).opens(), 2);
        assert_eq!(Gene::Close.opens(), 0);
        assert_eq!(Gene::input(0).opens(), 0);
    }
}
