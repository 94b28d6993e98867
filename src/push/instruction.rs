//! Instruction registry.
//!
//! The search core never executes instructions; it only needs each one's name,
//! how many code blocks it opens, and which stacks it touches so the spawner
//! can filter to the configured stacks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Gene, InstructionRef};

/// Static description of one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionMeta {
    pub name: String,
    #[serde(default)]
    pub code_blocks: usize,
    /// Every stack the instruction reads or writes.
    #[serde(default)]
    pub required_stacks: Vec<String>,
}

impl InstructionMeta {
    pub fn new(name: impl Into<String>, code_blocks: usize, required_stacks: &[&str]) -> Self {
        Self {
            name: name.into(),
            code_blocks,
            required_stacks: required_stacks.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn to_gene(&self) -> Gene {
        Gene::Instruction(InstructionRef {
            name: self.name.clone(),
            code_blocks: self.code_blocks,
        })
    }
}

/// Name-indexed instruction registry. Iteration is in name order so that
/// spawning is reproducible under a fixed seed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstructionSet {
    instructions: BTreeMap<String, InstructionMeta>,
}

impl InstructionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instruction, replacing any previous one with the same name.
    pub fn register(&mut self, meta: InstructionMeta) -> &mut Self {
        self.instructions.insert(meta.name.clone(), meta);
        self
    }

    pub fn get(&self, name: &str) -> Option<&InstructionMeta> {
        self.instructions.get(name)
    }

    /// Instructions whose required stacks are all among `stacks`.
    pub fn supported_by<'a>(
        &'a self,
        stacks: &'a [String],
    ) -> impl Iterator<Item = &'a InstructionMeta> + 'a {
        self.instructions
            .values()
            .filter(move |meta| meta.required_stacks.iter().all(|s| stacks.contains(s)))
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// A small core set covering the exec, int, float, bool, str and stdout
    /// stacks.
    pub fn core() -> Self {
        let mut set = Self::new();
        for meta in [
            InstructionMeta::new("exec_dup", 1, &["exec"]),
            InstructionMeta::new("exec_if", 2, &["exec", "bool"]),
            InstructionMeta::new("exec_when", 1, &["exec", "bool"]),
            InstructionMeta::new("exec_do_times", 1, &["exec", "int"]),
            InstructionMeta::new("int_add", 0, &["int"]),
            InstructionMeta::new("int_sub", 0, &["int"]),
            InstructionMeta::new("int_mult", 0, &["int"]),
            InstructionMeta::new("int_div", 0, &["int"]),
            InstructionMeta::new("int_mod", 0, &["int"]),
            InstructionMeta::new("int_lt", 0, &["int", "bool"]),
            InstructionMeta::new("int_eq", 0, &["int", "bool"]),
            InstructionMeta::new("int_dup", 0, &["int"]),
            InstructionMeta::new("int_swap", 0, &["int"]),
            InstructionMeta::new("int_from_float", 0, &["int", "float"]),
            InstructionMeta::new("float_add", 0, &["float"]),
            InstructionMeta::new("float_sub", 0, &["float"]),
            InstructionMeta::new("float_mult", 0, &["float"]),
            InstructionMeta::new("float_div", 0, &["float"]),
            InstructionMeta::new("float_from_int", 0, &["int", "float"]),
            InstructionMeta::new("bool_and", 0, &["bool"]),
            InstructionMeta::new("bool_or", 0, &["bool"]),
            InstructionMeta::new("bool_not", 0, &["bool"]),
            InstructionMeta::new("str_concat", 0, &["str"]),
            InstructionMeta::new("str_length", 0, &["str", "int"]),
            InstructionMeta::new("str_from_int", 0, &["str", "int"]),
            InstructionMeta::new("char_is_digit", 0, &["char", "bool"]),
            InstructionMeta::new("print_int", 0, &["int", "stdout"]),
            InstructionMeta::new("print_str", 0, &["str", "stdout"]),
            InstructionMeta::new("print_newline", 0, &["stdout"]),
        ] {
            set.register(meta);
        }
        set
    }
}

impl FromIterator<InstructionMeta> for InstructionSet {
    fn from_iter<I: IntoIterator<Item = InstructionMeta>>(iter: I) -> Self {
        let mut set = Self::new();
        for meta in iter {
            set.register(meta);
        }
        set
    }
}
