//! Programs compiled from plushy genomes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Gene, Genome, InstructionRef, Literal};
use crate::schema::ExecutionConfig;

/// One element of compiled Push code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Code {
    Input(usize),
    Instruction(InstructionRef),
    Literal(Literal),
    Block(CodeBlock),
}

/// A sequence of code, possibly nested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CodeBlock(Vec<Code>);

impl CodeBlock {
    pub fn new(code: Vec<Code>) -> Self {
        Self(code)
    }

    pub fn atoms(&self) -> &[Code] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of atoms and blocks, counted recursively.
    pub fn size(&self) -> usize {
        self.0
            .iter()
            .map(|c| match c {
                Code::Block(b) => 1 + b.size(),
                _ => 1,
            })
            .sum()
    }

    /// Maximum block nesting depth; a flat block has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .0
            .iter()
            .filter_map(|c| match c {
                Code::Block(b) => Some(b.depth()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for CodeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, code) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match code {
                Code::Input(index) => write!(f, "input_{index}")?,
                Code::Instruction(instr) => write!(f, "{}", instr.name)?,
                Code::Literal(lit) => write!(f, "{lit}")?,
                Code::Block(block) => write!(f, "{block}")?,
            }
        }
        write!(f, ")")
    }
}

/// What a program consumes and produces, and the limits it runs under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSignature {
    pub arity: usize,
    pub output_stacks: Vec<String>,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl ProgramSignature {
    pub fn new(arity: usize, output_stacks: &[&str]) -> Self {
        Self {
            arity,
            output_stacks: output_stacks.iter().map(|s| s.to_string()).collect(),
            execution: ExecutionConfig::default(),
        }
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }
}

/// A compiled program together with its signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub code: CodeBlock,
    pub signature: Arc<ProgramSignature>,
}

struct Frame {
    code: Vec<Code>,
    /// Blocks still owed to the instruction that opened this one.
    pending: usize,
}

impl Frame {
    fn new(pending: usize) -> Self {
        Self {
            code: Vec::new(),
            pending,
        }
    }
}

impl Program {
    /// Compile a genome. Compilation is total: a close with no open block is
    /// ignored, and every block still open at the end of the genome is closed
    /// (along with any blocks its instruction was still owed, as empty blocks).
    pub fn compile(genome: &Genome, signature: Arc<ProgramSignature>) -> Self {
        let mut stack = vec![Frame::new(0)];

        for gene in genome.iter() {
            match gene {
                Gene::Close => {
                    if stack.len() > 1 {
                        close_frame(&mut stack);
                    }
                }
                Gene::Input { index } => push_code(&mut stack, Code::Input(*index)),
                Gene::Literal { value } => push_code(&mut stack, Code::Literal(value.clone())),
                Gene::Instruction(instr) => {
                    push_code(&mut stack, Code::Instruction(instr.clone()));
                    if instr.code_blocks > 0 {
                        stack.push(Frame::new(instr.code_blocks - 1));
                    }
                }
            }
        }

        while stack.len() > 1 {
            close_frame(&mut stack);
        }

        let root = stack.pop().map(|f| f.code).unwrap_or_default();
        Self {
            code: CodeBlock(root),
            signature,
        }
    }

    pub fn size(&self) -> usize {
        self.code.size()
    }
}

fn push_code(stack: &mut [Frame], code: Code) {
    if let Some(top) = stack.last_mut() {
        top.code.push(code);
    }
}

/// Close the innermost frame into its parent, opening the next owed block if
/// its instruction has one.
fn close_frame(stack: &mut Vec<Frame>) {
    if let Some(frame) = stack.pop() {
        push_code(stack, Code::Block(CodeBlock(frame.code)));
        if frame.pending > 0 {
            stack.push(Frame::new(frame.pending - 1));
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(genes: Vec<Gene>) -> CodeBlock {
        Program::compile(&genes.into(), Arc::new(ProgramSignature::new(1, &["int"]))).code
    }

    fn int(v: i64) -> Gene {
        Gene::literal(Literal::Int(v))
    }

    #[test]
    fn test_flat_genome() {
        let code = compile(vec![int(1), int(2), Gene::instruction("int_add", 0)]);
        assert_eq!(code.len(), 3);
        assert_eq!(code.depth(), 1);
        assert_eq!(code.to_string(), "(1 2 int_add)");
    }

    #[test]
    fn test_single_block() {
        let code = compile(vec![
            Gene::instruction("exec_dup", 1),
            int(1),
            Gene::Close,
            int(2),
        ]);
        assert_eq!(code.to_string(), "(exec_dup (1) 2)");
    }

    #[test]
    fn test_two_blocks_open_in_sequence() {
        let code = compile(vec![
            Gene::instruction("exec_if", 2),
            int(1),
            Gene::Close,
            int(2),
            Gene::Close,
            int(3),
        ]);
        assert_eq!(code.to_string(), "(exec_if (1) (2) 3)");
    }

    #[test]
    fn test_stray_close_is_ignored() {
        let code = compile(vec![Gene::Close, int(1), Gene::Close, int(2)]);
        assert_eq!(code.to_string(), "(1 2)");
    }

    #[test]
    fn test_open_blocks_closed_at_end() {
        let code = compile(vec![Gene::instruction("exec_if", 2), int(1)]);
        assert_eq!(code.to_string(), "(exec_if (1) ())");

        let nested = compile(vec![
            Gene::instruction("exec_dup", 1),
            Gene::instruction("exec_dup", 1),
            Gene::input(0),
        ]);
        assert_eq!(nested.to_string(), "(exec_dup (exec_dup (input_0)))");
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn test_empty_genome() {
        let code = compile(Vec::new());
        assert!(code.is_empty());
        assert_eq!(code.size(), 0);
    }

    #[test]
    fn test_size_counts_blocks() {
        let code = compile(vec![Gene::instruction("exec_dup", 1), int(1), int(2)]);
        // exec_dup, the block, and its two literals
        assert_eq!(code.size(), 4);
    }
}
