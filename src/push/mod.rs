//! Push program representation.
//!
//! Genomes are flat gene sequences in the plushy style: instructions that take
//! code blocks open them implicitly, and a close gene ends the innermost open
//! block. [`Program::compile`] turns a genome into nested [`CodeBlock`]s. The
//! interpreter that executes programs lives outside this crate, behind the
//! [`Evaluator`](crate::gp::Evaluator) trait.

mod gene;
mod genome;
mod instruction;
mod program;
mod token;

pub use gene::{Gene, InstructionRef, Literal};
pub use genome::Genome;
pub use instruction::{InstructionMeta, InstructionSet};
pub use program::{Code, CodeBlock, Program, ProgramSignature};
pub use token::{Token, VISIBLE, genome_from_tokens, infer_literal, parse_token_sets};
