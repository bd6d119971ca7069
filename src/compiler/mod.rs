//! Compiler from the source language into machine code.
//!
//! The source language is a small imperative one: byte variables, `+` and `-`
//! arithmetic, `if` and `while` with a single comparison, and calls to the
//! device routines `gpu.set_pixel`, `gpu.clear`, `input.get_key` and
//! `log.print`. A program is the body of its single
//! `static void main() { .. }` block.
//!
//! ```
//! use px8::compiler::compile;
//!
//! let artifact = compile("
//!     static void main() {
//!         byte x = 10;
//!         x = x + 5;
//!     }
//! ").unwrap();
//!
//! assert!(artifact.diagnostics.is_empty());
//! assert_eq!(artifact.variables, vec![("x".to_string(), 200)]);
//! ```
//!
//! The compiler degrades instead of failing wherever the original meaning of
//! the source can be replaced by a default: such paths are reported through
//! [`CompiledProgram::diagnostics`]. Fatal errors are limited to a missing
//! entry block and to programs that outgrow their [`MemoryLayout`].

pub mod ast;
pub mod codegen;
pub mod parser;
pub mod token;

pub use self::codegen::Diagnostic;
pub use self::parser::{ErrorKind, ParseError, Parser};
pub use self::token::Token;

use itertools::Itertools;

use slog::{o, Discard, Logger};

use std::fmt;

use crate::instruction::Instruction;

use self::codegen::Codegen;

/// Placement of the compiler's memory regions in the 256-byte image.
///
/// The defaults put the program at address 0, the constant pool at 100, the
/// variables at 200 and the expression scratch cells at the top of memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryLayout {
    /// First address of the constant pool.
    pub const_base: u8,

    /// First address of variable storage.
    pub var_base: u8,

    /// The two cells used to spill operands of binary expressions.
    pub scratch: (u8, u8),

    /// Total size of the produced memory image.
    pub image_size: usize,
}

impl Default for MemoryLayout {
    fn default() -> MemoryLayout {
        MemoryLayout {
            const_base: 100,
            var_base: 200,
            scratch: (254, 255),
            image_size: 256,
        }
    }
}

/// Error type of the compiler.
///
/// Degraded paths do not produce errors but [`Diagnostic`]s on the artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The source could not be parsed.
    Parse(ParseError),

    /// A memory region grew into the next one.
    LayoutOverlap {
        region: &'static str,
        needed: usize,
        limit: usize,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::Parse(err) => write!(f, "{}", err),
            CompileError::LayoutOverlap { region, needed, limit } => write!(
                f,
                "{} region grew to address {} but must stay below {}",
                region, needed, limit,
            ),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> CompileError {
        CompileError::Parse(err)
    }
}

/// The output of a compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    /// The layout the program was compiled against.
    pub layout: MemoryLayout,

    /// The program text, two bytes per instruction.
    pub program: Vec<u8>,

    /// The constant pool: (value, address) in allocation order.
    pub constants: Vec<(u8, u8)>,

    /// The variable table: (name, address) in allocation order.
    pub variables: Vec<(String, u8)>,

    /// Degraded compilation paths, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledProgram {
    /// Builds the memory image: constants written at their addresses, the
    /// program overlaid at address 0.
    pub fn to_image(&self) -> Vec<u8> {
        let mut image = vec![0; self.layout.image_size.max(self.program.len())];

        for (value, address) in &self.constants {
            image[*address as usize] = *value;
        }

        image[..self.program.len()].copy_from_slice(&self.program);

        image
    }

    /// Renders a human-readable listing of the constant pool, the variable
    /// table and the decoded program text.
    pub fn disassemble(&self) -> String {
        let constants = self
            .constants
            .iter()
            .map(|(value, address)| format!("CONST[0x{:02X}] = {}", address, value))
            .join("\n");

        let variables = self
            .variables
            .iter()
            .map(|(name, address)| format!("VAR[0x{:02X}] = {}", address, name))
            .join("\n");

        let program = self
            .program
            .chunks(2)
            .enumerate()
            .map(|(index, pair)| {
                let line = match Instruction::decode([pair[0], *pair.get(1).unwrap_or(&0)]) {
                    Some(ins) => ins.to_string(),
                    None => format!("UNKNOWN(0x{:02X})", pair[0]),
                };

                format!("{:04X}: {}", index * 2, line)
            })
            .join("\n");

        [
            "=== CONSTANTS ===".to_string(),
            constants,
            "=== VARIABLES ===".to_string(),
            variables,
            "=== PROGRAM ===".to_string(),
            program,
        ]
        .iter()
        .filter(|section| !section.is_empty())
        .join("\n")
    }
}

/// The compiler. Holds the [`MemoryLayout`] and the logger shared by every
/// compilation it runs.
pub struct Compiler {
    layout: MemoryLayout,
    logger: Logger,
}

impl Default for Compiler {
    fn default() -> Compiler {
        Compiler::new(MemoryLayout::default())
    }
}

impl Compiler {
    pub fn new(layout: MemoryLayout) -> Compiler {
        Compiler {
            layout,
            logger: Logger::root(Discard, o!()),
        }
    }

    /// Sets the logger. Pass `None` to silence the compiler.
    pub fn set_logger<L>(&mut self, logger: L)
    where
        L: Into<Option<Logger>>,
    {
        self.logger = logger
            .into()
            .unwrap_or_else(|| Logger::root(Discard, o!()))
            .new(o!("stage" => "compilation"));
    }

    pub fn compile(&self, source: &str) -> Result<CompiledProgram, CompileError> {
        let statements = Parser::new(source).parse()?;

        Codegen::new(self.layout, self.logger.clone()).lower(&statements)
    }
}

/// Compiles a source program against the default [`MemoryLayout`].
pub fn compile(source: &str) -> Result<CompiledProgram, CompileError> {
    Compiler::default().compile(source)
}

/// Like [compile], but logs the compilation to the provided [Logger].
pub fn compile_with_logger<L>(
    source: &str,
    logger: L,
) -> Result<CompiledProgram, CompileError>
where
    L: Into<Option<Logger>>,
{
    let mut compiler = Compiler::default();
    compiler.set_logger(logger);
    compiler.compile(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{JumpCondition, OpCode};

    fn decode(program: &[u8]) -> Vec<(OpCode, u8)> {
        program
            .chunks(2)
            .map(|pair| {
                let ins = Instruction::decode([pair[0], pair[1]]).unwrap();
                (ins.opcode, ins.operand)
            })
            .collect()
    }

    #[test]
    fn declaration_and_compound_assignment() {
        let artifact = compile(
            "static void main() {
                byte x = 10;
                x = x + 5;
            }",
        )
        .unwrap();

        assert!(artifact.diagnostics.is_empty());
        assert_eq!(artifact.variables, vec![("x".to_string(), 200)]);
        assert_eq!(artifact.constants, vec![(10, 100), (5, 101)]);

        assert_eq!(decode(&artifact.program), vec![
            (OpCode::Load, 100),
            (OpCode::Store, 200),
            (OpCode::Load, 200),
            (OpCode::Store, 255),
            (OpCode::Load, 101),
            (OpCode::Add, 255),
            (OpCode::Store, 200),
            (OpCode::Halt, 0),
        ]);
    }

    #[test]
    fn constants_are_deduplicated() {
        let artifact = compile(
            "static void main() {
                byte a = 7;
                byte b = 7;
                byte c = 9;
            }",
        )
        .unwrap();

        assert_eq!(artifact.constants, vec![(7, 100), (9, 101)]);
        assert_eq!(artifact.variables.len(), 3);
    }

    #[test]
    fn subtraction_preserves_operand_order() {
        let artifact = compile("static void main() { byte x = 9 - 4; }").unwrap();

        assert_eq!(decode(&artifact.program), vec![
            (OpCode::Load, 100),
            (OpCode::Store, 254),
            (OpCode::Load, 101),
            (OpCode::Store, 255),
            (OpCode::Load, 254),
            (OpCode::Subtract, 255),
            (OpCode::Store, 200),
            (OpCode::Halt, 0),
        ]);
    }

    #[test]
    fn mixed_arithmetic_evaluates_left_of_the_plus_first() {
        let artifact = compile("static void main() { byte x = 10 - 3 + 2; }").unwrap();

        let mut memory = crate::memory::Memory::new(artifact.layout.image_size);
        memory.load(&artifact.to_image()).unwrap();

        let mut emulator = crate::emulator::Emulator::new(memory);
        emulator.run().unwrap();

        // (10 - 3) + 2, not 10 - (3 + 2).
        assert_eq!(emulator.memory.get(200).unwrap(), 9);
    }

    #[test]
    fn if_lowers_to_a_forward_jump() {
        let artifact = compile(
            "static void main() {
                byte x = 3;
                if (x == 0) {
                    x = 1;
                }
            }",
        )
        .unwrap();

        let program = decode(&artifact.program);

        // LOAD 3, STORE x, LOAD x, CMP_VAL 0, NOT, JZ end-of-body, ...
        assert_eq!(program[3], (OpCode::Compare { immediate: true }, 0));
        assert_eq!(program[4], (OpCode::Not, 0));

        let (opcode, target) = program[5];
        assert_eq!(opcode, OpCode::Jump {
            condition: JumpCondition::Zero,
        });

        // The jump lands on the HLT past the body.
        assert_eq!(program[target as usize / 2], (OpCode::Halt, 0));
    }

    #[test]
    fn while_jumps_back_to_its_condition() {
        let artifact = compile(
            "static void main() {
                byte i = 3;
                while (i > 0) {
                    i = i - 1;
                }
            }",
        )
        .unwrap();

        let program = decode(&artifact.program);

        // Condition starts at the LOAD after the initializer's LOAD + STORE.
        let condition_offset = 4;

        let back_jump = program
            .iter()
            .find(|(opcode, _)| {
                *opcode == OpCode::Jump {
                    condition: JumpCondition::Unconditional,
                }
            })
            .map(|(_, operand)| *operand)
            .unwrap();

        assert_eq!(back_jump, condition_offset);
        assert!(artifact.diagnostics.is_empty());
    }

    #[test]
    fn device_calls_mix_literal_and_computed_arguments() {
        let artifact = compile(
            "static void main() {
                byte x = 12;
                gpu.set_pixel(x, 20, 255, 0, 0);
                gpu.clear();
                input.get_key();
                log.print();
            }",
        )
        .unwrap();

        let program = decode(&artifact.program);

        // x is a variable, so channel X goes through the accumulator.
        assert_eq!(program[2], (OpCode::Load, 200));
        assert_eq!(program[3], (
            OpCode::SetChannel {
                channel: crate::instruction::Channel::X,
                source: crate::instruction::ChannelSource::Accumulator,
            },
            0,
        ));
        assert_eq!(program[4], (
            OpCode::SetChannel {
                channel: crate::instruction::Channel::Y,
                source: crate::instruction::ChannelSource::Operand,
            },
            20,
        ));

        assert!(program.contains(&(OpCode::DrawPixel, 0)));
        assert!(program.contains(&(OpCode::ClearScreen, 0)));
        assert!(program.contains(&(OpCode::GetKey, 0)));
        assert!(program.contains(&(OpCode::LogPrint, 0)));
    }

    #[test]
    fn unknown_identifiers_degrade_to_zero() {
        let artifact = compile("static void main() { byte x = ghost + 1; }").unwrap();

        assert_eq!(artifact.diagnostics.len(), 1);
        assert!(matches!(
            artifact.diagnostics[0],
            Diagnostic::UnknownVariable { .. }
        ));

        // The unknown name loads the interned constant 0.
        assert_eq!(decode(&artifact.program)[0], (OpCode::Load, 100));
        assert_eq!(artifact.constants[0], (0, 100));
    }

    #[test]
    fn unknown_call_targets_are_noops() {
        let artifact = compile(
            "static void main() {
                sound.beep();
                byte x = 1;
            }",
        )
        .unwrap();

        assert_eq!(artifact.diagnostics.len(), 1);
        assert!(matches!(
            artifact.diagnostics[0],
            Diagnostic::UnknownCall { .. }
        ));

        // Only the declaration and the trailing HLT made it out.
        assert_eq!(decode(&artifact.program), vec![
            (OpCode::Load, 100),
            (OpCode::Store, 200),
            (OpCode::Halt, 0),
        ]);
    }

    #[test]
    fn missing_entry_block_is_a_parse_error() {
        let err = compile("byte x = 1;").unwrap_err();

        assert!(matches!(
            err,
            CompileError::Parse(ParseError {
                kind: ErrorKind::MissingEntryBlock,
                ..
            })
        ));
    }

    #[test]
    fn image_places_constants_and_program() {
        let artifact = compile("static void main() { byte x = 42; }").unwrap();
        let image = artifact.to_image();

        assert_eq!(image.len(), 256);
        assert_eq!(image[100], 42);
        assert_eq!(&image[..artifact.program.len()], &artifact.program[..]);
    }

    #[test]
    fn disassembly_lists_every_instruction() {
        let artifact = compile(
            "static void main() {
                byte x = 10;
                x = x + 5;
            }",
        )
        .unwrap();

        let listing = artifact.disassemble();

        assert!(listing.contains("CONST[0x64] = 10"));
        assert!(listing.contains("VAR[0xC8] = x"));
        assert!(listing.contains("0000: LOAD 100"));
        // Offsets are hex: the trailing HLT of this 16-byte program is at 0x0E.
        assert!(listing.contains("000E: HLT 0"));

        let lines = listing
            .lines()
            .filter(|line| line.chars().next().map_or(false, char::is_numeric))
            .count();

        assert_eq!(lines, artifact.program.len() / 2);
    }
}
