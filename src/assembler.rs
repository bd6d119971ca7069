//! Stateless assembler from mnemonic/operand token pairs to raw bytecode.
//!
//! The input is a flat ordered list of alternating mnemonic and
//! operand-literal tokens:
//!
//! ```
//! use px8::assembler::assemble;
//!
//! let program = assemble(&["LOAD", "0x10", "ADD", "0x11", "HLT", "0"]).unwrap();
//!
//! assert_eq!(program, [0x01, 0x10, 0x03, 0x11, 0x0F, 0x00]);
//! ```

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::map_res,
    sequence::preceded,
    IResult,
};

use crate::instruction::{OpCode, OPCODES};

/// Error type for assembly failures. Any failure aborts the whole assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblerError {
    UnknownMnemonic {
        /// The offending token.
        mnemonic: String,

        /// Index of the token in the input list.
        position: usize,

        /// The closest known mnemonic, if one is close enough to be a likely
        /// typo.
        suggestion: Option<String>,
    },
}

impl fmt::Display for AssemblerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssemblerError::UnknownMnemonic { mnemonic, position, suggestion } => {
                write!(f, "unknown mnemonic '{}' at token {}", mnemonic, position)?;

                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean '{}'?)", suggestion)?;
                }

                Ok(())
            }
        }
    }
}

impl std::error::Error for AssemblerError {}

fn take_u8(input: &str) -> IResult<&str, u8> {
    alt((
        map_res(
            preceded(
                tag("0x"),
                take_while1(|c: char| c.is_digit(16)),
            ),
            |n| u8::from_str_radix(n, 16),
        ),
        map_res(
            take_while1(|c: char| c.is_digit(10)),
            |n| u8::from_str_radix(n, 10),
        ),
    ))(input)
}

/// Parses an operand literal: decimal, or hexadecimal with a `0x` prefix.
///
/// A malformed or out-of-range literal silently assembles to 0. This is a
/// long-standing quirk of the format and callers rely on it for no-operand
/// mnemonics, so it is not an error.
fn parse_operand(literal: &str) -> u8 {
    match take_u8(literal.trim()) {
        Ok(("", value)) => value,
        _ => 0,
    }
}

lazy_static::lazy_static! {
    static ref MNEMONICS: Vec<String> = OPCODES.iter().map(|opcode| opcode.to_string()).collect();
}

fn suggest(mnemonic: &str) -> Option<String> {
    let upper = mnemonic.to_uppercase();

    MNEMONICS
        .iter()
        .map(|m| (edit_distance::edit_distance(&upper, m), m))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= 2)
        .map(|(_, m)| m.clone())
}

/// Assembles an ordered list of alternating mnemonic and operand-literal
/// tokens into bytecode.
///
/// Each pair emits exactly two bytes, so the output length is always even. A
/// trailing mnemonic without an operand token assembles with operand 0.
///
/// # Errors
/// An unknown mnemonic aborts the whole assembly with
/// [AssemblerError::UnknownMnemonic].
pub fn assemble<I, S>(tokens: I) -> Result<Vec<u8>, AssemblerError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tokens = tokens.into_iter().collect::<Vec<_>>();
    let mut program = Vec::with_capacity(tokens.len());

    for (index, pair) in tokens.chunks(2).enumerate() {
        let mnemonic = pair[0].as_ref();

        let opcode = OpCode::from_mnemonic(mnemonic).ok_or_else(|| {
            AssemblerError::UnknownMnemonic {
                mnemonic: mnemonic.to_string(),
                position: index * 2,
                suggestion: suggest(mnemonic),
            }
        })?;

        let operand = pair.get(1).map(|t| parse_operand(t.as_ref())).unwrap_or(0);

        program.push(opcode.as_byte());
        program.push(operand);
    }

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_pairs_in_order() {
        let program = assemble(&[
            "LOAD", "0x10",
            "ADD", "0x11",
            "STORE", "0x12",
            "HLT", "0",
        ])
        .unwrap();

        assert_eq!(program, [0x01, 0x10, 0x03, 0x11, 0x02, 0x12, 0x0F, 0x00]);
        assert_eq!(program.len() % 2, 0);
    }

    #[test]
    fn operand_literals_are_decimal_or_hex() {
        assert_eq!(parse_operand("42"), 42);
        assert_eq!(parse_operand("0xFF"), 255);
        assert_eq!(parse_operand("0x0a"), 10);
    }

    #[test]
    fn malformed_operands_default_to_zero() {
        assert_eq!(parse_operand(""), 0);
        assert_eq!(parse_operand("banana"), 0);
        assert_eq!(parse_operand("0x"), 0);
        assert_eq!(parse_operand("0xZZ"), 0);
        assert_eq!(parse_operand("12three"), 0);
        // out of range for a byte
        assert_eq!(parse_operand("256"), 0);
    }

    #[test]
    fn unknown_mnemonic_aborts_with_a_suggestion() {
        let err = assemble(&["LAOD", "0x10"]).unwrap_err();

        match err {
            AssemblerError::UnknownMnemonic { mnemonic, position, suggestion } => {
                assert_eq!(mnemonic, "LAOD");
                assert_eq!(position, 0);
                assert_eq!(suggestion.as_deref(), Some("LOAD"));
            }
        }
    }

    #[test]
    fn trailing_mnemonic_gets_operand_zero() {
        let program = assemble(&["CLEAR_SCREEN"]).unwrap();
        assert_eq!(program, [0x16, 0x00]);
    }

    #[test]
    fn mnemonics_are_case_insensitive() {
        let program = assemble(&["load", "1", "hlt", "0"]).unwrap();
        assert_eq!(program, [0x01, 0x01, 0x0F, 0x00]);
    }
}
