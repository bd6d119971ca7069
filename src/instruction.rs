//! Types for representing instructions and their parts.

use std::fmt;

/// Describes the predicate of a jump instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JumpCondition {
    /// Unconditional jump. (`JMP`)
    Unconditional,

    /// Jump if the accumulator is zero. (`JZ`)
    Zero,

    /// Jump if the accumulator is non-zero. (`JNZ`)
    NotZero,
}

/// One of the five display registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    X,
    Y,
    Red,
    Green,
    Blue,
}

impl Channel {
    fn suffix(&self) -> &'static str {
        match self {
            Channel::X => "X",
            Channel::Y => "Y",
            Channel::Red => "R",
            Channel::Green => "G",
            Channel::Blue => "B",
        }
    }
}

/// Where a display register write takes its value from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelSource {
    /// The operand byte of the instruction. (`SET_X`)
    Operand,

    /// The accumulator. (`SET_X_FROM_ACC`)
    Accumulator,
}

/// Instructions of the instruction architecture.
///
/// The opcode space is partitioned by byte range: `0x00-0x0F` for the CPU and
/// control flow, `0x10-0x1B` for the display device, `0x20-0x22` for the input
/// device and `0x30-0x33` for the log register.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Does nothing besides advancing the program counter.
    NoOperation,

    /// Copies a value from a memory location into the accumulator.
    Load,

    /// Copies the accumulator into a memory location.
    Store,

    /// Adds a value from a memory location to the accumulator, wrapping on
    /// overflow.
    Add,

    /// Subtracts a value from a memory location from the accumulator, wrapping
    /// on underflow.
    Subtract,

    /// Changes the program counter if the condition is met.
    Jump {
        condition: JumpCondition,
    },

    /// Sets the accumulator to 1 if the operand differs from it, 0 otherwise.
    ///
    /// Note that this is an *inequality* test. The compiler composes equality
    /// out of this opcode and [Not](OpCode::Not).
    Compare {
        /// When set, the operand byte is an immediate value instead of a
        /// memory address. (`CMP_VAL`)
        immediate: bool,
    },

    /// Sets the accumulator to 1 if it is greater than the operand, 0
    /// otherwise.
    Greater {
        immediate: bool,
    },

    /// Sets the accumulator to 1 if it is less than the operand, 0 otherwise.
    Less {
        immediate: bool,
    },

    /// Logical negation: sets the accumulator to 1 if it is zero, 0 otherwise.
    Not,

    /// Stops the execution.
    Halt,

    /// Loads one of the display registers from the operand or the accumulator.
    SetChannel {
        channel: Channel,
        source: ChannelSource,
    },

    /// Commits the (X, Y) → (R, G, B) write into the pixel grid.
    DrawPixel,

    /// Zeroes the pixel grid.
    ClearScreen,

    /// Sets the accumulator to 1 if the input queue is non-empty, 0 otherwise.
    KeyAvailable,

    /// Dequeues a key code into the accumulator, 0 if the queue is empty.
    GetKey,

    /// Copies the front key code into the accumulator without dequeuing it.
    PeekKey,

    /// Adds the operand to the log register, wrapping on overflow.
    LogAdd,

    /// Copies the log register into the accumulator.
    LogLoad,

    /// Copies the accumulator into the log register.
    LogStore,

    /// Emits the log register in its binary, hexadecimal, decimal and
    /// character renderings.
    LogPrint,
}

use self::ChannelSource::{Accumulator, Operand};

/// Every opcode of the architecture, in byte order. The encoding tests and the
/// mnemonic suggestion machinery iterate over this.
pub const OPCODES: [OpCode; 35] = [
    OpCode::NoOperation,
    OpCode::Load,
    OpCode::Store,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Jump { condition: JumpCondition::Unconditional },
    OpCode::Jump { condition: JumpCondition::Zero },
    OpCode::Jump { condition: JumpCondition::NotZero },
    OpCode::Compare { immediate: false },
    OpCode::Compare { immediate: true },
    OpCode::Greater { immediate: false },
    OpCode::Greater { immediate: true },
    OpCode::Less { immediate: false },
    OpCode::Less { immediate: true },
    OpCode::Not,
    OpCode::Halt,
    OpCode::SetChannel { channel: Channel::X, source: Operand },
    OpCode::SetChannel { channel: Channel::Y, source: Operand },
    OpCode::SetChannel { channel: Channel::Red, source: Operand },
    OpCode::SetChannel { channel: Channel::Green, source: Operand },
    OpCode::SetChannel { channel: Channel::Blue, source: Operand },
    OpCode::DrawPixel,
    OpCode::ClearScreen,
    OpCode::SetChannel { channel: Channel::X, source: Accumulator },
    OpCode::SetChannel { channel: Channel::Y, source: Accumulator },
    OpCode::SetChannel { channel: Channel::Red, source: Accumulator },
    OpCode::SetChannel { channel: Channel::Green, source: Accumulator },
    OpCode::SetChannel { channel: Channel::Blue, source: Accumulator },
    OpCode::KeyAvailable,
    OpCode::GetKey,
    OpCode::PeekKey,
    OpCode::LogAdd,
    OpCode::LogLoad,
    OpCode::LogStore,
    OpCode::LogPrint,
];

impl OpCode {
    pub fn as_byte(&self) -> u8 {
        match self {
            OpCode::NoOperation => 0x00,
            OpCode::Load => 0x01,
            OpCode::Store => 0x02,
            OpCode::Add => 0x03,
            OpCode::Subtract => 0x04,

            OpCode::Jump { condition: JumpCondition::Unconditional } => 0x05,
            OpCode::Jump { condition: JumpCondition::Zero } => 0x06,
            OpCode::Jump { condition: JumpCondition::NotZero } => 0x07,

            OpCode::Compare { immediate: false } => 0x08,
            OpCode::Compare { immediate: true } => 0x09,
            OpCode::Greater { immediate: false } => 0x0A,
            OpCode::Greater { immediate: true } => 0x0B,
            OpCode::Less { immediate: false } => 0x0C,
            OpCode::Less { immediate: true } => 0x0D,

            OpCode::Not => 0x0E,
            OpCode::Halt => 0x0F,

            OpCode::SetChannel { channel: Channel::X, source: Operand } => 0x10,
            OpCode::SetChannel { channel: Channel::Y, source: Operand } => 0x11,
            OpCode::SetChannel { channel: Channel::Red, source: Operand } => 0x12,
            OpCode::SetChannel { channel: Channel::Green, source: Operand } => 0x13,
            OpCode::SetChannel { channel: Channel::Blue, source: Operand } => 0x14,

            OpCode::DrawPixel => 0x15,
            OpCode::ClearScreen => 0x16,

            OpCode::SetChannel { channel: Channel::X, source: Accumulator } => 0x17,
            OpCode::SetChannel { channel: Channel::Y, source: Accumulator } => 0x18,
            OpCode::SetChannel { channel: Channel::Red, source: Accumulator } => 0x19,
            OpCode::SetChannel { channel: Channel::Green, source: Accumulator } => 0x1A,
            OpCode::SetChannel { channel: Channel::Blue, source: Accumulator } => 0x1B,

            OpCode::KeyAvailable => 0x20,
            OpCode::GetKey => 0x21,
            OpCode::PeekKey => 0x22,

            OpCode::LogAdd => 0x30,
            OpCode::LogLoad => 0x31,
            OpCode::LogStore => 0x32,
            OpCode::LogPrint => 0x33,
        }
    }

    /// Decodes an opcode byte. Returns `None` for bytes outside the table;
    /// the execution engine treats those as a fatal halt, not a panic.
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        let opcode = match byte {
            0x00 => OpCode::NoOperation,
            0x01 => OpCode::Load,
            0x02 => OpCode::Store,
            0x03 => OpCode::Add,
            0x04 => OpCode::Subtract,

            0x05 => OpCode::Jump { condition: JumpCondition::Unconditional },
            0x06 => OpCode::Jump { condition: JumpCondition::Zero },
            0x07 => OpCode::Jump { condition: JumpCondition::NotZero },

            0x08 => OpCode::Compare { immediate: false },
            0x09 => OpCode::Compare { immediate: true },
            0x0A => OpCode::Greater { immediate: false },
            0x0B => OpCode::Greater { immediate: true },
            0x0C => OpCode::Less { immediate: false },
            0x0D => OpCode::Less { immediate: true },

            0x0E => OpCode::Not,
            0x0F => OpCode::Halt,

            0x10 => OpCode::SetChannel { channel: Channel::X, source: Operand },
            0x11 => OpCode::SetChannel { channel: Channel::Y, source: Operand },
            0x12 => OpCode::SetChannel { channel: Channel::Red, source: Operand },
            0x13 => OpCode::SetChannel { channel: Channel::Green, source: Operand },
            0x14 => OpCode::SetChannel { channel: Channel::Blue, source: Operand },

            0x15 => OpCode::DrawPixel,
            0x16 => OpCode::ClearScreen,

            0x17 => OpCode::SetChannel { channel: Channel::X, source: Accumulator },
            0x18 => OpCode::SetChannel { channel: Channel::Y, source: Accumulator },
            0x19 => OpCode::SetChannel { channel: Channel::Red, source: Accumulator },
            0x1A => OpCode::SetChannel { channel: Channel::Green, source: Accumulator },
            0x1B => OpCode::SetChannel { channel: Channel::Blue, source: Accumulator },

            0x20 => OpCode::KeyAvailable,
            0x21 => OpCode::GetKey,
            0x22 => OpCode::PeekKey,

            0x30 => OpCode::LogAdd,
            0x31 => OpCode::LogLoad,
            0x32 => OpCode::LogStore,
            0x33 => OpCode::LogPrint,

            _ => return None,
        };

        Some(opcode)
    }

    /// Resolves a mnemonic as written in assembly listings.
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        let opcode = match mnemonic.to_uppercase().as_str() {
            "NOP" => OpCode::NoOperation,
            "LOAD" => OpCode::Load,
            "STORE" => OpCode::Store,
            "ADD" => OpCode::Add,
            "SUB" => OpCode::Subtract,
            "JMP" => OpCode::Jump { condition: JumpCondition::Unconditional },
            "JZ" => OpCode::Jump { condition: JumpCondition::Zero },
            "JNZ" => OpCode::Jump { condition: JumpCondition::NotZero },
            "CMP" => OpCode::Compare { immediate: false },
            "CMP_VAL" => OpCode::Compare { immediate: true },
            "GT" => OpCode::Greater { immediate: false },
            "GT_VAL" => OpCode::Greater { immediate: true },
            "LT" => OpCode::Less { immediate: false },
            "LT_VAL" => OpCode::Less { immediate: true },
            "NOT" => OpCode::Not,
            "HLT" => OpCode::Halt,
            "SET_X" => OpCode::SetChannel { channel: Channel::X, source: Operand },
            "SET_Y" => OpCode::SetChannel { channel: Channel::Y, source: Operand },
            "SET_R" => OpCode::SetChannel { channel: Channel::Red, source: Operand },
            "SET_G" => OpCode::SetChannel { channel: Channel::Green, source: Operand },
            "SET_B" => OpCode::SetChannel { channel: Channel::Blue, source: Operand },
            "DRAW_PIXEL" => OpCode::DrawPixel,
            "CLEAR_SCREEN" => OpCode::ClearScreen,
            "SET_X_FROM_ACC" => OpCode::SetChannel { channel: Channel::X, source: Accumulator },
            "SET_Y_FROM_ACC" => OpCode::SetChannel { channel: Channel::Y, source: Accumulator },
            "SET_R_FROM_ACC" => OpCode::SetChannel { channel: Channel::Red, source: Accumulator },
            "SET_G_FROM_ACC" => OpCode::SetChannel { channel: Channel::Green, source: Accumulator },
            "SET_B_FROM_ACC" => OpCode::SetChannel { channel: Channel::Blue, source: Accumulator },
            "KEY_AVAILABLE" => OpCode::KeyAvailable,
            "GET_KEY" => OpCode::GetKey,
            "PEEK_KEY" => OpCode::PeekKey,
            "LOG_ADD" => OpCode::LogAdd,
            "LOG_LOAD" => OpCode::LogLoad,
            "LOG_STORE" => OpCode::LogStore,
            "LOG_PRINT" => OpCode::LogPrint,
            _ => return None,
        };

        Some(opcode)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpCode::Jump { condition } => {
                let mnemonic = match condition {
                    JumpCondition::Unconditional => "JMP",
                    JumpCondition::Zero => "JZ",
                    JumpCondition::NotZero => "JNZ",
                };

                write!(f, "{}", mnemonic)
            }
            OpCode::SetChannel { channel, source: Operand } => {
                write!(f, "SET_{}", channel.suffix())
            }
            OpCode::SetChannel { channel, source: Accumulator } => {
                write!(f, "SET_{}_FROM_ACC", channel.suffix())
            }
            OpCode::Compare { immediate }
                | OpCode::Greater { immediate }
                | OpCode::Less { immediate } =>
            {
                let base = match self {
                    OpCode::Compare { .. } => "CMP",
                    OpCode::Greater { .. } => "GT",
                    _ => "LT",
                };

                match immediate {
                    true => write!(f, "{}_VAL", base),
                    false => write!(f, "{}", base),
                }
            }
            op => write!(f, "{}", match op {
                OpCode::NoOperation => "NOP",
                OpCode::Load => "LOAD",
                OpCode::Store => "STORE",
                OpCode::Add => "ADD",
                OpCode::Subtract => "SUB",
                OpCode::Not => "NOT",
                OpCode::Halt => "HLT",
                OpCode::DrawPixel => "DRAW_PIXEL",
                OpCode::ClearScreen => "CLEAR_SCREEN",
                OpCode::KeyAvailable => "KEY_AVAILABLE",
                OpCode::GetKey => "GET_KEY",
                OpCode::PeekKey => "PEEK_KEY",
                OpCode::LogAdd => "LOG_ADD",
                OpCode::LogLoad => "LOG_LOAD",
                OpCode::LogStore => "LOG_STORE",
                OpCode::LogPrint => "LOG_PRINT",

                OpCode::Jump { .. }
                    | OpCode::SetChannel { .. }
                    | OpCode::Compare { .. }
                    | OpCode::Greater { .. }
                    | OpCode::Less { .. } => unreachable!(),
            }),
        }
    }
}

/// A single 2-byte instruction: an opcode byte followed by an operand byte.
///
/// Depending on the opcode the operand is either a memory address or an
/// immediate literal. The meaning is fixed per opcode, never per use.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: u8,
}

impl Instruction {
    pub fn new(opcode: OpCode, operand: u8) -> Instruction {
        Instruction { opcode, operand }
    }

    pub fn encode(&self) -> [u8; 2] {
        [self.opcode.as_byte(), self.operand]
    }

    /// Decodes two bytes into an instruction, or `None` if the opcode byte has
    /// no mapping in the table.
    pub fn decode(bytes: [u8; 2]) -> Option<Instruction> {
        OpCode::from_byte(bytes[0]).map(|opcode| Instruction {
            opcode,
            operand: bytes[1],
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.opcode, self.operand)
    }
}
