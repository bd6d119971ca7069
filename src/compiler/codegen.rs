//! Bytecode generation from the syntax tree.
//!
//! All evaluation flows through the accumulator. Literals are interned into a
//! constant pool growing up from [`MemoryLayout::const_base`], variables are
//! allocated on first use from [`MemoryLayout::var_base`] and binary
//! operations spill their left operand into the scratch cells. Jumps are
//! emitted against named labels and patched once the whole body has been
//! lowered.
//!
//! Degraded paths never abort the lowering. An unknown identifier evaluates
//! to 0, an unrecognized call target emits nothing and an undefined label
//! leaves its operand at 0. Each of them is recorded as a [`Diagnostic`] on
//! the artifact instead. Only a layout collision is a hard error.

use slog::{trace, Logger};

use std::collections::HashMap;
use std::fmt;

use crate::instruction::{Channel, ChannelSource, Instruction, JumpCondition, OpCode};

use super::ast::{BinaryOp, Condition, Expression, Operand, RelOp, Span, Statement};
use super::{CompileError, CompiledProgram, MemoryLayout};

/// A degraded compilation path. The produced program is still runnable, but
/// part of the source did not mean anything and was lowered to a default.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// An identifier was read before any declaration or assignment gave it an
    /// address. The expression evaluates to 0.
    UnknownVariable { name: String, span: Span },

    /// A call statement whose target is not a device routine. No instructions
    /// were emitted for it.
    UnknownCall { function: String, span: Span },

    /// A run of tokens that formed no known statement and was skipped.
    UnrecognizedStatement { span: Span },

    /// A jump referenced a label that was never placed. Its operand byte
    /// stays 0.
    UnresolvedLabel { label: String, offset: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::UnknownVariable { name, span } => write!(
                f,
                "unknown variable '{}' at {}..{}, evaluates to 0",
                name, span.start, span.end,
            ),
            Diagnostic::UnknownCall { function, span } => write!(
                f,
                "unknown call target '{}' at {}..{}, no code emitted",
                function, span.start, span.end,
            ),
            Diagnostic::UnrecognizedStatement { span } => write!(
                f,
                "unrecognized statement at {}..{}, skipped",
                span.start, span.end,
            ),
            Diagnostic::UnresolvedLabel { label, offset } => write!(
                f,
                "unresolved label '{}' referenced at offset {}, operand left 0",
                label, offset,
            ),
        }
    }
}

pub(crate) struct Codegen {
    layout: MemoryLayout,
    logger: Logger,
    bytecode: Vec<u8>,

    /// Constant pool in allocation order: (value, address).
    constants: Vec<(u8, u8)>,

    /// Variable table in allocation order: (name, address).
    variables: Vec<(String, u8)>,

    labels: HashMap<String, usize>,

    /// Operand byte offsets awaiting a label address.
    patches: Vec<(usize, String)>,

    diagnostics: Vec<Diagnostic>,
    label_counter: usize,
}

impl Codegen {
    pub(crate) fn new(layout: MemoryLayout, logger: Logger) -> Codegen {
        Codegen {
            layout,
            logger,
            bytecode: Vec::new(),
            constants: Vec::new(),
            variables: Vec::new(),
            labels: HashMap::new(),
            patches: Vec::new(),
            diagnostics: Vec::new(),
            label_counter: 0,
        }
    }

    pub(crate) fn lower(
        mut self,
        statements: &[Statement],
    ) -> Result<CompiledProgram, CompileError> {
        for statement in statements {
            self.statement(statement)?;
        }

        self.emit(OpCode::Halt, 0);
        self.check_program_fits()?;
        self.resolve_labels();

        Ok(CompiledProgram {
            layout: self.layout,
            program: self.bytecode,
            constants: self.constants,
            variables: self.variables,
            diagnostics: self.diagnostics,
        })
    }

    fn emit(&mut self, opcode: OpCode, operand: u8) {
        let ins = Instruction { opcode, operand };

        trace!(self.logger, "emit";
            "offset" => self.bytecode.len(),
            "instruction" => %ins);

        self.bytecode.extend_from_slice(&ins.encode());
    }

    fn emit_jump(&mut self, condition: JumpCondition, label: String) {
        self.patches.push((self.bytecode.len() + 1, label));
        self.emit(OpCode::Jump { condition }, 0);
    }

    fn fresh_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    fn place_label(&mut self, label: String) {
        self.labels.insert(label, self.bytecode.len());
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Declaration { name, value, span }
            | Statement::Assignment { name, value, span } => {
                let address = self.variable_address(name)?;
                self.expression(value, span)?;
                self.emit(OpCode::Store, address);
            }

            Statement::If { condition, body, span } => {
                let skip = self.fresh_label("skip");

                self.condition(condition, span)?;
                self.emit_jump(JumpCondition::Zero, skip.clone());

                for statement in body {
                    self.statement(statement)?;
                }

                self.place_label(skip);
            }

            Statement::While { condition, body, span } => {
                let start = self.fresh_label("loop");
                let end = self.fresh_label("end");

                self.place_label(start.clone());
                self.condition(condition, span)?;
                self.emit_jump(JumpCondition::Zero, end.clone());

                for statement in body {
                    self.statement(statement)?;
                }

                self.emit_jump(JumpCondition::Unconditional, start);
                self.place_label(end);
            }

            Statement::Call { function, args, span } => {
                self.call(function, args, span)?;
            }

            Statement::Unrecognized { span } => {
                self.diagnostics.push(Diagnostic::UnrecognizedStatement {
                    span: span.clone(),
                });
            }
        }

        Ok(())
    }

    fn call(
        &mut self,
        function: &str,
        args: &[Expression],
        span: &Span,
    ) -> Result<(), CompileError> {
        match function {
            "gpu.set_pixel" if args.len() == 5 => {
                let channels = [
                    Channel::X,
                    Channel::Y,
                    Channel::Red,
                    Channel::Green,
                    Channel::Blue,
                ];

                for (channel, arg) in channels.iter().zip(args) {
                    match arg {
                        Expression::Literal(value) => self.emit(
                            OpCode::SetChannel {
                                channel: *channel,
                                source: ChannelSource::Operand,
                            },
                            *value,
                        ),
                        _ => {
                            self.expression(arg, span)?;
                            self.emit(
                                OpCode::SetChannel {
                                    channel: *channel,
                                    source: ChannelSource::Accumulator,
                                },
                                0,
                            );
                        }
                    }
                }

                self.emit(OpCode::DrawPixel, 0);
            }
            "gpu.clear" => self.emit(OpCode::ClearScreen, 0),
            "input.get_key" => self.emit(OpCode::GetKey, 0),
            "log.print" => self.emit(OpCode::LogPrint, 0),
            _ => self.diagnostics.push(Diagnostic::UnknownCall {
                function: function.to_string(),
                span: span.clone(),
            }),
        }

        Ok(())
    }

    /// Compiles an expression whose value ends up in the accumulator. The
    /// span is the enclosing statement's, used for diagnostics.
    fn expression(
        &mut self,
        expression: &Expression,
        span: &Span,
    ) -> Result<(), CompileError> {
        match expression {
            Expression::Literal(value) => {
                let address = self.constant_address(*value)?;
                self.emit(OpCode::Load, address);
            }

            Expression::Variable(name) => match self.lookup_variable(name) {
                Some(address) => self.emit(OpCode::Load, address),
                None => {
                    self.diagnostics.push(Diagnostic::UnknownVariable {
                        name: name.clone(),
                        span: span.clone(),
                    });
                    let address = self.constant_address(0)?;
                    self.emit(OpCode::Load, address);
                }
            },

            Expression::Binary { op, left, right } => match op {
                BinaryOp::Add => {
                    let (_, spill) = self.layout.scratch;
                    self.expression(left, span)?;
                    self.emit(OpCode::Store, spill);
                    self.expression(right, span)?;
                    self.emit(OpCode::Add, spill);
                }
                BinaryOp::Subtract => {
                    // ACC ends up holding the right operand, so both sides
                    // spill and the left is reloaded before subtracting.
                    let (first, second) = self.layout.scratch;
                    self.expression(left, span)?;
                    self.emit(OpCode::Store, first);
                    self.expression(right, span)?;
                    self.emit(OpCode::Store, second);
                    self.emit(OpCode::Load, first);
                    self.emit(OpCode::Subtract, second);
                }
            },
        }

        Ok(())
    }

    fn condition(
        &mut self,
        condition: &Condition,
        span: &Span,
    ) -> Result<(), CompileError> {
        self.expression(&condition.left, span)?;

        let (immediate, operand) = match &condition.right {
            Operand::Literal(value) => (true, *value),
            Operand::Variable(name) => match self.lookup_variable(name) {
                Some(address) => (false, address),
                None => {
                    self.diagnostics.push(Diagnostic::UnknownVariable {
                        name: name.clone(),
                        span: span.clone(),
                    });
                    (true, 0)
                }
            },
        };

        match condition.op {
            RelOp::Equal => {
                self.emit(OpCode::Compare { immediate }, operand);
                self.emit(OpCode::Not, 0);
            }
            RelOp::NotEqual => self.emit(OpCode::Compare { immediate }, operand),
            RelOp::Greater => self.emit(OpCode::Greater { immediate }, operand),
            RelOp::Less => self.emit(OpCode::Less { immediate }, operand),
            RelOp::GreaterEqual => {
                self.emit(OpCode::Less { immediate }, operand);
                self.emit(OpCode::Not, 0);
            }
            RelOp::LessEqual => {
                self.emit(OpCode::Greater { immediate }, operand);
                self.emit(OpCode::Not, 0);
            }
        }

        Ok(())
    }

    fn lookup_variable(&self, name: &str) -> Option<u8> {
        self.variables
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, address)| *address)
    }

    fn variable_address(&mut self, name: &str) -> Result<u8, CompileError> {
        if let Some(address) = self.lookup_variable(name) {
            return Ok(address);
        }

        let address = self.layout.var_base as usize + self.variables.len();
        let limit = self.layout.scratch.0.min(self.layout.scratch.1) as usize;

        if address >= limit {
            return Err(CompileError::LayoutOverlap {
                region: "variables",
                needed: address,
                limit,
            });
        }

        let address = address as u8;

        trace!(self.logger, "allocate variable";
            "name" => name,
            "address" => address);

        self.variables.push((name.to_string(), address));

        Ok(address)
    }

    fn constant_address(&mut self, value: u8) -> Result<u8, CompileError> {
        if let Some((_, address)) = self
            .constants
            .iter()
            .find(|(existing, _)| *existing == value)
        {
            return Ok(*address);
        }

        let address = self.layout.const_base as usize + self.constants.len();
        let limit = self.layout.var_base as usize;

        if address >= limit {
            return Err(CompileError::LayoutOverlap {
                region: "constant pool",
                needed: address,
                limit,
            });
        }

        let address = address as u8;

        trace!(self.logger, "intern constant";
            "value" => value,
            "address" => address);

        self.constants.push((value, address));

        Ok(address)
    }

    fn check_program_fits(&self) -> Result<(), CompileError> {
        let limit = self.layout.const_base as usize;

        if self.bytecode.len() > limit {
            return Err(CompileError::LayoutOverlap {
                region: "program",
                needed: self.bytecode.len(),
                limit,
            });
        }

        Ok(())
    }

    fn resolve_labels(&mut self) {
        for (offset, label) in std::mem::take(&mut self.patches) {
            match self.labels.get(&label) {
                Some(address) => self.bytecode[offset] = *address as u8,
                None => self.diagnostics.push(Diagnostic::UnresolvedLabel {
                    label,
                    offset,
                }),
            }
        }
    }
}
