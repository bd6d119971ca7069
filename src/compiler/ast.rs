//! Syntax tree produced by the [parser](crate::compiler::parser) and consumed
//! by the code generator.

use std::ops::Range;

/// Byte range of the original source text an AST node was parsed from.
pub type Span = Range<usize>;

/// An arithmetic expression evaluating to a byte in the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// An unsigned decimal literal.
    Literal(u8),

    /// A reference to a declared variable.
    Variable(String),

    /// A binary operation. A chain splits at its first `+`, and `-` chains
    /// group to the right: `10 - 3 + 2` is `(10 - 3) + 2` while `a - b - c`
    /// is `a - (b - c)`.
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
}

/// Relational operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelOp {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

/// The right-hand side of a condition. Restricted to a literal or a variable
/// so that the comparison can be encoded as a single instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(u8),
    Variable(String),
}

/// A condition of an `if` or `while` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Expression,
    pub op: RelOp,
    pub right: Operand,
}

/// A statement in the entry block.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `byte name = expression;`
    Declaration {
        name: String,
        value: Expression,
        span: Span,
    },

    /// `name = expression;`
    Assignment {
        name: String,
        value: Expression,
        span: Span,
    },

    /// `if (condition) { ... }`
    If {
        condition: Condition,
        body: Vec<Statement>,
        span: Span,
    },

    /// `while (condition) { ... }`
    While {
        condition: Condition,
        body: Vec<Statement>,
        span: Span,
    },

    /// `gpu.set_pixel(arguments...);` and other call statements.
    ///
    /// `function` carries the full dotted path. Whether it names a device
    /// routine is decided during code generation, not parsing.
    Call {
        function: String,
        args: Vec<Expression>,
        span: Span,
    },

    /// A run of tokens that did not form any known statement. Carried through
    /// so that code generation can report it and continue.
    Unrecognized { span: Span },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Declaration { span, .. }
            | Statement::Assignment { span, .. }
            | Statement::If { span, .. }
            | Statement::While { span, .. }
            | Statement::Call { span, .. }
            | Statement::Unrecognized { span } => span.clone(),
        }
    }
}
