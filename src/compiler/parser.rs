//! Recursive descent parser for the source language.
//!
//! The parser scans the token stream for the single `static void main() { .. }`
//! entry block and parses its body into a list of [`Statement`]s. Everything
//! outside the entry block is ignored.
//!
//! A statement whose tokens do not match any known form is not a fatal error:
//! the offending tokens are skipped and recorded as
//! [`Statement::Unrecognized`], which the code generator turns into a
//! diagnostic. Only a missing entry block or an unterminated body aborts the
//! parse.

use logos::Logos;

use std::fmt;

use super::ast::{
    BinaryOp, Condition, Expression, Operand, RelOp, Span, Statement,
};
use super::token::Token;

/// Error type of the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ErrorKind,

    /// Stack of parser contexts, innermost first.
    pub context: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The token stream ended in the middle of a construct.
    EndOfStream,

    /// A token that cannot appear at this point of the construct.
    UnexpectedToken { span: Span },

    /// No `static void main() { .. }` block exists in the input.
    MissingEntryBlock,
}

impl ParseError {
    fn end_of_stream() -> ParseError {
        ParseError {
            kind: ErrorKind::EndOfStream,
            context: Vec::new(),
        }
    }

    fn unexpected(span: Span) -> ParseError {
        ParseError {
            kind: ErrorKind::UnexpectedToken { span },
            context: Vec::new(),
        }
    }

    fn context(mut self, ctx: &'static str) -> ParseError {
        self.context.push(ctx);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::EndOfStream => write!(f, "unexpected end of input")?,
            ErrorKind::UnexpectedToken { span } => {
                write!(f, "unexpected token at {}..{}", span.start, span.end)?
            }
            ErrorKind::MissingEntryBlock => {
                write!(f, "no 'static void main() {{ .. }}' entry block found")?
            }
        }

        if let Some(ctx) = self.context.first() {
            write!(f, " while parsing {}", ctx)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

type Result<T> = std::result::Result<T, ParseError>;

/// Parser over a buffered token stream.
pub struct Parser<'a> {
    tokens: Vec<(Token<'a>, Span)>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Parser<'a> {
        let tokens = Token::lexer(source).spanned().collect();

        Parser {
            tokens,
            position: 0,
        }
    }

    /// Parses the body of the entry block.
    pub fn parse(mut self) -> Result<Vec<Statement>> {
        self.find_entry_block()?;
        self.parse_body().map_err(|err| err.context("entry block body"))
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn peek_second(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position + 1).map(|(token, _)| token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.position)
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| {
                let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
                end..end
            })
    }

    fn advance(&mut self) -> Option<(Token<'a>, Span)> {
        let item = self.tokens.get(self.position).cloned();
        if item.is_some() {
            self.position += 1;
        }
        item
    }

    fn expect(&mut self, expected: Token<'a>) -> Result<Span> {
        match self.advance() {
            Some((token, span)) if token == expected => Ok(span),
            Some((_, span)) => Err(ParseError::unexpected(span)),
            None => Err(ParseError::end_of_stream()),
        }
    }

    fn take_ident(&mut self) -> Result<(String, Span)> {
        match self.advance() {
            Some((Token::Ident(name), span)) => Ok((name.to_string(), span)),
            Some((_, span)) => Err(ParseError::unexpected(span)),
            None => Err(ParseError::end_of_stream()),
        }
    }

    /// Advances past the `static void main() {` header, ignoring everything
    /// before it.
    fn find_entry_block(&mut self) -> Result<()> {
        while self.peek().is_some() {
            if self.peek() == Some(&Token::Static) {
                let start = self.position;

                if self.try_entry_header() {
                    return Ok(());
                }

                self.position = start + 1;
            } else {
                self.position += 1;
            }
        }

        Err(ParseError {
            kind: ErrorKind::MissingEntryBlock,
            context: Vec::new(),
        })
    }

    fn try_entry_header(&mut self) -> bool {
        if !matches!(self.advance(), Some((Token::Static, _))) {
            return false;
        }

        if !matches!(self.advance(), Some((Token::Void, _))) {
            return false;
        }

        // Both spellings of the entry point name are accepted.
        match self.advance() {
            Some((Token::Ident("main"), _)) | Some((Token::Ident("Main"), _)) => {}
            _ => return false,
        }

        let rest = [Token::ParenOpen, Token::ParenClose, Token::BraceOpen];

        rest.iter().all(|expected| {
            matches!(self.advance(), Some((token, _)) if token == *expected)
        })
    }

    /// Parses statements until the closing brace of the current block.
    fn parse_body(&mut self) -> Result<Vec<Statement>> {
        let mut body = Vec::new();

        loop {
            match self.peek() {
                Some(Token::BraceClose) => {
                    self.position += 1;
                    return Ok(body);
                }
                Some(_) => {
                    let start = self.position;

                    match self.parse_statement() {
                        Ok(statement) => body.push(statement),
                        Err(err) if matches!(err.kind, ErrorKind::EndOfStream) => {
                            return Err(err);
                        }
                        Err(_) => {
                            self.position = start;
                            let span = self.skip_statement();
                            body.push(Statement::Unrecognized { span });
                        }
                    }
                }
                None => return Err(ParseError::end_of_stream()),
            }
        }
    }

    /// Skips tokens until a statement boundary. Used to resynchronize after
    /// a statement failed to parse.
    fn skip_statement(&mut self) -> Span {
        let start = self.span().start;
        let mut end = self.span().end;
        let mut depth = 0usize;

        while let Some(token) = self.peek() {
            match token {
                Token::Semicolon if depth == 0 => {
                    end = self.span().end;
                    self.position += 1;
                    break;
                }
                Token::BraceOpen => depth += 1,
                Token::BraceClose => {
                    if depth == 0 {
                        break;
                    }

                    depth -= 1;

                    if depth == 0 {
                        end = self.span().end;
                        self.position += 1;
                        break;
                    }
                }
                _ => {}
            }

            end = self.span().end;
            self.position += 1;
        }

        start..end
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek() {
            Some(Token::Byte) => self.parse_declaration(),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::Ident(_)) => match self.peek_second() {
                Some(Token::Assign) => self.parse_assignment(),
                Some(Token::ParenOpen) | Some(Token::Dot) => self.parse_call(),
                _ => Err(ParseError::unexpected(self.span()).context("statement")),
            },
            Some(_) => Err(ParseError::unexpected(self.span()).context("statement")),
            None => Err(ParseError::end_of_stream().context("statement")),
        }
    }

    fn parse_declaration(&mut self) -> Result<Statement> {
        let start = self.expect(Token::Byte)?.start;
        let (name, _) = self.take_ident().map_err(|err| err.context("declaration"))?;
        self.expect(Token::Assign).map_err(|err| err.context("declaration"))?;
        let value = self.parse_expression()?;
        let end = self
            .expect(Token::Semicolon)
            .map_err(|err| err.context("declaration"))?
            .end;

        Ok(Statement::Declaration {
            name,
            value,
            span: start..end,
        })
    }

    fn parse_assignment(&mut self) -> Result<Statement> {
        let (name, span) = self.take_ident()?;
        self.expect(Token::Assign).map_err(|err| err.context("assignment"))?;
        let value = self.parse_expression()?;
        let end = self
            .expect(Token::Semicolon)
            .map_err(|err| err.context("assignment"))?
            .end;

        Ok(Statement::Assignment {
            name,
            value,
            span: span.start..end,
        })
    }

    fn parse_if(&mut self) -> Result<Statement> {
        let start = self.expect(Token::If)?.start;
        let condition = self.parse_parenthesized_condition()?;
        self.expect(Token::BraceOpen).map_err(|err| err.context("if body"))?;
        let body = self.parse_body()?;
        let end = body
            .last()
            .map(|statement| statement.span().end)
            .unwrap_or(start);

        Ok(Statement::If {
            condition,
            body,
            span: start..end,
        })
    }

    fn parse_while(&mut self) -> Result<Statement> {
        let start = self.expect(Token::While)?.start;
        let condition = self.parse_parenthesized_condition()?;
        self.expect(Token::BraceOpen).map_err(|err| err.context("while body"))?;
        let body = self.parse_body()?;
        let end = body
            .last()
            .map(|statement| statement.span().end)
            .unwrap_or(start);

        Ok(Statement::While {
            condition,
            body,
            span: start..end,
        })
    }

    fn parse_call(&mut self) -> Result<Statement> {
        let (mut function, span) = self.take_ident()?;

        while self.peek() == Some(&Token::Dot) {
            self.position += 1;
            let (part, _) = self.take_ident().map_err(|err| err.context("call"))?;
            function.push('.');
            function.push_str(&part);
        }

        self.expect(Token::ParenOpen).map_err(|err| err.context("call"))?;

        let mut args = Vec::new();

        if self.peek() != Some(&Token::ParenClose) {
            loop {
                args.push(self.parse_expression()?);

                match self.peek() {
                    Some(Token::Comma) => {
                        self.position += 1;
                    }
                    _ => break,
                }
            }
        }

        self.expect(Token::ParenClose).map_err(|err| err.context("call"))?;
        let end = self
            .expect(Token::Semicolon)
            .map_err(|err| err.context("call"))?
            .end;

        Ok(Statement::Call {
            function,
            args,
            span: span.start..end,
        })
    }

    fn parse_parenthesized_condition(&mut self) -> Result<Condition> {
        self.expect(Token::ParenOpen).map_err(|err| err.context("condition"))?;
        let condition = self.parse_condition()?;
        self.expect(Token::ParenClose).map_err(|err| err.context("condition"))?;

        Ok(condition)
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        let left = self.parse_expression()?;

        let op = match self.advance() {
            Some((Token::Equal, _)) => RelOp::Equal,
            Some((Token::NotEqual, _)) => RelOp::NotEqual,
            Some((Token::Greater, _)) => RelOp::Greater,
            Some((Token::Less, _)) => RelOp::Less,
            Some((Token::GreaterEqual, _)) => RelOp::GreaterEqual,
            Some((Token::LessEqual, _)) => RelOp::LessEqual,
            Some((_, span)) => {
                return Err(ParseError::unexpected(span).context("condition"))
            }
            None => return Err(ParseError::end_of_stream().context("condition")),
        };

        let right = match self.advance() {
            Some((Token::Literal(value), _)) => Operand::Literal(value),
            Some((Token::Ident(name), _)) => Operand::Variable(name.to_string()),
            Some((_, span)) => {
                return Err(ParseError::unexpected(span).context("condition"))
            }
            None => return Err(ParseError::end_of_stream().context("condition")),
        };

        Ok(Condition { left, op, right })
    }

    /// Parses an additive expression.
    ///
    /// A chain splits at its first `+`, then `-` chains group to the right:
    /// `10 - 3 + 2` is `(10 - 3) + 2` while `a - b - c` is `a - (b - c)`.
    fn parse_expression(&mut self) -> Result<Expression> {
        let mut operands = vec![self.parse_primary()?];
        let mut operators = Vec::new();

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };

            self.position += 1;
            operators.push(op);
            operands.push(self.parse_primary()?);
        }

        Ok(build_expression(operands, operators))
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        match self.advance() {
            Some((Token::Literal(value), _)) => Ok(Expression::Literal(value)),
            Some((Token::Ident(name), _)) => Ok(Expression::Variable(name.to_string())),
            Some((_, span)) => Err(ParseError::unexpected(span).context("expression")),
            None => Err(ParseError::end_of_stream().context("expression")),
        }
    }
}

/// Builds a tree from an operator chain. The chain splits at its first `+`;
/// a chain of only `-` keeps its head and groups the tail to the right.
fn build_expression(mut operands: Vec<Expression>, operators: Vec<BinaryOp>) -> Expression {
    if operators.is_empty() {
        return operands.remove(0);
    }

    match operators.iter().position(|op| *op == BinaryOp::Add) {
        Some(index) => {
            let right_operators = operators[index + 1..].to_vec();
            let right_operands = operands.split_off(index + 1);
            let left_operators = operators[..index].to_vec();

            Expression::Binary {
                op: BinaryOp::Add,
                left: Box::new(build_expression(operands, left_operators)),
                right: Box::new(build_expression(right_operands, right_operators)),
            }
        }
        None => {
            let first = operands.remove(0);
            let rest = operators[1..].to_vec();

            Expression::Binary {
                op: BinaryOp::Subtract,
                left: Box::new(first),
                right: Box::new(build_expression(operands, rest)),
            }
        }
    }
}
