//! Local arithmetic answers.
//!
//! The grammar is deliberately closed: numeric literals, `+ - * /`, parentheses and
//! whitespace. Anything else is rejected by the tokenizer before evaluation starts.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | '(' expr ')'
//! ```

use std::fmt;
use thiserror::Error;

pub const OPERATORS: &[char] = &['+', '-', '*', '/'];

/// A message needs one of these (lowercased) next to an operator to be treated as math.
pub const INTENT_WORDS: &[&str] = &["calculate", "compute", "what is", "how much is", "solve"];

/// Removed from the lowercased message, in this order, to leave the bare expression.
const STRIPPED_PHRASES: &[&str] = &["what is", "how much is", "calculate", "compute", "solve", "?"];

/// Parentheses deeper than this are refused rather than recursed into.
const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArithmeticError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("malformed number '{0}'")]
    MalformedNumber(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("trailing input after expression")]
    TrailingInput,
    #[error("expression nested too deeply")]
    TooDeep,
    #[error("division by zero")]
    DivisionByZero,
    #[error("numeric overflow")]
    Overflow,
}

/// Integers stay integers until a division or a float literal is involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn finite(value: f64) -> Result<Number, ArithmeticError> {
        if value.is_finite() {
            Ok(Number::Float(value))
        } else {
            Err(ArithmeticError::Overflow)
        }
    }

    fn add(self, rhs: Number) -> Result<Number, ArithmeticError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                a.checked_add(b).map(Number::Int).ok_or(ArithmeticError::Overflow)
            }
            (a, b) => Number::finite(a.as_f64() + b.as_f64()),
        }
    }

    fn sub(self, rhs: Number) -> Result<Number, ArithmeticError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                a.checked_sub(b).map(Number::Int).ok_or(ArithmeticError::Overflow)
            }
            (a, b) => Number::finite(a.as_f64() - b.as_f64()),
        }
    }

    fn mul(self, rhs: Number) -> Result<Number, ArithmeticError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                a.checked_mul(b).map(Number::Int).ok_or(ArithmeticError::Overflow)
            }
            (a, b) => Number::finite(a.as_f64() * b.as_f64()),
        }
    }

    /// True division: the result is always a float.
    fn div(self, rhs: Number) -> Result<Number, ArithmeticError> {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        Number::finite(self.as_f64() / divisor)
    }

    fn neg(self) -> Result<Number, ArithmeticError> {
        match self {
            Number::Int(i) => i.checked_neg().map(Number::Int).ok_or(ArithmeticError::Overflow),
            Number::Float(f) => Ok(Number::Float(-f)),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            // Whole floats keep a trailing ".0" at any magnitude, so 4 / 2 reads as 2.0.
            Number::Float(v) if v.fract() == 0.0 => write!(f, "{:.1}", v),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(n) => write!(f, "'{}'", n),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ArithmeticError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Num(parse_number(&input[start..end])?));
            }
            other => return Err(ArithmeticError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Number, ArithmeticError> {
    let malformed = || ArithmeticError::MalformedNumber(literal.to_string());
    if literal == "." || literal.matches('.').count() > 1 {
        return Err(malformed());
    }
    if literal.contains('.') {
        literal
            .parse::<f64>()
            .map_err(|_| malformed())
            .and_then(Number::finite)
    } else {
        // Digits only, so the sole failure mode is an i64 overflow.
        literal.parse::<i64>().map(Number::Int).map_err(|_| ArithmeticError::Overflow)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Number, ArithmeticError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = value.add(self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = value.sub(self.term()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Number, ArithmeticError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value = value.mul(self.unary()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    value = value.div(self.unary()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<Number, ArithmeticError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.nested(Self::unary)?.neg()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Number, ArithmeticError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(ArithmeticError::UnexpectedToken(other.to_string())),
                    None => Err(ArithmeticError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ArithmeticError::UnexpectedToken(other.to_string())),
            None => Err(ArithmeticError::UnexpectedEnd),
        }
    }

    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<Number, ArithmeticError>,
    ) -> Result<Number, ArithmeticError> {
        if self.depth >= MAX_DEPTH {
            return Err(ArithmeticError::TooDeep);
        }
        self.depth += 1;
        let value = rule(self);
        self.depth -= 1;
        value
    }
}

/// Evaluate a bare arithmetic expression.
pub fn evaluate(expression: &str) -> Result<Number, ArithmeticError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ArithmeticError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(ArithmeticError::TrailingInput);
    }
    Ok(value)
}

/// Operator present and one of [`INTENT_WORDS`] present.
pub fn has_calculation_intent(message: &str) -> bool {
    if !message.contains(OPERATORS) {
        return false;
    }
    let lower = message.to_lowercase();
    INTENT_WORDS.iter().any(|w| lower.contains(w))
}

/// Lowercase the message and strip the interrogative phrases around the expression.
pub fn extract_expression(message: &str) -> String {
    let mut expr = message.to_lowercase();
    for phrase in STRIPPED_PHRASES {
        expr = expr.replace(phrase, "");
    }
    expr.trim().to_string()
}

/// Answer a calculation question, or `None` when the message does not evaluate.
pub fn answer(message: &str) -> Option<String> {
    let expression = extract_expression(message);
    match evaluate(&expression) {
        Ok(result) => Some(format!("🧮 The answer to {} is **{}**.", message, result)),
        Err(e) => {
            tracing::warn!(expression = %expression, error = %e, "Math eval failed");
            None
        }
    }
}
