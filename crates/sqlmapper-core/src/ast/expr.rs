//! A minimal OGNL-style expression evaluator (spec.md §9): boolean
//! expressions over a binding map, property-path traversal, and the
//! truthiness rules `<if>`/`<when>` rely on. Supports `==`, `!=`, `>`, `<`,
//! `>=`, `<=`, `&&`, `||`, `!`, the `and`/`or`/`not` spellings, string and
//! numeric literals, property paths, and `null` checks — sufficient for the
//! overwhelming majority of real `<if test="...">` expressions per spec.md
//! §9.

use crate::meta_object::MetaObject;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
    Eof,
}

fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    s.push(chars[i]);
                    i += 1;
                }
                i += 1; // closing quote
                tokens.push(Token::Str(s));
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::Op("&&"));
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Op("||"));
                i += 2;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("=="));
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("!="));
                i += 2;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(">="));
                i += 2;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("<="));
                i += 2;
            }
            '>' => {
                tokens.push(Token::Op(">"));
                i += 1;
            }
            '<' => {
                tokens.push(Token::Op("<"));
                i += 1;
            }
            '!' => {
                tokens.push(Token::Op("!"));
                i += 1;
            }
            _ if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Number(text.parse().unwrap_or(0.0)));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.' || chars[i] == '[' || chars[i] == ']')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => {
                // Unrecognized character: skip it rather than fail the whole
                // expression, keeping this evaluator forgiving like the
                // embedded engines it stands in for.
                i += 1;
            }
        }
    }
    tokens.push(Token::Eof);
    tokens
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    bindings: &'a Value,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> Value {
        let mut left = self.parse_and();
        loop {
            match self.peek() {
                Token::Op("||") | Token::Ident(_) if self.peek_is_kw("or") => {
                    self.advance();
                    let right = self.parse_and();
                    left = Value::Bool(truthy(&left) || truthy(&right));
                }
                _ => break,
            }
        }
        left
    }

    fn peek_is_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == kw)
    }

    fn parse_and(&mut self) -> Value {
        let mut left = self.parse_not();
        loop {
            match self.peek() {
                Token::Op("&&") => {
                    self.advance();
                    let right = self.parse_not();
                    left = Value::Bool(truthy(&left) && truthy(&right));
                }
                Token::Ident(_) if self.peek_is_kw("and") => {
                    self.advance();
                    let right = self.parse_not();
                    left = Value::Bool(truthy(&left) && truthy(&right));
                }
                _ => break,
            }
        }
        left
    }

    fn parse_not(&mut self) -> Value {
        if matches!(self.peek(), Token::Op("!")) || self.peek_is_kw("not") {
            self.advance();
            let inner = self.parse_not();
            return Value::Bool(!truthy(&inner));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Value {
        let left = self.parse_primary();
        let op = match self.peek() {
            Token::Op(op @ ("==" | "!=" | ">" | "<" | ">=" | "<=")) => *op,
            _ => return left,
        };
        self.advance();
        let right = self.parse_primary();
        Value::Bool(compare(op, &left, &right))
    }

    fn parse_primary(&mut self) -> Value {
        match self.advance() {
            Token::LParen => {
                let inner = self.parse_or();
                if matches!(self.peek(), Token::RParen) {
                    self.advance();
                }
                inner
            }
            Token::Number(n) => Value::Float(n),
            Token::Str(s) => Value::Str(s),
            Token::Ident(name) => match name.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                path => resolve_path(self.bindings, path),
            },
            _ => Value::Null,
        }
    }
}

fn resolve_path(bindings: &Value, path: &str) -> Value {
    MetaObject::new(bindings)
        .get(path)
        .cloned()
        .unwrap_or(Value::Null)
}

fn compare(op: &str, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering::*;
    if op == "==" {
        return values_equal(left, right);
    }
    if op == "!=" {
        return !values_equal(left, right);
    }
    match left.partial_cmp(right) {
        Some(ord) => match op {
            ">" => ord == Greater,
            "<" => ord == Less,
            ">=" => ord == Greater || ord == Equal,
            "<=" => ord == Less || ord == Equal,
            _ => false,
        },
        None => false,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => left == right,
    }
}

/// Truthiness used by `<if>`/`<when>`: `null`/`false`/`0`/empty
/// string-list-map are falsy, everything else is truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        Value::List(l) => !l.is_empty(),
        Value::Map(m) => !m.is_empty(),
    }
}

/// Evaluates `test` as a boolean expression against `bindings` (itself a
/// [`Value::Map`], typically [`crate::ast::context::DynamicContext::bindings`]).
pub fn eval_bool(test: &str, bindings: &Value) -> bool {
    let tokens = tokenize(test);
    let mut parser = Parser {
        tokens,
        pos: 0,
        bindings,
    };
    truthy(&parser.parse_or())
}

/// Resolves a plain property path (no operators) against `bindings`, used
/// by `${}` substitution and `<foreach collection="...">`.
pub fn eval_path(path: &str, bindings: &Value) -> Value {
    resolve_path(bindings, path.trim())
}
