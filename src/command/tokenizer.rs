//! Shell-style tokenizer
//!
//! Splits on whitespace. Single quotes are literal; double quotes allow
//! `\"` and `\\` escapes. An unterminated quote is a syntax error.

use crate::core::error::{KernelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Between,
    Bare,
    Single,
    Double,
    DoubleEscape,
}

pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = State::Between;

    for c in line.chars() {
        state = match (state, c) {
            (State::Between | State::Bare, c) if c.is_whitespace() => {
                if state == State::Bare {
                    tokens.push(std::mem::take(&mut current));
                }
                State::Between
            }
            (State::Between | State::Bare, '\'') => State::Single,
            (State::Between | State::Bare, '"') => State::Double,
            (State::Between | State::Bare, c) => {
                current.push(c);
                State::Bare
            }
            (State::Single, '\'') => State::Bare,
            (State::Double, '"') => State::Bare,
            (State::Double, '\\') => State::DoubleEscape,
            (State::DoubleEscape, c @ ('"' | '\\')) => {
                current.push(c);
                State::Double
            }
            (State::DoubleEscape, c) => {
                current.push('\\');
                current.push(c);
                State::Double
            }
            (State::Single | State::Double, c) => {
                current.push(c);
                state
            }
        };
    }

    match state {
        State::Between => {}
        State::Bare => tokens.push(current),
        State::Single | State::Double | State::DoubleEscape => {
            return Err(KernelError::SyntaxError("unterminated quote".into()));
        }
    }
    Ok(tokens)
}
