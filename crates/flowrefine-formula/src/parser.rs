//! Call-tree parser
//!
//! Parentheses are matched once up front over the token stream. A word
//! followed by a matched `(` becomes a [`Item::Call`] whose arguments are
//! split on top-level commas; everything else stays a flat token run.
//! Unmatched parentheses are reported and kept as raw tokens.

use crate::lexer::{Token, TokenKind};
use flowrefine_core::{Diagnostic, DiagnosticCode, Location};

/// Words that may precede `(` without being function calls
const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "like", "between", "then", "else", "when", "case", "end", "if",
    "elseif", "endif",
];

/// Parsed expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A token passed through to code generation as-is
    Token(Token),

    /// `name(arg, arg, ...)`
    Call {
        name: String,
        leading: String,
        offset: usize,
        args: Vec<Vec<Item>>,
    },

    /// Parenthesized group that is not a call
    Group {
        leading: String,
        items: Vec<Item>,
    },
}

/// Result of parsing one expression
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub items: Vec<Item>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a token stream into a call tree
pub fn parse(tokens: &[Token]) -> Parsed {
    let mut parser = Parser {
        tokens,
        partner: match_parens(tokens),
        diagnostics: Vec::new(),
    };
    let items = parser.parse_range(0, tokens.len());
    Parsed {
        items,
        diagnostics: parser.diagnostics,
    }
}

/// For every paren token, the index of its partner if it has one
fn match_parens(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut partner = vec![None; tokens.len()];
    let mut open = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => open.push(i),
            TokenKind::RParen => {
                if let Some(start) = open.pop() {
                    partner[start] = Some(i);
                    partner[i] = Some(start);
                }
            }
            _ => {}
        }
    }

    partner
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

struct Parser<'t> {
    tokens: &'t [Token],
    partner: Vec<Option<usize>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    fn parse_range(&mut self, lo: usize, hi: usize) -> Vec<Item> {
        let mut items = Vec::new();
        let mut i = lo;

        while i < hi {
            let token = &self.tokens[i];
            let next_is_paren = self
                .tokens
                .get(i + 1)
                .is_some_and(|t| t.kind == TokenKind::LParen)
                && i + 1 < hi;

            match &token.kind {
                TokenKind::Ident(name) if next_is_paren && !is_keyword(name) => {
                    match self.partner[i + 1] {
                        Some(close) => {
                            let inner = self.parse_range(i + 2, close);
                            items.push(Item::Call {
                                name: name.clone(),
                                leading: token.leading.clone(),
                                offset: token.offset,
                                args: split_args(inner),
                            });
                            i = close + 1;
                        }
                        None => {
                            self.report(
                                token.offset,
                                format!("Unbalanced parentheses in call to {}; call left unconverted", name),
                            );
                            items.push(Item::Token(token.clone()));
                            items.push(Item::Token(self.tokens[i + 1].clone()));
                            i += 2;
                        }
                    }
                }
                TokenKind::LParen => match self.partner[i] {
                    Some(close) => {
                        let inner = self.parse_range(i + 1, close);
                        items.push(Item::Group {
                            leading: token.leading.clone(),
                            items: inner,
                        });
                        i = close + 1;
                    }
                    None => {
                        self.report(token.offset, format!("Unmatched '(' at offset {}", token.offset));
                        items.push(Item::Token(token.clone()));
                        i += 1;
                    }
                },
                TokenKind::RParen => {
                    // Matched closers are consumed with their opener, so this one is stray
                    self.report(token.offset, format!("Unmatched ')' at offset {}", token.offset));
                    items.push(Item::Token(token.clone()));
                    i += 1;
                }
                _ => {
                    items.push(Item::Token(token.clone()));
                    i += 1;
                }
            }
        }

        items
    }

    fn report(&mut self, offset: usize, message: String) {
        tracing::debug!(offset, "{}", message);
        self.diagnostics.push(
            Diagnostic::from_code(DiagnosticCode::FormulaUnbalancedParens, message)
                .with_location(Location::offset(offset)),
        );
    }
}

/// Split call contents on top-level commas. `F()` has no arguments.
fn split_args(items: Vec<Item>) -> Vec<Vec<Item>> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut args = vec![Vec::new()];
    for item in items {
        match item {
            Item::Token(Token { kind: TokenKind::Comma, .. }) => args.push(Vec::new()),
            other => {
                if let Some(current) = args.last_mut() {
                    current.push(other);
                }
            }
        }
    }
    args
}
