//! Formula expression transpilation
//!
//! This crate handles:
//! - Tokenizing workflow formula expressions (field references, quoted
//!   literals, operators, function calls)
//! - Parsing function calls into a tree with quote-aware paren matching
//! - Rewriting every call through an immutable function registry into
//!   Trino SQL in a single bottom-up pass
//! - Collecting diagnostics for anything that needs manual follow-up
//! - Summarize aggregation and date format conversion

pub mod lexer;
pub mod parser;
pub mod registry;
pub mod transpiler;
pub mod aggregation;
pub mod date_format;

pub use lexer::{tokenize, Op, Token, TokenKind};
pub use parser::{parse, Item, Parsed};
pub use registry::{FunctionRegistry, Rule, Special, Template};
pub use transpiler::{Conversion, Transpiler};
pub use aggregation::convert_aggregation;
pub use date_format::convert_date_format;
