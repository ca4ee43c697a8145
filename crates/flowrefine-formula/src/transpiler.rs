//! Formula to Trino SQL code generation
//!
//! One bottom-up pass over the call tree: arguments are rendered before the
//! call that contains them, so nested calls convert in any order and the
//! output never depends on how siblings are visited.

use crate::date_format::convert_date_format;
use crate::lexer::{tokenize, Op, Token, TokenKind};
use crate::parser::{parse, Item};
use crate::registry::{FunctionRegistry, Rule, Special};
use flowrefine_core::{Diagnostic, DiagnosticCode, Location, QuoteStyle, TranspilerConfig};
use std::sync::Arc;

/// Output of one conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Converted SQL expression
    pub sql: String,

    /// Everything that needs manual follow-up
    pub diagnostics: Vec<Diagnostic>,
}

impl Conversion {
    /// Diagnostic messages as plain notes
    pub fn notes(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    /// True when nothing needs review
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Expression transpiler
///
/// [`Transpiler::transpile`] is re-entrant. [`Transpiler::convert`] keeps the
/// diagnostics of the most recent call for [`Transpiler::notes`].
#[derive(Debug, Clone)]
pub struct Transpiler {
    registry: Arc<FunctionRegistry>,
    config: TranspilerConfig,
    last: Vec<Diagnostic>,
}

impl Default for Transpiler {
    fn default() -> Self {
        Self::trino()
    }
}

impl Transpiler {
    pub fn new(registry: Arc<FunctionRegistry>, config: TranspilerConfig) -> Self {
        Self {
            registry,
            config,
            last: Vec::new(),
        }
    }

    /// Transpiler over the shared Trino registry with default settings
    pub fn trino() -> Self {
        Self::new(FunctionRegistry::shared_trino(), TranspilerConfig::default())
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &TranspilerConfig {
        &self.config
    }

    /// Convert an expression, remembering its diagnostics
    pub fn convert(&mut self, expr: &str) -> String {
        let conversion = self.transpile(expr);
        self.last = conversion.diagnostics;
        conversion.sql
    }

    /// Notes from the last [`Transpiler::convert`] call
    pub fn notes(&self) -> Vec<String> {
        self.last.iter().map(|d| d.message.clone()).collect()
    }

    /// Diagnostics from the last [`Transpiler::convert`] call
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.last
    }

    /// Convert an expression without touching transpiler state
    pub fn transpile(&self, expr: &str) -> Conversion {
        let source = expr.trim();
        if source.is_empty() {
            return Conversion {
                sql: "NULL".to_string(),
                diagnostics: Vec::new(),
            };
        }

        let tokens = tokenize(source);
        let parsed = parse(&tokens);

        let mut codegen = Codegen {
            registry: &self.registry,
            quote: self.config.double_quoted,
            diagnostics: parsed.diagnostics,
        };
        let sql = codegen.render(&parsed.items).trim().to_string();

        tracing::debug!(
            tokens = tokens.len(),
            diagnostics = codegen.diagnostics.len(),
            "Transpiled expression"
        );

        Conversion {
            sql,
            diagnostics: codegen.diagnostics,
        }
    }
}

/// A rendered call argument
struct Arg {
    sql: String,

    /// Contents of the argument when it is a single string literal
    literal: Option<String>,
}

fn join_args(args: &[Arg]) -> String {
    args.iter().map(|a| a.sql.as_str()).collect::<Vec<_>>().join(", ")
}

/// Trino built-ins that may appear in already-converted SQL without being
/// produced by any registry rule
const SQL_BUILTINS: &[&str] = &[
    "AVG", "CAST", "COUNT", "LEAST", "GREATEST", "MAX", "MIN", "NULLIF", "SUM", "TRY_CAST",
];

/// An all upper-case name the registry does not spell that way is treated
/// as SQL that is already converted, but only when it names a function the
/// target dialect actually has.
fn is_target_sql(registry: &FunctionRegistry, name: &str, canonical: Option<&str>) -> bool {
    let upper = name.chars().any(|c| c.is_ascii_alphabetic())
        && !name.chars().any(|c| c.is_lowercase());
    upper
        && canonical != Some(name)
        && (registry.emits(name) || SQL_BUILTINS.contains(&name))
}

struct Codegen<'r> {
    registry: &'r FunctionRegistry,
    quote: QuoteStyle,
    diagnostics: Vec<Diagnostic>,
}

impl<'r> Codegen<'r> {
    fn render(&mut self, items: &[Item]) -> String {
        let mut out = SqlWriter::default();

        for item in items {
            match item {
                Item::Token(token) => self.token(&mut out, token),
                Item::Group { leading, items } => {
                    let inner = self.render(items);
                    out.push(leading, &format!("({})", inner.trim()));
                }
                Item::Call {
                    name,
                    leading,
                    offset,
                    args,
                } => {
                    let args: Vec<Arg> = args.iter().map(|arg| self.arg(arg)).collect();
                    let sql = self.call(name, *offset, args);
                    out.push(leading, &sql);
                }
            }
        }

        out.finish()
    }

    fn arg(&mut self, items: &[Item]) -> Arg {
        let literal = match items {
            [Item::Token(Token {
                kind: TokenKind::Str { text, terminated: true, .. },
                ..
            })] => Some(text.clone()),
            _ => None,
        };

        Arg {
            sql: self.render(items).trim().to_string(),
            literal,
        }
    }

    fn token(&mut self, out: &mut SqlWriter, token: &Token) {
        let leading = token.leading.as_str();
        match &token.kind {
            TokenKind::Field(name) => {
                out.push(leading, &format!("\"{}\"", name.replace('"', "\"\"")));
            }
            TokenKind::Str { quote, text, terminated: true } => {
                let sql = match (quote, self.quote) {
                    ('"', QuoteStyle::Literal) => format!("'{}'", text.replace('\'', "''")),
                    _ => token.source_text(),
                };
                out.push(leading, &sql);
            }
            TokenKind::Str { terminated: false, .. } => {
                self.note(
                    DiagnosticCode::FormulaUnterminatedString,
                    token.offset,
                    format!("Unterminated string literal at offset {}", token.offset),
                );
                out.push(leading, &token.source_text());
            }
            TokenKind::Op(op) => match op {
                Op::EqEq => out.push(leading, "="),
                Op::NotEq => out.push(leading, "<>"),
                Op::And => out.push_keyword(leading, "AND"),
                Op::Or => out.push_keyword(leading, "OR"),
                Op::Not => out.push_keyword(leading, "NOT"),
                other => out.push(leading, other.as_str()),
            },
            TokenKind::Ident(word) => match word.to_ascii_lowercase().as_str() {
                "if" => out.push_keyword(leading, "CASE WHEN"),
                "elseif" => out.push_keyword(leading, "WHEN"),
                "endif" => out.push_keyword(leading, "END"),
                _ => out.push(leading, word),
            },
            _ => out.push(leading, &token.source_text()),
        }
    }

    fn note(&mut self, code: DiagnosticCode, offset: usize, message: String) {
        tracing::debug!(code = code.as_str(), offset, "{}", message);
        self.diagnostics
            .push(Diagnostic::from_code(code, message).with_location(Location::offset(offset)));
    }

    fn call(&mut self, name: &str, offset: usize, args: Vec<Arg>) -> String {
        let registry = self.registry;
        let entry = registry.lookup(name);

        if is_target_sql(registry, name, entry.map(|(canonical, _)| canonical)) {
            return format!("{}({})", name, join_args(&args));
        }

        let Some((_, rule)) = entry else {
            self.note(
                DiagnosticCode::FormulaUnknownFunction,
                offset,
                format!("No mapping for function: {}", name),
            );
            return format!("/* TODO: unmapped function {} */ {}({})", name, name, join_args(&args));
        };

        match rule {
            Rule::Template(template) => {
                let sqls: Vec<String> = args.iter().map(|a| a.sql.clone()).collect();
                if sqls.len() > template.arity() {
                    self.arity_note(name, offset, template.arity(), sqls.len());
                }
                match template.render(&sqls) {
                    Some(sql) => sql,
                    None => {
                        self.arity_note(name, offset, template.arity(), sqls.len());
                        format!("/* TODO: Fix {} */ {}({})", name, name, join_args(&args))
                    }
                }
            }
            Rule::Rename { target } | Rule::Variadic { target } => {
                format!("{}({})", target, join_args(&args))
            }
            Rule::Constant { text } => {
                if !args.is_empty() {
                    self.arity_note(name, offset, 0, args.len());
                }
                text.clone()
            }
            Rule::Special(Special::Conditional) => self.conditional(name, offset, args),
            Rule::Special(Special::Switch) => self.switch(name, offset, args),
            Rule::Special(Special::DateFormat { target }) => {
                self.date_format(name, target, offset, args)
            }
            Rule::Special(Special::Unsupported) => {
                self.note(
                    DiagnosticCode::FormulaUnsupportedFunction,
                    offset,
                    format!("{} has no SQL equivalent", name),
                );
                format!("/* TODO: Convert {} */ {}({})", name, name, join_args(&args))
            }
        }
    }

    fn arity_note(&mut self, name: &str, offset: usize, expected: usize, got: usize) {
        self.note(
            DiagnosticCode::FormulaArityMismatch,
            offset,
            format!("Argument mismatch for {}: expected {}, got {}", name, expected, got),
        );
    }

    fn conditional(&mut self, name: &str, offset: usize, args: Vec<Arg>) -> String {
        if args.len() < 3 {
            self.note(
                DiagnosticCode::FormulaConditionalArity,
                offset,
                format!("{} expects 3 arguments, got {}; call left unconverted", name, args.len()),
            );
            return format!("{}({})", name, join_args(&args));
        }
        if args.len() > 3 {
            self.note(
                DiagnosticCode::FormulaConditionalArity,
                offset,
                format!("{} expects 3 arguments, got {}; extra arguments dropped", name, args.len()),
            );
        }

        format!(
            "CASE WHEN {} THEN {} ELSE {} END",
            args[0].sql, args[1].sql, args[2].sql
        )
    }

    fn switch(&mut self, name: &str, offset: usize, args: Vec<Arg>) -> String {
        if args.len() < 2 {
            self.note(
                DiagnosticCode::FormulaInvalidSwitch,
                offset,
                format!("{} requires a value and a default, got {} argument(s)", name, args.len()),
            );
            return "/* Invalid Switch */ NULL".to_string();
        }

        let cases = &args[2..];
        if cases.len() % 2 != 0 {
            self.note(
                DiagnosticCode::FormulaInvalidSwitch,
                offset,
                "Switch function has odd number of case/result pairs".to_string(),
            );
            return format!("/* TODO: Fix Switch */ COALESCE({})", join_args(&args));
        }

        let whens: Vec<String> = cases
            .chunks(2)
            .map(|pair| format!("WHEN {} THEN {}", pair[0].sql, pair[1].sql))
            .collect();

        if whens.is_empty() {
            format!("CASE {} ELSE {} END", args[0].sql, args[1].sql)
        } else {
            format!("CASE {} {} ELSE {} END", args[0].sql, whens.join(" "), args[1].sql)
        }
    }

    fn date_format(&mut self, name: &str, target: &str, offset: usize, args: Vec<Arg>) -> String {
        if args.len() != 2 {
            self.arity_note(name, offset, 2, args.len());
            if args.len() < 2 {
                return format!("/* TODO: Fix {} */ {}({})", name, name, join_args(&args));
            }
        }

        let format = match &args[1].literal {
            Some(text) => format!("'{}'", convert_date_format(text).replace('\'', "''")),
            None => args[1].sql.clone(),
        };
        format!("{}({}, {})", target, args[0].sql, format)
    }
}

/// Accumulates SQL text, keeping keyword operators separated by one space
#[derive(Default)]
struct SqlWriter {
    buf: String,
    pad_next: bool,
}

impl SqlWriter {
    fn push(&mut self, leading: &str, text: &str) {
        if leading.is_empty() {
            if self.pad_next && !text.starts_with([')', ',']) {
                self.buf.push(' ');
            }
        } else {
            self.buf.push_str(leading);
        }
        self.pad_next = false;
        self.buf.push_str(text);
    }

    fn push_keyword(&mut self, leading: &str, keyword: &str) {
        if !leading.is_empty() {
            self.buf.push_str(leading);
        } else if self.needs_gap() {
            self.buf.push(' ');
        }
        self.buf.push_str(keyword);
        self.pad_next = true;
    }

    fn needs_gap(&self) -> bool {
        self.buf
            .chars()
            .last()
            .is_some_and(|c| !c.is_whitespace() && c != '(')
    }

    fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sql(expr: &str) -> String {
        Transpiler::trino().transpile(expr).sql
    }

    #[test]
    fn iif_becomes_case() {
        assert_eq!(
            sql(r#"IIF([Status]=="Active", 1, 0)"#),
            r#"CASE WHEN "Status"='Active' THEN 1 ELSE 0 END"#
        );
    }

    #[test]
    fn rename_and_template() {
        assert_eq!(sql("Trim([Name])"), r#"TRIM("Name")"#);
        assert_eq!(sql("IsNull([Field])"), r#"("Field" IS NULL)"#);
        assert_eq!(sql("Left([Code], 3)"), r#"SUBSTR("Code", 1, 3)"#);
    }

    #[test]
    fn unknown_function_keeps_placeholder() {
        let mut transpiler = Transpiler::trino();
        let out = transpiler.convert("FooBar([X])");
        assert_eq!(out, r#"/* TODO: unmapped function FooBar */ FooBar("X")"#);
        assert!(!transpiler.notes().is_empty());
        assert_eq!(transpiler.diagnostics()[0].code, DiagnosticCode::FormulaUnknownFunction);
    }

    #[test]
    fn nested_conditionals() {
        let out = sql("IIF(IIF([A] > 1, 1, 0) == 1, 'big', 'small')");
        assert_eq!(out.matches("CASE WHEN").count(), 2);
        assert_eq!(out.matches("END").count(), 2);
        assert_eq!(
            out,
            "CASE WHEN CASE WHEN \"A\" > 1 THEN 1 ELSE 0 END = 1 THEN 'big' ELSE 'small' END"
        );
    }

    #[test]
    fn operators_are_normalised() {
        assert_eq!(sql("[A]==1&&[B]!=2"), r#""A"=1 AND "B"<>2"#);
        assert_eq!(sql("[A] || ![B]"), r#""A" OR NOT "B""#);
        assert_eq!(sql("!([A] > 1)"), r#"NOT ("A" > 1)"#);
    }

    #[test]
    fn empty_expression_is_null() {
        assert_eq!(sql(""), "NULL");
        assert_eq!(sql("   "), "NULL");
    }

    #[test]
    fn single_quotes_inside_double_quoted_literal() {
        assert_eq!(sql(r#"[Name] == "O'Brien""#), r#""Name" = 'O''Brien'"#);
    }

    #[test]
    fn identifier_style_is_idempotent() {
        let transpiler = Transpiler::new(
            FunctionRegistry::shared_trino(),
            TranspilerConfig {
                double_quoted: QuoteStyle::Identifier,
            },
        );
        let once = transpiler.transpile("[Foo Bar] + 1").sql;
        assert_eq!(once, r#""Foo Bar" + 1"#);
        assert_eq!(transpiler.transpile(&once).sql, once);
    }

    #[test]
    fn converted_sql_functions_pass_through() {
        let out = sql("MIN(TRIM([A]), 2)");
        assert_eq!(out, r#"MIN(TRIM("A"), 2)"#);
    }

    #[test]
    fn upper_case_source_functions_still_convert() {
        assert_eq!(sql("ISNULL([F])"), r#"("F" IS NULL)"#);
        assert_eq!(sql("LEFT([Code], 3)"), r#"SUBSTR("Code", 1, 3)"#);
        assert_eq!(sql("CONTAINS([Name], 'x')"), r#"STRPOS("Name", 'x') > 0"#);
        assert_eq!(sql("DATETIMENOW()"), "CURRENT_TIMESTAMP");
    }

    #[test]
    fn upper_case_unknown_function_is_reported() {
        let mut transpiler = Transpiler::trino();
        let out = transpiler.convert("FOOBAR([X])");
        assert_eq!(out, r#"/* TODO: unmapped function FOOBAR */ FOOBAR("X")"#);
        assert_eq!(transpiler.notes(), vec!["No mapping for function: FOOBAR"]);
    }

    #[test]
    fn converted_output_reconverts_cleanly() {
        let transpiler = Transpiler::new(
            FunctionRegistry::shared_trino(),
            TranspilerConfig {
                double_quoted: QuoteStyle::Identifier,
            },
        );
        let conversion = transpiler.transpile(r#"CAST(SUBSTR("A", 1, 3) AS DOUBLE) + LENGTH("B")"#);
        assert!(conversion.is_clean());
        assert_eq!(conversion.sql, r#"CAST(SUBSTR("A", 1, 3) AS DOUBLE) + LENGTH("B")"#);
    }

    #[test]
    fn switch_forms() {
        assert_eq!(
            sql(r#"Switch([Code], "other", 1, "one", 2, "two")"#),
            "CASE \"Code\" WHEN 1 THEN 'one' WHEN 2 THEN 'two' ELSE 'other' END"
        );

        let odd = Transpiler::trino().transpile("Switch([A], 0, 1)");
        assert_eq!(odd.sql, r#"/* TODO: Fix Switch */ COALESCE("A", 0, 1)"#);
        assert_eq!(odd.diagnostics[0].code, DiagnosticCode::FormulaInvalidSwitch);

        let short = Transpiler::trino().transpile("Switch([A])");
        assert_eq!(short.sql, "/* Invalid Switch */ NULL");
        assert!(!short.is_clean());
    }

    #[test]
    fn conditional_arity() {
        let short = Transpiler::trino().transpile("IIF([A], 1)");
        assert_eq!(short.sql, r#"IIF("A", 1)"#);
        assert_eq!(short.diagnostics[0].code, DiagnosticCode::FormulaConditionalArity);

        let long = Transpiler::trino().transpile("IIF([A], 1, 2, 3)");
        assert_eq!(long.sql, r#"CASE WHEN "A" THEN 1 ELSE 2 END"#);
        assert_eq!(long.diagnostics.len(), 1);
    }

    #[test]
    fn template_arity_mismatch() {
        let conversion = Transpiler::trino().transpile("Left([A])");
        assert_eq!(conversion.sql, r#"/* TODO: Fix Left */ Left("A")"#);
        assert_eq!(conversion.notes(), vec!["Argument mismatch for Left: expected 2, got 1"]);
    }

    #[test]
    fn date_format_literal_is_rewritten() {
        assert_eq!(
            sql(r#"DateTimeFormat([Created], "%Y-%m-%d %H:%M")"#),
            r#"DATE_FORMAT("Created", '%Y-%m-%d %H:%i')"#
        );
        assert_eq!(
            sql("DateTimeParse([S], [Fmt])"),
            r#"DATE_PARSE("S", "Fmt")"#
        );
    }

    #[test]
    fn zero_argument_constants() {
        assert_eq!(sql("DateTimeNow()"), "CURRENT_TIMESTAMP");
        assert_eq!(sql("DateTimeAdd(DateTimeToday(), 1, 'days')"), "DATE_ADD('days', 1, CURRENT_DATE)");
    }

    #[test]
    fn unsupported_function() {
        let conversion = Transpiler::trino().transpile("FileExists([Path])");
        assert_eq!(conversion.sql, r#"/* TODO: Convert FileExists */ FileExists("Path")"#);
        assert_eq!(conversion.diagnostics[0].code, DiagnosticCode::FormulaUnsupportedFunction);
    }

    #[test]
    fn unbalanced_call_is_left_raw() {
        let conversion = Transpiler::trino().transpile("Trim([Name]");
        assert_eq!(conversion.sql, r#"Trim("Name""#);
        assert_eq!(conversion.diagnostics[0].code, DiagnosticCode::FormulaUnbalancedParens);
    }

    #[test]
    fn unterminated_string_is_reported() {
        let conversion = Transpiler::trino().transpile(r#"[A] == "open"#);
        assert_eq!(conversion.diagnostics[0].code, DiagnosticCode::FormulaUnterminatedString);
        assert_eq!(
            conversion.diagnostics[0].location.as_ref().and_then(|l| l.offset),
            Some(7)
        );
    }

    #[test]
    fn if_blocks_become_case() {
        assert_eq!(
            sql(r#"IF [A] > 1 THEN "big" ELSEIF [A] > 0 THEN "small" ELSE "none" ENDIF"#),
            r#"CASE WHEN "A" > 1 THEN 'big' WHEN "A" > 0 THEN 'small' ELSE 'none' END"#
        );
    }

    #[test]
    fn case_insensitive_function_names() {
        assert_eq!(sql("trim([A])"), r#"TRIM("A")"#);
        assert_eq!(sql("uppercase([A])"), r#"UPPER("A")"#);
    }

    #[test]
    fn convert_resets_notes() {
        let mut transpiler = Transpiler::trino();
        transpiler.convert("FooBar(1)");
        assert_eq!(transpiler.notes().len(), 1);
        transpiler.convert("Trim([A])");
        assert!(transpiler.notes().is_empty());
    }
}
