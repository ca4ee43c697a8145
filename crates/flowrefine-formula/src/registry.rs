//! Function registry
//!
//! Maps workflow formula functions to Trino SQL. The registry is built
//! once and shared read-only; lookups are case-insensitive.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

/// A piece of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Arg(usize),
}

/// Target expression with positional `{n}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
    arity: usize,
}

impl Template {
    /// Parse `{0}`-style placeholders. Braces that do not enclose a
    /// decimal index are literal text.
    pub fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut arity = 0;
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let digits = after.chars().take_while(|c| c.is_ascii_digit()).count();
            let index = (digits > 0 && after[digits..].starts_with('}'))
                .then(|| after[..digits].parse::<usize>().ok())
                .flatten();

            match index {
                Some(index) => {
                    text.push_str(&rest[..open]);
                    if !text.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut text)));
                    }
                    parts.push(Part::Arg(index));
                    arity = arity.max(index + 1);
                    rest = &after[digits + 1..];
                }
                None => {
                    text.push_str(&rest[..=open]);
                    rest = after;
                }
            }
        }
        text.push_str(rest);
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }

        Self { parts, arity }
    }

    /// Number of arguments the template refers to
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Substitute arguments, or `None` if too few were supplied
    pub fn render(&self, args: &[String]) -> Option<String> {
        if args.len() < self.arity {
            return None;
        }

        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Arg(index) => out.push_str(&args[*index]),
            }
        }
        Some(out)
    }
}

/// Functions that need custom code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Special {
    /// `IIF(cond, then, else)` to `CASE WHEN`
    Conditional,

    /// `Switch(value, default, case1, result1, ...)` to `CASE value WHEN`
    Switch,

    /// Two-argument date function whose literal format string is rewritten
    DateFormat { target: String },

    /// Known function with no SQL expression equivalent
    Unsupported,
}

/// How one function is rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Fixed-arity expression template
    Template(Template),

    /// Same arguments, new function name
    Rename { target: String },

    /// Arguments forwarded to a variadic function
    Variadic { target: String },

    /// Zero-argument function replaced by fixed text
    Constant { text: String },

    Special(Special),
}

impl Rule {
    pub fn template(source: &str) -> Self {
        Self::Template(Template::parse(source))
    }

    pub fn rename(target: &str) -> Self {
        Self::Rename { target: target.to_string() }
    }

    pub fn variadic(target: &str) -> Self {
        Self::Variadic { target: target.to_string() }
    }

    pub fn constant(text: &str) -> Self {
        Self::Constant { text: text.to_string() }
    }

    pub fn date_format(target: &str) -> Self {
        Self::Special(Special::DateFormat { target: target.to_string() })
    }

    /// Target SQL function names this rule writes out
    fn emitted(&self) -> Vec<String> {
        match self {
            Self::Rename { target }
            | Self::Variadic { target }
            | Self::Special(Special::DateFormat { target }) => vec![target.clone()],
            Self::Template(template) => template
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text(text) => Some(call_names(text)),
                    Part::Arg(_) => None,
                })
                .flatten()
                .collect(),
            Self::Constant { text } => call_names(text),
            Self::Special(_) => Vec::new(),
        }
    }
}

/// Upper-case identifiers directly followed by `(` in a piece of SQL
fn call_names(sql: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut word = String::new();

    for c in sql.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        let is_name = word.starts_with(|w: char| w.is_ascii_alphabetic())
            && !word.chars().any(|w| w.is_ascii_lowercase());
        if c == '(' && is_name {
            names.push(word.clone());
        }
        word.clear();
    }

    names
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    rule: Rule,
}

/// Case-insensitive function table
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    entries: HashMap<String, Entry>,

    /// Target function names written by any rule, case-sensitive
    emitted: HashSet<String>,
}

impl FunctionRegistry {
    /// Registry with no functions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a function, keeping `name` as its canonical spelling
    pub fn with(mut self, name: &str, rule: Rule) -> Self {
        let replaced = self.entries.insert(
            name.to_ascii_lowercase(),
            Entry {
                name: name.to_string(),
                rule,
            },
        );

        if replaced.is_some() {
            self.emitted = self.entries.values().flat_map(|e| e.rule.emitted()).collect();
        } else if let Some(entry) = self.entries.get(&name.to_ascii_lowercase()) {
            self.emitted.extend(entry.rule.emitted());
        }
        self
    }

    /// True when `name` is a target SQL function some rule produces
    pub fn emits(&self, name: &str) -> bool {
        self.emitted.contains(name)
    }

    /// Look up a function by any casing, returning its canonical name and rule
    pub fn lookup(&self, name: &str) -> Option<(&str, &Rule)> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|entry| (entry.name.as_str(), &entry.rule))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.values().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Process-wide Trino registry
    pub fn shared_trino() -> Arc<Self> {
        static TRINO: OnceLock<Arc<FunctionRegistry>> = OnceLock::new();
        TRINO.get_or_init(|| Arc::new(Self::trino())).clone()
    }

    /// Full Trino mapping table
    pub fn trino() -> Self {
        Self::empty()
            // String
            .with("Trim", Rule::rename("TRIM"))
            .with("TrimLeft", Rule::rename("LTRIM"))
            .with("TrimRight", Rule::rename("RTRIM"))
            .with("Left", Rule::template("SUBSTR({0}, 1, {1})"))
            .with("Right", Rule::template("SUBSTR({0}, LENGTH({0}) - {1} + 1)"))
            .with("Substring", Rule::rename("SUBSTR"))
            .with("Length", Rule::rename("LENGTH"))
            .with("UpperCase", Rule::rename("UPPER"))
            .with("LowerCase", Rule::rename("LOWER"))
            .with("Proper", Rule::rename("INITCAP"))
            .with("PadLeft", Rule::rename("LPAD"))
            .with("PadRight", Rule::rename("RPAD"))
            .with("Replace", Rule::rename("REPLACE"))
            .with("ReplaceFirst", Rule::template("REGEXP_REPLACE({0}, {1}, {2}, 1)"))
            .with("Concat", Rule::variadic("CONCAT"))
            .with("ReverseString", Rule::rename("REVERSE"))
            .with("Contains", Rule::template("STRPOS({0}, {1}) > 0"))
            .with("StartsWith", Rule::rename("STARTS_WITH"))
            .with("EndsWith", Rule::rename("ENDS_WITH"))
            .with("FindString", Rule::rename("STRPOS"))
            .with("CountWords", Rule::template("CARDINALITY(SPLIT({0}, ' '))"))
            .with("GetWord", Rule::template("SPLIT({0}, ' ')[{1}]"))
            .with("MD5_ASCII", Rule::rename("MD5"))
            .with("MD5_UNICODE", Rule::rename("MD5"))
            // Math
            .with("Abs", Rule::rename("ABS"))
            .with("Ceil", Rule::rename("CEIL"))
            .with("Ceiling", Rule::rename("CEIL"))
            .with("Floor", Rule::rename("FLOOR"))
            .with("Round", Rule::rename("ROUND"))
            .with("Pow", Rule::rename("POWER"))
            .with("Power", Rule::rename("POWER"))
            .with("Sqrt", Rule::rename("SQRT"))
            .with("Exp", Rule::rename("EXP"))
            .with("Log", Rule::rename("LN"))
            .with("Log10", Rule::rename("LOG10"))
            .with("Log2", Rule::rename("LOG2"))
            .with("Mod", Rule::rename("MOD"))
            .with("Sign", Rule::rename("SIGN"))
            .with("Sin", Rule::rename("SIN"))
            .with("Cos", Rule::rename("COS"))
            .with("Tan", Rule::rename("TAN"))
            .with("ASin", Rule::rename("ASIN"))
            .with("ACos", Rule::rename("ACOS"))
            .with("ATan", Rule::rename("ATAN"))
            .with("ATan2", Rule::rename("ATAN2"))
            .with("Rand", Rule::constant("RAND()"))
            .with("RandInt", Rule::template("FLOOR(RAND() * ({1} - {0} + 1)) + {0}"))
            .with("PI", Rule::constant("PI()"))
            .with("Min", Rule::variadic("LEAST"))
            .with("Max", Rule::variadic("GREATEST"))
            // Conversion
            .with("ToNumber", Rule::template("CAST({0} AS DOUBLE)"))
            .with("ToInteger", Rule::template("CAST({0} AS BIGINT)"))
            .with("ToString", Rule::template("CAST({0} AS VARCHAR)"))
            .with("CharToInt", Rule::rename("CODEPOINT"))
            .with("IntToHex", Rule::template("TO_HEX(CAST({0} AS VARBINARY))"))
            .with("HexToNumber", Rule::template("FROM_HEX({0})"))
            .with("ConvertToDate", Rule::template("CAST({0} AS DATE)"))
            .with("ConvertToDateTime", Rule::template("CAST({0} AS TIMESTAMP)"))
            .with("BinToInt", Rule::template("FROM_BASE({0}, 2)"))
            // Date/time
            .with("DateTimeNow", Rule::constant("CURRENT_TIMESTAMP"))
            .with("DateTimeToday", Rule::constant("CURRENT_DATE"))
            .with("DateTimeYear", Rule::rename("YEAR"))
            .with("DateTimeMonth", Rule::rename("MONTH"))
            .with("DateTimeDay", Rule::rename("DAY"))
            .with("DateTimeHour", Rule::rename("HOUR"))
            .with("DateTimeMinutes", Rule::rename("MINUTE"))
            .with("DateTimeSeconds", Rule::rename("SECOND"))
            .with("DateTimeDayOfWeek", Rule::rename("DAY_OF_WEEK"))
            .with("DateTimeDayOfYear", Rule::rename("DAY_OF_YEAR"))
            .with("DateTimeQuarter", Rule::rename("QUARTER"))
            .with("DateTimeWeekOfYear", Rule::rename("WEEK"))
            .with("DateTimeAdd", Rule::template("DATE_ADD({2}, {1}, {0})"))
            .with("DateTimeDiff", Rule::template("DATE_DIFF({2}, {0}, {1})"))
            .with("DateTimeFormat", Rule::date_format("DATE_FORMAT"))
            .with("DateTimeParse", Rule::date_format("DATE_PARSE"))
            .with("DateTimeTrim", Rule::template("DATE_TRUNC({1}, {0})"))
            .with("DateTimeFirstOfMonth", Rule::template("DATE_TRUNC('month', {0})"))
            .with("DateTimeLastOfMonth", Rule::template("LAST_DAY_OF_MONTH({0})"))
            // Conditional
            .with("IIF", Rule::Special(Special::Conditional))
            .with("IsNull", Rule::template("({0} IS NULL)"))
            .with("IsEmpty", Rule::template("({0} = '')"))
            .with("IsNumber", Rule::template("TRY_CAST({0} AS DOUBLE) IS NOT NULL"))
            .with("IsString", Rule::template("TYPEOF({0}) = 'varchar'"))
            .with("Null", Rule::constant("NULL"))
            .with("Coalesce", Rule::variadic("COALESCE"))
            .with("NullIf", Rule::rename("NULLIF"))
            .with("Switch", Rule::Special(Special::Switch))
            // Regex
            .with("REGEX_Match", Rule::rename("REGEXP_LIKE"))
            .with("REGEX_Replace", Rule::rename("REGEXP_REPLACE"))
            .with("REGEX_CountMatches", Rule::template("CARDINALITY(REGEXP_EXTRACT_ALL({0}, {1}))"))
            // Spatial
            .with("Distance", Rule::rename("ST_DISTANCE"))
            .with("Centroid", Rule::rename("ST_CENTROID"))
            .with("Average", Rule::variadic("AVG"))
            // File
            .with("FileExists", Rule::Special(Special::Unsupported))
            .with("FileGetDir", Rule::Special(Special::Unsupported))
            .with("FileGetExt", Rule::template(r"REGEXP_EXTRACT({0}, '\.([^.]+)$', 1)"))
            .with("FileGetName", Rule::template(r"REGEXP_EXTRACT({0}, '([^/\\\\]+)$', 1)"))
    }
}
