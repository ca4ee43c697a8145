//! Formula tokenizer
//!
//! Quoted literals and bracketed field references are single tokens, so
//! parentheses and commas inside them never reach the parser. Whitespace
//! is kept as leading trivia on the following token.

/// Operators of the formula language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `==`
    EqEq,
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<>`
    Diamond,
    Lt,
    Le,
    Gt,
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `!`
    Not,
    Plus,
    Minus,
    Star,
    Slash,
}

impl Op {
    /// Source spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EqEq => "==",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Diamond => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Not => "!",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `[Name]`
    Field(String),

    /// `"text"` or `'text'`
    Str {
        quote: char,
        text: String,
        terminated: bool,
    },

    Number(String),

    /// Function names, keywords and bare words
    Ident(String),

    Op(Op),
    LParen,
    RParen,
    Comma,

    /// Anything else, passed through untouched
    Other(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,

    /// Whitespace preceding the token
    pub leading: String,

    /// Byte offset of the token in the source
    pub offset: usize,
}

impl Token {
    /// Source text of the token, without leading whitespace
    pub fn source_text(&self) -> String {
        match &self.kind {
            TokenKind::Field(name) => format!("[{}]", name),
            TokenKind::Str { quote, text, terminated } => {
                if *terminated {
                    format!("{quote}{text}{quote}")
                } else {
                    format!("{quote}{text}")
                }
            }
            TokenKind::Number(text) | TokenKind::Ident(text) => text.clone(),
            TokenKind::Op(op) => op.as_str().to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Other(c) => c.to_string(),
        }
    }
}

/// Split a formula into tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut leading = String::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c.is_whitespace() {
            leading.push(c);
            i += 1;
            continue;
        }

        let peek = chars.get(i + 1).map(|&(_, c)| c);
        let (kind, width) = match c {
            '[' => match chars[i + 1..].iter().position(|&(_, c)| c == ']') {
                Some(len) if len > 0 => {
                    let name: String = chars[i + 1..i + 1 + len].iter().map(|&(_, c)| c).collect();
                    (TokenKind::Field(name), len + 2)
                }
                _ => (TokenKind::Other('['), 1),
            },
            '"' | '\'' => match chars[i + 1..].iter().position(|&(_, q)| q == c) {
                Some(len) => {
                    let text: String = chars[i + 1..i + 1 + len].iter().map(|&(_, c)| c).collect();
                    (TokenKind::Str { quote: c, text, terminated: true }, len + 2)
                }
                None => {
                    let text: String = chars[i + 1..].iter().map(|&(_, c)| c).collect();
                    (TokenKind::Str { quote: c, text, terminated: false }, chars.len() - i)
                }
            },
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),
            ',' => (TokenKind::Comma, 1),
            '=' if peek == Some('=') => (TokenKind::Op(Op::EqEq), 2),
            '=' => (TokenKind::Op(Op::Eq), 1),
            '!' if peek == Some('=') => (TokenKind::Op(Op::NotEq), 2),
            '!' => (TokenKind::Op(Op::Not), 1),
            '<' if peek == Some('>') => (TokenKind::Op(Op::Diamond), 2),
            '<' if peek == Some('=') => (TokenKind::Op(Op::Le), 2),
            '<' => (TokenKind::Op(Op::Lt), 1),
            '>' if peek == Some('=') => (TokenKind::Op(Op::Ge), 2),
            '>' => (TokenKind::Op(Op::Gt), 1),
            '&' if peek == Some('&') => (TokenKind::Op(Op::And), 2),
            '|' if peek == Some('|') => (TokenKind::Op(Op::Or), 2),
            '+' => (TokenKind::Op(Op::Plus), 1),
            '-' => (TokenKind::Op(Op::Minus), 1),
            '*' => (TokenKind::Op(Op::Star), 1),
            '/' => (TokenKind::Op(Op::Slash), 1),
            c if c.is_ascii_digit() || (c == '.' && peek.is_some_and(|p| p.is_ascii_digit())) => {
                let len = chars[i..]
                    .iter()
                    .take_while(|&&(_, c)| c.is_ascii_digit() || c == '.')
                    .count();
                let text: String = chars[i..i + len].iter().map(|&(_, c)| c).collect();
                (TokenKind::Number(text), len)
            }
            c if c.is_alphabetic() || c == '_' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|&&(_, c)| c.is_alphanumeric() || c == '_')
                    .count();
                let text: String = chars[i..i + len].iter().map(|&(_, c)| c).collect();
                (TokenKind::Ident(text), len)
            }
            other => (TokenKind::Other(other), 1),
        };

        tokens.push(Token {
            kind,
            leading: std::mem::take(&mut leading),
            offset,
        });
        i += width;
    }

    tokens
}
