use std::fmt;

/// The classification of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Any valid object name.
    ///
    /// # Examples
    /// ```text
    /// steps
    /// read_kubeconfig
    /// _internal
    /// ```
    Identifier,

    /// Quoted string, single or double quotes. The token value keeps the
    /// surrounding quotes; backslash escapes are decoded by the parser.
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'alternative'
    /// ```
    StringLiteral,

    /// Backtick-delimited string with no escape processing.
    RawStringLiteral,

    /// Integer literal. Must not start with 0 unless it is exactly 0;
    /// a longer leading-zero digit run lexes as an identifier instead.
    IntLiteral,

    /// Float literal. Requires a decimal point; a trailing dot and an
    /// optional exponent are accepted.
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 5.
    /// 5.0e-5
    /// ```
    FloatLiteral,

    /// `true` or `false`, whole word only.
    BooleanLiteral,

    /// `[` opening a bracket access.
    BracketStart,

    /// `]` closing a bracket access.
    BracketEnd,

    /// `(` opening an argument list or grouped expression.
    ParenStart,

    /// `)` closing an argument list or grouped expression.
    ParenEnd,

    /// `.` in dot notation.
    Dot,

    /// `$`, the root of the data tree.
    RootAccess,

    /// `@`, the current object in a filter. Reserved; rejected at the
    /// top level of an expression.
    CurrentObjectAccess,

    /// `=`. Only meaningful as part of `==`, `!=`, `>=`, `<=`.
    Equals,

    /// `:`, reserved for selector expressions.
    Selector,

    /// `?`, reserved for filter expressions.
    Filter,

    /// `-`, negation or subtraction.
    Minus,

    /// `*`, multiplication or wildcard.
    Asterisk,

    /// `,`, argument separator.
    Comma,

    /// `/` (or `÷`), division.
    Slash,

    /// `>`.
    Greater,

    /// `<`.
    Less,

    /// `+`.
    Plus,

    /// `!`.
    Bang,

    /// `^`, exponentiation.
    Caret,

    /// `%`, remainder.
    Percent,

    /// `&`. Two in a row form logical and.
    Amp,

    /// `|`. Two in a row form logical or.
    Pipe,

    /// Anything the lexer could not classify.
    Unknown,
}

impl TokenKind {
    /// Stable id used in grammar-error messages.
    pub fn id(&self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::StringLiteral => "string",
            TokenKind::RawStringLiteral => "raw-string",
            TokenKind::IntLiteral => "int",
            TokenKind::FloatLiteral => "float",
            TokenKind::BooleanLiteral => "boolean",
            TokenKind::BracketStart => "bracket-access-start",
            TokenKind::BracketEnd => "bracket-access-end",
            TokenKind::ParenStart => "parentheses-start",
            TokenKind::ParenEnd => "parentheses-end",
            TokenKind::Dot => "object-access",
            TokenKind::RootAccess => "root-access",
            TokenKind::CurrentObjectAccess => "current-object-access",
            TokenKind::Equals => "equals-sign",
            TokenKind::Selector => "selector",
            TokenKind::Filter => "filter",
            TokenKind::Minus => "negation-sign",
            TokenKind::Asterisk => "asterisk",
            TokenKind::Comma => "list-separator",
            TokenKind::Slash => "divide",
            TokenKind::Greater => "greater-than",
            TokenKind::Less => "less-than",
            TokenKind::Plus => "plus",
            TokenKind::Bang => "not",
            TokenKind::Caret => "power",
            TokenKind::Percent => "mod",
            TokenKind::Amp => "and",
            TokenKind::Pipe => "or",
            TokenKind::Unknown => "error",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A single token with its position in the source expression.
///
/// Line and column are 1-based and relative to the beginning of the
/// expression. When the expression is embedded in a larger file, offset
/// them at the call site to avoid confusing positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub filename: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        value: impl Into<String>,
        kind: TokenKind,
        filename: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Token {
            value: value.into(),
            kind,
            filename: filename.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} ({}) in {} at line {}:{}",
            self.value, self.kind, self.filename, self.line, self.column
        )
    }
}
