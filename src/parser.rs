use thiserror::Error;

use crate::ast::{Expr, MathOperation, Token, TokenKind};
use crate::lexer::{InvalidTokenError, Lexer};

/*
Grammar in Backus-Naur form, decreasing precedence downward:

<root_expression> ::= <or_expression>
<or_expression>   ::= <and_expression> ( "|" "|" <and_expression> )*
<and_expression>  ::= <not_expression> ( "&" "&" <not_expression> )*
<not_expression>  ::= "!" <not_expression> | <comparison_expression>
<comparison_expression> ::= <add_sub_expression> ( <comparison_operator> <add_sub_expression> )*
<comparison_operator>   ::= ">" | "<" | ">" "=" | "<" "=" | "=" "=" | "!" "="
<add_sub_expression>    ::= <multiply_divide_expression> ( ("+"|"-") <multiply_divide_expression> )*
<multiply_divide_expression> ::= <exponent_expression> ( ("*"|"/"|"%") <exponent_expression> )*
<exponent_expression>   ::= <parentheses_expression> ( "^" <parentheses_expression> )*
<parentheses_expression> ::= "(" <root_expression> ")" | <negation_expression>
<negation_expression>   ::= "-" <parentheses_expression> | <value_or_access_expression>
<value_or_access_expression> ::= <literal> | <identifier_or_function> <chained_access>*
<identifier_or_function> ::= IdentifierToken | <function_call>
<function_call>   ::= IdentifierToken "(" [ <argument_list> ] ")"
<chained_access>  ::= "." IdentifierToken | "[" <root_expression> "]"
<literal>         ::= IntLiteral | FloatLiteral | StringLiteral | RawStringLiteral | BooleanLiteral
<argument_list>   ::= <root_expression> ( "," <root_expression> )*

Filtering and querying are reserved; `?` and `@` tokenize but do not parse.
*/

/// Errors that can occur while parsing an expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    /// The lexer could not classify part of the input.
    #[error(transparent)]
    InvalidToken(#[from] InvalidTokenError),

    /// The order of tokens is not valid for the grammar. `found` is
    /// `None` when the input ended too early; `expected` is `None` when
    /// the end of the expression was expected, an empty list when any
    /// token would do, and otherwise the acceptable token kinds.
    #[error("{}", grammar_error_message(.found, .expected))]
    InvalidGrammar {
        found: Option<Token>,
        expected: Option<Vec<TokenKind>>,
    },

    /// A dot, bracket, or parenthesis directly after a literal.
    #[error("{}", chained_literal_message(.found, .literal))]
    ChainedLiteral { found: Token, literal: String },
}

fn grammar_error_message(found: &Option<Token>, expected: &Option<Vec<TokenKind>>) -> String {
    let mut message = match found {
        Some(token) => format!(
            "Token {:?} of ID {:?} placed in invalid configuration in {:?} at line {}:{}.",
            token.value, token.kind.id(), token.filename, token.line, token.column
        ),
        None => "Reached the end of the expression prematurely.".to_string(),
    };
    match expected {
        None => message.push_str(" Expected end of expression."),
        Some(kinds) if kinds.is_empty() => message.push_str(" Expected any token."),
        Some(kinds) if kinds.len() == 1 => {
            message.push_str(&format!(" Expected token {:?}.", kinds[0].id()));
        }
        Some(kinds) => {
            let ids: Vec<&str> = kinds.iter().map(|k| k.id()).collect();
            message.push_str(&format!(" Expected one of tokens {:?}.", ids));
        }
    }
    message
}

fn chained_literal_message(found: &Token, literal: &str) -> String {
    match found.kind {
        TokenKind::Dot => format!(
            "dot notation cannot follow a literal; got {:?} after {:?}",
            found.value, literal
        ),
        TokenKind::BracketStart => format!(
            "bracket access cannot follow a literal; got {:?} after {:?}",
            found.value, literal
        ),
        _ => format!(
            "function call must start with an identifier; got {:?} after {:?}",
            found.value, literal
        ),
    }
}

const EXPRESSION_START_TOKENS: &[TokenKind] = &[
    TokenKind::RootAccess,
    TokenKind::CurrentObjectAccess,
    TokenKind::Identifier,
    TokenKind::StringLiteral,
    TokenKind::RawStringLiteral,
    TokenKind::IntLiteral,
    TokenKind::FloatLiteral,
    TokenKind::BooleanLiteral,
];

/// Recursive-descent parser for the expression grammar above.
///
/// The parser owns the lexer and a one-token lookahead; `at_root`
/// tracks whether the reserved `@` sentinel would appear at the top
/// level of the expression, where it is rejected.
pub struct Parser {
    lexer: Lexer,
    current_token: Option<Token>,
    at_root: bool,
}

/// Parses a complete expression, requiring the input to be fully
/// consumed.
pub fn parse(expression: &str, filename: &str) -> Result<Expr, ParseError> {
    Parser::new(expression, filename).parse_expression()
}

impl Parser {
    pub fn new(expression: &str, filename: &str) -> Self {
        Parser {
            lexer: Lexer::new(expression, filename),
            current_token: None,
            at_root: true,
        }
    }

    /// Entry point: advances to the first token and parses a full
    /// expression. Anything left over is a grammar error expecting the
    /// end of the expression.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.advance_token()?;
        let node = self.parse_root_expression()?;
        if self.current_token.is_some() {
            return Err(ParseError::InvalidGrammar {
                found: self.current_token.clone(),
                expected: None,
            });
        }
        Ok(node)
    }

    fn advance_token(&mut self) -> Result<(), ParseError> {
        if self.lexer.has_next() {
            self.current_token = Some(self.lexer.next_token()?);
        } else {
            self.current_token = None;
        }
        Ok(())
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current_token.as_ref().map(|t| t.kind)
    }

    /// Validates then consumes a token of one of the given kinds.
    fn eat(&mut self, valid: &[TokenKind]) -> Result<(), ParseError> {
        match self.current_kind() {
            Some(kind) if valid.contains(&kind) => self.advance_token(),
            _ => Err(ParseError::InvalidGrammar {
                found: self.current_token.clone(),
                expected: Some(valid.to_vec()),
            }),
        }
    }

    // Order of operations: parentheses and negation bind tightest, then
    // exponents, multiplication/division, addition/subtraction,
    // comparisons, not, and, or. The loosest level is parsed first and
    // recurses downward.

    fn parse_root_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_conditional_or()
    }

    fn parse_conditional_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_expression(&[TokenKind::Pipe], Parser::parse_conditional_and)
    }

    fn parse_conditional_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_expression(&[TokenKind::Amp], Parser::parse_conditional_not)
    }

    /// `!` covers the whole comparison level below it, so `!a == b`
    /// complements the comparison, not just `a`.
    fn parse_conditional_not(&mut self) -> Result<Expr, ParseError> {
        if self.current_kind() == Some(TokenKind::Bang) {
            self.advance_token()?;
            let right = self.parse_conditional_not()?;
            return Ok(Expr::UnaryOperation {
                op: MathOperation::Not,
                right: Box::new(right),
            });
        }
        self.parse_comparison_expression()
    }

    fn parse_comparison_expression(&mut self) -> Result<Expr, ParseError> {
        // The listed kinds are the FIRST token of each comparison
        // operator; parse_math_operator consumes the second one.
        self.parse_binary_expression(
            &[
                TokenKind::Greater,
                TokenKind::Less,
                TokenKind::Bang,
                TokenKind::Equals,
            ],
            Parser::parse_addition_subtraction,
        )
    }

    fn parse_addition_subtraction(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_expression(
            &[TokenKind::Plus, TokenKind::Minus],
            Parser::parse_multiplication_division,
        )
    }

    fn parse_multiplication_division(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_expression(
            &[TokenKind::Asterisk, TokenKind::Slash, TokenKind::Percent],
            Parser::parse_exponents,
        )
    }

    fn parse_exponents(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_expression(&[TokenKind::Caret], Parser::parse_parentheses)
    }

    fn parse_parentheses(&mut self) -> Result<Expr, ParseError> {
        if self.current_kind() != Some(TokenKind::ParenStart) {
            return self.parse_negation_operation();
        }
        self.advance_token()?;
        let node = self.parse_root_expression()?;
        self.eat(&[TokenKind::ParenEnd])?;
        Ok(node)
    }

    /// Unary minus binds tighter than any binary operator and loops
    /// back through the parentheses level, so both `---5` and `-(-5)`
    /// nest negations.
    fn parse_negation_operation(&mut self) -> Result<Expr, ParseError> {
        if self.current_kind() == Some(TokenKind::Minus) {
            self.advance_token()?;
            let right = self.parse_parentheses()?;
            return Ok(Expr::UnaryOperation {
                op: MathOperation::Subtract,
                right: Box::new(right),
            });
        }
        self.parse_value_or_access_expression()
    }

    /// Collects repeated same-level binary operations iteratively,
    /// producing a left-leaning tree. `1 - 2 - 3` becomes
    /// `(1 - 2) - 3`.
    fn parse_binary_expression(
        &mut self,
        supported_operators: &[TokenKind],
        child_parser: fn(&mut Parser) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut root = child_parser(self)?;
        while let Some(kind) = self.current_kind() {
            if !supported_operators.contains(&kind) {
                break;
            }
            let op = self.parse_math_operator()?;
            let right = child_parser(self)?;
            root = Expr::BinaryOperation {
                op,
                left: Box::new(root),
                right: Box::new(right),
            };
        }
        Ok(root)
    }

    /// Consumes a binary operator, joining the two-token operators
    /// (`==`, `!=`, `>=`, `<=`, `&&`, `||`) from their single-character
    /// tokens. A grammar error for the second character names the
    /// missing token.
    fn parse_math_operator(&mut self) -> Result<MathOperation, ParseError> {
        let first = match &self.current_token {
            Some(token) => token.kind,
            None => {
                return Err(ParseError::InvalidGrammar {
                    found: None,
                    expected: Some(vec![]),
                })
            }
        };
        self.advance_token()?;
        match first {
            TokenKind::Plus => Ok(MathOperation::Add),
            TokenKind::Minus => Ok(MathOperation::Subtract),
            TokenKind::Asterisk => Ok(MathOperation::Multiply),
            TokenKind::Slash => Ok(MathOperation::Divide),
            TokenKind::Caret => Ok(MathOperation::Power),
            TokenKind::Percent => Ok(MathOperation::Modulo),
            TokenKind::Bang | TokenKind::Greater | TokenKind::Less | TokenKind::Equals => {
                if self.current_kind() == Some(TokenKind::Equals) {
                    self.advance_token()?;
                    match first {
                        TokenKind::Bang => Ok(MathOperation::NotEqual),
                        TokenKind::Greater => Ok(MathOperation::GreaterEqual),
                        TokenKind::Less => Ok(MathOperation::LessEqual),
                        TokenKind::Equals => Ok(MathOperation::Equal),
                        _ => unreachable!("illegal code state hit after token {}", first),
                    }
                } else {
                    match first {
                        TokenKind::Greater => Ok(MathOperation::GreaterThan),
                        TokenKind::Less => Ok(MathOperation::LessThan),
                        // A lone `!` or `=` is not a binary operator.
                        TokenKind::Bang | TokenKind::Equals => Err(ParseError::InvalidGrammar {
                            found: self.current_token.clone(),
                            expected: Some(vec![TokenKind::Equals]),
                        }),
                        _ => unreachable!("illegal code state hit after token {}", first),
                    }
                }
            }
            TokenKind::Amp => {
                if self.current_kind() != Some(TokenKind::Amp) {
                    return Err(ParseError::InvalidGrammar {
                        found: self.current_token.clone(),
                        expected: Some(vec![TokenKind::Amp]),
                    });
                }
                self.advance_token()?;
                Ok(MathOperation::And)
            }
            TokenKind::Pipe => {
                if self.current_kind() != Some(TokenKind::Pipe) {
                    return Err(ParseError::InvalidGrammar {
                        found: self.current_token.clone(),
                        expected: Some(vec![TokenKind::Pipe]),
                    });
                }
                self.advance_token()?;
                Ok(MathOperation::Or)
            }
            _ => Err(ParseError::InvalidGrammar {
                found: self.current_token.clone(),
                expected: Some(vec![
                    TokenKind::Plus,
                    TokenKind::Minus,
                    TokenKind::Asterisk,
                    TokenKind::Slash,
                    TokenKind::Caret,
                    TokenKind::Bang,
                    TokenKind::Greater,
                    TokenKind::Less,
                    TokenKind::Equals,
                    TokenKind::Amp,
                    TokenKind::Pipe,
                    TokenKind::Percent,
                ]),
            }),
        }
    }

    /// Parses a literal, or an identifier with optional function call
    /// and chained accesses.
    fn parse_value_or_access_expression(&mut self) -> Result<Expr, ParseError> {
        let token = match &self.current_token {
            Some(token) if EXPRESSION_START_TOKENS.contains(&token.kind) => token.clone(),
            _ => {
                return Err(ParseError::InvalidGrammar {
                    found: self.current_token.clone(),
                    expected: Some(EXPRESSION_START_TOKENS.to_vec()),
                })
            }
        };
        if self.at_root && token.kind == TokenKind::CurrentObjectAccess {
            // The current-object sentinel is reserved for a filter
            // sub-language and cannot stand at the top level.
            return Err(ParseError::InvalidGrammar {
                found: self.current_token.clone(),
                expected: Some(vec![TokenKind::RootAccess, TokenKind::Identifier]),
            });
        }
        self.at_root = false;

        let literal = match token.kind {
            TokenKind::StringLiteral => {
                self.advance_token()?;
                Expr::Str(decode_string_literal(&token.value))
            }
            TokenKind::RawStringLiteral => {
                self.advance_token()?;
                Expr::Str(trim_delimiters(&token.value))
            }
            TokenKind::IntLiteral => {
                self.advance_token()?;
                let parsed = token.value.parse::<i64>().map_err(|_| {
                    ParseError::InvalidGrammar {
                        found: Some(token.clone()),
                        expected: Some(vec![TokenKind::IntLiteral]),
                    }
                })?;
                Expr::Int(parsed)
            }
            TokenKind::FloatLiteral => {
                self.advance_token()?;
                let parsed = token.value.parse::<f64>().map_err(|_| {
                    ParseError::InvalidGrammar {
                        found: Some(token.clone()),
                        expected: Some(vec![TokenKind::FloatLiteral]),
                    }
                })?;
                Expr::Float(parsed)
            }
            TokenKind::BooleanLiteral => {
                self.advance_token()?;
                Expr::Bool(token.value == "true")
            }
            _ => return self.parse_identifier_or_function(),
        };

        // Lookahead so that chaining a literal produces a precise error
        // instead of a confusing one further along.
        if let Some(next) = &self.current_token {
            if matches!(
                next.kind,
                TokenKind::ParenStart | TokenKind::Dot | TokenKind::BracketStart
            ) {
                return Err(ParseError::ChainedLiteral {
                    found: next.clone(),
                    literal: literal.to_string(),
                });
            }
        }
        Ok(literal)
    }

    /// Parses the current identifier, an argument list if one follows,
    /// and any chained accesses after that.
    fn parse_identifier_or_function(&mut self) -> Result<Expr, ParseError> {
        let name = match &self.current_token {
            Some(token) => token.value.clone(),
            None => {
                return Err(ParseError::InvalidGrammar {
                    found: None,
                    expected: Some(vec![TokenKind::Identifier]),
                })
            }
        };
        self.advance_token()?;

        let node = if self.current_kind() == Some(TokenKind::ParenStart) {
            let args = self.parse_args()?;
            Expr::FunctionCall {
                identifier: name,
                args,
            }
        } else {
            Expr::Identifier(name)
        };

        if self.current_token.is_none() {
            return Ok(node);
        }
        self.parse_chained_access(node)
    }

    /// Parses the argument list of a function call, including both
    /// parentheses. The first argument is preceded by `(`, later ones
    /// by `,`.
    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        let mut expected = TokenKind::ParenStart;
        for i in 0.. {
            let current = match &self.current_token {
                Some(token) => token.clone(),
                None => {
                    // Reached the end too early.
                    return Err(ParseError::InvalidGrammar {
                        found: None,
                        expected: Some(vec![TokenKind::ParenEnd]),
                    });
                }
            };
            if i != 0 && current.kind == TokenKind::ParenEnd {
                self.advance_token()?;
                return Ok(args);
            } else if current.kind != expected {
                let mut expected_tokens = vec![expected];
                if i != 0 {
                    // e.g. `func(0` can continue with `)` or `,`.
                    expected_tokens.push(TokenKind::ParenEnd);
                }
                return Err(ParseError::InvalidGrammar {
                    found: Some(current),
                    expected: Some(expected_tokens),
                });
            }

            // Past the ( on the first iteration, commas afterwards.
            self.advance_token()?;
            if self.current_token.is_none() {
                return Err(ParseError::InvalidGrammar {
                    found: None,
                    expected: Some(vec![TokenKind::ParenEnd]),
                });
            }
            if i == 0 && self.current_kind() == Some(TokenKind::ParenEnd) {
                self.advance_token()?;
                return Ok(args);
            }

            args.push(self.parse_root_expression()?);
            if i == 0 {
                expected = TokenKind::Comma;
            }
        }
        unreachable!("argument loop always returns")
    }

    /// Parses dot notations and bracket accesses chained after an
    /// identifier or function call.
    fn parse_chained_access(&mut self, root: Expr) -> Result<Expr, ParseError> {
        let mut current_node = root;
        while let Some(kind) = self.current_kind() {
            match kind {
                TokenKind::Dot => {
                    self.advance_token()?;
                    let identifier = self.parse_identifier()?;
                    current_node = Expr::DotNotation {
                        left: Box::new(current_node),
                        right: Box::new(identifier),
                    };
                }
                TokenKind::BracketStart => {
                    self.advance_token()?;
                    let sub_expression = self.parse_root_expression()?;
                    self.eat(&[TokenKind::BracketEnd])?;
                    current_node = Expr::BracketAccessor {
                        left: Box::new(current_node),
                        right: Box::new(sub_expression),
                    };
                }
                // A token this function is not responsible for.
                _ => break,
            }
        }
        Ok(current_node)
    }

    fn parse_identifier(&mut self) -> Result<Expr, ParseError> {
        match &self.current_token {
            Some(token) if token.kind == TokenKind::Identifier => {
                let name = token.value.clone();
                self.advance_token()?;
                Ok(Expr::Identifier(name))
            }
            _ => Err(ParseError::InvalidGrammar {
                found: self.current_token.clone(),
                expected: Some(vec![TokenKind::Identifier]),
            }),
        }
    }
}

/// Strips the surrounding quotes and decodes backslash escapes. Unknown
/// escape sequences are kept verbatim, backslash included.
fn decode_string_literal(raw: &str) -> String {
    let inner = trim_delimiters(raw);
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => result.push('\\'),
            Some('t') => result.push('\t'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('b') => result.push('\u{0008}'),
            Some('"') => result.push('"'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

fn trim_delimiters(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next();
    chars.next_back();
    chars.as_str().to_string()
}
