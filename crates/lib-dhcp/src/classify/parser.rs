use thiserror::Error;

use crate::classify::{Expr, Operand};
use crate::defs::OptionDefRegistry;
use crate::DHCP4_OPTION_SPACE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassParseError {
    #[error("String literal must be enclosed in double quotes at offset {offset}")]
    StringLiteralFormat { offset: usize },

    #[error("Parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("Unknown option name '{0}' in class test")]
    UnknownOption(String),

    #[error("Invalid option code '{0}' in class test")]
    BadOptionCode(String),
}

/// Parse a class test expression and resolve option names through the
/// definition registry.
///
/// Grammar, loosest binding first: `||`, `&&`, comparison; parentheses
/// group. Operands are `option <name>`, `option[<code>]` and
/// `substring(<option>, <start>, <length>)`; literals are double-quoted
/// without escape processing.
pub fn parse_expression(
    input: &str,
    registry: &OptionDefRegistry,
) -> Result<Expr, ClassParseError> {
    let tokens = lex(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        registry,
    };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ClassParseError::Parse {
            offset: token.offset,
            message: format!("unexpected trailing {}", token.kind.describe()),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    KwOption,
    KwExists,
    KwNotExists,
    KwSubstring,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    EqOp,
    NeOp,
    AndOp,
    OrOp,
    Ident(String),
    Number(String),
    StringLit(Vec<u8>),
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::KwOption => "'option'".into(),
            TokenKind::KwExists => "'exists'".into(),
            TokenKind::KwNotExists => "'!exists'".into(),
            TokenKind::KwSubstring => "'substring'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::LBracket => "'['".into(),
            TokenKind::RBracket => "']'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::EqOp => "'=='".into(),
            TokenKind::NeOp => "'!='".into(),
            TokenKind::AndOp => "'&&'".into(),
            TokenKind::OrOp => "'||'".into(),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Number(n) => format!("number '{n}'"),
            TokenKind::StringLit(_) => "string literal".into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn lex(input: &str) -> Result<Vec<Token>, ClassParseError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                tokens.push(Token { kind: TokenKind::LParen, offset: i });
                i += 1;
            }
            b')' => {
                tokens.push(Token { kind: TokenKind::RParen, offset: i });
                i += 1;
            }
            b'[' => {
                tokens.push(Token { kind: TokenKind::LBracket, offset: i });
                i += 1;
            }
            b']' => {
                tokens.push(Token { kind: TokenKind::RBracket, offset: i });
                i += 1;
            }
            b',' => {
                tokens.push(Token { kind: TokenKind::Comma, offset: i });
                i += 1;
            }
            b'=' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token { kind: TokenKind::EqOp, offset: i });
                i += 2;
            }
            b'&' if bytes.get(i + 1) == Some(&b'&') => {
                tokens.push(Token { kind: TokenKind::AndOp, offset: i });
                i += 2;
            }
            b'|' if bytes.get(i + 1) == Some(&b'|') => {
                tokens.push(Token { kind: TokenKind::OrOp, offset: i });
                i += 2;
            }
            b'!' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token { kind: TokenKind::NeOp, offset: i });
                i += 2;
            }
            b'!' if input[i + 1..].starts_with("exists") => {
                tokens.push(Token { kind: TokenKind::KwNotExists, offset: i });
                i += 1 + "exists".len();
            }
            b'"' => {
                let start = i;
                i += 1;
                let mut literal = Vec::new();
                loop {
                    match bytes.get(i) {
                        Some(b'"') => {
                            i += 1;
                            break;
                        }
                        Some(b) => {
                            literal.push(*b);
                            i += 1;
                        }
                        None => {
                            return Err(ClassParseError::StringLiteralFormat { offset: start })
                        }
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::StringLit(literal),
                    offset: start,
                });
            }
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Number(input[start..i].to_string()),
                    offset: start,
                });
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b'_')
                {
                    i += 1;
                }
                let word = &input[start..i];
                let kind = match word {
                    "option" => TokenKind::KwOption,
                    "exists" => TokenKind::KwExists,
                    "substring" => TokenKind::KwSubstring,
                    _ => TokenKind::Ident(word.to_string()),
                };
                tokens.push(Token { kind, offset: start });
            }
            other => {
                return Err(ClassParseError::Parse {
                    offset: i,
                    message: format!("unexpected character '{}'", other as char),
                })
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    registry: &'a OptionDefRegistry,
}

impl Parser<'_> {
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

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ClassParseError> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(ClassParseError::Parse {
                offset: token.offset,
                message: format!("expected {}, found {}", kind.describe(), token.kind.describe()),
            }),
            None => Err(self.unexpected_end(&kind.describe())),
        }
    }

    fn unexpected_end(&self, expected: &str) -> ClassParseError {
        ClassParseError::Parse {
            offset: self.tokens.last().map(|t| t.offset).unwrap_or(0),
            message: format!("expected {expected}, found end of expression"),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ClassParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOp) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ClassParseError> {
        let mut left = self.parse_primary()?;
        while self.eat(&TokenKind::AndOp) {
            let right = self.parse_primary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, ClassParseError> {
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::LParen) => {
                self.pos += 1;
                let expr = self.parse_or()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            Some(TokenKind::KwExists) => {
                self.pos += 1;
                let code = self.parse_option_ref()?;
                Ok(Expr::Exists(code))
            }
            Some(TokenKind::KwNotExists) => {
                self.pos += 1;
                let code = self.parse_option_ref()?;
                Ok(Expr::NotExists(code))
            }
            Some(TokenKind::KwOption) | Some(TokenKind::KwSubstring) => {
                let operand = self.parse_operand()?;
                self.parse_comparison(operand)
            }
            Some(kind) => {
                let token = self.next().expect("peeked");
                Err(ClassParseError::Parse {
                    offset: token.offset,
                    message: format!("expected an expression, found {}", kind.describe()),
                })
            }
            None => Err(self.unexpected_end("an expression")),
        }
    }

    fn parse_comparison(&mut self, operand: Operand) -> Result<Expr, ClassParseError> {
        let negated = match self.next() {
            Some(token) if token.kind == TokenKind::EqOp => false,
            Some(token) if token.kind == TokenKind::NeOp => true,
            Some(token) => {
                return Err(ClassParseError::Parse {
                    offset: token.offset,
                    message: format!("expected '==' or '!=', found {}", token.kind.describe()),
                })
            }
            None => return Err(self.unexpected_end("'==' or '!='")),
        };

        let literal = match self.next() {
            Some(Token {
                kind: TokenKind::StringLit(literal),
                ..
            }) => literal,
            Some(token) => {
                return Err(ClassParseError::StringLiteralFormat {
                    offset: token.offset,
                })
            }
            None => return Err(self.unexpected_end("a string literal")),
        };

        Ok(if negated {
            Expr::Ne(operand, literal)
        } else {
            Expr::Eq(operand, literal)
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, ClassParseError> {
        match self.next() {
            Some(token) if token.kind == TokenKind::KwOption => {
                self.pos -= 1;
                Ok(Operand::Option(self.parse_option_ref()?))
            }
            Some(token) if token.kind == TokenKind::KwSubstring => {
                self.expect(TokenKind::LParen)?;
                let code = self.parse_option_ref()?;
                self.expect(TokenKind::Comma)?;
                let start = self.parse_number()?;
                self.expect(TokenKind::Comma)?;
                let length = self.parse_number()?;
                self.expect(TokenKind::RParen)?;
                Ok(Operand::Substring(code, start, length))
            }
            Some(token) => Err(ClassParseError::Parse {
                offset: token.offset,
                message: format!("expected an operand, found {}", token.kind.describe()),
            }),
            None => Err(self.unexpected_end("an operand")),
        }
    }

    /// `option <name>` or `option[<code>]`, resolved to the option code.
    fn parse_option_ref(&mut self) -> Result<u8, ClassParseError> {
        self.expect(TokenKind::KwOption)?;
        match self.next() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => match self.registry.get_by_name(DHCP4_OPTION_SPACE, &name) {
                Some(def) => Ok(def.code()),
                None => Err(ClassParseError::UnknownOption(name)),
            },
            Some(Token {
                kind: TokenKind::LBracket,
                ..
            }) => {
                let code = match self.next() {
                    Some(Token {
                        kind: TokenKind::Number(number),
                        ..
                    }) => number
                        .parse::<u8>()
                        .ok()
                        .filter(|c| (1..=254).contains(c))
                        .ok_or(ClassParseError::BadOptionCode(number))?,
                    Some(token) => {
                        return Err(ClassParseError::Parse {
                            offset: token.offset,
                            message: format!(
                                "expected an option code, found {}",
                                token.kind.describe()
                            ),
                        })
                    }
                    None => return Err(self.unexpected_end("an option code")),
                };
                self.expect(TokenKind::RBracket)?;
                Ok(code)
            }
            Some(token) => Err(ClassParseError::Parse {
                offset: token.offset,
                message: format!(
                    "expected an option name or '[', found {}",
                    token.kind.describe()
                ),
            }),
            None => Err(self.unexpected_end("an option name or '['")),
        }
    }

    fn parse_number(&mut self) -> Result<usize, ClassParseError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Number(number),
                offset,
            }) => number.parse().map_err(|_| ClassParseError::Parse {
                offset,
                message: format!("number '{number}' out of range"),
            }),
            Some(token) => Err(ClassParseError::Parse {
                offset: token.offset,
                message: format!("expected a number, found {}", token.kind.describe()),
            }),
            None => Err(self.unexpected_end("a number")),
        }
    }
}
