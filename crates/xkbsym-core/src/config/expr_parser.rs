// Xkbsym Config - Expression Parser
// Parses short textual forms like "SetMods(modifiers=Shift+Mod5)" into expression nodes

use crate::ast::Expr;

/// Errors that can occur while parsing an expression string
#[derive(Debug, Clone, PartialEq)]
pub enum ExprParseError {
    /// Empty input string
    EmptyInput,
    /// Character that cannot start a token
    UnexpectedChar(char, usize),
    /// Input ended in the middle of an expression
    UnexpectedEnd,
    /// Token that does not fit the grammar at this point
    UnexpectedToken(String),
    /// String or key name without its closing delimiter
    Unterminated(usize),
    /// Integer literal that does not fit
    BadInteger(String),
    /// Expected an action call like "SetMods(...)"
    NotAnAction(String),
    /// Expected an assignment target like "key.type[2]"
    NotAssignable(String),
}

impl std::fmt::Display for ExprParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExprParseError::EmptyInput => write!(f, "expression cannot be empty"),
            ExprParseError::UnexpectedChar(c, pos) => {
                write!(f, "unexpected character '{}' at offset {}", c, pos)
            }
            ExprParseError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            ExprParseError::UnexpectedToken(tok) => write!(f, "unexpected token '{}'", tok),
            ExprParseError::Unterminated(pos) => {
                write!(f, "unterminated literal starting at offset {}", pos)
            }
            ExprParseError::BadInteger(text) => write!(f, "invalid integer: '{}'", text),
            ExprParseError::NotAnAction(text) => write!(f, "not an action call: '{}'", text),
            ExprParseError::NotAssignable(text) => {
                write!(f, "not a field or array reference: '{}'", text)
            }
        }
    }
}

impl std::error::Error for ExprParseError {}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Integer(i64),
    String(String),
    KeyName(String),
    Punct(char),
}

impl Token {
    fn text(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Integer(v) => v.to_string(),
            Token::String(s) => format!("\"{}\"", s),
            Token::KeyName(s) => format!("<{}>", s),
            Token::Punct(c) => c.to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            _ if c.is_whitespace() => pos += 1,
            '(' | ')' | '[' | ']' | ',' | '=' | '+' | '-' | '!' | '~' | '.' => {
                tokens.push(Token::Punct(c));
                pos += 1;
            }
            '"' | '<' => {
                let close = if c == '"' { '"' } else { '>' };
                let end = chars[pos + 1..]
                    .iter()
                    .position(|&ch| ch == close)
                    .ok_or(ExprParseError::Unterminated(pos))?;
                let text: String = chars[pos + 1..pos + 1 + end].iter().collect();
                tokens.push(if c == '"' {
                    Token::String(text)
                } else {
                    Token::KeyName(text)
                });
                pos += end + 2;
            }
            _ if c.is_ascii_digit() => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_alphanumeric() {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => i64::from_str_radix(hex, 16),
                    None => text.parse::<i64>(),
                }
                .map_err(|_| ExprParseError::BadInteger(text.clone()))?;
                tokens.push(Token::Integer(value));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            }
            _ => return Err(ExprParseError::UnexpectedChar(c, pos)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ExprParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Token::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: char) -> Result<(), ExprParseError> {
        match self.next()? {
            Token::Punct(c) if c == punct => Ok(()),
            other => Err(ExprParseError::UnexpectedToken(other.text())),
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprParseError> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat('+') {
                lhs = Expr::Add(Box::new(lhs), Box::new(self.unary()?));
            } else if self.eat('-') {
                lhs = Expr::Subtract(Box::new(lhs), Box::new(self.unary()?));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprParseError> {
        if self.eat('!') {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        if self.eat('~') {
            return Ok(Expr::Invert(Box::new(self.unary()?)));
        }
        if self.eat('-') {
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        if self.eat('+') {
            return Ok(Expr::UnaryPlus(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprParseError> {
        match self.next()? {
            Token::Integer(value) => Ok(Expr::Integer(value)),
            Token::String(text) => Ok(Expr::String(text)),
            Token::KeyName(name) => Ok(Expr::KeyName(name)),
            Token::Punct('(') => {
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Token::Ident(name) => self.after_ident(name),
            other => Err(ExprParseError::UnexpectedToken(other.text())),
        }
    }

    fn after_ident(&mut self, name: String) -> Result<Expr, ExprParseError> {
        if self.eat('(') {
            let mut args = Vec::new();
            if !self.eat(')') {
                loop {
                    args.push(self.argument()?);
                    if self.eat(')') {
                        break;
                    }
                    self.expect(',')?;
                }
            }
            return Ok(Expr::Action { name, args });
        }

        let (element, field) = if self.eat('.') {
            match self.next()? {
                Token::Ident(field) => (Some(name), field),
                other => return Err(ExprParseError::UnexpectedToken(other.text())),
            }
        } else {
            (None, name)
        };

        if self.eat('[') {
            let index = self.expr()?;
            self.expect(']')?;
            return Ok(Expr::ArrayRef {
                element,
                field,
                index: Box::new(index),
            });
        }

        Ok(match element {
            Some(element) => Expr::FieldRef { element, field },
            None => Expr::Ident(field),
        })
    }

    fn argument(&mut self) -> Result<Expr, ExprParseError> {
        let lhs = self.expr()?;
        if self.eat('=') {
            let value = self.expr()?;
            return Ok(Expr::Assign {
                lhs: Box::new(lhs),
                value: Box::new(value),
            });
        }
        Ok(lhs)
    }
}

/// Parse an expression such as `NumLock+Alt`, `group2` or `!clearLocks`
pub fn parse_expr(input: &str) -> Result<Expr, ExprParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprParseError::EmptyInput);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExprParseError::UnexpectedToken(token.text())),
    }
}

/// Parse an action call like `LatchMods(modifiers=Shift,clearLocks)`
pub fn parse_action(input: &str) -> Result<Expr, ExprParseError> {
    match parse_expr(input)? {
        expr @ Expr::Action { .. } => Ok(expr),
        // A bare name is a call without arguments
        Expr::Ident(name) => Ok(Expr::Action {
            name,
            args: Vec::new(),
        }),
        _ => Err(ExprParseError::NotAnAction(input.to_string())),
    }
}

/// Parse an assignment target like `key.type[2]` or `name[1]`
pub fn parse_lhs(input: &str) -> Result<Expr, ExprParseError> {
    match parse_expr(input)? {
        expr @ (Expr::Ident(_) | Expr::FieldRef { .. } | Expr::ArrayRef { .. }) => Ok(expr),
        _ => Err(ExprParseError::NotAssignable(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mask() {
        assert_eq!(
            parse_expr("NumLock+Alt").unwrap(),
            Expr::Add(Box::new(Expr::ident("NumLock")), Box::new(Expr::ident("Alt")))
        );
        assert_eq!(
            parse_expr("all-Lock").unwrap(),
            Expr::Subtract(Box::new(Expr::ident("all")), Box::new(Expr::ident("Lock")))
        );
    }

    #[test]
    fn test_parse_action_call() {
        let action = parse_action("SetMods(modifiers=Shift+Mod5, !clearLocks)").unwrap();
        let Expr::Action { name, args } = action else {
            panic!("expected an action");
        };
        assert_eq!(name, "SetMods");
        assert_eq!(args.len(), 2);
        assert!(matches!(args[0], Expr::Assign { .. }));
        assert_eq!(args[1], Expr::Not(Box::new(Expr::ident("clearLocks"))));
    }

    #[test]
    fn test_parse_action_without_parens() {
        assert_eq!(
            parse_action("NoAction").unwrap(),
            Expr::Action {
                name: "NoAction".to_string(),
                args: Vec::new()
            }
        );
        assert_eq!(
            parse_action("42"),
            Err(ExprParseError::NotAnAction("42".to_string()))
        );
    }

    #[test]
    fn test_parse_lhs_forms() {
        assert_eq!(
            parse_lhs("key.type[2]").unwrap(),
            Expr::ArrayRef {
                element: Some("key".to_string()),
                field: "type".to_string(),
                index: Box::new(Expr::int(2)),
            }
        );
        assert_eq!(
            parse_lhs("name[Group1]").unwrap(),
            Expr::ArrayRef {
                element: None,
                field: "name".to_string(),
                index: Box::new(Expr::ident("Group1")),
            }
        );
        assert_eq!(
            parse_lhs("setMods.clearLocks").unwrap(),
            Expr::FieldRef {
                element: "setMods".to_string(),
                field: "clearLocks".to_string(),
            }
        );
        assert!(parse_lhs("1+2").is_err());
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_expr("\"FOUR_LEVEL\"").unwrap(), Expr::String("FOUR_LEVEL".to_string()));
        assert_eq!(parse_expr("<CAPS>").unwrap(), Expr::KeyName("CAPS".to_string()));
        assert_eq!(parse_expr("0x10").unwrap(), Expr::int(16));
        assert_eq!(parse_expr("-2").unwrap(), Expr::Negate(Box::new(Expr::int(2))));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_expr("   "), Err(ExprParseError::EmptyInput));
        assert_eq!(parse_expr("Shift+"), Err(ExprParseError::UnexpectedEnd));
        assert_eq!(parse_expr("\"open"), Err(ExprParseError::Unterminated(0)));
        assert_eq!(parse_expr("a b"), Err(ExprParseError::UnexpectedToken("b".to_string())));
        assert!(matches!(parse_expr("a;"), Err(ExprParseError::UnexpectedChar(';', 1))));
        assert_eq!(parse_expr("12ab"), Err(ExprParseError::BadInteger("12ab".to_string())));
    }
}
