use crate::error::ParseError;
use crate::expr::{BinaryOp, Expr};
use crate::tokenizer::{Token, Tokenizer};
use crate::value::Value;

/// Parses expression text into an [Expr] tree.
///
/// Grammar, loosest-binding first:
///
/// ```text
/// expr     := or
/// or       := and (OR and)*
/// and      := not (AND not)*
/// not      := NOT not | cmp
/// cmp      := sum ((= | != | > | >= | < | <=) sum)?
/// sum      := term ((+ | -) term)*
/// term     := unary ((* | / | %) unary)*
/// unary    := - unary | primary
/// primary  := literal | ident | ( expr ) | IF expr THEN expr ELSE expr
/// ```
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = Tokenizer::new(input).tokenize()?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or()?;

        // Check we are at the end of the expression
        if !self.is_at_end() {
            return Err(ParseError::TrailingInput {
                found: format!("{:?}", self.current_token()),
            });
        }

        Ok(expr)
    }

    // --- helpers ---

    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn consume(&mut self, expected: Token) -> Result<(), ParseError> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::Expected {
                expected: format!("{expected:?}"),
                found: format!("{:?}", self.current_token()),
            })
        }
    }

    /// Consumes the current token when it matches, returning whether it did.
    fn matches(&mut self, expected: &Token) -> bool {
        if self.current_token() == expected {
            self.advance();
            return true;
        }
        false
    }

    // --- grammar rules ---

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_and()?;
        while self.matches(&Token::Or) {
            let right = self.parse_and()?;
            expr = expr.or(right);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_not()?;
        while self.matches(&Token::And) {
            let right = self.parse_not()?;
            expr = expr.and(right);
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.matches(&Token::Not) {
            return Ok(self.parse_not()?.not());
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_sum()?;
        let op = match self.current_token() {
            Token::Equal => BinaryOp::Eq,
            Token::NotEqual => BinaryOp::Ne,
            Token::Greater => BinaryOp::Gt,
            Token::GreaterEq => BinaryOp::Ge,
            Token::Lower => BinaryOp::Lt,
            Token::LowerEq => BinaryOp::Le,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_sum()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;
        loop {
            if self.matches(&Token::Plus) {
                expr = expr.add(self.parse_term()?);
            } else if self.matches(&Token::Minus) {
                expr = expr.sub(self.parse_term()?);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            if self.matches(&Token::Star) {
                expr = expr.mul(self.parse_unary()?);
            } else if self.matches(&Token::Slash) {
                expr = expr.div(self.parse_unary()?);
            } else if self.matches(&Token::Percent) {
                expr = expr.rem(self.parse_unary()?);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.matches(&Token::Minus) {
            return Ok(self.parse_unary()?.neg());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.advance();
                // integer literals stay int when they fit
                let value = match i32::try_from(n) {
                    Ok(i) => Value::Int(i),
                    Err(_) => Value::Long(n),
                };
                Ok(Expr::Literal(value))
            }
            Token::FloatNumber(f) => {
                self.advance();
                Ok(Expr::Literal(Value::Double(f)))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::Literal(Value::from(s.as_str())))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Column(name))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.consume(Token::RightParen)?;
                Ok(expr)
            }
            Token::If => {
                self.advance();
                let test = self.parse_or()?;
                self.consume(Token::Then)?;
                let then = self.parse_or()?;
                self.consume(Token::Else)?;
                let otherwise = self.parse_or()?;
                Ok(Expr::if_else(test, then, otherwise))
            }
            token => Err(ParseError::Expected {
                expected: "literal, column, '(' or IF".into(),
                found: format!("{token:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comparison() {
        let expr = parse("x > 3").unwrap();
        assert_eq!(expr, Expr::col("x").gt(Expr::lit(3)));
    }

    #[test]
    fn test_parse_precedence() {
        // AND binds tighter than OR, comparison tighter than both
        let expr = parse("x > 3 AND selected OR x = 0").unwrap();
        let expected = Expr::col("x")
            .gt(Expr::lit(3))
            .and(Expr::col("selected"))
            .or(Expr::col("x").equals(Expr::lit(0)));
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        let expected = Expr::lit(1).add(Expr::lit(2).mul(Expr::lit(3)));
        assert_eq!(expr, expected);

        let expr = parse("(1 + 2) * 3").unwrap();
        let expected = Expr::lit(1).add(Expr::lit(2)).mul(Expr::lit(3));
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parse_unary() {
        let expr = parse("-x + 1").unwrap();
        assert_eq!(expr, Expr::col("x").neg().add(Expr::lit(1)));

        let expr = parse("NOT selected").unwrap();
        assert_eq!(expr, Expr::col("selected").not());
    }

    #[test]
    fn test_parse_if_then_else() {
        let expr = parse("if selected then 1 else 0").unwrap();
        assert_eq!(
            expr,
            Expr::if_else(Expr::col("selected"), Expr::lit(1), Expr::lit(0))
        );
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("true").unwrap(), Expr::lit(true));
        assert_eq!(parse("3.5").unwrap(), Expr::lit(3.5));
        assert_eq!(parse("'atom'").unwrap(), Expr::lit("atom"));
        // literals beyond the int range parse as long
        assert_eq!(
            parse("4294967296").unwrap(),
            Expr::Literal(Value::Long(4_294_967_296))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("x >"),
            Err(ParseError::Expected { .. })
        ));
        assert!(matches!(
            parse("(x > 3"),
            Err(ParseError::Expected { .. })
        ));
        assert!(matches!(
            parse("x > 3 4"),
            Err(ParseError::TrailingInput { .. })
        ));
        assert!(matches!(
            parse("if selected then 1"),
            Err(ParseError::Expected { .. })
        ));
    }
}
