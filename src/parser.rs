use std::collections::VecDeque;

use crate::access_tree::{AccessTree, MAX_DEPTH};
use crate::access_tree_node::AccessTreeNode;
use crate::errors::abe_error::AbeError;
use crate::errors::parse_error::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(u32),
    Of,
    Word(String),
    Unknown(char),
    And,
    Or,
    OpenParen,
    CloseParen,
    Comma,
}

/// Parsed policy, before indices are assigned.
#[derive(Debug, PartialEq, Clone)]
pub enum AstNode {
    Attribute(u32),
    Threshold(usize, Vec<AstNode>),
}

/// Parser for threshold policies.
///
/// Grammar, loosest binding first:
/// ```text
/// expr   := term ('|' term)*
/// term   := factor ('&' factor)*
/// factor := '(' expr ')' | NUMBER 'of' '(' expr (',' expr)* ')' | NUMBER
/// ```
/// `a | b | c` becomes a 1-of-3 gate and `a & b & c` a 3-of-3 gate.
pub struct AccessTreeParser {
    tokens: Vec<(Token, usize)>,
    current_token: Option<Token>,
    position: usize,
    index: usize,
    depth: usize,
}

impl AccessTreeParser {
    pub fn new(input: &str) -> AccessTreeParser {
        let mut tokens = Vec::new();
        let mut chars = input.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            let token = match c {
                '&' => Token::And,
                '|' => Token::Or,
                '(' => Token::OpenParen,
                ')' => Token::CloseParen,
                ',' => Token::Comma,
                c if c.is_whitespace() => continue,
                c if c.is_alphanumeric() => {
                    let mut word = String::from(c);
                    while let Some((_, next)) = chars.peek() {
                        if !next.is_alphanumeric() {
                            break;
                        }
                        word.push(*next);
                        chars.next();
                    }
                    if word.eq_ignore_ascii_case("of") {
                        Token::Of
                    } else if word.chars().all(|c| c.is_ascii_digit()) {
                        match word.parse() {
                            Ok(number) => Token::Number(number),
                            Err(_) => Token::Word(word),
                        }
                    } else {
                        Token::Word(word)
                    }
                }
                c => Token::Unknown(c),
            };
            tokens.push((token, start));
        }

        AccessTreeParser {
            tokens,
            current_token: None,
            position: 0,
            index: 0,
            depth: 0,
        }
    }

    fn advance(&mut self) {
        match self.tokens.get(self.index) {
            Some((token, position)) => {
                self.current_token = Some(token.clone());
                self.position = *position;
            }
            None => {
                self.current_token = None;
                self.position = self.tokens.last().map_or(0, |(_, p)| p + 1);
            }
        }
        self.index += 1;
    }

    fn error<T>(&self, message: &str) -> Result<T, ParseError> {
        Err(ParseError::new(message, self.position))
    }

    /// Enters one level of parentheses.
    fn open_paren(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return self.error(format!("Nesting deeper than {} levels", MAX_DEPTH).as_str());
        }
        self.expect(Token::OpenParen)
    }

    fn close_paren(&mut self) -> Result<(), ParseError> {
        self.expect(Token::CloseParen)?;
        self.depth -= 1;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.current_token.as_ref() == Some(&expected) {
            self.advance();
            return Ok(());
        }
        match &self.current_token {
            Some(token) => self.error(format!("Expected {:?} but got {:?}", expected, token).as_str()),
            None => self.error(format!("Expected {:?} but got end of input", expected).as_str()),
        }
    }

    fn parse_threshold(&mut self, threshold: u32, start: usize) -> Result<AstNode, ParseError> {
        self.expect(Token::Of)?;
        self.open_paren()?;

        let mut children = vec![self.parse_expr()?];
        while let Some(Token::Comma) = self.current_token {
            self.advance();
            children.push(self.parse_expr()?);
        }
        self.close_paren()?;

        let threshold = threshold as usize;
        if threshold == 0 || threshold > children.len() {
            return Err(ParseError::new(
                format!(
                    "Threshold {} is outside [1, {}]",
                    threshold,
                    children.len()
                )
                .as_str(),
                start,
            ));
        }
        Ok(AstNode::Threshold(threshold, children))
    }

    fn parse_factor(&mut self) -> Result<AstNode, ParseError> {
        match self.current_token.clone() {
            Some(Token::OpenParen) => {
                self.open_paren()?;
                let expr = self.parse_expr()?;
                self.close_paren()?;
                Ok(expr)
            }
            Some(Token::Number(number)) => {
                let start = self.position;
                self.advance();
                if self.current_token == Some(Token::Of) {
                    self.parse_threshold(number, start)
                } else {
                    Ok(AstNode::Attribute(number))
                }
            }
            Some(token) => self.error(format!("Invalid token {:?}", token).as_str()),
            None => self.error("Expected attribute but got end of input"),
        }
    }

    fn parse_term(&mut self) -> Result<AstNode, ParseError> {
        let mut operands = vec![self.parse_factor()?];
        while let Some(Token::And) = self.current_token {
            self.advance();
            operands.push(self.parse_factor()?);
        }
        Ok(match operands.len() {
            1 => operands.remove(0),
            n => AstNode::Threshold(n, operands),
        })
    }

    fn parse_expr(&mut self) -> Result<AstNode, ParseError> {
        let mut operands = vec![self.parse_term()?];
        while let Some(Token::Or) = self.current_token {
            self.advance();
            operands.push(self.parse_term()?);
        }
        Ok(match operands.len() {
            1 => operands.remove(0),
            _ => AstNode::Threshold(1, operands),
        })
    }

    /// Lays the AST out breadth first: the root gets index 0 and children get
    /// consecutive indices in the order their parents are visited.
    fn ast_to_access_tree(ast: AstNode) -> Result<AccessTree, AbeError> {
        let mut nodes = Vec::new();
        let mut queue = VecDeque::from([ast]);
        let mut next_index = 1;

        while let Some(ast) = queue.pop_front() {
            match ast {
                AstNode::Attribute(attribute) => nodes.push(AccessTreeNode::leaf(attribute)),
                AstNode::Threshold(threshold, children) => {
                    let indices = (next_index..next_index + children.len()).collect();
                    next_index += children.len();
                    queue.extend(children);
                    nodes.push(AccessTreeNode::gate(threshold, indices));
                }
            }
        }

        AccessTree::new(nodes)
    }

    pub fn generate_ast(&mut self) -> Result<AstNode, ParseError> {
        self.advance();
        let ast = self.parse_expr()?;

        if self.current_token.is_some() {
            return self.error("Unexpected tokens after parsing was complete");
        }

        Ok(ast)
    }

    pub fn parse(&mut self) -> Result<AccessTree, AbeError> {
        let ast = self.generate_ast()?;
        Self::ast_to_access_tree(ast)
    }
}
