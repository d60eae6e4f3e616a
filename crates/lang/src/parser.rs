//! Recursive-descent parser for the manifest language
//!
//! Turns tokenized manifest text into the [`Ast`](crate::ast::Ast). Pure:
//! no side effects, no name resolution; scoping and type validation are
//! the evaluator's job.

use crate::ast::{
    Ast, CaseArm, CaseStmt, ClassDecl, CompareOp, DefineArg, DefineDecl, Expr, IfStmt,
    InstanceBody, Param, Pattern, SelectorArm, Span, Stmt,
};
use crate::error::ParseError;
use crate::lexer::{lex, Spanned, Token};

/// Parse manifest text into an AST.
///
/// `source_name` labels the manifest in error messages (a file name, or
/// something like `"inline"` for embedded text).
pub fn parse(text: &str, source_name: &str) -> Result<Ast, ParseError> {
    let tokens = lex(text, source_name)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source_name,
    };
    let stmts = parser.program()?;
    Ok(Ast {
        source_name: source_name.to_string(),
        stmts,
    })
}

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    source_name: &'a str,
}

impl Parser<'_> {
    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn span(&self) -> Span {
        let s = self.cur();
        Span::new(s.line, s.column)
    }

    fn advance(&mut self) -> Spanned {
        let s = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        s
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        let s = self.cur();
        ParseError::new(self.source_name, s.line, s.column, message)
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<Span, ParseError> {
        if self.peek() == token {
            let span = self.span();
            self.advance();
            Ok(span)
        } else {
            Err(self.err(format!("expected {what}, got {}", self.peek().describe())))
        }
    }

    fn take_word(&mut self, what: &str) -> Result<String, ParseError> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.err(format!("expected {what}, got {}", self.peek().describe())))
        }
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    // -- Statements ---------------------------------------------------

    fn program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while self.peek() != &Token::Eof {
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while self.peek() != &Token::RBrace {
            if self.peek() == &Token::Eof {
                return Err(self.err("unexpected end of input, expected '}'"));
            }
            stmts.push(self.statement()?);
        }
        self.advance();
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().clone() {
            Token::Word(w) => match w.as_str() {
                "class" => self.class_decl(),
                "define" => self.define_decl(),
                "include" => self.include_stmt(),
                "if" => self.if_stmt(),
                "case" => self.case_stmt(),
                _ => self.declaration(),
            },
            Token::Variable(_) => self.assign_stmt(),
            _ => Err(self.err(format!(
                "expected a statement, got {}",
                self.peek().describe()
            ))),
        }
    }

    /// `class name [inherits parent] { ... }`
    fn class_decl(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        self.advance();
        let name = self.take_word("class name")?;
        let parent = if self.is_word("inherits") {
            self.advance();
            Some(self.take_word("parent class name")?)
        } else {
            None
        };
        let body = self.block()?;
        Ok(Stmt::Class(ClassDecl {
            name,
            parent,
            body,
            span,
        }))
    }

    /// `define name(arg, arg = default) { ... }`
    fn define_decl(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        self.advance();
        let name = self.take_word("define name")?;
        let mut args = Vec::new();
        if self.peek() == &Token::LParen {
            self.advance();
            while self.peek() != &Token::RParen {
                // `$arg` and bare `arg` are both accepted
                let arg_name = match self.peek().clone() {
                    Token::Variable(v) => {
                        self.advance();
                        v
                    }
                    _ => self.take_word("argument name")?,
                };
                let default = if self.peek() == &Token::Assign {
                    self.advance();
                    Some(self.expression()?)
                } else {
                    None
                };
                args.push(DefineArg {
                    name: arg_name,
                    default,
                });
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(&Token::RParen, "')'")?;
        }
        let body = self.block()?;
        Ok(Stmt::Define(DefineDecl {
            name,
            args,
            body,
            span,
        }))
    }

    /// `include name[, name]`
    fn include_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        self.advance();
        let mut names = vec![self.take_word("class name")?];
        while self.peek() == &Token::Comma {
            self.advance();
            names.push(self.take_word("class name")?);
        }
        Ok(Stmt::Include { names, span })
    }

    /// `$name = expr`
    fn assign_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        let Token::Variable(name) = self.advance().token else {
            return Err(self.err("expected variable"));
        };
        self.expect(&Token::Assign, "'='")?;
        let value = self.expression()?;
        Ok(Stmt::Assign { name, value, span })
    }

    /// `if cond { ... } [else { ... }]`
    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        self.advance();
        let cond = self.comparison()?;
        let then_body = self.block()?;
        let else_body = if self.is_word("else") {
            self.advance();
            Some(self.block()?)
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            cond,
            then_body,
            else_body,
            span,
        }))
    }

    /// `case control { v1: {...} v2, v3: {...} default: {...} }`
    fn case_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        self.advance();
        let control = self.expression()?;
        self.expect(&Token::LBrace, "'{'")?;
        let mut arms = Vec::new();
        while self.peek() != &Token::RBrace {
            if self.peek() == &Token::Eof {
                return Err(self.err("unexpected end of input in case statement"));
            }
            let mut patterns = vec![self.pattern()?];
            while self.peek() == &Token::Comma {
                self.advance();
                patterns.push(self.pattern()?);
            }
            self.expect(&Token::Colon, "':'")?;
            let body = self.block()?;
            arms.push(CaseArm { patterns, body });
        }
        self.advance();
        if arms.is_empty() {
            return Err(self.err("case statement has no arms"));
        }
        Ok(Stmt::Case(CaseStmt {
            control,
            arms,
            span,
        }))
    }

    /// A resource declaration or a type-level defaults declaration.
    ///
    /// Both start `word {`; a body whose first tokens are `word =>` has no
    /// title and is a defaults declaration.
    fn declaration(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        let type_name = self.take_word("type name")?;
        self.expect(&Token::LBrace, "'{'")?;

        if matches!(self.peek(), Token::Word(_)) && self.peek_at(1) == &Token::FatArrow {
            let params = self.param_list()?;
            self.expect(&Token::RBrace, "'}'")?;
            return Ok(Stmt::Defaults {
                type_name,
                params,
                span,
            });
        }

        let mut bodies = vec![self.instance_body()?];
        while self.peek() == &Token::Semi {
            self.advance();
            if self.peek() == &Token::RBrace {
                break; // trailing ';'
            }
            bodies.push(self.instance_body()?);
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Stmt::Resource {
            type_name,
            bodies,
            span,
        })
    }

    /// `title1, title2: param => value, ...`
    fn instance_body(&mut self) -> Result<InstanceBody, ParseError> {
        let mut titles = vec![self.expression()?];
        while self.peek() == &Token::Comma {
            self.advance();
            titles.push(self.expression()?);
        }
        self.expect(&Token::Colon, "':' after resource title")?;
        let params = self.param_list()?;
        Ok(InstanceBody { titles, params })
    }

    /// `param => value, ...` with optional trailing comma; may be empty.
    fn param_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        while matches!(self.peek(), Token::Word(_)) {
            let span = self.span();
            let name = self.take_word("parameter name")?;
            self.expect(&Token::FatArrow, "'=>'")?;
            let value = self.expression()?;
            params.push(Param { name, value, span });
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    // -- Expressions --------------------------------------------------

    /// Expression with an optional `==` / `!=` comparison (if conditions).
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.expression()?;
        let op = match self.peek() {
            Token::EqEq => CompareOp::Eq,
            Token::NotEq => CompareOp::NotEq,
            _ => return Ok(lhs),
        };
        let span = lhs.span();
        self.advance();
        let rhs = self.expression()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span,
        })
    }

    /// Primary expression, optionally wrapped by a `? { ... }` selector.
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let primary = self.primary()?;
        if self.peek() == &Token::Question {
            return self.selector(primary);
        }
        Ok(primary)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.span();
        match self.peek().clone() {
            Token::DString(segs) => {
                self.advance();
                Ok(Expr::Str { segs, span })
            }
            Token::SString(value) => {
                self.advance();
                Ok(Expr::Raw { value, span })
            }
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Number { value, span })
            }
            Token::Variable(name) => {
                self.advance();
                Ok(Expr::Variable { name, span })
            }
            Token::LBracket => self.array(),
            Token::Word(w) => {
                self.advance();
                match w.as_str() {
                    "true" => Ok(Expr::Bool { value: true, span }),
                    "false" => Ok(Expr::Bool { value: false, span }),
                    // `Type["title"]` resource reference
                    _ if self.peek() == &Token::LBracket => {
                        self.advance();
                        let title = self.expression()?;
                        self.expect(&Token::RBracket, "']'")?;
                        Ok(Expr::ResourceRef {
                            type_name: w,
                            title: Box::new(title),
                            span,
                        })
                    }
                    _ => Ok(Expr::Word { value: w, span }),
                }
            }
            other => Err(self.err(format!(
                "expected an expression, got {}",
                other.describe()
            ))),
        }
    }

    fn array(&mut self) -> Result<Expr, ParseError> {
        let span = self.span();
        self.advance();
        let mut items = Vec::new();
        while self.peek() != &Token::RBracket {
            if self.peek() == &Token::Eof {
                return Err(self.err("unterminated array literal"));
            }
            items.push(self.expression()?);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::Array { items, span })
    }

    /// `control ? { pattern => result, ... }`
    fn selector(&mut self, control: Expr) -> Result<Expr, ParseError> {
        let span = control.span();
        self.expect(&Token::Question, "'?'")?;
        self.expect(&Token::LBrace, "'{'")?;
        let mut arms = Vec::new();
        while self.peek() != &Token::RBrace {
            if self.peek() == &Token::Eof {
                return Err(self.err("unterminated selector"));
            }
            let pattern = self.pattern()?;
            self.expect(&Token::FatArrow, "'=>'")?;
            let result = self.expression()?;
            arms.push(SelectorArm { pattern, result });
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RBrace, "'}'")?;
        if arms.is_empty() {
            return Err(self.err("selector has no arms"));
        }
        Ok(Expr::Selector {
            control: Box::new(control),
            arms,
            span,
        })
    }

    /// A case/selector pattern: the `default` keyword or an expression.
    fn pattern(&mut self) -> Result<Pattern, ParseError> {
        if self.is_word("default") {
            self.advance();
            Ok(Pattern::Default)
        } else {
            Ok(Pattern::Expr(self.expression()?))
        }
    }
}
