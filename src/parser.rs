//! Recursive-descent parser for Arrow.
//!
//! Statements are dispatched on one token of lookahead: a leading
//! identifier may open `un`, a call (`f(`), a declaration (`x :=`), a
//! deallocation (`x ==`), or an update/swap; the loop, conditional and
//! return forms announce themselves with keywords. Expression precedence,
//! low to high: comparisons, `%`, additive, multiplicative, primary.

use crate::ast::{
    ArithOp, ArrayRef, BinOp, Block, Call, Expr, ForLoop, Function, ModOp, Place, Program,
    Stmt, VarCondition, VarDec, VarRef,
};
use crate::error::{ArrowError, Result};
use crate::evaluator::Evaluator;
use crate::memory::Memory;
use crate::num::Num;
use crate::scanner::{Token, TokenKind};
use num_bigint::BigUint;
use num_traits::One;
use std::collections::HashMap;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// The token stream must end with an EOF token, as the scanner
    /// guarantees; an empty stream is padded with one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, "", 0, 0));
        }
        Parser { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn lookahead(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if its text matches.
    fn eat(&mut self, text: &str) -> bool {
        if self.current().text == text {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<Token> {
        if self.current().text == text {
            Ok(self.bump())
        } else {
            Err(self.error(format!(
                "Expected '{}', but found '{}'.",
                text,
                self.current().text
            )))
        }
    }

    fn expect_kind(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current().kind == kind {
            Ok(self.bump())
        } else {
            Err(self.error(format!(
                "Expected something of kind {:?}, but found '{}'.",
                kind,
                self.current().text
            )))
        }
    }

    fn expect_one_of(&mut self, options: &[&str]) -> Result<Token> {
        if options.iter().any(|o| self.current().text == *o) {
            Ok(self.bump())
        } else {
            let wanted: Vec<String> = options.iter().map(|o| format!("'{}'", o)).collect();
            Err(self.error(format!(
                "Expected {}, but found '{}'.",
                wanted.join(" or "),
                self.current().text
            )))
        }
    }

    fn at_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn error(&self, message: String) -> ArrowError {
        ArrowError::parsing(message, self.current().clone())
    }

    // -----------------------------------------------------------------
    // Program structure
    // -----------------------------------------------------------------

    /// Parse `main ( var_decs ) block` followed by any number of
    /// function definitions, then pre-evaluate the main variable
    /// initializers into values.
    pub fn program(mut self) -> Result<Program> {
        let mut functions = HashMap::new();
        let mut declarations: Vec<VarDec> = Vec::new();
        let mut saw_main = false;

        while !self.at_eof() {
            if self.current().text == "main" && self.current().kind == TokenKind::Id {
                self.bump();
                self.expect("(")?;
                while !self.eat(")") {
                    if self.at_eof() {
                        return Err(self.error("Unexpected end of file in main's variables.".into()));
                    }
                    declarations.push(self.var_dec()?);
                    self.eat(",");
                }
                let block = self.block()?;
                functions.insert(
                    "main".to_string(),
                    Function {
                        name: "main".to_string(),
                        ref_parameters: declarations.iter().map(|d| d.name.clone()).collect(),
                        const_parameters: Vec::new(),
                        block,
                    },
                );
                saw_main = true;
            } else {
                let function = self.function()?;
                functions.insert(function.name.clone(), function);
            }
        }

        if !saw_main {
            return Err(self.error("Program has no main function.".into()));
        }

        let mut program = Program {
            functions,
            main_vars: Vec::new(),
        };

        // Initializers are evaluated in an empty scope: one cannot
        // reference an earlier main variable from a later initializer.
        let mut main_vars = Vec::with_capacity(declarations.len());
        {
            let evaluator = Evaluator::new(&program);
            let mut scratch = Memory::new();
            for dec in &declarations {
                let value = evaluator.expr_eval(&dec.expr, &mut scratch)?;
                main_vars.push((dec.name.clone(), value));
            }
        }
        program.main_vars = main_vars;
        Ok(program)
    }

    fn function(&mut self) -> Result<Function> {
        let name = self.expect_kind(TokenKind::Id)?;
        self.expect("(")?;

        let mut ref_parameters = Vec::new();
        let mut const_parameters = Vec::new();
        loop {
            if self.eat("ref") {
                ref_parameters.push(self.expect_kind(TokenKind::Id)?.text);
            } else if self.eat("const") {
                const_parameters.push(self.expect_kind(TokenKind::Id)?.text);
            }
            if self.current().text == ")" {
                break;
            }
            self.expect(",")?;
        }
        self.expect(")")?;

        let block = self.block()?;
        Ok(Function {
            name: name.text,
            ref_parameters,
            const_parameters,
            block,
        })
    }

    fn block(&mut self) -> Result<Block> {
        self.expect("{")?;
        let mut statements = Vec::new();
        while self.current().text != "}" {
            if self.at_eof() {
                return Err(self.error("Unexpected end of file inside a block.".into()));
            }
            statements.push(self.statement()?);
        }
        self.expect("}")?;
        Ok(Block::new(statements))
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn statement(&mut self) -> Result<Stmt> {
        let token = self.current().clone();

        if token.kind == TokenKind::Id {
            if token.text == "un" {
                return self.un_statement();
            }
            let next = self.lookahead().text.clone();
            return match next.as_str() {
                "(" => Ok(Stmt::Call(self.function_call()?)),
                ":=" => Ok(Stmt::VarDec(self.var_dec()?)),
                "==" => Ok(Stmt::VarCondition(self.var_condition()?)),
                _ => self.mod_operation(),
            };
        }

        if token.kind == TokenKind::Keyword {
            match token.text.as_str() {
                "from" => return self.from_loop(),
                "for" => return self.for_loop(),
                "if" => return self.if_statement(),
                "do/undo" => return self.do_undo_statement(),
                "result" => return self.result_statement(),
                "enter" | "exit" => return self.enter_or_exit_statement(),
                _ => {}
            }
        }

        if token.text == "{" {
            let block = self.block()?;
            return Ok(Stmt::Block { block, token });
        }

        Err(self.error(format!(
            "Expected a statement, but found '{}'.",
            token.text
        )))
    }

    fn un_statement(&mut self) -> Result<Stmt> {
        let token = self.expect("un")?;
        self.expect("(")?;
        self.expect(":")?;
        let statement = self.statement()?;
        self.expect(":")?;
        self.expect(")")?;
        Ok(Stmt::Un {
            statement: Box::new(statement),
            token,
        })
    }

    fn result_statement(&mut self) -> Result<Stmt> {
        let token = self.expect("result")?;
        Ok(Stmt::Result {
            expr: self.expression()?,
            token,
        })
    }

    fn enter_or_exit_statement(&mut self) -> Result<Stmt> {
        let token = self.expect_one_of(&["enter", "exit"])?;
        let value = self.expression()?;
        self.expect("if")?;
        let condition = self.expression()?;
        Ok(if token.text == "enter" {
            Stmt::Enter {
                value,
                condition,
                token,
            }
        } else {
            Stmt::Exit {
                value,
                condition,
                token,
            }
        })
    }

    fn var_dec(&mut self) -> Result<VarDec> {
        let name = self.expect_kind(TokenKind::Id)?;
        self.expect(":=")?;
        Ok(VarDec {
            name: name.text.clone(),
            expr: self.init_expr()?,
            token: name,
        })
    }

    fn var_condition(&mut self) -> Result<VarCondition> {
        let name = self.expect_kind(TokenKind::Id)?;
        self.expect("==")?;
        Ok(VarCondition {
            name: name.text.clone(),
            expr: self.init_expr()?,
            token: name,
        })
    }

    /// The right-hand side of `:=` and `==`: an array literal or an
    /// ordinary expression.
    fn init_expr(&mut self) -> Result<Expr> {
        if self.current().text != "[" {
            return self.expression();
        }
        let token = self.bump();
        let mut entries = Vec::new();
        while !self.eat("]") {
            if self.at_eof() {
                return Err(self.error("Unexpected end of file inside an array literal.".into()));
            }
            entries.push(self.expression()?);
            self.eat(",");
        }
        Ok(Expr::ArrayExpr { entries, token })
    }

    fn mod_operation(&mut self) -> Result<Stmt> {
        let place = self.place()?;
        let op_token = self.expect_one_of(&["+=", "-=", "*=", "/=", "<=>"])?;

        if op_token.text == "<=>" {
            if self.current().kind != TokenKind::Id {
                return Err(self.error(format!(
                    "Can't swap with '{}' because it is not a variable name.",
                    self.current().text
                )));
            }
            let right = self.place()?;
            return Ok(Stmt::SwapOp {
                left: place,
                right,
                token: op_token,
            });
        }

        let op = match op_token.text.as_str() {
            "+=" => ArithOp::Add,
            "-=" => ArithOp::Sub,
            "*=" => ArithOp::Mul,
            _ => ArithOp::Div,
        };
        Ok(Stmt::ModOp(ModOp {
            place,
            op,
            expr: self.expression()?,
            token: op_token,
        }))
    }

    fn for_loop(&mut self) -> Result<Stmt> {
        let token = self.expect("for")?;
        self.eat("(");
        let var_dec = self.var_dec()?;
        self.eat(")");

        // The increment may come before the body (runs first each
        // iteration) or after it (runs last).
        let mut increment = None;
        let mut inc_at_end = false;
        if self.eat(",") {
            self.eat("(");
            increment = Some(self.mod_op_only()?);
            self.eat(")");
        }

        let block = self.block()?;

        if self.current().text != "until" {
            self.eat("(");
            increment = Some(self.mod_op_only()?);
            self.eat(")");
            inc_at_end = true;
            self.expect(",")?;
        }

        self.expect("until")?;
        self.eat("(");
        let end_condition = self.var_condition()?;
        self.eat(")");

        let increment = increment
            .ok_or_else(|| self.error("For-loop is missing its increment statement.".into()))?;

        Ok(Stmt::ForLoop(ForLoop {
            inc_at_end,
            var_dec,
            increment,
            block,
            end_condition,
            token,
        }))
    }

    fn mod_op_only(&mut self) -> Result<ModOp> {
        match self.mod_operation()? {
            Stmt::ModOp(mod_op) => Ok(mod_op),
            stmt => Err(ArrowError::parsing(
                "For-loop increments must be update operations, not swaps.",
                stmt.token().clone(),
            )),
        }
    }

    fn from_loop(&mut self) -> Result<Stmt> {
        let token = self.expect("from")?;
        let start_condition = self.expression()?;
        let block = self.block()?;
        self.expect("until")?;
        let end_condition = self.expression()?;
        Ok(Stmt::FromLoop {
            start_condition,
            block,
            end_condition,
            token,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let token = self.expect("if")?;
        let condition = self.expression()?;
        let true_block = self.block()?;

        let result = if self.eat("=>") {
            self.expression()?
        } else if self.eat("<=>") {
            // Shorthand for a condition the branch leaves invariant.
            condition.clone()
        } else {
            return Err(self.error(format!(
                "If-statement starting on line {} is missing its post-condition or '<=>'.",
                token.line
            )));
        };

        let false_block = if self.eat("else") {
            Some(self.block()?)
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            true_block,
            result,
            false_block,
            token,
        })
    }

    fn do_undo_statement(&mut self) -> Result<Stmt> {
        let token = self.expect("do/undo")?;
        let action = self.block()?;
        let yielding = if self.eat("yielding") {
            Some(self.block()?)
        } else {
            None
        };
        Ok(Stmt::DoUndo {
            action,
            yielding,
            token,
        })
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    pub fn expression(&mut self) -> Result<Expr> {
        let mut node = self.modulo_level()?;
        while matches!(self.current().text.as_str(), "<" | ">" | "<=" | ">=" | "==" | "!=")
            && self.current().kind == TokenKind::Symbol
        {
            let token = self.bump();
            let op = binop(&token.text);
            node = Expr::Binary {
                op,
                left: Box::new(node),
                right: Box::new(self.modulo_level()?),
                token,
            };
        }
        Ok(node)
    }

    fn modulo_level(&mut self) -> Result<Expr> {
        let mut node = self.additive()?;
        while self.current().text == "%" && self.current().kind == TokenKind::Symbol {
            let token = self.bump();
            node = Expr::Binary {
                op: BinOp::Mod,
                left: Box::new(node),
                right: Box::new(self.additive()?),
                token,
            };
        }
        Ok(node)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut node = self.multiplicative()?;
        while matches!(self.current().text.as_str(), "+" | "-")
            && self.current().kind == TokenKind::Symbol
        {
            let token = self.bump();
            let op = binop(&token.text);
            node = Expr::Binary {
                op,
                left: Box::new(node),
                right: Box::new(self.multiplicative()?),
                token,
            };
        }
        Ok(node)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut node = self.primary()?;
        while matches!(self.current().text.as_str(), "*" | "/")
            && self.current().kind == TokenKind::Symbol
        {
            let token = self.bump();
            let op = binop(&token.text);
            node = Expr::Binary {
                op,
                left: Box::new(node),
                right: Box::new(self.primary()?),
                token,
            };
        }
        Ok(node)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        match token.kind {
            TokenKind::Id => {
                if self.lookahead().text == "(" {
                    return Ok(Expr::Call(self.function_call()?));
                }
                match self.place()? {
                    Place::Var(var) => Ok(Expr::VarRef(var)),
                    Place::Array(array) => Ok(Expr::ArrayRef(array)),
                }
            }
            TokenKind::Digits => self.number(),
            TokenKind::Str => {
                self.bump();
                Ok(Expr::Str {
                    text: token.text.clone(),
                    token,
                })
            }
            _ if token.text == "-" => {
                self.bump();
                Ok(Expr::Negate {
                    expr: Box::new(self.primary()?),
                    token,
                })
            }
            _ if token.text == "(" => {
                self.bump();
                let node = self.expression()?;
                self.expect(")")?;
                Ok(node)
            }
            _ => Err(self.error(format!(
                "Expected an expression, but found '{}'.",
                token.text
            ))),
        }
    }

    /// A variable or indexed reference.
    fn place(&mut self) -> Result<Place> {
        let token = self.expect_kind(TokenKind::Id)?;
        if self.eat("[") {
            let index = self.expression()?;
            self.expect("]")?;
            return Ok(Place::Array(ArrayRef {
                name: token.text.clone(),
                index: Box::new(index),
                token,
            }));
        }
        Ok(Place::Var(VarRef {
            name: token.text.clone(),
            token,
        }))
    }

    fn function_call(&mut self) -> Result<Call> {
        let name = self.expect_kind(TokenKind::Id)?;
        self.expect("(")?;

        let mut ref_args = Vec::new();
        let mut const_args = Vec::new();
        loop {
            if self.current().text == ")" {
                break;
            }
            if self.at_eof() {
                return Err(self.error("Unexpected end of file inside a call.".into()));
            }
            if self.eat("&") {
                let var = self.expect_kind(TokenKind::Id)?;
                if self.current().text == "[" {
                    return Err(self.error("Reference arguments must be plain variables.".into()));
                }
                ref_args.push(VarRef {
                    name: var.text.clone(),
                    token: var,
                });
            } else {
                const_args.push(self.expression()?);
            }
            if self.current().text == ")" {
                break;
            }
            self.expect(",")?;
        }
        self.expect(")")?;

        Ok(Call {
            name: name.text.clone(),
            backwards: false,
            ref_args,
            const_args,
            token: name,
        })
    }

    /// An integer literal, or `int . int` assembled into an exact
    /// rational with trailing fractional zeros stripped.
    fn number(&mut self) -> Result<Expr> {
        let token = self.expect_kind(TokenKind::Digits)?;
        let mut numerator = parse_digits(&token.text)
            .ok_or_else(|| ArrowError::parsing("Unreadable number literal.", token.clone()))?;
        let mut denominator = BigUint::one();

        if self.current().text == "." && self.lookahead().kind == TokenKind::Digits {
            self.bump();
            let fraction = self.bump();
            let stripped = fraction.text.trim_end_matches('0');
            let power = BigUint::from(10u8).pow(stripped.len() as u32);
            numerator = numerator * &power + parse_digits(stripped).unwrap_or_default();
            denominator = power;
        }

        let number = Num::from_parts(numerator, denominator, 1)
            .map_err(|_| ArrowError::parsing("Number has a zero denominator.", token.clone()))?;
        Ok(Expr::Num { number, token })
    }
}

fn parse_digits(text: &str) -> Option<BigUint> {
    if text.is_empty() {
        return Some(BigUint::from(0u8));
    }
    BigUint::parse_bytes(text.as_bytes(), 10)
}

fn binop(text: &str) -> BinOp {
    match text {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Mod,
        "<" => BinOp::Lt,
        ">" => BinOp::Gt,
        "<=" => BinOp::Le,
        ">=" => BinOp::Ge,
        "==" => BinOp::Eq,
        _ => BinOp::Ne,
    }
}
