//! Recursive evaluator for Arrow fragments.
//!
//! Expressions produce values; statements mutate a [`Memory`] in place.
//! Backward constructs (`un`, backwards calls, the unwind half of
//! `do/undo`) consult the inverter at evaluation time, so the same
//! traversal runs a block in either orientation.
//!
//! An `exit` statement does not raise anything: statement evaluation
//! returns a [`Flow`], and `Flow::Return` threads up through blocks and
//! loops until the function runtime converts it into a `result` binding.

use crate::ast::{
    BinOp, Block, Call, Expr, ForLoop, Function, ModOp, Place, Program, Stmt, VarCondition,
};
use crate::error::{ArrowError, ErrorKind, Result};
use crate::inverter::{invert_block, invert_statement};
use crate::memory::Memory;
use crate::scanner::Token;
use crate::value::{BoundMethod, ListRef, Value};

/// The outcome of evaluating a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Keep going with the next statement.
    Continue,
    /// An `exit` fired; unwind to the enclosing function invocation.
    Return(Value),
}

/// A resolved storage location: either a named binding or one element of
/// a list. Resolving before reading keeps index expressions from being
/// evaluated twice during swaps.
enum Location {
    Var { name: String, token: Token },
    Elem { list: ListRef, index: usize },
}

/// Evaluates fragments against a program context (the function table for
/// bare-name calls). The context is explicit: the evaluator holds no
/// global state.
pub struct Evaluator<'p> {
    program: &'p Program,
}

impl<'p> Evaluator<'p> {
    pub fn new(program: &'p Program) -> Self {
        Evaluator { program }
    }

    /// Run a main function over the program's main variables and return
    /// the resulting scope.
    pub fn program_eval(&self, main: &Function) -> Result<Memory> {
        let mut memory = Memory::with_bindings(self.program.main_vars.clone(), Vec::new());
        self.block_eval(&main.block, &mut memory)?;
        Ok(memory)
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    pub fn expr_eval(&self, expr: &Expr, memory: &mut Memory) -> Result<Value> {
        match expr {
            Expr::Num { number, .. } => Ok(Value::Num(number.clone())),

            Expr::Str { text, .. } => Ok(Value::str_from(text)),

            Expr::VarRef(var) => memory.get(&var.name).map_err(|e| e.at(&var.token)),

            Expr::ArrayRef(array) => {
                let list = self.fetch_list(&array.name, &array.token, memory)?;
                let len = list.borrow().len();
                let index = self.index_eval(&array.index, len, memory)?;
                let element = list.borrow()[index].clone();
                Ok(element)
            }

            Expr::ArrayExpr { entries, .. } => {
                let mut items = Vec::with_capacity(entries.len());
                for entry in entries {
                    items.push(self.expr_eval(entry, memory)?);
                }
                Ok(Value::list_from(items))
            }

            Expr::Binary {
                op,
                left,
                right,
                token,
            } => {
                // Both operands are always evaluated; there is no
                // short-circuiting to keep inverses symmetric.
                let left = self.expr_eval(left, memory)?;
                let right = self.expr_eval(right, memory)?;
                apply_binop(*op, left, right, token)
            }

            Expr::Negate { expr, token } => match self.expr_eval(expr, memory)? {
                Value::Num(n) => Ok(Value::Num(-n)),
                other => Err(ArrowError::eval(
                    ErrorKind::TypeMismatch,
                    format!("Cannot negate a {}.", other.type_name()),
                    token,
                )),
            },

            Expr::Call(call) => {
                let output = self.call_eval(call, memory)?;
                output.refs.get("result").cloned().ok_or_else(|| {
                    ArrowError::eval(
                        ErrorKind::NotFound,
                        format!("Call to '{}' produced no result.", call.name),
                        &call.token,
                    )
                })
            }
        }
    }

    /// Evaluate a condition expression, which must come out boolean.
    fn bool_eval(&self, expr: &Expr, memory: &mut Memory) -> Result<bool> {
        match self.expr_eval(expr, memory)? {
            Value::Bool(b) => Ok(b),
            other => Err(ArrowError::eval(
                ErrorKind::TypeMismatch,
                format!(
                    "Expected a boolean condition, but found a {}.",
                    other.type_name()
                ),
                expr.token(),
            )),
        }
    }

    fn fetch_list(&self, name: &str, token: &Token, memory: &Memory) -> Result<ListRef> {
        match memory.get(name).map_err(|e| e.at(token))? {
            Value::List(items) => Ok(items),
            other => Err(ArrowError::eval(
                ErrorKind::TypeMismatch,
                format!("'{}' is a {}, not a list.", name, other.type_name()),
                token,
            )),
        }
    }

    /// Evaluate an index expression and validate it: a whole,
    /// non-negative number inside the bounds.
    fn index_eval(&self, expr: &Expr, len: usize, memory: &mut Memory) -> Result<usize> {
        let token = expr.token();
        let number = match self.expr_eval(expr, memory)? {
            Value::Num(n) => n,
            other => {
                return Err(ArrowError::eval(
                    ErrorKind::BadIndex,
                    format!("A {} cannot be used as an index.", other.type_name()),
                    token,
                ))
            }
        };
        if !number.is_integer() {
            return Err(ArrowError::eval(
                ErrorKind::BadIndex,
                format!("Only whole indices can access arrays, not {}.", number),
                token,
            ));
        }
        if number.sign == -1 {
            return Err(ArrowError::eval(
                ErrorKind::BadIndex,
                format!("Indices cannot be negative ({}).", number),
                token,
            ));
        }
        match number.to_index() {
            Some(index) if index < len => Ok(index),
            _ => Err(ArrowError::eval(
                ErrorKind::BadIndex,
                format!("Index {} is out of bounds for length {}.", number, len),
                token,
            )),
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    pub fn statement_eval(&self, stmt: &Stmt, memory: &mut Memory) -> Result<Flow> {
        match stmt {
            Stmt::ModOp(mod_op) => {
                self.mod_op_eval(mod_op, memory)?;
                Ok(Flow::Continue)
            }

            Stmt::SwapOp { left, right, .. } => {
                let left = self.resolve_place(left, memory)?;
                let right = self.resolve_place(right, memory)?;
                let left_value = self.location_get(&left, memory)?;
                let right_value = self.location_get(&right, memory)?;
                self.location_set(&left, right_value, memory)?;
                self.location_set(&right, left_value, memory)?;
                Ok(Flow::Continue)
            }

            Stmt::VarDec(dec) => {
                let value = self.expr_eval(&dec.expr, memory)?;
                memory.set(&dec.name, value).map_err(|e| e.at(&dec.token))?;
                Ok(Flow::Continue)
            }

            Stmt::VarCondition(cond) => {
                self.var_condition_eval(cond, memory)?;
                Ok(Flow::Continue)
            }

            Stmt::If {
                condition,
                true_block,
                false_block,
                ..
            } => {
                // The postcondition is the inverter's business; forward
                // execution never looks at it.
                if self.bool_eval(condition, memory)? {
                    self.block_eval(true_block, memory)
                } else if let Some(false_block) = false_block {
                    self.block_eval(false_block, memory)
                } else {
                    Ok(Flow::Continue)
                }
            }

            Stmt::FromLoop {
                block,
                end_condition,
                ..
            } => {
                // The body runs at least once; the start condition is
                // not checked in the present design.
                loop {
                    if let Flow::Return(value) = self.block_eval(block, memory)? {
                        return Ok(Flow::Return(value));
                    }
                    if self.bool_eval(end_condition, memory)? {
                        return Ok(Flow::Continue);
                    }
                }
            }

            Stmt::ForLoop(for_loop) => self.for_loop_eval(for_loop, memory),

            Stmt::DoUndo {
                action, yielding, ..
            } => {
                // The sandwich: do, yield, undo. A return unwinds past
                // the rest of the sandwich, like any other unwinding.
                if let Flow::Return(value) = self.block_eval(action, memory)? {
                    return Ok(Flow::Return(value));
                }
                if let Some(yielding) = yielding {
                    if let Flow::Return(value) = self.block_eval(yielding, memory)? {
                        return Ok(Flow::Return(value));
                    }
                }
                self.block_eval(&invert_block(action), memory)
            }

            Stmt::Result { expr, token } => {
                let value = self.expr_eval(expr, memory)?;
                memory.set("result", value).map_err(|e| e.at(token))?;
                Ok(Flow::Continue)
            }

            // Entry markers matter only to the invocation scan.
            Stmt::Enter { .. } => Ok(Flow::Continue),

            Stmt::Exit {
                value, condition, ..
            } => {
                if self.bool_eval(condition, memory)? {
                    let value = self.expr_eval(value, memory)?;
                    Ok(Flow::Return(value))
                } else {
                    Ok(Flow::Continue)
                }
            }

            Stmt::Un { statement, .. } => {
                self.statement_eval(&invert_statement(statement), memory)
            }

            Stmt::Call(call) => {
                // In statement position the result, if any, is ignored.
                self.call_eval(call, memory)?;
                Ok(Flow::Continue)
            }

            Stmt::Block { block, .. } => self.block_eval(block, memory),
        }
    }

    pub fn block_eval(&self, block: &Block, memory: &mut Memory) -> Result<Flow> {
        for stmt in &block.statements {
            if let Flow::Return(value) = self.statement_eval(stmt, memory)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn mod_op_eval(&self, mod_op: &ModOp, memory: &mut Memory) -> Result<()> {
        // x += e expands into x = x + e; the operand is evaluated first.
        let operand = self.expr_eval(&mod_op.expr, memory)?;
        let place = self.resolve_place(&mod_op.place, memory)?;
        let old = self.location_get(&place, memory)?;
        let new = apply_binop(mod_op.op.into(), old, operand, &mod_op.token)?;
        self.location_set(&place, new, memory)
    }

    fn var_condition_eval(&self, cond: &VarCondition, memory: &mut Memory) -> Result<()> {
        let actual = memory.refs.get(&cond.name).cloned().ok_or_else(|| {
            ArrowError::eval(
                ErrorKind::NotFound,
                format!("'{}' not found in memory.", cond.name),
                &cond.token,
            )
        })?;
        let expected = self.expr_eval(&cond.expr, memory)?;
        if actual != expected {
            return Err(ArrowError::eval(
                ErrorKind::ConditionViolation,
                format!(
                    "'{}' is supposed to be {} but it's actually {}.",
                    cond.name, expected, actual
                ),
                &cond.token,
            ));
        }
        memory.delete(&cond.name);
        Ok(())
    }

    fn for_loop_eval(&self, for_loop: &ForLoop, memory: &mut Memory) -> Result<Flow> {
        let dec = &for_loop.var_dec;
        let until = &for_loop.end_condition;

        let initial = self.expr_eval(&dec.expr, memory)?;
        memory.set(&dec.name, initial).map_err(|e| e.at(&dec.token))?;

        loop {
            if !for_loop.inc_at_end {
                self.mod_op_eval(&for_loop.increment, memory)?;
            }

            if let Flow::Return(value) = self.block_eval(&for_loop.block, memory)? {
                return Ok(Flow::Return(value));
            }

            if for_loop.inc_at_end {
                self.mod_op_eval(&for_loop.increment, memory)?;
            }

            let actual = memory.refs.get(&until.name).cloned().ok_or_else(|| {
                ArrowError::eval(
                    ErrorKind::NotFound,
                    format!("'{}' not found in memory.", until.name),
                    &until.token,
                )
            })?;
            if actual == self.expr_eval(&until.expr, memory)? {
                break;
            }
        }

        // Executing the termination condition deallocates the induction
        // variable, closing the loop's scope.
        self.var_condition_eval(until, memory)?;
        Ok(Flow::Continue)
    }

    fn resolve_place(&self, place: &Place, memory: &mut Memory) -> Result<Location> {
        match place {
            Place::Var(var) => Ok(Location::Var {
                name: var.name.clone(),
                token: var.token.clone(),
            }),
            Place::Array(array) => {
                let list = self.fetch_list(&array.name, &array.token, memory)?;
                let len = list.borrow().len();
                let index = self.index_eval(&array.index, len, memory)?;
                Ok(Location::Elem { list, index })
            }
        }
    }

    fn location_get(&self, location: &Location, memory: &Memory) -> Result<Value> {
        match location {
            Location::Var { name, token } => memory.get(name).map_err(|e| e.at(token)),
            Location::Elem { list, index } => Ok(list.borrow()[*index].clone()),
        }
    }

    fn location_set(&self, location: &Location, value: Value, memory: &mut Memory) -> Result<()> {
        match location {
            Location::Var { name, token } => {
                memory.set(name, value).map_err(|e| e.at(token))
            }
            Location::Elem { list, index } => {
                list.borrow_mut()[*index] = value;
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------
    // Function invocation
    // -----------------------------------------------------------------

    /// Resolve and invoke a callable, then copy changed reference
    /// bindings back into the caller's scope. Returns the callee's final
    /// memory; the caller reads `result` out of it when one is needed.
    fn call_eval(&self, call: &Call, memory: &mut Memory) -> Result<Memory> {
        let output = if call.name.contains('.') {
            // Dotted names are method lookups on a value.
            match memory.get(&call.name).map_err(|e| e.at(&call.token))? {
                Value::Method(method) => self.invoke_method(&method, call, memory)?,
                Value::Function(function) => self.invoke_function(&function, call, memory)?,
                other => {
                    return Err(ArrowError::eval(
                        ErrorKind::TypeMismatch,
                        format!("'{}' is a {}, not callable.", call.name, other.type_name()),
                        &call.token,
                    ))
                }
            }
        } else {
            let function = self.program.functions.get(&call.name).ok_or_else(|| {
                ArrowError::eval(
                    ErrorKind::NotFound,
                    format!("No function named '{}'.", call.name),
                    &call.token,
                )
            })?;
            self.invoke_function(function, call, memory)?
        };

        memory.update_refs(&output);
        Ok(output)
    }

    fn invoke_function(
        &self,
        function: &Function,
        call: &Call,
        memory: &mut Memory,
    ) -> Result<Memory> {
        if call.ref_args.len() != function.ref_parameters.len()
            || call.const_args.len() != function.const_parameters.len()
        {
            return Err(ArrowError::eval(
                ErrorKind::ArityMismatch,
                format!(
                    "'{}' takes {} ref and {} const arguments, but was given {} and {}.",
                    function.name,
                    function.ref_parameters.len(),
                    function.const_parameters.len(),
                    call.ref_args.len(),
                    call.const_args.len()
                ),
                &call.token,
            ));
        }

        let mut ref_vals = Vec::with_capacity(call.ref_args.len());
        for arg in &call.ref_args {
            ref_vals.push(memory.get(&arg.name).map_err(|e| e.at(&arg.token))?);
        }
        let mut const_vals = Vec::with_capacity(call.const_args.len());
        for arg in &call.const_args {
            const_vals.push(self.expr_eval(arg, memory)?);
        }

        let mut table = Memory::with_bindings(
            function.ref_parameters.iter().cloned().zip(ref_vals).collect(),
            function
                .const_parameters
                .iter()
                .cloned()
                .zip(const_vals)
                .collect(),
        );

        self.execute_function(function, call.backwards, &mut table)?;

        // Rename ref bindings back to the caller's names. A caller that
        // passed &x into a parameter also named x needs no rename, and
        // the entry must survive.
        for (arg, param) in call.ref_args.iter().zip(&function.ref_parameters) {
            let value = table.refs.get(param).cloned().ok_or_else(|| {
                ArrowError::eval(
                    ErrorKind::NotFound,
                    format!(
                        "Reference parameter '{}' was deallocated inside '{}'.",
                        param, function.name
                    ),
                    &call.token,
                )
            })?;
            table.refs.insert(arg.name.clone(), value);
            if arg.name != *param {
                table.refs.remove(param);
            }
        }

        Ok(table)
    }

    /// Orient the block, pick the entry point, and run.
    fn execute_function(
        &self,
        function: &Function,
        backwards: bool,
        table: &mut Memory,
    ) -> Result<()> {
        let block = if backwards {
            invert_block(&function.block)
        } else {
            function.block.clone()
        };

        // Scan the top-level statements bottom-up for a satisfied enter
        // marker; running backwards the exits have become enters, which
        // is what gives a function multiple entry points.
        let mut start = 0;
        for (index, stmt) in block.statements.iter().enumerate().rev() {
            if let Stmt::Enter {
                value, condition, ..
            } = stmt
            {
                if self.bool_eval(condition, table)? {
                    let value = self.expr_eval(value, table)?;
                    table.set("result", value).map_err(|e| e.at(stmt.token()))?;
                    start = index + 1;
                    break;
                }
            }
        }

        for stmt in &block.statements[start..] {
            if let Flow::Return(value) = self.statement_eval(stmt, table)? {
                return table.set("result", value).map_err(|e| e.at(stmt.token()));
            }
        }
        Ok(())
    }

    fn invoke_method(
        &self,
        method: &BoundMethod,
        call: &Call,
        memory: &mut Memory,
    ) -> Result<Memory> {
        let def = method.method;
        if !call.ref_args.is_empty() || call.const_args.len() != def.const_params.len() {
            return Err(ArrowError::eval(
                ErrorKind::ArityMismatch,
                format!(
                    "'{}' takes {} const arguments, but was given {}.",
                    def.name,
                    def.const_params.len(),
                    call.ref_args.len() + call.const_args.len()
                ),
                &call.token,
            ));
        }

        let mut const_vals = Vec::with_capacity(call.const_args.len());
        for arg in &call.const_args {
            const_vals.push(self.expr_eval(arg, memory)?);
        }

        let mut table = Memory::with_bindings(
            Vec::new(),
            def.const_params
                .iter()
                .map(|name| name.to_string())
                .zip(const_vals)
                .collect(),
        );

        let native = if call.backwards { def.inverse } else { def.forward };
        if let Some(result) = native(&method.receiver, &table).map_err(|e| e.at(&call.token))? {
            table.set("result", result).map_err(|e| e.at(&call.token))?;
        }

        Ok(table)
    }
}

/// Apply a binary operator to two evaluated operands.
fn apply_binop(op: BinOp, left: Value, right: Value, token: &Token) -> Result<Value> {
    // Equality is structural and works across every value shape.
    match op {
        BinOp::Eq => return Ok(Value::Bool(left == right)),
        BinOp::Ne => return Ok(Value::Bool(left != right)),
        _ => {}
    }

    let (a, b) = match (&left, &right) {
        (Value::Num(a), Value::Num(b)) => (a.clone(), b.clone()),
        _ => {
            return Err(ArrowError::eval(
                ErrorKind::TypeMismatch,
                format!(
                    "Operator '{}' needs numbers, but was given a {} and a {}.",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ),
                token,
            ))
        }
    };

    let divide_by_zero = |_| {
        ArrowError::eval(ErrorKind::DivByZero, "Division by zero.", token)
    };

    let value = match op {
        BinOp::Add => Value::Num(a + b),
        BinOp::Sub => Value::Num(a - b),
        BinOp::Mul => Value::Num(a * b),
        BinOp::Div => Value::Num(a.div(&b).map_err(divide_by_zero)?),
        BinOp::Mod => Value::Num(a.modulo(&b).map_err(divide_by_zero)?),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Ge => Value::Bool(a >= b),
        BinOp::Eq | BinOp::Ne => unreachable!("handled above"),
    };
    Ok(value)
}
