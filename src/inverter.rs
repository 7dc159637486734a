//! Structural inversion of Arrow fragments.
//!
//! Inversion is a pure rewrite on the AST: a block runs backwards by
//! reversing its statements and inverting each one. Applied twice it
//! returns the original shape, with one deliberate exception: the action
//! block of `do/undo` is left in forward form, because the evaluator
//! already unwinds it within a single forward run — only the yielding
//! block flips.

use crate::ast::{
    Block, Call, Expr, ForLoop, Function, ModOp, Stmt, VarCondition, VarDec,
};

/// Invert an expression. Arithmetic is pure, so operators stay put and
/// the rewrite just recurses; the only expression that changes meaning
/// under inversion is a call, whose `backwards` flag toggles.
pub fn invert_expr(expr: &Expr) -> Expr {
    match expr {
        Expr::Num { .. } | Expr::Str { .. } | Expr::VarRef(_) => expr.clone(),

        Expr::ArrayRef(array) => {
            let mut array = array.clone();
            array.index = Box::new(invert_expr(&array.index));
            Expr::ArrayRef(array)
        }

        Expr::ArrayExpr { entries, token } => Expr::ArrayExpr {
            entries: entries.iter().map(invert_expr).collect(),
            token: token.clone(),
        },

        Expr::Binary {
            op,
            left,
            right,
            token,
        } => Expr::Binary {
            op: *op,
            left: Box::new(invert_expr(left)),
            right: Box::new(invert_expr(right)),
            token: token.clone(),
        },

        Expr::Negate { expr, token } => Expr::Negate {
            expr: Box::new(invert_expr(expr)),
            token: token.clone(),
        },

        Expr::Call(call) => Expr::Call(invert_call(call)),
    }
}

fn invert_call(call: &Call) -> Call {
    let mut call = call.clone();
    call.backwards = !call.backwards;
    call
}

fn invert_mod_op(mod_op: &ModOp) -> ModOp {
    ModOp {
        place: mod_op.place.clone(),
        op: mod_op.op.inverse(),
        expr: invert_expr(&mod_op.expr),
        token: mod_op.token.clone(),
    }
}

/// Invert a single statement.
pub fn invert_statement(stmt: &Stmt) -> Stmt {
    match stmt {
        // x op= e  becomes  x op'= e  with + <-> - and * <-> /.
        Stmt::ModOp(mod_op) => Stmt::ModOp(invert_mod_op(mod_op)),

        // A swap undoes itself.
        Stmt::SwapOp { .. } => stmt.clone(),

        // Allocation and deallocation are duals.
        Stmt::VarDec(dec) => Stmt::VarCondition(VarCondition {
            name: dec.name.clone(),
            expr: dec.expr.clone(),
            token: dec.token.clone(),
        }),
        Stmt::VarCondition(cond) => Stmt::VarDec(VarDec {
            name: cond.name.clone(),
            expr: cond.expr.clone(),
            token: cond.token.clone(),
        }),

        // The postcondition becomes the condition and vice versa; both
        // branches run backwards.
        Stmt::If {
            condition,
            true_block,
            result,
            false_block,
            token,
        } => Stmt::If {
            condition: result.clone(),
            true_block: invert_block(true_block),
            result: condition.clone(),
            false_block: false_block.as_ref().map(invert_block),
            token: token.clone(),
        },

        // The entry and exit conditions trade places.
        Stmt::FromLoop {
            start_condition,
            block,
            end_condition,
            token,
        } => Stmt::FromLoop {
            start_condition: end_condition.clone(),
            block: invert_block(block),
            end_condition: start_condition.clone(),
            token: token.clone(),
        },

        // The declaration and the termination condition swap sides, the
        // increment inverts, and it moves to the other end of the body.
        Stmt::ForLoop(for_loop) => Stmt::ForLoop(ForLoop {
            inc_at_end: !for_loop.inc_at_end,
            var_dec: VarDec {
                name: for_loop.end_condition.name.clone(),
                expr: for_loop.end_condition.expr.clone(),
                token: for_loop.end_condition.token.clone(),
            },
            increment: invert_mod_op(&for_loop.increment),
            block: invert_block(&for_loop.block),
            end_condition: VarCondition {
                name: for_loop.var_dec.name.clone(),
                expr: for_loop.var_dec.expr.clone(),
                token: for_loop.var_dec.token.clone(),
            },
            token: for_loop.token.clone(),
        }),

        // The action stays forward-form; the evaluator inverts it at run
        // time as the second half of the sandwich. Only yielding flips.
        Stmt::DoUndo {
            action,
            yielding,
            token,
        } => Stmt::DoUndo {
            action: action.clone(),
            yielding: yielding.as_ref().map(invert_block),
            token: token.clone(),
        },

        Stmt::Result { .. } => stmt.clone(),

        // A forward exit is a backward entry point, and vice versa.
        Stmt::Enter {
            value,
            condition,
            token,
        } => Stmt::Exit {
            value: value.clone(),
            condition: condition.clone(),
            token: token.clone(),
        },
        Stmt::Exit {
            value,
            condition,
            token,
        } => Stmt::Enter {
            value: value.clone(),
            condition: condition.clone(),
            token: token.clone(),
        },

        // Inverting "run the inverse of s" is just running s.
        Stmt::Un { statement, .. } => (**statement).clone(),

        Stmt::Call(call) => Stmt::Call(invert_call(call)),

        Stmt::Block { block, token } => Stmt::Block {
            block: invert_block(block),
            token: token.clone(),
        },
    }
}

/// Invert a block: reverse the statement order, inverting each.
pub fn invert_block(block: &Block) -> Block {
    Block::new(
        block
            .statements
            .iter()
            .rev()
            .map(invert_statement)
            .collect(),
    )
}

/// Invert a function: same name and parameters, inverted block.
pub fn invert_function(function: &Function) -> Function {
    Function {
        name: function.name.clone(),
        ref_parameters: function.ref_parameters.clone(),
        const_parameters: function.const_parameters.clone(),
        block: invert_block(&function.block),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArithOp, BinOp, Place, VarRef};
    use crate::num::Num;
    use crate::scanner::{Token, TokenKind};

    fn tok(text: &str) -> Token {
        Token::new(TokenKind::Symbol, text, 0, 0)
    }

    fn var(name: &str) -> VarRef {
        VarRef {
            name: name.to_string(),
            token: Token::new(TokenKind::Id, name, 0, 0),
        }
    }

    fn num(n: i64) -> Expr {
        Expr::Num {
            number: Num::from(n),
            token: Token::new(TokenKind::Digits, n.to_string(), 0, 0),
        }
    }

    fn mod_op(name: &str, op: ArithOp, n: i64) -> Stmt {
        Stmt::ModOp(ModOp {
            place: Place::Var(var(name)),
            op,
            expr: num(n),
            token: tok("op="),
        })
    }

    #[test]
    fn test_mod_op_operator_map() {
        for (op, inverse) in [
            (ArithOp::Add, ArithOp::Sub),
            (ArithOp::Sub, ArithOp::Add),
            (ArithOp::Mul, ArithOp::Div),
            (ArithOp::Div, ArithOp::Mul),
        ] {
            let inverted = invert_statement(&mod_op("x", op, 2));
            match inverted {
                Stmt::ModOp(m) => assert_eq!(m.op, inverse),
                other => panic!("expected a mod-op, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_swap_is_self_inverse() {
        let swap = Stmt::SwapOp {
            left: Place::Var(var("a")),
            right: Place::Var(var("b")),
            token: tok("<=>"),
        };
        assert_eq!(invert_statement(&swap), swap);
    }

    #[test]
    fn test_var_dec_condition_duality() {
        let dec = Stmt::VarDec(VarDec {
            name: "x".to_string(),
            expr: num(3),
            token: tok(":="),
        });
        let inverted = invert_statement(&dec);
        assert!(matches!(inverted, Stmt::VarCondition(_)));
        assert_eq!(invert_statement(&inverted), dec);
    }

    #[test]
    fn test_if_swaps_condition_and_result() {
        let stmt = Stmt::If {
            condition: Expr::Binary {
                op: BinOp::Gt,
                left: Box::new(Expr::VarRef(var("x"))),
                right: Box::new(num(0)),
                token: tok(">"),
            },
            true_block: Block::new(vec![mod_op("x", ArithOp::Sub, 2)]),
            result: Expr::Binary {
                op: BinOp::Ge,
                left: Box::new(Expr::VarRef(var("x"))),
                right: Box::new(num(0)),
                token: tok(">="),
            },
            false_block: None,
            token: tok("if"),
        };

        let inverted = invert_statement(&stmt);
        match &inverted {
            Stmt::If {
                condition,
                true_block,
                result,
                ..
            } => {
                assert!(matches!(condition, Expr::Binary { op: BinOp::Ge, .. }));
                assert!(matches!(result, Expr::Binary { op: BinOp::Gt, .. }));
                assert_eq!(true_block.statements, vec![mod_op("x", ArithOp::Add, 2)]);
            }
            other => panic!("expected an if, got {:?}", other),
        }
        assert_eq!(invert_statement(&inverted), stmt);
    }

    #[test]
    fn test_block_reverses_and_inverts() {
        let block = Block::new(vec![
            mod_op("x", ArithOp::Add, 1),
            mod_op("y", ArithOp::Mul, 2),
        ]);
        let inverted = invert_block(&block);
        assert_eq!(
            inverted.statements,
            vec![mod_op("y", ArithOp::Div, 2), mod_op("x", ArithOp::Sub, 1)]
        );
        assert_eq!(invert_block(&inverted), block);
    }

    #[test]
    fn test_enter_exit_duality() {
        let exit = Stmt::Exit {
            value: num(0),
            condition: Expr::VarRef(var("done")),
            token: tok("exit"),
        };
        let entered = invert_statement(&exit);
        assert!(matches!(entered, Stmt::Enter { .. }));
        assert_eq!(invert_statement(&entered), exit);
    }

    #[test]
    fn test_un_unwraps() {
        let inner = mod_op("x", ArithOp::Add, 1);
        let un = Stmt::Un {
            statement: Box::new(inner.clone()),
            token: tok("un"),
        };
        assert_eq!(invert_statement(&un), inner);
    }

    #[test]
    fn test_do_undo_keeps_action_forward() {
        let action = Block::new(vec![mod_op("x", ArithOp::Add, 5)]);
        let yielding = Block::new(vec![mod_op("y", ArithOp::Add, 1)]);
        let stmt = Stmt::DoUndo {
            action: action.clone(),
            yielding: Some(yielding.clone()),
            token: tok("do/undo"),
        };

        match invert_statement(&stmt) {
            Stmt::DoUndo {
                action: inverted_action,
                yielding: inverted_yielding,
                ..
            } => {
                assert_eq!(inverted_action, action);
                assert_eq!(inverted_yielding, Some(invert_block(&yielding)));
            }
            other => panic!("expected do/undo, got {:?}", other),
        }
    }

    #[test]
    fn test_call_toggles_backwards() {
        let call = Stmt::Call(Call {
            name: "f".to_string(),
            backwards: false,
            ref_args: vec![var("x")],
            const_args: vec![num(1)],
            token: tok("f"),
        });
        match invert_statement(&call) {
            Stmt::Call(c) => assert!(c.backwards),
            other => panic!("expected a call, got {:?}", other),
        }
        assert_eq!(invert_statement(&invert_statement(&call)), call);
    }

    #[test]
    fn test_for_loop_swaps_ends() {
        let for_loop = Stmt::ForLoop(ForLoop {
            inc_at_end: false,
            var_dec: VarDec {
                name: "i".to_string(),
                expr: num(0),
                token: tok(":="),
            },
            increment: ModOp {
                place: Place::Var(var("i")),
                op: ArithOp::Add,
                expr: num(1),
                token: tok("+="),
            },
            block: Block::new(vec![mod_op("x", ArithOp::Add, 2)]),
            end_condition: VarCondition {
                name: "i".to_string(),
                expr: num(5),
                token: tok("=="),
            },
            token: tok("for"),
        });

        let inverted = invert_statement(&for_loop);
        match &inverted {
            Stmt::ForLoop(inv) => {
                assert!(inv.inc_at_end);
                assert_eq!(inv.var_dec.expr, num(5));
                assert_eq!(inv.end_condition.expr, num(0));
                assert_eq!(inv.increment.op, ArithOp::Sub);
            }
            other => panic!("expected a for loop, got {:?}", other),
        }
        assert_eq!(invert_statement(&inverted), for_loop);
    }
}
