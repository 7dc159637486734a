//! The forward/backward driver loop.
//!
//! After each run the main block is replaced by its inversion, so the
//! next prompt executes the program the other way: forwards, backwards,
//! forwards again. A program whose forward run completes should arrive
//! back at its starting state after the backward run.

use crate::ast::Program;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::inverter::invert_function;
use std::io::{self, BufRead, Write};

pub struct Repl {
    program: Program,
    forwards: bool,
}

impl Repl {
    pub fn new(program: Program) -> Self {
        Repl {
            program,
            forwards: true,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn forwards(&self) -> bool {
        self.forwards
    }

    /// Print the main scope as `VAR --> VALUE` lines, in declaration
    /// order.
    pub fn print_state(&self) {
        for (name, value) in &self.program.main_vars {
            println!("{} --> {}", name, value);
        }
    }

    /// Prompt, run, print, flip; EOF on stdin ends the session.
    pub fn run(&mut self) -> Result<()> {
        println!("Starting out... ");
        println!();
        self.print_state();

        let stdin = io::stdin();
        let mut input = String::new();
        loop {
            print!(
                "Going {}... ",
                if self.forwards { "forwards" } else { "backwards" }
            );
            io::stdout().flush().ok();

            input.clear();
            match stdin.lock().read_line(&mut input) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }

            self.step()?;
            self.print_state();
        }

        println!();
        Ok(())
    }

    /// Run the main block once in the current direction, fold the
    /// resulting refs back into the main variables, then invert the main
    /// block in place and flip direction.
    pub fn step(&mut self) -> Result<()> {
        let main = match self.program.main() {
            Some(main) => main.clone(),
            None => return Ok(()),
        };

        let result = Evaluator::new(&self.program).program_eval(&main)?;
        for (name, value) in self.program.main_vars.iter_mut() {
            if let Some(new_value) = result.refs.get(name) {
                *value = new_value.clone();
            }
        }

        self.program
            .functions
            .insert("main".to_string(), invert_function(&main));
        self.forwards = !self.forwards;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Num;
    use crate::parser::Parser;
    use crate::scanner::tokenize;
    use crate::value::Value;

    fn repl(source: &str) -> Repl {
        let tokens = tokenize(source).expect("scan failed");
        Repl::new(Parser::new(tokens).program().expect("parse failed"))
    }

    fn var(repl: &Repl, name: &str) -> Value {
        repl.program()
            .main_vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .expect("missing main var")
    }

    #[test]
    fn test_step_runs_and_flips() {
        let mut repl = repl("main(x := 0){ x += 3 }");
        assert!(repl.forwards());

        repl.step().unwrap();
        assert_eq!(var(&repl, "x"), Value::Num(Num::from(3)));
        assert!(!repl.forwards());

        repl.step().unwrap();
        assert_eq!(var(&repl, "x"), Value::Num(Num::from(0)));
        assert!(repl.forwards());
    }

    #[test]
    fn test_state_persists_between_steps() {
        let mut repl = repl("main(x := 1){ x *= 2 }");
        repl.step().unwrap();
        repl.step().unwrap();
        repl.step().unwrap();
        // forward, backward, forward again: x = 1 * 2 / 2 * 2.
        assert_eq!(var(&repl, "x"), Value::Num(Num::from(2)));
    }
}
