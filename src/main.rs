use arrow_lang::error::source_window;
use arrow_lang::{tokenize, Parser, Repl};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: arrow <file>");
        return;
    }

    let filename = &args[1];
    let source = match fs::read_to_string(filename) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Could not read '{}': {}", filename, error);
            process::exit(1);
        }
    };

    // Kept around for the error window.
    let code: Vec<String> = source.lines().map(|line| line.trim_end().to_string()).collect();

    if let Err(error) = run(&source) {
        print!("{}", source_window(&error, filename, &code));
        process::exit(1);
    }
}

fn run(source: &str) -> arrow_lang::error::Result<()> {
    let tokens = tokenize(source)?;
    let program = Parser::new(tokens).program()?;
    Repl::new(program).run()
}
