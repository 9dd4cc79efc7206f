use std::{env, process};

use rpal_lang::{rpal, RunMode};

fn main() {
    let args: Vec<String> = env::args().collect();

    let (mode, path) = match args.len() {
        3 if args[1] == "-ast" => (RunMode::PrintAst, &args[2]),
        3 if args[1] == "-st" => (RunMode::PrintSt, &args[2]),
        2 => (RunMode::Run, &args[1]),
        _ => {
            eprintln!("Usage: rpal [-ast|-st] <script>");
            process::exit(64);
        }
    };

    let mut interpreter = rpal::new();
    interpreter.run_file(path, mode);
}
