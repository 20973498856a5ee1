use std::{env, process::ExitCode, time::Instant};

use vesper::Engine;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.js" };

    let mut engine = Engine::new();
    let start = Instant::now();
    match engine.eval_file(file_path) {
        Ok(value) => {
            let elapsed = start.elapsed();
            eprintln!("success after: {elapsed:?}");
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let elapsed = start.elapsed();
            eprintln!("error after: {elapsed:?}\n{err}");
            ExitCode::FAILURE
        }
    }
}
