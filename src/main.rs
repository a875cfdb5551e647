use std::process;

fn main() {
    if let Err(err) = gitvault::cli::run() {
        eprintln!("gitvault: {:#}", err);
        process::exit(1);
    }
}
