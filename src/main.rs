//! inproc CLI binary
//!
//! All logic is in the library; main.rs only invokes cli::run().

fn main() {
    // cli::run() handles all output, errors included
    if let Err(code) = inproc::cli::run() {
        std::process::exit(code.as_i32());
    }
}
