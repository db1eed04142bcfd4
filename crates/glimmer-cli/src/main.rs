//! Entry point for the `glimmer` binary: sets up logging, then delegates
//! argv handling and the exit code to `glimmer_cli::run`.

fn main() {
    glimmer_cli::init_logging();
    let code = glimmer_cli::run(std::env::args());
    std::process::exit(code);
}
