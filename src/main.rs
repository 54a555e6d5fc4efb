fn main() {
    if let Err(err) = handlermap::cli::run_cli() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
