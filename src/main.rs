fn main() {
    if let Err(err) = screenmind_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
