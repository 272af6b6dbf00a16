fn main() {
    if let Err(err) = tabular_probe::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
