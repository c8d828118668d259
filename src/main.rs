fn main() {
    if let Err(err) = retail_load::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
