fn main() {
    if let Err(err) = dataset_profiler::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
