fn main() {
    if let Err(err) = quiz_proctor_lib::run() {
        eprintln!("quiz-proctor: {err:#}");
        std::process::exit(1);
    }
}
