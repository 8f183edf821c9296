fn main() {
    match studiolaunch::run_cli() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(studiolaunch::exit_code_for(&e));
        }
    }
}
