fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match upkiller_core::runtime::parse_cli_args(&args) {
        Ok(options) => options,
        Err(error) => error.exit(),
    };

    if let Err(error) = upkiller_core::runtime::run_with_options(options) {
        log::error!("runtime failed: {error}");
        eprintln!("[upkiller] runtime failed: {error}");
        std::process::exit(1);
    }
}
