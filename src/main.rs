fn main() {
    if let Err(err) = merchant_recon::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
