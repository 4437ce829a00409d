use clap::Parser;

fn main() {
    let cli = cartc_drv::Cli::parse();
    if let Err(e) = cartc_drv::run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
