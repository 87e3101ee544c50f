use psatd_rs::{run, Config};
use tracing::error;

fn main() {
    tracing_subscriber::fmt::init();

    let cfg = match Config::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cfg) {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
