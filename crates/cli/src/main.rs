//! `vfs-bench` entry point.

#[tokio::main]
async fn main() {
    if let Err(e) = vfs_bench_cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
