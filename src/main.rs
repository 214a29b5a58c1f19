#[tokio::main]
async fn main() {
    if let Err(e) = catchat_lib::run().await {
        eprintln!("catchat: {}", e);
        std::process::exit(1);
    }
}
