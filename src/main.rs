use glesys_provider::{init_logging, serve, GlesysProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(GlesysProvider::new()).await
}
