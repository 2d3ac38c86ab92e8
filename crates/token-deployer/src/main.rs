#[tokio::main]
async fn main() {
    token_deployer::start(std::env::args()).await;
}
