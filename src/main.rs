#[tokio::main]
async fn main() {
    mytonprovider_node::run().await;
}
