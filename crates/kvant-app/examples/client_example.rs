///  To run :
///  cargo r --example client_example
use chrono::Duration;
use kvant_client::{CreateOrderRequest, CreateUserRequest, KvantClient, ListUsersQuery};
use kvant_hex::application::notifications::{LogSink, NotificationQueue};
use kvant_hex::application::password::Passwords;
use kvant_hex::application::token::JwtService;
use kvant_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use kvant_repo::build_repo;
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("kvant.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = build_repo(Some(&db_url)).await?;
    let (notifications, _worker) = NotificationQueue::start(LogSink);
    let jwt = JwtService::new("example-secret", Duration::hours(1));
    let state = AppState::new(repo, Passwords::default(), jwt, notifications);
    let server = HttpServer::new(
        state,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = KvantClient::new(&addr)?;
    let user = client
        .create_user(&CreateUserRequest {
            name: "Example".into(),
            email: "example@example.com".into(),
            age: 33,
            password: "hunter2".into(),
        })
        .await?;
    println!("Registered user id={}", user.id);

    let client = client.login("example@example.com", "hunter2").await?;
    println!("Logged in, token has {} bytes", client.token().unwrap_or_default().len());

    let order = client
        .create_order(
            user.id,
            &CreateOrderRequest {
                product: "Widget".into(),
                quantity: 3,
                price: 4.99,
            },
        )
        .await?;
    println!("Created order id={} at {}", order.id, order.created_at);

    let orders = client.list_orders(user.id).await?;
    println!("User {} has {} order(s)", user.id, orders.len());

    let page = client.list_users(&ListUsersQuery::default()).await?;
    println!("{} user(s) registered", page.total);

    client.delete_user(user.id).await?;
    println!("Deleted user {}", user.id);

    handle.abort();
    Ok(())
}
