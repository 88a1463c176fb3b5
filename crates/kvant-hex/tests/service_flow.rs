use async_trait::async_trait;
use kvant_hex::application::auth_service::AuthService;
use kvant_hex::application::notifications::{Notification, NotificationQueue, NotificationSink};
use kvant_hex::application::order_service::OrderService;
use kvant_hex::application::password::Passwords;
use kvant_hex::application::token::JwtService;
use kvant_hex::application::user_service::UserService;
use kvant_hex::errors::AppError;
use kvant_repo::build_repo;
use kvant_types::domain::user::UserFilter;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Notification>>>);

#[async_trait]
impl NotificationSink for Recorder {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(notification);
        Ok(())
    }
}

#[tokio::test]
async fn register_login_order_and_cascade() {
    let repo = build_repo(None).await.expect("build repo");
    let sink = Recorder::default();
    let (queue, worker) = NotificationQueue::start(sink.clone());
    let jwt = JwtService::new("flow-secret", chrono::Duration::hours(1));

    let users = UserService::new(repo.clone(), Passwords::insecure_fast(), queue.clone());
    let orders = OrderService::new(repo.clone(), repo.clone(), queue.clone());
    let auth = AuthService::new(repo.clone(), Passwords::insecure_fast(), jwt.clone());

    let alice = users
        .create_user("Alice".into(), "alice@example.com".into(), 30, "pw1".into())
        .await
        .unwrap();
    assert_ne!(alice.password_hash, "pw1");

    let token = auth
        .login("alice@example.com", "pw1".into())
        .await
        .unwrap();
    assert_eq!(jwt.verify(&token).unwrap().user_id, alice.id);

    let book = orders
        .create_order(alice.id, "Book".into(), 2, 10.5)
        .await
        .unwrap();
    assert_eq!(book.user_id, alice.id);
    let listed = orders.list_orders(alice.id).await.unwrap();
    assert_eq!(listed, vec![book.clone()]);

    let (page, total) = users.list_users(UserFilter::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].email, "alice@example.com");

    users.delete_user(alice.id).await.unwrap();
    assert!(matches!(
        orders.list_orders(alice.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        auth.login("alice@example.com", "pw1".into()).await,
        Err(AppError::Unauthorized(_))
    ));

    drop((users, orders, auth));
    drop(queue);
    worker.await.unwrap();

    let seen = sink.0.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].kind(), "welcome");
    assert_eq!(
        seen[1],
        Notification::OrderCreated {
            user_id: alice.id,
            order_id: book.id,
            product: "Book".into(),
        }
    );
}

#[tokio::test]
async fn validation_failures_leave_no_trace() {
    let repo = build_repo(None).await.expect("build repo");
    let sink = Recorder::default();
    let (queue, worker) = NotificationQueue::start(sink.clone());
    let users = UserService::new(repo.clone(), Passwords::insecure_fast(), queue.clone());
    let orders = OrderService::new(repo.clone(), repo.clone(), queue.clone());

    for (name, email, age, pw) in [
        ("", "a@x.com", 1, "pw"),
        ("A", "no-at-sign", 1, "pw"),
        ("A", "a@x.com", -1, "pw"),
        ("A", "a@x.com", 1, ""),
    ] {
        let err = users
            .create_user(name.into(), email.into(), age, pw.into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "{name}/{email}/{age}");
    }

    let bob = users
        .create_user("Bob".into(), "bob@x.com".into(), 40, "pw".into())
        .await
        .unwrap();
    for (qty, price) in [(0, 1.0), (1, -1.0), (1, f64::NAN)] {
        let err = orders
            .create_order(bob.id, "Pen".into(), qty, price)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
    assert!(orders.list_orders(bob.id).await.unwrap().is_empty());

    drop((users, orders));
    drop(queue);
    worker.await.unwrap();
    assert_eq!(sink.0.lock().unwrap().len(), 1);
}
