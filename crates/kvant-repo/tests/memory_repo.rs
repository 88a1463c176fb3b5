#![cfg(feature = "memory")]

use kvant_repo::memory::InMemoryRepo;
use kvant_types::domain::order::NewOrder;
use kvant_types::domain::user::{NewUser, UserFilter, UserProfile};
use kvant_types::ports::order_repository::OrderRepository;
use kvant_types::ports::user_repository::UserRepository;
use kvant_types::ports::RepoError;

fn new_user(name: &str, email: &str, age: i32) -> NewUser {
    NewUser {
        profile: UserProfile::new(name.into(), email.into(), age).unwrap(),
        password_hash: "hash".into(),
    }
}

#[tokio::test]
async fn memory_repo_user_crud_flow() {
    let repo = InMemoryRepo::new();

    let created = repo.create(new_user("Test", "test@example.com", 30)).await.unwrap();
    assert!(created.id > 0);

    let fetched = repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Test");
    assert_eq!(fetched.password_hash, "hash");

    let by_email = repo.find_by_email("test@example.com").await.unwrap().unwrap();
    assert_eq!(by_email.id, created.id);

    let mut changed = fetched.clone();
    changed.name = "Renamed".into();
    changed.email = "renamed@example.com".into();
    changed.age = 31;
    let updated = repo.update(changed).await.unwrap().unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.password_hash, "hash");
    assert!(repo.find_by_email("test@example.com").await.unwrap().is_none());
    assert!(repo.find_by_email("renamed@example.com").await.unwrap().is_some());

    assert!(repo.delete(created.id).await.unwrap());
    assert!(repo.get(created.id).await.unwrap().is_none());
    assert!(repo.find_by_email("renamed@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn memory_repo_rejects_duplicate_email() {
    let repo = InMemoryRepo::new();
    let first = repo.create(new_user("A", "a@x.com", 20)).await.unwrap();
    let dup = repo.create(new_user("B", "a@x.com", 40)).await;
    assert!(matches!(dup, Err(RepoError::Conflict(_))));

    let other = repo.create(new_user("C", "c@x.com", 50)).await.unwrap();
    let mut stolen = other.clone();
    stolen.email = first.email.clone();
    let res = repo.update(stolen).await;
    assert!(matches!(res, Err(RepoError::Conflict(_))));
}

#[tokio::test]
async fn memory_repo_paginates_filtered_users_in_insertion_order() {
    let repo = InMemoryRepo::new();
    for i in 0..12 {
        repo.create(new_user(&format!("u{i}"), &format!("u{i}@x.com"), 20 + i))
            .await
            .unwrap();
    }

    let filter = UserFilter {
        page: 2,
        limit: 5,
        ..UserFilter::default()
    };
    let (page, total) = repo.list(&filter).await.unwrap();
    assert_eq!(total, 12);
    let names: Vec<_> = page.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["u5", "u6", "u7", "u8", "u9"]);

    let filter = UserFilter {
        min_age: Some(25),
        max_age: Some(28),
        ..UserFilter::default()
    };
    let (page, total) = repo.list(&filter).await.unwrap();
    assert_eq!(total, 4);
    assert!(page.iter().all(|u| (25..=28).contains(&u.age)));
}

#[tokio::test]
async fn memory_repo_orders_follow_their_user() {
    let repo = InMemoryRepo::new();
    let alice = repo.create(new_user("Alice", "alice@x.com", 30)).await.unwrap();
    let bob = repo.create(new_user("Bob", "bob@x.com", 30)).await.unwrap();

    let first = repo
        .create_order(NewOrder::new(alice.id, "Book".into(), 2, 9.99).unwrap())
        .await
        .unwrap();
    repo.create_order(NewOrder::new(bob.id, "Pen".into(), 1, 1.5).unwrap())
        .await
        .unwrap();
    let second = repo
        .create_order(NewOrder::new(alice.id, "Lamp".into(), 1, 20.0).unwrap())
        .await
        .unwrap();

    let orders = repo.list_by_user(alice.id).await.unwrap();
    assert_eq!(orders, vec![first, second]);

    assert!(repo.delete(alice.id).await.unwrap());
    assert!(repo.list_by_user(alice.id).await.unwrap().is_empty());
    assert_eq!(repo.order_count(), 1);
}

#[tokio::test]
async fn memory_repo_handles_missing_rows() {
    let repo = InMemoryRepo::new();
    assert!(repo.get(404).await.unwrap().is_none());
    assert!(repo.find_by_email("nobody@x.com").await.unwrap().is_none());
    assert!(!repo.delete(404).await.unwrap());

    let ghost = kvant_types::domain::user::User {
        id: 404,
        name: "Ghost".into(),
        email: "ghost@x.com".into(),
        age: 1,
        password_hash: String::new(),
    };
    assert!(repo.update(ghost).await.unwrap().is_none());

    let orphan = repo
        .create_order(NewOrder::new(404, "Book".into(), 1, 1.0).unwrap())
        .await;
    assert!(orphan.is_err());
    assert_eq!(repo.order_count(), 0);
}

#[tokio::test]
async fn memory_repo_far_page_is_empty() {
    let repo = InMemoryRepo::new();
    for i in 0..3 {
        repo.create(new_user(&format!("u{i}"), &format!("u{i}@x.com"), 30))
            .await
            .unwrap();
    }

    // (page - 1) * limit here exceeds i64::MAX.
    let far = UserFilter::new(Some(3_000_000_000), Some(4_000_000_000), None, None).unwrap();
    assert!(far.offset() > i64::MAX as u64);
    let (page, total) = repo.list(&far).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 3);

    let past_end = UserFilter {
        page: 2,
        limit: 3,
        ..UserFilter::default()
    };
    let (page, total) = repo.list(&past_end).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_repo_concurrent_email_changes_keep_one_reservation() {
    let repo = InMemoryRepo::new();
    let user = repo.create(new_user("A", "a0@x.com", 30)).await.unwrap();

    for round in 0..20 {
        let mut tasks = Vec::new();
        for n in 0..6 {
            let repo = repo.clone();
            let mut next = user.clone();
            // n == 0 moves back to the original address.
            next.email = if n == 0 {
                "a0@x.com".to_string()
            } else {
                format!("a{round}-{n}@x.com")
            };
            tasks.push(tokio::spawn(async move { repo.update(next).await }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let current = repo.get(user.id).await.unwrap().unwrap();
        let owner = repo.find_by_email(&current.email).await.unwrap().unwrap();
        assert_eq!(owner.id, user.id);
        for n in 0..6 {
            let email = if n == 0 {
                "a0@x.com".to_string()
            } else {
                format!("a{round}-{n}@x.com")
            };
            if email != current.email {
                assert!(
                    repo.find_by_email(&email).await.unwrap().is_none(),
                    "{email} still reserved"
                );
                // Released addresses are free for others.
                let other = repo.create(new_user("B", &email, 1)).await.unwrap();
                assert!(repo.delete(other.id).await.unwrap());
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_repo_delete_racing_order_creation_leaves_no_orphans() {
    let repo = InMemoryRepo::new();
    for i in 0..50 {
        let user_id = repo
            .create(new_user("U", &format!("u{i}@x.com"), 30))
            .await
            .unwrap()
            .id;

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let repo = repo.clone();
            tasks.push(tokio::spawn(async move {
                let _ = repo
                    .create_order(NewOrder::new(user_id, "Pen".into(), 1, 1.0).unwrap())
                    .await;
            }));
        }
        let deleter = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.delete(user_id).await.unwrap() })
        };
        for t in tasks {
            t.await.unwrap();
        }
        assert!(deleter.await.unwrap());
        assert!(repo.list_by_user(user_id).await.unwrap().is_empty());
    }
    assert_eq!(repo.order_count(), 0);
}
