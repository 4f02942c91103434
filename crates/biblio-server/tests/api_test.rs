//! HTTP behaviour over in-memory backends

use std::sync::Arc;

use actix_web::{App, test, web};
use biblio_lending::{BOOK_LOCK_KIND, ReadCache};
use biblio_lock::{LockCoordinator, LockOptions, MemorySharedStore, lock_name};
use biblio_persistence::MemoryPersistService;
use biblio_server::model::{AppState, Configuration};
use biblio_server::startup::configure;
use serde_json::{Value, json};

struct Harness {
    state: AppState,
    store: Arc<MemorySharedStore>,
    persistence: Arc<MemoryPersistService>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemorySharedStore::new());
        let persistence = Arc::new(MemoryPersistService::new());
        let locks =
            LockCoordinator::with_options(store.clone(), LockOptions::from_millis(30_000, 100, 10));
        let state = AppState::new(
            Configuration::default(),
            persistence.clone(),
            locks,
            Arc::new(ReadCache::default()),
        );
        Self {
            state,
            store,
            persistence,
        }
    }

    fn data(&self) -> web::Data<AppState> {
        web::Data::new(self.state.clone())
    }
}

macro_rules! init_app {
    ($harness:expr) => {
        test::init_service(App::new().app_data($harness.data()).configure(configure)).await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status().as_u16();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

fn create_book(title: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/books")
        .set_json(json!({"title": title, "author": "Ursula K. Le Guin"}))
}

fn create_user(name: &str, email: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/users")
        .set_json(json!({"name": name, "email": email}))
}

fn borrow(user_id: i64, book_id: i64) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/borrowings/borrow")
        .set_json(json!({"userId": user_id, "bookId": book_id}))
}

fn id_of(body: &Value, key: &str) -> i64 {
    body["data"][key]["id"].as_i64().unwrap()
}

#[actix_web::test]
async fn test_borrow_and_return_round_trip() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (status, body) = send!(app, create_user("Ada", "ada@example.com"));
    assert_eq!(status, 201);
    let ada = id_of(&body, "user");

    let (_, body) = send!(app, create_user("Grace", "grace@example.com"));
    let grace = id_of(&body, "user");

    let (status, body) = send!(app, create_book("The Dispossessed"));
    assert_eq!(status, 201);
    let book = id_of(&body, "book");

    let (status, body) = send!(app, borrow(ada, book));
    assert_eq!(status, 201);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["borrowing"]["bookId"], book);
    assert_eq!(body["data"]["borrowing"]["returned"], false);
    let borrowing = id_of(&body, "borrowing");

    let (status, body) = send!(app, borrow(grace, book));
    assert_eq!(status, 400);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Book is not available for borrowing");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/borrowings/return/{}", borrowing))
            .set_json(json!({"rating": 4}))
    );
    assert_eq!(status, 200);
    assert_eq!(body["data"]["borrowing"]["returned"], true);
    assert_eq!(body["data"]["borrowing"]["rating"], 4.0);
    assert_eq!(body["data"]["book"]["available"], true);
    assert_eq!(body["data"]["book"]["ratingCount"], 1);
    assert_eq!(body["data"]["book"]["averageRating"], 4.0);

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri(&format!("/api/borrowings/return/{}", borrowing))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Book has already been returned");

    let (status, _) = send!(app, borrow(grace, book));
    assert_eq!(status, 201);
}

#[actix_web::test]
async fn test_return_without_body_is_unrated() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (_, body) = send!(app, create_user("Ada", "ada@example.com"));
    let user = id_of(&body, "user");
    let (_, body) = send!(app, create_book("Lathe of Heaven"));
    let book = id_of(&body, "book");
    let (_, body) = send!(app, borrow(user, book));
    let borrowing = id_of(&body, "borrowing");

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri(&format!("/api/borrowings/return/{}", borrowing))
    );
    assert_eq!(status, 200);
    assert!(body["data"]["borrowing"]["rating"].is_null());
    assert_eq!(body["data"]["book"]["ratingCount"], 0);
    assert_eq!(body["data"]["book"]["averageRating"], 0.0);
}

#[actix_web::test]
async fn test_locked_book_returns_conflict() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (_, body) = send!(app, create_user("Ada", "ada@example.com"));
    let user = id_of(&body, "user");
    let (_, body) = send!(app, create_book("Earthsea"));
    let book = id_of(&body, "book");

    // Another instance holds the book
    let other = LockCoordinator::new(harness.store.clone());
    let held = other
        .acquire(
            &lock_name(BOOK_LOCK_KIND, book),
            &LockOptions::from_millis(30_000, 0, 10),
        )
        .await
        .unwrap();
    assert!(held.is_acquired());

    let (status, body) = send!(app, borrow(user, book));
    assert_eq!(status, 409);
    assert_eq!(
        body["message"],
        "Book is currently being processed by another request. Please try again."
    );

    let (_, body) = send!(
        app,
        test::TestRequest::get().uri(&format!("/api/books/{}", book))
    );
    assert_eq!(body["data"]["book"]["available"], true);
}

#[actix_web::test]
async fn test_storage_failure_is_hidden() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (_, body) = send!(app, create_user("Ada", "ada@example.com"));
    let user = id_of(&body, "user");
    let (_, body) = send!(app, create_book("Always Coming Home"));
    let book = id_of(&body, "book");

    harness.persistence.set_commit_failure(true);

    let (status, body) = send!(app, borrow(user, book));
    assert_eq!(status, 500);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Internal server error");
    assert!(!body.to_string().contains("memory backend"));

    // The lock was released despite the failure
    harness.persistence.set_commit_failure(false);
    let (status, _) = send!(app, borrow(user, book));
    assert_eq!(status, 201);
}

#[actix_web::test]
async fn test_not_found_mapping() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (_, body) = send!(app, create_book("Four Ways to Forgiveness"));
    let book = id_of(&body, "book");

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/books/999"));
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Book not found");

    let (status, body) = send!(app, borrow(42, book));
    assert_eq!(status, 404);
    assert_eq!(body["message"], "User not found");

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/borrowings/return/77")
    );
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Borrowing record not found");

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/users/5"));
    assert_eq!(status, 404);

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/nowhere"));
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Route not found");
}

#[actix_web::test]
async fn test_validation_failures() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (status, body) = send!(app, create_book("   "));
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Title is required");

    let (status, body) = send!(app, create_user("Ada", "not-an-email"));
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Valid email is required");

    let (status, body) = send!(app, borrow(1, 0));
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Valid book ID is required");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/borrowings/borrow")
            .set_json(json!({"userId": 1}))
    );
    assert_eq!(status, 400);
    assert_eq!(body["status"], "error");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/borrowings/return/1")
            .set_json(json!({"rating": 6}))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Rating must be between 1 and 5");

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/books/abc"));
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Valid ID is required");
}

#[actix_web::test]
async fn test_duplicate_email_rejected() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (status, _) = send!(app, create_user("Ada", "ada@example.com"));
    assert_eq!(status, 201);

    let (status, body) = send!(app, create_user("Ada Again", "ada@example.com"));
    assert_eq!(status, 400);
    assert_eq!(body["message"], "User with this email already exists");
}

#[actix_web::test]
async fn test_reads_report_source_and_admin_clears() {
    let harness = Harness::new();
    let app = init_app!(harness);

    send!(app, create_book("The Word for World Is Forest"));

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/books"));
    assert_eq!(status, 200);
    assert_eq!(body["data"]["source"], "database");
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 1);

    let (_, body) = send!(app, test::TestRequest::get().uri("/api/books"));
    assert_eq!(body["data"]["source"], "cache");

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/admin/cache/clear-all")
    );
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"status": "success", "message": "All caches cleared"})
    );

    let (_, body) = send!(app, test::TestRequest::get().uri("/api/books"));
    assert_eq!(body["data"]["source"], "database");

    let (_, body) = send!(
        app,
        test::TestRequest::post().uri("/api/admin/cache/clear-books")
    );
    assert_eq!(body["message"], "Book caches cleared");

    let (_, body) = send!(
        app,
        test::TestRequest::post().uri("/api/admin/cache/clear-users")
    );
    assert_eq!(body["message"], "User caches cleared");
}

#[actix_web::test]
async fn test_user_detail_splits_borrowings() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (_, body) = send!(app, create_user("Ada", "ada@example.com"));
    let user = id_of(&body, "user");
    let (_, body) = send!(app, create_book("Tehanu"));
    let first = id_of(&body, "book");
    let (_, body) = send!(app, create_book("Tales from Earthsea"));
    let second = id_of(&body, "book");

    let (_, body) = send!(app, borrow(user, first));
    let borrowing = id_of(&body, "borrowing");
    send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/borrowings/return/{}", borrowing))
            .set_json(json!({"rating": 5}))
    );
    send!(app, borrow(user, second));

    let (status, body) = send!(
        app,
        test::TestRequest::get().uri(&format!("/api/users/{}", user))
    );
    assert_eq!(status, 200);
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");
    assert_eq!(body["data"]["source"], "database");

    let current = body["data"]["currentBorrowings"].as_array().unwrap();
    let past = body["data"]["pastBorrowings"].as_array().unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0]["title"], "Tales from Earthsea");
    assert_eq!(past.len(), 1);
    assert_eq!(past[0]["rating"], 5.0);
}

#[actix_web::test]
async fn test_health_reports_components() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let (status, body) = send!(app, test::TestRequest::get().uri("/health"));
    assert_eq!(status, 200);
    assert_eq!(body["data"]["service"], "biblio");
    assert_eq!(body["data"]["storage"], "memory");
    assert_eq!(body["data"]["sharedStore"], "connected");
    assert_eq!(body["data"]["database"], "connected");
    assert!(body["data"]["timestamp"].is_string());
}
