use std::env;
use std::sync::OnceLock;

use chrono::Utc;
use sqlx::{PgPool, Row};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use course_checkout::db::{EnrollmentStore, PgEnrollmentStore, StoreError};
use course_checkout::models::{EnrollmentStatus, NewEnrollment};

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct TestDb {
    pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

async fn init_test_db() -> TestDb {
    dotenvy::dotenv().ok();
    let url = env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");

    let guard = TEST_DB_LOCK.get_or_init(|| Mutex::new(())).lock().await;
    let pool = PgPool::connect(&url).await.expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    TestDb {
        pool,
        _guard: guard,
    }
}

async fn insert_course(pool: &PgPool) -> Uuid {
    sqlx::query(
        r#"INSERT INTO courses (title, instructor, price, is_published)
           VALUES ($1, 'Instructor', 89000, true)
           RETURNING id"#,
    )
    .bind(format!("course_{}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .expect("insert course")
    .get("id")
}

fn new_enrollment(user_id: Uuid, course_id: Uuid) -> NewEnrollment {
    let suffix = Uuid::new_v4();
    NewEnrollment {
        user_id,
        course_id,
        payment_key: format!("pk_{suffix}"),
        order_id: format!("order_{suffix}"),
        amount: 89000,
        payment_method: Some("card".to_string()),
        approved_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn insert_then_duplicate_is_conflict() {
    let test_db = init_test_db().await;
    let pool = &test_db.pool;
    let store = PgEnrollmentStore::new(pool.clone());
    let course_id = insert_course(pool).await;
    let user_id = Uuid::new_v4();

    let saved = store
        .insert_completed_enrollment(new_enrollment(user_id, course_id))
        .await
        .expect("first insert");
    assert_eq!(saved.status, EnrollmentStatus::Completed);
    assert_eq!(saved.amount, 89000);

    let err = store
        .insert_completed_enrollment(new_enrollment(user_id, course_id))
        .await
        .unwrap_err();
    match err {
        StoreError::Conflict { constraint } => assert_eq!(
            constraint.as_deref(),
            Some("enrollments_user_course_completed_key")
        ),
        other => panic!("expected conflict, got {other}"),
    }

    let found = store
        .find_completed_enrollment(user_id, course_id)
        .await
        .expect("lookup")
        .expect("enrollment present");
    assert_eq!(found.id, saved.id);

    let _ = sqlx::query("DELETE FROM enrollments WHERE course_id = $1")
        .bind(course_id)
        .execute(pool)
        .await;
    let _ = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course_id)
        .execute(pool)
        .await;
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn lessons_come_back_in_order() {
    let test_db = init_test_db().await;
    let pool = &test_db.pool;
    let store = PgEnrollmentStore::new(pool.clone());
    let course_id = insert_course(pool).await;

    for (title, index) in [("second", 2), ("first", 1)] {
        sqlx::query("INSERT INTO lessons (course_id, title, order_index) VALUES ($1, $2, $3)")
            .bind(course_id)
            .bind(title)
            .bind(index)
            .execute(pool)
            .await
            .expect("insert lesson");
    }

    let lessons = store.list_lessons(course_id).await.expect("list lessons");
    let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, ["first", "second"]);
    assert!(store.find_course(course_id).await.expect("course").is_some());

    let _ = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course_id)
        .execute(pool)
        .await;
}
