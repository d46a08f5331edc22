mod common;

use common::{constraints, filter, sqlite_engine};
use serde_json::{json, Value};
use sqlsieve_core::{ConstraintSpec, Filter, Page, QueryError, Sort};

const USERS: &str = "
    CREATE TABLE user (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        name TEXT,
        age INTEGER,
        meta TEXT,
        deleted INTEGER NOT NULL DEFAULT 0
    )";

const MEMBERS: &str = "
    CREATE TABLE member (
        tenant_id INTEGER NOT NULL,
        slug TEXT NOT NULL,
        email TEXT NOT NULL,
        role TEXT,
        UNIQUE (tenant_id, slug),
        UNIQUE (email)
    )";

fn people(n: usize) -> Value {
    Value::Array(
        (1..=n)
            .map(|i| json!({"email": format!("u{i}@x.io"), "name": format!("user {i}"), "age": i}))
            .collect(),
    )
}

#[tokio::test]
async fn single_insert_returns_generated_id() {
    let engine = sqlite_engine(USERS).await;
    let result = engine
        .insert("user", &json!({"email": "a@x.io", "name": "A"}), &ConstraintSpec::none())
        .await
        .unwrap();
    assert_eq!(result.rows, 1);
    assert_eq!(result.message, "1 User is saved");
    assert_eq!(result.id, Some(json!(1)));
}

#[tokio::test]
async fn upserting_twice_keeps_one_row() {
    let engine = sqlite_engine(MEMBERS).await;
    let spec = constraints(json!([["tenant_id", "slug"]]));
    let first = json!({"tenant_id": 1, "slug": "ann", "email": "ann@x.io", "role": "viewer"});
    let second = json!({"tenant_id": 1, "slug": "ann", "email": "ann@x.io", "role": "admin"});

    engine.upsert("member", &first, &spec).await.unwrap();
    let result = engine.upsert("member", &second, &spec).await.unwrap();
    assert_eq!(result.rows, 1);

    let all = engine
        .get("member", &Filter::all(), &Sort::none(), None)
        .await
        .unwrap();
    assert_eq!(all.count, 1);
    assert_eq!(all.data[0]["role"], json!("admin"));
}

#[tokio::test]
async fn every_declared_constraint_resolves_conflicts() {
    let engine = sqlite_engine(MEMBERS).await;
    let spec = constraints(json!([["tenant_id", "slug"], "email"]));
    engine
        .upsert(
            "member",
            &json!({"tenant_id": 1, "slug": "ann", "email": "ann@x.io", "role": "viewer"}),
            &spec,
        )
        .await
        .unwrap();
    // Same email, different slug: only the email constraint fires.
    engine
        .upsert(
            "member",
            &json!([
                {"tenant_id": 1, "slug": "annie", "email": "ann@x.io", "role": "owner"},
                {"tenant_id": 2, "slug": "bob", "email": "bob@x.io", "role": "viewer"}
            ]),
            &spec,
        )
        .await
        .unwrap();

    let all = engine
        .get("member", &Filter::all(), &Sort::parse(&["email"]), None)
        .await
        .unwrap();
    assert_eq!(all.count, 2);
    assert_eq!(all.data[0]["email"], json!("ann@x.io"));
    assert_eq!(all.data[0]["role"], json!("owner"));
    // Constraint columns are not overwritten.
    assert_eq!(all.data[0]["slug"], json!("ann"));
}

#[tokio::test]
async fn duplicate_insert_surfaces_the_constraint_violation() {
    let engine = sqlite_engine(USERS).await;
    engine.insert("user", &people(3), &ConstraintSpec::none()).await.unwrap();
    let err = engine
        .insert("user", &json!({"email": "u1@x.io", "age": 5}), &constraints(json!(["email"])))
        .await
        .unwrap_err();
    assert!(err.is_engine());
    assert!(err.to_string().contains("UNIQUE constraint failed"), "{err}");
    assert_eq!(engine.count("user", &Filter::all(), None).await.unwrap(), 3);
}

#[tokio::test]
async fn list_pages_are_zero_based() {
    let engine = sqlite_engine(USERS).await;
    engine.insert("user", &people(45), &ConstraintSpec::none()).await.unwrap();

    let page = engine
        .list("user", &Filter::all(), &Sort::parse(&["age"]), None, Page::new(2, 10))
        .await
        .unwrap();
    let ages: Vec<i64> = page.data.iter().filter_map(|row| row["age"].as_i64()).collect();
    assert_eq!(ages, (21..=30).collect::<Vec<_>>());
    assert_eq!(page.count, 45);
}

#[tokio::test]
async fn filters_select_matching_rows() {
    let engine = sqlite_engine(USERS).await;
    engine.insert("user", &people(10), &ConstraintSpec::none()).await.unwrap();

    let result = engine
        .get(
            "user",
            &filter(json!([
                [["age", ">=", 9]],
                [["email", "in", ["u1@x.io", "u2@x.io"]], ["name", "like", "%1"]]
            ])),
            &Sort::parse(&["-age"]),
            None,
        )
        .await
        .unwrap();
    let ages: Vec<i64> = result.data.iter().filter_map(|row| row["age"].as_i64()).collect();
    assert_eq!(ages, vec![10, 9, 1]);
    assert_eq!(result.count, 3);
}

#[tokio::test]
async fn remove_requires_a_filter() {
    let engine = sqlite_engine(USERS).await;
    engine.insert("user", &people(6), &ConstraintSpec::none()).await.unwrap();

    let err = engine
        .remove("user", &filter(json!([])), None)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::NoFilterForDelete));
    assert_eq!(err.to_string(), "unable to remove as there is no filter attributes");

    let removed = engine
        .remove("user", &filter(json!([[["id", "=", 5]]])), None)
        .await
        .unwrap();
    assert_eq!(removed.rows, 1);
    assert_eq!(removed.message, "1 user removed");

    let removed = engine
        .remove("user", &filter(json!([[["id", "in", [1, 2]]]])), None)
        .await
        .unwrap();
    assert_eq!(removed.message, "2 users removed");
    assert_eq!(engine.count("user", &Filter::all(), None).await.unwrap(), 3);
}

#[tokio::test]
async fn soft_deleted_rows_are_hidden() {
    let engine = sqlite_engine(USERS).await;
    engine.insert("user", &people(4), &ConstraintSpec::none()).await.unwrap();

    let removed = engine
        .remove("user", &filter(json!([[["age", "<=", 2]]])), Some("deleted"))
        .await
        .unwrap();
    assert_eq!(removed.rows, 2);

    let visible = engine
        .get("user", &Filter::all(), &Sort::none(), Some("deleted"))
        .await
        .unwrap();
    assert_eq!(visible.count, 2);
    // Every OR-branch is guarded.
    let either = engine
        .get(
            "user",
            &filter(json!([[["age", "=", 1]], [["age", "=", 3]]])),
            &Sort::none(),
            Some("deleted"),
        )
        .await
        .unwrap();
    assert_eq!(either.data.len(), 1);
    assert_eq!(either.data[0]["age"], json!(3));
    assert_eq!(engine.count("user", &Filter::all(), None).await.unwrap(), 4);
}

#[tokio::test]
async fn json_text_comes_back_structured() {
    let engine = sqlite_engine(USERS).await;
    engine
        .insert(
            "user",
            &json!({"email": "a@x.io", "meta": {"tags": ["x"], "level": 2}}),
            &ConstraintSpec::none(),
        )
        .await
        .unwrap();
    let rows = engine.query("SELECT meta FROM user WHERE email = ?1", &[json!("a@x.io")]).await.unwrap();
    assert_eq!(rows[0]["meta"], json!({"tags": ["x"], "level": 2}));
}

#[tokio::test]
async fn driver_errors_surface_verbatim() {
    let engine = sqlite_engine(USERS).await;
    let err = engine
        .insert("user", &json!({"nope": 1}), &ConstraintSpec::none())
        .await
        .unwrap_err();
    assert!(err.is_engine());
    assert!(err.to_string().contains("nope"), "{err}");
}
