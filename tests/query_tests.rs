// tests/query_tests.rs
use encrypted_columns::error::Error;
use encrypted_columns::{
    ColumnRegistry, Dataset, DecodedRow, EncryptedColumn, PageRequest, Paged, SearchRequest, Table,
};
use rusqlite::Connection;
use sea_query::{Expr, ExprTrait, Order, Value};

mod support;
use support::{create_users_table, mem_conn, test_cipher, user, User};

fn seeded(conn: &Connection, registry: &ColumnRegistry, users: &[User]) {
    create_users_table(conn);
    let ds = Dataset::new(conn, registry);
    for u in users {
        ds.insert(u).unwrap();
    }
}

fn numbered_users(n: i64) -> Vec<User> {
    (1..=n)
        .map(|i| User {
            id: i,
            full_name: Some(format!("user {i:02}")),
            company_name: None,
        })
        .collect()
}

fn ids(rows: &[User]) -> Vec<i64> {
    rows.iter().map(|u| u.id).collect()
}

#[test]
fn test_pagination_requires_ordered_query() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    let windowed = ds.select::<User>().page(&PageRequest::new(5u64, None));
    assert!(matches!(windowed, Err(Error::Validation(_))));

    // Checked before the no-op shortcut
    let noop = ds.select::<User>().page(&PageRequest::default());
    assert!(matches!(noop, Err(Error::Validation(_))));

    let paged = ds
        .select::<User>()
        .fetch_paged(&ds, &PageRequest::new(5u64, None));
    assert!(matches!(paged, Err(Error::Validation(_))));
}

#[test]
fn test_pagination_noop_returns_everything() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    let rows = ds
        .select::<User>()
        .order_by("id", Order::Asc)
        .page(&PageRequest::default())
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert_eq!(ids(&rows), (1i64..=10).collect::<Vec<_>>());
}

#[test]
fn test_pagination_offset_only_skips() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    let rows = ds
        .select::<User>()
        .order_by("id", Order::Asc)
        .page(&PageRequest::new(None, 3u64))
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert_eq!(ids(&rows), (4i64..=10).collect::<Vec<_>>());
}

#[test]
fn test_pagination_limit_only_takes() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    let rows = ds
        .select::<User>()
        .order_by("id", Order::Asc)
        .page(&PageRequest::new(4u64, None))
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert_eq!(ids(&rows), vec![1, 2, 3, 4]);
}

#[test]
fn test_pagination_limit_and_offset() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    let rows = ds
        .select::<User>()
        .order_by("id", Order::Asc)
        .page(&PageRequest::new(4u64, 3u64))
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert_eq!(ids(&rows), vec![4, 5, 6, 7]);
}

#[test]
fn test_fetch_paged_reports_counts() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    let page = ds
        .select::<User>()
        .order_by("id", Order::Asc)
        .fetch_paged(&ds, &PageRequest::new(4u64, 8u64))
        .unwrap();

    // Window runs past the end: short page, full total
    assert_eq!(ids(&page.items), vec![9, 10]);
    assert_eq!(page.total_items, 10);
    assert_eq!(page.items_quantity, 2);
    assert_eq!(page.items_offset, 8);
}

#[test]
fn test_fetch_paged_with_total_leaves_window_alone() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    let request = PageRequest::new(4u64, 2u64);
    let windowed = ds
        .select::<User>()
        .order_by("id", Order::Asc)
        .page(&request)
        .unwrap();

    let page = windowed
        .fetch_paged_with_total(&ds, &request, 1234)
        .unwrap();

    assert_eq!(ids(&page.items), vec![3, 4, 5, 6]);
    assert_eq!(page.total_items, 1234);
    assert_eq!(page.items_quantity, 4);
    assert_eq!(page.items_offset, 2);
}

#[test]
fn test_fetch_paged_decrypts_registered_columns() {
    let conn = mem_conn();
    let mut registry = ColumnRegistry::new();
    registry
        .register(EncryptedColumn::new("users", "full_name", test_cipher()))
        .unwrap();
    seeded(&conn, &registry, &numbered_users(3));
    let ds = Dataset::new(&conn, &registry);

    let page = ds
        .select::<User>()
        .order_by("id", Order::Asc)
        .fetch_paged(&ds, &PageRequest::new(2u64, None))
        .unwrap();

    assert_eq!(page.total_items, 3);
    assert_eq!(page.items[0].full_name.as_deref(), Some("user 01"));
    assert_eq!(page.items[1].full_name.as_deref(), Some("user 02"));
}

#[test]
fn test_search_without_columns_errors() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(3));
    let ds = Dataset::new(&conn, &registry);

    let searched = ds.select::<User>().search(&SearchRequest::new("x"), &[]);
    assert!(matches!(searched, Err(Error::Validation(_))));

    // Column check comes before the empty-needle shortcut
    let searched = ds.select::<User>().search(&SearchRequest::default(), &[]);
    assert!(matches!(searched, Err(Error::Validation(_))));
}

#[test]
fn test_search_empty_needle_is_noop() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    for request in [
        SearchRequest::default(),
        SearchRequest::new(""),
        SearchRequest::new("   "),
    ] {
        let rows = ds
            .select::<User>()
            .search(&request, &["full_name"])
            .unwrap()
            .fetch_all(&ds)
            .unwrap();
        assert_eq!(rows.len(), 10);
    }
}

#[test]
fn test_search_single_column_case_insensitive_trimmed() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(
        &conn,
        &registry,
        &[
            user(1, Some("ab"), None),
            user(2, Some("Ab"), None),
            user(3, Some("aBcd"), None),
            user(4, Some("test cABInet!"), None),
            user(5, Some("a b"), None),
            user(6, Some("Acb"), None),
            user(7, Some(""), None),
            user(8, Some("aPricos"), None),
            user(9, None, None),
        ],
    );
    let ds = Dataset::new(&conn, &registry);

    let found = ds
        .select::<User>()
        .search(&SearchRequest::new(" Ab  "), &["full_name"])
        .unwrap()
        .order_by("id", Order::Asc)
        .fetch_all(&ds)
        .unwrap();

    assert_eq!(ids(&found), vec![1, 2, 3, 4]);
}

#[test]
fn test_search_two_columns_either_side_matches() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(
        &conn,
        &registry,
        &[
            user(1, Some("Woodpicker"), None),
            user(2, Some("Woodpicker"), None),
            user(3, Some("Donuld Wood"), Some("Wood Inc.")),
            user(4, Some(" woodside street "), Some("Nothing Company")),
            user(5, Some("Some guy"), Some("Wood Inc.")),
            user(6, None, Some("Some wood Inc.")),
            user(7, None, None),
            user(8, Some("Some guy"), None),
            user(9, None, None),
            user(10, None, Some("Nothing Company")),
            user(11, Some("Some super guy"), Some("Nothing Company")),
        ],
    );
    let ds = Dataset::new(&conn, &registry);

    for columns in [
        &["full_name", "company_name"][..],
        &["company_name", "full_name"][..],
    ] {
        let found = ds
            .select::<User>()
            .search(&SearchRequest::new("Wood"), columns)
            .unwrap()
            .order_by("id", Order::Asc)
            .fetch_all(&ds)
            .unwrap();
        assert_eq!(ids(&found), vec![1, 2, 3, 4, 5, 6]);
    }
}

#[test]
fn test_search_never_matches_across_columns() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &[user(1, Some("a"), Some("b"))]);
    let ds = Dataset::new(&conn, &registry);

    let across = ds
        .select::<User>()
        .search(
            &SearchRequest::new("ab"),
            &["full_name", "company_name"],
        )
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert!(across.is_empty());

    // The delimiter itself can be matched on purpose
    let with_delimiter = ds
        .select::<User>()
        .search(
            &SearchRequest::new("a b"),
            &["full_name", "company_name"],
        )
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert_eq!(ids(&with_delimiter), vec![1]);
}

#[test]
fn test_search_treats_wildcards_literally() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(
        &conn,
        &registry,
        &[
            user(1, Some("100% wool"), None),
            user(2, Some("100x wool"), None),
            user(3, Some("a_c"), None),
            user(4, Some("abc"), None),
            user(5, Some("50\\50"), None),
        ],
    );
    let ds = Dataset::new(&conn, &registry);

    let percent = ds
        .select::<User>()
        .search(&SearchRequest::new("100%"), &["full_name"])
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert_eq!(ids(&percent), vec![1]);

    let underscore = ds
        .select::<User>()
        .search(&SearchRequest::new("a_c"), &["full_name"])
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert_eq!(ids(&underscore), vec![3]);

    let backslash = ds
        .select::<User>()
        .search(&SearchRequest::new("50\\50"), &["full_name"])
        .unwrap()
        .fetch_all(&ds)
        .unwrap();
    assert_eq!(ids(&backslash), vec![5]);
}

#[test]
fn test_count_and_fetch_one() {
    let conn = mem_conn();
    let registry = ColumnRegistry::new();
    seeded(&conn, &registry, &numbered_users(10));
    let ds = Dataset::new(&conn, &registry);

    assert_eq!(ds.select::<User>().count(&ds).unwrap(), 10);
    assert_eq!(
        ds.select::<User>()
            .filter(Expr::col("id").gt(7i64))
            .count(&ds)
            .unwrap(),
        3
    );

    let last = ds
        .select::<User>()
        .order_by("id", Order::Desc)
        .fetch_one(&ds)
        .unwrap();
    assert_eq!(last.map(|u| u.id), Some(10));

    let none = ds
        .select::<User>()
        .filter(Expr::col("id").gt(100i64))
        .order_by("id", Order::Asc)
        .fetch_one(&ds)
        .unwrap();
    assert!(none.is_none());
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Employee {
    id: i64,
    name: String,
    company_id: Option<i64>,
}

impl Table for Employee {
    const TABLE: &'static str = "employees";
    const COLUMNS: &'static [&'static str] = &["id", "name", "company_id"];

    fn from_row(row: &DecodedRow) -> encrypted_columns::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            company_id: row.get("company_id")?,
        })
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("name", self.name.clone().into()),
            ("company_id", self.company_id.into()),
        ]
    }
}

fn seed_employees(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE employees (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            company_id INTEGER
        );
        CREATE TABLE companies (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );
        INSERT INTO companies (id, name) VALUES (1, 'Acme'), (2, 'Globex');
        INSERT INTO employees (id, name, company_id) VALUES
            (1, 'first', 1),
            (2, 'second', NULL),
            (3, 'third', 2);",
    )
    .expect("seed employees");
}

#[test]
fn test_select_value_or_defaults_missing_join_rows() {
    let conn = mem_conn();
    seed_employees(&conn);
    let registry = ColumnRegistry::new();
    let ds = Dataset::new(&conn, &registry);

    let names: Vec<String> = ds
        .select::<Employee>()
        .left_join(
            "companies",
            Expr::col(("employees", "company_id")).eq(Expr::col(("companies", "id"))),
        )
        .order_by(("employees", "id"), Order::Asc)
        .select_value_or(("companies", "name"), "missing")
        .fetch_values(&ds)
        .unwrap();

    assert_eq!(names, ["Acme", "missing", "Globex"]);
}

#[test]
fn test_project_keeps_nulls_without_default() {
    let conn = mem_conn();
    seed_employees(&conn);
    let registry = ColumnRegistry::new();
    let ds = Dataset::new(&conn, &registry);

    let names: Vec<Option<String>> = ds
        .select::<Employee>()
        .left_join(
            "companies",
            Expr::col(("employees", "company_id")).eq(Expr::col(("companies", "id"))),
        )
        .order_by(("employees", "id"), Order::Asc)
        .project(Expr::col(("companies", "name")))
        .fetch_values(&ds)
        .unwrap();

    assert_eq!(
        names,
        [Some("Acme".to_string()), None, Some("Globex".to_string())]
    );
}

#[test]
fn test_requests_round_trip_through_serde() {
    let request: PageRequest = serde_json::from_str(r#"{"limit": 10, "offset": 20}"#).unwrap();
    assert_eq!(request, PageRequest::new(10u64, 20u64));

    let absent: PageRequest = serde_json::from_str("{}").unwrap();
    assert!(absent.is_noop());

    let search: SearchRequest = serde_json::from_str(r#"{"query": " Ab "}"#).unwrap();
    assert_eq!(search.needle().as_deref(), Some("ab"));

    let paged = Paged {
        total_items: 3,
        items_quantity: 2,
        items_offset: 1,
        items: vec!["a".to_string(), "b".to_string()],
    };
    let json = serde_json::to_value(&paged).unwrap();
    assert_eq!(json["total_items"], 3);
    assert_eq!(json["items_offset"], 1);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
}
