//! Shared fixtures for integration tests: listing HTML, mock sites, run settings.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use hansard_core::{Database, DatabaseOptions, Settings};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Plain-text sitting report with two distinct statements and one repeat.
pub const SITTING_TEXT: &[u8] = b"Hon. Jane Doe (Nairobi, ODM): I beg to move the Finance Bill, 2025.\n\
Hon. Members: Aye!\n\
Hon. Jane Doe (Nairobi, ODM): I beg to move the Finance Bill, 2025.\n";

/// Builds a single-page Helvetica PDF with one text line per entry.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let mut operations = Vec::new();
    for (row, line) in (0i64..).zip(lines.iter()) {
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), (780 - row * 24).into()]),
            Operation::new("Tj", vec![Object::string_literal(*line)]),
            Operation::new("ET", vec![]),
        ]);
    }
    let content = Content { operations }.encode().expect("content encodes");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf serialises");
    bytes
}

/// Renders a listing page with one table row per `(href, title)`.
pub fn listing_html(rows: &[(&str, &str)], last_page: Option<u32>) -> String {
    let mut body = String::from("<html><body><table>");
    for (href, title) in rows {
        body.push_str(&format!(r#"<tr><td><a href="{href}">{title}</a></td></tr>"#));
    }
    body.push_str("</table>");
    if let Some(last) = last_page {
        body.push_str(&format!(
            r#"<ul class="pager"><li class="pager__item pager__item--last"><a href="/hansard?page={last}">Last</a></li></ul>"#
        ));
    }
    body.push_str("</body></html>");
    body
}

/// Serves `html` as listing page `index` under `/hansard`.
pub async fn mount_listing_page(server: &MockServer, index: u32, html: String) {
    Mock::given(method("GET"))
        .and(path("/hansard"))
        .and(query_param("page", index.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

/// Serves `bytes` at `route`, expecting exactly `hits` requests.
pub async fn mount_document(server: &MockServer, route: &str, bytes: &[u8], hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
        .expect(hits)
        .mount(server)
        .await;
}

/// Settings for a fast run against `server` with everything under `dir`.
pub fn settings(server: &MockServer, dir: &TempDir) -> Settings {
    Settings {
        listing_url: format!("{}/hansard", server.uri()),
        data_dir: dir.path().join("data"),
        database_path: dir.path().join("hansard.db"),
        workers: 2,
        request_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        max_attempts: 1,
        ..Settings::default()
    }
}

/// Creates the database at `db_path` and seeds the MP roster.
pub async fn seed_mps(db_path: &Path, names: &[&str]) {
    let db = Database::new(db_path, &DatabaseOptions::default())
        .await
        .expect("failed to open database");
    for name in names {
        sqlx::query("INSERT INTO mps (name) VALUES (?)")
            .bind(*name)
            .execute(db.pool())
            .await
            .expect("failed to seed MP");
    }
    db.close().await;
}

/// Counts rows in `table` of the database at `db_path`.
pub async fn count_rows(db_path: &Path, table: &str) -> i64 {
    let options = DatabaseOptions {
        run_migrations: false,
        ..DatabaseOptions::default()
    };
    let db = Database::new(db_path, &options)
        .await
        .expect("failed to open database");
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("count query failed");
    db.close().await;
    count
}
