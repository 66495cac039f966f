//! Record query, pagination and clear integration tests.

mod common;

use common::{spawn_app, JUNE_CSV, MAY_CSV};
use serde_json::Value;
use std::collections::HashSet;

#[tokio::test]
async fn pages_cover_every_record_exactly_once() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    app.upload_csv(company_id, vault_id, JUNE_CSV, "").await;

    let (status, first) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records/page"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(first["total"], 5);
    assert_eq!(first["page_size"], 2);
    assert_eq!(first["total_pages"], 3);

    let mut seen = HashSet::new();
    for page in 1..=3 {
        let (_, body) = app
            .get_json(&app.vault_url(
                company_id,
                vault_id,
                &format!("/records/page?page={}", page),
            ))
            .await;
        for item in body["items"].as_array().unwrap() {
            assert!(seen.insert(item["record_id"].as_str().unwrap().to_string()));
        }
    }
    assert_eq!(seen.len(), 5);

    let (_, beyond) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records/page?page=9"))
        .await;
    assert!(beyond["items"].as_array().unwrap().is_empty());
    assert_eq!(beyond["total"], 5);
}

#[tokio::test]
async fn running_balance_ignores_filters() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;

    let (_, all) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records?sort=date_asc"))
        .await;
    let balances: Vec<&str> = all["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["running_balance"].as_str().unwrap())
        .collect();
    assert_eq!(balances, vec!["100.00", "300.00", "250.00"]);

    let (_, filtered) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records?category=Servicios"))
        .await;
    assert_eq!(filtered["count"], 1);
    assert_eq!(filtered["items"][0]["running_balance"], "250.00");
    assert_eq!(filtered["items"][0]["date"], "2024-05-03");
}

#[tokio::test]
async fn default_order_is_newest_first() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;

    let (_, body) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records?limit=all"))
        .await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["items"][0]["description"], "Recibo luz");
    assert_eq!(body["items"][2]["description"], "Venta 1");

    let (_, by_amount) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records?sort=amount_desc"))
        .await;
    assert_eq!(by_amount["items"][0]["amount"], "200.00");
}

#[tokio::test]
async fn list_limit_defaults_and_caps() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    app.upload_csv(company_id, vault_id, JUNE_CSV, "").await;

    let (_, body) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records"))
        .await;
    assert_eq!(body["count"], 3);

    let (_, body) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records?limit=all"))
        .await;
    assert_eq!(body["count"], 5);

    let (status, _) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records?limit=500"))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn invalid_paging_parameters_are_rejected() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    for query in ["?page=0", "?page=abc", "?page_size=0", "?page_size=101", "?sort=name"] {
        let (status, body) = app
            .get_json(&app.vault_url(
                company_id,
                vault_id,
                &format!("/records/page{}", query),
            ))
            .await;
        assert_eq!(status, 400, "query {}", query);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn filters_narrow_the_selection() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    app.upload_csv(company_id, vault_id, JUNE_CSV, "").await;

    let cases = [
        ("?flow_type=egreso", 2),
        ("?flow_type=transfer", 0),
        ("?period=2024-06", 2),
        ("?year=2024&month=5", 3),
        ("?date=2024-05-02", 1),
        ("?date_from=2024-05-02&date_to=2024-06-10", 3),
        ("?search=venta", 2),
        ("?project=Alfa&account=Banco", 2),
        ("?month=13", 5),
    ];
    for (query, expected) in cases {
        let (status, body) = app
            .get_json(&app.vault_url(
                company_id,
                vault_id,
                &format!("/records/page{}", query),
            ))
            .await;
        assert_eq!(status, 200, "query {}", query);
        assert_eq!(body["total"], expected, "query {}", query);
    }
}

#[tokio::test]
async fn vaults_are_isolated_from_each_other() {
    let app = spawn_app().await;
    let (company_a, vault_a) = app.create_scope().await;
    let (company_b, vault_b) = app.create_scope().await;

    app.upload_csv(company_a, vault_a, MAY_CSV, "").await;
    let response = app.upload_csv(company_b, vault_b, MAY_CSV, "").await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["rows_inserted"], 3);

    app.client
        .delete(app.vault_url(company_a, vault_a, "/records"))
        .send()
        .await
        .unwrap();

    assert_eq!(app.record_count(company_a, vault_a).await, 0);
    assert_eq!(app.record_count(company_b, vault_b).await, 3);

    let (status, _) = app
        .get_json(&app.vault_url(company_a, vault_b, "/records"))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn clear_by_filter_deletes_only_matches() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    app.upload_csv(company_id, vault_id, JUNE_CSV, "").await;

    let response = app
        .client
        .delete(app.vault_url(company_id, vault_id, "/records?period=2024-05"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["deleted_rows"], 3);
    assert_eq!(app.record_count(company_id, vault_id).await, 2);

    let response = app
        .client
        .delete(app.vault_url(company_id, vault_id, "/records?category=Inexistente"))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["deleted_rows"], 0);
    assert_eq!(app.record_count(company_id, vault_id).await, 2);
}

#[tokio::test]
async fn distinct_values_are_sorted_and_unique() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    app.upload_csv(company_id, vault_id, JUNE_CSV, "").await;

    let (status, body) = app
        .get_json(&app.vault_url(company_id, vault_id, "/distinct/categories"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["field"], "category");
    assert_eq!(
        body["values"],
        serde_json::json!(["Consultoria", "Nomina", "Servicios", "Ventas"])
    );

    let (_, body) = app
        .get_json(&app.vault_url(company_id, vault_id, "/distinct/project"))
        .await;
    assert_eq!(body["values"], serde_json::json!(["Alfa"]));

    let (_, body) = app
        .get_json(&app.vault_url(company_id, vault_id, "/distinct/year"))
        .await;
    assert_eq!(body["values"], serde_json::json!(["2024"]));

    let (status, _) = app
        .get_json(&app.vault_url(company_id, vault_id, "/distinct/amount"))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn clear_with_malformed_filter_deletes_nothing() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    app.upload_csv(company_id, vault_id, JUNE_CSV, "").await;

    for query in ["?date=2024-02-30", "?year=20x4", "?period=2024-13", "?flow_type=transfer"] {
        let response = app
            .client
            .delete(app.vault_url(company_id, vault_id, &format!("/records{}", query)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "query {}", query);

        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("nothing was deleted"));
        assert_eq!(app.record_count(company_id, vault_id).await, 5, "query {}", query);
    }
}
