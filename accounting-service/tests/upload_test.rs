//! Ingestion integration tests.
//!
//! Requires a PostgreSQL database reachable through `TEST_DATABASE_URL`.

mod common;

use common::{spawn_app, xlsx_bytes, JUNE_CSV, MAY_CORRECTED_CSV, MAY_CSV};
use serde_json::Value;

#[tokio::test]
async fn first_upload_inserts_every_row() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let response = app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["rows_inserted"], 3);
    assert_eq!(body["duplicates_skipped"], 0);
    assert_eq!(body["rows_replaced"], 0);
    assert_eq!(body["period_label"], "2024-05");
    assert_eq!(app.record_count(company_id, vault_id).await, 3);
}

#[tokio::test]
async fn reupload_of_same_file_is_idempotent() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    let response = app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["rows_inserted"], 0);
    assert_eq!(body["duplicates_skipped"], 3);
    assert_eq!(app.record_count(company_id, vault_id).await, 3);
}

#[tokio::test]
async fn corrected_file_replaces_the_period() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    let response = app
        .upload_csv(
            company_id,
            vault_id,
            MAY_CORRECTED_CSV,
            "?allow_period_update=true",
        )
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["rows_replaced"], 3);
    assert_eq!(body["rows_inserted"], 3);
    assert_eq!(body["duplicates_skipped"], 0);

    let (_, summary) = app
        .get_json(&app.vault_url(company_id, vault_id, "/summary"))
        .await;
    assert_eq!(summary["totals"]["income"], "350.00");
    assert_eq!(summary["totals"]["records"], 3);
}

#[tokio::test]
async fn period_conflict_is_rejected_without_side_effects() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    let response = app
        .upload_csv(
            company_id,
            vault_id,
            MAY_CORRECTED_CSV,
            "?enforce_period_check=true",
        )
        .await;
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("2024-05"));
    assert_eq!(app.record_count(company_id, vault_id).await, 3);

    let (_, history) = app
        .get_json(&app.vault_url(company_id, vault_id, "/uploads"))
        .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn new_period_passes_the_conflict_gate() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    let response = app
        .upload_csv(company_id, vault_id, JUNE_CSV, "?enforce_period_check=true")
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(app.record_count(company_id, vault_id).await, 5);
}

#[tokio::test]
async fn missing_columns_reject_the_file() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let csv = "fecha,descripcion,monto\n2024-05-01,Venta,10.00\n";
    let response = app.upload_csv(company_id, vault_id, csv, "").await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    let details = body["error"].as_str().unwrap();
    assert!(details.contains("Missing required columns"));
    assert!(details.contains("categoria"));
    assert_eq!(app.record_count(company_id, vault_id).await, 0);
}

#[tokio::test]
async fn bad_row_rejects_the_whole_batch() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let csv = "\
fecha,categoria,subcategoria,descripcion,tipo,monto
2024-05-01,Ventas,Mostrador,Venta 1,ingreso,100.00
2024-05-02,Ventas,Mostrador,Venta 2,ingreso,-5
";
    let response = app.upload_csv(company_id, vault_id, csv, "").await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Row 3"));
    assert_eq!(app.record_count(company_id, vault_id).await, 0);
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let response = app
        .upload_bytes(
            company_id,
            vault_id,
            "movimientos.pdf",
            MAY_CSV.as_bytes().to_vec(),
            "",
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let mut csv = MAY_CSV.to_string();
    while csv.len() <= 256 * 1024 {
        csv.push_str("2024-05-04,Ventas,Mostrador,Relleno,ingreso,1.00\n");
    }
    let response = app.upload_csv(company_id, vault_id, &csv, "").await;
    assert_eq!(response.status(), 413);
    assert_eq!(app.record_count(company_id, vault_id).await, 0);
}

#[tokio::test]
async fn xlsx_upload_is_ingested() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let bytes = xlsx_bytes(
        &["Fecha", "Categoría", "Subcategoría", "Descripción", "Tipo", "Monto"],
        &[
            vec!["2024-05-01", "Ventas", "Mostrador", "Venta 1", "Ingreso", "100"],
            vec!["2024-05-03", "Servicios", "Luz", "Recibo luz", "Egreso", "50.5"],
        ],
    );
    let response = app
        .upload_bytes(company_id, vault_id, "mayo.xlsx", bytes, "")
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["rows_inserted"], 2);

    let (_, page) = app
        .get_json(&app.vault_url(company_id, vault_id, "/records/page?sort=date_asc"))
        .await;
    assert_eq!(page["items"][1]["amount"], "50.50");
    assert_eq!(page["items"][1]["flow_type"], "expense");
}

#[tokio::test]
async fn concurrent_uploads_of_same_file_do_not_duplicate() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let (first, second) = tokio::join!(
        app.upload_csv(company_id, vault_id, MAY_CSV, ""),
        app.upload_csv(company_id, vault_id, MAY_CSV, ""),
    );
    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 200);

    let first: Value = first.json().await.unwrap();
    let second: Value = second.json().await.unwrap();
    let inserted = first["rows_inserted"].as_i64().unwrap() + second["rows_inserted"].as_i64().unwrap();
    assert_eq!(inserted, 3);
    assert_eq!(app.record_count(company_id, vault_id).await, 3);
}

#[tokio::test]
async fn upload_history_lists_batches_newest_first() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    app.upload_csv(company_id, vault_id, JUNE_CSV, "").await;

    let (status, history) = app
        .get_json(&app.vault_url(company_id, vault_id, "/uploads"))
        .await;
    assert_eq!(status, 200);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["period_label"], "2024-06");
    assert_eq!(history[1]["period_label"], "2024-05");
}

#[tokio::test]
async fn resolved_plan_commits_through_the_store() {
    use accounting_service::ingest::{
        normalize, prepare, read_sheet, resolve, IdentityPolicy, IngestOptions, VaultSnapshot,
    };
    use accounting_service::models::{PeriodType, Scope};

    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let sheet = read_sheet("mayo.csv", MAY_CSV.as_bytes()).unwrap();
    let rows = normalize(&sheet).unwrap();
    let batch = prepare(rows, PeriodType::Monthly, &IdentityPolicy::default());
    let plan = resolve(batch, &VaultSnapshot::default(), IngestOptions::default()).unwrap();

    let upload = app
        .db
        .commit_batch(Scope::new(company_id, vault_id), &plan, "mayo.csv")
        .await
        .unwrap();
    assert_eq!(upload.rows_inserted, 3);
    assert_eq!(upload.period_label, "2024-05");
    assert_eq!(app.record_count(company_id, vault_id).await, 3);
}

#[tokio::test]
async fn malformed_upload_flag_is_a_json_bad_request() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    let response = app
        .upload_csv(company_id, vault_id, MAY_CSV, "?allow_period_update=yes")
        .await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("allow_period_update take true or false"));
    assert_eq!(app.record_count(company_id, vault_id).await, 0);
}

#[tokio::test]
async fn failed_commit_leaves_no_partial_state() {
    use accounting_service::ingest::{
        normalize, prepare, read_sheet, resolve, IdentityPolicy, IngestOptions, VaultSnapshot,
    };
    use accounting_service::models::{PeriodType, Scope};

    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;
    let scope = Scope::new(company_id, vault_id);

    let sheet = read_sheet("mayo.csv", MAY_CSV.as_bytes()).unwrap();
    let batch = prepare(normalize(&sheet).unwrap(), PeriodType::Monthly, &IdentityPolicy::default());
    let plan = resolve(batch, &VaultSnapshot::default(), IngestOptions::default()).unwrap();

    app.db.commit_batch(scope, &plan, "mayo.csv").await.unwrap();

    // The plan was resolved against an empty vault, so replaying it collides
    // with the stored fingerprints on the first insert.
    let replay = app.db.commit_batch(scope, &plan, "mayo.csv").await;
    assert!(replay.is_err());

    assert_eq!(app.record_count(company_id, vault_id).await, 3);
    let (_, history) = app
        .get_json(&app.vault_url(company_id, vault_id, "/uploads"))
        .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn period_replace_leaves_other_periods_untouched() {
    let app = spawn_app().await;
    let (company_id, vault_id) = app.create_scope().await;

    app.upload_csv(company_id, vault_id, MAY_CSV, "").await;
    app.upload_csv(company_id, vault_id, JUNE_CSV, "").await;

    let june_records = app.vault_url(company_id, vault_id, "/records?period=2024-06&limit=all");
    let june_summary = app.vault_url(company_id, vault_id, "/summary?period=2024-06");
    let (_, records_before) = app.get_json(&june_records).await;
    let (_, summary_before) = app.get_json(&june_summary).await;

    let response = app
        .upload_csv(
            company_id,
            vault_id,
            MAY_CORRECTED_CSV,
            "?allow_period_update=true",
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["rows_replaced"], 3);
    assert_eq!(body["rows_inserted"], 3);

    let (_, records_after) = app.get_json(&june_records).await;
    let (_, summary_after) = app.get_json(&june_summary).await;
    assert_eq!(summary_after, summary_before);
    assert_eq!(records_after["count"], 2);

    let ids = |body: &Value| -> Vec<String> {
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| format!("{} {}", item["record_id"], item["amount"]))
            .collect()
    };
    assert_eq!(ids(&records_after), ids(&records_before));
    assert_eq!(app.record_count(company_id, vault_id).await, 5);
}
