//! Common test utilities for accounting-service integration tests.

#![allow(dead_code)]

use accounting_service::config::{AccountingConfig, DatabaseConfig, LimitsConfig};
use accounting_service::services::Database;
use accounting_service::startup::Application;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,accounting_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn test_config() -> AccountingConfig {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to a disposable PostgreSQL database");

    AccountingConfig {
        common: CommonConfig {
            port: 0,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        },
        service_name: "accounting-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: database_url,
            max_connections: 4,
            min_connections: 1,
        },
        limits: LimitsConfig {
            max_upload_bytes: 256 * 1024,
            default_page_size: 2,
            max_page_size: 100,
            default_list_limit: 3,
            max_list_limit: 100,
        },
    }
}

/// Test application wrapper.
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub db: Database,
}

/// Spawn the service on a random port.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    let app = Application::build(test_config())
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.http_port());
    let db = app.db().clone();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let client = reqwest::Client::new();
    let mut attempts = 0;
    while client
        .get(format!("{}/ready", address))
        .send()
        .await
        .is_err()
    {
        attempts += 1;
        assert!(attempts < 20, "Service did not become ready");
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    TestApp { address, client, db }
}

/// The three-row May ledger used throughout the tests.
pub const MAY_CSV: &str = "\
fecha,categoria,subcategoria,descripcion,tipo,monto
2024-05-01,Ventas,Mostrador,Venta 1,ingreso,100.00
2024-05-02,Ventas,Mostrador,Venta 2,ingreso,200.00
2024-05-03,Servicios,Luz,Recibo luz,egreso,50.00
";

/// Same period as [`MAY_CSV`] with the second sale corrected to 250.00.
pub const MAY_CORRECTED_CSV: &str = "\
fecha,categoria,subcategoria,descripcion,tipo,monto
2024-05-01,Ventas,Mostrador,Venta 1,ingreso,100.00
2024-05-02,Ventas,Mostrador,Venta 2,ingreso,250.00
2024-05-03,Servicios,Luz,Recibo luz,egreso,50.00
";

pub const JUNE_CSV: &str = "\
fecha,categoria,subcategoria,descripcion,tipo,monto,proyecto,cuenta
2024-06-10,Consultoria,Horas,Proyecto A,ingreso,400.00,Alfa,Banco
2024-06-15,Nomina,Sueldos,Pago junio,egreso,300.00,Alfa,Banco
";

/// Build an `.xlsx` workbook with the given header and rows on its first sheet.
pub fn xlsx_bytes(headers: &[&str], rows: &[Vec<&str>]) -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            let cell_row = r as u32 + 1;
            match value.parse::<f64>() {
                Ok(number) => sheet.write_number(cell_row, col as u16, number).unwrap(),
                Err(_) => sheet.write_string(cell_row, col as u16, *value).unwrap(),
            };
        }
    }
    workbook.save_to_buffer().unwrap()
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn vault_url(&self, company_id: Uuid, vault_id: Uuid, suffix: &str) -> String {
        self.url(&format!(
            "/companies/{}/vaults/{}{}",
            company_id, vault_id, suffix
        ))
    }

    pub async fn create_company(&self, name: &str) -> Uuid {
        let response = self
            .client
            .post(self.url("/companies"))
            .json(&json!({ "name": name, "tax_id": "RFC-TEST" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["company_id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn create_vault(&self, company_id: Uuid, period_type: &str) -> Uuid {
        let response = self
            .client
            .post(self.url(&format!("/companies/{}/vaults", company_id)))
            .json(&json!({ "name": "Ejercicio 2024", "period_type": period_type }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["vault_id"].as_str().unwrap().parse().unwrap()
    }

    /// A fresh company with one monthly vault.
    pub async fn create_scope(&self) -> (Uuid, Uuid) {
        let company_id = self.create_company("Comercial Test").await;
        let vault_id = self.create_vault(company_id, "monthly").await;
        (company_id, vault_id)
    }

    pub async fn upload_bytes(
        &self,
        company_id: Uuid,
        vault_id: Uuid,
        filename: &str,
        bytes: Vec<u8>,
        query: &str,
    ) -> reqwest::Response {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_string()));
        self.client
            .post(format!(
                "{}{}",
                self.vault_url(company_id, vault_id, "/uploads"),
                query
            ))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn upload_csv(
        &self,
        company_id: Uuid,
        vault_id: Uuid,
        contents: &str,
        query: &str,
    ) -> reqwest::Response {
        self.upload_bytes(
            company_id,
            vault_id,
            "movimientos.csv",
            contents.as_bytes().to_vec(),
            query,
        )
        .await
    }

    pub async fn get_json(&self, url: &str) -> (u16, Value) {
        let response = self.client.get(url).send().await.unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Number of records currently stored in the vault.
    pub async fn record_count(&self, company_id: Uuid, vault_id: Uuid) -> u64 {
        let (status, body) = self
            .get_json(&self.vault_url(company_id, vault_id, "/records/page?page_size=1"))
            .await;
        assert_eq!(status, 200);
        body["total"].as_u64().unwrap()
    }
}
