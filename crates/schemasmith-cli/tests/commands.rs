//! End-to-end CLI command tests over a sled catalog and the in-memory schema.

use schemasmith_cli::{run_command, Command, Error, ModuleCommand};
use schemasmith_core::{MemorySchema, SledBackend, Smith, SmithConfig};
use serde_json::Value;

struct Fixture {
    _dir: tempfile::TempDir,
    db: sled::Db,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        Self { _dir: dir, db }
    }

    fn smith(&self) -> Smith<SledBackend, MemorySchema> {
        Smith::new(
            SledBackend::from_db(self.db.clone()),
            MemorySchema::with_core_tables(),
            SmithConfig::default(),
        )
    }
}

fn run(operation: &str, params: &[(&str, &str)]) -> Command {
    Command::Run {
        operation: operation.to_string(),
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[test]
fn test_init_module_and_create_table() {
    let fx = Fixture::new();

    let seeded: Value =
        serde_json::from_str(&run_command(fx.smith(), Command::Init).unwrap()).unwrap();
    assert!(seeded["seeded"].as_u64().unwrap() > 0);

    let module: Value = serde_json::from_str(
        &run_command(
            fx.smith(),
            Command::Module(ModuleCommand::Add {
                name: "Sales".to_string(),
                prefix: "sal".to_string(),
                java_package: "com.example.sales".to_string(),
                released: false,
            }),
        )
        .unwrap(),
    )
    .unwrap();
    let module_id = module["id"].as_str().unwrap().to_string();

    let out = run_command(
        fx.smith(),
        run("create_table", &[("Name", "orders"), ("ModuleID", module_id.as_str())]),
    )
    .unwrap();
    let response: Value = serde_json::from_str(&out).unwrap();
    assert!(response.get("message").is_some());
    assert!(response.get("error").is_none());
}

#[test]
fn test_failed_operation_returns_error_body() {
    let fx = Fixture::new();
    run_command(fx.smith(), Command::Init).unwrap();

    let err = run_command(fx.smith(), run("create_table", &[("Name", "orders")])).unwrap_err();
    match err {
        Error::OperationFailed(body) => {
            let response: Value = serde_json::from_str(&body).unwrap();
            assert!(response["error"]
                .as_str()
                .unwrap()
                .contains("ModuleID parameter is required"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_sql_needs_live_database() {
    let fx = Fixture::new();
    let err = run_command(
        fx.smith(),
        Command::Sql {
            query: "SELECT 1".to_string(),
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::Core(_)));
}
