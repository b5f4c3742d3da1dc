//! Command execution.

use schemasmith_core::{
    CatalogBackend, MemorySchema, Operation, Params, Registrar, SchemaGateway, SledBackend,
    Smith, SmithConfig,
};
#[cfg(feature = "postgres")]
use schemasmith_core::PgGateway;
use serde_json::json;
use tracing::info;

use crate::config::{Command, ModuleCommand};
use crate::error::{Error, Result};

/// Open the catalog and the schema gateway named by `config`, then run `command`.
///
/// Returns the text to print on stdout.
pub fn execute(config: SmithConfig, command: Command) -> Result<String> {
    config.validate()?;
    let backend = SledBackend::open(&config.catalog_path)?;
    info!(catalog = %config.catalog_path.display(), "catalog opened");

    match config.database_url.clone() {
        Some(url) => connect_and_run(backend, &url, config, command),
        None => {
            info!("dry run against an in-memory schema");
            let smith = Smith::new(backend, MemorySchema::with_core_tables(), config);
            run_command(smith, command)
        }
    }
}

#[cfg(feature = "postgres")]
fn connect_and_run(
    backend: SledBackend,
    url: &str,
    config: SmithConfig,
    command: Command,
) -> Result<String> {
    let gateway = PgGateway::connect(url).map_err(schemasmith_core::Error::from)?;
    run_command(Smith::new(backend, gateway, config), command)
}

#[cfg(not(feature = "postgres"))]
fn connect_and_run(
    _backend: SledBackend,
    _url: &str,
    _config: SmithConfig,
    _command: Command,
) -> Result<String> {
    Err(Error::Config(
        "built without PostgreSQL support; use --dry-run".to_string(),
    ))
}

/// Run `command` against an engine.
pub fn run_command<B: CatalogBackend, G: SchemaGateway>(
    mut smith: Smith<B, G>,
    command: Command,
) -> Result<String> {
    match command {
        Command::Init => {
            let seeded = smith.seed()?;
            info!(records = seeded, "catalog seeded");
            Ok(json!({ "seeded": seeded }).to_string())
        }
        Command::Module(ModuleCommand::Add {
            name,
            prefix,
            java_package,
            released,
        }) => {
            let module = {
                let mut registrar = Registrar::new(smith.session_mut());
                registrar.register_module(&name, &prefix, &java_package, !released)?
            };
            smith.session_mut().flush()?;
            Ok(json!({ "id": module.id, "name": module.name }).to_string())
        }
        Command::Run { operation, params } => {
            let params: Params = params.into_iter().collect();
            let response = smith.invoke_named(&operation, &params);
            let body = response.to_json()?;
            if response.is_success() {
                Ok(body)
            } else {
                Err(Error::OperationFailed(body))
            }
        }
        Command::Ops => {
            let names: Vec<&str> = Operation::ALL.iter().map(|op| op.name()).collect();
            Ok(names.join("\n"))
        }
        Command::Sql { query } => {
            let result = smith.gateway().query(&query).map_err(schemasmith_core::Error::from)?;
            Ok(serde_json::to_string_pretty(&result.to_json())?)
        }
    }
}
