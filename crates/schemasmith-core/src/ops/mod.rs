//! Externally invoked operations.
//!
//! Every operation takes a flat string map of parameters and answers with a
//! flat string map holding exactly one of `message` or `error`. Operations
//! follow one saga: validate inputs, resolve context and stage catalog
//! descriptors, apply DDL, then commit the staged descriptors. A DDL failure
//! discards the staged descriptors; a commit failure after DDL is reported as
//! [`Error::PartialFailure`].

mod columns;
mod state;
mod tables;
mod ui;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{bootstrap, CatalogBackend, CatalogSession};
use crate::config::SmithConfig;
use crate::ddl::{DdlExecutor, DdlStatement, ExecutionReport, SchemaGateway};
use crate::error::{Error, Result};
use crate::messages::{DefaultMessages, MessageCatalog};
use crate::naming::{IdentifierSynthesizer, MAX_IDENTIFIER_LENGTH};
use crate::text::non_blank;
use crate::types::TypeResolver;

pub use state::{InvalidTransition, OperationPhase, OperationState};

/// Response key of success messages.
pub const MESSAGE_KEY: &str = "message";
/// Response key of failure messages.
pub const ERROR_KEY: &str = "error";

/// Flat string parameters of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// Empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// A parameter, treating blank and `null` values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        non_blank(self.0.get(key).map(String::as_str))
    }

    /// A parameter exactly as given, blank values included.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// A parameter that must be present and non-blank.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::validation(format!("{} parameter is required", key)))
    }

    /// A boolean parameter; `true` and `Y` are set, anything else is clear.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("y"))
    }

    /// A numeric parameter.
    pub fn number<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                Error::validation(format!("{} must be a number, got '{}'", key, raw))
            }),
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Flat string response of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Response(BTreeMap<String, String>);

impl Response {
    /// A response carrying only a `message`.
    pub fn success(message: impl Into<String>) -> Self {
        Self(BTreeMap::from([(MESSAGE_KEY.to_string(), message.into())]))
    }

    /// A response carrying only an `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self(BTreeMap::from([(ERROR_KEY.to_string(), error.into())]))
    }

    /// The success message, if any.
    pub fn message(&self) -> Option<&str> {
        self.get(MESSAGE_KEY)
    }

    /// The error message, if any.
    pub fn error(&self) -> Option<&str> {
        self.get(ERROR_KEY)
    }

    /// Check if the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.0.contains_key(MESSAGE_KEY)
    }

    /// Any response key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The response as a map.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Consume the response, returning its map.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }

    /// The response as a JSON object.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.0).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// The operations an engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a physical table and register it.
    CreateTable,
    /// Register an existing physical table.
    RegisterTable,
    /// Add a physical column and register it.
    AddColumn,
    /// Add a foreign key column and constraint.
    AddForeignKey,
    /// Create a view and register it.
    CreateView,
    /// Register a transient column computed by SQL.
    CreateComputedColumn,
    /// Register a window with its menu entry.
    RegisterWindow,
    /// Register a tab of a window.
    RegisterTab,
    /// Register a process.
    RegisterProcess,
    /// Report catalog and schema inconsistencies of a table.
    CheckTableColumns,
    /// Describe physical columns that have no descriptor yet.
    RegisterColumns,
    /// Add a field to a tab for every column of its table.
    RegisterFields,
}

impl Operation {
    /// Every operation.
    pub const ALL: [Operation; 12] = [
        Operation::CreateTable,
        Operation::RegisterTable,
        Operation::AddColumn,
        Operation::AddForeignKey,
        Operation::CreateView,
        Operation::CreateComputedColumn,
        Operation::RegisterWindow,
        Operation::RegisterTab,
        Operation::RegisterProcess,
        Operation::CheckTableColumns,
        Operation::RegisterColumns,
        Operation::RegisterFields,
    ];

    /// Wire name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            Operation::CreateTable => "create_table",
            Operation::RegisterTable => "register_table",
            Operation::AddColumn => "add_column",
            Operation::AddForeignKey => "add_foreign_key",
            Operation::CreateView => "create_view",
            Operation::CreateComputedColumn => "create_computed_column",
            Operation::RegisterWindow => "register_window",
            Operation::RegisterTab => "register_tab",
            Operation::RegisterProcess => "register_process",
            Operation::CheckTableColumns => "check_table_columns",
            Operation::RegisterColumns => "register_columns",
            Operation::RegisterFields => "register_fields",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_");
        Operation::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::validation(format!("unknown operation '{}'", s)))
    }
}

/// The schema-mutation engine.
///
/// Owns the catalog session and the DDL executor, so the staged catalog
/// writes and the physical changes of one operation are sequenced in one
/// place.
pub struct Smith<B: CatalogBackend, G: SchemaGateway> {
    session: CatalogSession<B>,
    executor: DdlExecutor<G>,
    synthesizer: IdentifierSynthesizer,
    resolver: TypeResolver,
    messages: Box<dyn MessageCatalog + Send>,
    config: SmithConfig,
}

impl<B: CatalogBackend, G: SchemaGateway> Smith<B, G> {
    /// Create an engine over a catalog backend and a schema gateway.
    ///
    /// The identifier limit never exceeds [`MAX_IDENTIFIER_LENGTH`], which
    /// every rendered [`Identifier`](crate::ddl::Identifier) is held to.
    pub fn new(backend: B, gateway: G, config: SmithConfig) -> Self {
        let synthesizer = IdentifierSynthesizer::new()
            .with_max_length(config.max_identifier_length.min(MAX_IDENTIFIER_LENGTH))
            .with_random_attempts(config.random_attempts);
        Self {
            session: CatalogSession::new(backend),
            executor: DdlExecutor::new(gateway),
            synthesizer,
            resolver: TypeResolver::standard(),
            messages: Box::new(DefaultMessages::new()),
            config,
        }
    }

    /// Replace the identifier synthesizer.
    pub fn with_synthesizer(mut self, synthesizer: IdentifierSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Replace the type resolver.
    pub fn with_resolver(mut self, resolver: TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the message catalog.
    pub fn with_messages(mut self, messages: impl MessageCatalog + Send + 'static) -> Self {
        self.messages = Box::new(messages);
        self
    }

    /// The configuration.
    pub fn config(&self) -> &SmithConfig {
        &self.config
    }

    /// The catalog session.
    pub fn session(&self) -> &CatalogSession<B> {
        &self.session
    }

    /// Mutable access to the catalog session.
    pub fn session_mut(&mut self) -> &mut CatalogSession<B> {
        &mut self.session
    }

    /// The schema gateway.
    pub fn gateway(&self) -> &G {
        self.executor.gateway()
    }

    /// Mutable access to the schema gateway.
    pub fn gateway_mut(&mut self) -> &mut G {
        self.executor.gateway_mut()
    }

    /// Consume the engine, returning its backend and gateway.
    pub fn into_parts(self) -> (B, G) {
        (self.session.into_backend(), self.executor.into_gateway())
    }

    /// Seed the catalog with the standard types and the core module.
    pub fn seed(&mut self) -> Result<usize> {
        bootstrap::seed(&mut self.session)
    }

    /// Run an operation and return its response.
    pub fn invoke(&mut self, operation: Operation, params: &Params) -> Response {
        self.run(operation, params).0
    }

    /// Run an operation by name. Unknown names yield an error response.
    pub fn invoke_named(&mut self, name: &str, params: &Params) -> Response {
        match name.parse::<Operation>() {
            Ok(operation) => self.invoke(operation, params),
            Err(e) => Response::failure(e.to_string()),
        }
    }

    /// Run an operation, returning its response and its final state.
    #[instrument(skip(self, params), fields(operation = %operation))]
    pub fn run(&mut self, operation: Operation, params: &Params) -> (Response, OperationState) {
        debug!(params = ?params, "operation parameters");
        let mut state = OperationState::new(operation.name());

        match self.run_inner(operation, params, &mut state) {
            Ok(message) => {
                if let Err(e) = state.succeed() {
                    warn!(error = %e, "operation finished outside its lifecycle");
                }
                info!(elapsed_us = state.elapsed_micros(), "operation succeeded");
                (Response::success(message), state)
            }
            Err(e) => {
                self.session.clear();
                let error = e.to_string();
                if let Err(transition) = state.fail(error.clone()) {
                    warn!(error = %transition, "operation failed outside its lifecycle");
                }
                (Response::failure(error), state)
            }
        }
    }

    fn run_inner(
        &mut self,
        operation: Operation,
        params: &Params,
        state: &mut OperationState,
    ) -> Result<String> {
        match operation {
            Operation::CreateTable => self.create_table(params, state),
            Operation::RegisterTable => self.register_table(params, state),
            Operation::AddColumn => self.add_column(params, state),
            Operation::AddForeignKey => self.add_foreign_key(params, state),
            Operation::CreateView => self.create_view(params, state),
            Operation::CreateComputedColumn => self.create_computed_column(params, state),
            Operation::RegisterWindow => self.register_window(params, state),
            Operation::RegisterTab => self.register_tab(params, state),
            Operation::RegisterProcess => self.register_process(params, state),
            Operation::CheckTableColumns => self.check_table_columns(params, state),
            Operation::RegisterColumns => self.register_columns(params, state),
            Operation::RegisterFields => self.register_fields(params, state),
        }
    }

    /// Apply DDL, then commit the staged catalog writes.
    ///
    /// Statements run in order and stop at the first failure. Once any
    /// statement has been applied, a failed commit becomes a partial failure
    /// naming `object`.
    fn apply_and_commit(
        &mut self,
        state: &mut OperationState,
        statements: &[DdlStatement],
        object: &str,
    ) -> Result<Vec<ExecutionReport>> {
        state.advance(OperationPhase::MutatingSchema)?;
        let mut reports = Vec::with_capacity(statements.len());
        for statement in statements {
            reports.push(self.executor.execute(statement)?);
        }

        state.advance(OperationPhase::RegisteringMetadata)?;
        match self.session.flush() {
            Ok(records) => {
                debug!(records, object, "catalog committed");
                Ok(reports)
            }
            Err(e) if reports.is_empty() => Err(Error::CatalogRegistration(e.to_string())),
            Err(e) => Err(Error::PartialFailure {
                object: object.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Commit the staged catalog writes of an operation without DDL.
    fn commit(&mut self, state: &mut OperationState) -> Result<usize> {
        state.advance(OperationPhase::RegisteringMetadata)?;
        self.session
            .flush()
            .map_err(|e| Error::CatalogRegistration(e.to_string()))
    }

    fn message(&self, code: &str, args: &[&str]) -> String {
        self.messages.message(code, args)
    }
}
