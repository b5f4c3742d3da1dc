//! Table and view operations.

use tracing::info;

use super::{OperationPhase, OperationState, Params, Smith};
use crate::catalog::CatalogBackend;
use crate::config::REGISTERED_ACCESS_LEVEL;
use crate::ddl::statement::AUDIT_COLUMNS;
use crate::ddl::{AuditConstraints, CreateTable, CreateView, DdlStatement, Identifier, SchemaGateway};
use crate::error::{Error, Result};
use crate::messages;
use crate::naming::{qualified_name, NameOracle};
use crate::registrar::{infer_column, NewTable, Registrar, KEY_SUFFIX, VIEW_SUFFIX};
use crate::text::{camel_case, strip_prefix_ignore_case};

impl<B: CatalogBackend, G: SchemaGateway> Smith<B, G> {
    /// Create an audited table and register it with its skeleton columns.
    pub(super) fn create_table(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let module_id = params.require("ModuleID")?;
        let name = match params.get("Name") {
            Some(name) => name.to_lowercase(),
            None => self.message(messages::DEFAULT_TABLE_NAME, &[]),
        };
        let is_view = params.flag("IsView");
        let access_level = params
            .get("DataAccessLevel")
            .unwrap_or(self.config.default_access_level.as_str())
            .to_string();

        state.advance(OperationPhase::ResolvingContext)?;
        let oracle = self.executor.gateway();
        let mut registrar = Registrar::new(&mut self.session);
        let ctx = registrar.resolve_module_and_prefix(module_id)?;
        registrar.require_in_development(&ctx.module)?;

        let prefix = ctx.prefix.to_lowercase();
        let requested = params
            .get("DBTableName")
            .map(str::to_lowercase)
            .unwrap_or_else(|| name.clone());
        let suffix = if is_view { VIEW_SUFFIX } else { "" };
        let qualified = qualified_name(&prefix, &requested);
        let base = self.synthesizer.physical_name(
            &prefix,
            &requested,
            KEY_SUFFIX.len() + suffix.len(),
            |candidate| registrar.name_held_by_other(&format!("{}{}", candidate, suffix), &qualified),
        )?;
        let java_class_name = params
            .get("JavaClass")
            .map(str::to_string)
            .unwrap_or_else(|| camel_case(&name));

        let package = registrar.data_package(&ctx.module)?;
        let table = registrar.register_table(
            &package,
            NewTable {
                db_table_name: base.clone(),
                requested_name: qualified,
                name: base,
                java_class_name,
                access_level,
                description: params.get("Description").map(str::to_string),
                help: params.get("Help").map(str::to_string),
                is_view,
            },
        )?;
        let physical = table.db_table_name.clone();

        let owner = ctx.prefix.as_str();
        let constraints = AuditConstraints {
            primary_key: Identifier::new(
                self.synthesizer
                    .constraint_name(owner, &physical, "", "pk", oracle)?,
            )?,
            client_fk: Identifier::new(
                self.synthesizer
                    .constraint_name(owner, &physical, "ad_client", "fk", oracle)?,
            )?,
            org_fk: Identifier::new(
                self.synthesizer
                    .constraint_name(owner, &physical, "ad_org", "fk", oracle)?,
            )?,
            active_check: Identifier::new(
                self.synthesizer
                    .check_constraint_name(owner, &physical, "isactive", oracle)?,
            )?,
        };
        let create = CreateTable::audited(Identifier::new(physical.as_str())?, constraints)?;

        let skeleton: Vec<_> = create
            .columns()
            .iter()
            .map(|(column, _)| infer_column(&physical, column))
            .collect();
        registrar.register_discovered_columns(&table, &ctx.module.id, &skeleton)?;

        self.apply_and_commit(state, &[DdlStatement::CreateTable(create)], &physical)?;
        info!(table = %physical, id = %table.id, "table created and registered");
        Ok(self.message(messages::TABLE_REGISTERED, &[&table.id]))
    }

    /// Register a table that already exists in the physical schema.
    pub(super) fn register_table(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let prefix = params.require("DBPrefix")?;
        let name = params.require("Name")?;

        state.advance(OperationPhase::ResolvingContext)?;
        let oracle = self.executor.gateway();
        let mut registrar = Registrar::new(&mut self.session);
        let ctx = registrar.resolve_prefix(prefix)?;
        registrar.require_in_development(&ctx.module)?;

        let scoped = format!("{}_", ctx.prefix);
        let body = strip_prefix_ignore_case(name, &scoped).unwrap_or(name);
        let db_table_name = format!("{}_{}", ctx.prefix, body).to_lowercase();
        let table_ident = Identifier::new(db_table_name.as_str())?;
        if !oracle.relation_exists(&db_table_name)? {
            return Err(Error::not_found(format!(
                "table '{}' does not exist in the database",
                db_table_name
            )));
        }

        let java_class_name = params
            .get("JavaClass")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", ctx.prefix.to_uppercase(), camel_case(body)));
        let package = registrar.data_package(&ctx.module)?;
        let table = registrar.register_table(
            &package,
            NewTable {
                db_table_name: db_table_name.clone(),
                name: db_table_name.clone(),
                java_class_name,
                access_level: REGISTERED_ACCESS_LEVEL.to_string(),
                description: params.get("Description").map(str::to_string),
                ..Default::default()
            },
        )?;

        let columns = oracle.projection(&format!("SELECT * FROM {}", table_ident))?;
        let discovered: Vec<_> = columns
            .iter()
            .map(|column| infer_column(&db_table_name, column))
            .collect();
        let described = registrar.register_discovered_columns(&table, &ctx.module.id, &discovered)?;

        self.commit(state)?;
        info!(table = %db_table_name, id = %table.id, columns = described.len(), "table registered");
        Ok(self.message(messages::TABLE_REGISTERED, &[&table.id]))
    }

    /// Create or replace a view and register it.
    ///
    /// The query must project `<view>_id` and every audit column.
    pub(super) fn create_view(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let name = params.require("Name")?;
        let module_id = params.require("ModuleID")?;
        let select = params.require("QuerySelect")?;
        let access_level = params
            .get("DataAccessLevel")
            .unwrap_or(self.config.default_access_level.as_str())
            .to_string();

        state.advance(OperationPhase::ResolvingContext)?;
        let oracle = self.executor.gateway();
        let mut registrar = Registrar::new(&mut self.session);
        let ctx = registrar.resolve_module_and_prefix(module_id)?;
        registrar.require_in_development(&ctx.module)?;

        let prefix = ctx.prefix.to_lowercase();
        let lowered = name.to_lowercase();
        let requested = lowered.strip_suffix(VIEW_SUFFIX).unwrap_or(&lowered);
        let body = strip_prefix_ignore_case(requested, &format!("{}_", prefix)).unwrap_or(requested);
        let qualified = qualified_name(&prefix, requested);
        let base = self.synthesizer.physical_name(
            &prefix,
            requested,
            KEY_SUFFIX.len() + VIEW_SUFFIX.len(),
            |candidate| {
                registrar.name_held_by_other(&format!("{}{}", candidate, VIEW_SUFFIX), &qualified)
            },
        )?;
        let view_name = format!("{}{}", base, VIEW_SUFFIX);
        let key = format!("{}{}", view_name, KEY_SUFFIX);

        let projection = oracle.projection(select)?;
        let missing: Vec<&str> = std::iter::once(key.as_str())
            .chain(AUDIT_COLUMNS.iter().copied())
            .filter(|required| !projection.iter().any(|c| c.eq_ignore_ascii_case(required)))
            .collect();
        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "projection of view '{}' is missing required columns: {}",
                view_name,
                missing.join(", ")
            )));
        }

        let java_class_name = params
            .get("JavaClass")
            .map(str::to_string)
            .unwrap_or_else(|| camel_case(body));
        let package = registrar.data_package(&ctx.module)?;
        let table = registrar.register_table(
            &package,
            NewTable {
                db_table_name: base.clone(),
                requested_name: qualified,
                name: base,
                java_class_name,
                access_level,
                description: params.get("Description").map(str::to_string),
                help: params.get("Help").map(str::to_string),
                is_view: true,
            },
        )?;
        let discovered: Vec<_> = projection
            .iter()
            .map(|column| infer_column(&table.db_table_name, column))
            .collect();
        registrar.register_discovered_columns(&table, &ctx.module.id, &discovered)?;

        let view = CreateView::new(Identifier::new(table.db_table_name.as_str())?, select)?;
        self.apply_and_commit(
            state,
            &[DdlStatement::CreateOrReplaceView(view)],
            &table.db_table_name,
        )?;
        info!(view = %table.db_table_name, id = %table.id, "view created and registered");
        Ok(self.message(messages::VIEW_CREATED, &[&table.id]))
    }
}
