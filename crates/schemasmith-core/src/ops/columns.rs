//! Column operations.

use serde_json::{json, Value};
use tracing::{info, warn};

use super::{OperationPhase, OperationState, Params, Smith};
use crate::catalog::{bootstrap, CatalogBackend, ColumnDescriptor, Module, TableDescriptor};
use crate::ddl::{AddColumn, AddForeignKey, ColumnSpec, DdlStatement, Identifier, SchemaGateway};
use crate::error::{Error, Result};
use crate::messages;
use crate::naming::{external_name, NameOracle};
use crate::registrar::{infer_column, logical_column_name, Registrar, KEY_SUFFIX};
use crate::text::ends_with_ignore_case;
use crate::types::{LogicalType, PhysicalType, TABLE_DIR};

impl<B: CatalogBackend, G: SchemaGateway> Smith<B, G> {
    /// Add a physical column and register its descriptor.
    ///
    /// A column added by a module other than the table's owner is renamed
    /// `EM_<prefix>_<name>`. `TableDir` and `Table` columns also get a foreign
    /// key to the referenced table.
    pub(super) fn add_column(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let table_key = params.require("tableID")?;
        let module_id = params.require("moduleID")?;
        let reference_id = params.require("referenceID")?;
        let requested_column = params.require("columnNameDB")?;
        let requested_name = params.get("name").unwrap_or(requested_column);
        let nullable = params.flag("canBeNull");

        state.advance(OperationPhase::ResolvingContext)?;
        let oracle = self.executor.gateway();
        let mut registrar = Registrar::new(&mut self.session);
        let table = registrar.table(table_key)?;
        require_relation(oracle, &table)?;
        let ctx = registrar.resolve_module_and_prefix(module_id)?;
        let (reference, logical) = registrar.logical_type(reference_id)?;
        let external = registrar.table_module(&table)?.id != ctx.module.id;

        if logical.is_table_dir() && external {
            return Err(Error::validation(format!(
                "TableDir columns cannot be added to table '{}' from another module; use a Table reference",
                table.db_table_name
            )));
        }
        let mut target = None;
        if logical.is_table_dir() {
            target = Some(registrar.validate_reference_link(&table, requested_column, oracle)?);
        }
        registrar.require_in_development(&ctx.module)?;

        let (db_column_name, name, constraint_prefix) = if external {
            (
                external_name(&ctx.prefix, requested_column),
                external_name(&ctx.prefix, requested_name),
                format!("EM_{}", ctx.prefix),
            )
        } else {
            (
                requested_column.to_string(),
                requested_name.to_string(),
                ctx.prefix.clone(),
            )
        };
        if registrar.column_by_name(&table.id, &db_column_name)?.is_some() {
            return Err(Error::validation(format!(
                "column '{}' already exists in table '{}'",
                db_column_name, table.db_table_name
            )));
        }
        if logical.is_table() {
            let referenced = reference.referenced_table_id.as_deref().ok_or_else(|| {
                Error::validation(format!(
                    "reference '{}' does not name a referenced table",
                    reference.name
                ))
            })?;
            target = Some(registrar.session().require::<TableDescriptor>(referenced)?);
        }

        let ty = self.resolver.resolve(&logical)?;
        let table_ident = Identifier::new(table.db_table_name.as_str())?;
        let column_ident = Identifier::new(db_column_name.as_str())?;
        let mut spec = ColumnSpec::new(column_ident.clone(), ty.clone())
            .nullable(nullable)
            .default_value(params.raw("defaultValue"));
        if ty.is_flag() {
            let check = self.synthesizer.check_constraint_name(
                &constraint_prefix,
                &table.db_table_name,
                &db_column_name,
                oracle,
            )?;
            spec = spec.flag_check(Identifier::new(check)?);
        }

        let mut statements = vec![DdlStatement::AddColumn(AddColumn {
            table: table_ident.clone(),
            column: spec,
        })];
        if let Some(target) = &target {
            let constraint = self.synthesizer.constraint_name(
                &constraint_prefix,
                &table.db_table_name,
                &target.db_table_name,
                "fk",
                oracle,
            )?;
            statements.push(DdlStatement::AddForeignKey(AddForeignKey::to_key_of(
                table_ident,
                Identifier::new(constraint)?,
                column_ident,
                Identifier::new(target.db_table_name.as_str())?,
            )?));
        }

        let (reference_id, reference_value_id) = match (&reference.parent_id, logical.base) {
            (Some(parent), false) => (parent.clone(), Some(reference.id.clone())),
            _ => (reference.id.clone(), None),
        };
        let column = registrar.register_column(ColumnDescriptor {
            table_id: table.id.clone(),
            module_id: ctx.module.id.clone(),
            name: name.clone(),
            db_column_name: db_column_name.clone(),
            reference_id,
            reference_value_id,
            length: column_length(&ty),
            default_value: params.get("defaultValue").map(|v| v.replace('\'', "")),
            mandatory: !nullable,
            ..Default::default()
        })?;

        let object = format!("{}.{}", table.db_table_name, db_column_name);
        self.apply_and_commit(state, &statements, &object)?;
        info!(column = %object, id = %column.id, external, "column added");

        let added = self.message(messages::COLUMN_ADDED, &[&column.id]);
        if external {
            let renamed = self.message(messages::COLUMN_RENAMED, &[&db_column_name, &name]);
            Ok(format!("{} {}", renamed, added))
        } else {
            Ok(added)
        }
    }

    /// Add `<parent>_id` to a child table with a foreign key to the parent.
    pub(super) fn add_foreign_key(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let child_key = params.require("ChildTable")?;
        let parent_key = params.require("ParentTable")?;
        let module_id = params.require("ModuleID")?;

        state.advance(OperationPhase::ResolvingContext)?;
        let oracle = self.executor.gateway();
        let mut registrar = Registrar::new(&mut self.session);
        let child = registrar.table(child_key)?;
        let parent = registrar.table(parent_key)?;
        require_relation(oracle, &child)?;
        let ctx = registrar.resolve_module_and_prefix(module_id)?;
        registrar.require_in_development(&ctx.module)?;

        let external = params.flag("External") || registrar.table_module(&child)?.id != ctx.module.id;
        if external {
            return Err(Error::validation(format!(
                "foreign keys from module '{}' into table '{}' need an external Table reference column; use add_column",
                ctx.module.name, child.db_table_name
            )));
        }
        if !oracle.relation_exists(&parent.db_table_name)? {
            return Err(Error::not_found(format!(
                "referenced table '{}' does not exist in the database",
                parent.db_table_name
            )));
        }
        if registrar.key_columns(&parent.id)?.is_empty() {
            return Err(Error::validation(format!(
                "referenced table '{}' has no key column",
                parent.db_table_name
            )));
        }

        let db_column_name = format!("{}{}", parent.db_table_name, KEY_SUFFIX);
        if oracle.foreign_key_exists(&child.db_table_name, &db_column_name, &parent.db_table_name)? {
            return Err(Error::validation(format!(
                "table '{}' already has a foreign key from '{}' to '{}'",
                child.db_table_name, db_column_name, parent.db_table_name
            )));
        }
        let child_ident = Identifier::new(child.db_table_name.as_str())?;
        let column_ident = Identifier::new(db_column_name.as_str())?;
        let table_dir = LogicalType::base(bootstrap::TABLE_DIR_TYPE_ID, TABLE_DIR);
        let ty = self.resolver.resolve(&table_dir)?;

        let mut statements = Vec::with_capacity(2);
        if !oracle.column_exists(&child.db_table_name, &db_column_name)? {
            statements.push(DdlStatement::AddColumn(AddColumn {
                table: child_ident.clone(),
                column: ColumnSpec::new(column_ident.clone(), ty.clone()),
            }));
        }
        let constraint = self.synthesizer.constraint_name(
            &ctx.prefix,
            &child.db_table_name,
            &parent.db_table_name,
            "fk",
            oracle,
        )?;
        statements.push(DdlStatement::AddForeignKey(AddForeignKey::to_key_of(
            child_ident,
            Identifier::new(constraint.as_str())?,
            column_ident,
            Identifier::new(parent.db_table_name.as_str())?,
        )?));

        if registrar.column_by_name(&child.id, &db_column_name)?.is_none() {
            registrar.register_column(ColumnDescriptor {
                table_id: child.id.clone(),
                module_id: ctx.module.id.clone(),
                name: logical_column_name(&db_column_name),
                db_column_name: db_column_name.clone(),
                reference_id: bootstrap::TABLE_DIR_TYPE_ID.to_string(),
                length: column_length(&ty),
                ..Default::default()
            })?;
        }

        self.apply_and_commit(state, &statements, &constraint)?;
        info!(constraint = %constraint, child = %child.db_table_name, parent = %parent.db_table_name, "foreign key added");
        Ok(self.message(
            messages::FOREIGN_KEY_ADDED,
            &[&constraint, &child.db_table_name, &parent.db_table_name],
        ))
    }

    /// Register a transient column whose value is a SQL expression.
    pub(super) fn create_computed_column(
        &mut self,
        params: &Params,
        state: &mut OperationState,
    ) -> Result<String> {
        let column_name = params.require("ColumnName")?;
        let name = params.require("Name")?;
        let sql_logic = params.require("SQLLogic")?;
        let module_id = params.require("ModuleID")?;
        let table_key = params
            .get("TableID")
            .or_else(|| params.get("TableName"))
            .ok_or_else(|| Error::validation("Either TableID or TableName parameter is required"))?;
        let reference_id = params.get("ReferenceID").unwrap_or(bootstrap::STRING_TYPE_ID);

        state.advance(OperationPhase::ResolvingContext)?;
        let mut registrar = Registrar::new(&mut self.session);
        let table = registrar.table(table_key)?;
        let module = registrar.session().require::<Module>(module_id)?;
        registrar.require_in_development(&module)?;
        let (reference, _) = registrar.logical_type(reference_id)?;
        if registrar.column_by_name(&table.id, column_name)?.is_some() {
            return Err(Error::validation(format!(
                "Column '{}' already exists in table '{}'",
                column_name, table.db_table_name
            )));
        }

        let column = registrar.register_column(ColumnDescriptor {
            table_id: table.id.clone(),
            module_id: module.id.clone(),
            name: name.to_string(),
            db_column_name: column_name.to_string(),
            reference_id: reference.id,
            is_transient: true,
            sql_logic: Some(sql_logic.to_string()),
            description: params.get("Description").map(str::to_string),
            ..Default::default()
        })?;

        self.commit(state)?;
        info!(column = %column_name, table = %table.db_table_name, id = %column.id, "computed column registered");
        Ok(self.message(messages::COMPUTED_COLUMN_CREATED, &[name, &column.id]))
    }

    /// Describe the physical columns of a registered table that have no
    /// descriptor yet. Only the catalog is written.
    pub(super) fn register_columns(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let table_name = params.require("TableName")?;

        state.advance(OperationPhase::ResolvingContext)?;
        let gateway = self.executor.gateway();
        let mut registrar = Registrar::new(&mut self.session);
        let table = registrar
            .table_by_name(table_name)?
            .ok_or_else(|| Error::not_found(format!("table '{}' not found", table_name)))?;
        let module = registrar.table_module(&table)?;
        registrar.require_in_development(&module)?;
        require_relation(gateway, &table)?;

        let table_ident = Identifier::new(table.db_table_name.as_str())?;
        let discovered: Vec<_> = gateway
            .projection(&format!("SELECT * FROM {}", table_ident))?
            .iter()
            .map(|column| infer_column(&table.db_table_name, column))
            .collect();
        let described = registrar.register_discovered_columns(&table, &module.id, &discovered)?;

        self.commit(state)?;
        info!(table = %table.db_table_name, columns = described.len(), "missing columns registered");
        Ok(self.message(
            messages::COLUMNS_REGISTERED,
            &[&described.len().to_string(), &table.db_table_name],
        ))
    }

    /// Report inconsistencies between a table's descriptors and the schema.
    ///
    /// The message is a JSON array of `{column, error}` findings; an empty
    /// array means the table is consistent.
    pub(super) fn check_table_columns(
        &mut self,
        params: &Params,
        state: &mut OperationState,
    ) -> Result<String> {
        let table_key = params.require("TableID")?;

        state.advance(OperationPhase::ResolvingContext)?;
        let gateway = self.executor.gateway();
        let registrar = Registrar::new(&mut self.session);
        let table = registrar.table(table_key)?;
        let limit = self.config.max_identifier_length;

        let mut findings: Vec<Value> = Vec::new();
        for column in registrar.columns(&table.id)? {
            let db_name = &column.db_column_name;
            let mut report = |error: String| {
                findings.push(json!({ "column": db_name, "error": error }));
            };

            if db_name.len() > limit {
                report(format!(
                    "Column {} in table {} name is too long. Maximum allowed length is {} characters.",
                    db_name, table.db_table_name, limit
                ));
            }

            let is_table_dir = match registrar.logical_type(&column.reference_id) {
                Ok((_, logical)) => logical.is_table_dir(),
                Err(Error::NotFound(_)) => false,
                Err(e) => return Err(e),
            };
            if is_table_dir {
                let lowered = db_name.to_lowercase();
                let target_name = if ends_with_ignore_case(&lowered, KEY_SUFFIX) {
                    &lowered[..lowered.len() - KEY_SUFFIX.len()]
                } else {
                    lowered.as_str()
                };
                match registrar.table_by_name(target_name)? {
                    None => report(format!(
                        "TableDir column {} of table {} does not reference a registered table",
                        db_name, table.db_table_name
                    )),
                    Some(target) if target.id == table.id => report(format!(
                        "TableDir column {} of table {} references its own table",
                        db_name, table.db_table_name
                    )),
                    Some(_) => {}
                }
            }

            if !column.is_transient && !gateway.column_exists(&table.db_table_name, db_name)? {
                report(format!(
                    "Column {} is registered but missing from table {} in the database",
                    db_name, table.db_table_name
                ));
            }
        }

        if findings.is_empty() {
            info!(table = %table.db_table_name, "table columns consistent");
        } else {
            warn!(table = %table.db_table_name, findings = findings.len(), "table columns inconsistent");
        }
        serde_json::to_string(&findings).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Fail unless the table behind a descriptor exists physically.
fn require_relation<G: SchemaGateway>(gateway: &G, table: &TableDescriptor) -> Result<()> {
    if gateway.relation_exists(&table.db_table_name)? {
        Ok(())
    } else {
        Err(Error::not_found(format!(
            "table '{}' is registered but does not exist in the database",
            table.db_table_name
        )))
    }
}

/// Catalog length of a column of the given physical type.
fn column_length(ty: &PhysicalType) -> u32 {
    let declared = ty
        .as_str()
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .and_then(|(size, _)| size.trim().parse().ok());
    match declared {
        Some(length) => length,
        None if ty.is_timestamp() => 19,
        None if ty.is_numeric() => 10,
        None => 4000,
    }
}
