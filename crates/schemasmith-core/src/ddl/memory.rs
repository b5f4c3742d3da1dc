//! In-memory model of the physical schema.
//!
//! Honours `IF NOT EXISTS`, `IF EXISTS` and `OR REPLACE` the way PostgreSQL
//! does and reports failures with PostgreSQL's wording. Used by tests and dry
//! runs.

use std::collections::BTreeMap;

use sqlparser::ast::{Expr, Ident, SelectItem, SetExpr, Statement, TableFactor};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::gateway::{GatewayError, QueryResult, SchemaGateway};
use super::statement::{audit_column_types, trim_select, DdlStatement, SCHEMA};
use crate::naming::NameOracle;
use crate::types::PhysicalType;

#[derive(Debug, Clone, Default)]
struct Relation {
    columns: Vec<(String, Option<PhysicalType>)>,
    is_view: bool,
}

impl Relation {
    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|(name, _)| name == column)
    }
}

/// `table.column` referencing the key of `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ForeignKeyLink {
    table: String,
    column: String,
    target: String,
}

/// A simulated schema that records every statement it applies.
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    relations: BTreeMap<String, Relation>,
    /// Constraint name to owning relation.
    constraints: BTreeMap<String, String>,
    foreign_keys: Vec<ForeignKeyLink>,
    applied: Vec<String>,
}

impl MemorySchema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// A schema holding the `ad_client` and `ad_org` system tables.
    pub fn with_core_tables() -> Self {
        let mut schema = Self::new();
        for table in ["ad_client", "ad_org"] {
            let key = format!("{}_id", table);
            let mut columns = vec![(key, PhysicalType::new("character varying(32)"))];
            columns.extend(audit_column_types());
            schema.add_table(table, columns);
        }
        schema
    }

    /// Create a table directly, bypassing DDL.
    pub fn add_table<I, S>(&mut self, name: &str, columns: I)
    where
        I: IntoIterator<Item = (S, PhysicalType)>,
        S: Into<String>,
    {
        let relation = Relation {
            columns: columns
                .into_iter()
                .map(|(c, ty)| (c.into().to_lowercase(), Some(ty)))
                .collect(),
            is_view: false,
        };
        self.relations.insert(name.to_lowercase(), relation);
    }

    /// Every SQL statement applied so far, in order.
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    /// Columns of a relation, in order.
    pub fn columns(&self, relation: &str) -> Option<Vec<String>> {
        self.relations
            .get(&relation.to_lowercase())
            .map(|r| r.columns.iter().map(|(name, _)| name.clone()).collect())
    }

    /// Physical type of a column, when known.
    pub fn column_type(&self, relation: &str, column: &str) -> Option<&PhysicalType> {
        self.relations
            .get(&relation.to_lowercase())?
            .columns
            .iter()
            .find(|(name, _)| *name == column.to_lowercase())
            .and_then(|(_, ty)| ty.as_ref())
    }

    /// Check whether a relation is a view.
    pub fn is_view(&self, relation: &str) -> bool {
        self.relations
            .get(&relation.to_lowercase())
            .is_some_and(|r| r.is_view)
    }

    /// Number of relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn require_relation(&self, name: &str) -> Result<&Relation, GatewayError> {
        self.relations
            .get(name)
            .ok_or_else(|| GatewayError::Database(format!("relation \"{}.{}\" does not exist", SCHEMA, name)))
    }

    fn claim_constraint(&mut self, name: &str, relation: &str) -> Result<(), GatewayError> {
        let name = name.to_lowercase();
        if let Some(owner) = self.constraints.get(&name) {
            return Err(if owner == relation {
                GatewayError::Database(format!(
                    "constraint \"{}\" for relation \"{}\" already exists",
                    name, relation
                ))
            } else {
                GatewayError::Database(format!("relation \"{}\" already exists", name))
            });
        }
        self.constraints.insert(name, relation.to_string());
        Ok(())
    }

    fn apply_inner(&mut self, statement: &DdlStatement) -> Result<(), GatewayError> {
        match statement {
            DdlStatement::CreateTable(create) => {
                let table = create.table.folded();
                if self.relations.contains_key(&table) {
                    debug!(table = %table, "relation already exists, skipping");
                    return Ok(());
                }
                self.require_relation("ad_client")?;
                self.require_relation("ad_org")?;

                let c = &create.constraints;
                let names = [&c.primary_key, &c.client_fk, &c.org_fk, &c.active_check];
                let mut seen = Vec::new();
                for name in names {
                    let folded = name.folded();
                    if self.constraints.contains_key(&folded) || seen.contains(&folded) {
                        return Err(GatewayError::Database(format!(
                            "relation \"{}\" already exists",
                            folded
                        )));
                    }
                    seen.push(folded);
                }
                for name in seen {
                    self.constraints.insert(name, table.clone());
                }
                for target in ["ad_client", "ad_org"] {
                    self.foreign_keys.push(ForeignKeyLink {
                        table: table.clone(),
                        column: format!("{}_id", target),
                        target: target.to_string(),
                    });
                }
                let columns = create
                    .columns()
                    .into_iter()
                    .map(|(name, ty)| (name, Some(ty)))
                    .collect();
                self.relations.insert(
                    table,
                    Relation {
                        columns,
                        is_view: false,
                    },
                );
                Ok(())
            }
            DdlStatement::AddColumn(add) => {
                let table = add.table.folded();
                let column = add.column.name.folded();
                let Some(relation) = self.relations.get(&table) else {
                    debug!(table = %table, "relation does not exist, skipping");
                    return Ok(());
                };
                if relation.is_view {
                    return Err(GatewayError::Database(format!(
                        "\"{}\" is not a table",
                        table
                    )));
                }
                if relation.has_column(&column) {
                    debug!(table = %table, column = %column, "column already exists, skipping");
                    return Ok(());
                }
                if let Some(check) = &add.column.check {
                    self.claim_constraint(check.as_str(), &table)?;
                }
                if let Some(relation) = self.relations.get_mut(&table) {
                    relation
                        .columns
                        .push((column, Some(add.column.ty.clone())));
                }
                Ok(())
            }
            DdlStatement::AddForeignKey(fk) => {
                let table = fk.table.folded();
                let Some(relation) = self.relations.get(&table) else {
                    debug!(table = %table, "relation does not exist, skipping");
                    return Ok(());
                };
                let column = fk.column.folded();
                if !relation.has_column(&column) {
                    return Err(GatewayError::Database(format!(
                        "column \"{}\" referenced in foreign key constraint does not exist",
                        column
                    )));
                }
                let target_table = fk.target_table.folded();
                let target = self.require_relation(&target_table)?;
                let target_column = fk.target_column.folded();
                if !target.has_column(&target_column) {
                    return Err(GatewayError::Database(format!(
                        "column \"{}\" referenced in foreign key constraint does not exist",
                        target_column
                    )));
                }
                self.claim_constraint(fk.constraint.as_str(), &table)?;
                self.foreign_keys.push(ForeignKeyLink {
                    table,
                    column,
                    target: target_table,
                });
                Ok(())
            }
            DdlStatement::CreateOrReplaceView(view) => {
                let name = view.view.folded();
                if self.relations.get(&name).is_some_and(|r| !r.is_view) {
                    return Err(GatewayError::Database(format!("\"{}\" is not a view", name)));
                }
                let columns = self
                    .projection(&view.select)?
                    .into_iter()
                    .map(|c| (c, None))
                    .collect();
                self.relations.insert(
                    name,
                    Relation {
                        columns,
                        is_view: true,
                    },
                );
                Ok(())
            }
        }
    }
}

impl NameOracle for MemorySchema {
    fn constraint_exists(&self, name: &str) -> crate::Result<bool> {
        Ok(self.constraints.contains_key(&name.to_lowercase()))
    }

    fn relation_exists(&self, name: &str) -> crate::Result<bool> {
        Ok(self.relations.contains_key(&name.to_lowercase()))
    }
}

impl SchemaGateway for MemorySchema {
    fn apply(&mut self, statement: &DdlStatement) -> Result<(), GatewayError> {
        self.apply_inner(statement)?;
        self.applied.push(statement.to_sql());
        Ok(())
    }

    fn query(&self, _sql: &str) -> Result<QueryResult, GatewayError> {
        Err(GatewayError::Unsupported(
            "raw queries need a live database".to_string(),
        ))
    }

    fn projection(&self, select: &str) -> Result<Vec<String>, GatewayError> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, trim_select(select))
            .map_err(|e| GatewayError::Database(format!("syntax error: {}", e)))?;
        let select = match statements.as_slice() {
            [Statement::Query(query)] => match query.body.as_ref() {
                SetExpr::Select(select) => select,
                other => {
                    return Err(GatewayError::Unsupported(format!(
                        "cannot project '{}' without a live database",
                        other
                    )))
                }
            },
            _ => {
                return Err(GatewayError::Database(
                    "a single SELECT statement is required".to_string(),
                ))
            }
        };

        let source = match select.from.first().map(|from| &from.relation) {
            Some(TableFactor::Table { name, .. }) => {
                let name = name.to_string().replace('"', "").to_lowercase();
                let name = name.strip_prefix("public.").unwrap_or(&name).to_string();
                Some(self.require_relation(&name)?)
            }
            _ => None,
        };

        let mut columns = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) => columns.push(output_name(expr)),
                SelectItem::ExprWithAlias { alias, .. } => columns.push(ident_name(alias)),
                SelectItem::Wildcard(..) | SelectItem::QualifiedWildcard(..) => match source {
                    Some(relation) => {
                        columns.extend(relation.columns.iter().map(|(c, _)| c.clone()))
                    }
                    None => {
                        return Err(GatewayError::Unsupported(format!(
                            "cannot expand '{}' without a plain source relation",
                            item
                        )))
                    }
                },
            }
        }
        Ok(columns)
    }

    fn column_exists(&self, table: &str, column: &str) -> crate::Result<bool> {
        Ok(self
            .relations
            .get(&table.to_lowercase())
            .is_some_and(|r| r.has_column(&column.to_lowercase())))
    }

    fn foreign_key_exists(&self, table: &str, column: &str, target: &str) -> crate::Result<bool> {
        let link = ForeignKeyLink {
            table: table.to_lowercase(),
            column: column.to_lowercase(),
            target: target.to_lowercase(),
        };
        Ok(self.foreign_keys.contains(&link))
    }
}

/// Output column name PostgreSQL gives an unaliased select-list item.
fn output_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident_name(ident),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map_or_else(|| "?column?".to_string(), ident_name),
        Expr::Cast { expr, .. } | Expr::Nested(expr) => output_name(expr),
        Expr::Function(function) => function
            .name
            .to_string()
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .replace('"', "")
            .to_lowercase(),
        _ => "?column?".to_string(),
    }
}

/// Quoted identifiers keep their case; unquoted ones fold to lower case.
fn ident_name(ident: &Ident) -> String {
    match ident.quote_style {
        Some(_) => ident.value.clone(),
        None => ident.value.to_lowercase(),
    }
}
