//! Typed DDL statements and their SQL rendering.
//!
//! Names cannot be bound as query parameters, so every name that reaches SQL
//! text goes through [`Identifier`], which only admits plain unquoted
//! identifiers within the length limit.

use std::fmt;

use crate::error::{Error, Result};
use crate::naming::MAX_IDENTIFIER_LENGTH;
use crate::types::PhysicalType;

/// Schema every statement targets.
pub const SCHEMA: &str = "public";

/// Audit columns every physical table and view must carry.
pub const AUDIT_COLUMNS: &[&str] = &[
    "ad_client_id",
    "ad_org_id",
    "isactive",
    "created",
    "createdby",
    "updated",
    "updatedby",
];

const VARCHAR32: &str = "character varying(32)";
const CHAR1: &str = "character(1)";
const TIMESTAMP: &str = "timestamp without time zone";
const COLLATE: &str = "COLLATE pg_catalog.\"default\"";

/// A validated, unquoted SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate an identifier: `[A-Za-z_][A-Za-z0-9_]*`, at most
    /// [`MAX_IDENTIFIER_LENGTH`] characters.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_head || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::validation(format!("'{}' is not a valid identifier", name)));
        }
        if name.len() > MAX_IDENTIFIER_LENGTH {
            return Err(Error::validation(format!(
                "identifier '{}' exceeds {} characters",
                name, MAX_IDENTIFIER_LENGTH
            )));
        }
        Ok(Self(name))
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form, as the database folds unquoted names.
    pub fn folded(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render a default-value literal for a column type.
///
/// Timestamps given an empty or `null` default get `now()`. Character
/// defaults are quoted unless they already are.
pub fn default_literal(raw: Option<&str>, ty: &PhysicalType) -> Option<String> {
    let raw = raw?.trim();
    if ty.is_timestamp() && (raw.is_empty() || raw.eq_ignore_ascii_case("null")) {
        return Some("now()".to_string());
    }
    if raw.is_empty() {
        return None;
    }
    if ty.is_character() && !raw.starts_with('\'') {
        return Some(format!("'{}'", raw.replace('\'', "''")));
    }
    Some(raw.to_string())
}

fn flag_check(column: &Identifier) -> String {
    format!("CHECK ({} IN ('Y','N'))", column)
}

/// One column added to an existing table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: Identifier,
    /// Column type.
    pub ty: PhysicalType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Rendered default literal.
    pub default: Option<String>,
    /// Name of the `Y`/`N` check constraint for flag columns.
    pub check: Option<Identifier>,
}

impl ColumnSpec {
    /// A nullable column with no default.
    pub fn new(name: Identifier, ty: PhysicalType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            default: None,
            check: None,
        }
    }

    /// Set nullability.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set the default from a raw, unformatted value.
    pub fn default_value(mut self, raw: Option<&str>) -> Self {
        self.default = default_literal(raw, &self.ty);
        self
    }

    /// Attach the `Y`/`N` check constraint.
    pub fn flag_check(mut self, constraint: Identifier) -> Self {
        self.check = Some(constraint);
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.ty);
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if let Some(check) = &self.check {
            sql.push_str(&format!(" CONSTRAINT {} {}", check, flag_check(&self.name)));
        }
        sql
    }
}

/// Constraint names of a new audited table.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditConstraints {
    /// Primary key.
    pub primary_key: Identifier,
    /// Foreign key to `ad_client`.
    pub client_fk: Identifier,
    /// Foreign key to `ad_org`.
    pub org_fk: Identifier,
    /// `isactive` flag check.
    pub active_check: Identifier,
}

/// `CREATE TABLE IF NOT EXISTS` with the audit column skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    /// Table name.
    pub table: Identifier,
    /// `<table>_id` primary key column.
    pub key_column: Identifier,
    /// Constraint names.
    pub constraints: AuditConstraints,
}

impl CreateTable {
    /// Describe a new table keyed by `<table>_id`.
    pub fn audited(table: Identifier, constraints: AuditConstraints) -> Result<Self> {
        let key_column = key_column_of(table.as_str())?;
        Ok(Self {
            table,
            key_column,
            constraints,
        })
    }

    /// Columns the table is created with, in order.
    pub fn columns(&self) -> Vec<(String, PhysicalType)> {
        let mut columns = vec![(self.key_column.folded(), PhysicalType::new(VARCHAR32))];
        columns.extend(audit_column_types());
        columns
    }

    fn to_sql(&self) -> String {
        let c = &self.constraints;
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.{table} ( \
             {key} {varchar32} {collate} NOT NULL, \
             ad_client_id {varchar32} {collate} NOT NULL, \
             ad_org_id {varchar32} {collate} NOT NULL, \
             isactive {char1} {collate} NOT NULL DEFAULT 'Y'::bpchar, \
             created {timestamp} NOT NULL DEFAULT now(), \
             createdby {varchar32} {collate} NOT NULL, \
             updated {timestamp} NOT NULL DEFAULT now(), \
             updatedby {varchar32} {collate} NOT NULL, \
             CONSTRAINT {pk} PRIMARY KEY ({key}), \
             CONSTRAINT {client_fk} FOREIGN KEY (ad_client_id) {client_ref}, \
             CONSTRAINT {org_fk} FOREIGN KEY (ad_org_id) {org_ref}, \
             CONSTRAINT {chk} {check}\
             ) TABLESPACE pg_default",
            schema = SCHEMA,
            table = self.table,
            key = self.key_column,
            varchar32 = VARCHAR32,
            char1 = CHAR1,
            timestamp = TIMESTAMP,
            collate = COLLATE,
            pk = c.primary_key,
            client_fk = c.client_fk,
            client_ref = references("ad_client", "ad_client_id"),
            org_fk = c.org_fk,
            org_ref = references("ad_org", "ad_org_id"),
            chk = c.active_check,
            check = "CHECK (isactive IN ('Y','N'))",
        )
    }
}

/// `ALTER TABLE IF EXISTS ... ADD COLUMN IF NOT EXISTS`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddColumn {
    /// Owning table.
    pub table: Identifier,
    /// Column definition.
    pub column: ColumnSpec,
}

/// `ALTER TABLE IF EXISTS ... ADD CONSTRAINT ... FOREIGN KEY`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddForeignKey {
    /// Referencing table.
    pub table: Identifier,
    /// Constraint name.
    pub constraint: Identifier,
    /// Referencing column.
    pub column: Identifier,
    /// Referenced table.
    pub target_table: Identifier,
    /// Referenced column, the target's key.
    pub target_column: Identifier,
}

impl AddForeignKey {
    /// Reference `target`'s `<target>_id` key.
    pub fn to_key_of(
        table: Identifier,
        constraint: Identifier,
        column: Identifier,
        target_table: Identifier,
    ) -> Result<Self> {
        let target_column = key_column_of(target_table.as_str())?;
        Ok(Self {
            table,
            constraint,
            column,
            target_table,
            target_column,
        })
    }
}

/// `CREATE OR REPLACE VIEW ... AS <select>`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateView {
    /// View name.
    pub view: Identifier,
    /// Defining query, without a trailing semicolon.
    pub select: String,
}

impl CreateView {
    /// Describe a view over a select query.
    pub fn new(view: Identifier, select: &str) -> Result<Self> {
        let select = trim_select(select);
        if select.is_empty() {
            return Err(Error::validation("view query must not be empty"));
        }
        Ok(Self {
            view,
            select: select.to_string(),
        })
    }
}

/// A physical schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum DdlStatement {
    /// New audited table.
    CreateTable(CreateTable),
    /// New column on an existing table.
    AddColumn(AddColumn),
    /// New foreign key on an existing column.
    AddForeignKey(AddForeignKey),
    /// New or replaced view.
    CreateOrReplaceView(CreateView),
}

impl DdlStatement {
    /// Render the statement as SQL text.
    pub fn to_sql(&self) -> String {
        match self {
            DdlStatement::CreateTable(create) => create.to_sql(),
            DdlStatement::AddColumn(add) => format!(
                "ALTER TABLE IF EXISTS {}.{} ADD COLUMN IF NOT EXISTS {}",
                SCHEMA,
                add.table,
                add.column.to_sql()
            ),
            DdlStatement::AddForeignKey(fk) => format!(
                "ALTER TABLE IF EXISTS {}.{} ADD CONSTRAINT {} FOREIGN KEY ({}) {}",
                SCHEMA,
                fk.table,
                fk.constraint,
                fk.column,
                references(fk.target_table.as_str(), fk.target_column.as_str())
            ),
            DdlStatement::CreateOrReplaceView(view) => format!(
                "CREATE OR REPLACE VIEW {}.{} AS {}",
                SCHEMA, view.view, view.select
            ),
        }
    }

    /// Short statement kind, for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DdlStatement::CreateTable(_) => "create_table",
            DdlStatement::AddColumn(_) => "add_column",
            DdlStatement::AddForeignKey(_) => "add_foreign_key",
            DdlStatement::CreateOrReplaceView(_) => "create_view",
        }
    }

    /// The relation the statement changes.
    pub fn target(&self) -> &Identifier {
        match self {
            DdlStatement::CreateTable(create) => &create.table,
            DdlStatement::AddColumn(add) => &add.table,
            DdlStatement::AddForeignKey(fk) => &fk.table,
            DdlStatement::CreateOrReplaceView(view) => &view.view,
        }
    }
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// The `<table>_id` key column of a table.
pub fn key_column_of(table: &str) -> Result<Identifier> {
    Identifier::new(format!("{}_id", table))
}

/// Audit columns with their types, in creation order.
pub fn audit_column_types() -> Vec<(String, PhysicalType)> {
    AUDIT_COLUMNS
        .iter()
        .map(|name| {
            let ty = match *name {
                "isactive" => CHAR1,
                "created" | "updated" => TIMESTAMP,
                _ => VARCHAR32,
            };
            (name.to_string(), PhysicalType::new(ty))
        })
        .collect()
}

/// Strip whitespace and trailing semicolons from a select query.
pub fn trim_select(select: &str) -> &str {
    select.trim().trim_end_matches(';').trim_end()
}

fn references(table: &str, column: &str) -> String {
    format!(
        "REFERENCES {}.{} ({}) MATCH SIMPLE ON UPDATE NO ACTION ON DELETE NO ACTION",
        SCHEMA, table, column
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    #[test]
    fn test_identifier_validation() {
        assert!(Identifier::new("test_orders").is_ok());
        assert!(Identifier::new("_x1").is_ok());
        assert!(Identifier::new("1abc").is_err());
        assert!(Identifier::new("drop table;").is_err());
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("a".repeat(31)).is_err());
        assert!(Identifier::new("a".repeat(30)).is_ok());
    }

    #[test]
    fn test_default_literals() {
        let varchar = PhysicalType::new("character varying(60)");
        let stamp = PhysicalType::new("timestamp without time zone");
        let num = PhysicalType::new("numeric");

        assert_eq!(default_literal(Some("DR"), &varchar).unwrap(), "'DR'");
        assert_eq!(default_literal(Some("'DR'"), &varchar).unwrap(), "'DR'");
        assert_eq!(default_literal(Some("O'Neil"), &varchar).unwrap(), "'O''Neil'");
        assert_eq!(default_literal(Some("null"), &stamp).unwrap(), "now()");
        assert_eq!(default_literal(Some(""), &stamp).unwrap(), "now()");
        assert_eq!(default_literal(None, &stamp), None);
        assert_eq!(default_literal(Some("0"), &num).unwrap(), "0");
        assert_eq!(default_literal(Some("  "), &num), None);
    }

    #[test]
    fn test_create_table_sql() {
        let create = CreateTable::audited(
            ident("test_orders"),
            AuditConstraints {
                primary_key: ident("test_orders_pk"),
                client_fk: ident("test_orders_ad_client_fk"),
                org_fk: ident("test_orders_ad_org_fk"),
                active_check: ident("test_orders_isactive_chk"),
            },
        )
        .unwrap();
        let sql = DdlStatement::CreateTable(create.clone()).to_sql();

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS public.test_orders ( "));
        assert!(sql.contains("test_orders_id character varying(32)"));
        assert!(sql.contains("CONSTRAINT test_orders_pk PRIMARY KEY (test_orders_id)"));
        assert!(sql.contains("REFERENCES public.ad_client (ad_client_id) MATCH SIMPLE"));
        assert!(sql.contains("CONSTRAINT test_orders_isactive_chk CHECK (isactive IN ('Y','N'))"));
        assert_eq!(create.columns().len(), 1 + AUDIT_COLUMNS.len());
    }

    #[test]
    fn test_add_flag_column_sql() {
        let column = ColumnSpec::new(ident("is_paid"), PhysicalType::new("character(1)"))
            .nullable(false)
            .default_value(Some("N"))
            .flag_check(ident("TEST_orders_is_paid_chk"));
        let sql = DdlStatement::AddColumn(AddColumn {
            table: ident("test_orders"),
            column,
        })
        .to_sql();

        assert_eq!(
            sql,
            "ALTER TABLE IF EXISTS public.test_orders ADD COLUMN IF NOT EXISTS is_paid \
             character(1) NOT NULL DEFAULT 'N' CONSTRAINT TEST_orders_is_paid_chk \
             CHECK (is_paid IN ('Y','N'))"
        );
    }

    #[test]
    fn test_foreign_key_sql() {
        let fk = AddForeignKey::to_key_of(
            ident("test_lines"),
            ident("TEST_lines_orders_fk"),
            ident("test_orders_id"),
            ident("test_orders"),
        )
        .unwrap();
        let statement = DdlStatement::AddForeignKey(fk);
        assert_eq!(statement.kind(), "add_foreign_key");
        assert_eq!(statement.target().as_str(), "test_lines");
        assert_eq!(
            statement.to_sql(),
            "ALTER TABLE IF EXISTS public.test_lines ADD CONSTRAINT TEST_lines_orders_fk \
             FOREIGN KEY (test_orders_id) REFERENCES public.test_orders (test_orders_id) \
             MATCH SIMPLE ON UPDATE NO ACTION ON DELETE NO ACTION"
        );
    }

    #[test]
    fn test_view_trims_semicolon() {
        let view = CreateView::new(ident("test_summary_v"), " SELECT 1 AS x; ").unwrap();
        assert_eq!(
            DdlStatement::CreateOrReplaceView(view).to_sql(),
            "CREATE OR REPLACE VIEW public.test_summary_v AS SELECT 1 AS x"
        );
        assert!(CreateView::new(ident("v"), " ; ").is_err());
    }
}
