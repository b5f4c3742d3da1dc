//! Window, tab, field and process registration. These touch only the catalog.

use tracing::info;

use super::{OperationPhase, OperationState, Params, Smith};
use crate::catalog::{
    new_id, CatalogBackend, Criteria, FieldDescriptor, MenuEntry, Module, ProcessDescriptor,
    TabDescriptor, WindowDescriptor,
};
use crate::ddl::SchemaGateway;
use crate::error::{Error, Result};
use crate::messages;
use crate::registrar::Registrar;
use crate::text::{capitalize, strip_prefix_ignore_case, title_words};

/// Window type of maintenance windows.
const MAINTAIN_WINDOW: &str = "M";
/// Menu action that opens a window.
const OPEN_WINDOW: &str = "W";
/// UI pattern of standard tabs.
const STANDARD_TAB: &str = "STD";
/// Access level granting every role.
const ALL_ACCESS: &str = "7";
/// UI pattern of standard processes.
const STANDARD_PROCESS: &str = "S";

impl<B: CatalogBackend, G: SchemaGateway> Smith<B, G> {
    /// Register a window and the menu entry that opens it.
    pub(super) fn register_window(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let name = params.require("Name")?;
        let prefix = params.get("DBPrefix");
        let table_id = params.get("TableID");
        if prefix.is_none() && table_id.is_none() {
            return Err(Error::validation(
                "Missing parameter, table id and prefix cannot be null.",
            ));
        }

        state.advance(OperationPhase::ResolvingContext)?;
        let mut registrar = Registrar::new(&mut self.session);
        let prefix = match (prefix, table_id) {
            (Some(prefix), _) => prefix.to_string(),
            (None, table_id) => {
                let table = registrar.table(table_id.unwrap_or_default())?;
                table
                    .db_table_name
                    .split('_')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            }
        };
        let ctx = registrar.resolve_prefix(&prefix)?;
        registrar.require_in_development(&ctx.module)?;
        registrar.data_package(&ctx.module)?;

        let window = WindowDescriptor {
            id: new_id(),
            module_id: ctx.module.id.clone(),
            name: window_name(name, &ctx.prefix),
            window_type: MAINTAIN_WINDOW.to_string(),
            description: params.get("Description").map(str::to_string),
            help: params.get("HelpComment").map(str::to_string),
        };
        let menu = MenuEntry {
            id: new_id(),
            module_id: ctx.module.id.clone(),
            name: window.name.clone(),
            action: OPEN_WINDOW.to_string(),
            window_id: Some(window.id.clone()),
            process_id: None,
            description: window.description.clone(),
        };
        registrar.session_mut().save(&window)?;
        registrar.session_mut().save(&menu)?;

        self.commit(state)?;
        info!(window = %window.name, id = %window.id, "window registered");
        Ok(self.message(
            messages::WINDOW_REGISTERED,
            &[&window.name, &window.id, &menu.id],
        ))
    }

    /// Register a tab showing a table inside a window.
    ///
    /// A table appears at most once per window. Level-0 tabs are headers.
    pub(super) fn register_tab(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let window_id = params.require("WindowID")?;
        let table_name = params.require("TableName")?;
        let tab_level: u32 = params
            .number("TabLevel")?
            .ok_or_else(|| Error::validation("TabLevel parameter is required"))?;
        let sequence: u32 = params
            .number("SequenceNumber")?
            .ok_or_else(|| Error::validation("SequenceNumber parameter is required"))?;

        state.advance(OperationPhase::ResolvingContext)?;
        let mut registrar = Registrar::new(&mut self.session);
        let mut table = registrar
            .table_by_name(table_name)?
            .ok_or_else(|| Error::not_found(format!("table '{}' not found", table_name)))?;
        let window = registrar.session().require::<WindowDescriptor>(window_id)?;
        let module = registrar.session().require::<Module>(&window.module_id)?;
        registrar.require_in_development(&module)?;

        let existing: Option<TabDescriptor> = registrar.session().find_one(
            &Criteria::new()
                .eq("window_id", window.id.as_str())
                .eq("table_id", table.id.as_str()),
        )?;
        if let Some(tab) = existing {
            return Err(Error::validation(format!(
                "tab '{}' ({}) already shows table '{}' in window '{}'",
                tab.name, tab.id, table.db_table_name, window.name
            )));
        }

        let base_name = capitalize(&table.name.replace('_', " "));
        let name = if tab_level == 0 {
            format!("{} Header", base_name)
        } else {
            base_name
        };
        let tab = TabDescriptor {
            id: new_id(),
            window_id: window.id.clone(),
            table_id: table.id.clone(),
            module_id: window.module_id.clone(),
            name,
            tab_level,
            sequence,
            ui_pattern: STANDARD_TAB.to_string(),
            description: params.get("Description").map(str::to_string),
            help: params.get("HelpComment").map(str::to_string),
        };
        table.window_id = Some(window.id.clone());
        registrar.session_mut().save(&table)?;
        registrar.session_mut().save(&tab)?;

        self.commit(state)?;
        info!(tab = %tab.name, id = %tab.id, window = %window.name, level = tab_level, "tab registered");
        Ok(self.message(messages::TAB_REGISTERED, &[&tab.name, &tab.id]))
    }

    /// Add a field to a tab for every column of its table that has none.
    ///
    /// Field names read the column name with spaces for underscores. Key
    /// fields stay hidden; the others show in the grid.
    pub(super) fn register_fields(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let tab_id = params.require("WindowTabID")?;
        let prefix = params.require("DBPrefix")?;

        state.advance(OperationPhase::ResolvingContext)?;
        let mut registrar = Registrar::new(&mut self.session);
        let tab = registrar.session().require::<TabDescriptor>(tab_id)?;
        let ctx = registrar.resolve_prefix(prefix)?;
        registrar.require_in_development(&ctx.module)?;

        let existing: Vec<FieldDescriptor> = registrar
            .session()
            .find(&Criteria::new().eq("tab_id", tab.id.as_str()))?;
        let mut columns = registrar.columns(&tab.table_id)?;
        columns.sort_by_key(|c| c.position);

        let mut added = 0usize;
        for column in columns {
            if existing.iter().any(|f| f.column_id == column.id) {
                continue;
            }
            let field = FieldDescriptor {
                id: new_id(),
                tab_id: tab.id.clone(),
                column_id: column.id.clone(),
                module_id: ctx.module.id.clone(),
                name: column.name.replace('_', " "),
                sequence: column.position,
                displayed: !column.is_key,
                show_in_grid: !column.is_key,
                description: params.get("Description").map(str::to_string),
                help: params.get("HelpComment").map(str::to_string),
            };
            registrar.session_mut().save(&field)?;
            added += 1;
        }

        self.commit(state)?;
        info!(tab = %tab.name, fields = added, "fields registered");
        Ok(self.message(
            messages::FIELDS_REGISTERED,
            &[&added.to_string(), &tab.name],
        ))
    }

    /// Register a process implemented by `<javapackage>.process.<Name>`.
    pub(super) fn register_process(&mut self, params: &Params, state: &mut OperationState) -> Result<String> {
        let java_package = params.require("Javapackage")?;
        let name = params.require("Name")?;
        let search_key = params.require("SearchKey")?;

        state.advance(OperationPhase::ResolvingContext)?;
        let mut registrar = Registrar::new(&mut self.session);
        let module: Module = registrar
            .session()
            .find_one(&Criteria::new().eq("java_package", java_package))?
            .ok_or_else(|| {
                Error::not_found(format!("no module with java package '{}'", java_package))
            })?;
        registrar.require_in_development(&module)?;

        let taken: Option<ProcessDescriptor> = registrar
            .session()
            .find_one(&Criteria::new().same_name("search_key", search_key))?;
        if taken.is_some() {
            return Err(Error::validation(format!(
                "process search key '{}' is already in use",
                search_key
            )));
        }

        let process = ProcessDescriptor {
            id: new_id(),
            module_id: module.id.clone(),
            search_key: search_key.to_string(),
            name: name.to_string(),
            java_class_name: format!("{}.process.{}", java_package, name),
            access_level: ALL_ACCESS.to_string(),
            ui_pattern: STANDARD_PROCESS.to_string(),
            description: params.get("Description").map(str::to_string),
            help: params.get("Help").map(str::to_string),
        };
        registrar.session_mut().save(&process)?;

        self.commit(state)?;
        info!(process = %process.search_key, class = %process.java_class_name, "process registered");
        Ok(self.message(messages::PROCESS_REGISTERED, &[&process.name, &process.id]))
    }
}

/// Strip the module prefix and capitalise a window name.
///
/// `test_sales_order` -> `Sales Order`, `orders` -> `Orders`.
fn window_name(name: &str, prefix: &str) -> String {
    let body = strip_prefix_ignore_case(name, &format!("{}_", prefix)).unwrap_or(name);
    if body.contains('_') {
        title_words(body)
    } else {
        capitalize(body)
    }
}
