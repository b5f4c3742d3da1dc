//! Message lookup for operation responses.

use std::collections::HashMap;

/// Table registered; `%s` is the descriptor id.
pub const TABLE_REGISTERED: &str = "SMITH_TableRegistered";
/// Default logical name for unnamed tables.
pub const DEFAULT_TABLE_NAME: &str = "SMITH_DefaultTableName";
/// Column added; `%s` is the descriptor id.
pub const COLUMN_ADDED: &str = "SMITH_ColumnAdded";
/// Column renamed for an external module; `%s` physical, `%s` logical.
pub const COLUMN_RENAMED: &str = "SMITH_ColumnRenamed";
/// Foreign key added; `%s` constraint, `%s` child, `%s` parent.
pub const FOREIGN_KEY_ADDED: &str = "SMITH_ForeignKeyAdded";
/// View created; `%s` is the descriptor id.
pub const VIEW_CREATED: &str = "SMITH_ViewCreated";
/// Computed column registered; `%s` name, `%s` descriptor id.
pub const COMPUTED_COLUMN_CREATED: &str = "SMITH_ComputedColumnCreated";
/// Window registered; `%s` name, `%s` window id, `%s` menu id.
pub const WINDOW_REGISTERED: &str = "SMITH_WindowRegistered";
/// Tab registered; `%s` name, `%s` tab id.
pub const TAB_REGISTERED: &str = "SMITH_TabRegistered";
/// Process registered; `%s` name, `%s` process id.
pub const PROCESS_REGISTERED: &str = "SMITH_ProcessRegistered";
/// Missing column descriptors added; `%s` count, `%s` table.
pub const COLUMNS_REGISTERED: &str = "SMITH_ColumnsRegistered";
/// Missing tab fields added; `%s` count, `%s` tab name.
pub const FIELDS_REGISTERED: &str = "SMITH_FieldsRegistered";

/// Looks up a message template by code and fills its `%s` placeholders.
pub trait MessageCatalog {
    /// Template for a code, if known.
    fn template(&self, code: &str) -> Option<String>;

    /// Formatted message. Unknown codes render as the code itself.
    fn message(&self, code: &str, args: &[&str]) -> String {
        match self.template(code) {
            Some(template) => substitute(&template, args),
            None => code.to_string(),
        }
    }
}

/// Built-in English messages.
#[derive(Debug, Clone)]
pub struct DefaultMessages {
    templates: HashMap<&'static str, &'static str>,
}

impl DefaultMessages {
    /// Create the built-in catalog.
    pub fn new() -> Self {
        let templates = HashMap::from([
            (TABLE_REGISTERED, "Table registered successfully with ID: %s"),
            (DEFAULT_TABLE_NAME, "new_table"),
            (COLUMN_ADDED, "Column added successfully with ID: %s"),
            (
                COLUMN_RENAMED,
                "Column renamed to %s (%s) because it belongs to a different module",
            ),
            (FOREIGN_KEY_ADDED, "Foreign key %s added from %s to %s"),
            (VIEW_CREATED, "View created successfully with ID: %s"),
            (COMPUTED_COLUMN_CREATED, "Computed column %s registered with ID: %s"),
            (WINDOW_REGISTERED, "Window %s registered with ID: %s (menu entry %s)"),
            (TAB_REGISTERED, "Tab %s registered with ID: %s"),
            (PROCESS_REGISTERED, "Process %s registered with ID: %s"),
            (COLUMNS_REGISTERED, "%s columns registered for table %s"),
            (FIELDS_REGISTERED, "%s fields registered for tab %s"),
        ]);
        Self { templates }
    }
}

impl Default for DefaultMessages {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCatalog for DefaultMessages {
    fn template(&self, code: &str) -> Option<String> {
        self.templates.get(code).map(|t| t.to_string())
    }
}

/// Replace each `%s` with the next argument, in order.
pub fn substitute(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut parts = template.split("%s");
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for part in parts {
        out.push_str(args.next().copied().unwrap_or(""));
        out.push_str(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute() {
        assert_eq!(substitute("a %s b %s", &["1", "2"]), "a 1 b 2");
        assert_eq!(substitute("%s-%s", &["x"]), "x-");
        assert_eq!(substitute("none", &["x"]), "none");
    }

    #[test]
    fn test_default_messages() {
        let messages = DefaultMessages::new();
        assert_eq!(
            messages.message(TABLE_REGISTERED, &["ABC"]),
            "Table registered successfully with ID: ABC"
        );
        assert_eq!(messages.message("Unknown_Code", &[]), "Unknown_Code");
    }
}
