use crate::config::AuditRules;
use crate::error::AuditError;
use std::collections::HashMap;

/// Resolves database ids against the static name table in `AuditRules`.
///
/// An id missing from the table means the live BI tool has a database this
/// process does not know about, so lookups fail instead of guessing.
pub struct DatabaseNamer<'a> {
    names: &'a HashMap<i64, String>,
}

impl<'a> DatabaseNamer<'a> {
    pub fn new(rules: &'a AuditRules) -> Self {
        Self {
            names: &rules.databases,
        }
    }

    pub fn name(&self, db_id: i64) -> Result<&'a str, AuditError> {
        self.names
            .get(&db_id)
            .map(String::as_str)
            .ok_or(AuditError::UnknownDatabase(db_id))
    }
}
