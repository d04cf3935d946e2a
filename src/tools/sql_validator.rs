//! SQL Validation
//!
//! Static checks on a candidate query: syntax, mutating/administrative
//! keywords, and table/column existence against the schema. All three checks
//! run and their errors accumulate in discovery order.

use crate::models::{DatabaseSchema, ValidationResult};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use sqlparser::ast::{
    Expr, Ident, ObjectName, Query, SelectItem, SetExpr, Statement, TableFactor, Visit, Visitor,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::{debug, warn};

pub const INVALID_SYNTAX: &str = "Invalid Syntax";
pub const NO_SCHEMA: &str = "No schema available for validation";

const DANGEROUS_KEYWORDS: [&str; 9] = [
    "DROP", "DELETE", "TRUNCATE", "ALTER", "UPDATE", "GRANT", "REVOKE", "EXEC", "INSERT",
];

const SUGGESTION_THRESHOLD: f64 = 0.8;

lazy_static! {
    static ref DANGEROUS_PATTERNS: Vec<Regex> = DANGEROUS_KEYWORDS
        .iter()
        .filter_map(|keyword| Regex::new(&format!(r"(?i)\b{}\b", keyword)).ok())
        .collect();
}

/// A failed schema check: the error message and, when a close match exists,
/// a hint naming the schema identifier that was probably meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub error: String,
    pub suggestion: Option<String>,
}

impl SchemaIssue {
    fn plain(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            suggestion: None,
        }
    }
}

/// Tables and columns referenced by a query, in first-seen order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryReferences {
    pub tables: Vec<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlValidator;

impl SqlValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, query: &str, schema: &DatabaseSchema) -> ValidationResult {
        let mut errors = Vec::new();
        let mut suggestion = None;

        if let Err(e) = self.check_syntax(query) {
            errors.push(e);
        }

        if let Err(e) = self.check_dangerous_patterns(query) {
            errors.push(e);
        }

        if let Err(issue) = self.check_schema_compatibility(query, schema) {
            errors.push(issue.error);
            suggestion = issue.suggestion;
        }

        if !errors.is_empty() {
            debug!("Query failed validation: {}", errors.join("; "));
        }

        ValidationResult::from_checks(errors, Vec::new(), suggestion)
    }

    pub fn check_syntax(&self, query: &str) -> Result<(), String> {
        parse(query).map(|_| ()).ok_or_else(|| INVALID_SYNTAX.to_string())
    }

    /// Whole-word, case-insensitive keyword scan over the raw text. String
    /// literals and comments are scanned too.
    pub fn check_dangerous_patterns(&self, query: &str) -> Result<(), String> {
        for pattern in DANGEROUS_PATTERNS.iter() {
            if let Some(m) = pattern.find(query) {
                return Err(format!("Dangerous operation: {}", m.as_str()));
            }
        }
        Ok(())
    }

    /// Every referenced table must exist; every referenced column must exist
    /// in some table of the schema.
    pub fn check_schema_compatibility(
        &self,
        query: &str,
        schema: &DatabaseSchema,
    ) -> Result<(), SchemaIssue> {
        if schema.is_empty() {
            warn!("No schema provided for validation");
            return Err(SchemaIssue::plain(NO_SCHEMA));
        }

        let references =
            extract_references(query).ok_or_else(|| SchemaIssue::plain(INVALID_SYNTAX))?;

        if let Some(table) = references.tables.iter().find(|t| !schema.has_table(t)) {
            return Err(SchemaIssue {
                error: format!("Table '{}' doesn't exist in the schema", table),
                suggestion: closest_match(table, schema.table_names()),
            });
        }

        if let Some(column) = references.columns.iter().find(|c| !schema.has_column(c)) {
            return Err(SchemaIssue {
                error: format!("Column '{}' doesn't exist in the schema", column),
                suggestion: closest_match(column, schema.column_names().into_iter()),
            });
        }

        Ok(())
    }
}

/// Exactly one statement; anything else cannot be executed as a single query.
fn parse(query: &str) -> Option<Vec<Statement>> {
    match Parser::parse_sql(&GenericDialect {}, query) {
        Ok(statements) if statements.len() == 1 => Some(statements),
        Ok(statements) => {
            debug!("Expected one SQL statement, found {}", statements.len());
            None
        }
        Err(e) => {
            debug!("SQL parsing failed: {}", e);
            None
        }
    }
}

/// Walks the parsed query and returns the base tables and columns it
/// references. CTE names, CTE column lists, derived-table column lists and
/// SELECT aliases are local to the query and excluded. Qualified columns keep
/// only their last part.
pub fn extract_references(query: &str) -> Option<QueryReferences> {
    let statements = parse(query)?;
    let mut collector = ReferenceCollector::default();
    for statement in &statements {
        let _ = statement.visit(&mut collector);
    }
    Some(collector.finish())
}

#[derive(Default)]
struct ReferenceCollector {
    relations: Vec<String>,
    identifiers: Vec<String>,
    local_tables: HashSet<String>,
    local_columns: HashSet<String>,
}

impl ReferenceCollector {
    /// Records the names a query declares for itself. The visitor has no hook
    /// for nested queries, so every entry point that holds a `Query` calls
    /// this, and CTE bodies are followed from here.
    fn note_query(&mut self, query: &Query) {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.local_tables.insert(cte.alias.name.value.to_lowercase());
                self.note_columns(&cte.alias.columns);
                self.note_query(&cte.query);
            }
        }
        self.collect_aliases(&query.body);
    }

    fn note_columns(&mut self, columns: &[Ident]) {
        for column in columns {
            self.local_columns.insert(column.value.to_lowercase());
        }
    }

    fn collect_aliases(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => {
                for item in &select.projection {
                    if let SelectItem::ExprWithAlias { alias, .. } = item {
                        self.local_columns.insert(alias.value.to_lowercase());
                    }
                }
            }
            SetExpr::Query(query) => self.note_query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.collect_aliases(left);
                self.collect_aliases(right);
            }
            _ => {}
        }
    }

    fn finish(self) -> QueryReferences {
        let local_tables = self.local_tables;
        let local_columns = self.local_columns;
        QueryReferences {
            tables: self
                .relations
                .into_iter()
                .filter(|t| !local_tables.contains(&t.to_lowercase()))
                .unique_by(|t| t.to_lowercase())
                .collect(),
            columns: self
                .identifiers
                .into_iter()
                .filter(|c| !local_columns.contains(&c.to_lowercase()))
                .unique_by(|c| c.to_lowercase())
                .collect(),
        }
    }
}

impl Visitor for ReferenceCollector {
    type Break = ();

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        if let Statement::Query(query) = statement {
            self.note_query(query);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let TableFactor::Derived {
            subquery, alias, ..
        } = table_factor
        {
            self.note_query(subquery);
            if let Some(alias) = alias {
                self.note_columns(&alias.columns);
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if let Some(ident) = relation.0.last() {
            self.relations.push(ident.value.clone());
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        match expr {
            Expr::Identifier(ident) => self.identifiers.push(ident.value.clone()),
            Expr::CompoundIdentifier(parts) => {
                if let Some(ident) = parts.last() {
                    self.identifiers.push(ident.value.clone());
                }
            }
            Expr::Subquery(subquery)
            | Expr::ArraySubquery(subquery)
            | Expr::Exists { subquery, .. }
            | Expr::InSubquery { subquery, .. } => self.note_query(subquery),
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

fn closest_match<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    let needle = name.to_lowercase();
    candidates
        .map(|candidate| (candidate, strsim::jaro_winkler(&needle, &candidate.to_lowercase())))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(candidate, _)| format!("Did you mean '{}' instead of '{}'?", candidate, name))
}
