//! Static table definitions for the forum schema.
//!
//! All DDL text originates here - single source of truth. The order of
//! [`tables`] is load-bearing: every table must appear after every table
//! it references by foreign key, because the engine issues CREATE
//! statements strictly in this order.

use std::collections::HashSet;

use crate::error::{Result, SchemaError};

/// Auto-incrementing integer primary key, per backend.
#[cfg(feature = "sqlite")]
const PRIMARY_KEY: &str = "INTEGER PRIMARY KEY AUTOINCREMENT";

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
const PRIMARY_KEY: &str = "SERIAL PRIMARY KEY";

/// A single column: name plus its SQL type/definition fragment.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub definition: String,
}

/// An ordered table definition with table-level constraints.
///
/// Specs are built once at process start and never mutated; they only
/// live for the duration of the evolution pass.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
    pub constraints: Vec<String>,
}

/// A column that postdates the initial release and is applied additively.
#[derive(Debug, Clone, Copy)]
pub struct FutureColumn {
    pub table: &'static str,
    pub column: &'static str,
    pub definition: &'static str,
}

fn col(name: &'static str, definition: impl Into<String>) -> ColumnSpec {
    ColumnSpec {
        name,
        definition: definition.into(),
    }
}

/// The forum tables in dependency order:
/// users -> questions -> answers -> {answer_votes, answer_comments}.
pub fn tables() -> Vec<TableSpec> {
    vec![
        TableSpec {
            name: "users",
            columns: vec![
                col("userid", PRIMARY_KEY),
                col("username", "VARCHAR(20) NOT NULL"),
                col("firstname", "VARCHAR(20) NOT NULL"),
                col("lastname", "VARCHAR(20) NOT NULL"),
                col("email", "VARCHAR(40) NOT NULL"),
                col("password", "VARCHAR(100) NOT NULL"),
                col("profile_pic", "TEXT DEFAULT NULL"),
            ],
            constraints: vec![],
        },
        TableSpec {
            name: "questions",
            columns: vec![
                col("questionid", PRIMARY_KEY),
                col(
                    "userid",
                    "INTEGER REFERENCES users(userid) ON DELETE SET NULL",
                ),
                col("title", "VARCHAR(200) NOT NULL"),
                col("description", "VARCHAR(400) NOT NULL"),
                col("tag", "VARCHAR(50)"),
                col("createdate", "TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP"),
                col("views", "INTEGER DEFAULT 0"),
            ],
            constraints: vec![],
        },
        TableSpec {
            name: "answers",
            columns: vec![
                col("answerid", PRIMARY_KEY),
                col(
                    "userid",
                    "INTEGER REFERENCES users(userid) ON DELETE SET NULL",
                ),
                col(
                    "questionid",
                    "INTEGER NOT NULL REFERENCES questions(questionid) ON DELETE CASCADE",
                ),
                col("answer", "VARCHAR(400) NOT NULL"),
                col("createdate", "TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP"),
                col("views", "INTEGER DEFAULT 0"),
                col("edited", "BOOLEAN DEFAULT FALSE"),
                col("updated_at", "TIMESTAMP NULL DEFAULT NULL"),
            ],
            constraints: vec![],
        },
        TableSpec {
            name: "answer_votes",
            columns: vec![
                col("voteid", PRIMARY_KEY),
                col(
                    "answerid",
                    "INTEGER NOT NULL REFERENCES answers(answerid) ON DELETE CASCADE",
                ),
                col(
                    "userid",
                    "INTEGER REFERENCES users(userid) ON DELETE SET NULL",
                ),
                col("vote", "SMALLINT NOT NULL"),
                col("created_at", "TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP"),
            ],
            constraints: vec!["CONSTRAINT unique_vote UNIQUE (answerid, userid)".to_string()],
        },
        TableSpec {
            name: "answer_comments",
            columns: vec![
                col("commentid", PRIMARY_KEY),
                col(
                    "answerid",
                    "INTEGER NOT NULL REFERENCES answers(answerid) ON DELETE CASCADE",
                ),
                col(
                    "userid",
                    "INTEGER REFERENCES users(userid) ON DELETE SET NULL",
                ),
                col("comment", "TEXT NOT NULL"),
                col("created_at", "TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP"),
            ],
            constraints: vec![],
        },
    ]
}

/// Columns added after the initial release, applied through the additive
/// migrator. `profile_pic` is deliberately absent: the users CREATE is
/// authoritative for it.
pub fn future_columns() -> Vec<FutureColumn> {
    vec![
        FutureColumn {
            table: "users",
            column: "password_reset_token",
            definition: "VARCHAR(255) NULL",
        },
        FutureColumn {
            table: "users",
            column: "token_expiry",
            definition: "TIMESTAMPTZ NULL",
        },
    ]
}

impl TableSpec {
    /// Render the conditional CREATE statement for this table.
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.definition))
            .collect();
        parts.extend(self.constraints.iter().cloned());
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            self.name,
            parts.join(",\n  ")
        )
    }

    /// Tables this spec references by foreign key.
    pub fn references(&self) -> Vec<String> {
        let mut targets = Vec::new();
        for fragment in self
            .columns
            .iter()
            .map(|c| c.definition.as_str())
            .chain(self.constraints.iter().map(|c| c.as_str()))
        {
            let mut rest = fragment;
            while let Some(idx) = rest.find("REFERENCES ") {
                rest = &rest[idx + "REFERENCES ".len()..];
                let target: String = rest
                    .chars()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
                    .collect();
                if !target.is_empty() && !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        targets
    }
}

/// Check that every table appears after all of its foreign-key targets.
///
/// SQLite tolerates forward references in conditional DDL until DML time,
/// so this check is the mechanism that makes a misordered registry fail
/// loudly instead of surfacing later as a confusing runtime error.
pub fn verify_dependency_order(specs: &[TableSpec]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for spec in specs {
        for reference in spec.references() {
            if !seen.contains(reference.as_str()) {
                return Err(SchemaError::OrderViolation {
                    table: spec.name.to_string(),
                    reference,
                });
            }
        }
        seen.insert(spec.name);
    }
    Ok(())
}
