//! Placeholder translation between the portable `?` form and each engine.

use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::types::SqlValue;

/// The SQL engine behind a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL: numbered `$n` placeholders.
    Postgres,
    /// SQLite: positional `?` placeholders.
    Sqlite,
}

impl Dialect {
    /// Pick the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> AppResult<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(AppError::configuration(format!(
                "Unsupported database URL scheme: {url}"
            )))
        }
    }

    /// Auto-incrementing primary key column type.
    pub fn primary_key(&self) -> &'static str {
        match self {
            Self::Postgres => "BIGSERIAL PRIMARY KEY",
            Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }

    /// Rewrite `?` placeholders for this engine.
    ///
    /// Placeholders inside single-quoted literals are left alone. A
    /// placeholder whose parameter is [`SqlValue::Null`] is replaced by the
    /// literal `NULL` and its parameter dropped, so only non-null values are
    /// bound. Returns the rewritten statement and the parameters to bind.
    pub fn translate<'p>(
        &self,
        sql: &str,
        params: &'p [SqlValue],
    ) -> AppResult<(String, Vec<&'p SqlValue>)> {
        let mut out = String::with_capacity(sql.len() + params.len() * 2);
        let mut bound = Vec::with_capacity(params.len());
        let mut next = 0usize;
        let mut in_literal = false;

        for ch in sql.chars() {
            match ch {
                '\'' => {
                    in_literal = !in_literal;
                    out.push(ch);
                }
                '?' if !in_literal => {
                    let param = params.get(next).ok_or_else(|| {
                        AppError::internal(format!(
                            "Statement has more placeholders than the {} parameters given",
                            params.len()
                        ))
                    })?;
                    next += 1;

                    if matches!(param, SqlValue::Null) {
                        out.push_str("NULL");
                        continue;
                    }

                    bound.push(param);
                    match self {
                        Self::Postgres => {
                            out.push('$');
                            out.push_str(&bound.len().to_string());
                        }
                        Self::Sqlite => out.push('?'),
                    }
                }
                _ => out.push(ch),
            }
        }

        if next != params.len() {
            return Err(AppError::internal(format!(
                "Statement has {next} placeholders but {} parameters were given",
                params.len()
            )));
        }

        Ok((out, bound))
    }
}
