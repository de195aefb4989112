//! # SQL Module
//!
//! Assembly of statement text and positional arguments for the detected
//! driver: identifier quoting and `?` / `$n` placeholders.

use sqlx::any::AnyArguments;

use crate::{
    database::Drivers,
    errors::{Error, Result},
    value::Value,
};

/// Quotes an identifier for `driver`.
///
/// Dotted names (`posts.title`) are quoted part by part; `*` and expressions
/// containing parentheses or spaces (`COUNT(*)`, `title AS t`) are left as is.
pub(crate) fn quote_identifier(driver: Drivers, name: &str) -> String {
    let name = name.trim();
    if name == "*" || name.contains('(') || name.contains(' ') {
        return name.to_string();
    }
    let quote = match driver {
        Drivers::MySQL => '`',
        Drivers::Postgres | Drivers::SQLite => '"',
    };
    name.split('.')
        .map(|part| {
            if part == "*" {
                part.to_string()
            } else {
                let escaped = part.replace(quote, &format!("{quote}{quote}"));
                format!("{quote}{escaped}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Accumulates statement text together with its bound arguments.
pub(crate) struct SqlWriter {
    driver: Drivers,
    sql: String,
    args: AnyArguments<'static>,
    bound: usize,
}

impl SqlWriter {
    pub(crate) fn new(driver: Drivers) -> Self {
        Self { driver, sql: String::new(), args: AnyArguments::default(), bound: 0 }
    }

    pub(crate) fn driver(&self) -> Drivers {
        self.driver
    }

    pub(crate) fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    pub(crate) fn push_identifier(&mut self, name: &str) -> &mut Self {
        let quoted = quote_identifier(self.driver, name);
        self.sql.push_str(&quoted);
        self
    }

    /// Appends a placeholder and binds `value` to it.
    pub(crate) fn push_value(&mut self, value: &Value) -> Result<&mut Self> {
        value.bind(&mut self.args)?;
        self.bound += 1;
        self.push_placeholder();
        Ok(self)
    }

    /// Appends a comma separated list of placeholders bound to `values`.
    pub(crate) fn push_values(&mut self, values: &[Value]) -> Result<&mut Self> {
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_value(value)?;
        }
        Ok(self)
    }

    /// Appends a raw fragment, binding `values` to its `?` placeholders in
    /// order.
    pub(crate) fn push_raw(&mut self, fragment: &str, values: &[Value]) -> Result<&mut Self> {
        let expected = fragment.matches('?').count();
        if expected != values.len() {
            return Err(Error::Encode(format!(
                "raw fragment `{}` expects {} bindings, got {}",
                fragment,
                expected,
                values.len()
            )));
        }
        let mut values = values.iter();
        for ch in fragment.chars() {
            if ch == '?' {
                if let Some(value) = values.next() {
                    self.push_value(value)?;
                    continue;
                }
            }
            self.sql.push(ch);
        }
        Ok(self)
    }

    pub(crate) fn finish(self) -> (String, AnyArguments<'static>) {
        (self.sql, self.args)
    }

    fn push_placeholder(&mut self) {
        match self.driver {
            Drivers::Postgres => {
                self.sql.push('$');
                self.sql.push_str(&self.bound.to_string());
            }
            Drivers::MySQL | Drivers::SQLite => self.sql.push('?'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted_per_driver() {
        assert_eq!(quote_identifier(Drivers::SQLite, "posts.title"), "\"posts\".\"title\"");
        assert_eq!(quote_identifier(Drivers::MySQL, "title"), "`title`");
        assert_eq!(quote_identifier(Drivers::Postgres, "COUNT(*)"), "COUNT(*)");
        assert_eq!(quote_identifier(Drivers::Postgres, "posts.*"), "\"posts\".*");
    }

    #[test]
    fn raw_fragments_are_renumbered_for_postgres() -> Result<()> {
        let mut writer = SqlWriter::new(Drivers::Postgres);
        writer.push("WHERE ").push_value(&Value::Int(1))?;
        writer.push(" AND ").push_raw("age > ? OR age < ?", &[Value::Int(60), Value::Int(18)])?;
        let (sql, _) = writer.finish();
        assert_eq!(sql, "WHERE $1 AND age > $2 OR age < $3");
        Ok(())
    }

    #[test]
    fn raw_fragment_binding_count_must_match() {
        let mut writer = SqlWriter::new(Drivers::SQLite);
        assert!(writer.push_raw("a = ? AND b = ?", &[Value::Int(1)]).is_err());
    }
}
