//! Named-placeholder SQL templates.
//!
//! A [`Template`] accumulates SQL text containing `{{name}}` placeholders across several
//! calls. Each placeholder occurrence becomes a `?` parameter slot; values can be supplied
//! inline (positionally, per call), or later by name or by 1-based position.
//!
//! ```rust
//! use sql_template::prelude::*;
//!
//! # fn demo() -> SqlResult<()> {
//! let mut t = Template::new();
//! t.sql("select * from users");
//! t.sql_with("where status={{status}}", ["active"])?;
//! t.sql("and team={{team}}").bind_name("team", 42);
//!
//! assert_eq!(t.render(), "select * from users where status=? and team=?");
//! assert_eq!(
//!     t.resolved_values(),
//!     vec![SqlValue::Text("active".into()), SqlValue::Int(42)]
//! );
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod scanner;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::driver::Statement;
use crate::error::{SqlResult, SqlTemplateError};
use crate::types::{SqlValue, ToSqlValue};

/// Key a bound value is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindKey {
    /// The placeholder's literal name.
    Name(String),
    /// The placeholder's 1-based ordinal across the whole template.
    Position(usize),
}

/// Callback applied to the prepared statement after table-driven binds.
pub type DeferredBinding = Box<dyn FnMut(&mut dyn Statement) -> SqlResult<()>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fragment {
    Text(String),
    Param,
}

impl Fragment {
    fn as_str(&self) -> &str {
        match self {
            Fragment::Text(text) => text,
            Fragment::Param => "?",
        }
    }
}

/// SQL text under construction, with its parameter slots and bound values.
#[derive(Default)]
pub struct Template {
    fragments: Vec<Fragment>,
    param_names: Vec<String>,
    bindings: HashMap<BindKey, SqlValue>,
    deferred: Vec<DeferredBinding>,
}

impl Template {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Its placeholders stay unbound.
    pub fn sql(&mut self, text: &str) -> &mut Self {
        self.push_text(text, VecDeque::new());
        self
    }

    /// Append a fragment, binding `values` in order to its placeholders.
    ///
    /// Fewer values than placeholders is fine; the rest can be bound later.
    ///
    /// # Errors
    /// Returns `BindArity` (and leaves the template untouched) when more values are supplied
    /// than `text` has placeholders.
    pub fn sql_with<I, V>(&mut self, text: &str, values: I) -> SqlResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        let values: VecDeque<SqlValue> = values.into_iter().map(|v| v.to_sql_value()).collect();
        let expected = scanner::count_placeholders(text);
        if values.len() > expected {
            return Err(SqlTemplateError::BindArity {
                expected,
                actual: values.len(),
                sql: text.to_string(),
            });
        }
        self.push_text(text, values);
        Ok(self)
    }

    /// Bind the placeholder at 1-based `position`, replacing any earlier value.
    pub fn bind(&mut self, position: usize, value: impl ToSqlValue) -> &mut Self {
        self.bindings
            .insert(BindKey::Position(position), value.to_sql_value());
        self
    }

    /// Bind every placeholder called `name`, replacing any earlier value.
    pub fn bind_name(&mut self, name: impl Into<String>, value: impl ToSqlValue) -> &mut Self {
        self.bindings
            .insert(BindKey::Name(name.into()), value.to_sql_value());
        self
    }

    /// Register a callback that binds directly against the prepared statement.
    ///
    /// Deferred callbacks run after the value for each parameter slot is bound, so a
    /// template with `n` slots invokes every callback `n` times (and never when it has none).
    pub fn bind_deferred<F>(&mut self, binding: F) -> &mut Self
    where
        F: FnMut(&mut dyn Statement) -> SqlResult<()> + 'static,
    {
        self.deferred.push(Box::new(binding));
        self
    }

    fn push_text(&mut self, text: &str, mut values: VecDeque<SqlValue>) {
        let mut rest = text;
        while let Some(found) = scanner::split_first(rest) {
            self.fragments.push(Fragment::Text(found.prefix.to_string()));
            self.add_param(found.name, values.pop_front());
            rest = found.suffix;
        }
        self.fragments.push(Fragment::Text(rest.to_string()));
    }

    fn add_param(&mut self, name: &str, value: Option<SqlValue>) {
        self.param_names.push(name.to_string());
        self.fragments.push(Fragment::Param);
        if let Some(value) = value {
            self.bindings
                .insert(BindKey::Position(self.param_names.len()), value);
        }
    }

    /// Render the accumulated fragments as one SQL string with `?` parameters.
    ///
    /// Fragments are trimmed and joined by a single space, except that no space is added
    /// when the text so far is blank or already ends in a space, and a `?` directly follows
    /// a trailing `=` or `,`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut sql = String::new();
        for fragment in &self.fragments {
            let fragment = fragment.as_str().trim();
            let add_blank = if sql.trim().is_empty()
                || sql.ends_with(' ')
                || fragment.starts_with(' ')
            {
                false
            } else if fragment.starts_with('?') {
                !(sql.ends_with('=') || sql.ends_with(','))
            } else {
                true
            };
            if add_blank {
                sql.push(' ');
            }
            sql.push_str(fragment);
        }
        sql.trim().to_string()
    }

    /// Placeholder names in slot order. A name used twice appears twice.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_names.len()
    }

    #[must_use]
    pub fn bindings(&self) -> &HashMap<BindKey, SqlValue> {
        &self.bindings
    }

    #[must_use]
    pub fn binding(&self, key: &BindKey) -> Option<&SqlValue> {
        self.bindings.get(key)
    }

    /// Value for the 1-based slot `position`: by name first, then by position, else NULL.
    fn resolve(&self, position: usize) -> SqlValue {
        self.param_names
            .get(position - 1)
            .and_then(|name| self.bindings.get(&BindKey::Name(name.clone())))
            .or_else(|| self.bindings.get(&BindKey::Position(position)))
            .cloned()
            .unwrap_or(SqlValue::Null)
    }

    /// Values in bind order, as [`bind_to`](Template::bind_to) would apply them.
    #[must_use]
    pub fn resolved_values(&self) -> Vec<SqlValue> {
        (1..=self.param_names.len())
            .map(|position| self.resolve(position))
            .collect()
    }

    /// Bind every slot into `statement`, running the deferred bindings after each one.
    ///
    /// # Errors
    /// Returns the first failure raised by the statement or a deferred binding.
    pub fn bind_to(&mut self, statement: &mut dyn Statement) -> SqlResult<()> {
        for position in 1..=self.param_names.len() {
            let value = self.resolve(position);
            statement.bind(position, value)?;

            for deferred in &mut self.deferred {
                deferred(&mut *statement)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("sql", &self.render())
            .field("param_names", &self.param_names)
            .field("bindings", &self.bindings)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}
