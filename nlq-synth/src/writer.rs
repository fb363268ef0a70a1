use nlq_types::{PlaceholderStyle, SqlValue, Statement};

/// Accumulates statement text and bound values side by side so the placeholder
/// count always equals the parameter count.
pub(crate) struct SqlWriter {
    text: String,
    params: Vec<SqlValue>,
    style: PlaceholderStyle,
}

impl SqlWriter {
    pub(crate) fn new(style: PlaceholderStyle) -> Self {
        Self {
            text: String::with_capacity(128),
            params: Vec::new(),
            style,
        }
    }

    pub(crate) fn push(&mut self, sql: &str) -> &mut Self {
        self.text.push_str(sql);
        self
    }

    pub(crate) fn ident(&mut self, name: &str) -> &mut Self {
        self.text.push_str(&quote_ident(name));
        self
    }

    pub(crate) fn bind(&mut self, value: SqlValue) -> &mut Self {
        self.params.push(value);
        let token = self.style.render(self.params.len());
        self.text.push_str(&token);
        self
    }

    pub(crate) fn finish(self) -> Statement {
        Statement {
            text: self.text,
            params: self.params,
            style: self.style,
        }
    }
}

/// Double-quoted SQL identifier with embedded quotes doubled.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_placeholders_follow_bind_order() {
        let mut w = SqlWriter::new(PlaceholderStyle::Dollar);
        w.push("SELECT * FROM ")
            .ident("t")
            .push(" WHERE ")
            .ident("a")
            .push(" = ")
            .bind(SqlValue::Integer(1))
            .push(" LIMIT ")
            .bind(SqlValue::Integer(5));
        let stmt = w.finish();
        assert_eq!(stmt.text, r#"SELECT * FROM "t" WHERE "a" = $1 LIMIT $2"#);
        assert_eq!(stmt.placeholder_count(), stmt.params.len());
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }
}
