//! Grounds phrases from a question in the catalog vocabulary.

use nlq_types::{ColumnRef, Qualifier, Vocabulary};

/// Lowercased phrase with articles stripped and `_`/`-` read as spaces.
pub(crate) fn key(phrase: &str) -> String {
    let lowered = phrase
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .to_lowercase()
        .replace(['_', '-'], " ");
    let mut words: Vec<&str> = lowered.split_whitespace().collect();
    while let Some(first) = words.first() {
        if matches!(*first, "the" | "all" | "every" | "each" | "their" | "its" | "any") {
            words.remove(0);
        } else {
            break;
        }
    }
    words.join(" ")
}

/// Same noun up to a regular plural ending.
fn same_noun(a: &str, b: &str) -> bool {
    fn plural_of(singular: &str, plural: &str) -> bool {
        plural.strip_suffix('s') == Some(singular)
            || plural.strip_suffix("es") == Some(singular)
            || matches!(
                (plural.strip_suffix("ies"), singular.strip_suffix('y')),
                (Some(p), Some(s)) if p == s
            )
    }
    a == b || plural_of(a, b) || plural_of(b, a)
}

/// A qualifier found in front of a table phrase, with the column it belongs to.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Qualified<'v> {
    pub(crate) table: &'v str,
    pub(crate) column: &'v str,
    pub(crate) qualifier: &'v Qualifier,
}

pub(crate) struct Lexicon<'v> {
    vocab: &'v Vocabulary,
}

impl<'v> Lexicon<'v> {
    pub(crate) fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }

    /// Canonical table name for `phrase`, if it names one.
    pub(crate) fn table(&self, phrase: &str) -> Option<&'v str> {
        let wanted = key(phrase);
        if wanted.is_empty() {
            return None;
        }
        self.vocab
            .tables
            .iter()
            .find(|t| {
                std::iter::once(&t.name)
                    .chain(t.aliases.iter())
                    .any(|term| same_noun(&key(term), &wanted))
            })
            .map(|t| t.name.as_str())
    }

    /// True when the text begins with a table name (one to three words),
    /// possibly after qualifiers such as "female".
    pub(crate) fn starts_with_table(&self, text: &str) -> bool {
        let (rest, qualifiers) = self.peel(text);
        if rest.is_empty() {
            return !qualifiers.is_empty();
        }
        let words: Vec<&str> = rest.split_whitespace().collect();
        (1..=words.len().min(3)).any(|n| self.table(&words[..n].join(" ")).is_some())
    }

    /// Strip leading qualifier phrases, longest first, until what remains
    /// names a table or nothing more matches.
    pub(crate) fn peel(&self, phrase: &str) -> (String, Vec<Qualified<'v>>) {
        let mut rest = key(phrase);
        let mut found = Vec::new();
        while !rest.is_empty() && self.table(&rest).is_none() {
            let mut best: Option<(usize, Qualified<'v>)> = None;
            for table in &self.vocab.tables {
                for column in &table.columns {
                    for qualifier in &column.qualifiers {
                        let wanted = key(&qualifier.phrase);
                        let hit = !wanted.is_empty()
                            && (rest == wanted || rest.starts_with(&format!("{wanted} ")));
                        if hit && best.as_ref().map_or(true, |(len, _)| wanted.len() > *len) {
                            let q = Qualified {
                                table: table.name.as_str(),
                                column: column.name.as_str(),
                                qualifier,
                            };
                            best = Some((wanted.len(), q));
                        }
                    }
                }
            }
            let Some((len, q)) = best else { break };
            rest = rest[len..].trim_start().to_string();
            found.push(q);
        }
        (rest, found)
    }

    /// Table name for `phrase`, or the cleaned phrase itself so the synthesizer
    /// can report it.
    pub(crate) fn table_or_raw(&self, phrase: &str) -> String {
        self.table(phrase)
            .map(str::to_string)
            .unwrap_or_else(|| key(phrase))
    }

    fn column_in(&self, table: &str, wanted: &str) -> Option<&'v str> {
        let terms = self.vocab.tables.iter().find(|t| t.name == table)?;
        terms
            .columns
            .iter()
            .find(|c| key(&c.name) == wanted)
            .or_else(|| {
                terms
                    .columns
                    .iter()
                    .find(|c| c.aliases.iter().any(|a| key(a) == wanted))
            })
            .map(|c| c.name.as_str())
    }

    /// Tables (in vocabulary order) that have a column called `phrase`.
    pub(crate) fn column_owners(&self, phrase: &str) -> Vec<&'v str> {
        let wanted = key(phrase);
        self.vocab
            .tables
            .iter()
            .filter(|t| self.column_in(&t.name, &wanted).is_some())
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Column reference for `phrase` within `scope`. Qualified only when the
    /// scope spans several tables and exactly one of them owns the column;
    /// ungrounded phrases pass through unchanged.
    pub(crate) fn column(&self, phrase: &str, scope: &[String]) -> ColumnRef {
        if let Some((table, column)) = phrase.split_once('.') {
            if let Some(table) = self.table(table) {
                let wanted = key(column);
                let column = self
                    .column_in(table, &wanted)
                    .map(str::to_string)
                    .unwrap_or(wanted);
                return ColumnRef::qualified(table, column);
            }
        }

        let wanted = key(phrase);
        let hits: Vec<(&str, &'v str)> = scope
            .iter()
            .filter_map(|t| self.column_in(t, &wanted).map(|c| (t.as_str(), c)))
            .collect();
        match hits.as_slice() {
            [(_, column)] if scope.len() == 1 => ColumnRef::new(*column),
            [(table, column)] => ColumnRef::qualified(*table, *column),
            _ => ColumnRef::new(wanted),
        }
    }
}
