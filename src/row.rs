// Row: zero-copy view over one tokenized record
// Record: owned snapshot that can outlive the iteration step
//
// A Row borrows the reader's line text and span buffer, so the borrow checker
// ends its life at the next `try_read_record` call. Anything that must be kept
// goes through `to_record` (optionally interned) or `snapshot_into`.

use crate::core::{needs_copy, resolve_field, write_resolved, FieldKind, FieldSpan};
use crate::options::CsvOptions;
use std::borrow::Cow;
use std::ops::Index;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct Row<'r> {
    line: &'r str,
    spans: &'r [FieldSpan],
    options: &'r CsvOptions,
    line_number: u64,
}

impl<'r> Row<'r> {
    pub(crate) fn new(
        line: &'r str,
        spans: &'r [FieldSpan],
        options: &'r CsvOptions,
        line_number: u64,
    ) -> Self {
        Row {
            line,
            spans,
            options,
            line_number,
        }
    }

    /// Number of fields. Empty fields always count.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Physical line number the record starts on.
    #[inline]
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// The logical line the fields were cut from.
    pub fn line(&self) -> &'r str {
        self.line
    }

    /// Field value with quotes resolved. Borrowed unless escapes forced a copy.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Cow<'r, str>> {
        let span = self.spans.get(index)?;
        Some(resolve_field(self.line, span, self.options.quote()))
    }

    /// Field bytes as they appear in the line, quotes not resolved.
    #[inline]
    pub fn raw(&self, index: usize) -> Option<&'r str> {
        self.spans.get(index).map(|span| span.raw(self.line))
    }

    pub fn kind(&self, index: usize) -> Option<FieldKind> {
        self.spans.get(index).map(|span| span.kind)
    }

    pub fn spans(&self) -> &'r [FieldSpan] {
        self.spans
    }

    /// True when reading `index` would allocate.
    pub fn needs_copy(&self, index: usize) -> bool {
        self.spans
            .get(index)
            .is_some_and(|span| needs_copy(self.line, span, self.options.quote()))
    }

    pub fn iter(&self) -> impl Iterator<Item = Cow<'r, str>> + 'r {
        let line = self.line;
        let spans = self.spans;
        let quote = self.options.quote();
        spans.iter().map(move |span| resolve_field(line, span, quote))
    }

    /// `(index, value)` pairs as a mapping layer sees them: empty fields are
    /// dropped when `skip_empty_fields` is set. Indices keep their positions.
    pub fn mapped_fields(&self) -> impl Iterator<Item = (usize, Cow<'r, str>)> + 'r {
        let skip_empty = self.options.skip_empty_fields();
        self.iter()
            .enumerate()
            .filter(move |(_, value)| !(skip_empty && value.is_empty()))
    }

    /// Materialize into owned strings, interned through the options' pool.
    pub fn to_record(&self) -> Record {
        let quote = self.options.quote();
        let fields = match self.options.string_pool() {
            Some(pool) => self
                .spans
                .iter()
                .map(|span| pool.get_or_add(&resolve_field(self.line, span, quote)))
                .collect(),
            None => self
                .spans
                .iter()
                .map(|span| Arc::from(&*resolve_field(self.line, span, quote)))
                .collect(),
        };
        Record {
            fields,
            line_number: self.line_number,
        }
    }

    /// Overwrite `dest` with this row's values, reusing its strings.
    pub fn snapshot_into(&self, dest: &mut Vec<String>) {
        let quote = self.options.quote();
        dest.truncate(self.spans.len());
        for (index, span) in self.spans.iter().enumerate() {
            match dest.get_mut(index) {
                Some(slot) => {
                    slot.clear();
                    write_resolved(self.line, span, quote, slot);
                }
                None => {
                    let mut value = String::with_capacity(span.len());
                    write_resolved(self.line, span, quote, &mut value);
                    dest.push(value);
                }
            }
        }
    }
}

/// Owned record, safe to keep indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<Arc<str>>,
    line_number: u64,
}

impl Record {
    pub fn new(fields: Vec<Arc<str>>, line_number: u64) -> Self {
        Record {
            fields,
            line_number,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| &**f)
    }

    /// The shared instance behind a field (for pooling checks).
    pub fn get_shared(&self, index: usize) -> Option<&Arc<str>> {
        self.fields.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| &**f)
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn fields(&self) -> &[Arc<str>] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Arc<str>> {
        self.fields
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    /// Position of a header name, for header records.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.iter().position(|field| field == name)
    }
}

impl Index<usize> for Record {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.fields[index]
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, Arc<str>>, fn(&'a Arc<str>) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter().map(field_str as fn(&'a Arc<str>) -> &'a str)
    }
}

fn field_str(field: &Arc<str>) -> &str {
    field
}

impl<S: AsRef<str>> PartialEq<[S]> for Record {
    fn eq(&self, other: &[S]) -> bool {
        self.fields.len() == other.len()
            && self.fields.iter().zip(other).all(|(a, b)| &**a == b.as_ref())
    }
}

impl<S: AsRef<str>, const N: usize> PartialEq<[S; N]> for Record {
    fn eq(&self, other: &[S; N]) -> bool {
        *self == other[..]
    }
}
