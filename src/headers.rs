//! Ordered, case-insensitive header collection.

/// Request headers keyed case-insensitively, kept in insertion order.
///
/// Only a single value per header name is held: inserting a name that is
/// already present replaces its value, keeping the entry's position and the
/// spelling it was first inserted with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers<'a> {
    entries: Vec<(&'a str, &'a [u8])>,
}

impl<'a> Headers<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'a str, value: &'a [u8]) {
        match self.position(name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`Headers::insert`].
    pub fn with(mut self, name: &'a str, value: &'a [u8]) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&'a [u8]> {
        self.position(name).map(|idx| self.entries[idx].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, value)` pairs in order, names in their original case.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a [u8])> + '_ {
        self.entries.iter().copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

impl<'a> FromIterator<(&'a str, &'a [u8])> for Headers<'a> {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a [u8])>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<'a> Extend<(&'a str, &'a [u8])> for Headers<'a> {
    fn extend<I: IntoIterator<Item = (&'a str, &'a [u8])>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let headers = Headers::new().with("X-Custom", b"123");

        assert_eq!(headers.get("x-custom"), Some(&b"123"[..]));
        assert_eq!(headers.get("X-CUSTOM"), Some(&b"123"[..]));
        assert!(headers.contains("x-CuStOm"));
        assert!(!headers.contains("x-other"));
    }

    #[test]
    fn duplicate_insert_keeps_position_and_first_spelling() {
        let headers = Headers::new()
            .with("Idempotency-Key", b"first")
            .with("X-Custom", b"123")
            .with("idempotency-key", b"second");

        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("Idempotency-Key", &b"second"[..]),
                ("X-Custom", &b"123"[..]),
            ]
        );
    }

    #[test]
    fn collects_from_pairs() {
        let headers: Headers<'_> = [("A", &b"1"[..]), ("B", &b"2"[..]), ("a", &b"3"[..])]
            .into_iter()
            .collect();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(headers.get("A"), Some(&b"3"[..]));
    }
}
