//! Ordered list of the backends this build knows about.

use crate::driver::DriverFactory;

pub struct DriverCatalog {
    entries: Vec<Box<dyn DriverFactory>>,
}

impl DriverCatalog {
    /// Entries are tried in the given order when no preference matches.
    pub fn new(entries: Vec<Box<dyn DriverFactory>>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_handle(&self, index: usize) -> Option<&dyn DriverFactory> {
        self.entries.get(index).map(|entry| entry.as_ref())
    }

    pub fn find_ident(&self, index: usize) -> Option<&'static str> {
        self.entries.get(index).map(|entry| entry.ident())
    }

    /// Case-insensitive lookup by ident
    pub fn find_index(&self, ident: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.ident().eq_ignore_ascii_case(ident))
    }

    /// All idents joined with `|`, for selection UIs
    pub fn options(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.ident())
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn DriverFactory> {
        self.entries.iter().map(|entry| entry.as_ref())
    }

    /// Indices in the order a mode-set should try them: the preferred
    /// driver first, then everything else in catalog order.
    pub fn preference_order(&self, preferred: Option<usize>) -> Vec<usize> {
        let mut order: Vec<usize> = preferred.into_iter().collect();
        order.extend((0..self.entries.len()).filter(|&i| Some(i) != preferred));
        order
    }
}
