//! Filterable, selectable projection of the cached employee list.

use shared::domain::{Employee, EmployeeId};
use tracing::{debug, warn};

use crate::{api::ApiClient, error::FetchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Selected(EmployeeId),
    /// Empty roster or a reference that is not in the current view. The
    /// previous selection is kept.
    NoSelection,
}

/// Rows the UI should render, in cache order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterView {
    pub filter: String,
    pub rows: Vec<Employee>,
    pub selected: Option<EmployeeId>,
    pub total: usize,
}

#[derive(Debug, Default)]
pub struct EmployeeRoster {
    cache: Vec<Employee>,
    filter: String,
    visible: Vec<usize>,
    selected: Option<EmployeeId>,
}

impl EmployeeRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches a fresh list. On error nothing local changes.
    pub async fn load(&mut self, api: &dyn ApiClient, token: &str) -> Result<usize, FetchError> {
        match api.list_employees(token).await {
            Ok(employees) => {
                self.replace(employees);
                Ok(self.cache.len())
            }
            Err(err) => {
                warn!(error = %err, "employee list refresh failed; keeping cached roster");
                Err(err)
            }
        }
    }

    /// Swaps the cache, keeps the active filter and clears the selection.
    pub fn replace(&mut self, employees: Vec<Employee>) {
        self.cache = employees;
        self.selected = None;
        self.recompute();
        debug!(
            total = self.cache.len(),
            visible = self.visible.len(),
            "roster replaced"
        );
    }

    pub fn filter(&mut self, substring: &str) {
        self.filter = substring.to_string();
        self.recompute();
        if let Some(id) = self.selected {
            if !self.is_visible(id) {
                self.selected = None;
            }
        }
    }

    pub fn select(&mut self, id: EmployeeId) -> Selection {
        if self.is_visible(id) {
            self.selected = Some(id);
            Selection::Selected(id)
        } else {
            debug!(employee_id = id.0, "selection ignored; employee not in view");
            Selection::NoSelection
        }
    }

    pub fn selected(&self) -> Option<&Employee> {
        let id = self.selected?;
        self.cache.iter().find(|employee| employee.id == id)
    }

    pub fn is_selected(&self, id: EmployeeId) -> bool {
        self.selected == Some(id)
    }

    pub fn visible(&self) -> impl Iterator<Item = &Employee> + '_ {
        self.visible.iter().map(|index| &self.cache[*index])
    }

    pub fn filter_text(&self) -> &str {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn snapshot(&self) -> RosterView {
        RosterView {
            filter: self.filter.clone(),
            rows: self.visible().cloned().collect(),
            selected: self.selected,
            total: self.cache.len(),
        }
    }

    fn is_visible(&self, id: EmployeeId) -> bool {
        self.visible().any(|employee| employee.id == id)
    }

    fn recompute(&mut self) {
        let needle = self.filter.to_lowercase();
        self.visible = self
            .cache
            .iter()
            .enumerate()
            .filter(|(_, employee)| {
                needle.is_empty() || employee.name.to_lowercase().contains(&needle)
            })
            .map(|(index, _)| index)
            .collect();
    }
}

#[cfg(test)]
#[path = "tests/roster_tests.rs"]
mod tests;
