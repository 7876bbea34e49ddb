//! Year-grouped traversal over the residents of the active result.

use crate::models::Resident;

/// Order residents by year ascending, keeping result order within a year.
pub fn order(residents: &[Resident]) -> Vec<&Resident> {
    let mut ordered: Vec<&Resident> = residents.iter().collect();
    // stable
    ordered.sort_by_key(|r| r.resident_year);
    ordered
}

/// Prev/next navigation over [`order`]. Never wraps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidentNavigator {
    entries: Vec<(u8, String)>,
}

impl ResidentNavigator {
    pub fn from_residents(residents: &[Resident]) -> Self {
        Self {
            entries: order(residents)
                .into_iter()
                .map(|r| (r.resident_year, r.mcr.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resident ids in navigation order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, mcr)| mcr.as_str())
    }

    pub fn first(&self) -> Option<&str> {
        self.entries.first().map(|(_, mcr)| mcr.as_str())
    }

    pub fn contains(&self, mcr: &str) -> bool {
        self.position(mcr).is_some()
    }

    pub fn position(&self, mcr: &str) -> Option<usize> {
        self.entries.iter().position(|(_, m)| m == mcr)
    }

    /// The resident before `current`, or `current` itself at the start or
    /// when it is not in the list.
    pub fn prev<'a>(&'a self, current: &'a str) -> &'a str {
        match self.position(current) {
            Some(idx) if idx > 0 => &self.entries[idx - 1].1,
            _ => current,
        }
    }

    /// The resident after `current`, or `current` itself at the end or when
    /// it is not in the list.
    pub fn next<'a>(&'a self, current: &'a str) -> &'a str {
        match self.position(current) {
            Some(idx) if idx + 1 < self.entries.len() => &self.entries[idx + 1].1,
            _ => current,
        }
    }

    pub fn can_prev(&self, current: &str) -> bool {
        matches!(self.position(current), Some(idx) if idx > 0)
    }

    pub fn can_next(&self, current: &str) -> bool {
        matches!(self.position(current), Some(idx) if idx + 1 < self.entries.len())
    }

    /// Residents grouped by year, years ascending.
    pub fn grouped(&self) -> Vec<(u8, Vec<&str>)> {
        let mut groups: Vec<(u8, Vec<&str>)> = Vec::new();
        for (year, mcr) in &self.entries {
            match groups.last_mut() {
                Some((y, members)) if y == year => members.push(mcr),
                _ => groups.push((*year, vec![mcr.as_str()])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resident(mcr: &str, year: u8) -> Resident {
        Resident {
            mcr: mcr.to_string(),
            name: String::new(),
            resident_year: year,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_order_groups_by_year_stably() {
        let residents = vec![resident("B", 2), resident("A", 1)];
        let ids: Vec<&str> = order(&residents).iter().map(|r| r.mcr.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);

        let residents = vec![
            resident("Z3", 3),
            resident("Y1", 1),
            resident("X2", 2),
            resident("W1", 1),
        ];
        let nav = ResidentNavigator::from_residents(&residents);
        assert_eq!(nav.ids().collect::<Vec<_>>(), vec!["Y1", "W1", "X2", "Z3"]);
        assert_eq!(
            nav.grouped(),
            vec![(1, vec!["Y1", "W1"]), (2, vec!["X2"]), (3, vec!["Z3"])]
        );
    }

    #[test]
    fn test_prev_next_never_wrap() {
        let nav = ResidentNavigator::from_residents(&[
            resident("A", 1),
            resident("B", 1),
            resident("C", 2),
        ]);
        assert_eq!(nav.prev("A"), "A");
        assert_eq!(nav.next("C"), "C");
        assert_eq!(nav.next("A"), "B");
        assert_eq!(nav.prev("C"), "B");
        assert_eq!(nav.next("missing"), "missing");
        assert!(!nav.can_prev("A"));
        assert!(nav.can_next("A"));
        assert!(!nav.can_next("C"));
    }

    #[test]
    fn test_empty_navigator() {
        let nav = ResidentNavigator::default();
        assert!(nav.is_empty());
        assert_eq!(nav.first(), None);
        assert_eq!(nav.prev("A"), "A");
    }
}
