use dashmap::DashMap;

pub type UserId = u64;

/// Per-user "items per page" preference. The only cross-request mutable
/// state in the navigator: read at the start of a render, written only on an
/// explicit override, last write wins.
#[derive(Debug)]
pub struct PreferenceStore {
    per_page: DashMap<UserId, usize>,
    default_per_page: usize,
}

impl PreferenceStore {
    pub fn new(default_per_page: usize) -> Self {
        PreferenceStore {
            per_page: DashMap::new(),
            default_per_page: default_per_page.max(1),
        }
    }

    /// Resolves the effective page size: explicit request override first,
    /// then the stored preference, then the configured default. An override
    /// is persisted for subsequent requests.
    pub fn resolve_per_page(&self, user: UserId, requested: Option<usize>) -> usize {
        match requested {
            Some(n) => {
                let n = n.max(1);
                self.per_page.insert(user, n);
                n
            }
            None => self
                .per_page
                .get(&user)
                .map(|entry| *entry)
                .unwrap_or(self.default_per_page),
        }
    }
}
