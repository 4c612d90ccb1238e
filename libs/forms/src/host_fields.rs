use snowfinch_reconcile::{StoredHost, SubmittedRow};
use thiserror::Error;

/// Client-side handle for a row. Stable for the lifetime of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(u32);

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("no host row {0}")]
    UnknownRow(RowKey),

    #[error("host row {0} was never saved")]
    NotPersisted(RowKey),
}

/// What happened to a removed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The row was never saved and is gone.
    Discarded,
    /// The row is hidden but still submitted so the server deletes it.
    MarkedForDestroy,
}

/// One referrer host row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostField {
    key: RowKey,
    /// Hidden `id` field; the client echoes it back without interpreting it.
    id: Option<String>,
    host: String,
    destroy: bool,
}

impl HostField {
    pub fn key(&self) -> RowKey {
        self.key
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_marked_for_destroy(&self) -> bool {
        self.destroy
    }

    fn to_submitted(&self) -> SubmittedRow {
        SubmittedRow {
            id: self.id.clone(),
            host: self.host.clone(),
            destroy: self.destroy,
        }
    }
}

/// Ordered referrer host rows of one sensor form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFieldList {
    rows: Vec<HostField>,
    next_key: u32,
}

impl HostFieldList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for the edit form of a saved sensor.
    pub fn from_hosts(hosts: &[StoredHost]) -> Self {
        let mut list = Self::new();
        for host in hosts {
            list.push(Some(host.id.to_string()), host.host.clone(), false);
        }
        list
    }

    /// Rows exactly as the user left them, for re-rendering a rejected form.
    ///
    /// Rows that were never saved and are flagged for destroy were not
    /// visible when the form was submitted, so they are left out.
    pub fn from_submitted(rows: &[SubmittedRow]) -> Self {
        let mut list = Self::new();
        for row in rows {
            let id = row.id.clone().filter(|id| !id.trim().is_empty());
            if id.is_none() && row.destroy {
                continue;
            }
            list.push(id, row.host.clone(), row.destroy);
        }
        list
    }

    fn push(&mut self, id: Option<String>, host: String, destroy: bool) -> RowKey {
        let key = RowKey(self.next_key);
        self.next_key += 1;
        self.rows.push(HostField {
            key,
            id,
            host,
            destroy,
        });
        key
    }

    fn row_mut(&mut self, key: RowKey) -> Result<&mut HostField, FormError> {
        self.rows
            .iter_mut()
            .find(|row| row.key == key)
            .ok_or(FormError::UnknownRow(key))
    }

    /// Appends an empty row ("Add a referrer").
    pub fn add_row(&mut self) -> RowKey {
        self.push(None, String::new(), false)
    }

    pub fn set_host(&mut self, key: RowKey, host: impl Into<String>) -> Result<(), FormError> {
        self.row_mut(key)?.host = host.into();
        Ok(())
    }

    /// Removes a row ("remove").
    ///
    /// Unsaved rows are dropped outright. Saved rows are flagged so the
    /// server deletes the stored host.
    pub fn remove_row(&mut self, key: RowKey) -> Result<Removal, FormError> {
        let row = self.row_mut(key)?;
        if row.is_persisted() {
            row.destroy = true;
            return Ok(Removal::MarkedForDestroy);
        }
        self.rows.retain(|row| row.key != key);
        Ok(Removal::Discarded)
    }

    /// Clears the destroy flag of a saved row (unchecking "remove").
    pub fn restore_row(&mut self, key: RowKey) -> Result<(), FormError> {
        let row = self.row_mut(key)?;
        if !row.is_persisted() {
            return Err(FormError::NotPersisted(key));
        }
        row.destroy = false;
        Ok(())
    }

    pub fn get(&self, key: RowKey) -> Option<&HostField> {
        self.rows.iter().find(|row| row.key == key)
    }

    /// The n-th visible row, counting from zero.
    pub fn visible_key(&self, n: usize) -> Option<RowKey> {
        self.visible_rows().nth(n).map(HostField::key)
    }

    /// All rows, including hidden ones flagged for destroy.
    pub fn rows(&self) -> &[HostField] {
        &self.rows
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &HostField> {
        self.rows.iter().filter(|row| !row.destroy)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The rows to submit, in order.
    pub fn payload(&self) -> Vec<SubmittedRow> {
        self.rows.iter().map(HostField::to_submitted).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowfinch_id::HostId;

    #[test]
    fn test_add_fill_remove_before_submit() {
        let mut list = HostFieldList::new();

        let facebook = list.add_row();
        list.set_host(facebook, "facebook.com").unwrap();
        let twitter = list.add_row();
        list.set_host(twitter, "twitter.com").unwrap();
        let snowfinch = list.add_row();
        list.set_host(snowfinch, "snowfinch.net").unwrap();

        assert_eq!(list.remove_row(snowfinch).unwrap(), Removal::Discarded);
        assert!(list.get(snowfinch).is_none());

        let payload = list.payload();
        assert_eq!(
            payload,
            vec![
                SubmittedRow::new("facebook.com"),
                SubmittedRow::new("twitter.com"),
            ]
        );
    }

    #[test]
    fn test_removing_saved_row_marks_it() {
        let hosts = vec![
            StoredHost::new(HostId::new(), "twitter.com"),
            StoredHost::new(HostId::new(), "myspace.com"),
        ];
        let mut list = HostFieldList::from_hosts(&hosts);
        let myspace = list.visible_key(1).unwrap();

        assert_eq!(list.remove_row(myspace).unwrap(), Removal::MarkedForDestroy);
        assert_eq!(list.len(), 2);
        assert_eq!(list.visible_rows().count(), 1);

        let payload = list.payload();
        assert_eq!(payload[1], SubmittedRow::existing(hosts[1].id, "myspace.com", true));

        list.restore_row(myspace).unwrap();
        assert_eq!(list.visible_rows().count(), 2);
    }

    #[test]
    fn test_restore_unsaved_row_is_an_error() {
        let mut list = HostFieldList::new();
        let key = list.add_row();
        assert_eq!(list.restore_row(key), Err(FormError::NotPersisted(key)));
    }

    #[test]
    fn test_unknown_row() {
        let mut list = HostFieldList::new();
        let key = list.add_row();
        list.remove_row(key).unwrap();
        assert_eq!(list.set_host(key, "x"), Err(FormError::UnknownRow(key)));
        assert_eq!(list.remove_row(key), Err(FormError::UnknownRow(key)));
    }

    #[test]
    fn test_keys_are_not_reused() {
        let mut list = HostFieldList::new();
        let first = list.add_row();
        list.remove_row(first).unwrap();
        let second = list.add_row();
        assert_ne!(first, second);
    }

    #[test]
    fn test_from_submitted_keeps_user_input() {
        let id = HostId::new();
        let rows = vec![
            SubmittedRow::existing(id, "", false),
            SubmittedRow::existing(HostId::new(), "myspace.com", true),
            SubmittedRow {
                id: None,
                host: "gone.com".to_string(),
                destroy: true,
            },
            SubmittedRow::new("jaiku.com"),
        ];

        let list = HostFieldList::from_submitted(&rows);
        assert_eq!(list.len(), 3);
        assert_eq!(list.rows()[0].host(), "");
        assert_eq!(list.rows()[0].id(), Some(id.to_string().as_str()));
        assert!(list.rows()[1].is_marked_for_destroy());
        assert!(!list.rows()[2].is_persisted());
    }
}
