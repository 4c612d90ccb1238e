//! Referrer host reconciliation.
//!
//! A referrer sensor's form submits an ordered list of host rows. Each row is
//! either new, or refers to a stored host and may be flagged for removal.
//! [`plan`] turns those rows plus the currently stored hosts into a
//! [`HostPlan`]: the creates, updates and deletes needed to make storage
//! match the form. Nothing here touches storage; callers commit the plan
//! together with the sensor's own fields.
//!
//! # Invariants
//!
//! - Decisions are deterministic given the same inputs
//! - A stored host not referenced by a destroy-flagged row is never deleted
//! - Duplicate host strings are kept as separate hosts
//! - Any invalid row rejects the whole plan

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use snowfinch_id::{HostId, IdError};
use snowfinch_model::{FieldError, ValidationErrors, MAX_HOST_LEN};
use thiserror::Error;

/// A host as currently stored for a sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHost {
    pub id: HostId,
    pub host: String,
}

impl StoredHost {
    pub fn new(id: HostId, host: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
        }
    }
}

/// One host row exactly as it arrives from the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub destroy: bool,
}

impl SubmittedRow {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            id: None,
            host: host.into(),
            destroy: false,
        }
    }

    pub fn existing(id: HostId, host: impl Into<String>, destroy: bool) -> Self {
        Self {
            id: Some(id.to_string()),
            host: host.into(),
            destroy,
        }
    }

    /// Converts the wire row into a typed row.
    ///
    /// A row with no id that is flagged for destroy was never persisted and
    /// yields `None`. A blank id counts as no id.
    pub fn to_row(&self) -> Result<Option<HostRow>, IdError> {
        let id = match self.id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<HostId>()?),
        };

        Ok(match (id, self.destroy) {
            (None, true) => None,
            (None, false) => Some(HostRow::New {
                host: self.host.clone(),
            }),
            (Some(id), destroy) => Some(HostRow::Existing {
                id,
                host: self.host.clone(),
                destroy,
            }),
        })
    }
}

/// A typed host row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRow {
    New {
        host: String,
    },
    Existing {
        id: HostId,
        host: String,
        destroy: bool,
    },
}

/// Reasons a submitted row cannot be reconciled.
///
/// `index` is the row's position among the rows that take part in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("row {index}: host is blank")]
    BlankHost { index: usize },

    #[error("row {index}: host exceeds {max} characters", max = MAX_HOST_LEN)]
    HostTooLong { index: usize },

    #[error("row {index}: host {id} does not belong to this sensor")]
    UnknownHost { index: usize, id: HostId },

    #[error("row {index}: host {id} is referenced more than once")]
    DuplicateReference { index: usize, id: HostId },

    #[error("row {index}: invalid host id: {source}")]
    InvalidHostId {
        index: usize,
        #[source]
        source: IdError,
    },
}

impl ReconcileError {
    pub fn index(&self) -> usize {
        match self {
            Self::BlankHost { index }
            | Self::HostTooLong { index }
            | Self::UnknownHost { index, .. }
            | Self::DuplicateReference { index, .. }
            | Self::InvalidHostId { index, .. } => *index,
        }
    }

    /// The error as shown above the form.
    pub fn to_field_error(&self) -> FieldError {
        let index = self.index();
        match self {
            Self::BlankHost { .. } => {
                FieldError::blank(&format!("hosts[{index}][host]"), "Referrer host")
            }
            Self::HostTooLong { .. } => FieldError::new(
                format!("hosts[{index}][host]"),
                format!("Referrer host is too long (maximum is {MAX_HOST_LEN} characters)"),
            ),
            Self::UnknownHost { .. } => FieldError::new(
                format!("hosts[{index}][id]"),
                "Referrer host is not part of this sensor",
            ),
            Self::DuplicateReference { .. } => FieldError::new(
                format!("hosts[{index}][id]"),
                "Referrer host is listed more than once",
            ),
            Self::InvalidHostId { .. } => {
                FieldError::new(format!("hosts[{index}][id]"), "Referrer host id is invalid")
            }
        }
    }
}

/// Converts reconcile errors into form validation errors.
pub fn to_validation_errors(errors: &[ReconcileError]) -> ValidationErrors {
    let mut out = ValidationErrors::new();
    out.extend(errors.iter().map(ReconcileError::to_field_error));
    out
}

/// New value for a stored host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUpdate {
    pub id: HostId,
    pub host: String,
}

/// Storage operations that bring a sensor's hosts in line with its form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPlan {
    /// Host strings to insert, in submission order.
    pub create: Vec<String>,
    /// Stored hosts whose value changed.
    pub update: Vec<HostUpdate>,
    /// Stored hosts to delete.
    pub delete: Vec<HostId>,
}

impl HostPlan {
    /// A plan that removes every stored host.
    pub fn delete_all(current: &[StoredHost]) -> Self {
        Self {
            delete: current.iter().map(|h| h.id).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    /// Number of hosts left after applying the plan to `current_len` hosts.
    pub fn resulting_len(&self, current_len: usize) -> usize {
        current_len.saturating_sub(self.delete.len()) + self.create.len()
    }

    /// Applies the plan to an in-memory host list.
    ///
    /// Survivors keep their order; created hosts are appended in plan order
    /// with ids from `mint`. Plan entries for ids missing from `current` are
    /// skipped, so a plan built by [`plan`] against the same `current` is
    /// always applied in full.
    pub fn apply(&self, current: &[StoredHost], mut mint: impl FnMut() -> HostId) -> Vec<StoredHost> {
        let deleted: BTreeSet<HostId> = self.delete.iter().copied().collect();
        let updated: BTreeMap<HostId, &str> = self
            .update
            .iter()
            .map(|u| (u.id, u.host.as_str()))
            .collect();

        let mut hosts: Vec<StoredHost> = current
            .iter()
            .filter(|h| !deleted.contains(&h.id))
            .map(|h| match updated.get(&h.id) {
                Some(host) => StoredHost::new(h.id, *host),
                None => h.clone(),
            })
            .collect();

        hosts.extend(self.create.iter().map(|host| StoredHost::new(mint(), host.clone())));
        hosts
    }
}

/// Plans typed rows against the stored hosts.
///
/// Error indexes are positions in `rows`.
pub fn plan(current: &[StoredHost], rows: &[HostRow]) -> Result<HostPlan, Vec<ReconcileError>> {
    plan_indexed(current, rows.iter().enumerate())
}

/// Parses wire rows and plans them in one step.
///
/// Error indexes count only the rows that take part: unsaved rows flagged
/// for destroy are skipped without using up an index. This is the same
/// numbering a rejected form is re-rendered with. A sensor being created
/// has no stored hosts; pass an empty slice.
pub fn plan_submission(
    current: &[StoredHost],
    submitted: &[SubmittedRow],
) -> Result<HostPlan, Vec<ReconcileError>> {
    let mut errors = Vec::new();
    let mut rows = Vec::with_capacity(submitted.len());
    let mut index = 0;

    for row in submitted {
        match row.to_row() {
            Ok(Some(row)) => rows.push((index, row)),
            Ok(None) => continue,
            Err(source) => errors.push(ReconcileError::InvalidHostId { index, source }),
        }
        index += 1;
    }

    match plan_indexed(current, rows.iter().map(|(index, row)| (*index, row))) {
        Ok(plan) if errors.is_empty() => Ok(plan),
        Ok(_) => Err(errors),
        Err(more) => {
            errors.extend(more);
            errors.sort_by_key(ReconcileError::index);
            Err(errors)
        }
    }
}

fn plan_indexed<'a>(
    current: &[StoredHost],
    rows: impl IntoIterator<Item = (usize, &'a HostRow)>,
) -> Result<HostPlan, Vec<ReconcileError>> {
    let stored: BTreeMap<HostId, &str> =
        current.iter().map(|h| (h.id, h.host.as_str())).collect();
    let mut seen = BTreeSet::new();
    let mut errors = Vec::new();
    let mut plan = HostPlan::default();

    for (index, row) in rows {
        match row {
            HostRow::New { host } => {
                if let Some(host) = check_host(index, host, &mut errors) {
                    plan.create.push(host);
                }
            }
            HostRow::Existing { id, host, destroy } => {
                let Some(stored_host) = stored.get(id) else {
                    errors.push(ReconcileError::UnknownHost { index, id: *id });
                    continue;
                };
                if !seen.insert(*id) {
                    errors.push(ReconcileError::DuplicateReference { index, id: *id });
                    continue;
                }

                if *destroy {
                    plan.delete.push(*id);
                } else if let Some(host) = check_host(index, host, &mut errors) {
                    if host != *stored_host {
                        plan.update.push(HostUpdate { id: *id, host });
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(plan)
    } else {
        Err(errors)
    }
}

fn check_host(index: usize, host: &str, errors: &mut Vec<ReconcileError>) -> Option<String> {
    let host = host.trim();
    if host.is_empty() {
        errors.push(ReconcileError::BlankHost { index });
        None
    } else if host.chars().count() > MAX_HOST_LEN {
        errors.push(ReconcileError::HostTooLong { index });
        None
    } else {
        Some(host.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn stored(hosts: &[&str]) -> Vec<StoredHost> {
        hosts.iter().map(|h| StoredHost::new(HostId::new(), *h)).collect()
    }

    fn host_values(hosts: &[StoredHost]) -> Vec<&str> {
        hosts.iter().map(|h| h.host.as_str()).collect()
    }

    #[test]
    fn test_new_sensor_rows_removed_before_submit_never_persist() {
        // The third row was added and removed client-side; it arrives
        // flagged without an id, or not at all.
        let submitted = vec![
            SubmittedRow::new("facebook.com"),
            SubmittedRow::new("twitter.com"),
            SubmittedRow {
                id: None,
                host: "snowfinch.net".to_string(),
                destroy: true,
            },
        ];

        let plan = plan_submission(&[], &submitted).unwrap();
        assert_eq!(plan.create, vec!["facebook.com", "twitter.com"]);
        assert!(plan.update.is_empty());
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_edit_update_remove_and_add() {
        let current = stored(&["facebook.co", "twitter.com", "myspace.com"]);
        let rows = vec![
            HostRow::Existing {
                id: current[0].id,
                host: "facebook.com".to_string(),
                destroy: false,
            },
            HostRow::Existing {
                id: current[1].id,
                host: "twitter.com".to_string(),
                destroy: false,
            },
            HostRow::Existing {
                id: current[2].id,
                host: "myspace.com".to_string(),
                destroy: true,
            },
            HostRow::New {
                host: "jaiku.com".to_string(),
            },
        ];

        let plan = plan(&current, &rows).unwrap();
        assert_eq!(
            plan.update,
            vec![HostUpdate {
                id: current[0].id,
                host: "facebook.com".to_string()
            }]
        );
        assert_eq!(plan.delete, vec![current[2].id]);
        assert_eq!(plan.create, vec!["jaiku.com"]);

        let result = plan.apply(&current, HostId::new);
        assert_eq!(
            host_values(&result),
            vec!["facebook.com", "twitter.com", "jaiku.com"]
        );
        assert_eq!(result[0].id, current[0].id);
        assert_eq!(plan.resulting_len(current.len()), 3);
    }

    #[test]
    fn test_duplicate_host_strings_are_not_merged() {
        let current = stored(&["facebook.com"]);
        let rows = vec![
            HostRow::Existing {
                id: current[0].id,
                host: "facebook.com".to_string(),
                destroy: false,
            },
            HostRow::New {
                host: "facebook.com".to_string(),
            },
            HostRow::New {
                host: "facebook.com".to_string(),
            },
        ];

        let plan = plan(&current, &rows).unwrap();
        let result = plan.apply(&current, HostId::new);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|h| h.host == "facebook.com"));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t")]
    fn test_blank_host_is_rejected(#[case] host: &str) {
        let current = stored(&["twitter.com"]);
        let submitted = vec![
            SubmittedRow::new("facebook.com"),
            SubmittedRow::existing(current[0].id, host, false),
        ];

        let errors = plan_submission(&current, &submitted).unwrap_err();
        assert_eq!(errors, vec![ReconcileError::BlankHost { index: 1 }]);
        assert_eq!(errors[0].to_field_error().message, "Referrer host can't be blank");
    }

    #[test]
    fn test_blank_host_on_destroyed_row_is_ignored() {
        let current = stored(&["myspace.com"]);
        let submitted = vec![SubmittedRow::existing(current[0].id, "", true)];

        let plan = plan_submission(&current, &submitted).unwrap();
        assert_eq!(plan.delete, vec![current[0].id]);
    }

    #[test]
    fn test_hosts_are_trimmed_and_unchanged_rows_skip_update() {
        let current = stored(&["twitter.com"]);
        let submitted = vec![
            SubmittedRow::existing(current[0].id, " twitter.com ", false),
            SubmittedRow::new("  jaiku.com"),
        ];

        let plan = plan_submission(&current, &submitted).unwrap();
        assert!(plan.update.is_empty());
        assert_eq!(plan.create, vec!["jaiku.com"]);
    }

    #[test]
    fn test_unknown_and_duplicate_references() {
        let current = stored(&["twitter.com"]);
        let stranger = HostId::new();
        let submitted = vec![
            SubmittedRow::existing(current[0].id, "twitter.com", false),
            SubmittedRow::existing(current[0].id, "twitter.com", true),
            SubmittedRow::existing(stranger, "evil.com", false),
        ];

        let errors = plan_submission(&current, &submitted).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ReconcileError::DuplicateReference {
                    index: 1,
                    id: current[0].id
                },
                ReconcileError::UnknownHost {
                    index: 2,
                    id: stranger
                },
            ]
        );
    }

    #[test]
    fn test_existing_rows_on_new_sensor_are_unknown() {
        let submitted = vec![SubmittedRow::existing(HostId::new(), "facebook.com", false)];
        let errors = plan_submission(&[], &submitted).unwrap_err();
        assert!(matches!(errors[0], ReconcileError::UnknownHost { index: 0, .. }));
    }

    #[test]
    fn test_invalid_id_collected_with_other_errors() {
        let submitted = vec![
            SubmittedRow {
                id: Some("sns_01HV4Z2WQXKJNM8GPQY6VBKC3D".to_string()),
                host: "facebook.com".to_string(),
                destroy: false,
            },
            SubmittedRow::new(""),
        ];

        let errors = plan_submission(&[], &submitted).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ReconcileError::InvalidHostId { index: 0, .. }));
        assert_eq!(errors[1], ReconcileError::BlankHost { index: 1 });

        let validation = to_validation_errors(&errors);
        assert!(validation.has_field("hosts[0][id]"));
        assert!(validation.has_field("hosts[1][host]"));
    }

    #[test]
    fn test_blank_id_counts_as_new_row() {
        let row = SubmittedRow {
            id: Some(" ".to_string()),
            host: "jaiku.com".to_string(),
            destroy: false,
        };
        assert_eq!(
            row.to_row().unwrap(),
            Some(HostRow::New {
                host: "jaiku.com".to_string()
            })
        );
    }

    #[test]
    fn test_discarded_rows_do_not_shift_error_indexes() {
        let submitted = vec![
            SubmittedRow {
                id: None,
                host: "snowfinch.net".to_string(),
                destroy: true,
            },
            SubmittedRow::new(""),
        ];

        let errors = plan_submission(&[], &submitted).unwrap_err();
        assert_eq!(errors, vec![ReconcileError::BlankHost { index: 0 }]);
        assert!(to_validation_errors(&errors).has_field("hosts[0][host]"));
    }

    #[test]
    fn test_resulting_len_never_underflows() {
        let plan = HostPlan {
            delete: vec![HostId::new(), HostId::new()],
            create: vec!["jaiku.com".to_string()],
            ..HostPlan::default()
        };
        assert_eq!(plan.resulting_len(1), 1);
        assert_eq!(plan.resulting_len(5), 4);
    }

    #[test]
    fn test_delete_all() {
        let current = stored(&["a.com", "b.com"]);
        let plan = HostPlan::delete_all(&current);
        assert!(plan.apply(&current, HostId::new).is_empty());
    }

    #[test]
    fn test_submitted_row_deserializes_with_defaults() {
        let row: SubmittedRow = serde_json::from_str(r#"{"host":"facebook.com"}"#).unwrap();
        assert_eq!(row, SubmittedRow::new("facebook.com"));
    }

    #[derive(Debug, Clone, Copy)]
    enum Action {
        Keep,
        Rename,
        Destroy,
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![Just(Action::Keep), Just(Action::Rename), Just(Action::Destroy)]
    }

    proptest! {
        #[test]
        fn prop_apply_matches_form(
            actions in proptest::collection::vec(action(), 0..8),
            new_hosts in proptest::collection::vec("[a-z]{1,8}\\.com", 0..5),
        ) {
            let current: Vec<StoredHost> = (0..actions.len())
                .map(|i| StoredHost::new(HostId::new(), format!("host{i}.com")))
                .collect();

            let mut rows = Vec::new();
            let mut expected = Vec::new();
            for (host, action) in current.iter().zip(&actions) {
                match action {
                    Action::Keep => {
                        rows.push(HostRow::Existing { id: host.id, host: host.host.clone(), destroy: false });
                        expected.push(host.host.clone());
                    }
                    Action::Rename => {
                        let renamed = format!("renamed-{}", host.host);
                        rows.push(HostRow::Existing { id: host.id, host: renamed.clone(), destroy: false });
                        expected.push(renamed);
                    }
                    Action::Destroy => {
                        rows.push(HostRow::Existing { id: host.id, host: host.host.clone(), destroy: true });
                    }
                }
            }
            for host in &new_hosts {
                rows.push(HostRow::New { host: host.clone() });
                expected.push(host.clone());
            }

            let plan = plan(&current, &rows).unwrap();
            let result = plan.apply(&current, HostId::new);
            let got: Vec<String> = result.iter().map(|h| h.host.clone()).collect();

            prop_assert_eq!(got, expected);
            prop_assert_eq!(result.len(), plan.resulting_len(current.len()));

            let destroyed: BTreeSet<HostId> = plan.delete.iter().copied().collect();
            for host in &current {
                let survived = result.iter().any(|h| h.id == host.id);
                prop_assert_eq!(survived, !destroyed.contains(&host.id));
            }
        }
    }
}
