//! The in-progress form draft and the store that owns and persists it.

use crate::errors::DraftError;
use crate::kv::{self, Storage};
use crate::models::{Category, FieldUpdate, FormState, FormStateKey, Rating, TrackingItem};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DRAFT_STORAGE_KEY: &str = "form-storage";

/// Fields whose current value survives `reset_to_defaults`.
pub const RESET_PRESERVED_FIELDS: &[FormStateKey] = &[FormStateKey::IsBipolarMode];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OfflineChanges {
    pub has_pending_changes: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormDraft {
    pub draft_date: Option<NaiveDate>,
    pub is_draft_dirty: bool,
    pub last_entry_date: Option<NaiveDate>,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub form_data: FormState,
    pub modified_fields: BTreeSet<FormStateKey>,
    pub offline_changes: OfflineChanges,
}

/// Storage shape of a `FormDraft`. `modified_fields` is kept as raw JSON so a
/// malformed value degrades to an empty set instead of failing the whole load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedDraft {
    pub draft_date: Option<NaiveDate>,
    pub is_draft_dirty: bool,
    pub last_entry_date: Option<NaiveDate>,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub form_data: FormState,
    pub modified_fields: Value,
    pub offline_changes: OfflineChanges,
}

pub fn encode(draft: &FormDraft) -> PersistedDraft {
    PersistedDraft {
        draft_date: draft.draft_date,
        is_draft_dirty: draft.is_draft_dirty,
        last_entry_date: draft.last_entry_date,
        last_sync_date: draft.last_sync_date,
        form_data: draft.form_data.clone(),
        modified_fields: Value::Array(
            draft
                .modified_fields
                .iter()
                .map(|key| Value::String(key.as_str().to_string()))
                .collect(),
        ),
        offline_changes: draft.offline_changes.clone(),
    }
}

pub fn decode(persisted: PersistedDraft) -> FormDraft {
    let modified_fields = match persisted.modified_fields {
        Value::Array(values) => values
            .iter()
            .filter_map(|value| match value.as_str().map(str::parse::<FormStateKey>) {
                Some(Ok(key)) => Some(key),
                _ => {
                    warn!("skipping unrecognised modified field {value}");
                    None
                }
            })
            .collect(),
        Value::Null => BTreeSet::new(),
        other => {
            warn!("modified fields should be an array, found {other}");
            BTreeSet::new()
        }
    };

    FormDraft {
        draft_date: persisted.draft_date,
        is_draft_dirty: persisted.is_draft_dirty,
        last_entry_date: persisted.last_entry_date,
        last_sync_date: persisted.last_sync_date,
        form_data: persisted.form_data,
        modified_fields,
        offline_changes: persisted.offline_changes,
    }
}

/// Owns the single `FormDraft` and re-persists it after every change.
///
/// `generation` moves whenever the draft is replaced wholesale (`set`,
/// `clear_draft`, `reset_to_defaults`), so work queued against an older
/// generation can tell it is stale.
pub struct DraftStore {
    storage: Arc<dyn Storage>,
    key: String,
    draft: FormDraft,
    generation: u64,
}

impl DraftStore {
    pub fn open(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let draft = decode(kv::read(storage.as_ref(), &key, PersistedDraft::default()));
        if draft.is_draft_dirty {
            info!(
                "restored unsaved draft for {} ({} modified fields)",
                draft
                    .draft_date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "an unknown date".to_string()),
                draft.modified_fields.len()
            );
        }
        Self {
            storage,
            key,
            draft,
            generation: 0,
        }
    }

    pub fn get(&self) -> &FormDraft {
        &self.draft
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set(&mut self, next: FormDraft) {
        self.draft = next;
        self.generation += 1;
        self.persist();
    }

    pub fn update<F>(&mut self, updater: F)
    where
        F: FnOnce(&FormDraft) -> FormDraft,
    {
        self.draft = updater(&self.draft);
        self.persist();
    }

    pub fn update_field(&mut self, update: FieldUpdate) -> Result<(), DraftError> {
        update.validate()?;
        let key = update.key();
        let now = Utc::now();
        let today = Local::now().date_naive();

        self.update(|prev| {
            let mut next = prev.clone();
            update.apply(&mut next.form_data);
            if !RESET_PRESERVED_FIELDS.contains(&key) {
                next.modified_fields.insert(key);
            }
            next.is_draft_dirty = true;
            next.draft_date.get_or_insert(today);
            next.offline_changes.has_pending_changes = true;
            next.offline_changes.last_modified = Some(now);
            next
        });
        debug!("updated draft field {key}");
        Ok(())
    }

    /// Applies `update` only if no wholesale replacement happened since `generation`.
    /// Returns `Ok(false)` when the update was stale and dropped.
    pub fn update_field_at(
        &mut self,
        generation: u64,
        update: FieldUpdate,
    ) -> Result<bool, DraftError> {
        if generation != self.generation {
            debug!(
                "dropping stale update to {} (generation {generation}, current {})",
                update.key(),
                self.generation
            );
            return Ok(false);
        }
        self.update_field(update)?;
        Ok(true)
    }

    pub fn add_item(&mut self, category: Category, item: TrackingItem) -> Result<(), DraftError> {
        let mut items = self.draft.form_data.items(category).to_vec();
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(DraftError::DuplicateItem {
                category,
                id: item.id,
            });
        }
        items.push(item);
        self.update_field(FieldUpdate::items(category, items))
    }

    /// Flips `completed`. Unchecking an item clears every rating on it.
    pub fn toggle_item(&mut self, category: Category, id: &str) -> Result<(), DraftError> {
        let items = self.map_item(category, id, |item| {
            item.completed = !item.completed;
            if !item.completed {
                item.clear_ratings();
            }
            Ok(())
        })?;
        self.update_field(FieldUpdate::items(category, items))
    }

    pub fn remove_item(&mut self, category: Category, id: &str) -> Result<(), DraftError> {
        let items = self.draft.form_data.items(category);
        if !items.iter().any(|item| item.id == id) {
            return Err(DraftError::ItemNotFound {
                category,
                id: id.to_string(),
            });
        }
        let items = items.iter().filter(|item| item.id != id).cloned().collect();
        self.update_field(FieldUpdate::items(category, items))
    }

    pub fn set_rating(
        &mut self,
        category: Category,
        id: &str,
        rating: Rating,
    ) -> Result<(), DraftError> {
        if rating.kind() != category.rating_kind() {
            return Err(DraftError::RatingKindMismatch {
                category,
                expected: category.rating_kind(),
                found: rating.kind(),
            });
        }
        let items = self.map_item(category, id, |item| {
            if !item.completed {
                return Err(DraftError::ItemNotCompleted {
                    category,
                    id: item.id.clone(),
                });
            }
            item.apply_rating(rating);
            Ok(())
        })?;
        self.update_field(FieldUpdate::items(category, items))
    }

    /// Replaces the draft with a fresh empty one.
    pub fn clear_draft(&mut self) {
        info!("clearing draft");
        self.set(FormDraft::default());
    }

    /// Resets the form to defaults, keeping `RESET_PRESERVED_FIELDS`.
    pub fn reset_to_defaults(&mut self) {
        let mut next = self.draft.clone();
        let mut form_data = FormState::default();
        for key in RESET_PRESERVED_FIELDS {
            form_data.copy_field(&self.draft.form_data, *key);
        }
        next.form_data = form_data;
        next.modified_fields.clear();
        next.is_draft_dirty = false;
        next.offline_changes = OfflineChanges::default();
        info!("resetting draft to defaults");
        self.set(next);
    }

    fn map_item<F>(
        &self,
        category: Category,
        id: &str,
        change: F,
    ) -> Result<Vec<TrackingItem>, DraftError>
    where
        F: FnOnce(&mut TrackingItem) -> Result<(), DraftError>,
    {
        let mut items = self.draft.form_data.items(category).to_vec();
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| DraftError::ItemNotFound {
                category,
                id: id.to_string(),
            })?;
        change(item)?;
        Ok(items)
    }

    fn persist(&self) {
        kv::write(self.storage.as_ref(), &self.key, &encode(&self.draft));
    }
}
