use chrono::Utc;
use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{Note, NotePatch};
use super::tables::*;

impl Database {
    // ========================================================================
    // Note operations
    // ========================================================================

    /// Store a note, indexing it under its owner
    pub fn put_note(&self, note: &Note) -> Result<(), DatabaseError> {
        debug_assert!(!note.id.is_empty(), "note id must not be empty");
        debug_assert!(!note.owner_id.is_empty(), "note owner_id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(NOTES)?;
            let data = rmp_serde::to_vec_named(note)?;
            table.insert(note.id.as_str(), data.as_slice())?;

            let mut ids = read_owner_index(&write_txn, &note.owner_id)?;
            if !ids.contains(&note.id) {
                ids.push(note.id.clone());
                let mut index_table = write_txn.open_table(OWNER_NOTES)?;
                let index_data = rmp_serde::to_vec_named(&ids)?;
                index_table.insert(note.owner_id.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a note by id
    pub fn get_note(&self, id: &str) -> Result<Option<Note>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(NOTES)?;

        match table.get(id)? {
            Some(data) => {
                let note: Note = rmp_serde::from_slice(data.value())?;
                Ok(Some(note))
            }
            None => Ok(None),
        }
    }

    /// Apply a patch to a note owned by `owner_id`.
    ///
    /// Returns `None` when the note does not exist or belongs to someone else.
    pub fn update_note(
        &self,
        id: &str,
        owner_id: &str,
        patch: NotePatch,
    ) -> Result<Option<Note>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let updated = {
            let mut table = write_txn.open_table(NOTES)?;
            let existing: Option<Note> = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match existing {
                Some(mut note) if note.owner_id == owner_id => {
                    if let Some(title) = patch.title {
                        note.title = title;
                    }
                    if let Some(body) = patch.body {
                        note.body = body;
                    }
                    if let Some(is_public) = patch.is_public {
                        note.is_public = is_public;
                    }
                    note.updated_at = Utc::now();

                    let data = rmp_serde::to_vec_named(&note)?;
                    table.insert(id, data.as_slice())?;
                    Some(note)
                }
                _ => None,
            }
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Delete a note owned by `owner_id`. Returns whether a note was removed.
    pub fn delete_note(&self, id: &str, owner_id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let owned = {
            let table = write_txn.open_table(NOTES)?;
            let result = table.get(id)?;
            match result {
                Some(data) => {
                    let note: Note = rmp_serde::from_slice(data.value())?;
                    note.owner_id == owner_id
                }
                None => false,
            }
        };

        if owned {
            {
                let mut table = write_txn.open_table(NOTES)?;
                table.remove(id)?;
            }

            let mut ids = read_owner_index(&write_txn, owner_id)?;
            ids.retain(|v| v != id);
            let mut index_table = write_txn.open_table(OWNER_NOTES)?;
            if ids.is_empty() {
                index_table.remove(owner_id)?;
            } else {
                let index_data = rmp_serde::to_vec_named(&ids)?;
                index_table.insert(owner_id, index_data.as_slice())?;
            }
        }

        write_txn.commit()?;
        Ok(owned)
    }

    /// Notes owned by a subject, oldest first
    pub fn get_notes_by_owner(&self, owner_id: &str) -> Result<Vec<Note>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index_table = read_txn.open_table(OWNER_NOTES)?;
        let notes_table = read_txn.open_table(NOTES)?;

        let ids: Vec<String> = match index_table.get(owner_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut notes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = notes_table.get(id.as_str())? {
                let note: Note = rmp_serde::from_slice(data.value())?;
                notes.push(note);
            }
        }

        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(notes)
    }

    /// All notes flagged public, oldest first
    pub fn get_public_notes(&self) -> Result<Vec<Note>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(NOTES)?;

        let mut notes = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let note: Note = rmp_serde::from_slice(value.value())?;
            if note.is_public {
                notes.push(note);
            }
        }

        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(notes)
    }
}

fn read_owner_index(
    write_txn: &WriteTransaction,
    owner_id: &str,
) -> Result<Vec<String>, DatabaseError> {
    let index_table = write_txn.open_table(OWNER_NOTES)?;
    let ids = index_table
        .get(owner_id)?
        .map(|v| rmp_serde::from_slice(v.value()))
        .transpose()?
        .unwrap_or_default();
    Ok(ids)
}
