use redb::TableDefinition;

/// Notes: note_id -> Note (msgpack)
pub const NOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("notes");

/// Secondary index: owner_id -> Vec<note_id> (for listing notes by owner)
pub const OWNER_NOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_notes");
