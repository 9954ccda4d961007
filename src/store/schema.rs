//! SQLite schema of the bot database: users, their track library and the
//! sessions saved at shutdown.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

// =============================================================================
// Version 1 - Users and their library
// =============================================================================

const USERS_TABLE_V1: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACKS_TABLE_V1: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("author", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_tracks_user", "user_id")],
    unique_constraints: &[&["user_id", "url"]],
};

// =============================================================================
// Version 2 - Track duration and saved sessions
// =============================================================================

const TRACKS_TABLE_V2: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("author", &SqlType::Text, non_null = true),
        sqlite_column!("duration", &SqlType::Integer),
    ],
    indices: &[("idx_tracks_user", "user_id")],
    unique_constraints: &[&["user_id", "url"]],
};

const SAVED_POOLS_TABLE_V2: Table = Table {
    name: "saved_pools",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("message_id", &SqlType::Integer),
        sqlite_column!("page", &SqlType::Integer, non_null = true),
        sqlite_column!("callback_name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const SAVED_POOL_FK: ForeignKey = ForeignKey {
    foreign_table: "saved_pools",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const LIBRARY_TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::SetNull,
};

/// Rows are read back in rowid order, which is the order tracks had in their pool.
const SAVED_TRACKS_TABLE_V2: Table = Table {
    name: "saved_tracks",
    columns: &[
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("author", &SqlType::Text, non_null = true),
        sqlite_column!("duration", &SqlType::Integer),
        sqlite_column!(
            "saved_track_id",
            &SqlType::Integer,
            foreign_key = Some(&LIBRARY_TRACK_FK)
        ),
        sqlite_column!("sequence_key", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "pool_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SAVED_POOL_FK)
        ),
    ],
    indices: &[("idx_saved_tracks_pool", "pool_id")],
    unique_constraints: &[],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute("ALTER TABLE tracks ADD COLUMN duration INTEGER", [])?;
    SAVED_POOLS_TABLE_V2.create(conn)?;
    SAVED_TRACKS_TABLE_V2.create(conn)?;
    Ok(())
}

pub const BOT_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[USERS_TABLE_V1, TRACKS_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[
            USERS_TABLE_V1,
            TRACKS_TABLE_V2,
            SAVED_POOLS_TABLE_V2,
            SAVED_TRACKS_TABLE_V2,
        ],
        migration: Some(migrate_v1_to_v2),
    },
];
