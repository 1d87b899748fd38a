use prost::Message as _;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use rusqlite::Connection;

use crate::{Error, ProtoDb};

/// One owned result row: its rowid, and the stored message either
/// parsed or as raw bytes. A row built for insertion carries `id == 0`
/// until the engine assigns one.
#[derive(Debug)]
pub struct ResultRow {
    pub id: i64,
    pub message: Option<DynamicMessage>,
    pub bytes: Option<Vec<u8>>,
}

impl ResultRow {
    pub fn new(message: DynamicMessage) -> Self {
        Self {
            id: 0,
            message: Some(message),
            bytes: None,
        }
    }

    // The wire encoding, serialized on first use and cached.
    fn payload(&mut self) -> &[u8] {
        let message = &self.message;
        self.bytes.get_or_insert_with(|| {
            message
                .as_ref()
                .map(|message| message.encode_to_vec())
                .unwrap_or_default()
        })
    }
}

/// Stream every row of a prepared `SELECT id, proto ...` statement
/// into `rows`. With a descriptor, blobs are parsed into messages and
/// a row which fails to decode fails the call; without one, raw bytes
/// are carried through untouched.
pub fn populate(
    rows: &mut Vec<ResultRow>,
    descriptor: Option<&MessageDescriptor>,
    stmt: &mut rusqlite::Statement<'_>,
) -> Result<(), Error> {
    let mut results = stmt.query([])?;

    while let Some(row) = results.next()? {
        let id: i64 = row.get(0)?;
        let bytes: Vec<u8> = row.get(1)?;

        let row = match descriptor {
            Some(descriptor) => ResultRow {
                id,
                message: Some(
                    DynamicMessage::decode(descriptor.clone(), bytes.as_slice())
                        .map_err(|source| Error::RowDecode { id, source })?,
                ),
                bytes: None,
            },
            None => ResultRow {
                id,
                message: None,
                bytes: Some(bytes),
            },
        };
        rows.push(row);
    }

    Ok(())
}

/// Write `input` rows to the proto table `table` in order: rows without
/// an id insert through the raw table and learn their assigned id, rows
/// with one update through the view. Rows move to `output` as they
/// land; the first failure stops the run and leaves the failed row and
/// everything after it in `input`.
pub fn write_rows(
    db: &mut ProtoDb,
    output: &mut Vec<ResultRow>,
    input: &mut Vec<ResultRow>,
    table: &str,
) -> Result<(), Error> {
    // Reserve up front so moving rows across cannot fail mid-transfer.
    output.reserve(input.len());

    let insert_sql = format!("INSERT INTO {table}_raw (proto) VALUES (?1) RETURNING id;");
    let update_sql = format!("UPDATE {table} SET proto = ?1 WHERE id = ?2;");

    let mut moved = 0;
    let mut failure = None;
    for row in input.iter_mut() {
        if let Err(err) = write_row(db.connection(), &insert_sql, &update_sql, row) {
            failure = Some(err);
            break;
        }
        db.count_writes(1);
        moved += 1;
    }

    output.extend(input.drain(..moved));
    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn write_row(
    conn: &Connection,
    insert_sql: &str,
    update_sql: &str,
    row: &mut ResultRow,
) -> Result<(), rusqlite::Error> {
    if row.id == 0 {
        let mut stmt = conn.prepare_cached(insert_sql)?;
        let id = stmt.query_row([row.payload()], |r| r.get(0))?;
        row.id = id;
    } else {
        let id = row.id;
        let mut stmt = conn.prepare_cached(update_sql)?;
        stmt.execute(rusqlite::params![row.payload(), id])?;
    }
    Ok(())
}
