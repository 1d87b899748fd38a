use rusqlite::Connection;

use crate::Error;

/// Writes counted between commit cycles when no explicit batch size is
/// configured.
pub const DEFAULT_BATCH_SIZE: u64 = 20_000;

/// A SQLite connection with reentrant transaction framing and write
/// batching for bulk ingestion.
///
/// `tx_begin`/`tx_end` frames nest: only the outermost pair touches the
/// engine. `batch_begin`/`batch_end` open *autocommit* frames, held for
/// write throughput rather than atomicity, and while every open frame
/// is an autocommit frame the batcher is free to cycle the transaction
/// (COMMIT and immediately BEGIN again) whenever counted writes cross
/// the batch size. A single plain frame anywhere in the stack pins the
/// transaction open, so callers relying on read-your-writes semantics
/// are never broken by a mid-batch commit.
pub struct ProtoDb {
    conn: Connection,
    transaction_depth: u32,
    autocommit_depth: u32,
    write_count: u64,
    batch_size: Option<u64>,
}

impl ProtoDb {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            transaction_depth: 0,
            autocommit_depth: 0,
            write_count: 0,
            batch_size: None,
        }
    }

    pub fn set_batch_size(&mut self, batch_size: Option<u64>) {
        self.batch_size = batch_size;
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Open a transaction frame. The engine sees a BEGIN only on the
    /// outermost frame.
    pub fn tx_begin(&mut self) -> Result<(), Error> {
        self.transaction_depth += 1;

        if self.transaction_depth == 1 {
            if let Err(err) = self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;") {
                self.transaction_depth -= 1;
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Close a transaction frame, committing on the outermost one.
    pub fn tx_end(&mut self) -> Result<(), Error> {
        if self.transaction_depth == 0 {
            return Err(Error::NotInTransaction);
        }
        self.transaction_depth -= 1;

        if self.transaction_depth > 0 {
            // Closing an inner frame may have unpinned a deferred cycle.
            self.count_writes(0);
            return Ok(());
        }

        self.write_count = 0;
        if let Err(err) = self.conn.execute_batch("COMMIT;") {
            // The transaction state is unknowable from here; there is
            // no recovery that preserves the caller's writes.
            tracing::error!(%err, "failed to commit transaction");
            std::process::abort();
        }
        Ok(())
    }

    /// Open an autocommit frame.
    pub fn batch_begin(&mut self) -> Result<(), Error> {
        self.autocommit_depth += 1;
        if let Err(err) = self.tx_begin() {
            self.autocommit_depth -= 1;
            return Err(err);
        }
        Ok(())
    }

    /// Close an autocommit frame.
    pub fn batch_end(&mut self) -> Result<(), Error> {
        let result = self.tx_end();
        self.autocommit_depth = self.autocommit_depth.saturating_sub(1);
        result
    }

    /// Record `n` writes against the open transaction, cycling it when
    /// the batch size is crossed and only autocommit frames are open.
    pub fn count_writes(&mut self, n: u64) {
        if self.transaction_depth == 0 {
            return;
        }

        let batch = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if self.write_count.saturating_add(n) < batch {
            self.write_count += n;
            return;
        }

        // Saturate, and cycle once every open frame is an autocommit
        // frame; a plain frame defers the cycle to its tx_end.
        self.write_count = batch;
        if self.autocommit_depth < self.transaction_depth {
            return;
        }

        self.write_count = 0;
        if let Err(err) = self.conn.execute_batch("COMMIT; BEGIN IMMEDIATE;") {
            tracing::error!(%err, "failed to cycle batched transaction");
            std::process::abort();
        }
    }
}
