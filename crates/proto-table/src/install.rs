use rusqlite::Connection;

use crate::{schema, Error, ProtoTable};

/// Install (or idempotently re-install) the schema bundle for `spec`.
///
/// The generated script is cached in the caller-provided `script` slot,
/// so repeated installs of an unchanged spec skip regeneration. Stale
/// functional indexes reported by the script's discovery query are
/// dropped after the bundle commits.
pub fn install(
    conn: &Connection,
    spec: &ProtoTable,
    script: &mut Option<String>,
) -> Result<(), Error> {
    if script.is_none() {
        *script = Some(schema::schema_script(spec)?);
    }
    let script = script.as_deref().unwrap_or_default();

    match run_script(conn, script) {
        Ok(()) => Ok(()),
        Err(err) => {
            // Don't leave the connection wedged inside the exclusive
            // transaction the script opened.
            let _ = conn.execute_batch("ROLLBACK;");
            tracing::error!(table = %spec.table, %err, "failed to install proto table");

            match err {
                Error::Rusqlite(source) => Err(Error::Install {
                    table: spec.table.clone(),
                    source,
                }),
                other => Err(other),
            }
        }
    }
}

fn run_script(conn: &Connection, script: &str) -> Result<(), Error> {
    let mut stale = Vec::new();

    for statement in split_script(script)? {
        tracing::debug!(?statement, "running install statement");

        let is_query = statement
            .trim_start()
            .get(..6)
            .map_or(false, |lead| lead.eq_ignore_ascii_case("select"));

        if is_query {
            let mut query = conn.prepare(statement)?;
            let names = query.query_map([], |row| row.get::<_, String>(0))?;
            for name in names {
                stale.push(name?);
            }
        } else {
            conn.execute_batch(statement)?;
        }
    }

    // Content-addressed naming strands an index whenever its expression
    // changes; collect what the discovery query reported.
    for name in stale {
        tracing::debug!(index = %name, "dropping stale functional index");
        conn.execute_batch(&format!("DROP INDEX IF EXISTS \"{name}\";"))?;
    }

    Ok(())
}

// Split a script into its constituent complete statements, as judged
// by sqlite3_complete (which understands trigger BEGIN..END bodies).
fn split_script(mut block: &str) -> Result<Vec<&str>, Error> {
    let mut statements = Vec::new();
    let mut pivot = 0;

    while !block.is_empty() {
        let c_stmt = match block[pivot..].find(';') {
            Some(i) => {
                pivot = pivot + i + 1;
                std::ffi::CString::new(&block[0..pivot])?
            }
            None => {
                if !block.chars().all(char::is_whitespace) {
                    return Err(Error::ScriptTrailingContent {
                        trailing: block.to_string(),
                    });
                }
                return Ok(statements);
            }
        };

        if unsafe { rusqlite::ffi::sqlite3_complete(c_stmt.as_ptr()) } != 0 {
            // Skip "statements" which are only an extra semi-colon.
            if c_stmt.as_bytes().trim_ascii() != b";" {
                statements.push(&block[0..pivot]);
            }
            block = &block[pivot..];
            pivot = 0;
        }
    }

    Ok(statements)
}
