use crate::{fingerprint, Column, Error, ProtoTable, Strength};

/// Generate the idempotent DDL bundle for `spec` as one
/// semicolon-separated script: raw table, updatable view, INSTEAD OF
/// triggers, functional indexes, and a trailing query listing stale
/// indexes left behind by earlier versions of the spec.
pub fn schema_script(spec: &ProtoTable) -> Result<String, Error> {
    spec.validate()?;
    let table = &spec.table;

    let mut script = String::from("BEGIN EXCLUSIVE;\n\n");

    script.push_str(&format!(
        "CREATE TABLE IF NOT EXISTS {table}_raw (\n  \
           id INTEGER PRIMARY KEY ASC NOT NULL,\n  \
           proto BLOB NOT NULL\n\
         );\n\n"
    ));

    // The view is dropped and re-created so column changes apply
    // in-place; the raw table underneath is never touched.
    script.push_str(&format!("DROP VIEW IF EXISTS {table};\n"));
    let mut names = String::from("id, proto");
    for column in &spec.columns {
        names.push_str(", ");
        names.push_str(&column.name);
    }
    script.push_str(&format!("CREATE VIEW {table} ({names}) AS\nSELECT\n  id,\n  proto"));
    for column in &spec.columns {
        script.push_str(",\n  ");
        script.push_str(&column_expression(&spec.message, column));
    }
    script.push_str(&format!("\nFROM {table}_raw;\n\n"));

    script.push_str(&format!(
        "DROP TRIGGER IF EXISTS {table}_insert;\n\
         CREATE TRIGGER {table}_insert INSTEAD OF INSERT ON {table}\n\
         BEGIN\n  \
           INSERT INTO {table}_raw (proto) VALUES (NEW.proto);\n\
         END;\n\n"
    ));
    script.push_str(&format!(
        "DROP TRIGGER IF EXISTS {table}_update;\n\
         CREATE TRIGGER {table}_update INSTEAD OF UPDATE OF proto ON {table}\n\
         BEGIN\n  \
           UPDATE {table}_raw SET proto = NEW.proto WHERE id = OLD.id;\n\
         END;\n\n"
    ));
    script.push_str(&format!(
        "DROP TRIGGER IF EXISTS {table}_delete;\n\
         CREATE TRIGGER {table}_delete INSTEAD OF DELETE ON {table}\n\
         BEGIN\n  \
           DELETE FROM {table}_raw WHERE id = OLD.id;\n\
         END;\n\n"
    ));

    let mut created = Vec::new();
    for (auto, suffix, components) in index_entries(spec) {
        let expression = components
            .iter()
            .map(|component| match spec.column(component) {
                Some(column) => column_expression(&spec.message, column),
                None => component.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",\n  ");

        let name = fingerprint::index_name(table, suffix, auto, &expression);
        script.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS {name} ON {table}_raw (\n  {expression}\n);\n\n"
        ));
        created.push(name);
    }

    script.push_str("COMMIT;\n\n");

    // Anything of ours on the raw table that we did not just (re)create
    // is an orphan from an earlier spec, reported for collection.
    script.push_str(&format!(
        "SELECT name FROM sqlite_master\n  \
           WHERE type = 'index'\n  \
           AND tbl_name = '{table}_raw'\n  \
           AND (name LIKE 'proto_index__%' OR name LIKE 'proto_autoindex__%')"
    ));
    if !created.is_empty() {
        let created = created
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(", ");
        script.push_str(&format!("\n  AND name NOT IN ({created})"));
    }
    script.push_str(";\n");

    Ok(script)
}

// Strong columns each get an automatic single-component index, followed
// by the explicitly declared indexes.
fn index_entries(spec: &ProtoTable) -> Vec<(bool, &str, Vec<&str>)> {
    let mut entries: Vec<(bool, &str, Vec<&str>)> = spec
        .columns
        .iter()
        .filter(|column| column.strength == Strength::Strong)
        .map(|column| (true, column.name.as_str(), vec![column.name.as_str()]))
        .collect();

    entries.extend(spec.indexes.iter().map(|index| {
        (
            false,
            index.suffix.as_str(),
            index.components.iter().map(String::as_str).collect(),
        )
    }));

    entries
}

pub(crate) fn column_expression(message: &str, column: &Column) -> String {
    // Paths admit almost any field-name byte; keep the embedded SQL
    // string literals well-formed.
    format!(
        "CAST(protobuf_extract(proto, '{}', '{}', NULL) AS {})",
        message.replace('\'', "''"),
        column.path.replace('\'', "''"),
        column.sql_type
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testdata;

    #[test]
    fn script_shape() {
        let script = schema_script(&testdata::spec()).unwrap();

        // Framed by the exclusive transaction, with discovery outside it.
        assert!(script.starts_with("BEGIN EXCLUSIVE;\n"));
        let commit = script.find("COMMIT;\n").unwrap();
        assert!(script[commit..].contains("SELECT name FROM sqlite_master"));

        assert!(script.contains(
            "CREATE TABLE IF NOT EXISTS people_raw (\n  \
               id INTEGER PRIMARY KEY ASC NOT NULL,\n  \
               proto BLOB NOT NULL\n);"
        ));
        assert!(script.contains("CREATE VIEW people (id, proto, full_name, badge) AS"));
        assert!(script.contains(
            "CAST(protobuf_extract(proto, 'directory.Employee', '$.name', NULL) AS TEXT)"
        ));
        for trigger in ["people_insert", "people_update", "people_delete"] {
            assert!(script.contains(&format!("DROP TRIGGER IF EXISTS {trigger};")));
            assert!(script.contains(&format!("CREATE TRIGGER {trigger} INSTEAD OF")));
        }

        // One auto index for the strong column, none for the weak one,
        // and the explicit index with pass-through components.
        assert!(script.contains("CREATE INDEX IF NOT EXISTS proto_autoindex__people__full_name__"));
        assert!(!script.contains("proto_autoindex__people__badge__"));
        assert!(script.contains("CREATE INDEX IF NOT EXISTS proto_index__people__by_badge__"));
        assert!(script.contains(
            "CAST(protobuf_extract(proto, 'directory.Employee', '$.badge', NULL) AS INTEGER),\n  id DESC"
        ));
    }

    #[test]
    fn generation_is_deterministic() {
        let spec = testdata::spec();
        assert_eq!(schema_script(&spec).unwrap(), schema_script(&spec).unwrap());
    }

    #[test]
    fn changed_expression_changes_only_that_index_name() {
        let spec = testdata::spec();
        let mut changed = testdata::spec();
        changed.columns[0].path = "$.name.x".to_string();

        let extract_name = |script: &str, prefix: &str| -> String {
            let start = script.find(prefix).unwrap();
            script[start..].split_whitespace().next().unwrap().to_string()
        };

        let before = schema_script(&spec).unwrap();
        let after = schema_script(&changed).unwrap();

        assert_ne!(
            extract_name(&before, "proto_autoindex__people__full_name__"),
            extract_name(&after, "proto_autoindex__people__full_name__"),
        );
        assert_eq!(
            extract_name(&before, "proto_index__people__by_badge__"),
            extract_name(&after, "proto_index__people__by_badge__"),
        );
    }
}
