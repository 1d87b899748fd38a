use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{FromSqlError, Value as SqlValue, ValueRef};
use rusqlite::Connection;

use super::{convert, enums, extract, Error};

// INSTEAD OF triggers on views arrived with SQLite 3.13.0, and the
// proto-table discipline leans on them.
const MIN_SQLITE_VERSION_NUMBER: i32 = 3_013_000;

/// Register every `protobuf_*` scalar function on `conn`, failing on
/// the first registration the host rejects.
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    if rusqlite::version_number() < MIN_SQLITE_VERSION_NUMBER {
        return Err(Error::SqliteVersion {
            found: rusqlite::version().to_string(),
        }
        .into());
    }

    fn flags() -> FunctionFlags {
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC
    }

    // Variadic registration: arity is checked in the function so the
    // error surfaces on our terms.
    conn.create_scalar_function("protobuf_extract", -1, flags(), |ctx| {
        Ok(do_extract(ctx)?)
    })?;
    conn.create_scalar_function("protobuf_to_json", 2, flags(), |ctx| {
        Ok(convert::to_json(blob(ctx, 0)?, text(ctx, 1)?)?)
    })?;
    conn.create_scalar_function("protobuf_of_json", 2, flags(), |ctx| {
        Ok(convert::of_json(text(ctx, 0)?, text(ctx, 1)?)?)
    })?;
    conn.create_scalar_function("protobuf_to_text", 2, flags(), |ctx| {
        Ok(convert::to_text(blob(ctx, 0)?, text(ctx, 1)?)?)
    })?;
    conn.create_scalar_function("protobuf_of_text", 2, flags(), |ctx| {
        Ok(convert::of_text(text(ctx, 0)?, text(ctx, 1)?)?)
    })?;
    conn.create_scalar_function(
        "protobuf_enum_name_of_number",
        2,
        flags(),
        |ctx| Ok(do_enum_name(ctx)?),
    )?;
    conn.create_scalar_function(
        "protobuf_enum_number_of_name",
        2,
        flags(),
        |ctx| Ok(do_enum_number(ctx)?),
    )?;

    Ok(())
}

fn do_extract(ctx: &Context) -> Result<SqlValue, Error> {
    if !(3..=4).contains(&ctx.len()) {
        return Err(Error::WrongArgumentCount {
            function: "protobuf_extract",
        });
    }

    let default = if ctx.len() == 4 {
        Some(SqlValue::from(ctx.get_raw(3)))
    } else {
        None
    };

    extract::extract(blob(ctx, 0)?, text(ctx, 1)?, text(ctx, 2)?, default)
}

fn do_enum_name(ctx: &Context) -> Result<String, Error> {
    let enum_type = text(ctx, 0)?;
    let number = ctx.get_raw(1).as_i64()?;
    let number = i32::try_from(number).map_err(|_| Error::EnumValueNotFound {
        enum_type: enum_type.to_string(),
        value: number.to_string(),
    })?;

    enums::enum_name_of_number(enum_type, number)
}

fn do_enum_number(ctx: &Context) -> Result<i32, Error> {
    enums::enum_number_of_name(text(ctx, 0)?, text(ctx, 1)?)
}

fn text<'a>(ctx: &'a Context, index: usize) -> Result<&'a str, Error> {
    Ok(ctx.get_raw(index).as_str()?)
}

fn blob<'a>(ctx: &'a Context, index: usize) -> Result<&'a [u8], Error> {
    match ctx.get_raw(index) {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(bytes),
        _ => Err(FromSqlError::InvalidType.into()),
    }
}
