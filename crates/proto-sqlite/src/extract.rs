use prost::Message as _;
use prost_reflect::{DynamicMessage, EnumDescriptor, FieldDescriptor, Kind, ReflectMessage, Value};
use rusqlite::types::Value as SqlValue;

use super::{cache, parse_path, Error, Step};

/// Walk `path` into the `type_name` message encoded by `payload` and
/// emit the addressed leaf as a SQL value.
///
/// Scalars map onto SQL integer/real/text/blob by field kind; a path
/// ending on a (sub-)message re-serializes it as a blob. Absent
/// optional fields materialize their declared protobuf default, unless
/// `default` carries a caller-supplied value, which is returned
/// verbatim. An out-of-range index into a repeated field selects SQL
/// NULL rather than failing.
pub fn extract(
    payload: &[u8],
    type_name: &str,
    path: &str,
    default: Option<SqlValue>,
) -> Result<SqlValue, Error> {
    let steps = parse_path(path)?;
    let mut walker = Walker { path, default };

    cache::with_message(type_name, payload, |message| {
        walker.walk(message, &steps)
    })
}

struct Walker<'a> {
    // Original expression, for error reporting only.
    path: &'a str,
    default: Option<SqlValue>,
}

impl Walker<'_> {
    fn walk(&mut self, message: &DynamicMessage, steps: &[Step]) -> Result<SqlValue, Error> {
        let (step, rest) = match steps.split_first() {
            // The path ends on this message: re-serialize it.
            None => return Ok(SqlValue::Blob(message.encode_to_vec())),
            Some((step, rest)) => (step, rest),
        };

        let (name, index) = match step {
            Step::Root => return self.walk(message, rest),
            Step::Field(name) => (name.as_str(), None),
            Step::IndexedField(name, index) => (name.as_str(), Some(*index)),
        };

        let descriptor = message.descriptor();
        let field = descriptor
            .get_field_by_name(name)
            .ok_or_else(|| Error::InvalidFieldName {
                field: name.to_string(),
                message: descriptor.full_name().to_string(),
            })?;

        if field.is_list() {
            let index = index.ok_or_else(|| Error::ExpectedIndex {
                field: field.full_name().to_string(),
            })?;

            let value = message.get_field(&field);
            let items = value.as_list().unwrap_or_default();
            let len = items.len() as i64;
            let at = if index < 0 { len + index } else { index };

            // Out of range is not an error: the row simply has no
            // value at this address.
            if at < 0 || at >= len {
                return Ok(SqlValue::Null);
            }
            return self.descend(&field, &items[at as usize], rest);
        }

        if index.is_some() {
            return Err(Error::UnexpectedIndex {
                field: field.full_name().to_string(),
            });
        }

        if !message.has_field(&field) {
            return self.absent(&field, rest);
        }

        let value = message.get_field(&field);
        self.descend(&field, value.as_ref(), rest)
    }

    // A populated (or list-selected) value, with the path remainder.
    fn descend(
        &mut self,
        field: &FieldDescriptor,
        value: &Value,
        rest: &[Step],
    ) -> Result<SqlValue, Error> {
        match field.kind() {
            Kind::Message(_) => match value.as_message() {
                Some(nested) => self.walk(nested, rest),
                None => Err(Error::NonMessageTraversal {
                    field: field.full_name().to_string(),
                }),
            },
            Kind::Enum(descriptor) => enum_leaf(
                field,
                &descriptor,
                value.as_enum_number().unwrap_or_default(),
                rest,
            ),
            _ if !rest.is_empty() => Err(Error::NonMessageTraversal {
                field: field.full_name().to_string(),
            }),
            _ => leaf(field, value),
        }
    }

    // An unpopulated, non-repeated field.
    fn absent(&mut self, field: &FieldDescriptor, rest: &[Step]) -> Result<SqlValue, Error> {
        if !rest.is_empty() {
            // Only kinds with further structure admit descent through
            // an absent field: a message contributes its default
            // instance, an enum its default value.
            return match field.kind() {
                Kind::Message(descriptor) => {
                    self.walk(&DynamicMessage::new(descriptor), rest)
                }
                Kind::Enum(descriptor) => {
                    let number = declared_default(field).as_enum_number().unwrap_or_default();
                    enum_leaf(field, &descriptor, number, rest)
                }
                _ => Err(Error::InvalidPath {
                    path: self.path.to_string(),
                }),
            };
        }

        // A caller-supplied default binds verbatim; otherwise the
        // field's declared default is materialized by kind.
        if let Some(default) = self.default.take() {
            return Ok(default);
        }
        match field.kind() {
            Kind::Message(_) => Ok(SqlValue::Null),
            _ => leaf(field, &declared_default(field)),
        }
    }
}

// The field's declared default value: its `default_value` option when
// one is present, the kind's zero value otherwise.
fn declared_default(field: &FieldDescriptor) -> Value {
    let kind = field.kind();
    field
        .field_descriptor_proto()
        .default_value
        .as_deref()
        .and_then(|text| parse_default(text, &kind))
        .unwrap_or_else(|| Value::default_value(&kind))
}

fn parse_default(text: &str, kind: &Kind) -> Option<Value> {
    let value = match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(text.parse().ok()?),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(text.parse().ok()?),
        Kind::Uint32 | Kind::Fixed32 => Value::U32(text.parse().ok()?),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(text.parse().ok()?),
        Kind::Float => Value::F32(text.parse().ok()?),
        Kind::Double => Value::F64(text.parse().ok()?),
        Kind::Bool => Value::Bool(text.parse().ok()?),
        Kind::String => Value::String(text.to_string()),
        Kind::Bytes => Value::Bytes(text.as_bytes().to_vec().into()),
        Kind::Enum(descriptor) => {
            Value::EnumNumber(descriptor.get_value_by_name(text)?.number())
        }
        Kind::Message(_) => return None,
    };
    Some(value)
}

// Emission of an enum-typed leaf, honoring the optional single
// trailing `.name` / `.number` selector.
fn enum_leaf(
    field: &FieldDescriptor,
    descriptor: &EnumDescriptor,
    number: i32,
    rest: &[Step],
) -> Result<SqlValue, Error> {
    match rest {
        [] => Ok(SqlValue::Integer(i64::from(number))),
        [Step::Field(suffix)] if suffix == "number" => Ok(SqlValue::Integer(i64::from(number))),
        [Step::Field(suffix)] if suffix == "name" => match descriptor.get_value(number) {
            Some(value) => Ok(SqlValue::Text(value.name().to_string())),
            None => Err(Error::EnumValueNotFound {
                enum_type: descriptor.full_name().to_string(),
                value: number.to_string(),
            }),
        },
        _ => Err(Error::NonMessageTraversal {
            field: field.full_name().to_string(),
        }),
    }
}

// Terminal emission of a scalar (or message) value by kind.
fn leaf(field: &FieldDescriptor, value: &Value) -> Result<SqlValue, Error> {
    let result = match value {
        // Frozen behavioral contract: true maps to 0 and false to 1.
        Value::Bool(b) => SqlValue::Integer(if *b { 0 } else { 1 }),
        Value::I32(v) => SqlValue::Integer(i64::from(*v)),
        Value::I64(v) => SqlValue::Integer(*v),
        Value::U32(v) => SqlValue::Integer(i64::from(*v)),
        Value::U64(v) => {
            if *v > i64::MAX as u64 {
                tracing::warn!(
                    field = %field.full_name(),
                    "unsigned 64-bit value exceeds the SQL integer range",
                );
            }
            SqlValue::Integer(*v as i64)
        }
        Value::F32(v) => SqlValue::Real(f64::from(*v)),
        Value::F64(v) => SqlValue::Real(*v),
        Value::String(s) => {
            if !matches!(field.kind(), Kind::String) {
                tracing::warn!(
                    field = %field.full_name(),
                    "string-valued field does not have string kind",
                );
            }
            SqlValue::Text(s.clone())
        }
        Value::Bytes(b) => SqlValue::Blob(b.to_vec()),
        Value::EnumNumber(n) => SqlValue::Integer(i64::from(*n)),
        Value::Message(nested) => SqlValue::Blob(nested.encode_to_vec()),
        Value::List(_) | Value::Map(_) => {
            return Err(Error::NonMessageTraversal {
                field: field.full_name().to_string(),
            })
        }
    };
    Ok(result)
}
