use super::{registry, Error};

/// Resolve an enum value's symbolic name from its number.
pub fn enum_name_of_number(enum_type: &str, number: i32) -> Result<String, Error> {
    let descriptor = registry::enum_by_name(enum_type)?;

    descriptor
        .get_value(number)
        .map(|value| value.name().to_string())
        .ok_or_else(|| Error::EnumValueNotFound {
            enum_type: enum_type.to_string(),
            value: number.to_string(),
        })
}

/// Resolve an enum value's number from its symbolic name.
pub fn enum_number_of_name(enum_type: &str, name: &str) -> Result<i32, Error> {
    let descriptor = registry::enum_by_name(enum_type)?;

    descriptor
        .get_value_by_name(name)
        .map(|value| value.number())
        .ok_or_else(|| Error::EnumValueNotFound {
            enum_type: enum_type.to_string(),
            value: name.to_string(),
        })
}
