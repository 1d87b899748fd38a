use prost::Message as _;
use prost_reflect::{DeserializeOptions, DynamicMessage, SerializeOptions};

use super::{cache, Error};

/// Render a wire-encoded `type_name` message as JSON text.
///
/// Primitive fields are always emitted, including ones resting at
/// their defaults: consumers with loose null semantics must not be
/// made to confuse "unset" with "default".
pub fn to_json(payload: &[u8], type_name: &str) -> Result<String, Error> {
    cache::with_message(type_name, payload, |message| {
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::new(&mut buf);
        let options = SerializeOptions::new().skip_default_fields(false);
        message.serialize_with_options(&mut serializer, &options)?;

        Ok(String::from_utf8(buf).unwrap())
    })
}

/// Parse JSON text as a `type_name` message and wire-encode it.
/// Unknown fields in the input are ignored.
pub fn of_json(json: &str, type_name: &str) -> Result<Vec<u8>, Error> {
    let descriptor = cache::prototype(type_name)?;

    let mut deserializer = serde_json::Deserializer::from_str(json);
    let options = DeserializeOptions::new().deny_unknown_fields(false);
    let message =
        DynamicMessage::deserialize_with_options(descriptor, &mut deserializer, &options)?;
    deserializer.end()?;

    Ok(message.encode_to_vec())
}

/// Render a wire-encoded `type_name` message in protobuf text format.
pub fn to_text(payload: &[u8], type_name: &str) -> Result<String, Error> {
    cache::with_message(type_name, payload, |message| Ok(message.to_text_format()))
}

/// Parse protobuf text format as a `type_name` message and wire-encode it.
pub fn of_text(text: &str, type_name: &str) -> Result<Vec<u8>, Error> {
    let descriptor = cache::prototype(type_name)?;
    let message = DynamicMessage::parse_text_format(descriptor, text)?;

    Ok(message.encode_to_vec())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testdata;
    use prost_reflect::Value;

    #[test]
    fn json_round_trip() {
        testdata::install();

        let payload = testdata::person(|person| {
            person.set_field_by_name("name", Value::String("Ada".to_string()));
            person.set_field_by_name("age", Value::I32(36));
        });

        let json = to_json(&payload, "addressbook.Person").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["name"], "Ada");
        assert_eq!(parsed["age"], 36);
        // Unset primitives are emitted, not dropped.
        assert_eq!(parsed["verified"], false);

        // Parsing the rendering back reaches a fixed point: explicit
        // presence of defaulted fields does not change the JSON view.
        let round = of_json(&json, "addressbook.Person").unwrap();
        assert_eq!(to_json(&round, "addressbook.Person").unwrap(), json);
    }

    #[test]
    fn json_input_ignores_unknown_fields() {
        testdata::install();

        let payload =
            of_json(r#"{"name": "Ada", "notAField": [1, 2, 3]}"#, "addressbook.Person").unwrap();
        let json = to_json(&payload, "addressbook.Person").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["name"], "Ada");
    }

    #[test]
    fn text_format_round_trip() {
        testdata::install();

        let payload = testdata::person(|person| {
            person.set_field_by_name("name", Value::String("Grace".to_string()));
        });

        let text = to_text(&payload, "addressbook.Person").unwrap();
        assert!(text.contains("Grace"), "unexpected rendering: {text}");
        assert_eq!(of_text(&text, "addressbook.Person").unwrap(), payload);
    }

    #[test]
    fn malformed_inputs_are_errors() {
        testdata::install();

        assert!(matches!(
            to_json(b"\xff\xff", "addressbook.Person").unwrap_err(),
            Error::Decode { .. }
        ));
        assert!(matches!(
            of_json("{not json", "addressbook.Person").unwrap_err(),
            Error::Json(_)
        ));
        assert!(matches!(
            of_text("not: { text", "addressbook.Person").unwrap_err(),
            Error::TextFormat(_)
        ));
    }
}
