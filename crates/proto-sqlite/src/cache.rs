use std::cell::RefCell;

use prost::Message as _;
use prost_reflect::{DynamicMessage, MessageDescriptor};

use super::{registry, Error};

thread_local! {
    static CACHE: RefCell<Cache> = RefCell::new(Cache::default());
}

/// Per-thread memoization of `(name -> prototype)` and
/// `(bytes -> parsed message)`.
///
/// A query which extracts N columns from the same payload parses it
/// once, not N times: scalar functions are invoked on the same thread
/// within a statement, and the cache replays the parsed instance for
/// byte-identical requests. The cache is valid only while its recorded
/// generation matches the registry's; see `registry::invalidate_caches`.
#[derive(Default)]
struct Cache {
    generation: u64,
    type_name: String,
    descriptor: Option<MessageDescriptor>,
    bytes: Vec<u8>,
    parsed: Option<DynamicMessage>,
    // Largest payload length parsed so far. Gates instance reuse so one
    // outlier payload doesn't pin a proportionally large arena.
    high_water: usize,
}

impl Cache {
    fn prototype(&mut self, name: &str) -> Result<&MessageDescriptor, Error> {
        let current = registry::generation();

        if self.generation != current || self.descriptor.is_none() || self.type_name != name {
            // The parsed slot is typed by the previous prototype.
            self.parsed = None;
            self.bytes.clear();

            match registry::message_by_name(name) {
                Ok(descriptor) => {
                    self.type_name.clear();
                    self.type_name.push_str(name);
                    self.descriptor = Some(descriptor);
                    self.generation = current;
                }
                Err(err) => {
                    self.type_name.clear();
                    self.descriptor = None;
                    return Err(err);
                }
            }
        }

        Ok(self.descriptor.as_ref().unwrap())
    }

    fn parse(&mut self, name: &str, payload: &[u8]) -> Result<&DynamicMessage, Error> {
        let descriptor = self.prototype(name)?.clone();

        if self.parsed.is_none() || self.bytes != payload {
            // Reuse the existing instance for payloads of comparable
            // size; smaller outliers re-allocate from the prototype.
            let reuse = payload.len() * 2 >= self.high_water;
            let mut message = match self.parsed.take() {
                Some(mut message) if reuse => {
                    message.clear();
                    message
                }
                _ => DynamicMessage::new(descriptor),
            };
            self.high_water = self.high_water.max(payload.len());

            self.bytes.clear();
            self.bytes.extend_from_slice(payload);

            if let Err(err) = message.merge(payload) {
                self.bytes.clear();
                return Err(Error::Decode {
                    name: name.to_string(),
                    err,
                });
            }
            self.parsed = Some(message);
        }

        Ok(self.parsed.as_ref().unwrap())
    }
}

/// Resolve `name` through this thread's prototype cache.
pub fn prototype(name: &str) -> Result<MessageDescriptor, Error> {
    CACHE.with(|cache| cache.borrow_mut().prototype(name).cloned())
}

/// Parse `payload` as a `name` message and apply `f` to the (possibly
/// cached) parsed instance.
pub fn with_message<R>(
    name: &str,
    payload: &[u8],
    f: impl FnOnce(&DynamicMessage) -> Result<R, Error>,
) -> Result<R, Error> {
    CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        let message = cache.parse(name, payload)?;
        f(message)
    })
}
