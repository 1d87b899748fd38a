//! Access to the process-wide protobuf descriptor registry.
//!
//! Message definitions are linked into the process and registered with
//! the global `prost_reflect::DescriptorPool`. Registration bumps a
//! generation counter, which is the only cross-thread shared mutable
//! datum: per-thread caches compare their recorded generation against
//! it and self-repair when stale.

use std::sync::atomic::{AtomicU64, Ordering};

use prost_reflect::{DescriptorPool, EnumDescriptor, MessageDescriptor};

use super::Error;

static GENERATION: AtomicU64 = AtomicU64::new(0);

/// Current generation of the descriptor registry.
pub fn generation() -> u64 {
    GENERATION.load(Ordering::Acquire)
}

/// Invalidate every per-thread prototype and message cache.
/// Stale caches re-resolve their prototypes on next access.
pub fn invalidate_caches() {
    GENERATION.fetch_add(1, Ordering::AcqRel);
}

/// Register an encoded `FileDescriptorSet` with the global descriptor
/// pool and invalidate caches so its types become visible everywhere.
pub fn load_descriptor_set(bytes: &[u8]) -> Result<(), Error> {
    DescriptorPool::decode_global_file_descriptor_set(bytes)?;
    invalidate_caches();
    Ok(())
}

/// Resolve a fully qualified message name, like `addressbook.Person`.
pub fn message_by_name(name: &str) -> Result<MessageDescriptor, Error> {
    DescriptorPool::global()
        .get_message_by_name(name)
        .ok_or_else(|| Error::MessageTypeNotFound {
            name: name.to_string(),
        })
}

/// Resolve a fully qualified enum name, like `addressbook.PhoneType`.
pub fn enum_by_name(name: &str) -> Result<EnumDescriptor, Error> {
    DescriptorPool::global()
        .get_enum_by_name(name)
        .ok_or_else(|| Error::EnumTypeNotFound {
            name: name.to_string(),
        })
}
