use std::sync::LazyLock;

/// The number of candidate values embedded in a single execution when no
/// chunk size is configured explicitly (defaults to 1000)
pub static DEFAULT_CHUNK_SIZE: LazyLock<usize> =
	lazy_env_parse!("CHUNKQ_DEFAULT_CHUNK_SIZE", usize, 1000);

/// The name of the call which is treated as the membership predicate (defaults to `contains`)
pub static MEMBERSHIP_OPERATION: LazyLock<String> =
	lazy_env_parse!("CHUNKQ_MEMBERSHIP_OPERATION", String, || "contains".to_owned());

/// The name of the slot which is bound to the current chunk (defaults to `__chunk`)
pub static CHUNK_SLOT: LazyLock<String> =
	lazy_env_parse!("CHUNKQ_CHUNK_SLOT", String, || "__chunk".to_owned());

/// The maximum size of a membership set accepted by the in-memory provider
/// (defaults to 0, which means unlimited)
pub static MEMORY_MAX_SET_SIZE: LazyLock<usize> =
	lazy_env_parse!("CHUNKQ_MEMORY_MAX_SET_SIZE", usize, 0);
