use color_eyre::eyre::Result;

/// Durable string key/value store shared by the API and the workers.
///
/// All cross-process coordination goes through here; nothing assumes shared memory.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically replace `expected` with `new`. `expected: None` means "only if
    /// absent", `new: None` deletes. Returns whether the swap happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<String>,
        new: Option<String>,
    ) -> Result<bool>;
}
