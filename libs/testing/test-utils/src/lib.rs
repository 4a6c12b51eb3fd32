//! Shared test utilities for the catalog crates
//!
//! - `TestDatabase`: PostgreSQL container with the workspace migrations applied
//! - `TestDataBuilder`: deterministic, collision-free test data
//! - `assertions`: assertion helpers with readable failure messages
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_postgres_test");
//!
//!     let code = builder.product_code(1);
//!     let name = builder.name("widget", "main");
//! }
//! ```

mod postgres;

pub use postgres::TestDatabase;

/// Builder for test data derived from a seed
///
/// Tests sharing one database get distinct product codes as long as their
/// builders are created from distinct test names.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from a hash of the test name
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_product");
    /// assert_eq!(builder.product_code(1), builder.product_code(1));
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Unique product code, at most 50 characters: `T<seed hex>-<n>`
    pub fn product_code(&self, n: u32) -> String {
        format!("T{:016X}-{:04}", self.seed, n)
    }

    /// `test-<prefix>-<seed>-<suffix>`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed % 1_000_000, suffix)
    }

    /// Category label unique to this builder, for filtering a shared table
    pub fn category(&self, label: &str) -> String {
        format!("{}-{:06}", label, self.seed % 1_000_000)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Unwrap an `Option` or fail with `context`
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that `values` is ordered by `key` in the given direction
    pub fn assert_sorted_by<T, K, F>(values: &[T], key: F, ascending: bool, context: &str)
    where
        K: PartialOrd + std::fmt::Debug,
        F: Fn(&T) -> K,
    {
        for pair in values.windows(2) {
            let (a, b) = (key(&pair[0]), key(&pair[1]));
            let ordered = if ascending { a <= b } else { a >= b };
            assert!(ordered, "{}: {:?} and {:?} out of order", context, a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let a = TestDataBuilder::new(42);
        let b = TestDataBuilder::new(42);

        assert_eq!(a.product_code(3), b.product_code(3));
        assert_eq!(a.name("widget", "main"), b.name("widget", "main"));
    }

    #[test]
    fn test_product_codes_fit_column() {
        let builder = TestDataBuilder::new(u64::MAX);
        assert!(builder.product_code(9999).len() <= 50);
    }

    #[test]
    fn test_different_names_give_different_codes() {
        let a = TestDataBuilder::from_test_name("test1");
        let b = TestDataBuilder::from_test_name("test2");
        assert_ne!(a.product_code(1), b.product_code(1));
    }

    #[test]
    fn test_assert_sorted_by() {
        assertions::assert_sorted_by(&[1, 2, 2, 5], |v| *v, true, "ascending");
        assertions::assert_sorted_by(&[5, 3, 3], |v| *v, false, "descending");
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn test_assert_sorted_by_detects_disorder() {
        assertions::assert_sorted_by(&[2, 1], |v| *v, true, "ascending");
    }
}
