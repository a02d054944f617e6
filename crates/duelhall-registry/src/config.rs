/// Join validation limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Longest accepted display name, in characters, after trimming.
    pub max_name_len: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_name_len: 15 }
    }
}
