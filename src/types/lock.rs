use alloy::primitives::wrap_fixed_bytes;

wrap_fixed_bytes!(
    /// Token identifying the owner of a lock.
    pub struct LockToken<32>;
);

impl LockToken {
    /// Generates a new random owner token.
    pub fn generate() -> Self {
        Self::new(rand::random())
    }
}
