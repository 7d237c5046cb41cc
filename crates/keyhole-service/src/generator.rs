use rand::Rng;

/// Source of shortened-path identifiers.
///
/// Implementations do not consult storage; the create service relies
/// on the store's uniqueness check to catch the (unlikely) collision.
pub trait PathGenerator: Send + Sync + 'static {
    /// Produces a path from `len` random bytes.
    fn generate(&self, len: usize) -> String;
}

/// Hex-encoded random path generator: `len` bytes become `2 * len`
/// lowercase hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandHexGenerator;

impl PathGenerator for RandHexGenerator {
    fn generate(&self, len: usize) -> String {
        let mut bytes = vec![0u8; len];
        rand::rng().fill(&mut bytes[..]);
        hex::encode(bytes)
    }
}
