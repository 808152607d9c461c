use std::fmt;

use mediconnect_core::AvatarMethod;

/// One stage of the avatar fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvatarTier {
    GeneratedImage,
    AiStyle,
    ClassifiedSample,
    HashedSample,
    Placeholder,
}

impl AvatarTier {
    /// Full chain, strongest first.
    pub const ORDER: [AvatarTier; 5] = [
        AvatarTier::GeneratedImage,
        AvatarTier::AiStyle,
        AvatarTier::ClassifiedSample,
        AvatarTier::HashedSample,
        AvatarTier::Placeholder,
    ];

    /// Tiers that never touch the network.
    pub const OFFLINE: [AvatarTier; 2] = [AvatarTier::HashedSample, AvatarTier::Placeholder];

    /// Method tag recorded on results produced by this tier.
    pub fn method(&self) -> AvatarMethod {
        match self {
            AvatarTier::GeneratedImage => AvatarMethod::GeneratedImage,
            AvatarTier::AiStyle => AvatarMethod::AiStyle,
            AvatarTier::ClassifiedSample => AvatarMethod::ClassifiedSample,
            AvatarTier::HashedSample => AvatarMethod::HashedSample,
            AvatarTier::Placeholder => AvatarMethod::Placeholder,
        }
    }
}

impl fmt::Display for AvatarTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_ends_with_offline_tiers() {
        assert_eq!(&AvatarTier::ORDER[3..], &AvatarTier::OFFLINE);
        assert_eq!(AvatarTier::ORDER[0], AvatarTier::GeneratedImage);
    }

    #[test]
    fn test_methods_are_distinct() {
        let methods: std::collections::HashSet<_> =
            AvatarTier::ORDER.iter().map(|t| t.method()).collect();
        assert_eq!(methods.len(), AvatarTier::ORDER.len());
    }
}
