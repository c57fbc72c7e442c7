mod classifier;
mod normalizer;

pub use classifier::{
    Classification, ENCODED_PLACEHOLDER, EncodedClassifier, ID_PLACEHOLDER, IdClassifier,
    SegmentClassifier, UUID_PLACEHOLDER, UuidClassifier,
};
pub use normalizer::{
    DEFAULT_API_MARKER, DEFAULT_BASE_PREFIX, NormalizedEndpoint, NormalizerConfig,
    PathNormalizer, ROOT_ENDPOINT, is_ip_host, normalize,
};
