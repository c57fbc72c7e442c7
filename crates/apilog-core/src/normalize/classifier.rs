use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::{Regex, RegexBuilder};

pub const ID_PLACEHOLDER: &str = "{id}";
pub const UUID_PLACEHOLDER: &str = "{uuid}";
pub const ENCODED_PLACEHOLDER: &str = "{encoded}";

lazy_static! {
    static ref INTEGER_ID: Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref OPAQUE_TOKEN: Regex = Regex::new(r"^[A-Za-z0-9_]{8,64}$").unwrap();
    static ref UUID: Regex = RegexBuilder::new(
        r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$"
    )
    .case_insensitive(true)
    .build()
    .unwrap();
    static ref MALFORMED_ESCAPE: Regex = Regex::new(r"%([^0-9A-Fa-f]|[0-9A-Fa-f][^0-9A-Fa-f]|[0-9A-Fa-f]?$)").unwrap();
    static ref STABLE_SEGMENT: Regex = Regex::new(r"^[A-Za-z0-9._~-]+$").unwrap();
}

/// Outcome of classifying a single path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Segment is not variable for this classifier
    Pass,
    /// Segment should be replaced in the endpoint key
    Replace(String),
}

/// A pure test over one path segment
pub trait SegmentClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, segment: &str) -> Classification;
}

/// Integer IDs and opaque tokens such as hashes or object IDs
pub struct IdClassifier;

impl IdClassifier {
    fn is_opaque_token(segment: &str) -> bool {
        OPAQUE_TOKEN.is_match(segment) && segment.bytes().filter(u8::is_ascii_digit).count() >= 2
    }
}

impl SegmentClassifier for IdClassifier {
    fn name(&self) -> &'static str {
        "id"
    }

    fn classify(&self, segment: &str) -> Classification {
        if INTEGER_ID.is_match(segment) || Self::is_opaque_token(segment) {
            Classification::Replace(ID_PLACEHOLDER.to_string())
        } else {
            Classification::Pass
        }
    }
}

/// Canonical 8-4-4-4-12 UUIDs, any case
pub struct UuidClassifier;

impl SegmentClassifier for UuidClassifier {
    fn name(&self) -> &'static str {
        "uuid"
    }

    fn classify(&self, segment: &str) -> Classification {
        if UUID.is_match(segment) {
            Classification::Replace(UUID_PLACEHOLDER.to_string())
        } else {
            Classification::Pass
        }
    }
}

/// Percent-encoded segments.
///
/// The decoded text may itself be a sub-path (`%2F`); each decoded part is run
/// through the ID and UUID classifiers. Parts that still carry free-form
/// characters, and escapes that cannot be decoded, collapse to
/// [`ENCODED_PLACEHOLDER`].
pub struct EncodedClassifier;

impl EncodedClassifier {
    fn collapse_part(part: &str) -> String {
        let classifiers: [&dyn SegmentClassifier; 2] = [&IdClassifier, &UuidClassifier];
        for classifier in classifiers {
            if let Classification::Replace(placeholder) = classifier.classify(part) {
                return placeholder;
            }
        }

        // Dot segments would make keys look like path traversal
        if STABLE_SEGMENT.is_match(part) && part != "." && part != ".." {
            part.to_string()
        } else {
            ENCODED_PLACEHOLDER.to_string()
        }
    }
}

impl SegmentClassifier for EncodedClassifier {
    fn name(&self) -> &'static str {
        "encoded"
    }

    fn classify(&self, segment: &str) -> Classification {
        if !segment.contains('%') {
            return Classification::Pass;
        }

        if MALFORMED_ESCAPE.is_match(segment) {
            tracing::debug!("Malformed percent-encoding in segment '{}'", segment);
            return Classification::Replace(ENCODED_PLACEHOLDER.to_string());
        }

        let decoded = match percent_decode_str(segment).decode_utf8() {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!("Segment '{}' is not UTF-8 once decoded: {}", segment, e);
                return Classification::Replace(ENCODED_PLACEHOLDER.to_string());
            }
        };

        let parts: Vec<String> = decoded
            .split('/')
            .filter(|part| !part.is_empty())
            .map(Self::collapse_part)
            .collect();

        if parts.is_empty() {
            return Classification::Replace(ENCODED_PLACEHOLDER.to_string());
        }

        Classification::Replace(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replaced(classifier: &dyn SegmentClassifier, segment: &str) -> Option<String> {
        match classifier.classify(segment) {
            Classification::Replace(s) => Some(s),
            Classification::Pass => None,
        }
    }

    #[test]
    fn test_id_integers() {
        assert_eq!(replaced(&IdClassifier, "123"), Some("{id}".to_string()));
        assert_eq!(replaced(&IdClassifier, "0"), Some("{id}".to_string()));
        assert_eq!(replaced(&IdClassifier, "users"), None);
        assert_eq!(replaced(&IdClassifier, "-5"), None);
    }

    #[test]
    fn test_id_opaque_tokens() {
        // Mongo-style object ID
        assert_eq!(
            replaced(&IdClassifier, "507f1f77bcf86cd799439011"),
            Some("{id}".to_string())
        );
        assert_eq!(replaced(&IdClassifier, "a1b2c3d4"), Some("{id}".to_string()));

        // Words with a version digit stay
        assert_eq!(replaced(&IdClassifier, "v2"), None);
        assert_eq!(replaced(&IdClassifier, "oauth2callback"), None);
        // Too short to be opaque
        assert_eq!(replaced(&IdClassifier, "ab12"), None);
        // Hyphenated shapes belong to the UUID classifier
        assert_eq!(
            replaced(&IdClassifier, "550e8400-e29b-41d4-a716-446655440000"),
            None
        );
    }

    #[test]
    fn test_uuid_any_case() {
        assert_eq!(
            replaced(&UuidClassifier, "550e8400-e29b-41d4-a716-446655440000"),
            Some("{uuid}".to_string())
        );
        assert_eq!(
            replaced(&UuidClassifier, "550E8400-E29B-41D4-A716-446655440000"),
            Some("{uuid}".to_string())
        );
        assert_eq!(replaced(&UuidClassifier, "550e8400-e29b-41d4-a716"), None);
        assert_eq!(
            replaced(&UuidClassifier, "550e8400e29b41d4a716446655440000"),
            None
        );
    }

    #[test]
    fn test_encoded_sub_path() {
        assert_eq!(
            replaced(&EncodedClassifier, "files%2F123%2Freport.pdf"),
            Some("files/{id}/report.pdf".to_string())
        );
        assert_eq!(
            replaced(
                &EncodedClassifier,
                "docs%2f550e8400-e29b-41d4-a716-446655440000"
            ),
            Some("docs/{uuid}".to_string())
        );
    }

    #[test]
    fn test_encoded_free_text_collapses() {
        assert_eq!(
            replaced(&EncodedClassifier, "john%40example.com"),
            Some("{encoded}".to_string())
        );
        assert_eq!(
            replaced(&EncodedClassifier, "hello%20world"),
            Some("{encoded}".to_string())
        );
    }

    #[test]
    fn test_encoded_dot_segments_collapse() {
        assert_eq!(
            replaced(&EncodedClassifier, "..%2F..%2Fetc"),
            Some("{encoded}/{encoded}/etc".to_string())
        );
        assert_eq!(
            replaced(&EncodedClassifier, ".%2Fconfig"),
            Some("{encoded}/config".to_string())
        );
        assert_eq!(
            replaced(&EncodedClassifier, "v1.2%2Fnotes"),
            Some("v1.2/notes".to_string())
        );
    }

    #[test]
    fn test_encoded_malformed_falls_back() {
        assert_eq!(
            replaced(&EncodedClassifier, "bad%zzvalue"),
            Some("{encoded}".to_string())
        );
        assert_eq!(
            replaced(&EncodedClassifier, "trailing%4"),
            Some("{encoded}".to_string())
        );
        assert_eq!(
            replaced(&EncodedClassifier, "%ff%fe"),
            Some("{encoded}".to_string())
        );
    }

    #[test]
    fn test_plain_segment_passes_encoded() {
        assert_eq!(replaced(&EncodedClassifier, "profile"), None);
    }
}
