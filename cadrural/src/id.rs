use nanoid::nanoid;
use uuid::Uuid;

/// URL-safe alphabet for stored document names.
const STORED_NAME_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L',
    'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '_', '-',
];
const STORED_NAME_LENGTH: usize = 21;

/// Generates a new entity identifier (UUID v4, hyphenated).
pub fn generate_entity_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates the on-disk name of an uploaded document, keeping its extension.
pub fn generate_stored_name(extension: &str) -> String {
    let stem = nanoid!(STORED_NAME_LENGTH, STORED_NAME_ALPHABET);
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    if extension.is_empty() {
        stem
    } else {
        format!("{stem}.{extension}")
    }
}
