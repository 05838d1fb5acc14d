use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat field -> value mapping as reported by the metadata tool, in tool order.
pub type MetadataRecord = Map<String, Value>;

/// Fields copied into `basic` verbatim, in this order.
pub const BASIC_FIELDS: [&str; 3] = ["FileName", "FileType", "MIMEType"];

/// Semantic buckets for metadata fields. Declaration order is output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Basic,
    File,
    Image,
    Exif,
    Gps,
    Pdf,
    IccProfile,
    Xmp,
    Other,
}

/// Prefix rules, first match wins.
const PREFIX_RULES: &[(&[&str], Category)] = &[
    (&["File", "System"], Category::File),
    (&["Image", "Pixel"], Category::Image),
    (&["EXIF"], Category::Exif),
    (&["GPS"], Category::Gps),
    (&["PDF"], Category::Pdf),
    (&["ICC"], Category::IccProfile),
    (&["XMP"], Category::Xmp),
];

impl Category {
    /// Category for a non-basic field name.
    pub fn for_field(name: &str) -> Self {
        PREFIX_RULES
            .iter()
            .find(|(prefixes, _)| prefixes.iter().any(|p| name.starts_with(p)))
            .map(|(_, category)| *category)
            .unwrap_or(Category::Other)
    }
}

/// A `MetadataRecord` regrouped by `Category`. Empty categories are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategorizedMetadata(BTreeMap<Category, MetadataRecord>);

impl CategorizedMetadata {
    pub fn get(&self, category: Category) -> Option<&MetadataRecord> {
        self.0.get(&category)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &MetadataRecord)> {
        self.0.iter().map(|(c, r)| (*c, r))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, category: Category, key: &str, value: &Value) {
        self.0
            .entry(category)
            .or_default()
            .insert(key.to_string(), value.clone());
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Regroups a flat record into semantic categories.
///
/// Basic fields are seeded as-is; every other field with a non-blank value
/// lands in exactly one category chosen by name prefix.
pub fn categorize(record: &MetadataRecord) -> CategorizedMetadata {
    let mut organized = CategorizedMetadata::default();

    for field in BASIC_FIELDS {
        if let Some(value) = record.get(field) {
            organized.insert(Category::Basic, field, value);
        }
    }

    for (key, value) in record {
        if is_blank(value) || BASIC_FIELDS.contains(&key.as_str()) {
            continue;
        }
        organized.insert(Category::for_field(key), key, value);
    }

    organized
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> MetadataRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn sample() -> MetadataRecord {
        record(json!({
            "SourceFile": "temp_uploads/abc_photo.jpg",
            "ExifToolVersion": 12.76,
            "FileName": "abc_photo.jpg",
            "FileSize": 48213,
            "FileType": "JPEG",
            "MIMEType": "image/jpeg",
            "SystemFileModifyDate": "2024:01:01 10:00:00",
            "ImageWidth": 640,
            "PixelAspectRatio": 1,
            "EXIFMake": "Canon",
            "GPSLatitude": 41.0082,
            "GPSLongitude": 28.9784,
            "PDFProducer": "LaTeX",
            "ICCProfileName": "sRGB",
            "XMPToolkit": "Adobe XMP Core",
            "FooBarVendorTag": "x",
            "Comment": "",
            "Artist": null
        }))
    }

    #[test]
    fn test_prefix_rules() {
        assert_eq!(Category::for_field("GPSLatitude"), Category::Gps);
        assert_eq!(Category::for_field("EXIFMake"), Category::Exif);
        assert_eq!(Category::for_field("PDFProducer"), Category::Pdf);
        assert_eq!(Category::for_field("FooBarVendorTag"), Category::Other);
        assert_eq!(Category::for_field("FileSize"), Category::File);
        assert_eq!(Category::for_field("SystemFoo"), Category::File);
        assert_eq!(Category::for_field("ImageHeight"), Category::Image);
        assert_eq!(Category::for_field("PixelsPerUnitX"), Category::Image);
        assert_eq!(Category::for_field("ICCProfileName"), Category::IccProfile);
        assert_eq!(Category::for_field("XMPToolkit"), Category::Xmp);
        // Case sensitive, like the tool's tag names
        assert_eq!(Category::for_field("gpsLatitude"), Category::Other);
    }

    #[test]
    fn test_every_non_blank_field_lands_in_exactly_one_category() {
        let input = sample();
        let organized = categorize(&input);

        for (key, value) in &input {
            let hits = organized
                .iter()
                .filter(|(_, fields)| fields.contains_key(key))
                .count();
            if is_blank(value) {
                assert_eq!(hits, 0, "{key} should be dropped");
            } else {
                assert_eq!(hits, 1, "{key} should appear exactly once");
            }
        }
    }

    #[test]
    fn test_basic_fields_seeded_in_fixed_order() {
        let input = record(json!({
            "MIMEType": "image/png",
            "FileName": "a.png",
            "FileSize": 10,
            "FileType": "PNG"
        }));
        let organized = categorize(&input);

        let basic: Vec<&str> = organized
            .get(Category::Basic)
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(basic, ["FileName", "FileType", "MIMEType"]);

        let file = organized.get(Category::File).unwrap();
        assert!(file.contains_key("FileSize"));
        assert!(!file.contains_key("FileName"));
        assert!(!file.contains_key("FileType"));
    }

    #[test]
    fn test_field_order_within_category_follows_input() {
        let input = record(json!({
            "Zeta": 1,
            "Alpha": 2,
            "Mid": 3
        }));
        let organized = categorize(&input);
        let keys: Vec<&str> = organized
            .get(Category::Other)
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_empty_categories_are_omitted() {
        let input = record(json!({
            "GPSLatitude": 1.5,
            "XMPToolkit": "",
            "EXIFMake": null
        }));
        let organized = categorize(&input);
        let categories: Vec<Category> = organized.categories().collect();
        assert_eq!(categories, [Category::Gps]);

        let json = serde_json::to_value(&organized).unwrap();
        assert_eq!(json, json!({ "gps": { "GPSLatitude": 1.5 } }));
    }

    #[test]
    fn test_empty_record() {
        assert!(categorize(&MetadataRecord::new()).is_empty());
    }

    #[test]
    fn test_categorize_is_deterministic() {
        let input = sample();
        let first = serde_json::to_string(&categorize(&input)).unwrap();
        let second = serde_json::to_string(&categorize(&input)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialized_category_order_and_names() {
        let organized = categorize(&sample());
        let json = serde_json::to_value(&organized).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["basic", "file", "image", "exif", "gps", "pdf", "icc_profile", "xmp", "other"]
        );
        assert_eq!(json["other"]["FooBarVendorTag"], "x");
        assert_eq!(json["other"]["ExifToolVersion"], 12.76);
    }
}
