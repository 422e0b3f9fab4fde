//! Java identifier helpers

use crate::path::FieldPath;

/// Field name that holds a raw Jackson `ObjectNode` instead of a model object
pub const EXT_FIELD: &str = "ext";

/// Class name of a model field (`banner` -> `Banner`)
pub fn class_name(field: &str) -> String {
    capitalize(field)
}

/// Getter of a model field (`tagid` -> `getTagid`)
pub fn getter(field: &str) -> String {
    format!("get{}", class_name(field))
}

/// Local variable holding the original nested object at `path`
///
/// Nested levels are joined so that equally named fields under different
/// parents (`site.publisher`, `app.publisher`) never collide.
pub fn local_var(path: &FieldPath) -> String {
    let mut name = String::new();
    for (i, segment) in path.segments().iter().enumerate() {
        if i == 0 {
            name.push_str(segment);
        } else {
            name.push_str(&class_name(segment));
        }
    }
    name
}

/// Local variable holding the builder for the nested object at `path`
pub fn builder_var(path: &FieldPath) -> String {
    format!("{}Builder", local_var(path))
}

/// Bidder class name (`foo` -> `FooBidder`)
pub fn bidder_class(bidder: &str) -> String {
    format!("{}Bidder", capitalize(bidder))
}

/// Impression extension class name (`foo` -> `ExtImpFoo`)
pub fn ext_class(bidder: &str) -> String {
    format!("ExtImp{}", capitalize(bidder))
}

/// Upper-case the first character only, keeping the rest as written
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Quote a string as a Java string literal
pub fn java_string(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    format!("\"{}\"", escaped)
}
