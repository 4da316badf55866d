use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::TileCoord;

/// A named image with the canvas position it is meant to be placed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    /// File name the image was added from
    pub filename: String,
    #[serde(default = "default_mime")]
    pub mime: String,
    /// Image file inside the library directory
    pub image: String,
    /// Byte length of the stored image
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub coords: TileCoord,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: i64,
}

fn default_mime() -> String {
    "image/png".to_string()
}

impl Template {
    /// Identity used to recognise an entry that was already imported
    pub(crate) fn exact_key(&self) -> (TileCoord, String, u64) {
        (self.coords, self.filename.clone(), self.size)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} — [{}]", self.name, self.coords.compact())
    }
}

/// Case-insensitive form of a template name
pub fn norm_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// `base`, or `base (2)`, `base (3)`, ... whichever is not taken yet
///
/// The returned name is recorded in `used`.
pub fn make_unique_name(base: &str, used: &mut HashSet<String>) -> String {
    let base = match base.trim() {
        "" => "Template",
        trimmed => trimmed,
    };
    if used.insert(norm_name(base)) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base} ({n})"))
        .find(|candidate| used.insert(norm_name(candidate)))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_name() {
        assert_eq!(norm_name("  Castle "), "castle");
        assert_eq!(norm_name("ÉCOLE"), "école");
    }

    #[test]
    fn test_make_unique_name() {
        let mut used: HashSet<String> = ["castle".to_string(), "castle (2)".to_string()].into();
        assert_eq!(make_unique_name("Castle", &mut used), "Castle (3)");
        assert_eq!(make_unique_name("castle", &mut used), "castle (4)");
        assert_eq!(make_unique_name(" Moat ", &mut used), "Moat");
        assert_eq!(make_unique_name("", &mut used), "Template");
        assert_eq!(make_unique_name("  ", &mut used), "Template (2)");
    }

    #[test]
    fn test_display_and_json_shape() {
        let template = Template {
            name: "Castle".to_string(),
            filename: "castle.png".to_string(),
            mime: "image/png".to_string(),
            image: "castle.png".to_string(),
            size: 120,
            width: 3,
            height: 2,
            coords: TileCoord::new(1, 2, 3, 4),
            created_at: 1_700_000_000_000,
        };
        assert_eq!(template.to_string(), "Castle — [1,2,3,4]");

        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["coords"]["tlx"], 1);
        assert_eq!(json["coords"]["py"], 4);

        let minimal: Template = serde_json::from_str(
            r#"{"name":"A","filename":"a.png","image":"a.png","coords":{"tlx":0,"tly":0,"px":1,"py":1}}"#,
        )
        .unwrap();
        assert_eq!(minimal.mime, "image/png");
        assert_eq!(minimal.size, 0);
    }
}
