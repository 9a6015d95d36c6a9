//! Closed sets of layout choices the user can make for a composed visual.
//!
//! Wire names are the identifiers the browser page sends (`atas`, `bawah`, ...).

use serde::{Deserialize, Serialize};

/// Where the caption is drawn on the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextPlacement {
    #[serde(rename = "atas")]
    Top,
    #[serde(rename = "bawah")]
    #[default]
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameStyle {
    #[serde(rename = "tidak ada")]
    #[default]
    None,
    #[serde(rename = "sederhana")]
    Simple,
    #[serde(rename = "elegan")]
    Elegant,
    #[serde(rename = "modern")]
    Modern,
    #[serde(rename = "vintage")]
    Vintage,
}

/// Corner used for the logo and/or brand text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrandPlacement {
    #[serde(rename = "atas-kiri")]
    TopLeft,
    #[serde(rename = "atas-kanan")]
    TopRight,
    #[serde(rename = "bawah-kiri")]
    BottomLeft,
    #[serde(rename = "bawah-kanan")]
    #[default]
    BottomRight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_initial_page_state() {
        assert_eq!(TextPlacement::default(), TextPlacement::Bottom);
        assert_eq!(FrameStyle::default(), FrameStyle::None);
        assert_eq!(BrandPlacement::default(), BrandPlacement::BottomRight);
    }

    #[test]
    fn wire_names_follow_page_identifiers() {
        assert_eq!(
            serde_json::from_str::<TextPlacement>("\"bawah\"").unwrap(),
            TextPlacement::Bottom
        );
        assert_eq!(
            serde_json::from_str::<FrameStyle>("\"tidak ada\"").unwrap(),
            FrameStyle::None
        );
        assert_eq!(
            serde_json::to_string(&FrameStyle::Elegant).unwrap(),
            "\"elegan\""
        );
        assert_eq!(
            serde_json::to_string(&BrandPlacement::TopLeft).unwrap(),
            "\"atas-kiri\""
        );
        assert!(serde_json::from_str::<FrameStyle>("\"gold\"").is_err());
    }
}
