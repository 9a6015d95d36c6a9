use crate::gateway::{CaptionBrief, CompositionRequest};
use crate::options::{BrandPlacement, FrameStyle, TextPlacement};

pub const ANALYSIS_INSTRUCTION: &str = "Describe this visual media in detail. Focus on the main subjects, colors, mood, and overall atmosphere. The description should be objective and suitable for a creative writer. For example: \"A photo of a sunrise over mountains. Dominant colors are orange, yellow, and purple. The atmosphere is calm, peaceful, and hopeful. No human objects are visible, only nature.\"";

/// Stand-in for an empty theme or instruction field.
pub const NONE_PROVIDED: &str = "None provided";

pub const CAPTION_COUNT: usize = 3;

pub fn caption_prompt(description: &str, brief: &CaptionBrief, language: &str) -> String {
    let media_type = if brief.is_video { "VIDEO" } else { "PHOTO" };
    let theme = or_none_provided(&brief.theme);
    let instructions = or_none_provided(&brief.instructions);

    format!(
        "
# ROLE AND GOAL
You are a highly creative motivational writer and visual semiotics expert. Your task is to create short, powerful, emotionally relevant motivational words based on the analysis of a visual medium (photo or video) uploaded by the user.

# CONTEXT
The user has uploaded a medium and wants several inspirational quote options that fit the visuals and mood it contains.

# INPUT DATA
- Media Type: [{media_type}]
- AI Visual Analysis Description: [{description}]
- User-Selected Theme (if any): [{theme}]
- Additional Instructions (if any): [{instructions}]

# YOUR TASK
1.  Read and understand all the input data above.
2.  Based on the visual analysis, theme, and additional instructions, write **{CAPTION_COUNT} (three) options** of motivational words in {language}.
3.  Each option must be:
    *   **Short and Dense:** Ideally no more than 15 words.
    *   **Relevant to the Visual:** It must feel at one with the image/video.
    *   **Inspiring and Positive:** It gives encouragement or invites reflection.
    *   **Varied:** Each option offers a slightly different angle or style (e.g. one poetic, one direct, one philosophical).

# OUTPUT FORMAT
Answer in strict JSON so the application can process it. Do not add any text or explanation outside this JSON format.
"
    )
}

fn or_none_provided(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        NONE_PROVIDED
    } else {
        trimmed
    }
}

pub fn placement_phrase(placement: TextPlacement) -> &'static str {
    match placement {
        TextPlacement::Top => "at the top",
        TextPlacement::Bottom => "at the bottom",
    }
}

pub fn frame_phrase(frame: FrameStyle) -> Option<&'static str> {
    match frame {
        FrameStyle::None => None,
        FrameStyle::Simple => Some("a simple and thin black border"),
        FrameStyle::Elegant => Some("an elegant, ornate silver frame"),
        FrameStyle::Modern => Some("a clean, minimalist white frame"),
        FrameStyle::Vintage => Some("a rustic, distressed wooden frame"),
    }
}

pub fn brand_corner_phrase(placement: BrandPlacement) -> &'static str {
    match placement {
        BrandPlacement::TopLeft => "top-left corner",
        BrandPlacement::TopRight => "top-right corner",
        BrandPlacement::BottomLeft => "bottom-left corner",
        BrandPlacement::BottomRight => "bottom-right corner",
    }
}

/// Branding sentence for the four logo/text cases. Blank brand text counts as
/// no brand text.
pub fn branding_instruction(
    has_logo: bool,
    brand_text: Option<&str>,
    placement: BrandPlacement,
) -> Option<String> {
    let corner = brand_corner_phrase(placement);
    let brand_text = brand_text.map(str::trim).filter(|text| !text.is_empty());

    match (has_logo, brand_text) {
        (true, Some(text)) => Some(format!(
            "Also, place the provided logo image at the **{corner}** and write the brand name \"{text}\" next to or under it. The branding should be subtle, clear, and well-integrated."
        )),
        (true, None) => Some(format!(
            "Also, place the provided logo image at the **{corner}**. The logo should be integrated naturally but remain clear and not too large."
        )),
        (false, Some(text)) => Some(format!(
            "Also, write the following brand name as a watermark at the **{corner}**: \"{text}\". Make it subtle but legible."
        )),
        (false, None) => None,
    }
}

pub fn composition_instruction(request: &CompositionRequest) -> String {
    let mut prompt = format!(
        "Artistically and beautifully overlay the following text onto the main image. Place the text **{}** of the image. The text should be legible, well-placed, and complement the image's mood and composition.",
        placement_phrase(request.placement)
    );

    if let Some(frame) = frame_phrase(request.frame) {
        prompt.push_str(&format!(" Also, add {frame} around the entire image."));
    }

    if let Some(branding) = branding_instruction(
        request.logo.is_some(),
        request.brand_text.as_deref(),
        request.brand_placement,
    ) {
        prompt.push(' ');
        prompt.push_str(&branding);
    }

    prompt.push_str(&format!(" Text: \"{}\"", request.caption));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InlineMedia;
    use pretty_assertions::assert_eq;

    const BASE: &str = "Artistically and beautifully overlay the following text onto the main image. Place the text **at the bottom** of the image. The text should be legible, well-placed, and complement the image's mood and composition.";

    fn request(logo: bool, brand_text: Option<&str>) -> CompositionRequest {
        CompositionRequest {
            image: InlineMedia {
                base64: "aW1n".to_string(),
                mime_type: "image/jpeg".to_string(),
            },
            caption: "Rise with the sun.".to_string(),
            placement: TextPlacement::Bottom,
            frame: FrameStyle::None,
            logo: logo.then(|| InlineMedia {
                base64: "bG9nbw==".to_string(),
                mime_type: "image/png".to_string(),
            }),
            brand_text: brand_text.map(str::to_string),
            brand_placement: BrandPlacement::BottomRight,
        }
    }

    #[test]
    fn branding_with_logo_and_text() {
        assert_eq!(
            composition_instruction(&request(true, Some("Acme"))),
            format!("{BASE} Also, place the provided logo image at the **bottom-right corner** and write the brand name \"Acme\" next to or under it. The branding should be subtle, clear, and well-integrated. Text: \"Rise with the sun.\"")
        );
    }

    #[test]
    fn branding_with_logo_only() {
        assert_eq!(
            composition_instruction(&request(true, None)),
            format!("{BASE} Also, place the provided logo image at the **bottom-right corner**. The logo should be integrated naturally but remain clear and not too large. Text: \"Rise with the sun.\"")
        );
    }

    #[test]
    fn branding_with_text_only_is_a_watermark() {
        assert_eq!(
            composition_instruction(&request(false, Some("Acme"))),
            format!("{BASE} Also, write the following brand name as a watermark at the **bottom-right corner**: \"Acme\". Make it subtle but legible. Text: \"Rise with the sun.\"")
        );
    }

    #[test]
    fn no_branding_adds_nothing() {
        assert_eq!(
            composition_instruction(&request(false, None)),
            format!("{BASE} Text: \"Rise with the sun.\"")
        );
        assert_eq!(
            composition_instruction(&request(false, Some("   "))),
            format!("{BASE} Text: \"Rise with the sun.\"")
        );
    }

    #[test]
    fn elegant_frame_at_bottom_without_branding() {
        let mut req = request(false, None);
        req.frame = FrameStyle::Elegant;
        let prompt = composition_instruction(&req);
        assert!(prompt.contains("Place the text **at the bottom** of the image."));
        assert!(prompt.contains(" Also, add an elegant, ornate silver frame around the entire image."));
        assert!(!prompt.contains("logo"));
        assert!(!prompt.contains("brand name"));
    }

    #[test]
    fn top_placement_and_corner_table() {
        let mut req = request(true, None);
        req.placement = TextPlacement::Top;
        req.brand_placement = BrandPlacement::TopLeft;
        let prompt = composition_instruction(&req);
        assert!(prompt.contains("**at the top**"));
        assert!(prompt.contains("**top-left corner**"));
        assert_eq!(brand_corner_phrase(BrandPlacement::TopRight), "top-right corner");
        assert_eq!(brand_corner_phrase(BrandPlacement::BottomLeft), "bottom-left corner");
    }

    #[test]
    fn caption_prompt_uses_sentinel_for_blank_fields() {
        let brief = CaptionBrief {
            theme: String::new(),
            instructions: "  ".to_string(),
            is_video: false,
        };
        let prompt = caption_prompt("A calm mountain sunrise", &brief, "English");
        assert!(prompt.contains("- Media Type: [PHOTO]"));
        assert!(prompt.contains("[A calm mountain sunrise]"));
        assert!(prompt.contains("- User-Selected Theme (if any): [None provided]"));
        assert!(prompt.contains("- Additional Instructions (if any): [None provided]"));
        assert!(prompt.contains("motivational words in English."));
    }

    #[test]
    fn caption_prompt_embeds_theme_and_video_type() {
        let brief = CaptionBrief {
            theme: "Adventure".to_string(),
            instructions: "Be poetic".to_string(),
            is_video: true,
        };
        let prompt = caption_prompt("Waves", &brief, "Bahasa Indonesia");
        assert!(prompt.contains("- Media Type: [VIDEO]"));
        assert!(prompt.contains("[Adventure]"));
        assert!(prompt.contains("[Be poetic]"));
    }
}
