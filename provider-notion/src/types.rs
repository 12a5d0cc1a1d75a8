//! Notion API types
//!
//! Request bodies for page creation and block appends, the response shapes
//! the adapter reads, and the per-integration credentials and target config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Notion caps a single rich text `content` at 2000 characters
pub const MAX_RICH_TEXT_CHARS: usize = 2000;

// ============================================================================
// Integration configuration
// ============================================================================

/// Credentials stored on a Notion integration
#[derive(Clone, Deserialize)]
pub struct NotionCredentials {
    /// Internal integration token
    pub api_key: String,
    #[serde(default)]
    pub workspace_url: Option<String>,
}

impl fmt::Debug for NotionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionCredentials")
            .field("api_key", &"[REDACTED]")
            .field("workspace_url", &self.workspace_url)
            .finish()
    }
}

/// Where synced content goes in the user's workspace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionTargetConfig {
    pub main_page_id: Option<String>,
    /// Parent page of one page per book
    pub books_page_id: Option<String>,
    /// Page that receives quotes without a book
    pub quotes_page_id: Option<String>,
    /// Color of quote blocks
    pub color_scheme: Option<String>,
    pub auto_create_structure: Option<bool>,
}

impl NotionTargetConfig {
    pub fn quote_color(&self) -> &str {
        self.color_scheme.as_deref().unwrap_or("default")
    }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotations {
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichText {
    pub text: TextContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
}

/// Split text into rich text segments within the API length limit
///
/// Splits on character boundaries. Empty input yields a single empty segment.
pub fn rich_text(content: &str) -> Vec<RichText> {
    let chars: Vec<char> = content.chars().collect();
    if chars.is_empty() {
        return vec![segment(String::new())];
    }

    chars
        .chunks(MAX_RICH_TEXT_CHARS)
        .map(|chunk| segment(chunk.iter().collect()))
        .collect()
}

fn segment(content: String) -> RichText {
    RichText {
        text: TextContent { content },
        annotations: None,
    }
}

/// Same as [`rich_text`], rendered in italics
pub fn italic_text(content: &str) -> Vec<RichText> {
    rich_text(content)
        .into_iter()
        .map(|mut text| {
            text.annotations = Some(Annotations { italic: true });
            text
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphBody {
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteBody {
    pub rich_text: Vec<RichText>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    Paragraph { paragraph: ParagraphBody },
    Quote { quote: QuoteBody },
}

/// A child block as sent to the API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    object: &'static str,
    #[serde(flatten)]
    pub content: BlockContent,
}

impl Block {
    pub fn paragraph(rich_text: Vec<RichText>) -> Self {
        Self {
            object: "block",
            content: BlockContent::Paragraph {
                paragraph: ParagraphBody { rich_text },
            },
        }
    }

    pub fn quote(rich_text: Vec<RichText>, color: impl Into<String>) -> Self {
        Self {
            object: "block",
            content: BlockContent::Quote {
                quote: QuoteBody {
                    rich_text,
                    color: color.into(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageParent {
    pub page_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleProperty {
    pub title: Vec<RichText>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageProperties {
    pub title: TitleProperty,
}

/// `POST /pages`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePageRequest {
    pub parent: PageParent,
    pub properties: PageProperties,
    pub children: Vec<Block>,
}

/// `PATCH /blocks/{id}/children`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppendChildrenRequest {
    pub children: Vec<Block>,
}

// ============================================================================
// Responses
// ============================================================================

/// Created page
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRef {
    pub id: String,
}

/// Blocks appended by `PATCH /blocks/{id}/children`
#[derive(Debug, Clone, Deserialize)]
pub struct AppendChildrenResponse {
    #[serde(default)]
    pub results: Vec<BlockRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlainText {
    #[serde(default)]
    pub plain_text: Option<String>,
}

/// A page-level property; only title properties are read
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyValue {
    #[serde(default)]
    pub title: Option<Vec<PlainText>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentRef {
    #[serde(rename = "type")]
    pub kind: String,
}

/// One page in a search result
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

impl SearchPage {
    /// Title from the `title` property, then `Name`, else "Untitled"
    pub fn title(&self) -> String {
        ["title", "Name"]
            .iter()
            .filter_map(|key| self.properties.get(*key))
            .filter_map(|property| property.title.as_ref()?.first()?.plain_text.clone())
            .next()
            .unwrap_or_else(|| "Untitled".to_string())
    }

    pub fn parent_type(&self) -> String {
        self.parent
            .as_ref()
            .map(|parent| parent.kind.clone())
            .unwrap_or_else(|| "workspace".to_string())
    }
}

/// `POST /search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchPage>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
