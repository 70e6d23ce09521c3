use crate::{
    model::{DruckwerkSnowflake, Id, post::FileUpload, post::PostMarker},
    ordering::Position,
    slug::MediaPath,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BlockMarker;

/// The concrete entity types a block can reference. The tag is persisted as
/// text next to the content id; resolution is an explicit match on this enum,
/// never a lookup by stored type name.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
    Space,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown content kind: {0}")]
pub struct UnknownContentKindError(String);

impl ContentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Space => "space",
        }
    }
}

impl FromStr for ContentKind {
    type Err = UnknownContentKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentKind::Text),
            "image" => Ok(ContentKind::Image),
            "space" => Ok(ContentKind::Space),
            other => Err(UnknownContentKindError(other.to_owned())),
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-erased reference to one concrete content row.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub id: DruckwerkSnowflake,
}

/// The indirection record binding a post, a per-post position, and one
/// content item. Block positions are unique within their post and render
/// in ascending order.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Block {
    pub id: Id<BlockMarker>,
    pub post: Id<PostMarker>,
    pub content: ContentRef,
    pub position: Position,
}

/// A block with its referenced content resolved, ready for rendering.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct BlockView {
    pub id: Id<BlockMarker>,
    pub position: Position,
    pub content: BlockContent,
}

/// Resolved content of a block.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockContent {
    Text {
        text: String,
        text_type: String,
        text_alignment: String,
    },
    Image {
        image: MediaPath,
        image_size: i32,
        image_alignment: String,
    },
    Space {
        space_number: i32,
    },
}

impl BlockContent {
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        match self {
            BlockContent::Text { .. } => ContentKind::Text,
            BlockContent::Image { .. } => ContentKind::Image,
            BlockContent::Space { .. } => ContentKind::Space,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct TextPayload {
    pub text: String,
    #[serde(default)]
    pub text_type: String,
    #[serde(default)]
    pub text_alignment: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct ImagePayload {
    pub image: FileUpload,
    pub image_size: i32,
    #[serde(default)]
    pub image_alignment: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct SpacePayload {
    pub space_number: i32,
}

/// Create-block request. At most one section is expected; when a caller
/// supplies more than one, the first in text, image, space order wins.
/// A request with no section at all is a valid no-op.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct CreateBlock {
    pub text: Option<TextPayload>,
    pub image: Option<ImagePayload>,
    pub space: Option<SpacePayload>,
}

/// The payload selected out of a [`CreateBlock`] request.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum NewBlockContent {
    Text(TextPayload),
    Image(ImagePayload),
    Space(SpacePayload),
}

impl NewBlockContent {
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        match self {
            NewBlockContent::Text(_) => ContentKind::Text,
            NewBlockContent::Image(_) => ContentKind::Image,
            NewBlockContent::Space(_) => ContentKind::Space,
        }
    }
}

impl CreateBlock {
    /// Picks the payload to act on. Precedence is fixed: text, then image,
    /// then space. `None` means the request carried no recognized payload.
    #[must_use]
    pub fn resolve(self) -> Option<NewBlockContent> {
        if let Some(text) = self.text {
            Some(NewBlockContent::Text(text))
        } else if let Some(image) = self.image {
            Some(NewBlockContent::Image(image))
        } else {
            self.space.map(NewBlockContent::Space)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        block::{ContentKind, CreateBlock, NewBlockContent, SpacePayload, TextPayload},
        post::FileUpload,
    };
    use std::str::FromStr;

    #[test]
    fn kind_tag_round_trip() {
        for kind in [ContentKind::Text, ContentKind::Image, ContentKind::Space] {
            assert_eq!(ContentKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(ContentKind::from_str("video").is_err());
    }

    #[test]
    fn empty_payload_resolves_to_none() {
        assert_eq!(CreateBlock::default().resolve(), None);
    }

    #[test]
    fn single_payload_resolves_to_its_kind() {
        let create = CreateBlock {
            space: Some(SpacePayload { space_number: 3 }),
            ..CreateBlock::default()
        };

        assert_eq!(
            create.resolve(),
            Some(NewBlockContent::Space(SpacePayload { space_number: 3 }))
        );
    }

    #[test]
    fn text_wins_over_image_and_space() {
        let create = CreateBlock {
            text: Some(TextPayload {
                text: "heading".into(),
                ..TextPayload::default()
            }),
            image: Some(crate::model::block::ImagePayload {
                image: FileUpload::default(),
                image_size: 50,
                image_alignment: String::new(),
            }),
            space: Some(SpacePayload { space_number: 1 }),
        };

        assert_eq!(create.resolve().unwrap().kind(), ContentKind::Text);
    }

    #[test]
    fn image_wins_over_space() {
        let create = CreateBlock {
            image: Some(crate::model::block::ImagePayload {
                image: FileUpload::default(),
                image_size: 75,
                image_alignment: "center".into(),
            }),
            space: Some(SpacePayload { space_number: 1 }),
            ..CreateBlock::default()
        };

        assert_eq!(create.resolve().unwrap().kind(), ContentKind::Image);
    }
}
