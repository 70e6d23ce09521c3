use crate::{
    model::{Id, block::BlockView, comment::Comment, tag::Tag},
    ordering::Position,
    slug::MediaPath,
};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A top-level content container. Posts display in descending `position`
/// order, so the newest post (highest position) comes first.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub position: Position,
    pub cover_title: String,
    pub cover_description: String,
    pub cover_image: Option<MediaPath>,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// The caller-supplied part of a post. The cover image file, when present,
/// travels as a base64 payload and is stored before the row is written.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostContent {
    pub cover_title: String,
    pub cover_description: String,
    pub cover_image: Option<FileUpload>,
}

/// An uploaded file carried inline in a JSON request body.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct FileUpload {
    pub file_name: String,
    /// Base64-encoded file contents.
    pub data: String,
}

/// A post together with everything rendered on its detail page: tags,
/// blocks in ascending block position order, and comments.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostView {
    pub post: Post,
    pub tags: Vec<Tag>,
    pub blocks: Vec<BlockView>,
    pub comments: Vec<Comment>,
}
