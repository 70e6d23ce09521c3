use druckwerk_common::{
    model::{
        ModelValidationError,
        auth::{Authentication, PasswordHash},
        block::{Block, BlockContent, ContentRef},
        comment::Comment,
        message::Message,
        post::Post,
        tag::Tag,
        user::{Email, User},
    },
    ordering::Position,
    slug::MediaPath,
};
use time::{Duration, PrimitiveDateTime};

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub position: i32,
    pub cover_title: String,
    pub cover_description: String,
    pub cover_image: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct TagRecord {
    pub tag_snowflake: i64,
    pub post_snowflake: i64,
    pub tag_name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct BlockRecord {
    pub block_snowflake: i64,
    pub post_snowflake: i64,
    pub content_kind: String,
    pub content_snowflake: i64,
    pub block_position: i32,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct TextRecord {
    pub body: String,
    pub text_type: String,
    pub text_alignment: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct ImageRecord {
    pub path: String,
    pub image_size: i32,
    pub image_alignment: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct SpaceRecord {
    pub space_number: i32,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub content: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct MessageRecord {
    pub message_snowflake: i64,
    pub email: String,
    pub content: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub email: String,
    pub is_superuser: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct CredentialsRecord {
    pub user_snowflake: i64,
    pub email: String,
    pub is_superuser: bool,
    pub password_hash: Vec<u8>,
    pub password_salt: Vec<u8>,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
    pub email: String,
    pub is_superuser: bool,
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            position: Position::try_from(value.position)?,
            cover_title: value.cover_title,
            cover_description: value.cover_description,
            cover_image: value.cover_image.map(MediaPath::new),
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
        })
    }
}

impl From<TagRecord> for Tag {
    fn from(value: TagRecord) -> Self {
        Self {
            id: value.tag_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            tag_name: value.tag_name,
        }
    }
}

impl TryFrom<BlockRecord> for Block {
    type Error = ModelValidationError;

    fn try_from(value: BlockRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.block_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            content: ContentRef {
                kind: value.content_kind.parse()?,
                id: value.content_snowflake.cast_unsigned().into(),
            },
            position: Position::try_from(value.block_position)?,
        })
    }
}

impl From<TextRecord> for BlockContent {
    fn from(value: TextRecord) -> Self {
        BlockContent::Text {
            text: value.body,
            text_type: value.text_type,
            text_alignment: value.text_alignment,
        }
    }
}

impl From<ImageRecord> for BlockContent {
    fn from(value: ImageRecord) -> Self {
        BlockContent::Image {
            image: MediaPath::new(value.path),
            image_size: value.image_size,
            image_alignment: value.image_alignment,
        }
    }
}

impl From<SpaceRecord> for BlockContent {
    fn from(value: SpaceRecord) -> Self {
        BlockContent::Space {
            space_number: value.space_number,
        }
    }
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            author: value.user_snowflake.cast_unsigned().into(),
            content: value.content,
            created_at: value.created_at.as_utc(),
        }
    }
}

impl TryFrom<MessageRecord> for Message {
    type Error = ModelValidationError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.message_snowflake.cast_unsigned().into(),
            email: Email::new(value.email)?,
            content: value.content,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            email: Email::new(value.email)?,
            is_superuser: value.is_superuser,
        })
    }
}

impl CredentialsRecord {
    pub(crate) fn into_domain(self) -> Result<(User, PasswordHash), ModelValidationError> {
        let user = User {
            id: self.user_snowflake.cast_unsigned().into(),
            email: Email::new(self.email)?,
            is_superuser: self.is_superuser,
        };
        let password = PasswordHash::from_stored(self.password_hash.into(), &self.password_salt)?;

        Ok((user, password))
    }
}

impl AuthenticationRecord {
    pub(crate) fn into_domain(self) -> Result<(Authentication, User), ModelValidationError> {
        let user = User {
            id: self.user_snowflake.cast_unsigned().into(),
            email: Email::new(self.email)?,
            is_superuser: self.is_superuser,
        };
        let authentication = Authentication {
            user: user.id,
            token_hash: Box::<[u8]>::from(self.token_hash).try_into()?,
            created_at: self.created_at.as_utc(),
            expires_after: self
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        };

        Ok((authentication, user))
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{BlockRecord, PostRecord};
    use druckwerk_common::model::block::{Block, ContentKind};
    use druckwerk_common::model::post::Post;
    use druckwerk_common::ordering::Position;
    use time::macros::datetime;

    fn post_record() -> PostRecord {
        PostRecord {
            post_snowflake: 7,
            position: 3,
            cover_title: "A title".into(),
            cover_description: "A description".into(),
            cover_image: Some("posts/a-title/cover_00000001.png".into()),
            created_at: datetime!(2025-06-01 12:00),
            updated_at: datetime!(2025-06-02 12:00),
        }
    }

    #[test]
    fn post_record_converts() {
        let post = Post::try_from(post_record()).unwrap();
        assert_eq!(post.position, Position::new(3).unwrap());
        assert_eq!(post.cover_title, "A title");
    }

    #[test]
    fn post_record_rejects_nonpositive_position() {
        let mut record = post_record();
        record.position = 0;
        assert!(Post::try_from(record.clone()).is_err());
        record.position = -5;
        assert!(Post::try_from(record).is_err());
    }

    #[test]
    fn block_record_parses_kind_tag() {
        let record = BlockRecord {
            block_snowflake: 1,
            post_snowflake: 2,
            content_kind: "space".into(),
            content_snowflake: 3,
            block_position: 1,
        };

        let block = Block::try_from(record.clone()).unwrap();
        assert_eq!(block.content.kind, ContentKind::Space);

        let bad = BlockRecord {
            content_kind: "video".into(),
            ..record
        };
        assert!(Block::try_from(bad).is_err());
    }
}
