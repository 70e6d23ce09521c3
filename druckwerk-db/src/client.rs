use crate::record::{
    AuthenticationRecord, BlockRecord, CommentRecord, CredentialsRecord, ImageRecord,
    MessageRecord, PostRecord, SpaceRecord, TagRecord, TextRecord, UserRecord,
};
use druckwerk_common::model::auth::{Authentication, AuthTokenHash, PasswordHash};
use druckwerk_common::model::block::{Block, BlockContent, BlockMarker, BlockView, ContentKind};
use druckwerk_common::model::comment::{Comment, CommentMarker};
use druckwerk_common::model::message::{CreateMessage, Message};
use druckwerk_common::model::post::{Post, PostMarker, PostView};
use druckwerk_common::model::tag::{Tag, TagMarker};
use druckwerk_common::model::user::{Email, User, UserMarker};
use druckwerk_common::model::{DruckwerkSnowflakeGenerator, Id, ModelValidationError};
use druckwerk_common::ordering::{BlockDirection, Position, PostDirection, neighbor, next_position};
use druckwerk_common::slug::MediaPath;
use druckwerk_common::snowflake::{ProcessId, SnowflakeTimestampFromDateTimeError, WorkerId};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Mutex;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Advisory lock key for the global post ordering scope. Block scopes use
/// the owning post's snowflake key, which is never 0 (the timestamp bits of
/// a generated snowflake are nonzero), so the keys cannot collide.
const POSTS_SCOPE_LOCK_KEY: i64 = 0;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate a snowflake id: {0}")]
    IdGeneration(#[from] SnowflakeTimestampFromDateTimeError),
    #[error("The email address is already taken")]
    DuplicateEmail,
    #[error("Block {block} references a missing {kind} row")]
    MissingBlockContent {
        block: Id<BlockMarker>,
        kind: ContentKind,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Maps a unique-constraint violation on an email column to the
/// caller-visible duplicate error; everything else stays a database fault.
fn map_duplicate_email(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DbError::DuplicateEmail,
        _ => DbError::Sqlx(err),
    }
}

/// A post's cover after an update, with the file the new cover superseded
/// (if any) so the caller can remove it from storage.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UpdatedPost {
    pub post: Post,
    pub superseded_cover: Option<MediaPath>,
}

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<DruckwerkSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(DruckwerkSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    fn generate_id<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .expect("snowflake generator lock poisoned")
            .generate()?;

        Ok(snowflake.into())
    }

    // Posts

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(
            "
            SELECT post_snowflake, position, cover_title, cover_description,
                   cover_image, created_at, updated_at
            FROM posts
            ORDER BY position DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Post::try_from(record).map_err(DbError::from))
            .collect()
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, PostRecord>(
            "
            SELECT post_snowflake, position, cover_title, cover_description,
                   cover_image, created_at, updated_at
            FROM posts
            WHERE post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// The post together with its tags, its blocks in render order with their
    /// content resolved, and its comments.
    pub async fn fetch_post_view(&self, post_id: Id<PostMarker>) -> Result<Option<PostView>> {
        let Some(post) = self.fetch_post(post_id).await? else {
            return Ok(None);
        };
        let post_key = post_id.snowflake().get().cast_signed();

        let tags = sqlx::query_as::<_, TagRecord>(
            "
            SELECT tag_snowflake, post_snowflake, tag_name
            FROM tags
            WHERE post_snowflake = $1
            ORDER BY tag_snowflake
            ",
        )
        .bind(post_key)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Tag::from)
        .collect();

        let block_records = sqlx::query_as::<_, BlockRecord>(
            "
            SELECT block_snowflake, post_snowflake, content_kind,
                   content_snowflake, block_position
            FROM blocks
            WHERE post_snowflake = $1
            ORDER BY block_position ASC
            ",
        )
        .bind(post_key)
        .fetch_all(&self.pool)
        .await?;

        let mut blocks = Vec::with_capacity(block_records.len());
        for record in block_records {
            let block = Block::try_from(record)?;
            let content = self.fetch_block_content(&block).await?;
            blocks.push(BlockView {
                id: block.id,
                position: block.position,
                content,
            });
        }

        let comments = sqlx::query_as::<_, CommentRecord>(
            "
            SELECT comment_snowflake, post_snowflake, user_snowflake, content, created_at
            FROM comments
            WHERE post_snowflake = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(post_key)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Comment::from)
        .collect();

        Ok(Some(PostView {
            post,
            tags,
            blocks,
            comments,
        }))
    }

    async fn fetch_block_content(&self, block: &Block) -> Result<BlockContent> {
        let content_key = block.content.id.get().cast_signed();

        let content = match block.content.kind {
            ContentKind::Text => sqlx::query_as::<_, TextRecord>(
                "SELECT body, text_type, text_alignment FROM texts WHERE text_snowflake = $1",
            )
            .bind(content_key)
            .fetch_optional(&self.pool)
            .await?
            .map(BlockContent::from),
            ContentKind::Image => sqlx::query_as::<_, ImageRecord>(
                "SELECT path, image_size, image_alignment FROM images WHERE image_snowflake = $1",
            )
            .bind(content_key)
            .fetch_optional(&self.pool)
            .await?
            .map(BlockContent::from),
            ContentKind::Space => sqlx::query_as::<_, SpaceRecord>(
                "SELECT space_number FROM spaces WHERE space_snowflake = $1",
            )
            .bind(content_key)
            .fetch_optional(&self.pool)
            .await?
            .map(BlockContent::from),
        };

        content.ok_or(DbError::MissingBlockContent {
            block: block.id,
            kind: block.content.kind,
        })
    }

    /// Inserts a post at the top of the global order. The scope lock spans
    /// reading the current maximum and the insert, so two concurrent
    /// creations cannot assign the same position.
    pub async fn create_post(
        &self,
        cover_title: &str,
        cover_description: &str,
        cover_image: Option<&MediaPath>,
    ) -> Result<Post> {
        let post_id: Id<PostMarker> = self.generate_id()?;

        let mut tx = self.pool.begin().await?;
        lock_scope(&mut tx, POSTS_SCOPE_LOCK_KEY).await?;

        let position = next_position(
            sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(position) FROM posts")
                .fetch_one(&mut *tx)
                .await?
                .map(|max| Position::try_from(max).map_err(ModelValidationError::from))
                .transpose()?,
        );

        let record = sqlx::query_as::<_, PostRecord>(
            "
            INSERT INTO posts (post_snowflake, position, cover_title, cover_description, cover_image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING post_snowflake, position, cover_title, cover_description,
                      cover_image, created_at, updated_at
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(position.get().cast_signed())
        .bind(cover_title)
        .bind(cover_description)
        .bind(cover_image.map(MediaPath::get))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Post::try_from(record)?)
    }

    /// Updates a post's cover fields. When `new_cover` is given it replaces
    /// the stored reference; the superseded path is returned so the caller
    /// can delete the old file once the row is durably updated.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        cover_title: &str,
        cover_description: &str,
        new_cover: Option<&MediaPath>,
    ) -> Result<Option<UpdatedPost>> {
        let mut tx = self.pool.begin().await?;
        let post_key = post_id.snowflake().get().cast_signed();

        let old_cover = sqlx::query_scalar::<_, Option<String>>(
            "SELECT cover_image FROM posts WHERE post_snowflake = $1 FOR UPDATE",
        )
        .bind(post_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(old_cover) = old_cover else {
            return Ok(None);
        };

        let cover = match new_cover {
            Some(path) => Some(path.get().to_owned()),
            None => old_cover.clone(),
        };

        let record = sqlx::query_as::<_, PostRecord>(
            "
            UPDATE posts
            SET cover_title = $2, cover_description = $3, cover_image = $4, updated_at = now()
            WHERE post_snowflake = $1
            RETURNING post_snowflake, position, cover_title, cover_description,
                      cover_image, created_at, updated_at
            ",
        )
        .bind(post_key)
        .bind(cover_title)
        .bind(cover_description)
        .bind(&cover)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let superseded_cover = match (new_cover, old_cover) {
            (Some(new), Some(old)) if new.get() != old => Some(MediaPath::new(old)),
            _ => None,
        };

        Ok(Some(UpdatedPost {
            post: Post::try_from(record)?,
            superseded_cover,
        }))
    }

    /// Deletes the post; tags, images, blocks and comments go with it via
    /// cascade, text and space rows by explicit delete. Returns the stored
    /// files the post owned (cover plus block images) so the caller can
    /// remove them. Surviving posts keep their positions, gaps included.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<Option<Vec<MediaPath>>> {
        let mut tx = self.pool.begin().await?;
        let post_key = post_id.snowflake().get().cast_signed();

        let cover = sqlx::query_scalar::<_, Option<String>>(
            "SELECT cover_image FROM posts WHERE post_snowflake = $1 FOR UPDATE",
        )
        .bind(post_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(cover) = cover else {
            return Ok(None);
        };

        let image_paths = sqlx::query_scalar::<_, String>(
            "SELECT path FROM images WHERE post_snowflake = $1",
        )
        .bind(post_key)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            "
            DELETE FROM texts WHERE text_snowflake IN
                (SELECT content_snowflake FROM blocks
                 WHERE post_snowflake = $1 AND content_kind = 'text')
            ",
        )
        .bind(post_key)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "
            DELETE FROM spaces WHERE space_snowflake IN
                (SELECT content_snowflake FROM blocks
                 WHERE post_snowflake = $1 AND content_kind = 'space')
            ",
        )
        .bind(post_key)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM posts WHERE post_snowflake = $1")
            .bind(post_key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let files = cover
            .into_iter()
            .chain(image_paths)
            .map(MediaPath::new)
            .collect();
        Ok(Some(files))
    }

    /// Swaps the post's position with its nearest neighbor in the requested
    /// direction. A post already at the boundary is left untouched; both
    /// writes happen in one transaction. The scope lock serializes
    /// repositions of the same scope, so two opposing moves cannot deadlock
    /// on each other's row locks. Returns `false` when the post does not
    /// exist.
    pub async fn reposition_post(
        &self,
        post_id: Id<PostMarker>,
        direction: PostDirection,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let post_key = post_id.snowflake().get().cast_signed();

        lock_scope(&mut tx, POSTS_SCOPE_LOCK_KEY).await?;

        let position = sqlx::query_scalar::<_, i32>(
            "SELECT position FROM posts WHERE post_snowflake = $1 FOR UPDATE",
        )
        .bind(post_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(position) = position else {
            return Ok(false);
        };
        let current = Position::try_from(position).map_err(ModelValidationError::from)?;

        let scope = sqlx::query_scalar::<_, i32>("SELECT position FROM posts")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|value| Position::try_from(value).map_err(ModelValidationError::from))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(partner) = neighbor(scope, current, direction.seek()) {
            // A concurrent delete may have removed the partner; then the
            // move is a boundary no-op after all.
            let neighbor_key = sqlx::query_scalar::<_, i64>(
                "SELECT post_snowflake FROM posts WHERE position = $1 FOR UPDATE",
            )
            .bind(partner.get().cast_signed())
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(neighbor_key) = neighbor_key {
                swap_positions(
                    &mut tx,
                    "UPDATE posts SET position = $2 WHERE post_snowflake = $1",
                    (post_key, partner.get().cast_signed()),
                    (neighbor_key, position),
                )
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    // Blocks

    /// Creates the concrete content row and the block referencing it as one
    /// unit; a failure after the content insert rolls the content back too.
    /// The block lands at the next position in this post's scope, and the
    /// scope lock spans reading the current maximum and the insert.
    pub async fn create_block(
        &self,
        post_id: Id<PostMarker>,
        content: &BlockContent,
    ) -> Result<Option<Block>> {
        let mut tx = self.pool.begin().await?;
        let post_key = post_id.snowflake().get().cast_signed();

        let post_exists =
            sqlx::query_scalar::<_, i32>("SELECT 1 FROM posts WHERE post_snowflake = $1")
                .bind(post_key)
                .fetch_optional(&mut *tx)
                .await?;
        if post_exists.is_none() {
            return Ok(None);
        }

        lock_scope(&mut tx, post_key).await?;

        let content_id = self.generate_id::<()>()?.snowflake();
        let content_key = content_id.get().cast_signed();

        match content {
            BlockContent::Text {
                text,
                text_type,
                text_alignment,
            } => {
                sqlx::query(
                    "INSERT INTO texts (text_snowflake, body, text_type, text_alignment)
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(content_key)
                .bind(text)
                .bind(text_type)
                .bind(text_alignment)
                .execute(&mut *tx)
                .await?;
            }
            BlockContent::Image {
                image,
                image_size,
                image_alignment,
            } => {
                sqlx::query(
                    "INSERT INTO images (image_snowflake, path, image_size, image_alignment, post_snowflake)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(content_key)
                .bind(image.get())
                .bind(image_size)
                .bind(image_alignment)
                .bind(post_key)
                .execute(&mut *tx)
                .await?;
            }
            BlockContent::Space { space_number } => {
                sqlx::query("INSERT INTO spaces (space_snowflake, space_number) VALUES ($1, $2)")
                    .bind(content_key)
                    .bind(space_number)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let position = next_position(
            sqlx::query_scalar::<_, Option<i32>>(
                "SELECT MAX(block_position) FROM blocks WHERE post_snowflake = $1",
            )
            .bind(post_key)
            .fetch_one(&mut *tx)
            .await?
            .map(|max| Position::try_from(max).map_err(ModelValidationError::from))
            .transpose()?,
        );

        let block_id: Id<BlockMarker> = self.generate_id()?;
        let record = sqlx::query_as::<_, BlockRecord>(
            "
            INSERT INTO blocks (block_snowflake, post_snowflake, content_kind,
                                content_snowflake, block_position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING block_snowflake, post_snowflake, content_kind,
                      content_snowflake, block_position
            ",
        )
        .bind(block_id.snowflake().get().cast_signed())
        .bind(post_key)
        .bind(content.kind().as_str())
        .bind(content_key)
        .bind(position.get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(Block::try_from(record)?))
    }

    /// Deletes the referenced content row (kind-dispatched) and then the
    /// block itself, in one transaction. Returns the stored file the content
    /// owned, if any. Surviving blocks keep their positions.
    pub async fn delete_block(
        &self,
        post_id: Id<PostMarker>,
        block_id: Id<BlockMarker>,
    ) -> Result<Option<Option<MediaPath>>> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, BlockRecord>(
            "
            SELECT block_snowflake, post_snowflake, content_kind,
                   content_snowflake, block_position
            FROM blocks
            WHERE block_snowflake = $1 AND post_snowflake = $2
            FOR UPDATE
            ",
        )
        .bind(block_id.snowflake().get().cast_signed())
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let block = Block::try_from(record)?;
        let content_key = block.content.id.get().cast_signed();

        let removed_file = match block.content.kind {
            ContentKind::Text => {
                sqlx::query("DELETE FROM texts WHERE text_snowflake = $1")
                    .bind(content_key)
                    .execute(&mut *tx)
                    .await?;
                None
            }
            ContentKind::Image => sqlx::query_scalar::<_, String>(
                "DELETE FROM images WHERE image_snowflake = $1 RETURNING path",
            )
            .bind(content_key)
            .fetch_optional(&mut *tx)
            .await?
            .map(MediaPath::new),
            ContentKind::Space => {
                sqlx::query("DELETE FROM spaces WHERE space_snowflake = $1")
                    .bind(content_key)
                    .execute(&mut *tx)
                    .await?;
                None
            }
        };

        sqlx::query("DELETE FROM blocks WHERE block_snowflake = $1")
            .bind(block.id.snowflake().get().cast_signed())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(removed_file))
    }

    /// Swaps the block's position with its nearest neighbor within the same
    /// post. Boundary repositions are no-ops. The per-post scope lock
    /// serializes repositions of one post's blocks, so opposing moves cannot
    /// deadlock on each other's row locks. Returns `false` when the block
    /// does not exist under this post.
    pub async fn reposition_block(
        &self,
        post_id: Id<PostMarker>,
        block_id: Id<BlockMarker>,
        direction: BlockDirection,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let post_key = post_id.snowflake().get().cast_signed();
        let block_key = block_id.snowflake().get().cast_signed();

        lock_scope(&mut tx, post_key).await?;

        let position = sqlx::query_scalar::<_, i32>(
            "
            SELECT block_position FROM blocks
            WHERE block_snowflake = $1 AND post_snowflake = $2
            FOR UPDATE
            ",
        )
        .bind(block_key)
        .bind(post_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(position) = position else {
            return Ok(false);
        };
        let current = Position::try_from(position).map_err(ModelValidationError::from)?;

        let scope = sqlx::query_scalar::<_, i32>(
            "SELECT block_position FROM blocks WHERE post_snowflake = $1",
        )
        .bind(post_key)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|value| Position::try_from(value).map_err(ModelValidationError::from))
        .collect::<Result<Vec<_>, _>>()?;

        if let Some(partner) = neighbor(scope, current, direction.seek()) {
            // A concurrent delete may have removed the partner; then the
            // move is a boundary no-op after all.
            let neighbor_key = sqlx::query_scalar::<_, i64>(
                "
                SELECT block_snowflake FROM blocks
                WHERE post_snowflake = $1 AND block_position = $2
                FOR UPDATE
                ",
            )
            .bind(post_key)
            .bind(partner.get().cast_signed())
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(neighbor_key) = neighbor_key {
                swap_positions(
                    &mut tx,
                    "UPDATE blocks SET block_position = $2 WHERE block_snowflake = $1",
                    (block_key, partner.get().cast_signed()),
                    (neighbor_key, position),
                )
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    // Tags

    pub async fn create_tag(
        &self,
        post_id: Id<PostMarker>,
        tag_name: &str,
    ) -> Result<Option<Tag>> {
        let post_key = post_id.snowflake().get().cast_signed();

        let post_exists =
            sqlx::query_scalar::<_, i32>("SELECT 1 FROM posts WHERE post_snowflake = $1")
                .bind(post_key)
                .fetch_optional(&self.pool)
                .await?;
        if post_exists.is_none() {
            return Ok(None);
        }

        let tag_id: Id<TagMarker> = self.generate_id()?;
        let record = sqlx::query_as::<_, TagRecord>(
            "
            INSERT INTO tags (tag_snowflake, post_snowflake, tag_name)
            VALUES ($1, $2, $3)
            RETURNING tag_snowflake, post_snowflake, tag_name
            ",
        )
        .bind(tag_id.snowflake().get().cast_signed())
        .bind(post_key)
        .bind(tag_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(Tag::from(record)))
    }

    pub async fn delete_tag(
        &self,
        post_id: Id<PostMarker>,
        tag_id: Id<TagMarker>,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM tags WHERE tag_snowflake = $1 AND post_snowflake = $2")
                .bind(tag_id.snowflake().get().cast_signed())
                .bind(post_id.snowflake().get().cast_signed())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    // Comments

    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        content: &str,
    ) -> Result<Option<Comment>> {
        let post_key = post_id.snowflake().get().cast_signed();

        let post_exists =
            sqlx::query_scalar::<_, i32>("SELECT 1 FROM posts WHERE post_snowflake = $1")
                .bind(post_key)
                .fetch_optional(&self.pool)
                .await?;
        if post_exists.is_none() {
            return Ok(None);
        }

        let comment_id: Id<CommentMarker> = self.generate_id()?;
        let record = sqlx::query_as::<_, CommentRecord>(
            "
            INSERT INTO comments (comment_snowflake, post_snowflake, user_snowflake, content)
            VALUES ($1, $2, $3, $4)
            RETURNING comment_snowflake, post_snowflake, user_snowflake, content, created_at
            ",
        )
        .bind(comment_id.snowflake().get().cast_signed())
        .bind(post_key)
        .bind(author.snowflake().get().cast_signed())
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(Comment::from(record)))
    }

    pub async fn fetch_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>> {
        let record = sqlx::query_as::<_, CommentRecord>(
            "
            SELECT comment_snowflake, post_snowflake, user_snowflake, content, created_at
            FROM comments
            WHERE comment_snowflake = $1 AND post_snowflake = $2
            ",
        )
        .bind(comment_id.snowflake().get().cast_signed())
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::from))
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE comment_snowflake = $1")
            .bind(comment_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // Messages

    pub async fn create_message(&self, message: &CreateMessage) -> Result<Message> {
        let message_id = self.generate_id::<()>()?.snowflake();

        let record = sqlx::query_as::<_, MessageRecord>(
            "
            INSERT INTO messages (message_snowflake, email, content)
            VALUES ($1, $2, $3)
            RETURNING message_snowflake, email, content, created_at
            ",
        )
        .bind(message_id.get().cast_signed())
        .bind(message.email.get())
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_duplicate_email)?;

        Ok(Message::try_from(record)?)
    }

    // Users and authentication

    pub async fn create_user(&self, email: &Email, password: &PasswordHash) -> Result<User> {
        let user_id: Id<UserMarker> = self.generate_id()?;

        let record = sqlx::query_as::<_, UserRecord>(
            "
            INSERT INTO users (user_snowflake, email, password_hash, password_salt)
            VALUES ($1, $2, $3, $4)
            RETURNING user_snowflake, email, is_superuser
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .bind(email.get())
        .bind(password.hash.as_slice())
        .bind(password.salt.as_slice())
        .fetch_one(&self.pool)
        .await
        .map_err(map_duplicate_email)?;

        Ok(User::try_from(record)?)
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_snowflake, email, is_superuser FROM users WHERE user_snowflake = $1",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, PasswordHash)>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "
            SELECT user_snowflake, email, is_superuser, password_hash, password_salt
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(CredentialsRecord::into_domain).transpose()?;
        Ok(credentials)
    }

    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        sqlx::query(
            "
            INSERT INTO authentications (token_hash, user_snowflake, expires_after_seconds)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(authentication.token_hash.0.as_slice())
        .bind(authentication.user.snowflake().get().cast_signed())
        .bind(
            authentication
                .expires_after
                .map(|duration| duration.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_auth(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<(Authentication, User)>> {
        let record = sqlx::query_as::<_, AuthenticationRecord>(
            "
            SELECT authentications.user_snowflake, authentications.token_hash,
                   authentications.created_at, authentications.expires_after_seconds,
                   users.email, users.is_superuser
            FROM authentications JOIN users USING (user_snowflake)
            WHERE authentications.token_hash = $1
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        let auth = record.map(AuthenticationRecord::into_domain).transpose()?;
        Ok(auth)
    }
}

/// Takes the transaction-scoped advisory lock serializing all writers of one
/// position scope. Released automatically when the transaction commits or
/// rolls back.
async fn lock_scope(tx: &mut Transaction<'_, Postgres>, scope_key: i64) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(scope_key)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Pairwise position exchange: exactly two writes, caller's transaction. The
/// unique constraints on positions are deferred, so the intermediate state is
/// allowed until commit.
async fn swap_positions(
    tx: &mut Transaction<'_, Postgres>,
    update_query: &str,
    first: (i64, i32),
    second: (i64, i32),
) -> Result<()> {
    sqlx::query(update_query)
        .bind(first.0)
        .bind(first.1)
        .execute(&mut **tx)
        .await?;
    sqlx::query(update_query)
        .bind(second.0)
        .bind(second.1)
        .execute(&mut **tx)
        .await?;

    Ok(())
}
