use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub content: String,
    pub created_at: UtcDateTime,
}

impl Comment {
    /// A comment may be removed by its author or by a superuser, never by
    /// another regular user.
    #[must_use]
    pub fn deletable_by(&self, actor: Id<UserMarker>, actor_is_superuser: bool) -> bool {
        actor_is_superuser || self.author == actor
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct CreateComment {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use crate::model::comment::Comment;
    use time::macros::utc_datetime;

    fn comment() -> Comment {
        Comment {
            id: 1.into(),
            post: 2.into(),
            author: 10.into(),
            content: "nice post".into(),
            created_at: utc_datetime!(2025-06-01 12:00),
        }
    }

    #[test]
    fn author_may_delete() {
        assert!(comment().deletable_by(10.into(), false));
    }

    #[test]
    fn superuser_may_delete() {
        assert!(comment().deletable_by(99.into(), true));
    }

    #[test]
    fn other_regular_user_may_not_delete() {
        assert!(!comment().deletable_by(99.into(), false));
    }
}
