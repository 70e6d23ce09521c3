pub mod model;
pub mod ordering;
pub mod slug;
pub mod snowflake;
pub mod util;
