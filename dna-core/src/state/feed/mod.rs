//! Feed (spec.md §4.7): a public-posting surface built from six state
//! kinds — a channel registry, per-channel metadata, day-partitioned
//! post indexes, posts themselves, comments, and votes. The day-index,
//! comment, and vote kinds are multi-writer (anyone may index, comment
//! on, or vote for a post); the registry, channel metadata, and posts
//! are single-writer, owned by whoever created them.

pub mod channel;
pub mod comment;
pub mod day_index;
pub mod post;
pub mod registry;
pub mod vote;
