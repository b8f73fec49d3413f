//! # Ocap Rank
//!
//! A total preorder over passables and a string encoding that preserves it,
//! for building sorted collections that support range queries.
//!
//! - [`compare_rank`] groups values by style, then orders within the group
//! - [`encode_passable`] produces keys whose string order agrees with rank order
//! - [`get_index_cover`] finds the run of a sorted sequence inside a [`RankCover`]

#![forbid(unsafe_code)]

pub mod cover;
pub mod encode;
pub mod order;
pub mod scalar;

pub use cover::{
    assert_rank_sorted, covered_entries, full_rank_cover, get_index_cover, get_pass_style_cover,
    intersect_rank_covers, is_rank_sorted, sort_by_rank, union_rank_covers, RankCover,
    FULL_RANK_COVER,
};
pub use encode::{
    decode_passable, encode_passable, is_encoded_remotable, DecodeHook, DecodeOptions,
    EncodeHook, EncodeOptions, PassableDecoder, PassableEncoder,
};
pub use order::{
    compare_anti_rank, compare_rank, pass_style_prefix, record_names, record_parts, AntiRank,
    FullOrderComparator, RankCompare, RankComparator, RemotableCompare, PASS_STYLE_PREFIXES,
};
pub use scalar::{decode_bigint, decode_binary64, encode_bigint, encode_binary64, zero_pad};
