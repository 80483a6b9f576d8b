//! Backend response tree and the decoder that flattens it

mod decoder;
mod tree;

pub use decoder::{
    availability_percent, boolean_counts, AggregationDecoder, Bucket, Data, DecodedHistogram,
    HistogramMode,
};
pub use tree::{AggregationResult, ResponseBucket, SearchHit, SearchHits, SearchResponse};
