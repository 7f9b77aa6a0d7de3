// Domain models: catalog definitions, source chunks, and write tasks.

mod chunk;
mod series;
mod task;

pub use chunk::{ChunkRecord, RawChunk};
pub use series::SeriesDefinition;
pub use task::{WriteTask, month_bucket, row_key};
