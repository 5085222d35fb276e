mod ask;

pub use ask::recipe;
