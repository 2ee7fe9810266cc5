pub mod bracket;
pub mod hero_stats;
pub mod matrix;
pub mod mean;
pub mod recommender;

#[cfg(test)]
pub(crate) mod testing;
