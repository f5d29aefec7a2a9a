pub mod dashboard;
pub mod export;
pub mod listing;

#[cfg(test)]
mod fake;
