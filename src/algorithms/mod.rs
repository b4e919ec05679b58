pub mod candidates;
pub mod mine;
pub mod tarone;
