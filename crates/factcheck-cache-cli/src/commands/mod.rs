pub mod backup;
pub mod entries;
pub mod inspect;
