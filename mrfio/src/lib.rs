// src/lib.rs
pub mod error;

pub mod io {
    pub mod dictionary;
    pub mod images;
    pub mod results;
}
